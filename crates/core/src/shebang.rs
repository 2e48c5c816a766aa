//! Interpreter detection for script files

use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Bytes read from the head of a file when looking for `#!`.
pub const SHEBANG_READ_LIMIT: usize = 150;

/// Read the interpreter directive of `path`, if it has one.
///
/// `#!/usr/bin/env node` yields `"node"`, `#!/bin/bash -e` yields `"bash -e"`.
/// Unreadable files and files without a directive yield `None`.
pub fn read_shebang(path: &Path) -> Option<String> {
    let mut head = Vec::with_capacity(SHEBANG_READ_LIMIT);
    File::open(path)
        .ok()?
        .take(SHEBANG_READ_LIMIT as u64)
        .read_to_end(&mut head)
        .ok()?;

    parse_shebang(&head)
}

/// Extract the directive from the first bytes of a file.
pub fn parse_shebang(head: &[u8]) -> Option<String> {
    let rest = head.strip_prefix(b"#!")?;
    let line = rest.split(|b| *b == b'\n').next().unwrap_or_default();
    let line = std::str::from_utf8(line).ok()?;
    let line = line.strip_suffix('\r').unwrap_or(line);
    let line = line.strip_prefix(' ').unwrap_or(line);

    let mut parts = line.splitn(2, ' ');
    let interpreter = parts.next().filter(|s| !s.is_empty())?;
    let argument = parts
        .next()
        .and_then(|s| s.split_whitespace().next())
        .filter(|s| !s.is_empty());

    let binary = interpreter
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(interpreter);

    if binary == "env" {
        return argument.map(str::to_string);
    }

    Some(match argument {
        Some(argument) => format!("{binary} {argument}"),
        None => binary.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_env_interpreter() {
        assert_eq!(parse_shebang(b"#!/usr/bin/env node\n"), Some("node".to_string()));
        assert_eq!(parse_shebang(b"#! /usr/bin/env python3\nprint()"), Some("python3".to_string()));
        assert_eq!(parse_shebang(b"#!/usr/bin/env\n"), None);
    }

    #[test]
    fn test_direct_interpreter() {
        assert_eq!(parse_shebang(b"#!/bin/bash -e\n"), Some("bash -e".to_string()));
        assert_eq!(parse_shebang(b"#!/bin/sh\necho hi\n"), Some("sh".to_string()));
        assert_eq!(parse_shebang(b"#!/usr/bin/perl -w -T\n"), Some("perl -w".to_string()));
    }

    #[test]
    fn test_crlf_line_ending() {
        assert_eq!(parse_shebang(b"#!/usr/bin/env node\r\n"), Some("node".to_string()));
        assert_eq!(parse_shebang(b"#!/bin/sh\r\n"), Some("sh".to_string()));
    }

    #[test]
    fn test_no_directive() {
        assert_eq!(parse_shebang(b"echo hello\n"), None);
        assert_eq!(parse_shebang(b""), None);
        assert_eq!(parse_shebang(b"#!\n"), None);
        assert_eq!(parse_shebang(b"MZ\x90\x00\x03\x00\x00\x00\x04\x00"), None);
        assert_eq!(parse_shebang(b"\x7fELF\x02\x01\x01"), None);
    }

    #[test]
    fn test_read_shebang_from_file() {
        let temp = TempDir::new().unwrap();
        let script = temp.path().join("script");
        fs::write(&script, "#!/usr/bin/env node\nconsole.log('hi')\n").unwrap();

        assert_eq!(read_shebang(&script), Some("node".to_string()));
        assert_eq!(read_shebang(&temp.path().join("missing")), None);
        assert_eq!(read_shebang(temp.path()), None);
    }

    #[test]
    fn test_read_shebang_is_bounded() {
        let temp = TempDir::new().unwrap();
        let script = temp.path().join("long");
        let directive = format!("#!/bin/{}\n", "x".repeat(SHEBANG_READ_LIMIT * 2));
        fs::write(&script, directive).unwrap();

        let result = read_shebang(&script).unwrap();
        assert_eq!(result.len(), SHEBANG_READ_LIMIT - "#!/bin/".len());
    }
}
