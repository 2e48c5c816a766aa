use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;
use xspawn_common::{EnvSnapshot, PlatformKind};

use super::{join_command_line, Platform, ShellInvocation};
use crate::escape::build_command_line;
use crate::parse::ParsedCommand;
use crate::resolver;
use crate::shebang::read_shebang;

/// Upper bound on interpreter hops followed for one command.
pub const MAX_SHEBANG_HOPS: usize = 4;

/// Files CreateProcess can start without cmd.exe.
static NATIVE_EXECUTABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(?:com|exe)$").expect("valid regex"));

/// Wrappers generated by package managers; they run a second cmd.exe.
static SHIM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)node_modules[\\/]\.bin[\\/][^\\/]+\.cmd$").expect("valid regex")
});

/// Windows process creation neither searches PATHEXT nor runs scripts, and
/// batch files only run through cmd.exe. This strategy resolves the command
/// itself and rewrites anything that is not a native executable into an
/// escaped `cmd.exe /d /s /c` invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsPlatform;

impl WindowsPlatform {
    /// Follow interpreter directives starting from `file`.
    ///
    /// Each hop prepends the script to the arguments and makes its interpreter
    /// the new command. Returns the file that will actually run, or `None`
    /// when it cannot be found or the directives form a cycle. A cycle also
    /// clears `parsed.file` so the command counts as unresolved.
    fn follow_shebangs(
        &self,
        parsed: &mut ParsedCommand,
        env: &EnvSnapshot,
        mut file: Option<PathBuf>,
    ) -> Option<PathBuf> {
        let cwd = parsed.options.cwd.clone();
        let mut visited: Vec<PathBuf> = Vec::new();

        for _ in 0..MAX_SHEBANG_HOPS {
            let current = file?;
            let Some(directive) = read_shebang(&current) else {
                return Some(current);
            };
            debug!(script = %current.display(), %directive, "following shebang");

            let mut words = directive.splitn(2, ' ');
            let interpreter = words.next().unwrap_or_default().to_string();
            let mut prefix: Vec<String> = words.map(str::to_string).collect();
            prefix.push(current.display().to_string());
            prefix.append(&mut parsed.args);
            parsed.args = prefix;
            parsed.command = interpreter;

            visited.push(current);
            file = self.resolve(&parsed.command, env, cwd.as_deref());
            if file.as_ref().is_some_and(|next| visited.contains(next)) {
                debug!(command = %parsed.command, "shebang cycle, leaving unresolved");
                parsed.file = None;
                return None;
            }
        }

        file
    }
}

impl Platform for WindowsPlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Windows
    }

    fn resolve(&self, command: &str, env: &EnvSnapshot, cwd: Option<&Path>) -> Option<PathBuf> {
        resolver::search_path(command, env, cwd)
    }

    fn prepare(&self, parsed: &mut ParsedCommand, env: &EnvSnapshot) {
        parsed.searched = true;

        let cwd = parsed.options.cwd.clone();
        parsed.file = self.resolve(&parsed.command, env, cwd.as_deref());
        let command_file = self.follow_shebangs(parsed, env, parsed.file.clone());

        let native = command_file
            .as_deref()
            .is_some_and(|file| NATIVE_EXECUTABLE.is_match(&file.to_string_lossy()));
        if native && !parsed.options.force_shell {
            debug!(command = %parsed.command, "native executable, no shell needed");
            return;
        }

        let through_shim = command_file
            .as_deref()
            .is_some_and(|file| SHIM.is_match(&file.to_string_lossy()));
        let command = normalize_command_path(&parsed.command);
        let line = build_command_line(&command, &parsed.args, through_shim);
        debug!(%command, through_shim, "wrapping command in cmd.exe");

        parsed.args = shell_args(&line);
        parsed.command = env.comspec().to_string();
        parsed.options.set_windows_verbatim_arguments(true);
    }

    fn shell_invocation(&self, parsed: &ParsedCommand, env: &EnvSnapshot) -> ShellInvocation {
        ShellInvocation {
            program: env.comspec().to_string(),
            args: shell_args(&join_command_line(&parsed.command, &parsed.args)),
            verbatim: true,
        }
    }
}

/// `/d` skips AutoRun, `/s` strips exactly the outer quotes of the line.
fn shell_args(line: &str) -> Vec<String> {
    vec![
        "/d".to_string(),
        "/s".to_string(),
        "/c".to_string(),
        format!("\"{line}\""),
    ]
}

/// Normalize a command path to Windows separators.
///
/// `/` becomes `\`, repeated separators collapse (a leading `\\` UNC prefix is
/// kept) and `.` segments disappear. `..` consumes the previous segment when
/// there is one.
pub fn normalize_command_path(command: &str) -> String {
    let unified = command.replace('/', "\\");
    let (prefix, rest) = if let Some(rest) = unified.strip_prefix("\\\\") {
        ("\\\\", rest)
    } else if let Some(rest) = unified.strip_prefix('\\') {
        ("\\", rest)
    } else {
        ("", unified.as_str())
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in rest.split('\\') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(last) if last.ends_with(':') => {}
                Some(last) if *last != ".." => {
                    segments.pop();
                }
                _ if prefix.is_empty() => segments.push(".."),
                _ => {}
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("\\");
    if prefix.is_empty() && joined.is_empty() {
        ".".to_string()
    } else {
        format!("{prefix}{joined}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::SpawnOptions;
    use crate::parse::parse_with;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    const COMSPEC: &str = r"C:\Windows\system32\cmd.exe";

    fn options_for(bin: &Path, cwd: &Path) -> SpawnOptions {
        let env = HashMap::from([
            ("Path".to_string(), bin.display().to_string()),
            ("PATHEXT".to_string(), ".com;.exe;.bat;.cmd".to_string()),
            ("ComSpec".to_string(), COMSPEC.to_string()),
        ]);
        SpawnOptions::new().env(env).cwd(cwd)
    }

    #[test]
    fn test_native_executable_runs_directly() {
        let bin = TempDir::new().unwrap();
        let cwd = TempDir::new().unwrap();
        fs::write(bin.path().join("app.exe"), "MZ").unwrap();

        let options = options_for(bin.path(), cwd.path());
        let parsed = parse_with(&WindowsPlatform, "app", ["a b"], Some(&options));

        assert_eq!(parsed.command, "app");
        assert_eq!(parsed.args, vec!["a b"]);
        assert_eq!(parsed.file, Some(bin.path().join("app.exe")));
        assert!(parsed.searched);
        assert!(!parsed.options.windows_verbatim_arguments());
    }

    #[test]
    fn test_force_shell_wraps_native_executable() {
        let bin = TempDir::new().unwrap();
        let cwd = TempDir::new().unwrap();
        fs::write(bin.path().join("app.exe"), "MZ").unwrap();

        let mut options = options_for(bin.path(), cwd.path());
        options.force_shell = true;
        let parsed = parse_with(&WindowsPlatform, "app", ["x"], Some(&options));

        assert_eq!(parsed.command, COMSPEC);
        assert_eq!(parsed.args, vec!["/d", "/s", "/c", "\"app x\""]);
    }

    #[test]
    fn test_batch_file_goes_through_cmd() {
        let bin = TempDir::new().unwrap();
        let cwd = TempDir::new().unwrap();
        fs::write(bin.path().join("tool.cmd"), "@echo off").unwrap();

        let options = options_for(bin.path(), cwd.path());
        let parsed = parse_with(&WindowsPlatform, "tool", ["a b", "c&d"], Some(&options));

        assert_eq!(parsed.command, COMSPEC);
        assert_eq!(
            parsed.args,
            vec!["/d", "/s", "/c", r#""tool ^"a^ b^" c^&d""#]
        );
        assert_eq!(parsed.file, Some(bin.path().join("tool.cmd")));
        assert!(parsed.options.windows_verbatim_arguments());
        assert_eq!(parsed.original.command, "tool");
    }

    #[test]
    fn test_unresolved_command_goes_through_cmd() {
        let bin = TempDir::new().unwrap();
        let cwd = TempDir::new().unwrap();

        let options = options_for(bin.path(), cwd.path());
        let parsed = parse_with(&WindowsPlatform, "missing-cmd", (), Some(&options));

        assert_eq!(parsed.file, None);
        assert_eq!(parsed.args, vec!["/d", "/s", "/c", "\"missing-cmd\""]);
        assert!(parsed.searched);
        assert!(!parsed.resolution_succeeded());
    }

    #[test]
    fn test_comspec_defaults_to_cmd() {
        let cwd = TempDir::new().unwrap();
        let env = HashMap::from([("PATH".to_string(), String::new())]);
        let options = SpawnOptions::new().env(env).cwd(cwd.path());

        let parsed = parse_with(&WindowsPlatform, "missing-cmd", (), Some(&options));
        // Falls back to the ambient COMSPEC, which is unset on non-Windows hosts
        if std::env::var_os("COMSPEC").is_none() {
            assert_eq!(parsed.command, "cmd.exe");
        }
    }

    #[test]
    fn test_shebang_rewrites_command() {
        let bin = TempDir::new().unwrap();
        let cwd = TempDir::new().unwrap();
        let script = bin.path().join("script");
        fs::write(&script, "#!/usr/bin/env node\n").unwrap();
        fs::write(bin.path().join("node.exe"), "MZ").unwrap();

        let options = options_for(bin.path(), cwd.path());
        let parsed = parse_with(&WindowsPlatform, "script", ["x"], Some(&options));

        assert_eq!(parsed.command, "node");
        assert_eq!(parsed.args, vec![script.display().to_string(), "x".to_string()]);
        assert_eq!(parsed.file, Some(script));
        assert!(!parsed.options.windows_verbatim_arguments());
    }

    #[test]
    fn test_shebang_argument_precedes_script() {
        let bin = TempDir::new().unwrap();
        let cwd = TempDir::new().unwrap();
        let script = bin.path().join("build");
        fs::write(&script, "#!/bin/bash -e\n").unwrap();
        fs::write(bin.path().join("bash.exe"), "MZ").unwrap();

        let options = options_for(bin.path(), cwd.path());
        let parsed = parse_with(&WindowsPlatform, "build", (), Some(&options));

        assert_eq!(parsed.command, "bash");
        assert_eq!(parsed.args, vec!["-e".to_string(), script.display().to_string()]);
    }

    #[test]
    fn test_shebang_cycle_is_unresolved() {
        let bin = TempDir::new().unwrap();
        let cwd = TempDir::new().unwrap();
        fs::write(bin.path().join("loop"), "#!/usr/bin/env loop\n").unwrap();

        let options = options_for(bin.path(), cwd.path());
        let parsed = parse_with(&WindowsPlatform, "loop", (), Some(&options));

        assert_eq!(parsed.command, COMSPEC);
        assert!(parsed.options.windows_verbatim_arguments());
        assert_eq!(parsed.file, None);
        assert!(!parsed.resolution_succeeded());
        assert!(crate::enoent::verify_enoent(Some(1), &parsed, crate::Syscall::Spawn).is_some());
    }

    #[test]
    fn test_shebang_hops_are_bounded() {
        let bin = TempDir::new().unwrap();
        let cwd = TempDir::new().unwrap();
        for hop in 0..=MAX_SHEBANG_HOPS + 1 {
            fs::write(
                bin.path().join(format!("hop{hop}")),
                format!("#!/usr/bin/env hop{}\n", hop + 1),
            )
            .unwrap();
        }

        let options = options_for(bin.path(), cwd.path());
        let parsed = parse_with(&WindowsPlatform, "hop0", (), Some(&options));

        // Stops at the last allowed hop and hands it to cmd.exe as is
        let line = &parsed.args[3];
        assert!(line.starts_with(&format!("\"hop{MAX_SHEBANG_HOPS} ")));
        assert!(!line.contains(&format!("hop{}", MAX_SHEBANG_HOPS + 1)));
    }

    #[test]
    fn test_shim_arguments_are_escaped_twice() {
        let cwd = TempDir::new().unwrap();
        let shims = cwd.path().join("node_modules").join(".bin");
        fs::create_dir_all(&shims).unwrap();
        fs::write(shims.join("tool.cmd"), "@node tool.js %*").unwrap();

        let bin = TempDir::new().unwrap();
        let options = options_for(bin.path(), cwd.path());
        let parsed = parse_with(
            &WindowsPlatform,
            "node_modules/.bin/tool",
            ["a&b"],
            Some(&options),
        );

        assert_eq!(
            parsed.args[3],
            r#""node_modules\.bin\tool ^^^"a^^^&b^^^"""#
        );
    }

    #[test]
    fn test_shell_invocation() {
        let options = SpawnOptions::new().shell(true);
        let parsed = parse_with(&WindowsPlatform, "echo", ["%PATH%"], Some(&options));
        let env = EnvSnapshot::default().with_comspec(COMSPEC);

        let invocation = WindowsPlatform.shell_invocation(&parsed, &env);
        assert_eq!(invocation.program, COMSPEC);
        assert_eq!(invocation.args, vec!["/d", "/s", "/c", "\"echo %PATH%\""]);
        assert!(invocation.verbatim);
    }

    #[test]
    fn test_normalize_command_path() {
        assert_eq!(
            normalize_command_path("node_modules/.bin/tool"),
            r"node_modules\.bin\tool"
        );
        assert_eq!(normalize_command_path("C:/a//b/./c"), r"C:\a\b\c");
        assert_eq!(normalize_command_path(r"\\server\share\x"), r"\\server\share\x");
        assert_eq!(normalize_command_path("./script"), "script");
        assert_eq!(normalize_command_path("a/../b"), "b");
        assert_eq!(normalize_command_path("../b"), r"..\b");
        assert_eq!(normalize_command_path(r"C:\..\x"), r"C:\x");
        assert_eq!(normalize_command_path("tool"), "tool");
        assert_eq!(normalize_command_path("."), ".");
    }
}
