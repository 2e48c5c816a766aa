//! Escaping for command lines run through `cmd.exe /d /s /c "<line>"`
//!
//! Two parsers see the line. cmd.exe first interprets its metacharacters and
//! removes one level of `^` escapes; the child then splits what is left into
//! argv with the MSVC rules (whitespace separates, `"` toggles quoting,
//! backslashes are literal unless they precede a `"`). Every argument is
//! prepared for both, in that order.

/// Characters cmd.exe treats specially in a command name.
const COMMAND_META_CHARS: &[char] = &['(', ')', '%', '!', '^', '<', '>', '&', '|', ';', ',', ' '];

/// Characters cmd.exe treats specially in an argument.
const ARGUMENT_META_CHARS: &[char] = &[
    '(', ')', '%', '!', '^', '<', '>', '&', '|', ';', ',', ' ', '"', '\'',
];

/// Characters that make the child's argv parser split or rewrite an
/// unquoted argument.
const ARGV_SPECIAL_CHARS: &[char] = &[' ', '\t', '\n', '\u{b}', '"'];

fn caret_escape(value: &str, meta: &[char]) -> String {
    let mut escaped = String::with_capacity(value.len() * 2);
    for c in value.chars() {
        if meta.contains(&c) {
            escaped.push('^');
        }
        escaped.push(c);
    }
    escaped
}

/// Escape a command name or path for cmd.exe.
pub fn escape_command(command: &str) -> String {
    caret_escape(command, COMMAND_META_CHARS)
}

/// Escape one argument for cmd.exe.
///
/// With `quote` the argument is first wrapped in double quotes following the
/// MSVC argv rules, so the child receives it as a single argument no matter
/// what it contains. Without it only cmd.exe metacharacters are escaped.
pub fn escape_argument(arg: &str, quote: bool) -> String {
    if quote {
        caret_escape(&quote_argument(arg), ARGUMENT_META_CHARS)
    } else {
        caret_escape(arg, ARGUMENT_META_CHARS)
    }
}

/// Whether `arg` only survives the child's argv parser when quoted.
pub fn requires_quotes(arg: &str) -> bool {
    arg.is_empty() || arg.contains(ARGV_SPECIAL_CHARS)
}

/// Wrap `arg` in double quotes for the MSVC argv parser.
///
/// A run of backslashes before a `"` is doubled and the quote gets its own
/// backslash; a trailing run is doubled so it cannot escape the closing quote.
fn quote_argument(arg: &str) -> String {
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');

    let mut backslashes = 0usize;
    for c in arg.chars() {
        match c {
            '\\' => backslashes += 1,
            '"' => {
                quoted.extend(std::iter::repeat('\\').take(backslashes * 2 + 1));
                quoted.push('"');
                backslashes = 0;
            }
            _ => {
                quoted.extend(std::iter::repeat('\\').take(backslashes));
                quoted.push(c);
                backslashes = 0;
            }
        }
    }

    quoted.extend(std::iter::repeat('\\').take(backslashes * 2));
    quoted.push('"');
    quoted
}

/// Build the line passed to `cmd.exe /d /s /c`.
///
/// `command` must already be normalized to native separators. Arguments use
/// quoted mode when `through_shim` is set or when the argv parser would
/// otherwise mangle them. A shim re-runs its interpreter through a second
/// cmd.exe, so its arguments get a second round of caret escaping.
pub fn build_command_line(command: &str, args: &[String], through_shim: bool) -> String {
    let mut line = escape_command(command);

    for arg in args {
        let mut escaped = escape_argument(arg, through_shim || requires_quotes(arg));
        if through_shim {
            escaped = caret_escape(&escaped, ARGUMENT_META_CHARS);
        }
        line.push(' ');
        line.push_str(&escaped);
    }

    line
}
