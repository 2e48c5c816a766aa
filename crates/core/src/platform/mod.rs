//! Platform strategies
//!
//! All platform-dependent behaviour sits behind the [`Platform`] trait. The
//! host strategy is chosen once per process by [`current`]; tests and the CLI
//! can pick any strategy through [`for_kind`], so the Windows rules are
//! exercised on every host.

mod posix;
mod windows;

pub use posix::PosixPlatform;
pub use windows::{normalize_command_path, WindowsPlatform, MAX_SHEBANG_HOPS};

use once_cell::sync::Lazy;
use std::fmt;
use std::path::{Path, PathBuf};
use xspawn_common::{EnvSnapshot, PlatformKind};

use crate::parse::ParsedCommand;

/// Program and arguments that run a command line through the platform shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellInvocation {
    pub program: String,
    pub args: Vec<String>,
    /// The arguments are pre-escaped and must not be quoted again.
    pub verbatim: bool,
}

pub trait Platform: fmt::Debug + Send + Sync {
    fn kind(&self) -> PlatformKind;

    /// Locate the executable `command` refers to. `None` is not an error:
    /// the OS primitive gets the final word.
    fn resolve(&self, command: &str, env: &EnvSnapshot, cwd: Option<&Path>) -> Option<PathBuf>;

    /// Rewrite a command that did not ask for a shell so that the OS
    /// primitive can run it.
    fn prepare(&self, parsed: &mut ParsedCommand, env: &EnvSnapshot);

    /// How `options.shell` is honoured on this platform.
    fn shell_invocation(&self, parsed: &ParsedCommand, env: &EnvSnapshot) -> ShellInvocation;
}

static POSIX: PosixPlatform = PosixPlatform;
static WINDOWS: WindowsPlatform = WindowsPlatform;

static CURRENT: Lazy<&'static dyn Platform> = Lazy::new(|| for_kind(PlatformKind::host()));

/// Strategy for the given platform family.
pub fn for_kind(kind: PlatformKind) -> &'static dyn Platform {
    match kind {
        PlatformKind::Posix => &POSIX,
        PlatformKind::Windows => &WINDOWS,
    }
}

/// Strategy for the host this process runs on.
pub fn current() -> &'static dyn Platform {
    *CURRENT
}

/// Join a command and its arguments with single spaces, the way a shell
/// command string is handed over.
pub(crate) fn join_command_line(command: &str, args: &[String]) -> String {
    std::iter::once(command)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}
