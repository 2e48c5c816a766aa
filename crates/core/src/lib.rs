//! Cross-platform child process launching
//!
//! POSIX and Windows disagree about how a command name becomes a running
//! process. On Windows the OS primitive does not consult PATHEXT, cannot run
//! scripts with a `#!` line, and needs cmd.exe (with its own escaping rules)
//! for batch files. A missing command then looks like an ordinary exit with
//! status 1 instead of ENOENT.
//!
//! This crate closes that gap:
//! 1. [`parse`] resolves the command, follows interpreter directives and
//!    rewrites the invocation into an escaped `cmd.exe /d /s /c` line when
//!    needed
//! 2. [`spawn`] and [`spawn_sync`] hand the result to the OS unchanged
//! 3. a missing command is always reported as [`NotFoundError`]
//!
//! On POSIX hosts the command passes through untouched.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use xspawn_core::{spawn_sync, SpawnOptions};
//!
//! fn main() -> anyhow::Result<()> {
//!     let output = spawn_sync("npm", ["run", "build"], Some(&SpawnOptions::new()))
//!         .into_result()?;
//!     std::process::exit(output.status.code().unwrap_or(1));
//! }
//! ```

pub use enoent::{
    hook_process, is_not_found, verify_enoent, verify_enoent_sync, ChildEvent, HookedChild,
};
pub use error::{NotFoundError, SpawnError, Syscall, ENOENT};
pub use escape::{escape_argument, escape_command};
pub use options::{SpawnOptions, StdioMode};
pub use parse::{parse, parse_with, Arguments, OriginalCommand, ParsedCommand};
pub use platform::{Platform, PosixPlatform, WindowsPlatform};
pub use resolver::resolve_command;
pub use shebang::read_shebang;
pub use spawn::{spawn, spawn_sync, SpawnSyncResult};
pub use xspawn_common::PlatformKind;

pub mod escape;
pub mod platform;

mod enoent;
mod error;
mod options;
mod parse;
mod resolver;
mod shebang;
mod spawn;
