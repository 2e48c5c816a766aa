use std::path::{Path, PathBuf};
use xspawn_common::{EnvSnapshot, PlatformKind};

use super::{join_command_line, Platform, ShellInvocation};
use crate::parse::ParsedCommand;

/// POSIX process creation already does PATH lookup and honours shebangs, so
/// this strategy only passes commands through.
#[derive(Debug, Clone, Copy, Default)]
pub struct PosixPlatform;

impl Platform for PosixPlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Posix
    }

    fn resolve(&self, command: &str, _env: &EnvSnapshot, _cwd: Option<&Path>) -> Option<PathBuf> {
        Some(PathBuf::from(command))
    }

    fn prepare(&self, _parsed: &mut ParsedCommand, _env: &EnvSnapshot) {}

    fn shell_invocation(&self, parsed: &ParsedCommand, _env: &EnvSnapshot) -> ShellInvocation {
        ShellInvocation {
            program: "/bin/sh".to_string(),
            args: vec![
                "-c".to_string(),
                join_command_line(&parsed.command, &parsed.args),
            ],
            verbatim: false,
        }
    }
}
