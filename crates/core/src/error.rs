//! Error types surfaced by spawn calls

use serde::Serialize;
use std::fmt;
use std::io;

use crate::parse::OriginalCommand;

/// Entry point that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Syscall {
    #[serde(rename = "spawn")]
    Spawn,
    #[serde(rename = "spawnSync")]
    SpawnSync,
}

impl Syscall {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spawn => "spawn",
            Self::SpawnSync => "spawnSync",
        }
    }
}

impl fmt::Display for Syscall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The normalized "command not found" error.
///
/// Carries the same shape whether the OS reported ENOENT itself or the
/// launcher inferred it from cmd.exe's exit status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct NotFoundError {
    pub message: String,
    pub code: &'static str,
    pub errno: &'static str,
    pub syscall: Syscall,
    /// The command the caller asked for.
    pub path: String,
    /// The arguments the caller supplied, before any rewriting.
    pub spawnargs: Vec<String>,
}

pub const ENOENT: &str = "ENOENT";

impl NotFoundError {
    pub fn new(original: &OriginalCommand, syscall: Syscall) -> Self {
        Self {
            message: format!("{} {} {}", syscall, original.command, ENOENT),
            code: ENOENT,
            errno: ENOENT,
            syscall,
            path: original.command.clone(),
            spawnargs: original.args.clone(),
        }
    }

    /// `"<syscall> <command>"`, the form child-process errors usually report.
    pub fn syscall_label(&self) -> String {
        format!("{} {}", self.syscall, self.path)
    }
}

/// Failure of a spawn call.
#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    /// Any other error reported by the OS, passed through untouched.
    #[error("{syscall} {command} failed: {source}")]
    Io {
        syscall: Syscall,
        command: String,
        #[source]
        source: io::Error,
    },
}

impl SpawnError {
    /// Classify an OS error raised while creating or waiting on the child.
    ///
    /// Only `NotFound` is folded into [`NotFoundError`]; permission errors,
    /// resource limits and the like keep their native form.
    pub fn from_io(err: io::Error, original: &OriginalCommand, syscall: Syscall) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            Self::NotFound(NotFoundError::new(original, syscall))
        } else {
            Self::Io {
                syscall,
                command: original.command.clone(),
                source: err,
            }
        }
    }

    /// `"ENOENT"` for not-found errors.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::NotFound(err) => Some(err.code),
            Self::Io { .. } => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn as_not_found(&self) -> Option<&NotFoundError> {
        match self {
            Self::NotFound(err) => Some(err),
            Self::Io { .. } => None,
        }
    }
}
