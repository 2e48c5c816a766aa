//! Normalization of raw spawn arguments into a [`ParsedCommand`]

use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;
use xspawn_common::{EnvSnapshot, PlatformKind};

use crate::options::SpawnOptions;
use crate::platform::{self, Platform};

/// The command and arguments exactly as the caller supplied them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OriginalCommand {
    pub command: String,
    pub args: Vec<String>,
}

/// A command ready to be handed to the OS process-creation primitive.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedCommand {
    pub command: String,
    pub args: Vec<String>,
    pub options: SpawnOptions,
    /// Executable the command resolved to, before any shebang rewriting.
    pub file: Option<PathBuf>,
    pub original: OriginalCommand,
    /// Whether a PATH search was performed. False when resolution was left
    /// to the OS (POSIX, or `options.shell`).
    pub searched: bool,
    pub platform: PlatformKind,
}

impl ParsedCommand {
    /// True when a PATH search ran and its result still exists on disk.
    pub fn resolution_succeeded(&self) -> bool {
        self.file.as_deref().is_some_and(|file| file.is_file())
    }
}

/// Second positional argument of [`parse`]: either the argument list or,
/// when the caller skipped it, the options.
#[derive(Debug, Clone, Default)]
pub enum Arguments {
    #[default]
    None,
    List(Vec<String>),
    Options(SpawnOptions),
}

impl<S: ToString> From<Vec<S>> for Arguments {
    fn from(args: Vec<S>) -> Self {
        Self::List(args.iter().map(ToString::to_string).collect())
    }
}

impl<S: ToString> From<&Vec<S>> for Arguments {
    fn from(args: &Vec<S>) -> Self {
        Self::List(args.iter().map(ToString::to_string).collect())
    }
}

impl<S: ToString> From<&[S]> for Arguments {
    fn from(args: &[S]) -> Self {
        Self::List(args.iter().map(ToString::to_string).collect())
    }
}

impl<S: ToString, const N: usize> From<[S; N]> for Arguments {
    fn from(args: [S; N]) -> Self {
        Self::List(args.iter().map(ToString::to_string).collect())
    }
}

impl From<SpawnOptions> for Arguments {
    fn from(options: SpawnOptions) -> Self {
        Self::Options(options)
    }
}

impl From<&SpawnOptions> for Arguments {
    fn from(options: &SpawnOptions) -> Self {
        Self::Options(options.clone())
    }
}

impl From<()> for Arguments {
    fn from(_: ()) -> Self {
        Self::None
    }
}

/// Parse a command for the host platform.
///
/// When `args` carries options instead of an argument list, those options win
/// and `options` is ignored.
pub fn parse(
    command: impl Into<String>,
    args: impl Into<Arguments>,
    options: Option<&SpawnOptions>,
) -> ParsedCommand {
    parse_with(platform::current(), command, args, options)
}

/// Parse a command against an explicit platform strategy.
pub fn parse_with(
    platform: &dyn Platform,
    command: impl Into<String>,
    args: impl Into<Arguments>,
    options: Option<&SpawnOptions>,
) -> ParsedCommand {
    let command = command.into();
    let (args, options) = match args.into() {
        Arguments::List(args) => (args, options.cloned().unwrap_or_default()),
        Arguments::Options(options) => (Vec::new(), options),
        Arguments::None => (Vec::new(), options.cloned().unwrap_or_default()),
    };

    let mut parsed = ParsedCommand {
        original: OriginalCommand {
            command: command.clone(),
            args: args.clone(),
        },
        command,
        args,
        options,
        file: None,
        searched: false,
        platform: platform.kind(),
    };

    if parsed.options.shell {
        debug!(command = %parsed.command, "shell requested, skipping resolution");
        return parsed;
    }

    let env = EnvSnapshot::capture(platform.kind(), parsed.options.env.as_ref());
    platform.prepare(&mut parsed, &env);
    parsed
}
