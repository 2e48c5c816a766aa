//! Process creation on top of [`parse`]
//!
//! Both entry points parse the command, hand the result to the OS unchanged,
//! and report a missing command as [`NotFoundError`](crate::NotFoundError)
//! whether the OS noticed (ENOENT) or cmd.exe did (exit status 1).

use std::io;
use std::process::{Command, ExitStatus, Output};
use tracing::{debug, warn};
use xspawn_common::EnvSnapshot;

use crate::enoent::{hook_process, verify_enoent_sync, HookedChild};
use crate::error::{SpawnError, Syscall};
use crate::options::SpawnOptions;
use crate::parse::{parse, Arguments, OriginalCommand, ParsedCommand};
use crate::platform;

/// Outcome of [`spawn_sync`]. Failures are reported in `error`, never
/// raised.
#[derive(Debug)]
pub struct SpawnSyncResult {
    pub pid: Option<u32>,
    /// `None` when the child could not be started.
    pub status: Option<ExitStatus>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub error: Option<SpawnError>,
    pub original: OriginalCommand,
}

impl SpawnSyncResult {
    fn failed(original: &OriginalCommand, error: SpawnError) -> Self {
        Self {
            pid: None,
            status: None,
            stdout: Vec::new(),
            stderr: Vec::new(),
            error: Some(error),
            original: original.clone(),
        }
    }

    /// Collapse into a `Result`, the error taking precedence over the status.
    pub fn into_result(self) -> Result<Output, SpawnError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        match self.status {
            Some(status) => Ok(Output {
                status,
                stdout: self.stdout,
                stderr: self.stderr,
            }),
            None => Err(SpawnError::Io {
                syscall: Syscall::SpawnSync,
                command: self.original.command,
                source: io::Error::other("child reported no exit status"),
            }),
        }
    }
}

/// Build the OS command for a parsed invocation.
pub(crate) fn build_command(parsed: &ParsedCommand) -> Command {
    let (program, args, verbatim) = if parsed.options.shell {
        let env = EnvSnapshot::capture(parsed.platform, parsed.options.env.as_ref());
        let invocation = platform::for_kind(parsed.platform).shell_invocation(parsed, &env);
        (invocation.program, invocation.args, invocation.verbatim)
    } else {
        (
            parsed.command.clone(),
            parsed.args.clone(),
            parsed.options.windows_verbatim_arguments(),
        )
    };

    let mut command = Command::new(program);
    push_args(&mut command, &args, verbatim);

    if let Some(cwd) = &parsed.options.cwd {
        command.current_dir(cwd);
    }
    if let Some(env) = &parsed.options.env {
        command.env_clear().envs(env);
    }

    command
        .stdin(parsed.options.stdin.to_stdio())
        .stdout(parsed.options.stdout.to_stdio())
        .stderr(parsed.options.stderr.to_stdio());
    command
}

#[cfg(windows)]
fn push_args(command: &mut Command, args: &[String], verbatim: bool) {
    use std::os::windows::process::CommandExt;

    for arg in args {
        if verbatim {
            command.raw_arg(arg);
        } else {
            command.arg(arg);
        }
    }
}

#[cfg(not(windows))]
fn push_args(command: &mut Command, args: &[String], _verbatim: bool) {
    command.args(args);
}

/// Run a command to completion, blocking the calling thread.
pub fn spawn_sync(
    command: impl Into<String>,
    args: impl Into<Arguments>,
    options: Option<&SpawnOptions>,
) -> SpawnSyncResult {
    let parsed = parse(command, args, options);
    debug!(command = %parsed.command, args = ?parsed.args, "spawning synchronously");

    let child = match build_command(&parsed).spawn() {
        Ok(child) => child,
        Err(err) => {
            let error = SpawnError::from_io(err, &parsed.original, Syscall::SpawnSync);
            return SpawnSyncResult::failed(&parsed.original, error);
        }
    };

    let pid = child.id();
    let output = match child.wait_with_output() {
        Ok(output) => output,
        Err(source) => {
            let error = SpawnError::Io {
                syscall: Syscall::SpawnSync,
                command: parsed.original.command.clone(),
                source,
            };
            return SpawnSyncResult {
                pid: Some(pid),
                ..SpawnSyncResult::failed(&parsed.original, error)
            };
        }
    };

    let error = verify_enoent_sync(output.status.code(), &parsed).map(|err| {
        warn!(command = %err.path, "command not found, reporting ENOENT");
        SpawnError::NotFound(err)
    });

    SpawnSyncResult {
        pid: Some(pid),
        status: Some(output.status),
        stdout: output.stdout,
        stderr: output.stderr,
        error,
        original: parsed.original,
    }
}

/// Start a command and return a handle that reports a missing command as an
/// error event. Must be called from within a tokio runtime.
pub fn spawn(
    command: impl Into<String>,
    args: impl Into<Arguments>,
    options: Option<&SpawnOptions>,
) -> Result<HookedChild, SpawnError> {
    let parsed = parse(command, args, options);
    debug!(command = %parsed.command, args = ?parsed.args, "spawning");

    let child = tokio::process::Command::from(build_command(&parsed))
        .spawn()
        .map_err(|err| SpawnError::from_io(err, &parsed.original, Syscall::Spawn))?;

    Ok(hook_process(child, parsed))
}
