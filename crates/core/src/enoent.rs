//! Synthesis of "command not found" errors
//!
//! When cmd.exe cannot find a command it still starts fine and exits with
//! status 1, so the OS never reports ENOENT. This module recognizes that case
//! and turns it back into a [`NotFoundError`], both for blocking spawns and for
//! asynchronous child handles.

use std::io;
use std::process::{ExitStatus, Output};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout};
use tokio::sync::broadcast;
use tracing::warn;

use crate::error::{NotFoundError, SpawnError, Syscall};
use crate::parse::ParsedCommand;

/// Exit status cmd.exe uses for an unknown command.
const CMD_NOT_FOUND_STATUS: i32 = 1;

/// The shared not-found predicate: resolution failed and the shell exited
/// with its not-found status.
pub fn is_not_found(resolution_succeeded: bool, exit_status: Option<i32>) -> bool {
    !resolution_succeeded && exit_status == Some(CMD_NOT_FOUND_STATUS)
}

/// Build the not-found error for a finished child, if the predicate fires.
///
/// Only commands that went through a PATH search qualify; when the OS did
/// the lookup itself it reports ENOENT on its own.
pub fn verify_enoent(
    status: Option<i32>,
    parsed: &ParsedCommand,
    syscall: Syscall,
) -> Option<NotFoundError> {
    if !parsed.searched || !is_not_found(parsed.resolution_succeeded(), status) {
        return None;
    }
    Some(NotFoundError::new(&parsed.original, syscall))
}

/// [`verify_enoent`] for blocking spawns.
pub fn verify_enoent_sync(status: Option<i32>, parsed: &ParsedCommand) -> Option<NotFoundError> {
    verify_enoent(status, parsed, Syscall::SpawnSync)
}

/// Lifecycle notifications of a [`HookedChild`].
///
/// A finished child produces `Exit` then `Close`, or `Error` then `Close`
/// when the exit was really a missing command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildEvent {
    Error(NotFoundError),
    Exit(ExitStatus),
    Close(ExitStatus),
}

#[derive(Debug, Clone)]
struct Settled {
    status: ExitStatus,
    error: Option<NotFoundError>,
}

impl Settled {
    fn to_result(&self) -> Result<ExitStatus, SpawnError> {
        match &self.error {
            Some(error) => Err(SpawnError::NotFound(error.clone())),
            None => Ok(self.status),
        }
    }
}

/// A running child whose termination is checked for a synthesized
/// not-found error.
#[derive(Debug)]
pub struct HookedChild {
    child: Child,
    parsed: ParsedCommand,
    events: broadcast::Sender<ChildEvent>,
    settled: Option<Settled>,
}

/// Attach not-found detection to a spawned child.
pub fn hook_process(child: Child, parsed: ParsedCommand) -> HookedChild {
    let (events, _) = broadcast::channel(4);
    HookedChild {
        child,
        parsed,
        events,
        settled: None,
    }
}

impl HookedChild {
    /// Receive lifecycle events. Only events sent after subscribing are seen.
    pub fn subscribe(&self) -> broadcast::Receiver<ChildEvent> {
        self.events.subscribe()
    }

    /// OS process id, until the child has been waited on.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn parsed(&self) -> &ParsedCommand {
        &self.parsed
    }

    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.child.stdin.take()
    }

    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }

    /// Ask the OS to kill the child without waiting for it.
    pub fn start_kill(&mut self) -> io::Result<()> {
        self.child.start_kill()
    }

    /// Wait for the child to terminate.
    ///
    /// Returns the exit status, or the synthesized [`NotFoundError`] in its
    /// place. Events are emitted on the first call only; later calls return
    /// the same outcome.
    pub async fn wait(&mut self) -> Result<ExitStatus, SpawnError> {
        if let Some(settled) = &self.settled {
            return settled.to_result();
        }

        let status = self.child.wait().await.map_err(|source| SpawnError::Io {
            syscall: Syscall::Spawn,
            command: self.parsed.original.command.clone(),
            source,
        })?;

        let error = verify_enoent(status.code(), &self.parsed, Syscall::Spawn);
        // Receivers may all be gone; that is not an error
        match &error {
            Some(err) => {
                warn!(command = %err.path, %status, "command not found, reporting ENOENT");
                let _ = self.events.send(ChildEvent::Error(err.clone()));
            }
            None => {
                let _ = self.events.send(ChildEvent::Exit(status));
            }
        }
        let _ = self.events.send(ChildEvent::Close(status));

        let settled = Settled { status, error };
        let result = settled.to_result();
        self.settled = Some(settled);
        result
    }

    /// Collect stdout and stderr while waiting for the child.
    pub async fn wait_with_output(mut self) -> Result<Output, SpawnError> {
        async fn read_all<R: AsyncRead + Unpin>(pipe: Option<R>) -> io::Result<Vec<u8>> {
            let mut buf = Vec::new();
            if let Some(mut pipe) = pipe {
                pipe.read_to_end(&mut buf).await?;
            }
            Ok(buf)
        }

        // The child may be reading stdin; it must see EOF to finish
        drop(self.child.stdin.take());

        let stdout = read_all(self.child.stdout.take());
        let stderr = read_all(self.child.stderr.take());
        let (stdout, stderr) =
            tokio::try_join!(stdout, stderr).map_err(|source| SpawnError::Io {
                syscall: Syscall::Spawn,
                command: self.parsed.original.command.clone(),
                source,
            })?;

        let status = self.wait().await?;
        Ok(Output {
            status,
            stdout,
            stderr,
        })
    }
}
