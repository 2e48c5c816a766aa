mod cli;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitStatus;
use tracing::debug;
use xspawn_core::{parse_with, platform, spawn, spawn_sync, SpawnError};

use cli::Cli;

/// Exit status when the command could not be found.
const EXIT_NOT_FOUND: i32 = 127;
/// Exit status when the command was found but could not be started.
const EXIT_CANNOT_EXECUTE: i32 = 126;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init()?;

    let exit_code = run(cli)?;
    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    let options = cli.spawn_options();

    if cli.explain {
        let parsed = parse_with(
            platform::for_kind(cli.platform()),
            cli.command.as_str(),
            &cli.args,
            Some(&options),
        );
        let json = serde_json::to_string_pretty(&parsed).context("failed to serialize command")?;
        println!("{json}");
        return Ok(0);
    }

    if cli.sync {
        let result = spawn_sync(cli.command.as_str(), &cli.args, Some(&options));
        return Ok(match (result.error, result.status) {
            (Some(err), _) => report(&err),
            (None, Some(status)) => status_code(status),
            (None, None) => EXIT_CANNOT_EXECUTE,
        });
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;

    Ok(runtime.block_on(async {
        let mut child = match spawn(cli.command.as_str(), &cli.args, Some(&options)) {
            Ok(child) => child,
            Err(err) => return report(&err),
        };
        debug!(pid = ?child.id(), "child started");

        match child.wait().await {
            Ok(status) => status_code(status),
            Err(err) => report(&err),
        }
    }))
}

fn report(err: &SpawnError) -> i32 {
    eprintln!("xspawn: {err}");
    if err.is_not_found() {
        EXIT_NOT_FOUND
    } else {
        EXIT_CANNOT_EXECUTE
    }
}

#[cfg(unix)]
fn status_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(1)
}

#[cfg(not(unix))]
fn status_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}
