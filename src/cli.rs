use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use xspawn_core::{PlatformKind, SpawnOptions, StdioMode};

#[derive(Parser, Debug)]
#[command(name = "xspawn")]
#[command(version = env!("XSPAWN_VERSION"), about = "Run a command with the same resolution and error semantics on POSIX and Windows", long_about = None)]
pub struct Cli {
    /// Run the command line through the platform shell
    #[arg(long)]
    pub shell: bool,

    /// Working directory for the child
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Set an environment variable for the child (repeatable)
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Block until the child exits instead of using the async runtime
    #[arg(long)]
    pub sync: bool,

    /// Print how the command would be spawned, as JSON, without running it
    #[arg(long)]
    pub explain: bool,

    /// Platform rules used by --explain (defaults to the host)
    #[arg(long, value_name = "PLATFORM", value_parser = PlatformKind::from_str, requires = "explain")]
    pub platform: Option<PlatformKind>,

    /// Command to run
    #[arg(value_name = "COMMAND")]
    pub command: String,

    /// Arguments passed to the command
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl Cli {
    /// Options for the child. `--env` entries are layered over the current
    /// environment since an explicit env replaces it wholesale.
    pub fn spawn_options(&self) -> SpawnOptions {
        let mut options = SpawnOptions::new()
            .shell(self.shell)
            .stdio(StdioMode::Inherit);

        if let Some(cwd) = &self.cwd {
            options = options.cwd(cwd);
        }

        if !self.env.is_empty() {
            let mut env: HashMap<String, String> = std::env::vars().collect();
            env.extend(self.env.iter().cloned());
            options = options.env(env);
        }

        options
    }

    pub fn platform(&self) -> PlatformKind {
        self.platform.unwrap_or_else(PlatformKind::host)
    }
}

fn parse_env_pair(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, val)) if !key.is_empty() => Ok((key.to_string(), val.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{value}'")),
    }
}
