//! Spawn options understood by the launcher

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

/// How one of the child's standard streams is wired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StdioMode {
    #[default]
    Pipe,
    Inherit,
    Null,
}

impl StdioMode {
    pub(crate) fn to_stdio(self) -> Stdio {
        match self {
            Self::Pipe => Stdio::piped(),
            Self::Inherit => Stdio::inherit(),
            Self::Null => Stdio::null(),
        }
    }
}

/// Options for one spawn call.
///
/// Callers build these freely; the parser always works on its own copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpawnOptions {
    /// Complete environment for the child. Also consulted for PATH, PATHEXT
    /// and COMSPEC during resolution.
    pub env: Option<HashMap<String, String>>,
    /// Working directory for the child.
    pub cwd: Option<PathBuf>,
    /// Run the command through the platform shell and skip all resolution
    /// and escaping.
    pub shell: bool,
    pub stdin: StdioMode,
    pub stdout: StdioMode,
    pub stderr: StdioMode,
    /// Route native executables through cmd.exe as well. Only useful for
    /// exercising the escaping path.
    #[doc(hidden)]
    pub force_shell: bool,
    #[serde(skip_deserializing)]
    windows_verbatim_arguments: bool,
}

impl SpawnOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn env(mut self, env: HashMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn shell(mut self, shell: bool) -> Self {
        self.shell = shell;
        self
    }

    /// Use the same mode for stdin, stdout and stderr.
    pub fn stdio(mut self, mode: StdioMode) -> Self {
        self.stdin = mode;
        self.stdout = mode;
        self.stderr = mode;
        self
    }

    /// Whether the finalized arguments are already escaped and must reach the
    /// OS untouched. Set by the Windows preparation, never by callers.
    pub fn windows_verbatim_arguments(&self) -> bool {
        self.windows_verbatim_arguments
    }

    pub(crate) fn set_windows_verbatim_arguments(&mut self, verbatim: bool) {
        self.windows_verbatim_arguments = verbatim;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let options = SpawnOptions::new()
            .cwd("/tmp")
            .shell(true)
            .stdio(StdioMode::Inherit);

        assert_eq!(options.cwd, Some(PathBuf::from("/tmp")));
        assert!(options.shell);
        assert_eq!(options.stdout, StdioMode::Inherit);
        assert!(!options.windows_verbatim_arguments());
    }

    #[test]
    fn test_serializes_camel_case() {
        let mut options = SpawnOptions::new();
        options.set_windows_verbatim_arguments(true);

        let value = serde_json::to_value(&options).unwrap();
        assert_eq!(value["windowsVerbatimArguments"], true);
        assert_eq!(value["stdout"], "pipe");
        assert_eq!(value["forceShell"], false);
    }

    #[test]
    fn test_verbatim_flag_cannot_be_deserialized() {
        let options: SpawnOptions = serde_json::from_value(serde_json::json!({
            "shell": true,
            "windowsVerbatimArguments": true,
        }))
        .unwrap();

        assert!(options.shell);
        assert!(!options.windows_verbatim_arguments());
    }
}
