use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Family of process-creation semantics a command is prepared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    Posix,
    Windows,
}

impl PlatformKind {
    /// The platform family this binary was compiled for.
    pub fn host() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Posix
        }
    }

    /// Convert kind to its canonical string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Posix => "posix",
            Self::Windows => "windows",
        }
    }

    /// Parse a platform string (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        value.parse().ok()
    }

    /// Separator between entries of PATH-like variables.
    pub fn path_list_separator(&self) -> char {
        match self {
            Self::Posix => ':',
            Self::Windows => ';',
        }
    }
}

impl FromStr for PlatformKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "posix" | "unix" | "linux" | "macos" => Ok(Self::Posix),
            "windows" | "win32" => Ok(Self::Windows),
            other => Err(format!("invalid platform: {}", other)),
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!(PlatformKind::parse("Windows"), Some(PlatformKind::Windows));
        assert_eq!(PlatformKind::parse("win32"), Some(PlatformKind::Windows));
        assert_eq!(PlatformKind::parse("linux"), Some(PlatformKind::Posix));
        assert_eq!(PlatformKind::parse("POSIX"), Some(PlatformKind::Posix));
        assert_eq!(PlatformKind::parse("beos"), None);
    }

    #[test]
    fn test_display_round_trips() {
        for kind in [PlatformKind::Posix, PlatformKind::Windows] {
            assert_eq!(kind.to_string().parse::<PlatformKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_separators() {
        assert_eq!(PlatformKind::Windows.path_list_separator(), ';');
        assert_eq!(PlatformKind::Posix.path_list_separator(), ':');
    }
}
