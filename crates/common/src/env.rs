//! Environment snapshot used for command resolution
//!
//! Resolution never reads ambient process state ad hoc: the variables it needs
//! are captured once per parse into an [`EnvSnapshot`] and passed explicitly.

use std::collections::HashMap;

use crate::{PlatformKind, COMSPEC_VAR, DEFAULT_COMSPEC, DEFAULT_PATHEXT, PATHEXT_VAR, PATH_VAR};

/// Name of the PATH variable inside `keys` for the given platform.
///
/// POSIX names are case-sensitive, so the answer is always `PATH`. Windows
/// names are not, and callers may hand us `Path`, `path` or `PATH`; the first
/// case-insensitive match (in sorted order, so the choice is deterministic)
/// wins, falling back to `Path`.
pub fn path_key<'a, I>(kind: PlatformKind, keys: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    match kind {
        PlatformKind::Posix => PATH_VAR.to_string(),
        PlatformKind::Windows => keys
            .into_iter()
            .filter(|key| key.eq_ignore_ascii_case(PATH_VAR))
            .min()
            .unwrap_or("Path")
            .to_string(),
    }
}

/// PATH, PATHEXT and COMSPEC as seen by one command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct EnvSnapshot {
    path: Option<String>,
    path_ext: Option<String>,
    comspec: Option<String>,
}

impl EnvSnapshot {
    /// Capture the snapshot for a command about to be spawned.
    ///
    /// Each variable is taken from `overrides` (the caller's `options.env`)
    /// when it is defined there, otherwise from the ambient environment.
    pub fn capture(kind: PlatformKind, overrides: Option<&HashMap<String, String>>) -> Self {
        let ambient: Vec<(String, String)> = std::env::vars_os()
            .map(|(k, v)| (k.to_string_lossy().into_owned(), v.to_string_lossy().into_owned()))
            .collect();
        let ambient = Self::from_pairs(kind, ambient.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        match overrides {
            Some(vars) => {
                let explicit =
                    Self::from_pairs(kind, vars.iter().map(|(k, v)| (k.as_str(), v.as_str())));
                Self {
                    path: explicit.path.or(ambient.path),
                    path_ext: explicit.path_ext.or(ambient.path_ext),
                    comspec: explicit.comspec.or(ambient.comspec),
                }
            }
            None => ambient,
        }
    }

    /// Build a snapshot from an explicit list of variables.
    pub fn from_pairs<'a, I>(kind: PlatformKind, pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let pairs: Vec<(&str, &str)> = pairs.into_iter().collect();
        let key = path_key(kind, pairs.iter().map(|(k, _)| *k));

        let lookup = |name: &str| -> Option<String> {
            pairs
                .iter()
                .filter(|(k, _)| match kind {
                    PlatformKind::Posix => *k == name,
                    PlatformKind::Windows => k.eq_ignore_ascii_case(name),
                })
                .min_by_key(|(k, _)| *k)
                .map(|(_, v)| v.to_string())
        };

        Self {
            path: pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string()),
            path_ext: lookup(PATHEXT_VAR),
            comspec: lookup(COMSPEC_VAR),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_path_ext(mut self, path_ext: impl Into<String>) -> Self {
        self.path_ext = Some(path_ext.into());
        self
    }

    pub fn with_comspec(mut self, comspec: impl Into<String>) -> Self {
        self.comspec = Some(comspec.into());
        self
    }

    /// Raw PATH value, if any was defined.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// PATHEXT value, falling back to [`DEFAULT_PATHEXT`].
    pub fn path_ext(&self) -> &str {
        self.path_ext
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(DEFAULT_PATHEXT)
    }

    /// COMSPEC value, falling back to [`DEFAULT_COMSPEC`].
    pub fn comspec(&self) -> &str {
        self.comspec
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(DEFAULT_COMSPEC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_path_key_posix_is_fixed() {
        assert_eq!(path_key(PlatformKind::Posix, ["Path", "path"]), "PATH");
    }

    #[test]
    fn test_path_key_windows_case_insensitive() {
        assert_eq!(path_key(PlatformKind::Windows, ["HOME", "path"]), "path");
        assert_eq!(path_key(PlatformKind::Windows, ["PATH", "Path"]), "PATH");
        assert_eq!(path_key(PlatformKind::Windows, ["HOME"]), "Path");
        assert_eq!(path_key(PlatformKind::Windows, std::iter::empty()), "Path");
    }

    #[test]
    fn test_from_pairs_windows_lookup() {
        let snapshot = EnvSnapshot::from_pairs(
            PlatformKind::Windows,
            [
                ("Path", r"C:\bin"),
                ("PathExt", ".EXE;.CMD"),
                ("ComSpec", r"C:\Windows\system32\cmd.exe"),
            ],
        );
        assert_eq!(snapshot.path(), Some(r"C:\bin"));
        assert_eq!(snapshot.path_ext(), ".EXE;.CMD");
        assert_eq!(snapshot.comspec(), r"C:\Windows\system32\cmd.exe");
    }

    #[test]
    fn test_from_pairs_posix_is_case_sensitive() {
        let snapshot = EnvSnapshot::from_pairs(PlatformKind::Posix, [("Path", "/bin")]);
        assert_eq!(snapshot.path(), None);
    }

    #[test]
    fn test_defaults() {
        let snapshot = EnvSnapshot::default().with_path_ext("  ");
        assert_eq!(snapshot.path_ext(), DEFAULT_PATHEXT);
        assert_eq!(snapshot.comspec(), DEFAULT_COMSPEC);
    }

    #[test]
    #[serial]
    fn test_capture_prefers_overrides() {
        let mut overrides = HashMap::new();
        overrides.insert("PATH".to_string(), "/override/bin".to_string());

        let snapshot = EnvSnapshot::capture(PlatformKind::Posix, Some(&overrides));
        assert_eq!(snapshot.path(), Some("/override/bin"));
    }

    #[test]
    #[serial]
    fn test_capture_falls_back_to_ambient() {
        let ambient = std::env::var(PATH_VAR).ok();
        let overrides = HashMap::from([("HOME".to_string(), "/tmp".to_string())]);

        let snapshot = EnvSnapshot::capture(PlatformKind::Posix, Some(&overrides));
        assert_eq!(snapshot.path().map(str::to_string), ambient);
    }
}
