//! Shared utilities for xspawn components

use std::collections::HashSet;
use std::path::PathBuf;

pub mod env;
pub mod platform;

pub use env::{path_key, EnvSnapshot};
pub use platform::PlatformKind;

/// Environment variable names consumed by xspawn
pub const PATH_VAR: &str = "PATH";
pub const PATHEXT_VAR: &str = "PATHEXT";
pub const COMSPEC_VAR: &str = "COMSPEC";
pub const CACHE_BUST_VAR: &str = "XSPAWN_CACHE_BUST"; // Disables the resolution cache
pub const LOG_FILTER_VAR: &str = "XSPAWN_LOG"; // EnvFilter directives for the CLI

/// Extensions tried when PATHEXT is not set
pub const DEFAULT_PATHEXT: &str = ".COM;.EXE;.BAT;.CMD";
/// Shell used when COMSPEC is not set
pub const DEFAULT_COMSPEC: &str = "cmd.exe";

/// Split a PATH-like string into search directories.
///
/// Empty entries are skipped, entries wrapped in double quotes are unquoted and
/// duplicates are dropped while preserving order, so every directory is
/// searched at most once.
pub fn split_search_path(path: &str, separator: char) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut dirs = Vec::new();

    for component in path.split(separator) {
        let unquoted = component
            .strip_prefix('"')
            .and_then(|c| c.strip_suffix('"'))
            .unwrap_or(component);
        if unquoted.is_empty() {
            continue;
        }

        let canonical = unquoted.trim_end_matches(['/', '\\']);
        let canonical = if canonical.is_empty() { unquoted } else { canonical };
        if seen.insert(canonical.to_string()) {
            dirs.push(PathBuf::from(unquoted));
        }
    }

    dirs
}

/// Split a PATHEXT-like list into extensions, keeping the caller's order.
pub fn split_extensions(path_ext: &str) -> Vec<&str> {
    path_ext
        .split(';')
        .map(str::trim)
        .filter(|ext| !ext.is_empty())
        .collect()
}
