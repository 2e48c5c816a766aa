//! Executable lookup with caching
//!
//! Implements the Windows search rules: the working directory, then every PATH
//! entry, first for the bare name and then for each PATHEXT extension. Hits are
//! cached per environment snapshot and working directory to cut down on
//! stat() calls.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::debug;
use xspawn_common::{
    split_extensions, split_search_path, EnvSnapshot, PlatformKind, CACHE_BUST_VAR,
};

use crate::parse::ParsedCommand;
use crate::platform;

/// Upper bound on cached entries; the cache is flushed when it is reached.
const CACHE_CAPACITY: usize = 1024;

/// Successful lookups only; a miss is always retried.
static RESOLUTION_CACHE: Lazy<RwLock<HashMap<String, PathBuf>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Resolve the command of a parsed invocation with its platform's rules.
pub fn resolve_command(parsed: &ParsedCommand) -> Option<PathBuf> {
    let env = EnvSnapshot::capture(parsed.platform, parsed.options.env.as_ref());
    platform::for_kind(parsed.platform).resolve(
        &parsed.command,
        &env,
        parsed.options.cwd.as_deref(),
    )
}

/// Search for `command` the way cmd.exe would, with caching.
pub fn search_path(command: &str, env: &EnvSnapshot, cwd: Option<&Path>) -> Option<PathBuf> {
    let use_cache = env::var_os(CACHE_BUST_VAR).is_none();
    // Without an explicit cwd the lookup reads the process cwd, so the key must too
    let cwd = cwd
        .map(Path::to_path_buf)
        .or_else(|| env::current_dir().ok());
    let cwd = cwd.as_deref();
    let cache_key = build_cache_key(command, env, cwd);

    if use_cache {
        let cached = RESOLUTION_CACHE
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&cache_key)
            .cloned();

        if let Some(path) = cached {
            if is_file(&path) {
                return Some(path);
            }
            // The file went away since it was cached
            RESOLUTION_CACHE
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .remove(&cache_key);
        }
    }

    let result = search_path_uncached(command, env, cwd);
    debug!(command, resolved = ?result, "searched PATH");

    if use_cache {
        if let Some(path) = &result {
            remember(cache_key, path.clone());
        }
    }

    result
}

fn remember(key: String, path: PathBuf) {
    let mut cache = RESOLUTION_CACHE
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if cache.len() >= CACHE_CAPACITY && !cache.contains_key(&key) {
        debug!(entries = cache.len(), "resolution cache full, flushing");
        cache.clear();
    }
    cache.insert(key, path);
}

/// The key embeds everything the lookup reads, so any change to the
/// environment or working directory lands on a different entry.
fn build_cache_key(command: &str, env: &EnvSnapshot, cwd: Option<&Path>) -> String {
    format!(
        "{}\0{}\0{}\0{}",
        command,
        cwd.map(|dir| dir.display().to_string()).unwrap_or_default(),
        env.path().unwrap_or_default(),
        env.path_ext(),
    )
}

fn search_path_uncached(command: &str, env: &EnvSnapshot, cwd: Option<&Path>) -> Option<PathBuf> {
    if command.is_empty() {
        return None;
    }

    let candidates: Vec<PathBuf> = if command.contains(['/', '\\']) {
        let path = Path::new(command);
        match cwd {
            Some(dir) if path.is_relative() => vec![dir.join(path)],
            _ => vec![path.to_path_buf()],
        }
    } else {
        search_dirs(env, cwd)
            .into_iter()
            .map(|dir| dir.join(command))
            .collect()
    };

    if let Some(found) = candidates.iter().find(|candidate| is_file(candidate)) {
        return Some(found.clone());
    }

    let extensions = split_extensions(env.path_ext());
    candidates.iter().find_map(|candidate| {
        extensions
            .iter()
            .map(|ext| with_extension(candidate, ext))
            .find(|path| is_file(path))
    })
}

/// The working directory comes first, as in cmd.exe.
fn search_dirs(env: &EnvSnapshot, cwd: Option<&Path>) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = cwd.map(Path::to_path_buf).into_iter().collect();
    for dir in split_search_path(
        env.path().unwrap_or_default(),
        PlatformKind::Windows.path_list_separator(),
    ) {
        let dir = match cwd {
            Some(base) if dir.is_relative() => base.join(dir),
            _ => dir,
        };
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }
    dirs
}

/// Append `ext` to the file name, keeping any extension already there.
fn with_extension(candidate: &Path, ext: &str) -> PathBuf {
    let mut name = OsString::from(candidate.as_os_str());
    name.push(ext);
    PathBuf::from(name)
}

fn is_file(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file())
        .unwrap_or(false)
}
