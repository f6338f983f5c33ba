//! Configuration management.
//!
//! Everything lives under `~/.cheapchomp/`:
//! - **Cache**: `data/cache.db`, the local item cache
//! - **Remote**: `data/remote.db`, the document store the CLI syncs with
//! - **Session**: `session.json`, the signed-in user
//! - **Settings**: `config.json`, catalog credentials and sync timing

mod settings;

pub use settings::{load_config, load_config_from, AppConfig, CatalogSettings, SyncSettings};

use crate::error::{Error, Result};

use std::path::{Path, PathBuf};

/// The CheapChomp home directory (`~/.cheapchomp`).
#[must_use]
pub fn global_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".cheapchomp"))
}

fn require_global_dir() -> Result<PathBuf> {
    global_dir().ok_or_else(|| Error::Config("Could not determine home directory".into()))
}

/// Check if test mode is enabled.
///
/// Test mode is enabled by setting `CHOMP_TEST_DB=1` (or any non-empty value
/// other than `0`/`false`).
#[must_use]
pub fn is_test_mode() -> bool {
    std::env::var("CHOMP_TEST_DB").is_ok_and(|v| is_truthy(&v))
}

fn is_truthy(value: &str) -> bool {
    !value.is_empty() && value != "0" && !value.eq_ignore_ascii_case("false")
}

/// Isolated cache path used in test mode.
#[must_use]
pub fn test_db_path() -> Option<PathBuf> {
    global_dir().map(|dir| dir.join("test").join("cache.db"))
}

/// Resolve the cache database path.
///
/// Priority:
/// 1. `explicit_path` (`--db`)
/// 2. `CHOMP_TEST_DB` test mode
/// 3. `CHEAPCHOMP_DB` environment variable
/// 4. `~/.cheapchomp/data/cache.db`
#[must_use]
pub fn resolve_db_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if is_test_mode() {
        return test_db_path();
    }

    if let Some(path) = env_path("CHEAPCHOMP_DB") {
        return Some(path);
    }

    global_dir().map(|dir| dir.join("data").join("cache.db"))
}

/// Resolve the remote store path.
///
/// Priority: `--remote`, then `CHEAPCHOMP_REMOTE`, then
/// `~/.cheapchomp/data/remote.db`.
#[must_use]
pub fn resolve_remote_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if let Some(path) = env_path("CHEAPCHOMP_REMOTE") {
        return Some(path);
    }

    global_dir().map(|dir| dir.join("data").join("remote.db"))
}

/// Where the signed-in session is stored.
///
/// # Errors
///
/// Returns `Config` when the home directory cannot be determined.
pub fn session_path() -> Result<PathBuf> {
    Ok(require_global_dir()?.join("session.json"))
}

/// Where `config.json` is read from.
///
/// # Errors
///
/// Returns `Config` when the home directory cannot be determined.
pub fn config_path() -> Result<PathBuf> {
    Ok(require_global_dir()?.join("config.json"))
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_db_path_with_explicit() {
        let explicit = PathBuf::from("/custom/path/cache.db");
        assert_eq!(resolve_db_path(Some(&explicit)), Some(explicit));
    }

    #[test]
    fn test_resolve_remote_path_with_explicit() {
        let explicit = PathBuf::from("/custom/remote.db");
        assert_eq!(resolve_remote_path(Some(&explicit)), Some(explicit));
    }

    #[test]
    fn test_test_db_path_is_separate() {
        let global = global_dir().unwrap();
        let test = test_db_path().unwrap();
        assert!(test.ends_with("test/cache.db"));
        assert_ne!(global.join("data").join("cache.db"), test);
    }

    #[test]
    fn test_truthy_parsing() {
        assert!(!is_truthy(""));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("FALSE"));
        assert!(is_truthy("1"));
        assert!(is_truthy("yes"));
    }

    #[test]
    fn test_session_and_config_live_in_home_dir() {
        let dir = global_dir().unwrap();
        assert_eq!(session_path().unwrap(), dir.join("session.json"));
        assert_eq!(config_path().unwrap(), dir.join("config.json"));
    }
}
