//! Signed-in session state.
//!
//! A [`Session`] is the explicit context every component receives: who is
//! signed in, which remote documents belong to them, which store prices come
//! from, and whether reads go to the remote store or the local cache. It is
//! persisted as JSON between CLI invocations.

use crate::error::Result;
use crate::model::{ItemRef, ListRef, UserRef};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Where grocery-list reads come from for this session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadMode {
    /// Remote store is the source of truth; writes go remote first.
    #[default]
    Online,
    /// Local cache is the source of truth; writes stay pending until sync.
    Offline,
}

impl std::fmt::Display for ReadMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Online => f.write_str("online"),
            Self::Offline => f.write_str("offline"),
        }
    }
}

/// What the last destructive list action was, for undo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalKind {
    /// The whole item was deleted.
    Deleted,
    /// Only the quantity changed; `quantity` holds the previous value.
    QuantityChanged,
}

/// Snapshot of a removed or modified list item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedItem {
    pub item_id: ItemRef,
    pub name: String,
    pub price: String,
    pub quantity: u32,
    pub store_id: String,
    pub kind: RemovalKind,
}

/// The signed-in user's context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub email: String,
    pub user_id: UserRef,
    pub list_id: ListRef,

    /// Catalog store selected by `store` (nearest or fallback)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_id: Option<String>,

    #[serde(default)]
    pub mode: ReadMode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_removed: Option<RemovedItem>,

    /// Sign-in timestamp (Unix milliseconds)
    pub signed_in_at: i64,
}

impl Session {
    #[must_use]
    pub fn new(email: &str, user_id: UserRef, list_id: ListRef) -> Self {
        Self {
            email: email.to_string(),
            user_id,
            list_id,
            store_id: None,
            mode: ReadMode::Online,
            last_removed: None,
            signed_in_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Local cache key for this user.
    #[must_use]
    pub fn cache_user(&self) -> &str {
        self.user_id.as_str()
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.mode == ReadMode::Online
    }

    /// Load a persisted session. Returns `None` when no one is signed in.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Persist the session, replacing the file atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("json.tmp");
        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, self)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Remove the persisted session (sign out).
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn clear(path: &Path) -> Result<()> {
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_load_clear() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        assert!(Session::load(&path).unwrap().is_none());

        let mut session = Session::new("a@example.com", UserRef::from("user_1"), ListRef::from("list_1"));
        session.store_id = Some("70400357".to_string());
        session.mode = ReadMode::Offline;
        session.save(&path).unwrap();

        let loaded = Session::load(&path).unwrap().unwrap();
        assert_eq!(loaded, session);
        assert!(!loaded.is_online());

        Session::clear(&path).unwrap();
        assert!(Session::load(&path).unwrap().is_none());
    }

    #[test]
    fn test_mode_defaults_to_online() {
        let json = r#"{"email":"a@example.com","user_id":"u","list_id":"l","signed_in_at":0}"#;
        let session: Session = serde_json::from_str(json).unwrap();
        assert_eq!(session.mode, ReadMode::Online);
        assert!(session.store_id.is_none());
        assert_eq!(session.cache_user(), "u");
    }
}
