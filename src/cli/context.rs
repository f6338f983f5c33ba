//! Shared setup for commands: paths, stores and the signed-in session.

use crate::config::{resolve_db_path, resolve_remote_path, session_path};
use crate::error::{Error, Result};
use crate::grocery::GroceryService;
use crate::remote::SqliteRemote;
use crate::session::Session;
use crate::storage::SqliteStorage;
use std::path::PathBuf;

/// Everything a signed-in command works with.
pub struct CommandContext {
    pub cache: SqliteStorage,
    pub remote: SqliteRemote,
    pub session: Session,
    session_path: PathBuf,
}

impl CommandContext {
    /// Open both stores and load the signed-in session.
    ///
    /// # Errors
    ///
    /// Returns `NotSignedIn` without a session, or the error opening a store.
    pub fn open(db_path: Option<&PathBuf>, remote_path: Option<&PathBuf>) -> Result<Self> {
        let session_path = session_path()?;
        let session = Session::load(&session_path)?.ok_or(Error::NotSignedIn)?;

        Ok(Self {
            cache: open_cache(db_path)?,
            remote: open_remote(remote_path)?,
            session,
            session_path,
        })
    }

    pub fn grocery(&mut self) -> GroceryService<'_, SqliteRemote> {
        GroceryService::new(&self.remote, &mut self.cache, &mut self.session)
    }

    /// Persist session changes (mode, store, undo snapshot).
    ///
    /// # Errors
    ///
    /// Returns an error if the session file cannot be written.
    pub fn save_session(&self) -> Result<()> {
        self.session.save(&self.session_path)
    }

    /// Store to use when the command did not name one.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when no store has been selected.
    pub fn store_or_selected(&self, store: Option<&str>) -> Result<String> {
        store
            .map(ToString::to_string)
            .or_else(|| self.session.store_id.clone())
            .ok_or_else(|| {
                Error::InvalidArgument(
                    "no store selected; run `chomp store <lat> <lon>` or pass --store".to_string(),
                )
            })
    }
}

/// Open the cache database, creating it on first use.
///
/// # Errors
///
/// Returns an error if the path cannot be resolved or the database opened.
pub fn open_cache(db_path: Option<&PathBuf>) -> Result<SqliteStorage> {
    let path = resolve_db_path(db_path.map(PathBuf::as_path))
        .ok_or_else(|| Error::Config("Could not determine cache database path".into()))?;
    SqliteStorage::open(&path)
}

/// Open the remote store, creating it on first use.
///
/// # Errors
///
/// Returns an error if the path cannot be resolved or the database opened.
pub fn open_remote(remote_path: Option<&PathBuf>) -> Result<SqliteRemote> {
    let path = resolve_remote_path(remote_path.map(PathBuf::as_path))
        .ok_or_else(|| Error::Config("Could not determine remote store path".into()))?;
    SqliteRemote::open(&path)
}

/// Runtime for async command bodies.
///
/// # Errors
///
/// Returns an error if the runtime cannot be created.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))
}

/// Persist a freshly signed-in session.
///
/// # Errors
///
/// Returns an error if the session file cannot be written.
pub fn store_session(session: &Session) -> Result<PathBuf> {
    let path = session_path()?;
    session.save(&path)?;
    Ok(path)
}
