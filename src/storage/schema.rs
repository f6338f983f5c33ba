//! Local cache schema.
//!
//! The cache holds a single `item` table. There is no migration path: when
//! `CACHE_SCHEMA_VERSION` changes, the table is dropped and recreated, which
//! discards any offline data (including changes still pending sync).

use rusqlite::{Connection, Result};
use tracing::warn;

/// Current cache schema version, stored in `PRAGMA user_version`.
pub const CACHE_SCHEMA_VERSION: i32 = 4;

/// The complete SQL schema for the local cache.
///
/// Note: Timestamps are stored as INTEGER (Unix milliseconds). The table has
/// no UNIQUE(user_id, name) constraint; compound operations in
/// `SqliteStorage` do their check-then-insert inside one transaction.
pub const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS item (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    name TEXT NOT NULL,
    price TEXT NOT NULL,
    favorited INTEGER NOT NULL DEFAULT 0,
    in_grocery_list INTEGER NOT NULL DEFAULT 0,
    store_id TEXT NOT NULL,
    last_modified INTEGER NOT NULL,
    pending_sync INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_item_user_name ON item(user_id, name);
CREATE INDEX IF NOT EXISTS idx_item_pending ON item(pending_sync);
";

const DROP_SQL: &str = "DROP TABLE IF EXISTS item;";

/// Apply pragmas and the schema, recreating the table on a version bump.
///
/// # Errors
///
/// Returns an error if a pragma or DDL statement fails.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;

    let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if version != CACHE_SCHEMA_VERSION {
        if version != 0 {
            warn!(
                from = version,
                to = CACHE_SCHEMA_VERSION,
                "Cache schema changed, dropping offline data"
            );
        }
        conn.execute_batch(DROP_SQL)?;
        conn.pragma_update(None, "user_version", CACHE_SCHEMA_VERSION)?;
    }

    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
