//! SQLite storage implementation.
//!
//! This module provides the local cache backend using SQLite. Single-row
//! operations map one-to-one onto SQL statements; compound operations
//! (look up by name, then insert or update) run inside one IMMEDIATE
//! transaction through [`SqliteStorage::mutate`] so two writers cannot both
//! decide a row is missing and insert duplicates.

use crate::error::{Error, Result};
use crate::model::{CachedItem, NewCachedItem, Product};
use crate::storage::schema::apply_schema;
use rusqlite::{Connection, OptionalExtension, Row, Transaction};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const ITEM_COLUMNS: &str =
    "id, user_id, name, price, favorited, in_grocery_list, store_id, last_modified, pending_sync";

/// SQLite-based local cache.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

fn map_item(row: &Row) -> rusqlite::Result<CachedItem> {
    Ok(CachedItem {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        price: row.get(3)?,
        favorited: row.get(4)?,
        in_grocery_list: row.get(5)?,
        store_id: row.get(6)?,
        last_modified: row.get(7)?,
        pending_sync: row.get(8)?,
    })
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Most recently modified record for (user, name); ties go to the newest id.
fn lookup_in(conn: &Connection, user_id: &str, name: &str) -> Result<Option<CachedItem>> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM item WHERE user_id = ?1 AND name = ?2
         ORDER BY last_modified DESC, id DESC LIMIT 1"
    );
    conn.query_row(&sql, rusqlite::params![user_id, name], map_item)
        .optional()
        .map_err(Error::from)
}

fn get_in(conn: &Connection, id: i64) -> Result<Option<CachedItem>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM item WHERE id = ?1");
    conn.query_row(&sql, [id], map_item)
        .optional()
        .map_err(Error::from)
}

fn insert_in(conn: &Connection, item: &NewCachedItem) -> Result<i64> {
    conn.execute(
        "INSERT INTO item (user_id, name, price, favorited, in_grocery_list, store_id, last_modified, pending_sync)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            item.user_id,
            item.name,
            item.price,
            item.favorited,
            item.in_grocery_list,
            item.store_id,
            now_ms(),
            item.pending_sync,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Re-read a row written earlier in the same transaction.
fn require_in(conn: &Connection, id: i64) -> Result<CachedItem> {
    get_in(conn, id)?.ok_or_else(|| Error::Other(format!("cache row {id} vanished mid-transaction")))
}

impl SqliteStorage {
    /// Open a cache database at the given path.
    ///
    /// Creates the database and applies schema if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a database with an optional busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open_with_timeout(path: &Path, timeout_ms: Option<u64>) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_millis(timeout_ms.unwrap_or(5000)))?;

        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for read operations).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Execute a compound mutation inside an IMMEDIATE transaction.
    ///
    /// The write lock is taken up front so a concurrent writer cannot slip
    /// in between the lookup and the insert. Rolls back on error.
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails.
    pub fn mutate<F, R>(&mut self, op: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let result = f(&tx)?;
        tx.commit()?;

        debug!(op, "Cache mutation committed");
        Ok(result)
    }

    // ==================
    // Record Operations
    // ==================

    /// Append a new record. No uniqueness check is made.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn insert(&mut self, item: &NewCachedItem) -> Result<i64> {
        insert_in(&self.conn, item)
    }

    /// Get a record by its local id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get(&self, id: i64) -> Result<Option<CachedItem>> {
        get_in(&self.conn, id)
    }

    /// Find the canonical record for a user and product name.
    ///
    /// When duplicates exist, the most recently modified one wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn lookup(&self, user_id: &str, name: &str) -> Result<Option<CachedItem>> {
        lookup_in(&self.conn, user_id, name)
    }

    fn list_where(&self, filter: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<CachedItem>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM item WHERE {filter} ORDER BY id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params, map_item)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    /// All records of a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_all(&self, user_id: &str) -> Result<Vec<CachedItem>> {
        self.list_where("user_id = ?1", &[&user_id])
    }

    /// Favorited records of a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_favorites(&self, user_id: &str) -> Result<Vec<CachedItem>> {
        self.list_where("user_id = ?1 AND favorited = 1", &[&user_id])
    }

    /// Records currently on the user's grocery list.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_in_grocery_list(&self, user_id: &str) -> Result<Vec<CachedItem>> {
        self.list_where("user_id = ?1 AND in_grocery_list = 1", &[&user_id])
    }

    /// Records that are neither favorited nor listed (plain browsing cache).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_non_favorite_non_listed(&self, user_id: &str) -> Result<Vec<CachedItem>> {
        self.list_where(
            "user_id = ?1 AND favorited = 0 AND in_grocery_list = 0",
            &[&user_id],
        )
    }

    /// Every record with the pending-sync flag set, across all users.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_pending_sync(&self) -> Result<Vec<CachedItem>> {
        self.list_where("pending_sync = 1", &[])
    }

    /// Number of pending records, optionally for one user.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_pending_sync(&self, user_id: Option<&str>) -> Result<usize> {
        let count: i64 = match user_id {
            Some(user) => self.conn.query_row(
                "SELECT COUNT(*) FROM item WHERE pending_sync = 1 AND user_id = ?1",
                [user],
                |row| row.get(0),
            )?,
            None => self.conn.query_row(
                "SELECT COUNT(*) FROM item WHERE pending_sync = 1",
                [],
                |row| row.get(0),
            )?,
        };
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Set or clear the pending-sync flag.
    ///
    /// Leaves `last_modified` alone: clearing the flag is bookkeeping, not
    /// a user change.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn set_pending_sync(&mut self, id: i64, pending: bool) -> Result<()> {
        self.conn.execute(
            "UPDATE item SET pending_sync = ?1 WHERE id = ?2",
            rusqlite::params![pending, id],
        )?;
        Ok(())
    }

    /// Delete a single record.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn delete(&mut self, item: &CachedItem) -> Result<()> {
        self.conn.execute("DELETE FROM item WHERE id = ?1", [item.id])?;
        Ok(())
    }

    /// Delete several records in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if any delete fails; nothing is deleted in that case.
    pub fn delete_many(&mut self, items: &[CachedItem]) -> Result<usize> {
        if items.is_empty() {
            return Ok(0);
        }
        self.mutate("delete_many", |tx| {
            let mut deleted = 0;
            for item in items {
                deleted += tx.execute("DELETE FROM item WHERE id = ?1", [item.id])?;
            }
            Ok(deleted)
        })
    }

    // ======================
    // Compound Operations
    // ======================

    /// Remember a product seen in search results.
    ///
    /// Inserts a plain, non-pending record unless one already exists for the
    /// user and name, in which case the existing record is returned untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails.
    pub fn cache_product(&mut self, user_id: &str, product: &Product, store_id: &str) -> Result<CachedItem> {
        self.mutate("cache_product", |tx| {
            if let Some(existing) = lookup_in(tx, user_id, &product.name)? {
                return Ok(existing);
            }
            let id = insert_in(
                tx,
                &NewCachedItem::product(user_id, &product.name, &product.price, store_id),
            )?;
            require_in(tx, id)
        })
    }

    /// Put a product on the offline grocery list and mark it for sync.
    ///
    /// An existing record takes the product's price and `store_id`, so a later
    /// removal is pushed against the store the item was last listed at.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails.
    pub fn mark_listed(&mut self, user_id: &str, product: &Product, store_id: &str) -> Result<CachedItem> {
        self.mutate("mark_listed", |tx| {
            let id = if let Some(existing) = lookup_in(tx, user_id, &product.name)? {
                tx.execute(
                    "UPDATE item SET in_grocery_list = 1, pending_sync = 1, price = ?1, store_id = ?2,
                     last_modified = ?3 WHERE id = ?4",
                    rusqlite::params![product.price, store_id, now_ms(), existing.id],
                )?;
                existing.id
            } else {
                insert_in(
                    tx,
                    &NewCachedItem::product(user_id, &product.name, &product.price, store_id)
                        .in_grocery_list(true)
                        .pending(true),
                )?
            };
            require_in(tx, id)
        })
    }

    /// Take a product off the offline grocery list and mark it for sync.
    ///
    /// A given `store_id` replaces the recorded one. Returns `None` when
    /// nothing is cached under that name.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails.
    pub fn mark_unlisted(
        &mut self,
        user_id: &str,
        name: &str,
        store_id: Option<&str>,
    ) -> Result<Option<CachedItem>> {
        self.mutate("mark_unlisted", |tx| {
            let Some(existing) = lookup_in(tx, user_id, name)? else {
                return Ok(None);
            };
            tx.execute(
                "UPDATE item SET in_grocery_list = 0, pending_sync = 1, store_id = COALESCE(?1, store_id),
                 last_modified = ?2 WHERE id = ?3",
                rusqlite::params![store_id, now_ms(), existing.id],
            )?;
            require_in(tx, existing.id).map(Some)
        })
    }

    /// Mark a product as favorite.
    ///
    /// An existing record only has its `favorited` flag changed. A new
    /// record is created with `listed_if_new` as its grocery-list flag.
    /// Favorites are local-only, so the pending flag is not touched.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails.
    pub fn set_favorite(
        &mut self,
        user_id: &str,
        product: &Product,
        store_id: &str,
        listed_if_new: bool,
    ) -> Result<CachedItem> {
        self.mutate("set_favorite", |tx| {
            let id = if let Some(existing) = lookup_in(tx, user_id, &product.name)? {
                tx.execute(
                    "UPDATE item SET favorited = 1, last_modified = ?1 WHERE id = ?2",
                    rusqlite::params![now_ms(), existing.id],
                )?;
                existing.id
            } else {
                insert_in(
                    tx,
                    &NewCachedItem::product(user_id, &product.name, &product.price, store_id)
                        .favorited(true)
                        .in_grocery_list(listed_if_new),
                )?
            };
            require_in(tx, id)
        })
    }

    /// Clear the favorite flag. Returns `None` when nothing is cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails.
    pub fn unset_favorite(&mut self, user_id: &str, name: &str) -> Result<Option<CachedItem>> {
        self.mutate("unset_favorite", |tx| {
            let Some(existing) = lookup_in(tx, user_id, name)? else {
                return Ok(None);
            };
            tx.execute(
                "UPDATE item SET favorited = 0, last_modified = ?1 WHERE id = ?2",
                rusqlite::params![now_ms(), existing.id],
            )?;
            require_in(tx, existing.id).map(Some)
        })
    }

    /// Drop the plain browsing cache of a user, keeping favorites and listed items.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn clear_browsing_cache(&mut self, user_id: &str) -> Result<usize> {
        let items = self.list_non_favorite_non_listed(user_id)?;
        self.delete_many(&items)
    }
}
