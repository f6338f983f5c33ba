//! Remote store backed by a standalone SQLite file.
//!
//! Each collection of the document store is one table, and documents refer to
//! each other by id the same way the hosted store does (`grocery_lists.user`,
//! `items.grocery_list`). Several devices can point at the same file to share
//! a list.

use super::{new_doc_id, validate_month, ItemWatchers, RemoteStore};
use crate::auth::{hash_password, new_salt, AuthProvider};
use crate::error::{Error, Result};
use crate::model::{Expenses, ItemRef, ListRef, RemoteItem, UserRef};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch::Receiver;

const REMOTE_SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS credentials (
    email TEXT PRIMARY KEY,
    salt TEXT NOT NULL,
    password_hash TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS grocery_lists (
    id TEXT PRIMARY KEY,
    user TEXT NOT NULL,
    favorited INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_grocery_lists_user ON grocery_lists(user);

CREATE TABLE IF NOT EXISTS items (
    id TEXT PRIMARY KEY,
    grocery_list TEXT NOT NULL,
    store_id TEXT NOT NULL,
    name TEXT NOT NULL,
    price TEXT NOT NULL,
    quantity INTEGER NOT NULL DEFAULT 0,
    favorited INTEGER NOT NULL DEFAULT 0,
    date_added INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_items_list ON items(grocery_list, store_id, name);

CREATE TABLE IF NOT EXISTS expenses (
    user TEXT NOT NULL,
    month INTEGER NOT NULL,
    amount REAL NOT NULL DEFAULT 0,
    PRIMARY KEY (user, month)
);
";

const REMOTE_ITEM_COLUMNS: &str = "id, store_id, name, price, quantity, favorited, date_added, grocery_list";

fn map_remote_item(row: &rusqlite::Row) -> rusqlite::Result<RemoteItem> {
    Ok(RemoteItem {
        id: ItemRef(row.get(0)?),
        store_id: row.get(1)?,
        name: row.get(2)?,
        price: row.get(3)?,
        quantity: row.get(4)?,
        favorited: row.get(5)?,
        date_added: row.get(6)?,
        grocery_list: ListRef(row.get(7)?),
    })
}

fn query_items_in(conn: &Connection, list: &ListRef) -> Result<Vec<RemoteItem>> {
    let sql = format!(
        "SELECT {REMOTE_ITEM_COLUMNS} FROM items WHERE grocery_list = ?1 ORDER BY date_added ASC, id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([list.as_str()], map_remote_item)?;
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

/// Run one store call, reporting SQLite failures as remote-store errors.
fn remote_call<T>(call: impl FnOnce() -> Result<T>) -> Result<T> {
    call().map_err(|err| match err {
        Error::Database(e) => Error::Remote(e.to_string()),
        other => other,
    })
}

/// Remote document store in a SQLite file.
#[derive(Debug)]
pub struct SqliteRemote {
    conn: Mutex<Connection>,
    watchers: ItemWatchers,
}

impl SqliteRemote {
    /// Open (or create) the store file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::from_connection(conn)
    }

    /// Open an in-memory store (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the schema fails.
    pub fn open_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(REMOTE_SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
            watchers: ItemWatchers::new(),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn publish(&self, conn: &Connection, list: &ListRef) -> Result<()> {
        if self.watchers.is_watched(list) {
            self.watchers.publish(list, query_items_in(conn, list)?);
        }
        Ok(())
    }

    fn list_of_item(conn: &Connection, item: &ItemRef) -> Result<Option<ListRef>> {
        conn.query_row(
            "SELECT grocery_list FROM items WHERE id = ?1",
            [item.as_str()],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map(|list| list.map(ListRef))
        .map_err(Error::from)
    }
}

impl RemoteStore for SqliteRemote {
    async fn get_user_ref(&self, email: &str) -> Result<Option<UserRef>> {
        remote_call(|| {
            let conn = self.conn();
            conn.query_row("SELECT id FROM users WHERE email = ?1", [email], |row| {
                row.get::<_, String>(0)
            })
            .optional()
            .map(|id| id.map(UserRef))
            .map_err(Error::from)
        })
    }

    async fn get_grocery_list_ref(&self, user: &UserRef) -> Result<Option<ListRef>> {
        remote_call(|| {
            let conn = self.conn();
            conn.query_row(
                "SELECT id FROM grocery_lists WHERE user = ?1 LIMIT 1",
                [user.as_str()],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map(|id| id.map(ListRef))
            .map_err(Error::from)
        })
    }

    async fn query_items(&self, list: &ListRef) -> Result<Vec<RemoteItem>> {
        remote_call(|| query_items_in(&self.conn(), list))
    }

    async fn subscribe_items(&self, list: &ListRef) -> Result<Receiver<Vec<RemoteItem>>> {
        remote_call(|| {
            let current = query_items_in(&self.conn(), list)?;
            Ok(self.watchers.subscribe(list, current))
        })
    }

    async fn find_item(&self, list: &ListRef, store_id: &str, name: &str) -> Result<Option<RemoteItem>> {
        remote_call(|| {
            let conn = self.conn();
            let sql = format!(
                "SELECT {REMOTE_ITEM_COLUMNS} FROM items
                 WHERE grocery_list = ?1 AND store_id = ?2 AND name = ?3
                 ORDER BY date_added ASC LIMIT 1"
            );
            conn.query_row(
                &sql,
                rusqlite::params![list.as_str(), store_id, name],
                map_remote_item,
            )
            .optional()
            .map_err(Error::from)
        })
    }

    async fn upsert_item_quantity(&self, item: &ItemRef, quantity: u32) -> Result<()> {
        remote_call(|| {
            let conn = self.conn();
            let updated = conn.execute(
                "UPDATE items SET quantity = ?1 WHERE id = ?2",
                rusqlite::params![quantity, item.as_str()],
            )?;
            if updated == 0 {
                return Err(Error::Remote(format!("no item document {item}")));
            }
            if let Some(list) = Self::list_of_item(&conn, item)? {
                self.publish(&conn, &list)?;
            }
            Ok(())
        })
    }

    async fn insert_item(
        &self,
        list: &ListRef,
        store_id: &str,
        name: &str,
        price: &str,
        quantity: u32,
    ) -> Result<ItemRef> {
        remote_call(|| {
            let conn = self.conn();
            let id = ItemRef(new_doc_id("item"));
            conn.execute(
                "INSERT INTO items (id, grocery_list, store_id, name, price, quantity, favorited, date_added)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
                rusqlite::params![
                    id.as_str(),
                    list.as_str(),
                    store_id,
                    name,
                    price,
                    quantity,
                    chrono::Utc::now().timestamp_millis(),
                ],
            )?;
            self.publish(&conn, list)?;
            Ok(id)
        })
    }

    async fn delete_item(&self, list: &ListRef, store_id: &str, name: &str) -> Result<bool> {
        remote_call(|| {
            let conn = self.conn();
            let deleted = conn.execute(
                "DELETE FROM items WHERE id = (
                    SELECT id FROM items
                    WHERE grocery_list = ?1 AND store_id = ?2 AND name = ?3
                    ORDER BY date_added ASC LIMIT 1
                 )",
                rusqlite::params![list.as_str(), store_id, name],
            )?;
            if deleted > 0 {
                self.publish(&conn, list)?;
            }
            Ok(deleted > 0)
        })
    }

    async fn delete_item_by_id(&self, item: &ItemRef) -> Result<bool> {
        remote_call(|| {
            let conn = self.conn();
            let list = Self::list_of_item(&conn, item)?;
            let deleted = conn.execute("DELETE FROM items WHERE id = ?1", [item.as_str()])?;
            if let Some(list) = list {
                self.publish(&conn, &list)?;
            }
            Ok(deleted > 0)
        })
    }

    async fn update_price(&self, item: &ItemRef, price: &str) -> Result<()> {
        remote_call(|| {
            let conn = self.conn();
            let updated = conn.execute(
                "UPDATE items SET price = ?1 WHERE id = ?2",
                rusqlite::params![price, item.as_str()],
            )?;
            if updated == 0 {
                return Err(Error::Remote(format!("no item document {item}")));
            }
            if let Some(list) = Self::list_of_item(&conn, item)? {
                self.publish(&conn, &list)?;
            }
            Ok(())
        })
    }

    async fn create_user(&self, email: &str) -> Result<UserRef> {
        remote_call(|| {
            let conn = self.conn();
            let id = UserRef(new_doc_id("user"));
            conn.execute(
                "INSERT INTO users (id, email, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![id.as_str(), email, chrono::Utc::now().timestamp_millis()],
            )?;
            Ok(id)
        })
    }

    async fn create_grocery_list(&self, user: &UserRef) -> Result<ListRef> {
        remote_call(|| {
            let conn = self.conn();
            let id = ListRef(new_doc_id("list"));
            conn.execute(
                "INSERT INTO grocery_lists (id, user, favorited) VALUES (?1, ?2, 0)",
                rusqlite::params![id.as_str(), user.as_str()],
            )?;
            Ok(id)
        })
    }

    async fn create_expenses(&self, user: &UserRef) -> Result<()> {
        remote_call(|| {
            let mut conn = self.conn();
            let tx = conn.transaction()?;
            for month in 1..=12 {
                tx.execute(
                    "INSERT OR IGNORE INTO expenses (user, month, amount) VALUES (?1, ?2, 0)",
                    rusqlite::params![user.as_str(), month],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    async fn add_expense(&self, user: &UserRef, month: u32, amount: f64) -> Result<()> {
        remote_call(|| {
            validate_month(month)?;
            let conn = self.conn();
            let updated = conn.execute(
                "UPDATE expenses SET amount = amount + ?1 WHERE user = ?2 AND month = ?3",
                rusqlite::params![amount, user.as_str(), month],
            )?;
            if updated == 0 {
                return Err(Error::Remote(format!("no expenses document for {user}")));
            }
            Ok(())
        })
    }

    async fn get_expenses(&self, user: &UserRef) -> Result<Option<Expenses>> {
        remote_call(|| {
            let conn = self.conn();
            let mut stmt = conn.prepare("SELECT month, amount FROM expenses WHERE user = ?1")?;
            let rows = stmt
                .query_map([user.as_str()], |row| Ok((row.get::<_, u32>(0)?, row.get::<_, f64>(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            if rows.is_empty() {
                return Ok(None);
            }

            let mut expenses = Expenses::default();
            for (month, amount) in rows {
                if let Ok(index) = validate_month(month) {
                    expenses.months[index] = amount;
                }
            }
            Ok(Some(expenses))
        })
    }
}

impl AuthProvider for SqliteRemote {
    async fn create_account(&self, email: &str, password: &str) -> Result<()> {
        remote_call(|| {
            let conn = self.conn();
            let salt = new_salt();
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO credentials (email, salt, password_hash) VALUES (?1, ?2, ?3)",
                rusqlite::params![email, salt, hash_password(&salt, password)],
            )?;
            if inserted == 0 {
                return Err(Error::Auth(format!("an account already exists for {email}")));
            }
            Ok(())
        })
    }

    async fn verify_password(&self, email: &str, password: &str) -> Result<bool> {
        remote_call(|| {
            let conn = self.conn();
            let stored: Option<(String, String)> = conn
                .query_row(
                    "SELECT salt, password_hash FROM credentials WHERE email = ?1",
                    [email],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            Ok(stored.is_some_and(|(salt, hash)| hash_password(&salt, password) == hash))
        })
    }
}
