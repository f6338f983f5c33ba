//! Remote document store access.
//!
//! The remote store is the system of record for grocery lists. It is a flat
//! document database queried with equality filters on denormalized fields
//! (`email`, `user`, `grocery_list`, `store_id`, `name`); there are no joins,
//! so finding a user's items is always user -> grocery list -> items.
//!
//! # Implementations
//!
//! - [`MemoryRemote`] - in-process collections (tests, demos)
//! - [`SqliteRemote`] - document collections in a standalone SQLite file

mod memory;
mod sqlite;
mod watch;

pub use memory::MemoryRemote;
pub use sqlite::SqliteRemote;
pub use watch::ItemWatchers;

use crate::error::{Error, Result};
use crate::model::{Expenses, ItemRef, ListRef, RemoteItem, UserRef};
use std::future::Future;
use tokio::sync::watch::Receiver;

/// Operations the app issues against the remote document store.
///
/// The trait uses `impl Future` returns like the catalog client so
/// implementations can be plain `async fn`s.
pub trait RemoteStore: Send + Sync {
    /// Find the user document for an email address.
    fn get_user_ref(&self, email: &str) -> impl Future<Output = Result<Option<UserRef>>> + Send;

    /// Find the grocery list document owned by a user.
    fn get_grocery_list_ref(&self, user: &UserRef) -> impl Future<Output = Result<Option<ListRef>>> + Send;

    /// All items on a grocery list.
    fn query_items(&self, list: &ListRef) -> impl Future<Output = Result<Vec<RemoteItem>>> + Send;

    /// Live view of a list's items, updated after every write made through
    /// this handle.
    fn subscribe_items(&self, list: &ListRef) -> impl Future<Output = Result<Receiver<Vec<RemoteItem>>>> + Send;

    /// The item matching (list, store, name), if any.
    fn find_item(
        &self,
        list: &ListRef,
        store_id: &str,
        name: &str,
    ) -> impl Future<Output = Result<Option<RemoteItem>>> + Send;

    /// Overwrite an item's quantity.
    fn upsert_item_quantity(&self, item: &ItemRef, quantity: u32) -> impl Future<Output = Result<()>> + Send;

    /// Create a new line item.
    fn insert_item(
        &self,
        list: &ListRef,
        store_id: &str,
        name: &str,
        price: &str,
        quantity: u32,
    ) -> impl Future<Output = Result<ItemRef>> + Send;

    /// Delete the first item matching (list, store, name).
    ///
    /// Returns `false` when nothing matched.
    fn delete_item(&self, list: &ListRef, store_id: &str, name: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Delete an item by document id. Returns `false` when it did not exist.
    fn delete_item_by_id(&self, item: &ItemRef) -> impl Future<Output = Result<bool>> + Send;

    /// Overwrite an item's price.
    fn update_price(&self, item: &ItemRef, price: &str) -> impl Future<Output = Result<()>> + Send;

    /// Create a user document.
    fn create_user(&self, email: &str) -> impl Future<Output = Result<UserRef>> + Send;

    /// Create the grocery list document of a user.
    fn create_grocery_list(&self, user: &UserRef) -> impl Future<Output = Result<ListRef>> + Send;

    /// Create the zeroed monthly expenses document of a user.
    fn create_expenses(&self, user: &UserRef) -> impl Future<Output = Result<()>> + Send;

    /// Add an amount to one month (1-12) of a user's expenses.
    fn add_expense(&self, user: &UserRef, month: u32, amount: f64) -> impl Future<Output = Result<()>> + Send;

    /// Monthly expenses of a user, if the document exists.
    fn get_expenses(&self, user: &UserRef) -> impl Future<Output = Result<Option<Expenses>>> + Send;
}

/// Resolve the user and grocery list documents for an email address.
///
/// # Errors
///
/// Returns `UserNotFound` / `GroceryListNotFound` when a hop has no match,
/// or the store's error when a query fails.
pub async fn resolve_grocery_list<R: RemoteStore>(remote: &R, email: &str) -> Result<(UserRef, ListRef)> {
    let user = remote
        .get_user_ref(email)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            email: email.to_string(),
        })?;

    let list = remote
        .get_grocery_list_ref(&user)
        .await?
        .ok_or_else(|| Error::GroceryListNotFound {
            user_id: user.to_string(),
        })?;

    Ok((user, list))
}

/// Generate a document id with a collection prefix.
pub(crate) fn new_doc_id(prefix: &str) -> String {
    format!("{prefix}_{}", &uuid::Uuid::new_v4().simple().to_string()[..12])
}

pub(crate) fn validate_month(month: u32) -> Result<usize> {
    if (1..=12).contains(&month) {
        Ok((month - 1) as usize)
    } else {
        Err(Error::InvalidArgument(format!("month must be 1-12, got {month}")))
    }
}
