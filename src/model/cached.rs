//! Cached grocery item model.
//!
//! A `CachedItem` is the on-device copy of a product the user has looked at,
//! favorited, or put on their grocery list. The `pending_sync` flag marks a
//! mutation that has not been pushed to the remote store yet.

use serde::{Deserialize, Serialize};

/// A record in the local cache table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedItem {
    /// Auto-assigned local key
    pub id: i64,

    /// Remote user document id of the owner
    pub user_id: String,

    /// Product name (lookup key together with `user_id`)
    pub name: String,

    /// Price as text, e.g. "2.49"
    pub price: String,

    /// Shown in the favorites view
    pub favorited: bool,

    /// Currently on the user's grocery list
    pub in_grocery_list: bool,

    /// Catalog store the price came from
    pub store_id: String,

    /// Last modification timestamp (Unix milliseconds)
    pub last_modified: i64,

    /// Local change not yet reflected remotely
    pub pending_sync: bool,
}

/// Fields for inserting a new cache record.
///
/// The id and timestamp are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCachedItem {
    pub user_id: String,
    pub name: String,
    pub price: String,
    pub favorited: bool,
    pub in_grocery_list: bool,
    pub store_id: String,
    pub pending_sync: bool,
}

impl NewCachedItem {
    /// A plain cached product: not favorited, not listed, nothing to sync.
    #[must_use]
    pub fn product(user_id: &str, name: &str, price: &str, store_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            name: name.to_string(),
            price: price.to_string(),
            favorited: false,
            in_grocery_list: false,
            store_id: store_id.to_string(),
            pending_sync: false,
        }
    }

    #[must_use]
    pub fn favorited(mut self, favorited: bool) -> Self {
        self.favorited = favorited;
        self
    }

    #[must_use]
    pub fn in_grocery_list(mut self, listed: bool) -> Self {
        self.in_grocery_list = listed;
        self
    }

    #[must_use]
    pub fn pending(mut self, pending: bool) -> Self {
        self.pending_sync = pending;
        self
    }
}
