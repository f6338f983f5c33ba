//! Grocery list and favorites operations.
//!
//! [`GroceryService`] ties a [`Session`] to the local cache and the remote
//! store. The session's [`ReadMode`] decides the source of truth:
//!
//! - **Online**: writes go to the remote store first, then the cache is
//!   updated with the pending flag cleared. Reads come from the remote store.
//! - **Offline**: writes only touch the cache and leave records pending for
//!   the reconciler. Reads come from the cache.
//!
//! [`ReadMode`]: crate::session::ReadMode

use crate::error::{Error, Result};
use crate::model::{format_price, grocery_total, parse_price, CachedItem, ItemRef, Product, RemoteItem};
use crate::remote::RemoteStore;
use crate::session::{RemovalKind, RemovedItem, Session};
use crate::storage::SqliteStorage;
use chrono::Datelike;
use serde::Serialize;
use tokio::sync::watch::Receiver;
use tracing::{debug, info, warn};

/// One line of the grocery list as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroceryLine {
    /// Remote document id online, local cache id offline
    pub id: String,
    pub name: String,
    pub price: String,
    pub quantity: u32,
    pub store_id: String,
    /// Offline only: change not pushed yet
    pub pending: bool,
}

impl From<RemoteItem> for GroceryLine {
    fn from(item: RemoteItem) -> Self {
        Self {
            id: item.id.0,
            name: item.name,
            price: item.price,
            quantity: item.quantity,
            store_id: item.store_id,
            pending: false,
        }
    }
}

impl From<CachedItem> for GroceryLine {
    fn from(item: CachedItem) -> Self {
        Self {
            id: item.id.to_string(),
            name: item.name,
            price: item.price,
            quantity: 1,
            store_id: item.store_id,
            pending: item.pending_sync,
        }
    }
}

/// Total price of a set of lines.
#[must_use]
pub fn lines_total(lines: &[GroceryLine]) -> f64 {
    grocery_total(lines.iter().map(|l| (l.price.as_str(), l.quantity)))
}

/// Which cached products to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheFilter {
    All,
    Favorites,
}

/// Result of adding a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddOutcome {
    pub name: String,
    /// Quantity on the remote list after the add (offline: 1)
    pub quantity: u32,
    /// Stored offline, waiting for sync
    pub pending: bool,
}

/// Grocery list operations for one signed-in session.
pub struct GroceryService<'a, R: RemoteStore> {
    remote: &'a R,
    cache: &'a mut SqliteStorage,
    session: &'a mut Session,
}

impl<'a, R: RemoteStore> GroceryService<'a, R> {
    pub fn new(remote: &'a R, cache: &'a mut SqliteStorage, session: &'a mut Session) -> Self {
        Self {
            remote,
            cache,
            session,
        }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        self.session
    }

    // ==================
    // Grocery List
    // ==================

    /// Add `quantity` of a product to the list.
    ///
    /// Online, a repeat add of the same (store, name) increments the remote
    /// quantity instead of creating a second document.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote store or the cache fails.
    pub async fn add_product(&mut self, product: &Product, store_id: &str, quantity: u32) -> Result<AddOutcome> {
        if quantity == 0 {
            return Err(Error::InvalidArgument("quantity must be at least 1".to_string()));
        }

        if !self.session.is_online() {
            self.cache.mark_listed(self.session.cache_user(), product, store_id)?;
            info!(item = %product.name, "Added to offline grocery list");
            return Ok(AddOutcome {
                name: product.name.clone(),
                quantity: 1,
                pending: true,
            });
        }

        let list = &self.session.list_id;
        let new_quantity = match self.remote.find_item(list, store_id, &product.name).await? {
            Some(existing) => {
                let total = existing.quantity.saturating_add(quantity);
                self.remote.upsert_item_quantity(&existing.id, total).await?;
                debug!(item = %product.name, quantity = total, "Updated quantity");
                total
            }
            None => {
                self.remote
                    .insert_item(list, store_id, &product.name, &product.price, quantity)
                    .await?;
                debug!(item = %product.name, quantity, "Added new item");
                quantity
            }
        };

        let cached = self.cache.mark_listed(self.session.cache_user(), product, store_id)?;
        self.cache.set_pending_sync(cached.id, false)?;

        info!(item = %product.name, quantity = new_quantity, "Added to grocery list");
        Ok(AddOutcome {
            name: product.name.clone(),
            quantity: new_quantity,
            pending: false,
        })
    }

    /// Take a product off the list by (store, name).
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` when there is nothing to remove.
    pub async fn remove_product(&mut self, name: &str, store_id: &str) -> Result<()> {
        if self.session.is_online() {
            let deleted = self
                .remote
                .delete_item(&self.session.list_id, store_id, name)
                .await?;
            if !deleted {
                return Err(Error::ItemNotFound {
                    name: name.to_string(),
                });
            }
            let user = self.session.cache_user();
            if let Some(cached) = self.cache.mark_unlisted(user, name, Some(store_id))? {
                self.cache.set_pending_sync(cached.id, false)?;
            }
        } else if self
            .cache
            .mark_unlisted(self.session.cache_user(), name, Some(store_id))?
            .is_none()
        {
            return Err(Error::ItemNotFound {
                name: name.to_string(),
            });
        }

        info!(item = name, "Removed from grocery list");
        Ok(())
    }

    /// Current list contents from the session's source of truth.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub async fn load_list(&self) -> Result<Vec<GroceryLine>> {
        if self.session.is_online() {
            let items = self.remote.query_items(&self.session.list_id).await?;
            Ok(items.into_iter().map(GroceryLine::from).collect())
        } else {
            let items = self.cache.list_in_grocery_list(self.session.cache_user())?;
            Ok(items.into_iter().map(GroceryLine::from).collect())
        }
    }

    /// Live view of the remote list (online sessions only).
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` in offline mode, or the store's error.
    pub async fn watch_list(&self) -> Result<Receiver<Vec<RemoteItem>>> {
        if !self.session.is_online() {
            return Err(Error::InvalidArgument(
                "live list updates need online mode".to_string(),
            ));
        }
        self.remote.subscribe_items(&self.session.list_id).await
    }

    async fn find_line(&self, item_id: &str) -> Result<GroceryLine> {
        self.load_list()
            .await?
            .into_iter()
            .find(|line| line.id == item_id)
            .ok_or_else(|| Error::ItemNotFound {
                name: item_id.to_string(),
            })
    }

    fn remember(&mut self, line: &GroceryLine, kind: RemovalKind) {
        self.session.last_removed = Some(RemovedItem {
            item_id: ItemRef(line.id.clone()),
            name: line.name.clone(),
            price: line.price.clone(),
            quantity: line.quantity,
            store_id: line.store_id.clone(),
            kind,
        });
    }

    /// Set an item's quantity; zero deletes it. The previous quantity is
    /// kept for [`Self::restore_recently_deleted`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` offline (the cache does not track
    /// quantities), `ItemNotFound`, or the store's error.
    pub async fn update_quantity(&mut self, item_id: &str, quantity: u32) -> Result<()> {
        if !self.session.is_online() {
            return Err(Error::InvalidArgument(
                "quantities can only be changed in online mode".to_string(),
            ));
        }
        if quantity == 0 {
            return self.delete_item(item_id).await;
        }

        let line = self.find_line(item_id).await?;
        self.remember(&line, RemovalKind::QuantityChanged);
        self.remote
            .upsert_item_quantity(&ItemRef(line.id.clone()), quantity)
            .await?;
        info!(item = %line.name, from = line.quantity, to = quantity, "Quantity changed");
        Ok(())
    }

    /// Delete a whole line, remembering it for undo.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` or the store's error.
    pub async fn delete_item(&mut self, item_id: &str) -> Result<()> {
        let line = self.find_line(item_id).await?;
        self.remember(&line, RemovalKind::Deleted);

        if self.session.is_online() {
            self.remote.delete_item_by_id(&ItemRef(line.id.clone())).await?;
            let user = self.session.cache_user();
            if let Some(cached) = self.cache.mark_unlisted(user, &line.name, Some(&line.store_id))? {
                self.cache.set_pending_sync(cached.id, false)?;
            }
        } else {
            self.cache
                .mark_unlisted(self.session.cache_user(), &line.name, Some(&line.store_id))?;
        }

        info!(item = %line.name, "Deleted from grocery list");
        Ok(())
    }

    /// Undo the last delete or quantity change.
    ///
    /// Returns the restored snapshot, or `None` when there is nothing to undo.
    ///
    /// # Errors
    ///
    /// Returns the store's error; the snapshot is kept so undo can be retried.
    pub async fn restore_recently_deleted(&mut self) -> Result<Option<RemovedItem>> {
        let Some(removed) = self.session.last_removed.clone() else {
            return Ok(None);
        };

        match removed.kind {
            RemovalKind::QuantityChanged => {
                if !self.session.is_online() {
                    return Err(Error::InvalidArgument(
                        "quantities can only be changed in online mode".to_string(),
                    ));
                }
                self.remote
                    .upsert_item_quantity(&removed.item_id, removed.quantity)
                    .await?;
            }
            RemovalKind::Deleted => {
                let product = Product::new(removed.name.clone(), removed.price.clone());
                if self.session.is_online() {
                    self.remote
                        .insert_item(
                            &self.session.list_id,
                            &removed.store_id,
                            &removed.name,
                            &removed.price,
                            removed.quantity.max(1),
                        )
                        .await?;
                    let cached = self
                        .cache
                        .mark_listed(self.session.cache_user(), &product, &removed.store_id)?;
                    self.cache.set_pending_sync(cached.id, false)?;
                } else {
                    self.cache
                        .mark_listed(self.session.cache_user(), &product, &removed.store_id)?;
                }
            }
        }

        self.session.last_removed = None;
        info!(item = %removed.name, "Restored");
        Ok(Some(removed))
    }

    /// Check an item off: add its unit price to this month's expenses, then
    /// delete it.
    ///
    /// Returns the amount recorded.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` offline (expenses live remotely only),
    /// `ItemNotFound`, or the store's error.
    pub async fn check_item(&mut self, item_id: &str) -> Result<f64> {
        if !self.session.is_online() {
            return Err(Error::InvalidArgument(
                "checking items off needs online mode; use `remove` while offline".to_string(),
            ));
        }

        let line = self.find_line(item_id).await?;
        let amount = parse_price(&format_price(parse_price(&line.price)));
        let month = chrono::Local::now().month();
        self.remote
            .add_expense(&self.session.user_id, month, amount)
            .await?;
        self.delete_item(item_id).await?;

        info!(item = %line.name, amount, month, "Checked off");
        Ok(amount)
    }

    // ==================
    // Favorites & Cache
    // ==================

    /// Mark a product as favorite.
    ///
    /// A newly cached favorite starts with its grocery-list flag taken from
    /// the remote list when online.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache or the remote lookup fails.
    pub async fn add_favorite(&mut self, product: &Product, store_id: &str) -> Result<CachedItem> {
        let user = self.session.cache_user().to_string();
        if self.cache.lookup(&user, &product.name)?.is_some() {
            return self.cache.set_favorite(&user, product, store_id, false);
        }

        let listed = if self.session.is_online() {
            match self.remote.query_items(&self.session.list_id).await {
                Ok(items) => items.iter().any(|item| item.name == product.name),
                Err(e) => {
                    warn!(error = %e, "Could not check remote list for new favorite");
                    false
                }
            }
        } else {
            false
        };

        self.cache.set_favorite(&user, product, store_id, listed)
    }

    /// Clear a favorite.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` when the product is not cached.
    pub fn remove_favorite(&mut self, name: &str) -> Result<CachedItem> {
        self.cache
            .unset_favorite(self.session.cache_user(), name)?
            .ok_or_else(|| Error::ItemNotFound {
                name: name.to_string(),
            })
    }

    /// Remember search results for offline browsing.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache write fails.
    pub fn cache_products(&mut self, products: &[Product], store_id: &str) -> Result<usize> {
        for product in products {
            self.cache
                .cache_product(self.session.cache_user(), product, store_id)?;
        }
        Ok(products.len())
    }

    /// Cached products, all or favorites only.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache read fails.
    pub fn cached_products(&self, filter: CacheFilter) -> Result<Vec<Product>> {
        let items = match filter {
            CacheFilter::All => self.cache.list_all(self.session.cache_user())?,
            CacheFilter::Favorites => self.cache.list_favorites(self.session.cache_user())?,
        };
        Ok(items
            .into_iter()
            .map(|item| Product::new(item.name, item.price))
            .collect())
    }

    /// Drop cached products that are neither favorited nor listed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn clear_cached_products(&mut self) -> Result<usize> {
        self.cache.clear_browsing_cache(self.session.cache_user())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::register;
    use crate::remote::MemoryRemote;
    use crate::session::ReadMode;

    async fn setup() -> (MemoryRemote, SqliteStorage, Session) {
        let remote = MemoryRemote::new();
        let session = register(&remote, "a@example.com", "hunter22", "hunter22")
            .await
            .unwrap();
        (remote, SqliteStorage::open_memory().unwrap(), session)
    }

    #[tokio::test]
    async fn test_online_add_increments_quantity() {
        let (remote, mut cache, mut session) = setup().await;
        let mut service = GroceryService::new(&remote, &mut cache, &mut session);
        let milk = Product::new("Milk", "3.49");

        service.add_product(&milk, "s1", 1).await.unwrap();
        let outcome = service.add_product(&milk, "s1", 2).await.unwrap();
        assert_eq!(outcome.quantity, 3);
        assert!(!outcome.pending);

        let lines = service.load_list().await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 3);

        // Same name at another store is a separate line
        service.add_product(&milk, "s2", 1).await.unwrap();
        assert_eq!(service.load_list().await.unwrap().len(), 2);

        drop(service);
        let cached = cache.lookup(session.cache_user(), "Milk").unwrap().unwrap();
        assert!(cached.in_grocery_list);
        assert!(!cached.pending_sync);
    }

    #[tokio::test]
    async fn test_offline_add_stays_local_and_pending() {
        let (remote, mut cache, mut session) = setup().await;
        session.mode = ReadMode::Offline;
        let mut service = GroceryService::new(&remote, &mut cache, &mut session);

        let outcome = service
            .add_product(&Product::new("Eggs", "2.00"), "s1", 1)
            .await
            .unwrap();
        assert!(outcome.pending);

        let lines = service.load_list().await.unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].pending);
        assert!(remote.all_items().is_empty());
    }

    #[tokio::test]
    async fn test_remove_missing_item() {
        let (remote, mut cache, mut session) = setup().await;
        let mut service = GroceryService::new(&remote, &mut cache, &mut session);
        let err = service.remove_product("Ghost", "s1").await.unwrap_err();
        assert!(matches!(err, Error::ItemNotFound { .. }));
    }

    #[tokio::test]
    async fn test_total_of_list() {
        let (remote, mut cache, mut session) = setup().await;
        let mut service = GroceryService::new(&remote, &mut cache, &mut session);
        service.add_product(&Product::new("A", "2.50"), "s", 3).await.unwrap();
        service.add_product(&Product::new("B", "1.00"), "s", 2).await.unwrap();
        service.add_product(&Product::new("C", "n/a"), "s", 5).await.unwrap();

        let lines = service.load_list().await.unwrap();
        assert!((lines_total(&lines) - 9.50).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_delete_and_undo() {
        let (remote, mut cache, mut session) = setup().await;
        let mut service = GroceryService::new(&remote, &mut cache, &mut session);
        service.add_product(&Product::new("Bread", "2.79"), "s", 2).await.unwrap();
        let id = service.load_list().await.unwrap()[0].id.clone();

        service.delete_item(&id).await.unwrap();
        assert!(service.load_list().await.unwrap().is_empty());

        let restored = service.restore_recently_deleted().await.unwrap().unwrap();
        assert_eq!(restored.kind, RemovalKind::Deleted);
        let lines = service.load_list().await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 2);

        assert!(service.restore_recently_deleted().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_quantity_change_and_undo() {
        let (remote, mut cache, mut session) = setup().await;
        let mut service = GroceryService::new(&remote, &mut cache, &mut session);
        service.add_product(&Product::new("Bread", "2.79"), "s", 2).await.unwrap();
        let id = service.load_list().await.unwrap()[0].id.clone();

        service.update_quantity(&id, 5).await.unwrap();
        assert_eq!(service.load_list().await.unwrap()[0].quantity, 5);

        service.restore_recently_deleted().await.unwrap();
        assert_eq!(service.load_list().await.unwrap()[0].quantity, 2);

        service.update_quantity(&id, 0).await.unwrap();
        assert!(service.load_list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_check_item_records_expense() {
        let (remote, mut cache, mut session) = setup().await;
        let user = session.user_id.clone();
        let mut service = GroceryService::new(&remote, &mut cache, &mut session);
        service.add_product(&Product::new("Cheese", "4.25"), "s", 2).await.unwrap();
        let id = service.load_list().await.unwrap()[0].id.clone();

        let amount = service.check_item(&id).await.unwrap();
        assert!((amount - 4.25).abs() < f64::EPSILON);
        assert!(service.load_list().await.unwrap().is_empty());

        let expenses = remote.get_expenses(&user).await.unwrap().unwrap();
        assert!((expenses.total() - 4.25).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_favorites_do_not_touch_list_flag() {
        let (remote, mut cache, mut session) = setup().await;
        let mut service = GroceryService::new(&remote, &mut cache, &mut session);
        let milk = Product::new("Milk", "3.49");

        service.add_product(&milk, "s", 1).await.unwrap();
        let fav = service.add_favorite(&milk, "s").await.unwrap();
        assert!(fav.favorited && fav.in_grocery_list);

        let unfav = service.remove_favorite("Milk").unwrap();
        assert!(!unfav.favorited && unfav.in_grocery_list);

        // New favorite picks up the remote list membership
        remote
            .insert_item(&service.session().list_id.clone(), "s", "Jam", "3.00", 1)
            .await
            .unwrap();
        let jam = service.add_favorite(&Product::new("Jam", "3.00"), "s").await.unwrap();
        assert!(jam.in_grocery_list);
    }

    #[tokio::test]
    async fn test_watch_list_sees_new_items() {
        let (remote, mut cache, mut session) = setup().await;
        let mut service = GroceryService::new(&remote, &mut cache, &mut session);
        let mut rx = service.watch_list().await.unwrap();
        assert!(rx.borrow().is_empty());

        service.add_product(&Product::new("Milk", "3.49"), "s", 1).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow()[0].name, "Milk");

        service.session.mode = ReadMode::Offline;
        assert!(service.watch_list().await.is_err());
    }

    #[tokio::test]
    async fn test_cached_products_and_clear() {
        let (remote, mut cache, mut session) = setup().await;
        let mut service = GroceryService::new(&remote, &mut cache, &mut session);
        service
            .cache_products(&[Product::new("A", "1.00"), Product::new("B", "2.00")], "s")
            .unwrap();
        service.add_favorite(&Product::new("B", "2.00"), "s").await.unwrap();

        assert_eq!(service.cached_products(CacheFilter::All).unwrap().len(), 2);
        assert_eq!(service.cached_products(CacheFilter::Favorites).unwrap().len(), 1);

        assert_eq!(service.clear_cached_products().unwrap(), 1);
        assert_eq!(service.cached_products(CacheFilter::All).unwrap().len(), 1);
    }
}
