//! One reconciliation pass: push pending cache changes to the remote store.
//!
//! For every pending record, in cache order:
//!
//! 1. Resolve the owning user's remote grocery list.
//! 2. Listed: insert a quantity-1 item unless the list already has one with
//!    the same name. Unlisted: delete the item matching (list, store, name).
//! 3. Clear the record's pending flag.
//!
//! The first error ends the pass. Records already handled stay cleared and
//! the rest stay pending, so a later pass picks up where this one stopped.
//! Both branches are idempotent, which makes re-running a pass that failed
//! after the remote write but before clearing the flag harmless.

use crate::error::{Error, Result};
use crate::model::{CachedItem, ListRef, UserRef};
use crate::remote::RemoteStore;
use crate::storage::SqliteStorage;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::types::{SyncOutcome, SyncReport, SyncStats};

/// Pushes pending cache records to the remote store.
pub struct Reconciler<'a, R: RemoteStore> {
    remote: &'a R,
    cache: &'a mut SqliteStorage,
    lists: HashMap<String, ListRef>,
}

impl<'a, R: RemoteStore> Reconciler<'a, R> {
    pub fn new(remote: &'a R, cache: &'a mut SqliteStorage) -> Self {
        Self {
            remote,
            cache,
            lists: HashMap::new(),
        }
    }

    /// Run a full pass over every pending record.
    pub async fn run(&mut self) -> SyncReport {
        let mut stats = SyncStats::default();

        let pending = match self.cache.list_pending_sync() {
            Ok(pending) => pending,
            Err(e) => return Self::finish(stats, Err(e)),
        };
        stats.pending = pending.len();
        if pending.is_empty() {
            debug!("Nothing to sync");
            return Self::finish(stats, Ok(()));
        }

        info!(pending = stats.pending, "Starting sync pass");
        for item in &pending {
            if let Err(e) = self.push(item, &mut stats).await {
                warn!(item = %item.name, error = %e, "Sync pass stopped");
                return Self::finish(stats, Err(e));
            }
        }
        Self::finish(stats, Ok(()))
    }

    fn finish(stats: SyncStats, result: Result<()>) -> SyncReport {
        let outcome = match result {
            Ok(()) => {
                if stats.pending > 0 {
                    info!(
                        inserted = stats.inserted,
                        deleted = stats.deleted,
                        cleared = stats.cleared,
                        "Sync pass complete"
                    );
                }
                SyncOutcome::Success
            }
            Err(e) if e.is_retryable() => SyncOutcome::Retry(e.to_string()),
            Err(e) => SyncOutcome::Failure(e.to_string()),
        };
        SyncReport { outcome, stats }
    }

    async fn list_for(&mut self, user_id: &str) -> Result<ListRef> {
        if let Some(list) = self.lists.get(user_id) {
            return Ok(list.clone());
        }
        let list = self
            .remote
            .get_grocery_list_ref(&UserRef::from(user_id))
            .await?
            .ok_or_else(|| Error::GroceryListNotFound {
                user_id: user_id.to_string(),
            })?;
        self.lists.insert(user_id.to_string(), list.clone());
        Ok(list)
    }

    async fn push(&mut self, item: &CachedItem, stats: &mut SyncStats) -> Result<()> {
        let list = self.list_for(&item.user_id).await?;

        if item.in_grocery_list {
            let items = self.remote.query_items(&list).await?;
            if items.iter().any(|remote| remote.name == item.name) {
                debug!(item = %item.name, "Already on remote list");
                stats.already_present += 1;
            } else {
                self.remote
                    .insert_item(&list, &item.store_id, &item.name, &item.price, 1)
                    .await?;
                debug!(item = %item.name, "Inserted remote item");
                stats.inserted += 1;
            }
        } else if self
            .remote
            .delete_item(&list, &item.store_id, &item.name)
            .await?
        {
            debug!(item = %item.name, "Deleted remote item");
            stats.deleted += 1;
        } else {
            debug!(item = %item.name, "Nothing to delete remotely");
            stats.already_absent += 1;
        }

        self.cache.set_pending_sync(item.id, false)?;
        stats.cleared += 1;
        Ok(())
    }
}

/// Run a single pass.
pub async fn reconcile<R: RemoteStore>(remote: &R, cache: &mut SqliteStorage) -> SyncReport {
    Reconciler::new(remote, cache).run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::register;
    use crate::model::Product;
    use crate::remote::MemoryRemote;
    use crate::session::Session;

    async fn setup() -> (MemoryRemote, SqliteStorage, Session) {
        let remote = MemoryRemote::new();
        let session = register(&remote, "a@example.com", "hunter22", "hunter22")
            .await
            .unwrap();
        (remote, SqliteStorage::open_memory().unwrap(), session)
    }

    #[tokio::test]
    async fn test_empty_pass_succeeds() {
        let (remote, mut cache, _) = setup().await;
        let report = reconcile(&remote, &mut cache).await;
        assert_eq!(report.outcome, SyncOutcome::Success);
        assert_eq!(report.stats, SyncStats::default());
    }

    #[tokio::test]
    async fn test_repeated_passes_leave_one_remote_item() {
        let (remote, mut cache, session) = setup().await;
        let user = session.cache_user();
        cache.mark_listed(user, &Product::new("Milk", "3.49"), "s1").unwrap();

        for _ in 0..3 {
            let report = reconcile(&remote, &mut cache).await;
            assert!(report.outcome.is_success());
            // Mark pending again as if the flag had not been cleared
            let item = cache.lookup(user, "Milk").unwrap().unwrap();
            cache.set_pending_sync(item.id, true).unwrap();
        }

        let items = remote.query_items(&session.list_id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 1);
        assert_eq!(items[0].store_id, "s1");
    }

    #[tokio::test]
    async fn test_unlisted_record_deletes_remote_item() {
        let (remote, mut cache, session) = setup().await;
        let user = session.cache_user();
        remote
            .insert_item(&session.list_id, "s1", "Eggs", "2.00", 4)
            .await
            .unwrap();
        cache.mark_listed(user, &Product::new("Eggs", "2.00"), "s1").unwrap();
        cache.mark_unlisted(user, "Eggs", None).unwrap();

        let report = reconcile(&remote, &mut cache).await;
        assert!(report.outcome.is_success());
        assert_eq!(report.stats.deleted, 1);
        assert!(remote.query_items(&session.list_id).await.unwrap().is_empty());

        // Re-running with nothing remote is still a success
        let item = cache.lookup(user, "Eggs").unwrap().unwrap();
        cache.set_pending_sync(item.id, true).unwrap();
        let report = reconcile(&remote, &mut cache).await;
        assert!(report.outcome.is_success());
        assert_eq!(report.stats.already_absent, 1);
        assert_eq!(cache.count_pending_sync(None).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_existing_remote_name_is_not_duplicated() {
        let (remote, mut cache, session) = setup().await;
        remote
            .insert_item(&session.list_id, "other-store", "Milk", "3.00", 2)
            .await
            .unwrap();
        cache
            .mark_listed(session.cache_user(), &Product::new("Milk", "3.49"), "s1")
            .unwrap();

        let report = reconcile(&remote, &mut cache).await;
        assert_eq!(report.stats.already_present, 1);
        let items = remote.query_items(&session.list_id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_partial_failure_requests_retry() {
        let (remote, mut cache, session) = setup().await;
        let user = session.cache_user();
        for name in ["A", "B", "C"] {
            cache.mark_listed(user, &Product::new(name, "1.00"), "s").unwrap();
        }

        // First record: list lookup + query + insert = 3 calls; then fail
        remote.fail_after(3);
        let report = reconcile(&remote, &mut cache).await;
        assert!(matches!(report.outcome, SyncOutcome::Retry(_)));
        assert_eq!(report.stats.cleared, 1);
        assert_eq!(report.stats.remaining(), 2);
        assert_eq!(cache.count_pending_sync(Some(user)).unwrap(), 2);

        remote.set_available(true);
        let report = reconcile(&remote, &mut cache).await;
        assert!(report.outcome.is_success());
        assert_eq!(cache.count_pending_sync(None).unwrap(), 0);
        assert_eq!(remote.query_items(&session.list_id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unreachable_remote_leaves_everything_pending() {
        let (remote, mut cache, session) = setup().await;
        cache
            .mark_listed(session.cache_user(), &Product::new("A", "1.00"), "s")
            .unwrap();
        remote.set_available(false);

        let report = reconcile(&remote, &mut cache).await;
        assert!(matches!(report.outcome, SyncOutcome::Retry(_)));
        assert_eq!(cache.count_pending_sync(None).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_records_for_multiple_users() {
        let (remote, mut cache, alice) = setup().await;
        let bob = register(&remote, "b@example.com", "hunter22", "hunter22")
            .await
            .unwrap();
        cache.mark_listed(alice.cache_user(), &Product::new("A", "1"), "s").unwrap();
        cache.mark_listed(bob.cache_user(), &Product::new("B", "1"), "s").unwrap();

        let report = reconcile(&remote, &mut cache).await;
        assert!(report.outcome.is_success());
        assert_eq!(remote.query_items(&alice.list_id).await.unwrap()[0].name, "A");
        assert_eq!(remote.query_items(&bob.list_id).await.unwrap()[0].name, "B");
    }

    #[tokio::test]
    async fn test_missing_list_is_not_cleared() {
        let (remote, mut cache, _) = setup().await;
        cache
            .mark_listed("ghost-user", &Product::new("A", "1.00"), "s")
            .unwrap();
        let report = reconcile(&remote, &mut cache).await;
        assert!(!report.outcome.is_success());
        assert_eq!(cache.count_pending_sync(None).unwrap(), 1);
    }
}
