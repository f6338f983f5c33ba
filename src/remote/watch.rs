//! Live item subscriptions.

use crate::model::{ListRef, RemoteItem};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;

/// Per-list `watch` channels shared by the remote store implementations.
///
/// Stores call [`ItemWatchers::publish`] with the fresh item set after each
/// write; subscribers always see the latest snapshot.
#[derive(Debug, Default)]
pub struct ItemWatchers {
    senders: Mutex<HashMap<ListRef, watch::Sender<Vec<RemoteItem>>>>,
}

impl ItemWatchers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn senders(&self) -> MutexGuard<'_, HashMap<ListRef, watch::Sender<Vec<RemoteItem>>>> {
        self.senders
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Subscribe to a list.
    ///
    /// A list without live receivers gets a fresh channel seeded with `current`.
    pub fn subscribe(&self, list: &ListRef, current: Vec<RemoteItem>) -> watch::Receiver<Vec<RemoteItem>> {
        let mut senders = self.senders();
        if let Some(sender) = senders.get(list).filter(|s| s.receiver_count() > 0) {
            return sender.subscribe();
        }
        let (sender, receiver) = watch::channel(current);
        senders.insert(list.clone(), sender);
        receiver
    }

    /// Whether the list has at least one live receiver.
    ///
    /// Channels whose receivers have all been dropped are discarded.
    #[must_use]
    pub fn is_watched(&self, list: &ListRef) -> bool {
        let mut senders = self.senders();
        let live = senders.get(list).is_some_and(|s| s.receiver_count() > 0);
        if !live {
            senders.remove(list);
        }
        live
    }

    /// Push a new snapshot to the list's receivers, if any.
    pub fn publish(&self, list: &ListRef, items: Vec<RemoteItem>) {
        let mut senders = self.senders();
        if let Some(sender) = senders.get(list) {
            if sender.receiver_count() > 0 {
                sender.send_replace(items);
                return;
            }
            senders.remove(list);
        }
    }

    /// Number of lists with a live channel.
    #[must_use]
    pub fn watched_lists(&self) -> usize {
        let mut senders = self.senders();
        senders.retain(|_, sender| sender.receiver_count() > 0);
        senders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, list: &ListRef) -> RemoteItem {
        RemoteItem {
            id: name.into(),
            store_id: "s1".to_string(),
            name: name.to_string(),
            price: "1.00".to_string(),
            quantity: 1,
            favorited: false,
            date_added: 0,
            grocery_list: list.clone(),
        }
    }

    #[test]
    fn test_publish_reaches_receivers() {
        let watchers = ItemWatchers::new();
        let list = ListRef::from("list_a");
        let rx = watchers.subscribe(&list, Vec::new());
        assert!(watchers.is_watched(&list));

        watchers.publish(&list, vec![item("Milk", &list)]);
        assert_eq!(rx.borrow().len(), 1);
    }

    #[test]
    fn test_dropped_receivers_unwatch_list() {
        let watchers = ItemWatchers::new();
        let list = ListRef::from("list_a");
        let rx = watchers.subscribe(&list, Vec::new());
        drop(rx);

        assert!(!watchers.is_watched(&list));
        assert_eq!(watchers.watched_lists(), 0);

        // Publishing to nobody is a no-op
        watchers.publish(&list, vec![item("Milk", &list)]);
        assert_eq!(watchers.watched_lists(), 0);
    }

    #[test]
    fn test_resubscribe_after_drop_sees_current_items() {
        let watchers = ItemWatchers::new();
        let list = ListRef::from("list_a");
        drop(watchers.subscribe(&list, Vec::new()));

        let rx = watchers.subscribe(&list, vec![item("Eggs", &list)]);
        assert_eq!(rx.borrow()[0].name, "Eggs");
        assert_eq!(watchers.watched_lists(), 1);
    }
}
