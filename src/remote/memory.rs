//! In-process remote store.
//!
//! Keeps every collection in memory behind a mutex. Besides backing the
//! test-suite it can simulate an unreachable backend: [`MemoryRemote::set_available`]
//! toggles all calls into `Error::Remote`, and [`MemoryRemote::fail_after`]
//! lets a fixed number of calls succeed before the store goes dark.

use super::{new_doc_id, validate_month, ItemWatchers, RemoteStore};
use crate::auth::{hash_password, new_salt, AuthProvider};
use crate::error::{Error, Result};
use crate::model::{Expenses, ItemRef, ListRef, RemoteItem, UserRef};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch::Receiver;

#[derive(Debug)]
struct UserDoc {
    id: UserRef,
    email: String,
}

#[derive(Debug)]
struct ListDoc {
    id: ListRef,
    user: UserRef,
}

#[derive(Debug)]
struct State {
    users: Vec<UserDoc>,
    lists: Vec<ListDoc>,
    items: Vec<RemoteItem>,
    expenses: HashMap<UserRef, Expenses>,
    credentials: HashMap<String, (String, String)>,
    available: bool,
    calls_before_failure: Option<usize>,
    calls: usize,
}

/// Remote store held entirely in memory.
#[derive(Debug)]
pub struct MemoryRemote {
    state: Mutex<State>,
    watchers: ItemWatchers,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemote {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                users: Vec::new(),
                lists: Vec::new(),
                items: Vec::new(),
                expenses: HashMap::new(),
                credentials: HashMap::new(),
                available: true,
                calls_before_failure: None,
                calls: 0,
            }),
            watchers: ItemWatchers::new(),
        }
    }

    /// Make every subsequent call succeed (`true`) or fail (`false`).
    pub fn set_available(&self, available: bool) {
        let mut state = self.raw_state();
        state.available = available;
        state.calls_before_failure = None;
    }

    /// Let `calls` more calls succeed, then fail every call after that.
    pub fn fail_after(&self, calls: usize) {
        self.raw_state().calls_before_failure = Some(calls);
    }

    /// Number of store calls made so far (successful or not).
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.raw_state().calls
    }

    /// Every item on every list (test inspection).
    #[must_use]
    pub fn all_items(&self) -> Vec<RemoteItem> {
        self.raw_state().items.clone()
    }

    fn raw_state(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Lock the state for one call, applying the availability simulation.
    fn state(&self) -> Result<MutexGuard<'_, State>> {
        let mut state = self.raw_state();
        state.calls += 1;

        if let Some(remaining) = state.calls_before_failure {
            if remaining == 0 {
                state.available = false;
            } else {
                state.calls_before_failure = Some(remaining - 1);
            }
        }

        if state.available {
            Ok(state)
        } else {
            Err(Error::Remote("remote store unreachable".to_string()))
        }
    }

    fn items_of(state: &State, list: &ListRef) -> Vec<RemoteItem> {
        state
            .items
            .iter()
            .filter(|item| &item.grocery_list == list)
            .cloned()
            .collect()
    }

    fn publish(&self, state: &State, list: &ListRef) {
        if self.watchers.is_watched(list) {
            self.watchers.publish(list, Self::items_of(state, list));
        }
    }
}

impl RemoteStore for MemoryRemote {
    async fn get_user_ref(&self, email: &str) -> Result<Option<UserRef>> {
        let state = self.state()?;
        Ok(state
            .users
            .iter()
            .find(|u| u.email == email)
            .map(|u| u.id.clone()))
    }

    async fn get_grocery_list_ref(&self, user: &UserRef) -> Result<Option<ListRef>> {
        let state = self.state()?;
        Ok(state
            .lists
            .iter()
            .find(|l| &l.user == user)
            .map(|l| l.id.clone()))
    }

    async fn query_items(&self, list: &ListRef) -> Result<Vec<RemoteItem>> {
        let state = self.state()?;
        Ok(Self::items_of(&state, list))
    }

    async fn subscribe_items(&self, list: &ListRef) -> Result<Receiver<Vec<RemoteItem>>> {
        let state = self.state()?;
        Ok(self.watchers.subscribe(list, Self::items_of(&state, list)))
    }

    async fn find_item(&self, list: &ListRef, store_id: &str, name: &str) -> Result<Option<RemoteItem>> {
        let state = self.state()?;
        Ok(state
            .items
            .iter()
            .find(|i| &i.grocery_list == list && i.store_id == store_id && i.name == name)
            .cloned())
    }

    async fn upsert_item_quantity(&self, item: &ItemRef, quantity: u32) -> Result<()> {
        let mut state = self.state()?;
        let list = {
            let doc = state
                .items
                .iter_mut()
                .find(|i| &i.id == item)
                .ok_or_else(|| Error::Remote(format!("no item document {item}")))?;
            doc.quantity = quantity;
            doc.grocery_list.clone()
        };
        self.publish(&state, &list);
        Ok(())
    }

    async fn insert_item(
        &self,
        list: &ListRef,
        store_id: &str,
        name: &str,
        price: &str,
        quantity: u32,
    ) -> Result<ItemRef> {
        let mut state = self.state()?;
        let id = ItemRef(new_doc_id("item"));
        state.items.push(RemoteItem {
            id: id.clone(),
            store_id: store_id.to_string(),
            name: name.to_string(),
            price: price.to_string(),
            quantity,
            favorited: false,
            date_added: chrono::Utc::now().timestamp_millis(),
            grocery_list: list.clone(),
        });
        self.publish(&state, list);
        Ok(id)
    }

    async fn delete_item(&self, list: &ListRef, store_id: &str, name: &str) -> Result<bool> {
        let mut state = self.state()?;
        let position = state
            .items
            .iter()
            .position(|i| &i.grocery_list == list && i.store_id == store_id && i.name == name);
        let Some(position) = position else {
            return Ok(false);
        };
        state.items.remove(position);
        self.publish(&state, list);
        Ok(true)
    }

    async fn delete_item_by_id(&self, item: &ItemRef) -> Result<bool> {
        let mut state = self.state()?;
        let Some(position) = state.items.iter().position(|i| &i.id == item) else {
            return Ok(false);
        };
        let removed = state.items.remove(position);
        self.publish(&state, &removed.grocery_list);
        Ok(true)
    }

    async fn update_price(&self, item: &ItemRef, price: &str) -> Result<()> {
        let mut state = self.state()?;
        let list = {
            let doc = state
                .items
                .iter_mut()
                .find(|i| &i.id == item)
                .ok_or_else(|| Error::Remote(format!("no item document {item}")))?;
            doc.price = price.to_string();
            doc.grocery_list.clone()
        };
        self.publish(&state, &list);
        Ok(())
    }

    async fn create_user(&self, email: &str) -> Result<UserRef> {
        let mut state = self.state()?;
        let id = UserRef(new_doc_id("user"));
        state.users.push(UserDoc {
            id: id.clone(),
            email: email.to_string(),
        });
        Ok(id)
    }

    async fn create_grocery_list(&self, user: &UserRef) -> Result<ListRef> {
        let mut state = self.state()?;
        let id = ListRef(new_doc_id("list"));
        state.lists.push(ListDoc {
            id: id.clone(),
            user: user.clone(),
        });
        Ok(id)
    }

    async fn create_expenses(&self, user: &UserRef) -> Result<()> {
        let mut state = self.state()?;
        state.expenses.entry(user.clone()).or_default();
        Ok(())
    }

    async fn add_expense(&self, user: &UserRef, month: u32, amount: f64) -> Result<()> {
        let index = validate_month(month)?;
        let mut state = self.state()?;
        let expenses = state
            .expenses
            .get_mut(user)
            .ok_or_else(|| Error::Remote(format!("no expenses document for {user}")))?;
        expenses.months[index] += amount;
        Ok(())
    }

    async fn get_expenses(&self, user: &UserRef) -> Result<Option<Expenses>> {
        let state = self.state()?;
        Ok(state.expenses.get(user).cloned())
    }
}

impl AuthProvider for MemoryRemote {
    async fn create_account(&self, email: &str, password: &str) -> Result<()> {
        let mut state = self.state()?;
        if state.credentials.contains_key(email) {
            return Err(Error::Auth(format!("an account already exists for {email}")));
        }
        let salt = new_salt();
        let hash = hash_password(&salt, password);
        state.credentials.insert(email.to_string(), (salt, hash));
        Ok(())
    }

    async fn verify_password(&self, email: &str, password: &str) -> Result<bool> {
        let state = self.state()?;
        Ok(state
            .credentials
            .get(email)
            .is_some_and(|(salt, hash)| &hash_password(salt, password) == hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn list_for(remote: &MemoryRemote) -> ListRef {
        let user = remote.create_user("shopper@example.com").await.unwrap();
        remote.create_grocery_list(&user).await.unwrap()
    }

    #[tokio::test]
    async fn test_item_lifecycle() {
        let remote = MemoryRemote::new();
        let list = list_for(&remote).await;

        let id = remote.insert_item(&list, "s1", "Milk", "3.49", 1).await.unwrap();
        let found = remote.find_item(&list, "s1", "Milk").await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert!(remote.find_item(&list, "s2", "Milk").await.unwrap().is_none());

        remote.upsert_item_quantity(&id, 4).await.unwrap();
        remote.update_price(&id, "2.99").await.unwrap();
        let items = remote.query_items(&list).await.unwrap();
        assert_eq!(items[0].quantity, 4);
        assert_eq!(items[0].price, "2.99");

        assert!(remote.delete_item(&list, "s1", "Milk").await.unwrap());
        assert!(!remote.delete_item(&list, "s1", "Milk").await.unwrap());
        assert!(remote.query_items(&list).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subscription_sees_writes() {
        let remote = MemoryRemote::new();
        let list = list_for(&remote).await;
        let mut rx = remote.subscribe_items(&list).await.unwrap();
        assert!(rx.borrow().is_empty());

        let id = remote.insert_item(&list, "s1", "Eggs", "2.00", 1).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().len(), 1);

        remote.delete_item_by_id(&id).await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_call() {
        let remote = MemoryRemote::new();
        let list = list_for(&remote).await;
        remote.set_available(false);

        let err = remote.query_items(&list).await.unwrap_err();
        assert!(matches!(err, Error::Remote(_)));
        assert!(err.is_retryable());

        remote.set_available(true);
        assert!(remote.query_items(&list).await.is_ok());
    }

    #[tokio::test]
    async fn test_fail_after() {
        let remote = MemoryRemote::new();
        remote.fail_after(1);
        assert!(remote.create_user("a@example.com").await.is_ok());
        assert!(remote.create_user("b@example.com").await.is_err());
        assert!(remote.get_user_ref("a@example.com").await.is_err());
    }

    #[tokio::test]
    async fn test_expenses() {
        let remote = MemoryRemote::new();
        let user = remote.create_user("a@example.com").await.unwrap();
        assert!(remote.add_expense(&user, 3, 1.0).await.is_err());

        remote.create_expenses(&user).await.unwrap();
        remote.add_expense(&user, 3, 4.25).await.unwrap();
        remote.add_expense(&user, 3, 0.75).await.unwrap();

        let expenses = remote.get_expenses(&user).await.unwrap().unwrap();
        assert!((expenses.months[2] - 5.0).abs() < f64::EPSILON);
        assert!((expenses.total() - 5.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_credentials() {
        let remote = MemoryRemote::new();
        remote.create_account("a@example.com", "hunter22").await.unwrap();
        assert!(remote.create_account("a@example.com", "other1").await.is_err());
        assert!(remote.verify_password("a@example.com", "hunter22").await.unwrap());
        assert!(!remote.verify_password("a@example.com", "wrong!").await.unwrap());
        assert!(!remote.verify_password("b@example.com", "hunter22").await.unwrap());
    }
}
