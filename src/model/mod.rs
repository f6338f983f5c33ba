//! Data models for CheapChomp.
//!
//! This module contains all domain models:
//! - CachedItem (local cache record)
//! - RemoteItem and document references (remote store)
//! - Product (catalog search result)
//! - Price helpers (parsing, aggregation, catalog price selection)

pub mod cached;
pub mod price;
pub mod product;
pub mod remote;

pub use cached::{CachedItem, NewCachedItem};
pub use price::{format_price, grocery_total, parse_price, select_price};
pub use product::Product;
pub use remote::{Expenses, ItemRef, ListRef, RemoteItem, UserRef};
