//! Command implementations.

pub mod account;
pub mod catalog;
pub mod completions;
pub mod expenses;
pub mod favorites;
pub mod list;
pub mod sync;
pub mod version;
