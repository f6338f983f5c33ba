//! SQLite storage layer for the local cache.
//!
//! This module provides the on-device persistence layer using SQLite with:
//! - WAL mode for concurrent reads
//! - IMMEDIATE transactions for check-then-insert operations
//! - A pending-sync flag per record for the reconciler
//!
//! # Submodules
//!
//! - [`schema`] - Cache schema and destructive version bumps
//! - [`sqlite`] - Main SQLite storage implementation

pub mod schema;
pub mod sqlite;

pub use schema::CACHE_SCHEMA_VERSION;
pub use sqlite::SqliteStorage;
