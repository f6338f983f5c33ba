//! CheapChomp - grocery prices and an offline-first grocery list
//!
//! This crate provides the core functionality for the `chomp` CLI tool.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`model`] - Data types (cached items, remote documents, products, prices)
//! - [`storage`] - Local SQLite item cache
//! - [`remote`] - Remote document store trait and implementations
//! - [`auth`] - Registration and sign-in
//! - [`session`] - Signed-in session context and read mode
//! - [`grocery`] - Grocery list and favorites operations
//! - [`catalog`] - Catalog API client (stores, product search)
//! - [`sync`] - Offline-to-remote reconciliation and background worker
//! - [`config`] - Paths and settings
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod grocery;
pub mod model;
pub mod remote;
pub mod session;
pub mod storage;
pub mod sync;

pub use error::{Error, Result};
