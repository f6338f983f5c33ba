//! Grocery catalog: store selection and product search.
//!
//! [`CatalogApi`] is the HTTP seam; [`CatalogService`] adds token caching,
//! the fallback store, and turns failures into user-facing messages the way
//! the search screen reports them.

mod client;
mod types;

pub use client::{CatalogClient, DEFAULT_BASE_URL};

use crate::error::{Error, Result};
use crate::model::Product;
use serde::Serialize;
use std::future::Future;
use tracing::{info, warn};

/// Store used when the nearest-store lookup fails.
pub const DEFAULT_FALLBACK_STORE: &str = "70400357";

/// Catalog API operations.
pub trait CatalogApi: Send + Sync {
    /// Obtain an access token with client credentials.
    fn access_token(&self) -> impl Future<Output = Result<String>> + Send;

    /// Id of the store closest to a coordinate.
    fn find_nearest_store(
        &self,
        token: &str,
        latitude: f64,
        longitude: f64,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Products matching `term` at a store. Unpriced entries are omitted.
    fn search_products(
        &self,
        token: &str,
        store_id: &str,
        term: &str,
    ) -> impl Future<Output = Result<Vec<Product>>> + Send;
}

/// Outcome of store initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreSelection {
    /// Selected store, `None` when no token could be obtained
    pub store_id: Option<String>,
    /// Set when something went wrong (fallback used or no token)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Outcome of a product search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchOutcome {
    pub products: Vec<Product>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SearchOutcome {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            products: Vec::new(),
            message: Some(message.into()),
        }
    }
}

/// Store selection and search on top of a [`CatalogApi`].
pub struct CatalogService<C: CatalogApi> {
    api: C,
    token: Option<String>,
    store_id: Option<String>,
    fallback_store: String,
}

impl<C: CatalogApi> CatalogService<C> {
    pub fn new(api: C) -> Self {
        Self {
            api,
            token: None,
            store_id: None,
            fallback_store: DEFAULT_FALLBACK_STORE.to_string(),
        }
    }

    /// Use a different fallback store.
    #[must_use]
    pub fn with_fallback_store(mut self, store_id: impl Into<String>) -> Self {
        self.fallback_store = store_id.into();
        self
    }

    /// Resume with a previously selected store.
    #[must_use]
    pub fn with_store(mut self, store_id: Option<String>) -> Self {
        self.store_id = store_id;
        self
    }

    #[must_use]
    pub fn store_id(&self) -> Option<&str> {
        self.store_id.as_deref()
    }

    async fn token(&mut self) -> Result<String> {
        if let Some(token) = &self.token {
            return Ok(token.clone());
        }
        let token = self.api.access_token().await?;
        self.token = Some(token.clone());
        Ok(token)
    }

    /// Pick the store nearest to a coordinate.
    ///
    /// A failed lookup selects the fallback store; a failed token request
    /// selects nothing. Either way the reason is in `message`.
    pub async fn initialize_store(&mut self, latitude: f64, longitude: f64) -> StoreSelection {
        let token = match self.token().await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Catalog token request failed");
                return StoreSelection {
                    store_id: self.store_id.clone(),
                    message: Some(format!("Failed to get access token: {e}")),
                };
            }
        };

        match self.api.find_nearest_store(&token, latitude, longitude).await {
            Ok(store_id) => {
                info!(store_id = %store_id, "Selected nearest store");
                self.store_id = Some(store_id);
                StoreSelection {
                    store_id: self.store_id.clone(),
                    message: None,
                }
            }
            Err(e) => {
                warn!(error = %e, fallback = %self.fallback_store, "Store lookup failed");
                self.store_id = Some(self.fallback_store.clone());
                StoreSelection {
                    store_id: self.store_id.clone(),
                    message: Some(format!("Using fallback store: {e}")),
                }
            }
        }
    }

    /// Search the selected store.
    ///
    /// A blank term yields no products and no message.
    pub async fn search(&mut self, term: &str) -> SearchOutcome {
        let term = term.trim();
        if term.is_empty() {
            return SearchOutcome {
                products: Vec::new(),
                message: None,
            };
        }

        let Some(store_id) = self.store_id.clone() else {
            return SearchOutcome::failed("Store not initialized");
        };

        let token = match self.token().await {
            Ok(token) => token,
            Err(e) => return SearchOutcome::failed(format!("Failed to get access token: {e}")),
        };

        match self.api.search_products(&token, &store_id, term).await {
            Ok(products) if products.is_empty() => SearchOutcome::failed("No products found"),
            Ok(products) => SearchOutcome {
                products,
                message: None,
            },
            Err(e) => {
                if matches!(e, Error::Catalog(_) | Error::Http(_)) {
                    // Token may have expired; request a new one next time
                    self.token = None;
                }
                SearchOutcome::failed(e.to_string())
            }
        }
    }
}
