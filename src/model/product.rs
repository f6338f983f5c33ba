//! Catalog product model.

use serde::{Deserialize, Serialize};

/// A product returned by a catalog search, or re-created from a cached record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub price: String,
    #[serde(rename = "imageUrl", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Product {
    #[must_use]
    pub fn new(name: impl Into<String>, price: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            price: price.into(),
            image_url: None,
        }
    }
}
