//! HTTP client for the grocery catalog API.
//!
//! OAuth2 client-credentials token, nearest-store lookup and product search.

use crate::error::{Error, Result};
use crate::model::Product;
use std::time::Duration;
use tracing::debug;

use super::types::{LocationResponse, ProductResponse, TokenResponse};
use super::CatalogApi;

/// Default catalog endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.kroger.com";

const TOKEN_SCOPE: &str = "product.compact";
const PRODUCT_LIMIT: u32 = 50;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Catalog API over HTTPS.
pub struct CatalogClient {
    client: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
}

impl CatalogClient {
    /// Create a client for the given endpoint and credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, client_id: &str, client_secret: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(REQUEST_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

impl CatalogApi for CatalogClient {
    async fn access_token(&self) -> Result<String> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(Error::Catalog("catalog credentials are not configured".into()));
        }

        let response = self
            .client
            .post(self.url("v1/connect/oauth2/token"))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials"), ("scope", TOKEN_SCOPE)])
            .send()
            .await
            .map_err(|e| Error::Catalog(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Catalog(format!(
                "Failed to get access token: {}",
                response.status().as_u16()
            )));
        }

        let data: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Catalog(format!("Failed to parse token response: {e}")))?;
        debug!("Obtained catalog access token");
        Ok(data.access_token)
    }

    async fn find_nearest_store(&self, token: &str, latitude: f64, longitude: f64) -> Result<String> {
        let response = self
            .client
            .get(self.url("v1/locations"))
            .bearer_auth(token)
            .query(&[
                ("filter.lat.near", latitude.to_string()),
                ("filter.lon.near", longitude.to_string()),
                ("filter.limit", "1".to_string()),
            ])
            .send()
            .await
            .map_err(|e| Error::Catalog(format!("store lookup failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Catalog(format!(
                "Failed to find store: {}",
                response.status().as_u16()
            )));
        }

        let data: LocationResponse = response
            .json()
            .await
            .map_err(|e| Error::Catalog(format!("Failed to parse location response: {e}")))?;
        data.first_location()
            .ok_or_else(|| Error::Catalog("No store found".into()))
    }

    async fn search_products(&self, token: &str, store_id: &str, term: &str) -> Result<Vec<Product>> {
        let response = self
            .client
            .get(self.url("v1/products"))
            .bearer_auth(token)
            .query(&[
                ("filter.term", term.to_string()),
                ("filter.locationId", store_id.to_string()),
                ("filter.limit", PRODUCT_LIMIT.to_string()),
            ])
            .send()
            .await
            .map_err(|e| Error::Catalog(format!("product search failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Catalog(format!(
                "Failed to get products: {}",
                response.status().as_u16()
            )));
        }

        let data: ProductResponse = response
            .json()
            .await
            .map_err(|e| Error::Catalog(format!("Failed to parse product response: {e}")))?;
        Ok(data.into_products(term))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = CatalogClient::new("https://catalog.test/", "id", "secret").unwrap();
        assert_eq!(client.url("v1/products"), "https://catalog.test/v1/products");
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let client = CatalogClient::new(DEFAULT_BASE_URL, "", "").unwrap();
        let err = client.access_token().await.unwrap_err();
        assert!(matches!(err, Error::Catalog(_)));
    }
}
