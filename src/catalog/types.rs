//! Catalog API wire types.

use crate::model::{select_price, Product};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LocationResponse {
    pub data: Option<Vec<LocationData>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LocationData {
    pub location_id: String,
}

impl LocationResponse {
    pub fn first_location(self) -> Option<String> {
        self.data?.into_iter().next().map(|l| l.location_id)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProductResponse {
    pub data: Option<Vec<ProductData>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProductData {
    pub description: Option<String>,
    pub items: Option<Vec<ProductItem>>,
    pub images: Option<Vec<ProductImage>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProductImage {
    pub sizes: Option<Vec<ImageSize>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageSize {
    pub size: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProductItem {
    pub price: Option<ItemPrice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ItemPrice {
    pub regular: Option<PriceValue>,
    pub promo: Option<PriceValue>,
}

/// The API sends prices as JSON numbers; older payloads use strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum PriceValue {
    Number(f64),
    Text(String),
}

impl PriceValue {
    fn into_text(self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s,
        }
    }
}

impl ProductData {
    /// Convert to a [`Product`]. Entries without any price are dropped.
    pub fn into_product(self, term: &str) -> Option<Product> {
        let price = self
            .items
            .and_then(|items| items.into_iter().next())
            .and_then(|item| item.price)
            .and_then(|p| {
                let regular = p.regular.map(PriceValue::into_text);
                let promo = p.promo.map(PriceValue::into_text);
                select_price(regular.as_deref(), promo.as_deref())
            })?;

        let image_url = self
            .images
            .and_then(|images| images.into_iter().next())
            .and_then(|image| image.sizes)
            .and_then(|sizes| {
                sizes
                    .into_iter()
                    .find(|s| s.size.as_deref() == Some("large"))
                    .and_then(|s| s.url)
            });

        let name = self
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| term.to_string());

        Some(Product {
            name,
            price,
            image_url,
        })
    }
}

impl ProductResponse {
    pub fn into_products(self, term: &str) -> Vec<Product> {
        self.data
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.into_product(term))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "data": [
            {
                "description": "Whole Milk",
                "items": [{"price": {"regular": 3.49, "promo": 2.99}}],
                "images": [{"perspective": "front", "sizes": [
                    {"size": "small", "url": "https://img/small.jpg"},
                    {"size": "large", "url": "https://img/large.jpg"}
                ]}]
            },
            {
                "description": "Sale Bread",
                "items": [{"price": {"promo": "1.99"}}]
            },
            {
                "description": "Unpriced",
                "items": [{"price": null}]
            },
            {
                "items": [{"price": {"regular": "0.50"}}]
            }
        ]
    }"#;

    #[test]
    fn test_product_mapping() {
        let response: ProductResponse = serde_json::from_str(FIXTURE).unwrap();
        let products = response.into_products("milk");

        assert_eq!(products.len(), 3);
        assert_eq!(products[0].name, "Whole Milk");
        assert_eq!(products[0].price, "3.49");
        assert_eq!(products[0].image_url.as_deref(), Some("https://img/large.jpg"));

        assert_eq!(products[1].price, "1.99");
        assert!(products[1].image_url.is_none());

        // Missing description falls back to the search term
        assert_eq!(products[2].name, "milk");
    }

    #[test]
    fn test_location_mapping() {
        let response: LocationResponse =
            serde_json::from_str(r#"{"data":[{"locationId":"01400943"},{"locationId":"x"}]}"#).unwrap();
        assert_eq!(response.first_location().as_deref(), Some("01400943"));

        let empty: LocationResponse = serde_json::from_str(r#"{"data":[]}"#).unwrap();
        assert!(empty.first_location().is_none());
    }
}
