//! Product catalog.
//!
//! The backend publishes two listings, `products` and `categories`. Each is
//! either a JSON object keyed by push id or a plain array. Entries that do
//! not validate are skipped with a warning rather than failing the listing.
//!
//! # Implementations
//!
//! - [`InMemoryCatalog`] - fixed listings, used by tests and demos
//! - [`HttpCatalog`] - fetches `{base}/products.json` and
//!   `{base}/categories.json`, cached with `moka`

mod http;

pub use http::HttpCatalog;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use techhub_core::{Category, Product, ProductId};

use crate::config::StorefrontConfig;

/// Errors that can occur when reading the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("catalog returned {status} for {resource}")]
    Status { resource: String, status: u16 },

    /// The response body was not JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The listing had an unexpected shape.
    #[error("malformed listing: {0}")]
    Malformed(String),

    /// The catalog URL could not be built.
    #[error("invalid catalog URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Read access to products and categories.
///
/// Only [`fetch_all_products`](Self::fetch_all_products) and
/// [`fetch_categories`](Self::fetch_categories) talk to a backend; the
/// filtering methods work on the full product listing.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Every valid product, in listing order.
    async fn fetch_all_products(&self) -> Result<Vec<Product>, CatalogError>;

    /// Every valid category, in listing order.
    async fn fetch_categories(&self) -> Result<Vec<Category>, CatalogError>;

    /// Products whose category matches `category`, ignoring case.
    async fn fetch_products_by_category(
        &self,
        category: &str,
    ) -> Result<Vec<Product>, CatalogError> {
        let mut products = self.fetch_all_products().await?;
        products.retain(|p| p.is_in_category(category));
        Ok(products)
    }

    /// Products whose title or description contains `query`, ignoring case.
    /// An empty query matches nothing.
    async fn search(&self, query: &str) -> Result<Vec<Product>, CatalogError> {
        let mut products = self.fetch_all_products().await?;
        products.retain(|p| p.matches_query(query));
        Ok(products)
    }

    /// Products in `category`, narrowed by `query` when it is not empty.
    async fn search_in_category(
        &self,
        category: &str,
        query: &str,
    ) -> Result<Vec<Product>, CatalogError> {
        let mut products = self.fetch_products_by_category(category).await?;
        if !query.trim().is_empty() {
            products.retain(|p| p.matches_query(query));
        }
        Ok(products)
    }

    /// Look up a single product.
    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>, CatalogError> {
        Ok(self
            .fetch_all_products()
            .await?
            .into_iter()
            .find(|p| &p.id == id))
    }
}

/// Fixed product and category listings.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    products: Vec<Product>,
    categories: Vec<Category>,
}

impl InMemoryCatalog {
    #[must_use]
    pub const fn new(products: Vec<Product>, categories: Vec<Category>) -> Self {
        Self {
            products,
            categories,
        }
    }

    /// Build from raw backend listings.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Malformed` if either listing is neither an
    /// object nor an array.
    pub fn from_listings(products: Value, categories: Value) -> Result<Self, CatalogError> {
        Ok(Self::new(
            parse_listing(products, "products")?,
            parse_listing(categories, "categories")?,
        ))
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn fetch_all_products(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.products.clone())
    }

    async fn fetch_categories(&self) -> Result<Vec<Category>, CatalogError> {
        Ok(self.categories.clone())
    }
}

/// The catalog selected by `config`: HTTP when a catalog URL is set,
/// otherwise an empty in-memory catalog.
#[must_use]
pub fn catalog_from_config(config: &StorefrontConfig) -> Arc<dyn Catalog> {
    match &config.catalog_url {
        Some(url) => Arc::new(HttpCatalog::new(url.clone(), config.catalog_cache_ttl)),
        None => Arc::new(InMemoryCatalog::default()),
    }
}

/// Decode a backend listing, skipping entries that fail validation.
///
/// Objects are read in key order; `null` entries (holes in sparse arrays)
/// are ignored silently. A `null` listing is empty.
///
/// # Errors
///
/// Returns `CatalogError::Malformed` if `value` is not an object, array or
/// `null`.
pub fn parse_listing<T: DeserializeOwned>(
    value: Value,
    kind: &str,
) -> Result<Vec<T>, CatalogError> {
    let entries: Vec<(String, Value)> = match value {
        Value::Object(map) => map.into_iter().collect(),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        Value::Null => Vec::new(),
        other => {
            return Err(CatalogError::Malformed(format!(
                "expected {kind} as an object or array, got {}",
                json_type(&other)
            )));
        }
    };

    Ok(entries
        .into_iter()
        .filter(|(_, v)| !v.is_null())
        .filter_map(|(key, v)| match serde_json::from_value(v) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(kind, key = %key, error = %e, "Skipping invalid catalog entry");
                None
            }
        })
        .collect())
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;

    fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::from_listings(
            json!({
                "-Nb1": {"id": 1, "title": "Wireless Mouse", "price": 25, "category": "peripherals",
                         "description": "Quiet clicks"},
                "-Nb2": {"id": 2, "title": "USB-C Hub", "price": 40, "category": "accessories"},
                "-Nb3": {"id": 3, "title": "Mechanical Keyboard", "price": 90, "category": "peripherals",
                         "description": "Tactile switches"},
                "-Nb4": {"title": "Nameless", "price": 1}
            }),
            json!([
                null,
                {"id": 1, "title": "Peripherals", "image": "https://img.example/p.png"},
                {"id": 2, "title": "Accessories"}
            ]),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_invalid_entries_skipped() {
        let catalog = catalog();
        let products = catalog.fetch_all_products().await.unwrap();
        assert_eq!(products.len(), 3);
        assert_eq!(catalog.fetch_categories().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_category_filter_ignores_case() {
        let catalog = catalog();
        let products = catalog.fetch_products_by_category("Peripherals").await.unwrap();
        let titles: Vec<_> = products.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["Wireless Mouse", "Mechanical Keyboard"]);
    }

    #[tokio::test]
    async fn test_search_title_and_description() {
        let catalog = catalog();
        assert_eq!(catalog.search("HUB").await.unwrap().len(), 1);
        assert_eq!(catalog.search("tactile").await.unwrap()[0].id.as_str(), "3");
        assert!(catalog.search("").await.unwrap().is_empty());
        assert!(catalog.search("   ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_in_category() {
        let catalog = catalog();
        assert_eq!(catalog.search_in_category("peripherals", "").await.unwrap().len(), 2);
        let hits = catalog.search_in_category("peripherals", "mouse").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(catalog.search_in_category("accessories", "mouse").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_product() {
        let catalog = catalog();
        let hub = catalog.find_product(&ProductId::from(2)).await.unwrap().unwrap();
        assert_eq!(hub.price, Decimal::new(40, 0));
        assert!(catalog.find_product(&ProductId::from(9)).await.unwrap().is_none());
    }

    #[test]
    fn test_scalar_listing_rejected() {
        let err = parse_listing::<Product>(json!("nope"), "products").unwrap_err();
        assert!(matches!(err, CatalogError::Malformed(_)));
        assert!(parse_listing::<Product>(Value::Null, "products").unwrap().is_empty());
    }
}
