//! Catalog backed by the backend's JSON listings.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use techhub_core::{Category, Product};

use super::{Catalog, CatalogError, parse_listing};

const PRODUCTS_RESOURCE: &str = "products.json";
const CATEGORIES_RESOURCE: &str = "categories.json";

#[derive(Debug, Clone)]
enum CacheValue {
    Products(Arc<Vec<Product>>),
    Categories(Arc<Vec<Category>>),
}

/// Client for the catalog listings.
///
/// Both listings are cached for the configured TTL.
#[derive(Clone)]
pub struct HttpCatalog {
    inner: Arc<HttpCatalogInner>,
}

struct HttpCatalogInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<&'static str, CacheValue>,
}

impl std::fmt::Debug for HttpCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCatalog")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpCatalog {
    /// Create a catalog client rooted at `base_url`.
    #[must_use]
    pub fn new(mut base_url: Url, cache_ttl: Duration) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(cache_ttl)
            .build();

        Self {
            inner: Arc::new(HttpCatalogInner {
                client: reqwest::Client::new(),
                base_url,
                cache,
            }),
        }
    }

    /// Drop cached listings so the next read hits the backend.
    pub fn invalidate(&self) {
        self.inner.cache.invalidate_all();
    }

    #[instrument(skip(self))]
    async fn fetch_json(&self, resource: &str) -> Result<Value, CatalogError> {
        let url = self.inner.base_url.join(resource)?;
        let response = self.inner.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                resource: resource.to_owned(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl Catalog for HttpCatalog {
    async fn fetch_all_products(&self) -> Result<Vec<Product>, CatalogError> {
        if let Some(CacheValue::Products(products)) =
            self.inner.cache.get(PRODUCTS_RESOURCE).await
        {
            debug!("Cache hit for products");
            return Ok(products.as_ref().clone());
        }

        let products: Vec<Product> =
            parse_listing(self.fetch_json(PRODUCTS_RESOURCE).await?, "products")?;
        debug!(count = products.len(), "Fetched products");

        self.inner
            .cache
            .insert(
                PRODUCTS_RESOURCE,
                CacheValue::Products(Arc::new(products.clone())),
            )
            .await;

        Ok(products)
    }

    async fn fetch_categories(&self) -> Result<Vec<Category>, CatalogError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(CATEGORIES_RESOURCE).await
        {
            debug!("Cache hit for categories");
            return Ok(categories.as_ref().clone());
        }

        let categories: Vec<Category> =
            parse_listing(self.fetch_json(CATEGORIES_RESOURCE).await?, "categories")?;
        debug!(count = categories.len(), "Fetched categories");

        self.inner
            .cache
            .insert(
                CATEGORIES_RESOURCE,
                CacheValue::Categories(Arc::new(categories.clone())),
            )
            .await;

        Ok(categories)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Serves `products.json` and `categories.json` from memory and counts
    /// requests. Anything else is a 404.
    async fn serve(products: &'static str, categories: &'static str) -> (Url, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                counter.fetch_add(1, Ordering::SeqCst);

                let mut buf = vec![0_u8; 4096];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]);
                let path = request.split_whitespace().nth(1).unwrap_or("/");

                let (status, body) = if path.ends_with("/products.json") {
                    ("200 OK", products)
                } else if path.ends_with("/categories.json") {
                    ("200 OK", categories)
                } else {
                    ("404 Not Found", "null")
                };
                let response = format!(
                    "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        let url = Url::parse(&format!("http://{addr}/catalog")).unwrap();
        (url, hits)
    }

    #[tokio::test]
    async fn test_fetches_keyed_listing_and_caches() {
        let (url, hits) = serve(
            r#"{"-a": {"id": 1, "title": "Monitor", "price": 199.99, "category": "displays"},
                "-b": {"id": 2, "title": "Cable", "price": -3}}"#,
            r#"[{"id": "displays", "title": "Displays"}]"#,
        )
        .await;
        let catalog = HttpCatalog::new(url, Duration::from_secs(60));

        let products = catalog.fetch_all_products().await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].title, "Monitor");

        catalog.fetch_all_products().await.unwrap();
        catalog.fetch_products_by_category("DISPLAYS").await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let categories = catalog.fetch_categories().await.unwrap();
        assert_eq!(categories[0].id.as_str(), "displays");
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        catalog.invalidate();
        catalog.fetch_all_products().await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_error_status_reported() {
        let (url, _) = serve("[]", "[]").await;
        let catalog = HttpCatalog::new(url, Duration::from_secs(60));

        let err = catalog.fetch_json("missing.json").await.unwrap_err();
        assert!(matches!(err, CatalogError::Status { status: 404, .. }));
    }
}
