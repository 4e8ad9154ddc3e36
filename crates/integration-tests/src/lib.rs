//! Integration tests for the TechHub storefront.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process tests (no services needed)
//! cargo test -p techhub-integration-tests
//!
//! # Include the PostgreSQL order store tests
//! STOREFRONT_DATABASE_URL=postgres://... cargo test -p techhub-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `checkout_flow` - cart to receipt through a [`Session`]
//! - `cart_properties` - cart invariants under random operation sequences
//! - `postgres_orders` - the `PostgreSQL` order store (ignored by default)
//!
//! This module holds the shared fixtures.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::json;

use techhub_core::{Identity, OrderKey, OrderRecord, OwnerId, Product, ProductId, StoredOrder};
use techhub_storefront::db::{InMemoryOrderStore, OrderStore, OrderSubscription, RepositoryError};
use techhub_storefront::services::{InMemoryCatalog, LocalIdentity};
use techhub_storefront::{Session, SessionSettings};

/// Product `id` priced at `price` whole dollars.
///
/// # Panics
///
/// Panics if `title` is blank.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn product(id: u64, title: &str, price: i64) -> Product {
    Product::new(ProductId::from(id), title, Decimal::new(price, 0)).unwrap()
}

/// Catalog with four products in two categories.
///
/// | id | title               | price | category    |
/// |----|---------------------|-------|-------------|
/// | 1  | Laptop Stand        | 100   | accessories |
/// | 2  | Noise Cancelling... | 50    | audio       |
/// | 3  | USB-C Cable         | 12    | accessories |
/// | 4  | Studio Monitor      | 300   | audio       |
///
/// # Panics
///
/// Panics if the fixture listing stops parsing.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn catalog() -> InMemoryCatalog {
    InMemoryCatalog::from_listings(
        json!({
            "-A1": {"id": 1, "title": "Laptop Stand", "price": 100, "stock": 12,
                    "category": "accessories", "description": "Aluminium, adjustable"},
            "-A2": {"id": 2, "title": "Noise Cancelling Headphones", "price": 50, "stock": 4,
                    "category": "audio", "description": "Over-ear, wireless"},
            "-A3": {"id": 3, "title": "USB-C Cable", "price": 12, "stock": 0,
                    "category": "accessories"},
            "-A4": {"id": 4, "title": "Studio Monitor", "price": 300, "category": "audio"}
        }),
        json!({
            "-C1": {"id": "accessories", "title": "Accessories"},
            "-C2": {"id": "audio", "title": "Audio"}
        }),
    )
    .unwrap()
}

/// Identity for owner `id`.
///
/// # Panics
///
/// Panics if `id` is blank.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn identity(id: &str) -> Identity {
    Identity::new(OwnerId::parse(id).unwrap())
}

/// Pieces of a test session that tests poke at directly.
pub struct Harness {
    pub session: Session,
    pub identity: Arc<LocalIdentity>,
    pub orders: Arc<dyn OrderStore>,
}

/// Session over [`catalog`] and `orders`, signed in as `owner` when given.
#[must_use]
pub fn harness_with(owner: Option<&str>, orders: Arc<dyn OrderStore>) -> Harness {
    let identity = Arc::new(match owner {
        Some(id) => LocalIdentity::signed_in(self::identity(id)),
        None => LocalIdentity::new(),
    });
    let session = Session::new(
        SessionSettings::default(),
        Arc::clone(&identity) as _,
        Arc::clone(&orders),
        Arc::new(catalog()),
    );
    Harness {
        session,
        identity,
        orders,
    }
}

/// Session over [`catalog`] and a fresh in-memory order store.
#[must_use]
pub fn harness(owner: Option<&str>) -> Harness {
    harness_with(owner, Arc::new(InMemoryOrderStore::new()))
}

/// In-memory order store whose writes can be made to fail.
#[derive(Debug, Default)]
pub struct FlakyOrderStore {
    inner: InMemoryOrderStore,
    failing: AtomicBool,
}

impl FlakyOrderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent appends fail (`true`) or succeed (`false`).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl OrderStore for FlakyOrderStore {
    async fn append_order(
        &self,
        owner: &OwnerId,
        record: &OrderRecord,
    ) -> Result<OrderKey, RepositoryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("write rejected".to_owned()));
        }
        self.inner.append_order(owner, record).await
    }

    async fn latest_order(&self, owner: &OwnerId) -> Result<Option<StoredOrder>, RepositoryError> {
        self.inner.latest_order(owner).await
    }

    async fn list_orders(&self, owner: &OwnerId) -> Result<Vec<StoredOrder>, RepositoryError> {
        self.inner.list_orders(owner).await
    }

    async fn subscribe_latest(
        &self,
        owner: &OwnerId,
    ) -> Result<OrderSubscription, RepositoryError> {
        self.inner.subscribe_latest(owner).await
    }
}
