//! Order persistence.
//!
//! The checkout flow talks to storage only through [`OrderStore`]. Orders are
//! append-only: every successful checkout adds a new record under a fresh
//! time-ordered [`OrderKey`], and nothing ever rewrites a stored record.
//!
//! # Implementations
//!
//! - [`memory::InMemoryOrderStore`] - process-local, used by tests and the CLI
//!   when no database is configured
//! - [`orders::PgOrderStore`] - `PostgreSQL` table `storefront.order_record`
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p techhub-cli -- migrate
//! ```

pub mod memory;
pub mod orders;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use techhub_core::{OrderKey, OrderRecord, OwnerId, StoredOrder};

use crate::config::StorefrontConfig;

pub use memory::InMemoryOrderStore;
pub use orders::PgOrderStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Record could not be encoded for storage.
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// The store refused the write.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Append-only storage for completed orders, keyed by owner.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Store `record` under `owner` with a new unique key.
    ///
    /// The record is written as one document: either the whole record is
    /// stored or nothing is.
    async fn append_order(
        &self,
        owner: &OwnerId,
        record: &OrderRecord,
    ) -> Result<OrderKey, RepositoryError>;

    /// Most recent order for `owner`, if any.
    async fn latest_order(&self, owner: &OwnerId) -> Result<Option<StoredOrder>, RepositoryError>;

    /// All orders for `owner`, newest first.
    async fn list_orders(&self, owner: &OwnerId) -> Result<Vec<StoredOrder>, RepositoryError>;

    /// Follow the most recent order for `owner`.
    ///
    /// The subscription starts with the current latest order and updates
    /// each time a new order is appended for that owner.
    async fn subscribe_latest(&self, owner: &OwnerId)
    -> Result<OrderSubscription, RepositoryError>;
}

/// Live view of an owner's most recent order.
///
/// Dropping the subscription (or calling [`unsubscribe`](Self::unsubscribe))
/// stops any background work feeding it.
#[derive(Debug)]
pub struct OrderSubscription {
    rx: watch::Receiver<Option<StoredOrder>>,
    feeder: Option<JoinHandle<()>>,
}

impl OrderSubscription {
    pub(crate) const fn new(
        rx: watch::Receiver<Option<StoredOrder>>,
        feeder: Option<JoinHandle<()>>,
    ) -> Self {
        Self { rx, feeder }
    }

    /// The latest order seen so far.
    #[must_use]
    pub fn latest(&self) -> Option<StoredOrder> {
        self.rx.borrow().clone()
    }

    /// Wait for the next change and return the new latest order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Unavailable` if the store stopped publishing.
    pub async fn changed(&mut self) -> Result<Option<StoredOrder>, RepositoryError> {
        self.rx
            .changed()
            .await
            .map_err(|_| RepositoryError::Unavailable("order feed closed".to_owned()))?;
        Ok(self.rx.borrow_and_update().clone())
    }

    /// Stop following the owner's orders.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for OrderSubscription {
    fn drop(&mut self) {
        if let Some(feeder) = self.feeder.take() {
            feeder.abort();
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Run the storefront schema migrations.
///
/// # Errors
///
/// Returns `RepositoryError::Migration` if a migration fails to apply.
pub async fn run_migrations(pool: &PgPool) -> Result<(), RepositoryError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Open the order store selected by `config`.
///
/// Orders go to `PostgreSQL` when a database URL is configured and stay in
/// memory otherwise.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the database cannot be reached.
pub async fn connect_order_store(
    config: &StorefrontConfig,
) -> Result<Arc<dyn OrderStore>, RepositoryError> {
    match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            info!("Database pool created");
            Ok(Arc::new(PgOrderStore::new(pool)))
        }
        None => {
            info!("No database configured, keeping orders in memory");
            Ok(Arc::new(InMemoryOrderStore::new()))
        }
    }
}
