//! `PostgreSQL` order repository.
//!
//! Each order is one row in `storefront.order_record`. The full
//! [`OrderRecord`] is kept as a JSONB document so it reads back exactly as it
//! was written; `owner_id`, `total_amount` and `placed_at` are copied into
//! columns for querying. Appends raise a `pg_notify` on [`ORDER_CHANNEL`]
//! with the owner id as payload, which drives [`OrderStore::subscribe_latest`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use sqlx::types::Json;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use techhub_core::{OrderKey, OrderRecord, OwnerId, StoredOrder};

use super::{OrderStore, OrderSubscription, RepositoryError};

/// Notification channel raised on every append.
pub const ORDER_CHANNEL: &str = "order_appended";

/// Order repository backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    key: Uuid,
    owner_id: String,
    document: Json<OrderRecord>,
}

impl OrderRow {
    fn into_stored(self) -> Result<StoredOrder, RepositoryError> {
        let record = self.document.0;
        if record.owner_id.as_str() != self.owner_id {
            return Err(RepositoryError::DataCorruption(format!(
                "order {} is filed under {} but owned by {}",
                self.key, self.owner_id, record.owner_id
            )));
        }
        Ok(StoredOrder {
            key: OrderKey::from_uuid(self.key),
            record,
        })
    }
}

impl PgOrderStore {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

async fn fetch_latest(
    pool: &PgPool,
    owner: &OwnerId,
) -> Result<Option<StoredOrder>, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(
        r"
        SELECT key, owner_id, document
        FROM storefront.order_record
        WHERE owner_id = $1
        ORDER BY key DESC
        LIMIT 1
        ",
    )
    .bind(owner.as_str())
    .fetch_optional(pool)
    .await?;

    row.map(OrderRow::into_stored).transpose()
}

#[async_trait]
impl OrderStore for PgOrderStore {
    #[instrument(skip(self, record), fields(owner = %owner))]
    async fn append_order(
        &self,
        owner: &OwnerId,
        record: &OrderRecord,
    ) -> Result<OrderKey, RepositoryError> {
        if &record.owner_id != owner {
            return Err(RepositoryError::DataCorruption(format!(
                "record owned by {} cannot be filed under {owner}",
                record.owner_id
            )));
        }

        let key = OrderKey::generate();
        let total_amount: Decimal = record.total_amount;
        let placed_at: DateTime<Utc> = record.timestamp;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO storefront.order_record (key, owner_id, total_amount, placed_at, document)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(*key.as_uuid())
        .bind(owner.as_str())
        .bind(total_amount)
        .bind(placed_at)
        .bind(Json(record))
        .execute(&mut *tx)
        .await?;

        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(ORDER_CHANNEL)
            .bind(owner.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(key = %key, "Appended order");
        Ok(key)
    }

    async fn latest_order(&self, owner: &OwnerId) -> Result<Option<StoredOrder>, RepositoryError> {
        fetch_latest(&self.pool, owner).await
    }

    async fn list_orders(&self, owner: &OwnerId) -> Result<Vec<StoredOrder>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT key, owner_id, document
            FROM storefront.order_record
            WHERE owner_id = $1
            ORDER BY key DESC
            ",
        )
        .bind(owner.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(OrderRow::into_stored).collect()
    }

    #[instrument(skip(self), fields(owner = %owner))]
    async fn subscribe_latest(
        &self,
        owner: &OwnerId,
    ) -> Result<OrderSubscription, RepositoryError> {
        // Listen before reading so an append between the two is not missed.
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(ORDER_CHANNEL).await?;

        let initial = fetch_latest(&self.pool, owner).await?;
        let (tx, rx) = watch::channel(initial);

        let pool = self.pool.clone();
        let owner = owner.clone();
        let feeder = tokio::spawn(async move {
            loop {
                match listener.recv().await {
                    Ok(notification) if notification.payload() == owner.as_str() => {
                        match fetch_latest(&pool, &owner).await {
                            Ok(latest) => {
                                if tx.send(latest).is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!(error = %e, owner = %owner, "Failed to refresh latest order"),
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, owner = %owner, "Order listener stopped");
                        break;
                    }
                }
            }
        });

        Ok(OrderSubscription::new(rx, Some(feeder)))
    }
}
