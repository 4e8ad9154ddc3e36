//! Process-local order store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

use techhub_core::{OrderKey, OrderRecord, OwnerId, StoredOrder};

use super::{OrderStore, OrderSubscription, RepositoryError};

/// Orders kept in memory, one append-only ledger per owner.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    ledgers: Mutex<HashMap<OwnerId, Ledger>>,
}

#[derive(Debug)]
struct Ledger {
    orders: Vec<StoredOrder>,
    latest: watch::Sender<Option<StoredOrder>>,
}

impl Ledger {
    fn new() -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            orders: Vec::new(),
            latest,
        }
    }
}

impl InMemoryOrderStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of orders stored for `owner`.
    #[must_use]
    pub fn order_count(&self, owner: &OwnerId) -> usize {
        self.ledgers().get(owner).map_or(0, |l| l.orders.len())
    }

    fn ledgers(&self) -> MutexGuard<'_, HashMap<OwnerId, Ledger>> {
        self.ledgers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn append_order(
        &self,
        owner: &OwnerId,
        record: &OrderRecord,
    ) -> Result<OrderKey, RepositoryError> {
        let stored = StoredOrder {
            key: OrderKey::generate(),
            record: record.clone(),
        };
        let key = stored.key;

        let mut ledgers = self.ledgers();
        let ledger = ledgers.entry(owner.clone()).or_insert_with(Ledger::new);
        ledger.orders.push(stored.clone());
        ledger.latest.send_replace(Some(stored));

        debug!(owner = %owner, key = %key, "Appended order");
        Ok(key)
    }

    async fn latest_order(&self, owner: &OwnerId) -> Result<Option<StoredOrder>, RepositoryError> {
        Ok(self
            .ledgers()
            .get(owner)
            .and_then(|l| l.orders.last().cloned()))
    }

    async fn list_orders(&self, owner: &OwnerId) -> Result<Vec<StoredOrder>, RepositoryError> {
        Ok(self
            .ledgers()
            .get(owner)
            .map(|l| l.orders.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    async fn subscribe_latest(
        &self,
        owner: &OwnerId,
    ) -> Result<OrderSubscription, RepositoryError> {
        let mut ledgers = self.ledgers();
        let ledger = ledgers.entry(owner.clone()).or_insert_with(Ledger::new);
        Ok(OrderSubscription::new(ledger.latest.subscribe(), None))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use techhub_core::{LineItem, Product, ProductId};

    use super::*;

    fn record(owner: &OwnerId, price: i64) -> OrderRecord {
        let product = Product::new(ProductId::from(1), "Webcam", Decimal::new(price, 0)).unwrap();
        OrderRecord::new(vec![LineItem::new(product)], owner.clone(), Utc::now())
    }

    #[tokio::test]
    async fn test_append_is_append_only() {
        let store = InMemoryOrderStore::new();
        let owner = OwnerId::parse("u1").unwrap();

        let first = store.append_order(&owner, &record(&owner, 10)).await.unwrap();
        let second = store.append_order(&owner, &record(&owner, 20)).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(store.order_count(&owner), 2);

        let history = store.list_orders(&owner).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].key, second);
        assert_eq!(history[1].key, first);
    }

    #[tokio::test]
    async fn test_latest_order_per_owner() {
        let store = InMemoryOrderStore::new();
        let alice = OwnerId::parse("alice").unwrap();
        let bob = OwnerId::parse("bob").unwrap();

        store.append_order(&alice, &record(&alice, 10)).await.unwrap();
        let bob_key = store.append_order(&bob, &record(&bob, 99)).await.unwrap();

        let latest = store.latest_order(&bob).await.unwrap().unwrap();
        assert_eq!(latest.key, bob_key);
        assert_eq!(latest.record.owner_id, bob);
        assert!(
            store
                .latest_order(&OwnerId::parse("carol").unwrap())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_latest_follows_append_order_not_timestamp() {
        let store = InMemoryOrderStore::new();
        let owner = OwnerId::parse("u1").unwrap();

        let first = store.append_order(&owner, &record(&owner, 1)).await.unwrap();
        let mut backdated = record(&owner, 2);
        backdated.timestamp -= chrono::Duration::hours(1);
        let second = store.append_order(&owner, &backdated).await.unwrap();

        assert!(second > first);
        assert_eq!(store.latest_order(&owner).await.unwrap().unwrap().key, second);
        let keys: Vec<_> = store
            .list_orders(&owner)
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.key)
            .collect();
        assert_eq!(keys, [second, first]);
    }

    #[tokio::test]
    async fn test_subscription_sees_new_orders() {
        let store = InMemoryOrderStore::new();
        let owner = OwnerId::parse("u1").unwrap();

        let mut sub = store.subscribe_latest(&owner).await.unwrap();
        assert!(sub.latest().is_none());

        let key = store.append_order(&owner, &record(&owner, 5)).await.unwrap();
        let latest = sub.changed().await.unwrap().unwrap();
        assert_eq!(latest.key, key);
        assert_eq!(sub.latest().unwrap().key, key);
    }

    #[tokio::test]
    async fn test_stored_record_round_trips() {
        let store = InMemoryOrderStore::new();
        let owner = OwnerId::parse("u1").unwrap();
        let original = record(&owner, 42);

        store.append_order(&owner, &original).await.unwrap();
        let stored = store.latest_order(&owner).await.unwrap().unwrap();
        assert_eq!(stored.record, original);
    }
}
