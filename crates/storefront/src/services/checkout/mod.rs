//! Checkout: turn the cart into a persisted order.
//!
//! A purchase moves through `Idle → Validating → Persisting → Committed` or
//! `Failed`. Precondition failures (no identity, empty cart) return to
//! `Idle` without side effects. `Committed` and `Failed` report the last
//! outcome and otherwise behave like `Idle`: the next attempt starts from
//! either. While persisting, the cart is locked so the
//! snapshot that was written is exactly the one that gets cleared.

mod error;

pub use error::{CheckoutError, PersistError};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tracing::{info, instrument, warn};

use techhub_core::{CheckoutStatus, Identity, OrderRecord, StoredOrder};

use crate::db::OrderStore;
use crate::services::cart::CartStore;

/// How long an order write may take before the checkout is failed.
pub const DEFAULT_PERSIST_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs checkouts for one session's cart.
pub struct CheckoutProcessor {
    cart: Arc<CartStore>,
    orders: Arc<dyn OrderStore>,
    persist_timeout: Duration,
    status: Mutex<CheckoutStatus>,
}

impl std::fmt::Debug for CheckoutProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutProcessor")
            .field("cart", &self.cart)
            .field("persist_timeout", &self.persist_timeout)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl CheckoutProcessor {
    /// Create a processor writing to `orders` with the default timeout.
    #[must_use]
    pub fn new(cart: Arc<CartStore>, orders: Arc<dyn OrderStore>) -> Self {
        Self {
            cart,
            orders,
            persist_timeout: DEFAULT_PERSIST_TIMEOUT,
            status: Mutex::new(CheckoutStatus::Idle),
        }
    }

    /// Override the persistence timeout.
    #[must_use]
    pub fn with_persist_timeout(mut self, timeout: Duration) -> Self {
        self.persist_timeout = timeout;
        self
    }

    /// Where the most recent checkout stands.
    #[must_use]
    pub fn status(&self) -> CheckoutStatus {
        *lock_status(&self.status)
    }

    /// The cart this processor checks out.
    #[must_use]
    pub const fn cart(&self) -> &Arc<CartStore> {
        &self.cart
    }

    /// Persist the cart as an order for `identity` and reset the cart.
    ///
    /// On success the stored order (key and record) is returned and the cart
    /// is empty. On any failure the cart is left exactly as it was.
    ///
    /// # Errors
    ///
    /// - `CheckoutError::CheckoutInProgress` if another checkout is running
    /// - `CheckoutError::Unauthenticated` if `identity` is `None`
    /// - `CheckoutError::EmptyCart` if there is nothing to buy
    /// - `CheckoutError::PersistenceFailed` if the write fails or times out
    #[instrument(skip_all, fields(owner = identity.map(|i| i.id.as_str())))]
    pub async fn finish_purchase(
        &self,
        identity: Option<&Identity>,
    ) -> Result<StoredOrder, CheckoutError> {
        let mut status = StatusGuard::enter(&self.status)?;

        let identity = identity.ok_or(CheckoutError::Unauthenticated)?;
        let lock = self
            .cart
            .begin_checkout()
            .map_err(|_| CheckoutError::CheckoutInProgress)?;
        if lock.snapshot().is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let record = OrderRecord::new(
            lock.snapshot().items.clone(),
            identity.id.clone(),
            Utc::now(),
        );

        status.set(CheckoutStatus::Persisting);
        let write = self.orders.append_order(&identity.id, &record);
        let key = match tokio::time::timeout(self.persist_timeout, write).await {
            Ok(Ok(key)) => key,
            Ok(Err(e)) => {
                status.set(CheckoutStatus::Failed);
                warn!(error = %e, "Order write failed, cart kept");
                return Err(PersistError::Store(e).into());
            }
            Err(_) => {
                status.set(CheckoutStatus::Failed);
                warn!(timeout = ?self.persist_timeout, "Order write timed out, cart kept");
                return Err(PersistError::TimedOut(self.persist_timeout).into());
            }
        };

        lock.commit();
        status.set(CheckoutStatus::Committed);
        info!(
            key = %key,
            total = %record.total_amount,
            items = record.item_count(),
            "Order placed"
        );

        Ok(StoredOrder { key, record })
    }
}

fn lock_status(status: &Mutex<CheckoutStatus>) -> MutexGuard<'_, CheckoutStatus> {
    status.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Tracks one checkout through the state machine.
///
/// If dropped mid-flight the status falls back to `Idle` (still validating)
/// or `Failed` (the write was started).
struct StatusGuard<'a> {
    status: &'a Mutex<CheckoutStatus>,
}

impl<'a> StatusGuard<'a> {
    fn enter(status: &'a Mutex<CheckoutStatus>) -> Result<Self, CheckoutError> {
        let mut current = lock_status(status);
        if current.is_busy() {
            return Err(CheckoutError::CheckoutInProgress);
        }
        *current = CheckoutStatus::Validating;
        Ok(Self { status })
    }

    fn set(&mut self, next: CheckoutStatus) {
        *lock_status(self.status) = next;
    }
}

impl Drop for StatusGuard<'_> {
    fn drop(&mut self) {
        let mut current = lock_status(self.status);
        *current = match *current {
            CheckoutStatus::Validating => CheckoutStatus::Idle,
            CheckoutStatus::Persisting => CheckoutStatus::Failed,
            settled => settled,
        };
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use tokio::sync::Notify;

    use techhub_core::{OrderKey, OwnerId, Product, ProductId};

    use super::*;
    use crate::db::{InMemoryOrderStore, OrderSubscription, RepositoryError};

    fn product(id: u64, price: i64) -> Product {
        Product::new(ProductId::from(id), format!("Product {id}"), Decimal::new(price, 0)).unwrap()
    }

    fn user(id: &str) -> Identity {
        Identity::new(OwnerId::parse(id).unwrap())
    }

    fn filled_cart() -> Arc<CartStore> {
        let cart = Arc::new(CartStore::new());
        cart.add_to_cart(&product(1, 100)).unwrap();
        cart.add_to_cart(&product(1, 100)).unwrap();
        cart.add_to_cart(&product(2, 50)).unwrap();
        cart
    }

    /// Delegates to an in-memory store, optionally failing or stalling first.
    #[derive(Default)]
    struct ScriptedStore {
        inner: InMemoryOrderStore,
        fail: AtomicBool,
        stall: Option<Duration>,
        gate: Option<(Notify, Notify)>,
    }

    #[async_trait]
    impl OrderStore for ScriptedStore {
        async fn append_order(
            &self,
            owner: &OwnerId,
            record: &OrderRecord,
        ) -> Result<OrderKey, RepositoryError> {
            if let Some((entered, release)) = &self.gate {
                entered.notify_one();
                release.notified().await;
            }
            if let Some(stall) = self.stall {
                tokio::time::sleep(stall).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(RepositoryError::Unavailable("write rejected".into()));
            }
            self.inner.append_order(owner, record).await
        }

        async fn latest_order(
            &self,
            owner: &OwnerId,
        ) -> Result<Option<StoredOrder>, RepositoryError> {
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

    #[tokio::test]
    async fn test_checkout_persists_and_clears() {
        let cart = filled_cart();
        let store = Arc::new(InMemoryOrderStore::new());
        let processor = CheckoutProcessor::new(Arc::clone(&cart), store.clone());

        let order = processor.finish_purchase(Some(&user("u1"))).await.unwrap();

        assert_eq!(order.record.total_amount, Decimal::new(250, 0));
        assert_eq!(order.record.owner_id.as_str(), "u1");
        assert_eq!(order.record.items.len(), 2);
        assert!(cart.is_empty());
        assert!(!cart.is_locked());
        assert_eq!(processor.status(), CheckoutStatus::Committed);

        let latest = store
            .latest_order(&OwnerId::parse("u1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest, order);
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let cart = Arc::new(CartStore::new());
        let store = Arc::new(InMemoryOrderStore::new());
        let processor = CheckoutProcessor::new(Arc::clone(&cart), store.clone());

        let err = processor.finish_purchase(Some(&user("u1"))).await.unwrap_err();

        assert!(matches!(err, CheckoutError::EmptyCart));
        assert_eq!(store.order_count(&OwnerId::parse("u1").unwrap()), 0);
        assert!(cart.is_empty());
        assert!(!cart.is_locked());
        assert_eq!(processor.status(), CheckoutStatus::Idle);
    }

    #[tokio::test]
    async fn test_missing_identity_rejected() {
        let cart = filled_cart();
        let before = cart.snapshot();
        let processor = CheckoutProcessor::new(Arc::clone(&cart), Arc::new(InMemoryOrderStore::new()));

        let err = processor.finish_purchase(None).await.unwrap_err();

        assert!(matches!(err, CheckoutError::Unauthenticated));
        assert_eq!(cart.snapshot(), before);
        assert_eq!(processor.status(), CheckoutStatus::Idle);
    }

    #[tokio::test]
    async fn test_write_failure_keeps_cart() {
        let cart = filled_cart();
        let before = cart.snapshot();
        let store = Arc::new(ScriptedStore {
            fail: AtomicBool::new(true),
            ..ScriptedStore::default()
        });
        let processor = CheckoutProcessor::new(Arc::clone(&cart), store.clone());

        let err = processor.finish_purchase(Some(&user("u1"))).await.unwrap_err();

        assert!(matches!(err, CheckoutError::PersistenceFailed(PersistError::Store(_))));
        assert!(err.is_retryable());
        assert_eq!(cart.snapshot(), before);
        assert!(!cart.is_locked());
        assert_eq!(processor.status(), CheckoutStatus::Failed);

        store.fail.store(false, Ordering::SeqCst);
        let order = processor.finish_purchase(Some(&user("u1"))).await.unwrap();
        assert_eq!(order.record.total_amount, Decimal::new(250, 0));
        assert!(cart.is_empty());
        assert_eq!(processor.status(), CheckoutStatus::Committed);
    }

    #[tokio::test]
    async fn test_failed_attempt_returns_to_idle_on_next_rejection() {
        let cart = filled_cart();
        let store = Arc::new(ScriptedStore {
            fail: AtomicBool::new(true),
            ..ScriptedStore::default()
        });
        let processor = CheckoutProcessor::new(Arc::clone(&cart), store);

        processor.finish_purchase(Some(&user("u1"))).await.unwrap_err();
        assert_eq!(processor.status(), CheckoutStatus::Failed);
        assert!(!processor.status().is_busy());

        let err = processor.finish_purchase(None).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Unauthenticated));
        assert_eq!(processor.status(), CheckoutStatus::Idle);
        assert_eq!(cart.item_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_timeout_keeps_cart() {
        let cart = filled_cart();
        let before = cart.snapshot();
        let store = Arc::new(ScriptedStore {
            stall: Some(Duration::from_secs(60)),
            ..ScriptedStore::default()
        });
        let processor = CheckoutProcessor::new(Arc::clone(&cart), store.clone())
            .with_persist_timeout(Duration::from_secs(5));

        let err = processor.finish_purchase(Some(&user("u1"))).await.unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::PersistenceFailed(PersistError::TimedOut(t)) if t == Duration::from_secs(5)
        ));
        assert_eq!(cart.snapshot(), before);
        assert!(!cart.is_locked());
        assert_eq!(store.inner.order_count(&OwnerId::parse("u1").unwrap()), 0);
    }

    #[tokio::test]
    async fn test_concurrent_checkout_rejected() {
        let cart = filled_cart();
        let store = Arc::new(ScriptedStore {
            gate: Some((Notify::new(), Notify::new())),
            ..ScriptedStore::default()
        });
        let processor = Arc::new(CheckoutProcessor::new(Arc::clone(&cart), store.clone()));

        let first = {
            let processor = Arc::clone(&processor);
            tokio::spawn(async move { processor.finish_purchase(Some(&user("u1"))).await })
        };

        let (entered, release) = store.gate.as_ref().unwrap();
        entered.notified().await;
        assert_eq!(processor.status(), CheckoutStatus::Persisting);

        let second = processor.finish_purchase(Some(&user("u1"))).await.unwrap_err();
        assert!(matches!(second, CheckoutError::CheckoutInProgress));
        assert!(cart.add_to_cart(&product(3, 1)).is_err());

        release.notify_one();
        let order = first.await.unwrap().unwrap();

        assert_eq!(order.record.total_amount, Decimal::new(250, 0));
        assert!(cart.is_empty());
        assert_eq!(store.inner.order_count(&OwnerId::parse("u1").unwrap()), 1);
    }
}
