//! Per-session wiring.
//!
//! A [`Session`] owns one cart and holds the collaborators it needs: identity,
//! order store and catalog. Everything is passed in; nothing is global.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, instrument};

use techhub_core::{CurrencyCode, Identity, ProductId, StoredOrder};

use crate::config::StorefrontConfig;
use crate::db::{self, OrderStore, OrderSubscription};
use crate::error::{self, AppError, Result};
use crate::models::{CartView, ReceiptView};
use crate::services::catalog::{Catalog, catalog_from_config};
use crate::services::checkout::{CheckoutProcessor, DEFAULT_PERSIST_TIMEOUT};
use crate::services::{CartStore, IdentityProvider};

/// Behaviour switches for a session.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub clear_cart_on_sign_out: bool,
    pub currency: CurrencyCode,
    pub persist_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            clear_cart_on_sign_out: true,
            currency: CurrencyCode::default(),
            persist_timeout: DEFAULT_PERSIST_TIMEOUT,
        }
    }
}

impl From<&StorefrontConfig> for SessionSettings {
    fn from(config: &StorefrontConfig) -> Self {
        Self {
            clear_cart_on_sign_out: config.clear_cart_on_sign_out,
            currency: config.currency,
            persist_timeout: config.persist_timeout,
        }
    }
}

/// One shopper's session.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    settings: SessionSettings,
    cart: Arc<CartStore>,
    identity: Arc<dyn IdentityProvider>,
    orders: Arc<dyn OrderStore>,
    catalog: Arc<dyn Catalog>,
    checkout: CheckoutProcessor,
    seen_identity: Mutex<Option<Identity>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("settings", &self.inner.settings)
            .field("cart", &self.inner.cart)
            .field("checkout", &self.inner.checkout)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session with an empty cart.
    #[must_use]
    pub fn new(
        settings: SessionSettings,
        identity: Arc<dyn IdentityProvider>,
        orders: Arc<dyn OrderStore>,
        catalog: Arc<dyn Catalog>,
    ) -> Self {
        let cart = Arc::new(CartStore::new());
        let checkout = CheckoutProcessor::new(Arc::clone(&cart), Arc::clone(&orders))
            .with_persist_timeout(settings.persist_timeout);
        let seen_identity = Mutex::new(identity.current_identity());

        Self {
            inner: Arc::new(SessionInner {
                settings,
                cart,
                identity,
                orders,
                catalog,
                checkout,
                seen_identity,
            }),
        }
    }

    /// Build a session from configuration.
    ///
    /// Orders go to `PostgreSQL` when a database URL is configured and stay
    /// in memory otherwise. The catalog is fetched over HTTP when a catalog
    /// URL is configured and is empty otherwise.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the database cannot be reached.
    pub async fn from_config(
        config: &StorefrontConfig,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self> {
        let orders = db::connect_order_store(config).await?;
        let catalog = catalog_from_config(config);

        Ok(Self::new(config.into(), identity, orders, catalog))
    }

    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.inner.settings
    }

    /// Get a reference to the cart.
    #[must_use]
    pub fn cart(&self) -> &Arc<CartStore> {
        &self.inner.cart
    }

    /// Get a reference to the catalog.
    #[must_use]
    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.inner.catalog
    }

    /// Get a reference to the order store.
    #[must_use]
    pub fn orders(&self) -> &Arc<dyn OrderStore> {
        &self.inner.orders
    }

    /// Get a reference to the checkout processor.
    #[must_use]
    pub fn checkout(&self) -> &CheckoutProcessor {
        &self.inner.checkout
    }

    /// Who is signed in, if anyone.
    #[must_use]
    pub fn current_identity(&self) -> Option<Identity> {
        self.inner.identity.current_identity()
    }

    /// Current cart for display.
    #[must_use]
    pub fn cart_view(&self) -> CartView {
        CartView::new(&self.inner.cart.snapshot(), self.inner.settings.currency)
    }

    /// Look `id` up in the catalog and add one unit to the cart.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for unknown products, `AppError::Catalog`
    /// if the catalog cannot be read, or `AppError::Cart` if the cart is
    /// locked by a checkout.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn add_product(&self, id: &ProductId) -> Result<()> {
        let product = self
            .inner
            .catalog
            .find_product(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
        self.inner.cart.add_to_cart(&product)?;
        error::add_breadcrumb("cart", "Added to cart", Some(&[("product_id", id.as_str())]));
        Ok(())
    }

    /// Check out the cart as the current identity.
    ///
    /// Server-side failures are reported to Sentry before being returned.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Checkout` with the checkout outcome.
    pub async fn checkout_cart(&self) -> Result<StoredOrder> {
        let identity = self.current_identity();
        match self.inner.checkout.finish_purchase(identity.as_ref()).await {
            Ok(order) => {
                let key = order.key.to_string();
                error::add_breadcrumb("checkout", "Order placed", Some(&[("order_key", key.as_str())]));
                Ok(order)
            }
            Err(e) => {
                let err = AppError::from(e);
                err.report();
                Err(err)
            }
        }
    }

    /// Receipt for the current identity's most recent order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthenticated` if nobody is signed in, or
    /// `AppError::Database` if the store cannot be read.
    pub async fn latest_receipt(&self) -> Result<Option<ReceiptView>> {
        let owner = self.require_identity()?.id;
        let latest = self.inner.orders.latest_order(&owner).await?;
        Ok(latest.map(|order| ReceiptView::new(&order, self.inner.settings.currency)))
    }

    /// Receipts for every order of the current identity, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthenticated` if nobody is signed in, or
    /// `AppError::Database` if the store cannot be read.
    pub async fn order_history(&self) -> Result<Vec<ReceiptView>> {
        let owner = self.require_identity()?.id;
        let orders = self.inner.orders.list_orders(&owner).await?;
        Ok(orders
            .iter()
            .map(|order| ReceiptView::new(order, self.inner.settings.currency))
            .collect())
    }

    /// Follow the current identity's most recent order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthenticated` if nobody is signed in, or
    /// `AppError::Database` if the subscription cannot be set up.
    pub async fn watch_receipts(&self) -> Result<OrderSubscription> {
        let owner = self.require_identity()?.id;
        Ok(self.inner.orders.subscribe_latest(&owner).await?)
    }

    /// Apply a change of identity.
    ///
    /// When the previously seen user signs out (or is replaced by another
    /// user) the cart is cleared if the session is configured to do so. The
    /// Sentry user follows the identity.
    pub fn on_identity_changed(&self, current: Option<&Identity>) {
        let previous = {
            let mut seen = self
                .inner
                .seen_identity
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *seen, current.cloned())
        };

        match current {
            Some(identity) => {
                error::set_sentry_user(&identity.id, identity.email.as_deref());
            }
            None => error::clear_sentry_user(),
        }

        let left = previous
            .as_ref()
            .is_some_and(|prev| current.is_none_or(|cur| cur.id != prev.id));
        if left && self.inner.settings.clear_cart_on_sign_out {
            match self.inner.cart.clear_cart() {
                Ok(()) => info!("Cart cleared on sign-out"),
                Err(e) => tracing::warn!(error = %e, "Cart not cleared on sign-out"),
            }
        }
    }

    /// Apply identity changes as they happen, until the provider goes away.
    #[must_use]
    pub fn watch_identity(&self) -> JoinHandle<()> {
        let session = self.clone();
        let mut rx = self.inner.identity.subscribe();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let current = rx.borrow_and_update().clone();
                session.on_identity_changed(current.as_ref());
            }
        })
    }

    fn require_identity(&self) -> Result<Identity> {
        self.current_identity().ok_or(AppError::Unauthenticated)
    }
}
