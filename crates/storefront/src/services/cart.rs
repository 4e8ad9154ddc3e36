//! Session cart.
//!
//! [`CartState`] is a plain value with a reducer ([`CartState::apply`]);
//! [`CartStore`] owns one behind a lock, stamps each change with a revision
//! and notifies subscribers. Lines keep insertion order and are keyed by
//! product id, so a product appears at most once.
//!
//! While a checkout is persisting, the store is locked through a
//! [`CheckoutLock`] and every mutation fails with
//! [`CartError::CheckoutInProgress`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, instrument};

use techhub_core::{LineItem, Product, ProductDraft, ProductError, ProductId, items_count, items_total};

/// Errors returned by cart mutations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartError {
    /// The listing could not be turned into a product.
    #[error("invalid product: {0}")]
    InvalidArgument(#[from] ProductError),

    /// The cart is locked by a checkout that is persisting.
    #[error("a checkout is in progress")]
    CheckoutInProgress,
}

/// A single cart mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    Add(Product),
    Remove(ProductId),
    Increment(ProductId),
    Decrement(ProductId),
    Clear,
}

/// Ordered line items, unique by product id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    items: Vec<LineItem>,
}

impl CartState {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Apply `action` and report whether anything changed.
    pub fn apply(&mut self, action: CartAction) -> bool {
        match action {
            CartAction::Add(product) => {
                if let Some(line) = self.line_mut(&product.id) {
                    line.quantity = line.quantity.incremented();
                } else {
                    self.items.push(LineItem::new(product));
                }
                true
            }
            CartAction::Remove(id) => {
                let before = self.items.len();
                self.items.retain(|line| line.id() != &id);
                self.items.len() != before
            }
            CartAction::Increment(id) => self.line_mut(&id).is_some_and(|line| {
                let next = line.quantity.incremented();
                let changed = next != line.quantity;
                line.quantity = next;
                changed
            }),
            CartAction::Decrement(id) => self.line_mut(&id).is_some_and(|line| {
                let next = line.quantity.decremented();
                let changed = next != line.quantity;
                line.quantity = next;
                changed
            }),
            CartAction::Clear => {
                let changed = !self.items.is_empty();
                self.items.clear();
                changed
            }
        }
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Line for `id`, if present.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&LineItem> {
        self.items.iter().find(|line| line.id() == id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of `price × quantity` over all lines.
    #[must_use]
    pub fn total(&self) -> Decimal {
        items_total(&self.items)
    }

    /// Sum of quantities.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        items_count(&self.items)
    }

    fn line_mut(&mut self, id: &ProductId) -> Option<&mut LineItem> {
        self.items.iter_mut().find(|line| line.id() == id)
    }
}

/// Immutable copy of the cart at a given revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSnapshot {
    pub items: Vec<LineItem>,
    /// Increases by one on every change to the cart.
    pub revision: u64,
}

impl CartSnapshot {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn total(&self) -> Decimal {
        items_total(&self.items)
    }

    #[must_use]
    pub fn item_count(&self) -> u64 {
        items_count(&self.items)
    }
}

/// Handle returned by [`CartStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&CartSnapshot) + Send + Sync>;

struct Inner {
    state: CartState,
    revision: u64,
    locked: bool,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_listener: u64,
}

impl Inner {
    fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            items: self.state.items.clone(),
            revision: self.revision,
        }
    }
}

/// The session's cart.
///
/// Mutations never suspend. They are applied in the order they acquire the
/// lock, and listeners run on the calling thread after the lock is released,
/// in registration order. Listeners must not mutate the cart themselves.
pub struct CartStore {
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("CartStore")
            .field("state", &inner.state)
            .field("revision", &inner.revision)
            .field("locked", &inner.locked)
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

impl Default for CartStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CartStore {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: CartState::new(),
                revision: 0,
                locked: false,
                listeners: Vec::new(),
                next_listener: 0,
            }),
        }
    }

    /// Add one unit of `product`, inserting a new line if needed.
    ///
    /// # Errors
    ///
    /// Returns `CartError::CheckoutInProgress` while the cart is locked.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub fn add_to_cart(&self, product: &Product) -> Result<(), CartError> {
        self.dispatch(CartAction::Add(product.clone()))
    }

    /// Validate a raw catalog listing and add it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidArgument` if the listing is malformed (the
    /// cart is left untouched), or `CartError::CheckoutInProgress` while the
    /// cart is locked.
    pub fn add_listing(&self, draft: ProductDraft) -> Result<(), CartError> {
        let product = Product::try_from(draft)?;
        self.add_to_cart(&product)
    }

    /// Remove the line for `id`. Absent ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns `CartError::CheckoutInProgress` while the cart is locked.
    pub fn remove_from_cart(&self, id: &ProductId) -> Result<(), CartError> {
        self.dispatch(CartAction::Remove(id.clone()))
    }

    /// One more unit of `id`. Absent ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns `CartError::CheckoutInProgress` while the cart is locked.
    pub fn increment_quantity(&self, id: &ProductId) -> Result<(), CartError> {
        self.dispatch(CartAction::Increment(id.clone()))
    }

    /// One fewer unit of `id`, never below one. Absent ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns `CartError::CheckoutInProgress` while the cart is locked.
    pub fn decrement_quantity(&self, id: &ProductId) -> Result<(), CartError> {
        self.dispatch(CartAction::Decrement(id.clone()))
    }

    /// Empty the cart. Clearing an empty cart is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `CartError::CheckoutInProgress` while the cart is locked.
    pub fn clear_cart(&self) -> Result<(), CartError> {
        self.dispatch(CartAction::Clear)
    }

    /// `price × quantity` for one line.
    #[must_use]
    pub fn item_total(item: &LineItem) -> Decimal {
        item.total()
    }

    /// Current cart total.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.lock().state.total()
    }

    /// Current number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lock().state.item_count()
    }

    /// Line for `id`, if present.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<LineItem> {
        self.lock().state.get(id).cloned()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().state.is_empty()
    }

    /// Copy of the current lines and revision.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.lock().snapshot()
    }

    /// Whether a checkout currently holds the cart.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.lock().locked
    }

    /// Register `listener` to run after every change.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&CartSnapshot) + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        let id = SubscriptionId(inner.next_listener);
        inner.next_listener += 1;
        inner.listeners.push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.lock();
        let before = inner.listeners.len();
        inner.listeners.retain(|(registered, _)| *registered != id);
        inner.listeners.len() != before
    }

    /// Lock the cart for checkout and take the snapshot to be persisted.
    ///
    /// # Errors
    ///
    /// Returns `CartError::CheckoutInProgress` if the cart is already locked.
    pub fn begin_checkout(&self) -> Result<CheckoutLock<'_>, CartError> {
        let mut inner = self.lock();
        if inner.locked {
            return Err(CartError::CheckoutInProgress);
        }
        inner.locked = true;
        let snapshot = inner.snapshot();
        drop(inner);

        debug!(revision = snapshot.revision, "Cart locked for checkout");
        Ok(CheckoutLock {
            store: self,
            snapshot,
            released: false,
        })
    }

    fn dispatch(&self, action: CartAction) -> Result<(), CartError> {
        let mut inner = self.lock();
        if inner.locked {
            return Err(CartError::CheckoutInProgress);
        }
        if !inner.state.apply(action) {
            return Ok(());
        }
        inner.revision += 1;
        let notification = Self::pending_notification(&inner);
        drop(inner);

        Self::notify(notification);
        Ok(())
    }

    fn pending_notification(inner: &Inner) -> (CartSnapshot, Vec<Listener>) {
        let listeners = inner.listeners.iter().map(|(_, l)| Arc::clone(l)).collect();
        (inner.snapshot(), listeners)
    }

    fn notify((snapshot, listeners): (CartSnapshot, Vec<Listener>)) {
        for listener in listeners {
            listener(&snapshot);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive hold on the cart while an order is persisted.
///
/// [`commit`](Self::commit) clears the cart and releases it; dropping the lock
/// without committing releases it with the cart untouched.
#[derive(Debug)]
pub struct CheckoutLock<'a> {
    store: &'a CartStore,
    snapshot: CartSnapshot,
    released: bool,
}

impl CheckoutLock<'_> {
    /// Cart contents at the moment the lock was taken.
    #[must_use]
    pub const fn snapshot(&self) -> &CartSnapshot {
        &self.snapshot
    }

    /// Reset the cart after a successful checkout and release the lock.
    pub fn commit(mut self) {
        let mut inner = self.store.lock();
        inner.locked = false;
        self.released = true;
        let notification = inner.state.apply(CartAction::Clear).then(|| {
            inner.revision += 1;
            CartStore::pending_notification(&inner)
        });
        drop(inner);

        if let Some(notification) = notification {
            CartStore::notify(notification);
        }
    }
}

impl Drop for CheckoutLock<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.store.lock().locked = false;
        }
    }
}
