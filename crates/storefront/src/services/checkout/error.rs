//! Checkout error types.

use std::time::Duration;

use thiserror::Error;

use crate::db::RepositoryError;

/// Why an order could not be saved.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The order store rejected or failed the write.
    #[error(transparent)]
    Store(#[from] RepositoryError),

    /// The order store did not answer in time.
    #[error("no response from order store after {0:?}")]
    TimedOut(Duration),
}

/// Errors that can occur when finishing a purchase.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nobody is signed in.
    #[error("sign in to complete your purchase")]
    Unauthenticated,

    /// The cart has no items.
    #[error("cart is empty")]
    EmptyCart,

    /// The order could not be saved. The cart is left as it was.
    #[error("failed to save order: {0}")]
    PersistenceFailed(#[from] PersistError),

    /// Another checkout for this cart has not finished.
    #[error("a checkout is already in progress")]
    CheckoutInProgress,
}

impl CheckoutError {
    /// Whether the caller may retry the same checkout unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::PersistenceFailed(_) | Self::CheckoutInProgress)
    }
}
