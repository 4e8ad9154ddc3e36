//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type for everything the storefront surfaces
//! to a caller. Infrastructure failures are captured to Sentry through
//! [`AppError::report`]; caller mistakes are not.

use thiserror::Error;

use crate::config::ConfigError;
use crate::db::RepositoryError;
use crate::services::cart::CartError;
use crate::services::catalog::CatalogError;
use crate::services::checkout::CheckoutError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Cart mutation rejected.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout did not complete.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Catalog could not be read.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Order store operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Nobody is signed in.
    #[error("Unauthenticated")]
    Unauthenticated,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    /// Whether this is our fault rather than the caller's.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Catalog(_)
                | Self::Config(_)
                | Self::Checkout(CheckoutError::PersistenceFailed(_))
        )
    }

    /// Whether repeating the same request may succeed.
    #[must_use]
    pub const fn retryable(&self) -> bool {
        match self {
            Self::Checkout(err) => err.is_retryable(),
            Self::Cart(CartError::CheckoutInProgress) | Self::Catalog(_) | Self::Database(_) => {
                true
            }
            _ => false,
        }
    }

    /// Capture server errors to Sentry and log them.
    ///
    /// Returns the Sentry event id when the error was captured.
    pub fn report(&self) -> Option<sentry::types::Uuid> {
        if !self.is_server_error() {
            tracing::debug!(error = %self, "Request rejected");
            return None;
        }

        let event_id = sentry::capture_error(self);
        tracing::error!(
            error = %self,
            sentry_event_id = %event_id,
            "Storefront error"
        );
        Some(event_id)
    }

    /// Message safe to show to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Cart(CartError::InvalidArgument(_)) => {
                "This product can't be added to the cart".to_string()
            }
            Self::Cart(CartError::CheckoutInProgress)
            | Self::Checkout(CheckoutError::CheckoutInProgress) => {
                "Your order is being placed, please wait".to_string()
            }
            Self::Checkout(CheckoutError::Unauthenticated) | Self::Unauthenticated => {
                "Please sign in to continue".to_string()
            }
            Self::Checkout(CheckoutError::EmptyCart) => "Your cart is empty".to_string(),
            Self::Checkout(CheckoutError::PersistenceFailed(_)) => {
                "We couldn't place your order. Your cart has been kept, please try again"
                    .to_string()
            }
            Self::Catalog(_) => "Products are unavailable right now".to_string(),
            Self::NotFound(what) => format!("Not found: {what}"),
            Self::Database(_) | Self::Config(_) => "Something went wrong".to_string(),
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after sign-in to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on sign-out to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
