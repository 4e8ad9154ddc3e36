//! Authenticated identity as seen by the storefront core.

use serde::{Deserialize, Serialize};

use super::id::OwnerId;

/// The signed-in user. Only `id` is read by checkout; `email` is carried for
/// error-tracking context and display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub id: OwnerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Identity {
    /// Create an identity without an email.
    #[must_use]
    pub const fn new(id: OwnerId) -> Self {
        Self { id, email: None }
    }

    /// Attach an email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}
