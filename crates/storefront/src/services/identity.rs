//! Signed-in identity.
//!
//! Account management (passwords, registration) lives with the auth backend.
//! The storefront only needs to know who is signed in right now and to hear
//! about changes.

use tokio::sync::watch;
use tracing::info;

use techhub_core::Identity;

/// Source of the current identity.
pub trait IdentityProvider: Send + Sync {
    /// Who is signed in, if anyone.
    fn current_identity(&self) -> Option<Identity>;

    /// Follow sign-in and sign-out.
    fn subscribe(&self) -> watch::Receiver<Option<Identity>>;
}

/// Identity set explicitly by the host application (or the CLI).
#[derive(Debug)]
pub struct LocalIdentity {
    current: watch::Sender<Option<Identity>>,
}

impl Default for LocalIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalIdentity {
    /// Nobody signed in.
    #[must_use]
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self { current }
    }

    /// Start signed in as `identity`.
    #[must_use]
    pub fn signed_in(identity: Identity) -> Self {
        let (current, _) = watch::channel(Some(identity));
        Self { current }
    }

    /// Replace the current identity.
    pub fn sign_in(&self, identity: Identity) {
        info!(user = %identity.id, "Signed in");
        self.current.send_replace(Some(identity));
    }

    /// Clear the current identity. Returns who was signed in.
    pub fn sign_out(&self) -> Option<Identity> {
        let previous = self.current.send_replace(None);
        if let Some(identity) = &previous {
            info!(user = %identity.id, "Signed out");
        }
        previous
    }
}

impl IdentityProvider for LocalIdentity {
    fn current_identity(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use techhub_core::OwnerId;

    use super::*;

    #[tokio::test]
    async fn test_sign_in_and_out_are_observed() {
        let identity = LocalIdentity::new();
        let mut rx = identity.subscribe();
        assert!(identity.current_identity().is_none());

        identity.sign_in(Identity::new(OwnerId::parse("u1").unwrap()).with_email("u1@example.com"));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref().unwrap().id.as_str(), "u1");

        let previous = identity.sign_out().unwrap();
        assert_eq!(previous.email.as_deref(), Some("u1@example.com"));
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
        assert!(identity.sign_out().is_none());
    }
}
