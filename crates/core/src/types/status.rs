//! Status enums for various entities.

use serde::{Deserialize, Serialize};

/// Lifecycle of a single checkout attempt.
///
/// ```text
/// Idle -> Validating -> Persisting -> Committed
///                    \             \-> Failed
///                     \-> Idle (precondition rejected)
/// ```
///
/// `Committed` and `Failed` are resting states: like `Idle`, a new attempt
/// may start from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStatus {
    /// No checkout running.
    #[default]
    Idle,
    /// Checking identity and cart contents.
    Validating,
    /// Waiting on the order store.
    Persisting,
    /// The last attempt stored an order and cleared the cart.
    Committed,
    /// The last attempt could not store the order; the cart is untouched.
    Failed,
}

impl CheckoutStatus {
    /// Whether an attempt is in flight. A new attempt may only start when
    /// this is `false`.
    #[must_use]
    pub const fn is_busy(self) -> bool {
        matches!(self, Self::Validating | Self::Persisting)
    }
}

impl std::fmt::Display for CheckoutStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Validating => write!(f, "validating"),
            Self::Persisting => write!(f, "persisting"),
            Self::Committed => write!(f, "committed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for CheckoutStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Self::Idle),
            "validating" => Ok(Self::Validating),
            "persisting" => Ok(Self::Persisting),
            "committed" => Ok(Self::Committed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("invalid checkout status: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_states() {
        assert!(CheckoutStatus::Validating.is_busy());
        assert!(CheckoutStatus::Persisting.is_busy());
        assert!(!CheckoutStatus::Idle.is_busy());
        assert!(!CheckoutStatus::Committed.is_busy());
        assert!(!CheckoutStatus::Failed.is_busy());
    }

    #[test]
    fn test_display_from_str() {
        for status in [
            CheckoutStatus::Idle,
            CheckoutStatus::Validating,
            CheckoutStatus::Persisting,
            CheckoutStatus::Committed,
            CheckoutStatus::Failed,
        ] {
            assert_eq!(status.to_string().parse::<CheckoutStatus>().unwrap(), status);
        }
        assert!("done".parse::<CheckoutStatus>().is_err());
    }
}
