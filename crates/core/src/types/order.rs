//! Persisted order records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{OrderKey, OwnerId};
use super::line_item::{LineItem, items_count, items_total};

/// Immutable snapshot of a completed purchase.
///
/// This is the only persisted schema the core defines; its JSON shape
/// (`items`, `totalAmount`, `timestamp`, `ownerId`) must survive a round trip
/// through every order store unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub items: Vec<LineItem>,
    pub total_amount: Decimal,
    pub timestamp: DateTime<Utc>,
    pub owner_id: OwnerId,
}

impl OrderRecord {
    /// Build a record from a cart snapshot. The total is computed from the
    /// items, never supplied by the caller.
    #[must_use]
    pub fn new(items: Vec<LineItem>, owner_id: OwnerId, timestamp: DateTime<Utc>) -> Self {
        let total_amount = items_total(&items);
        Self {
            items,
            total_amount,
            timestamp,
            owner_id,
        }
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        items_count(&self.items)
    }
}

/// An order record together with the key the store assigned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredOrder {
    pub key: OrderKey,
    #[serde(flatten)]
    pub record: OrderRecord,
}
