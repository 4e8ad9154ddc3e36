//! Receipt screen view.

use chrono::{DateTime, Utc};
use serde::Serialize;

use techhub_core::{CurrencyCode, LineItem, Price, StoredOrder};

/// Format used for the purchase date.
pub const PURCHASE_DATE_FORMAT: &str = "%B %-d, %Y at %H:%M UTC";

/// One purchased line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLineView {
    pub title: String,
    pub image: Option<String>,
    pub quantity: u32,
    pub unit_price: Price,
    pub subtotal: Price,
}

impl ReceiptLineView {
    fn new(item: &LineItem, currency: CurrencyCode) -> Self {
        Self {
            title: item.product.title.clone(),
            image: item.product.main_image.clone(),
            quantity: item.quantity.get(),
            unit_price: Price::new(item.unit_price(), currency),
            subtotal: Price::new(item.total(), currency),
        }
    }
}

/// A stored order as shown on the receipt screen.
///
/// The final total is the one recorded at checkout, not a recomputation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptView {
    pub order_key: String,
    pub lines: Vec<ReceiptLineView>,
    pub item_count: u64,
    pub total: Price,
    pub purchased_at: DateTime<Utc>,
}

impl ReceiptView {
    #[must_use]
    pub fn new(order: &StoredOrder, currency: CurrencyCode) -> Self {
        let record = &order.record;
        Self {
            order_key: order.key.to_string(),
            lines: record
                .items
                .iter()
                .map(|item| ReceiptLineView::new(item, currency))
                .collect(),
            item_count: record.item_count(),
            total: Price::new(record.total_amount, currency),
            purchased_at: record.timestamp,
        }
    }

    /// Purchase date for display, e.g. `March 14, 2025 at 15:09 UTC`.
    #[must_use]
    pub fn purchase_date(&self) -> String {
        self.purchased_at.format(PURCHASE_DATE_FORMAT).to_string()
    }
}

impl From<&StoredOrder> for ReceiptView {
    fn from(order: &StoredOrder) -> Self {
        Self::new(order, CurrencyCode::default())
    }
}
