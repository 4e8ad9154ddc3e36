//! Cart line items and the arithmetic shared by cart, checkout and receipt.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::product::Product;
use super::quantity::Quantity;

/// One product plus the number of units selected.
///
/// Serializes flat: the product's fields followed by `quantity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(flatten)]
    pub product: Product,
    pub quantity: Quantity,
}

impl LineItem {
    /// A new line with a single unit of `product`.
    #[must_use]
    pub const fn new(product: Product) -> Self {
        Self {
            product,
            quantity: Quantity::ONE,
        }
    }

    /// A line with an explicit quantity.
    #[must_use]
    pub const fn with_quantity(product: Product, quantity: Quantity) -> Self {
        Self { product, quantity }
    }

    /// The product identifier this line is keyed by.
    #[must_use]
    pub const fn id(&self) -> &ProductId {
        &self.product.id
    }

    /// Unit price of the product.
    #[must_use]
    pub const fn unit_price(&self) -> Decimal {
        self.product.price
    }

    /// `price × quantity`, saturating at `Decimal::MAX`.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.product
            .price
            .saturating_mul(Decimal::from(self.quantity.get()))
    }
}

/// Sum of line totals, saturating at `Decimal::MAX`.
#[must_use]
pub fn items_total(items: &[LineItem]) -> Decimal {
    items
        .iter()
        .map(LineItem::total)
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

/// Sum of quantities.
#[must_use]
pub fn items_count(items: &[LineItem]) -> u64 {
    items.iter().map(|item| u64::from(item.quantity.get())).sum()
}
