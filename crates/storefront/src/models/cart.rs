//! Cart screen view.

use serde::Serialize;

use techhub_core::{CurrencyCode, LineItem, Price};

use crate::services::cart::CartSnapshot;

/// One cart line as displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    pub product_id: String,
    pub title: String,
    pub image: Option<String>,
    pub quantity: u32,
    pub unit_price: Price,
    pub total: Price,
}

impl CartLineView {
    #[must_use]
    pub fn new(item: &LineItem, currency: CurrencyCode) -> Self {
        Self {
            product_id: item.id().to_string(),
            title: item.product.title.clone(),
            image: item.product.main_image.clone(),
            quantity: item.quantity.get(),
            unit_price: Price::new(item.unit_price(), currency),
            total: Price::new(item.total(), currency),
        }
    }
}

/// The whole cart as displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub item_count: u64,
    pub total: Price,
    pub revision: u64,
}

impl CartView {
    #[must_use]
    pub fn new(snapshot: &CartSnapshot, currency: CurrencyCode) -> Self {
        Self {
            lines: snapshot
                .items
                .iter()
                .map(|item| CartLineView::new(item, currency))
                .collect(),
            item_count: snapshot.item_count(),
            total: Price::new(snapshot.total(), currency),
            revision: snapshot.revision,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use techhub_core::{Product, ProductId};

    use super::*;
    use crate::services::cart::CartStore;

    #[test]
    fn test_view_formats_totals() {
        let cart = CartStore::new();
        let monitor =
            Product::new(ProductId::from(1), "Monitor", Decimal::new(129_999, 2)).unwrap();
        cart.add_to_cart(&monitor).unwrap();
        cart.add_to_cart(&monitor).unwrap();

        let view = CartView::new(&cart.snapshot(), CurrencyCode::USD);

        assert_eq!(view.item_count, 2);
        assert_eq!(view.lines[0].unit_price.to_string(), "$1,299.99");
        assert_eq!(view.lines[0].total.to_string(), "$2,599.98");
        assert_eq!(view.total.to_string(), "$2,599.98");
        assert_eq!(view.revision, 2);
    }

    #[test]
    fn test_empty_view() {
        let view = CartView::new(&CartStore::new().snapshot(), CurrencyCode::EUR);
        assert!(view.is_empty());
        assert_eq!(view.total.to_string(), "€0.00");
    }
}
