//! Core types for the TechHub storefront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod identity;
pub mod line_item;
pub mod order;
pub mod price;
pub mod product;
pub mod quantity;
pub mod status;

pub use id::{CategoryId, IdError, MAX_ID_LENGTH, OrderKey, OwnerId, ProductId};
pub use identity::Identity;
pub use line_item::{LineItem, items_count, items_total};
pub use order::{OrderRecord, StoredOrder};
pub use price::{CurrencyCode, MAX_PRICE, Price, PriceError};
pub use product::{Category, Product, ProductDraft, ProductError};
pub use quantity::{Quantity, QuantityError};
pub use status::CheckoutStatus;
