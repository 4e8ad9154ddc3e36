//! View models for storefront screens.
//!
//! These are read-only projections of cart and order data, with prices
//! already paired with the display currency.

pub mod cart;
pub mod receipt;

pub use cart::{CartLineView, CartView};
pub use receipt::{ReceiptLineView, ReceiptView};
