//! TechHub Core - Shared domain types.
//!
//! This crate provides the types shared by every TechHub component:
//! - `storefront` - Cart store, checkout processor and collaborators
//! - `cli` - Command-line driver for catalog, checkout and receipts
//!
//! # Architecture
//!
//! The core crate contains only types and pure arithmetic - no I/O, no
//! database access, no HTTP clients. This keeps it lightweight and allows it
//! to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - IDs, prices, quantities, products, line items, order records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
