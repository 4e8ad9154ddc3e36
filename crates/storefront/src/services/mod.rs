//! Business logic services for storefront.
//!
//! # Services
//!
//! - `cart` - Session cart state, mutations and subscriptions
//! - `checkout` - Cart snapshot to persisted order
//! - `catalog` - Product and category listings
//! - `identity` - Who is signed in

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod identity;

pub use cart::{CartError, CartSnapshot, CartStore, SubscriptionId};
pub use catalog::{Catalog, CatalogError, HttpCatalog, InMemoryCatalog};
pub use checkout::{CheckoutError, CheckoutProcessor, PersistError};
pub use identity::{IdentityProvider, LocalIdentity};
