//! TechHub storefront core.
//!
//! The shopping cart, checkout and receipt flow of the TechHub mobile
//! storefront, with the collaborators they depend on.
//!
//! # Architecture
//!
//! - [`services::cart`] - session cart with subscriptions
//! - [`services::checkout`] - cart snapshot to persisted order
//! - [`services::catalog`] - product listings (HTTP with `moka` cache)
//! - [`services::identity`] - signed-in identity
//! - [`db`] - append-only order stores (`PostgreSQL` or in-memory)
//! - [`models`] - cart and receipt views
//! - [`state`] - per-session wiring
//!
//! UI, navigation and account management live in the host application.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod telemetry;

pub use error::{AppError, Result};
pub use state::{Session, SessionSettings};
