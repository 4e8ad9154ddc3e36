//! Subcommand implementations.

pub mod catalog;
pub mod checkout;
pub mod migrate;
pub mod receipt;

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use techhub_storefront::AppError;
use techhub_storefront::config::{ConfigError, StorefrontConfig};
use techhub_storefront::db::RepositoryError;
use techhub_storefront::services::catalog::{Catalog, CatalogError, InMemoryCatalog, catalog_from_config};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    App(#[from] AppError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Could not read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Catalog from `--catalog-file` when given, otherwise from configuration.
///
/// The file holds `{"products": ..., "categories": ...}` in the backend's
/// listing format.
pub fn open_catalog(
    config: &StorefrontConfig,
    file: Option<&Path>,
) -> Result<Arc<dyn Catalog>, CommandError> {
    let Some(path) = file else {
        return Ok(catalog_from_config(config));
    };

    let raw = std::fs::read_to_string(path).map_err(|source| CommandError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut listings: Value = serde_json::from_str(&raw)?;
    let mut listing = |key: &str| listings.get_mut(key).map_or(Value::Null, Value::take);
    let products = listing("products");
    let categories = listing("categories");
    let catalog = InMemoryCatalog::from_listings(products, categories)?;
    Ok(Arc::new(catalog))
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<(), CommandError> {
    let out = serde_json::to_string_pretty(value)?;
    #[allow(clippy::print_stdout)]
    {
        println!("{out}");
    }
    Ok(())
}
