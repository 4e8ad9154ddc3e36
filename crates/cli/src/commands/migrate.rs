//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! th-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! # Migration Files
//!
//! Storefront migrations live in `crates/storefront/migrations/`.

use techhub_storefront::config::StorefrontConfig;
use techhub_storefront::db::{self, RepositoryError};

use super::CommandError;

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns `CommandError` if no database is configured, the connection fails,
/// or a migration fails to apply.
pub async fn run(config: &StorefrontConfig) -> Result<(), CommandError> {
    let database_url = config.require_database_url()?;

    tracing::info!("Connecting to storefront database...");
    let pool = db::create_pool(database_url)
        .await
        .map_err(RepositoryError::from)?;

    tracing::info!("Running storefront migrations...");
    db::run_migrations(&pool).await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}
