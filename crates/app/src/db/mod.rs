//! Database operations for the dashboard `PostgreSQL`.
//!
//! # Schema: `brickyard`
//!
//! ## Tables
//!
//! - `asset_type` - Reference data (slug, name, provider use codes)
//! - `license` - Entitlements per (user, asset type, location)
//! - `integration_secret` - Encrypted third-party API keys per user
//!
//! Users live in the managed auth provider; rows reference them by UUID.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/app/migrations/` and run via:
//! ```bash
//! cargo run -p brickyard-cli -- migrate
//! ```

pub mod asset_types;
pub mod integration_secrets;
pub mod licenses;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use asset_types::AssetTypeRepository;
pub use integration_secrets::IntegrationSecretRepository;
pub use licenses::{LicenseRepository, LicenseStore};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unknown asset type).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map foreign-key violations to `RepositoryError::Conflict`.
fn map_constraint_error(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_foreign_key_violation()
    {
        return RepositoryError::Conflict(db_err.message().to_owned());
    }
    RepositoryError::Database(e)
}
