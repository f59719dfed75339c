//! License maintenance commands.
//!
//! # Usage
//!
//! ```bash
//! # Grant licenses for a paid session whose webhook was missed
//! brickyard licenses reconcile --session cs_live_...
//!
//! # Show a user's licenses
//! brickyard licenses list --user 6f1c2a9e-3b4d-4c5e-8f70-1a2b3c4d5e6f
//! ```
//!
//! # Environment Variables
//!
//! - `BRICKYARD_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//! - `STRIPE_SECRET_KEY`, `STRIPE_WEBHOOK_SECRET` - Billing credentials

use brickyard_app::billing::{BillingError, LicenseGrant, StripeClient};
use brickyard_app::config::{self, BillingConfig, ConfigError};
use brickyard_app::db::{self, LicenseRepository, RepositoryError};
use brickyard_core::UserId;
use thiserror::Error;

/// Errors that can occur in license commands.
#[derive(Debug, Error)]
pub enum LicenseCommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Billing error: {0}")]
    Billing(#[from] BillingError),

    #[error("Invalid user ID: {0}")]
    InvalidUser(String),

    #[error("Session {0} is not paid")]
    Unpaid(String),
}

/// Grant the licenses a paid checkout session entitles its buyer to.
///
/// Safe to run repeatedly; existing licenses are left untouched.
///
/// # Errors
///
/// Returns `LicenseCommandError::Unpaid` if the session has not been paid,
/// or another variant if configuration, billing, or the database fails.
pub async fn reconcile(session_id: &str) -> Result<(), LicenseCommandError> {
    let billing = BillingConfig::from_env()?;
    let stripe = StripeClient::new(&billing)?;

    tracing::info!("Fetching checkout session {session_id}...");
    let session = stripe.retrieve_checkout_session(session_id).await?;

    let grant = LicenseGrant::from_session(&session)?
        .ok_or_else(|| LicenseCommandError::Unpaid(session_id.to_string()))?;

    let pool = db::create_pool(&config::database_url_from_env()?).await?;
    let created = LicenseRepository::new(pool).grant(&grant.params()).await?;

    tracing::info!(
        user_id = %grant.user_id,
        location = %grant.location,
        asset_types = %grant.asset_types.join(","),
        created,
        "Reconciled checkout session"
    );
    Ok(())
}

/// Print a user's licenses, one per line.
///
/// # Errors
///
/// Returns `LicenseCommandError::InvalidUser` for a malformed UUID, or a
/// database error.
pub async fn list(user: &str, asset_type: Option<&str>) -> Result<(), LicenseCommandError> {
    let user_id =
        UserId::parse(user).map_err(|e| LicenseCommandError::InvalidUser(e.to_string()))?;

    let pool = db::create_pool(&config::database_url_from_env()?).await?;
    let licenses = LicenseRepository::new(pool)
        .list_for_user(user_id, asset_type)
        .await?;

    #[allow(clippy::print_stdout)]
    {
        for license in &licenses {
            println!(
                "{}\t{}\t{}\t{}",
                license.created_at.to_rfc3339(),
                license.asset_type_slug,
                license.location_internal_id,
                license.checkout_session_id.as_deref().unwrap_or("-"),
            );
        }
    }

    tracing::info!("{} license(s)", licenses.len());
    Ok(())
}
