//! External data providers used to estimate search result counts.
//!
//! # Providers
//!
//! - [`PlacesClient`] - places-style text search; the count is the number of
//!   facilities returned (self-storage only)
//! - [`PropertyRecordsClient`] - property-record search filtered by use codes;
//!   the provider reports the count
//!
//! Neither client retries. Timeouts come from the underlying `reqwest::Client`.

mod places;
mod property_records;

use std::time::Duration;

use async_trait::async_trait;
use brickyard_core::{AssetType, Location};
use thiserror::Error;

pub use places::PlacesClient;
pub use property_records::PropertyRecordsClient;

/// Request timeout applied to every provider call.
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors that can occur when calling an external data provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Input to a count estimate.
#[derive(Debug, Clone, Copy)]
pub struct CountQuery<'a> {
    pub asset_type: &'a AssetType,
    pub location: &'a Location,
}

/// Anything that can estimate how many results a search would return.
#[async_trait]
pub trait CountProvider: Send + Sync {
    /// Estimate the number of matching properties.
    async fn estimate_count(&self, query: &CountQuery<'_>) -> Result<u64, ProviderError>;
}

/// Build the shared HTTP client used by provider clients.
///
/// # Errors
///
/// Returns error if the HTTP client fails to build.
pub fn http_client() -> Result<reqwest::Client, ProviderError> {
    Ok(reqwest::Client::builder()
        .timeout(PROVIDER_TIMEOUT)
        .build()?)
}

/// Convert a non-success response into `ProviderError::Api`.
async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(ProviderError::Api {
        status: status.as_u16(),
        message,
    })
}
