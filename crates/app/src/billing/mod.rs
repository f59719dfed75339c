//! Billing collaborator (Stripe Checkout).
//!
//! # Flow
//!
//! ```text
//! NoLicense --create session--> PendingPayment --webhook--> Licensed
//! ```
//!
//! Session creation happens in [`crate::services::checkout`]. The billing
//! provider owns `PendingPayment`; confirmation arrives through
//! `POST /webhooks/stripe` (see [`webhook`]) or the CLI `licenses reconcile`
//! command, and both converge on [`LicenseGrant::from_session`].

mod stripe;
pub mod webhook;

use std::collections::HashMap;

use async_trait::async_trait;
use brickyard_core::{SLUG_SEPARATOR, UserId};
use serde::Deserialize;
use thiserror::Error;

use crate::db::licenses::GrantParams;

pub use stripe::StripeClient;

/// Metadata keys attached to every checkout session.
pub mod metadata_keys {
    pub const USER_ID: &str = "user_id";
    pub const LOCATION: &str = "location";
    pub const ASSET_TYPES: &str = "asset_types";
}

/// Errors that can occur when interacting with the billing provider.
#[derive(Debug, Error)]
pub enum BillingError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response or event payload.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Webhook signature did not verify.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Session metadata is missing or malformed.
    #[error("Invalid session metadata: {0}")]
    InvalidMetadata(String),
}

/// Parameters for a license checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    pub user_id: UserId,
    /// Location code being licensed.
    pub location: String,
    pub asset_types: Vec<String>,
    /// Line item description shown on the payment page.
    pub description: String,
    /// Total charge in the currency's minor unit.
    pub amount_cents: i64,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// A newly created checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedSession {
    pub id: String,
    /// Hosted payment page.
    #[serde(default)]
    pub url: Option<String>,
}

/// A checkout session as reported by the billing provider.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// `paid`, `unpaid`, or `no_payment_required`.
    pub payment_status: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Anything that can open a checkout session.
#[async_trait]
pub trait BillingGateway: Send + Sync {
    /// Create a hosted checkout session.
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CreatedSession, BillingError>;
}

/// Licenses to write once a session is paid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseGrant {
    pub user_id: UserId,
    pub location: String,
    pub asset_types: Vec<String>,
    pub checkout_session_id: String,
}

impl LicenseGrant {
    /// Extract the grant from a session.
    ///
    /// Returns `Ok(None)` while the session is unpaid.
    ///
    /// # Errors
    ///
    /// Returns `BillingError::InvalidMetadata` if a paid session lacks the
    /// metadata written at creation time.
    pub fn from_session(session: &CheckoutSession) -> Result<Option<Self>, BillingError> {
        if session.payment_status != "paid" {
            return Ok(None);
        }

        let get = |key: &str| {
            session
                .metadata
                .get(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| BillingError::InvalidMetadata(format!("missing {key}")))
        };

        let user_id = UserId::parse(get(metadata_keys::USER_ID)?)
            .map_err(|e| BillingError::InvalidMetadata(format!("user_id: {e}")))?;
        let location = get(metadata_keys::LOCATION)?.clone();
        let asset_types: Vec<String> = get(metadata_keys::ASSET_TYPES)?
            .split(SLUG_SEPARATOR)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        if asset_types.is_empty() {
            return Err(BillingError::InvalidMetadata(
                "asset_types is empty".to_string(),
            ));
        }

        Ok(Some(Self {
            user_id,
            location,
            asset_types,
            checkout_session_id: session.id.clone(),
        }))
    }

    /// Repository parameters for writing this grant.
    #[must_use]
    pub fn params(&self) -> GrantParams<'_> {
        GrantParams {
            user_id: self.user_id,
            location_internal_id: &self.location,
            asset_type_slugs: &self.asset_types,
            checkout_session_id: Some(&self.checkout_session_id),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const USER: &str = "6f1c2a9e-3b4d-4c5e-8f70-1a2b3c4d5e6f";

    fn session(payment_status: &str, metadata: &[(&str, &str)]) -> CheckoutSession {
        CheckoutSession {
            id: "cs_test_123".to_string(),
            payment_status: payment_status.to_string(),
            metadata: metadata
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_paid_session_yields_grant() {
        let grant = LicenseGrant::from_session(&session(
            "paid",
            &[
                ("user_id", USER),
                ("location", "city:Austin:TX"),
                ("asset_types", "retail, industrial"),
            ],
        ))
        .unwrap()
        .unwrap();

        assert_eq!(grant.user_id.to_string(), USER);
        assert_eq!(grant.location, "city:Austin:TX");
        assert_eq!(grant.asset_types, vec!["retail", "industrial"]);
        assert_eq!(grant.checkout_session_id, "cs_test_123");

        let params = grant.params();
        assert_eq!(params.location_internal_id, "city:Austin:TX");
        assert_eq!(params.asset_type_slugs.len(), 2);
        assert_eq!(params.checkout_session_id, Some("cs_test_123"));
    }

    #[test]
    fn test_unpaid_session_yields_nothing() {
        let grant = LicenseGrant::from_session(&session("unpaid", &[])).unwrap();
        assert!(grant.is_none());
    }

    #[test]
    fn test_paid_session_without_metadata_is_error() {
        let err = LicenseGrant::from_session(&session("paid", &[("user_id", USER)])).unwrap_err();
        assert!(matches!(err, BillingError::InvalidMetadata(_)));
    }

    #[test]
    fn test_bad_user_id_is_error() {
        let err = LicenseGrant::from_session(&session(
            "paid",
            &[
                ("user_id", "nope"),
                ("location", "state:TX"),
                ("asset_types", "retail"),
            ],
        ))
        .unwrap_err();
        assert!(matches!(err, BillingError::InvalidMetadata(_)));
    }
}
