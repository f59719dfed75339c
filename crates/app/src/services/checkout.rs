//! License checkout.
//!
//! Validates a checkout request against the asset type catalog, prices it from
//! the paywall result count, and opens a hosted payment session. Billing failures never surface as errors:
//! the user is sent back to the dashboard with `error=checkout_failed`.

use std::sync::Arc;

use brickyard_core::{CheckoutRequest, FieldError, Location, UserId, ValidationErrors};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use super::search::AssetTypeCatalog;
use crate::billing::{BillingGateway, CheckoutSessionRequest};
use crate::config::BillingConfig;
use crate::db::RepositoryError;

/// Query parameter appended to the return path when checkout fails.
pub const CHECKOUT_FAILED: &str = "error=checkout_failed";

/// Charge calculation inputs, in the currency's minor unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pricing {
    pub price_per_record_cents: i64,
    pub minimum_charge_cents: i64,
    pub currency: String,
}

impl Pricing {
    /// Total charge for `result_count` records, never below the minimum.
    #[must_use]
    pub fn amount_cents(&self, result_count: i64) -> i64 {
        result_count
            .saturating_mul(self.price_per_record_cents)
            .max(self.minimum_charge_cents)
    }
}

impl From<&BillingConfig> for Pricing {
    fn from(config: &BillingConfig) -> Self {
        Self {
            price_per_record_cents: config.price_per_record_cents,
            minimum_charge_cents: config.minimum_charge_cents,
            currency: config.currency.clone(),
        }
    }
}

/// What the dashboard should do after a checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CheckoutOutcome {
    /// Continue to the hosted payment page.
    #[serde(rename_all = "camelCase")]
    Session {
        session_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    /// Return to a dashboard path.
    Redirect {
        #[serde(rename = "redirect")]
        location: String,
    },
}

/// Opens checkout sessions for unlicensed locations.
#[derive(Clone)]
pub struct LicenseCheckout {
    billing: Arc<dyn BillingGateway>,
    catalog: Arc<dyn AssetTypeCatalog>,
    pricing: Pricing,
    base_url: String,
}

impl LicenseCheckout {
    /// Create a checkout service.
    ///
    /// `base_url` is the public dashboard origin used to build return URLs.
    #[must_use]
    pub fn new(
        billing: Arc<dyn BillingGateway>,
        catalog: Arc<dyn AssetTypeCatalog>,
        pricing: Pricing,
        base_url: &str,
    ) -> Self {
        Self {
            billing,
            catalog,
            pricing,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Validate the request and open a checkout session for it.
    ///
    /// # Errors
    ///
    /// Returns `ValidationErrors` with every violated field, including asset
    /// types missing from the catalog. Billing and catalog failures are
    /// reported as `CheckoutOutcome::Redirect`, not as errors.
    #[instrument(skip(self, request), fields(location = %request.location))]
    pub async fn create(
        &self,
        user_id: UserId,
        request: &CheckoutRequest,
    ) -> Result<CheckoutOutcome, ValidationErrors> {
        let mut errors = request
            .validate()
            .err()
            .map(|e| e.errors)
            .unwrap_or_default();

        // Slugs are only looked up once their shape is valid
        if !errors.iter().any(|e| e.field == "assetTypes") {
            match self.unknown_asset_types(&request.asset_types).await {
                Ok(unknown) => errors.extend(unknown.into_iter().map(|slug| {
                    FieldError::new("assetTypes", &format!("Unknown asset type: {slug}"))
                })),
                Err(e) if errors.is_empty() => {
                    error!(user_id = %user_id, error = %e, "Failed to look up asset types");
                    return Ok(failed(request.redirect_path()));
                }
                Err(e) => warn!(error = %e, "Asset type lookup failed"),
            }
        }

        if !errors.is_empty() {
            return Err(ValidationErrors { errors });
        }

        let redirect_path = request.redirect_path();
        let session_request = CheckoutSessionRequest {
            user_id,
            location: request.location.clone(),
            asset_types: request.asset_types.clone(),
            description: describe(request),
            amount_cents: self.pricing.amount_cents(request.result_count),
            currency: self.pricing.currency.clone(),
            success_url: format!(
                "{}{}",
                self.base_url,
                with_query(redirect_path, "checkout=success")
            ),
            cancel_url: format!(
                "{}{}",
                self.base_url,
                with_query(redirect_path, "checkout=cancelled")
            ),
        };

        match self.billing.create_checkout_session(&session_request).await {
            Ok(session) => {
                info!(
                    user_id = %user_id,
                    session_id = %session.id,
                    amount_cents = session_request.amount_cents,
                    "Checkout session opened"
                );
                Ok(CheckoutOutcome::Session {
                    session_id: session.id,
                    url: session.url,
                })
            }
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Failed to create checkout session");
                Ok(failed(redirect_path))
            }
        }
    }

    async fn unknown_asset_types<'a>(
        &self,
        slugs: &'a [String],
    ) -> Result<Vec<&'a str>, RepositoryError> {
        let mut unknown = Vec::new();
        for slug in slugs {
            if self.catalog.find_by_slug(slug.trim()).await?.is_none() {
                unknown.push(slug.as_str());
            }
        }
        Ok(unknown)
    }
}

fn failed(redirect_path: &str) -> CheckoutOutcome {
    CheckoutOutcome::Redirect {
        location: with_query(redirect_path, CHECKOUT_FAILED),
    }
}

/// Line item name, e.g. `Lead license: retail, office in Austin, TX`.
fn describe(request: &CheckoutRequest) -> String {
    let place = Location::parse(&request.location)
        .map_or_else(|_| request.location.trim().to_string(), |l| l.formatted());
    format!(
        "Lead license: {} in {place}",
        request.asset_types.join(", ")
    )
}

/// Append a query pair to a path that may already carry a query string.
fn with_query(path: &str, pair: &str) -> String {
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{path}{separator}{pair}")
}
