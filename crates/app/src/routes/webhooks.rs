//! Billing webhook handler.
//!
//! The only writer of license rows during normal operation. Grants are
//! idempotent, so redelivered events are acknowledged without side effects.

use axum::{
    Json,
    extract::State,
    http::HeaderMap,
};
use secrecy::ExposeSecret;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use crate::billing::webhook::{WebhookEvent, verify_signature};
use crate::billing::{BillingError, LicenseGrant};
use crate::error::Result;
use crate::state::AppState;

const SIGNATURE_HEADER: &str = "stripe-signature";

/// Handle a Stripe webhook.
///
/// Verifies the signature over the raw body, then grants licenses for paid
/// checkout sessions. Other event types are acknowledged and ignored.
#[instrument(skip_all)]
pub async fn stripe(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| BillingError::InvalidSignature("Missing signature header".to_string()))?;

    verify_signature(
        state.config().billing.webhook_secret.expose_secret(),
        signature,
        &body,
        chrono::Utc::now().timestamp(),
    )?;

    let event = WebhookEvent::parse(&body)?;
    let Some(session) = event.checkout_session()? else {
        info!(event_id = %event.id, event_type = %event.event_type, "Webhook ignored");
        return Ok(Json(json!({ "received": true })));
    };

    let Some(grant) = LicenseGrant::from_session(&session)? else {
        warn!(session_id = %session.id, payment_status = %session.payment_status, "Session not paid yet");
        return Ok(Json(json!({ "received": true })));
    };

    let created = state
        .licenses()
        .grant(&grant.params())
        .await?;

    info!(
        event_id = %event.id,
        session_id = %grant.checkout_session_id,
        user_id = %grant.user_id,
        location = %grant.location,
        created,
        "Licenses granted"
    );

    Ok(Json(json!({ "received": true, "granted": created })))
}
