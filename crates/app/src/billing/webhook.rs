//! Stripe webhook verification and event decoding.
//!
//! Signature header format: `Stripe-Signature: t=<unix>,v1=<hex>[,v1=<hex>...]`.
//! The signed payload is `"{t}.{raw body}"`, HMAC-SHA256 with the endpoint
//! secret.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use super::{BillingError, CheckoutSession};

/// Maximum age of a signed webhook, in seconds.
pub const TOLERANCE_SECS: i64 = 300;

/// Events that can carry a paid checkout session.
const SESSION_PAID_EVENTS: &[&str] = &[
    "checkout.session.completed",
    "checkout.session.async_payment_succeeded",
];

/// A webhook event envelope.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

/// The `data` member of a webhook event.
#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

impl WebhookEvent {
    /// Parse a raw webhook body.
    ///
    /// # Errors
    ///
    /// Returns `BillingError::Parse` if the body is not a webhook event.
    pub fn parse(payload: &str) -> Result<Self, BillingError> {
        serde_json::from_str(payload).map_err(|e| BillingError::Parse(e.to_string()))
    }

    /// The checkout session carried by a session-paid event, if this is one.
    ///
    /// # Errors
    ///
    /// Returns `BillingError::Parse` if the event object is not a session.
    pub fn checkout_session(&self) -> Result<Option<CheckoutSession>, BillingError> {
        if !SESSION_PAID_EVENTS.contains(&self.event_type.as_str()) {
            return Ok(None);
        }
        serde_json::from_value(self.data.object.clone())
            .map(Some)
            .map_err(|e| BillingError::Parse(e.to_string()))
    }
}

/// Verify a `Stripe-Signature` header against the raw request body.
///
/// # Errors
///
/// Returns `BillingError::InvalidSignature` if the header is malformed, the
/// timestamp is outside the tolerance window, or no `v1` signature matches.
pub fn verify_signature(
    secret: &str,
    header: &str,
    payload: &str,
    now: i64,
) -> Result<(), BillingError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for item in header.split(',') {
        match item.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| BillingError::InvalidSignature("Missing timestamp".to_string()))?;
    let ts: i64 = timestamp
        .parse()
        .map_err(|_| BillingError::InvalidSignature("Invalid timestamp".to_string()))?;

    if now.abs_diff(ts) > TOLERANCE_SECS.unsigned_abs() {
        return Err(BillingError::InvalidSignature(
            "Request timestamp too old".to_string(),
        ));
    }

    let expected = sign(secret, timestamp, payload)?;

    if signatures
        .iter()
        .any(|candidate| constant_time_compare(&expected, candidate))
    {
        Ok(())
    } else {
        Err(BillingError::InvalidSignature(
            "Signature mismatch".to_string(),
        ))
    }
}

/// Compute the hex `v1` signature for a payload.
///
/// # Errors
///
/// Returns `BillingError::InvalidSignature` if the secret cannot key the MAC.
pub fn sign(secret: &str, timestamp: &str, payload: &str) -> Result<String, BillingError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| BillingError::InvalidSignature(e.to_string()))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
