//! Stripe API client for license checkout sessions.

use async_trait::async_trait;
use brickyard_core::SLUG_SEPARATOR;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use tracing::{debug, instrument};

use super::{
    BillingError, BillingGateway, CheckoutSession, CheckoutSessionRequest, CreatedSession,
    metadata_keys,
};
use crate::config::BillingConfig;

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    base_url: String,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl StripeClient {
    /// Create a new Stripe client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &BillingConfig) -> Result<Self, BillingError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.secret_key.expose_secret());
        let mut auth_header = HeaderValue::from_str(&auth_value)
            .map_err(|e| BillingError::Parse(format!("Invalid API key format: {e}")))?;
        auth_header.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_header);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(crate::providers::PROVIDER_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Retrieve a checkout session by ID.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or the response cannot be parsed.
    #[instrument(skip(self))]
    pub async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, BillingError> {
        let url = format!(
            "{}/v1/checkout/sessions/{}",
            self.base_url,
            urlencoding::encode(session_id)
        );

        let response = self.client.get(&url).send().await?;
        let response = error_for_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| BillingError::Parse(e.to_string()))
    }
}

#[async_trait]
impl BillingGateway for StripeClient {
    #[instrument(skip(self, request), fields(user_id = %request.user_id, location = %request.location))]
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CreatedSession, BillingError> {
        let url = format!("{}/v1/checkout/sessions", self.base_url);
        let form = checkout_form(request);

        let response = self.client.post(&url).form(&form).send().await?;
        let response = error_for_status(response).await?;

        let session: CreatedSession = response
            .json()
            .await
            .map_err(|e| BillingError::Parse(e.to_string()))?;

        debug!(session_id = %session.id, "Checkout session created");
        Ok(session)
    }
}

/// Form-encoded body for `POST /v1/checkout/sessions`.
fn checkout_form(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let asset_types = request
        .asset_types
        .join(SLUG_SEPARATOR.to_string().as_str());
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        (
            "client_reference_id".to_string(),
            request.user_id.to_string(),
        ),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
        (
            "line_items[0][price_data][currency]".to_string(),
            request.currency.clone(),
        ),
        (
            "line_items[0][price_data][unit_amount]".to_string(),
            request.amount_cents.to_string(),
        ),
        (
            "line_items[0][price_data][product_data][name]".to_string(),
            request.description.clone(),
        ),
    ];

    // Copied onto the payment intent too so refunds can be traced to licenses
    for prefix in ["metadata", "payment_intent_data[metadata]"] {
        form.push((
            format!("{prefix}[{}]", metadata_keys::USER_ID),
            request.user_id.to_string(),
        ));
        form.push((
            format!("{prefix}[{}]", metadata_keys::LOCATION),
            request.location.clone(),
        ));
        form.push((
            format!("{prefix}[{}]", metadata_keys::ASSET_TYPES),
            asset_types.clone(),
        ));
    }

    form
}

/// Convert a non-success response into `BillingError::Api`.
async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, BillingError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(BillingError::Api {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use brickyard_core::UserId;
    use secrecy::SecretString;

    use super::*;

    fn request() -> CheckoutSessionRequest {
        CheckoutSessionRequest {
            user_id: UserId::parse("6f1c2a9e-3b4d-4c5e-8f70-1a2b3c4d5e6f").unwrap(),
            location: "city:Austin:TX".to_string(),
            asset_types: vec!["retail".to_string(), "office".to_string()],
            description: "Retail, Office leads in Austin, TX".to_string(),
            amount_cents: 12_500,
            currency: "usd".to_string(),
            success_url: "https://app.test/dashboard?checkout=success".to_string(),
            cancel_url: "https://app.test/dashboard?checkout=cancelled".to_string(),
        }
    }

    fn value<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_checkout_form_line_item() {
        let form = checkout_form(&request());
        assert_eq!(value(&form, "mode"), Some("payment"));
        assert_eq!(
            value(&form, "line_items[0][price_data][unit_amount]"),
            Some("12500")
        );
        assert_eq!(value(&form, "line_items[0][price_data][currency]"), Some("usd"));
    }

    #[test]
    fn test_checkout_form_metadata() {
        let form = checkout_form(&request());
        assert_eq!(value(&form, "metadata[location]"), Some("city:Austin:TX"));
        assert_eq!(value(&form, "metadata[asset_types]"), Some("retail,office"));
        assert_eq!(
            value(&form, "metadata[user_id]"),
            Some("6f1c2a9e-3b4d-4c5e-8f70-1a2b3c4d5e6f")
        );
        assert_eq!(
            value(&form, "payment_intent_data[metadata][location]"),
            Some("city:Austin:TX")
        );
    }

    #[test]
    fn test_debug_omits_key() {
        let client = StripeClient::new(&BillingConfig {
            api_base_url: "https://api.stripe.test/".to_string(),
            secret_key: SecretString::from("sk_live_9fQ2xLmR7tZ"),
            webhook_secret: SecretString::from("whsec_4kP8nV1cY6"),
            price_per_record_cents: 10,
            minimum_charge_cents: 100,
            currency: "usd".to_string(),
        })
        .unwrap();

        assert_eq!(client.base_url, "https://api.stripe.test");
        assert!(!format!("{client:?}").contains("sk_live"));
    }
}
