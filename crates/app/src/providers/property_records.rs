//! Property-record search client.
//!
//! Runs a count-only property search filtered by the asset type's use codes.

use async_trait::async_trait;
use brickyard_core::Location;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{CountProvider, CountQuery, ProviderError, error_for_status};
use crate::config::PropertyRecordsConfig;

/// Client for the property-record search API.
#[derive(Clone)]
pub struct PropertyRecordsClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
}

impl std::fmt::Debug for PropertyRecordsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyRecordsClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Count-only property search body.
#[derive(Debug, Serialize, PartialEq, Eq)]
struct PropertySearchRequest<'a> {
    count: bool,
    property_use_code: &'a [i32],
    #[serde(skip_serializing_if = "Option::is_none")]
    city: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    county: Option<&'a str>,
    state: &'a str,
}

impl<'a> PropertySearchRequest<'a> {
    fn count_only(use_codes: &'a [i32], location: &'a Location) -> Self {
        Self {
            count: true,
            property_use_code: use_codes,
            city: location.city.as_deref(),
            county: location.county.as_deref(),
            state: &location.state,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PropertySearchResponse {
    result_count: u64,
}

impl PropertyRecordsClient {
    /// Create a new property-record client.
    #[must_use]
    pub fn new(client: reqwest::Client, config: &PropertyRecordsConfig) -> Self {
        Self {
            client,
            endpoint: format!(
                "{}/v2/PropertySearch",
                config.base_url.trim_end_matches('/')
            ),
            api_key: config.api_key.clone(),
        }
    }

    /// Count properties with the given use codes in a location.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response lacks `resultCount`.
    #[instrument(skip(self), fields(location = %location))]
    pub async fn count(&self, use_codes: &[i32], location: &Location) -> Result<u64, ProviderError> {
        let body = PropertySearchRequest::count_only(use_codes, location);

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let response = error_for_status(response).await?;
        let parsed: PropertySearchResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        debug!(result_count = parsed.result_count, "Property search complete");
        Ok(parsed.result_count)
    }
}

#[async_trait]
impl CountProvider for PropertyRecordsClient {
    async fn estimate_count(&self, query: &CountQuery<'_>) -> Result<u64, ProviderError> {
        self.count(&query.asset_type.use_codes, query.location).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_city_request_body() {
        let location = Location::parse("city:Austin:TX").unwrap();
        let body = PropertySearchRequest::count_only(&[169, 170], &location);
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "count": true,
                "property_use_code": [169, 170],
                "city": "Austin",
                "state": "TX",
            })
        );
    }

    #[test]
    fn test_state_request_body_omits_place() {
        let location = Location::parse("state:NV").unwrap();
        let body = PropertySearchRequest::count_only(&[301], &location);
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "count": true,
                "property_use_code": [301],
                "state": "NV",
            })
        );
    }

    #[test]
    fn test_response_requires_result_count() {
        let parsed: PropertySearchResponse =
            serde_json::from_str(r#"{"resultCount": 57, "statusCode": 200}"#).unwrap();
        assert_eq!(parsed.result_count, 57);
        assert!(serde_json::from_str::<PropertySearchResponse>("{}").is_err());
    }
}
