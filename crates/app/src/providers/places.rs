//! Places text-search client (Google Places API, new).

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{CountProvider, CountQuery, ProviderError, error_for_status};
use crate::config::PlacesConfig;

/// The provider caps a single text search page at 20 results.
const PAGE_SIZE: u32 = 20;

/// Client for the places text-search endpoint.
#[derive(Clone)]
pub struct PlacesClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
}

impl std::fmt::Debug for PlacesClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlacesClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TextSearchRequest<'a> {
    text_query: &'a str,
    page_size: u32,
}

#[derive(Debug, Deserialize)]
struct TextSearchResponse {
    /// Omitted entirely when nothing matches.
    #[serde(default)]
    places: Vec<Place>,
}

#[derive(Debug, Deserialize)]
struct Place {
    #[allow(dead_code)]
    id: String,
}

impl PlacesClient {
    /// Create a new places client.
    #[must_use]
    pub fn new(client: reqwest::Client, config: &PlacesConfig) -> Self {
        Self {
            client,
            endpoint: format!(
                "{}/v1/places:searchText",
                config.base_url.trim_end_matches('/')
            ),
            api_key: config.api_key.clone(),
        }
    }

    /// Search for places matching a free-text query.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response cannot be parsed.
    #[instrument(skip(self))]
    pub async fn search_text(&self, text_query: &str) -> Result<usize, ProviderError> {
        let body = TextSearchRequest {
            text_query,
            page_size: PAGE_SIZE,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Goog-Api-Key", self.api_key.expose_secret())
            .header("X-Goog-FieldMask", "places.id")
            .json(&body)
            .send()
            .await?;

        let response = error_for_status(response).await?;
        let parsed: TextSearchResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        debug!(count = parsed.places.len(), "Places search complete");
        Ok(parsed.places.len())
    }
}

/// Free-text query for facilities of an asset type in a location.
fn text_query(query: &CountQuery<'_>) -> String {
    format!(
        "{} in {}",
        query.asset_type.name.to_lowercase(),
        query.location.formatted()
    )
}

#[async_trait]
impl CountProvider for PlacesClient {
    async fn estimate_count(&self, query: &CountQuery<'_>) -> Result<u64, ProviderError> {
        let count = self.search_text(&text_query(query)).await?;
        Ok(count as u64)
    }
}
