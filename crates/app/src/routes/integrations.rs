//! Integration key route handlers.
//!
//! Keys are encrypted with the secret codec before they reach the database
//! and are only ever returned masked.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::IntegrationSecretRepository;
use crate::db::integration_secrets::StoredSecret;
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::state::AppState;

const MAX_PROVIDER_LEN: usize = 64;
const VISIBLE_SUFFIX: usize = 4;

/// Body for `PUT /api/integrations/{provider}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreKey {
    pub api_key: String,
}

/// A stored key as shown to its owner.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskedKey {
    pub provider: String,
    pub masked_key: String,
    pub updated_at: DateTime<Utc>,
}

/// Response for `GET /api/integrations`.
#[derive(Debug, Serialize)]
pub struct ProviderList {
    pub providers: Vec<String>,
}

/// List providers with a stored key.
pub async fn list(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<ProviderList>> {
    let providers = IntegrationSecretRepository::new(state.pool())
        .list_providers(user.id)
        .await?;
    Ok(Json(ProviderList { providers }))
}

/// Show the masked key for a provider.
pub async fn show(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(provider): Path<String>,
) -> Result<Json<MaskedKey>> {
    let provider = validate_provider(&provider)?;
    let stored = IntegrationSecretRepository::new(state.pool())
        .get(user.id, provider)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("integration {provider}")))?;

    masked(&state, stored).map(Json)
}

/// Encrypt and store a key for a provider.
pub async fn store(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(provider): Path<String>,
    Json(body): Json<StoreKey>,
) -> Result<Json<MaskedKey>> {
    let provider = validate_provider(&provider)?;
    let api_key = body.api_key.trim();
    if api_key.is_empty() {
        return Err(AppError::BadRequest("apiKey is required".to_string()));
    }

    let token = state.codec().encrypt(api_key)?;
    let stored = IntegrationSecretRepository::new(state.pool())
        .upsert(user.id, provider, &token)
        .await?;

    info!(user_id = %user.id, provider, "Integration key stored");
    Ok(Json(MaskedKey {
        provider: stored.provider,
        masked_key: mask(api_key),
        updated_at: stored.updated_at,
    }))
}

/// Delete the key for a provider.
pub async fn remove(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(provider): Path<String>,
) -> Result<StatusCode> {
    let provider = validate_provider(&provider)?;
    IntegrationSecretRepository::new(state.pool())
        .delete(user.id, provider)
        .await?;

    info!(user_id = %user.id, provider, "Integration key removed");
    Ok(StatusCode::NO_CONTENT)
}

fn masked(state: &AppState, stored: StoredSecret) -> Result<MaskedKey> {
    let plaintext = state.codec().decrypt(&stored.token)?;
    Ok(MaskedKey {
        provider: stored.provider,
        masked_key: mask(&plaintext),
        updated_at: stored.updated_at,
    })
}

/// Provider names are short lowercase slugs.
fn validate_provider(provider: &str) -> Result<&str> {
    let ok = !provider.is_empty()
        && provider.len() <= MAX_PROVIDER_LEN
        && provider
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_');
    if ok {
        Ok(provider)
    } else {
        Err(AppError::BadRequest("Invalid provider name".to_string()))
    }
}

/// Show only the last few characters of a key.
fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= VISIBLE_SUFFIX * 2 {
        return "*".repeat(chars.len().max(VISIBLE_SUFFIX));
    }
    let suffix: String = chars
        .iter()
        .skip(chars.len() - VISIBLE_SUFFIX)
        .collect();
    format!("{}{suffix}", "*".repeat(chars.len() - VISIBLE_SUFFIX))
}
