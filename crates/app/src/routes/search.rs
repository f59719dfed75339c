//! Search and entitlement route handlers.

use axum::{
    Json,
    extract::{Query, State},
};
use brickyard_core::{AssetType, LicenseState, is_licensed, unlicensed_locations};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::services::SearchOutcome;
use crate::state::AppState;

/// Query for `GET /api/search`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub asset_type: String,
    pub location: String,
}

/// Query for `GET /api/licenses`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseParams {
    pub asset_type: String,
    /// Comma-separated location codes.
    #[serde(default)]
    pub locations: String,
}

/// Per-location license state.
#[derive(Debug, Serialize)]
pub struct LocationState {
    pub location: String,
    pub state: LicenseState,
}

/// Response for `GET /api/licenses`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseStatus {
    pub asset_type: String,
    pub locations: Vec<LocationState>,
    pub unlicensed: Vec<String>,
}

/// List asset types.
pub async fn asset_types(State(state): State<AppState>) -> Result<Json<Vec<AssetType>>> {
    Ok(Json(state.asset_types().list().await?))
}

/// Resolve a search to record access or a paywall summary.
///
/// Unlicensed summaries are served from the summary cache when present.
#[instrument(skip_all, fields(user_id = %user.id, asset_type = %params.asset_type))]
pub async fn search(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchOutcome>> {
    let licenses = state
        .licenses()
        .list_for_user(user.id, Some(&params.asset_type))
        .await?;

    let key = (params.asset_type.clone(), params.location.clone());
    if !is_licensed(&licenses, &params.asset_type, &params.location)
        && let Some(summary) = state.summaries().get(&key).await
    {
        return Ok(Json(SearchOutcome::Unlicensed(summary)));
    }

    let outcome = state
        .search()
        .resolve(&licenses, &params.asset_type, &params.location)
        .await?;

    if let SearchOutcome::Unlicensed(summary) = &outcome {
        state.summaries().insert(key, summary.clone()).await;
    }

    Ok(Json(outcome))
}

/// Split requested locations into licensed and unlicensed.
///
/// Polled by the dashboard after checkout until the webhook lands.
pub async fn licenses(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Query(params): Query<LicenseParams>,
) -> Result<Json<LicenseStatus>> {
    let requested = split_locations(&params.locations);
    if requested.is_empty() {
        return Err(AppError::BadRequest(
            "At least one location is required".to_string(),
        ));
    }

    let licenses = state
        .licenses()
        .list_for_user(user.id, Some(&params.asset_type))
        .await?;

    let locations = requested
        .iter()
        .map(|location| LocationState {
            location: (*location).to_string(),
            state: LicenseState::observe(&licenses, &params.asset_type, location),
        })
        .collect();

    Ok(Json(LicenseStatus {
        unlicensed: unlicensed_locations(&licenses, &params.asset_type, &requested),
        asset_type: params.asset_type,
        locations,
    }))
}

fn split_locations(raw: &str) -> Vec<&str> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_locations() {
        assert_eq!(
            split_locations("city:Austin:TX, state:TX,,"),
            vec!["city:Austin:TX", "state:TX"]
        );
        assert!(split_locations(" , ").is_empty());
    }
}
