//! License checkout route handler.

use axum::{Json, extract::State};
use brickyard_core::CheckoutRequest;

use crate::error::Result;
use crate::middleware::RequireUser;
use crate::services::CheckoutOutcome;
use crate::state::AppState;

/// Open a checkout session for the requested licenses.
///
/// Returns `{sessionId, url}` or `{redirect}`; invalid input is a 422 with
/// every violated field.
pub async fn create(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutOutcome>> {
    let outcome = state.checkout().create(user.id, &request).await?;
    Ok(Json(outcome))
}
