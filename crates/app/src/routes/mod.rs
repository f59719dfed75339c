//! HTTP route handlers for the dashboard API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                      - Liveness
//! GET    /health/ready                - Database readiness
//!
//! # Search (bearer auth unless noted)
//! GET    /api/asset-types             - Asset type reference data (public)
//! GET    /api/search                  - ?assetType=&location= licensed or paywall summary
//! GET    /api/licenses                - ?assetType=&locations=A,B entitlement split
//!
//! # Checkout
//! POST   /api/checkout                - Open a license checkout session
//!
//! # Integrations
//! GET    /api/integrations            - Providers with a stored key
//! GET    /api/integrations/{provider} - Masked stored key
//! PUT    /api/integrations/{provider} - Store (encrypt) a key
//! DELETE /api/integrations/{provider} - Remove a key
//!
//! # Webhooks (signature auth)
//! POST   /webhooks/stripe             - Checkout confirmation
//! ```

pub mod checkout;
pub mod integrations;
pub mod search;
pub mod webhooks;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the `/api` router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/asset-types", get(search::asset_types))
        .route("/search", get(search::search))
        .route("/licenses", get(search::licenses))
        .route("/checkout", post(checkout::create))
        .route("/integrations", get(integrations::list))
        .route(
            "/integrations/{provider}",
            get(integrations::show)
                .put(integrations::store)
                .delete(integrations::remove),
        )
}

/// Create the `/webhooks` router.
pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/stripe", post(webhooks::stripe))
}

/// Create all application routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api", api_routes())
        .nest("/webhooks", webhook_routes())
}
