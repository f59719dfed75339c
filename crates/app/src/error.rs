//! Unified error handling with Sentry integration.
//!
//! All route handlers return `Result<T, AppError>`. Server-side failures are
//! captured to Sentry before responding; clients only ever see a generic
//! message for them. Every body is JSON.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use brickyard_core::ValidationErrors;
use serde_json::json;
use thiserror::Error;

use crate::billing::BillingError;
use crate::crypto::CodecError;
use crate::db::RepositoryError;
use crate::services::{AuthError, SearchError};

/// Application-level error type for the dashboard API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Search aggregation failed.
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    /// Request body failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    /// Secret codec failed.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Billing provider operation failed.
    #[error("Billing error: {0}")]
    Billing(#[from] BillingError),

    /// Bearer token verification failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Codec(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Search(err) => match err {
                SearchError::NotFound(_) => StatusCode::NOT_FOUND,
                SearchError::InvalidLocation(_) => StatusCode::BAD_REQUEST,
                SearchError::Upstream(_) => StatusCode::BAD_GATEWAY,
                SearchError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Billing(BillingError::InvalidSignature(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Billing(_) => StatusCode::BAD_GATEWAY,
            Self::Auth(AuthError::MissingToken | AuthError::InvalidToken) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Auth(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Client-safe message. Internal details never leave the server.
    fn public_message(&self) -> String {
        match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(RepositoryError::Conflict(_)) => "Conflict".to_string(),
            Self::Database(_) | Self::Codec(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            Self::Search(err) => match err {
                SearchError::NotFound(what) => format!("Unknown {what}"),
                SearchError::InvalidLocation(e) => format!("Invalid location: {e}"),
                SearchError::Upstream(_) => "Search provider unavailable".to_string(),
                SearchError::Repository(_) => "Internal server error".to_string(),
            },
            Self::Validation(_) => "Validation failed".to_string(),
            Self::Billing(BillingError::InvalidSignature(_)) => "Invalid signature".to_string(),
            Self::Billing(_) => "Billing provider error".to_string(),
            Self::Auth(AuthError::MissingToken | AuthError::InvalidToken) => {
                "Unauthorized".to_string()
            }
            Self::Auth(_) => "Authentication unavailable".to_string(),
            Self::NotFound(what) => format!("Not found: {what}"),
            Self::BadRequest(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        match self {
            Self::Validation(errors) => (status, Json(errors)).into_response(),
            other => (status, Json(json!({ "error": other.public_message() }))).into_response(),
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the current request.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}
