//! Bearer token verification against the managed auth provider.
//!
//! Tokens are checked with `GET {auth_url}/auth/v1/user`. Verified users are
//! cached for 60 seconds, keyed by a SHA-256 digest of the token so raw
//! tokens are never held in memory longer than the request.

use std::time::Duration;

use async_trait::async_trait;
use brickyard_core::UserId;
use moka::future::Cache;
use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::AuthConfig;

/// How long a verified token is trusted without asking the provider again.
pub const AUTH_CACHE_TTL: Duration = Duration::from_secs(60);

/// Errors that can occur while verifying a bearer token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No bearer token was supplied.
    #[error("missing bearer token")]
    MissingToken,

    /// The provider rejected the token.
    #[error("invalid or expired token")]
    InvalidToken,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned an unexpected error response.
    #[error("auth provider error: {status} - {message}")]
    Provider { status: u16, message: String },

    /// Failed to parse the provider response.
    #[error("parse error: {0}")]
    Parse(String),
}

/// An authenticated dashboard user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

/// Resolves bearer tokens to users.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Resolve a bearer token to the user it was issued to.
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError>;
}

/// Client for the managed auth provider.
#[derive(Clone)]
pub struct AuthClient {
    client: reqwest::Client,
    user_endpoint: String,
    anon_key: SecretString,
    cache: Cache<String, AuthUser>,
}

impl std::fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthClient")
            .field("user_endpoint", &self.user_endpoint)
            .field("anon_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl AuthClient {
    /// Create a new auth client.
    #[must_use]
    pub fn new(client: reqwest::Client, config: &AuthConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(AUTH_CACHE_TTL)
            .build();

        Self {
            client,
            user_endpoint: format!("{}/auth/v1/user", config.url.trim_end_matches('/')),
            anon_key: config.anon_key.clone(),
            cache,
        }
    }

    /// Resolve a bearer token to the user it was issued to.
    ///
    /// # Errors
    ///
    /// - `AuthError::MissingToken` for an empty token
    /// - `AuthError::InvalidToken` if the provider answers 401 or 403
    /// - `AuthError::Http`, `AuthError::Provider`, `AuthError::Parse` when the
    ///   provider cannot be reached or answers unexpectedly
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let key = cache_key(token);
        if let Some(user) = self.cache.get(&key).await {
            return Ok(user);
        }

        let response = self
            .client
            .get(&self.user_endpoint)
            .header("apikey", self.anon_key.expose_secret())
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AuthError::InvalidToken);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AuthError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let user = parse_user(&body)?;

        debug!(user_id = %user.id, "Token verified");
        self.cache.insert(key, user.clone()).await;
        Ok(user)
    }
}

#[async_trait]
impl TokenVerifier for AuthClient {
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        Self::verify(self, token).await
    }
}

/// Parse the provider's user object.
fn parse_user(body: &str) -> Result<AuthUser, AuthError> {
    serde_json::from_str(body).map_err(|e| AuthError::Parse(e.to_string()))
}

fn cache_key(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
