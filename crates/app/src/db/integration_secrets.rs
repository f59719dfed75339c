//! Integration secret repository.
//!
//! Stores third-party API keys per user. Only codec tokens
//! (`nonce.ciphertext.tag`) are written here; plaintext never reaches the
//! database.

use brickyard_core::UserId;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::RepositoryError;

/// A stored, still-encrypted integration secret.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredSecret {
    pub provider: String,
    /// Codec token; decrypt with `SecretCodec::decrypt`.
    pub token: String,
    pub updated_at: DateTime<Utc>,
}

/// Repository for integration secret database operations.
pub struct IntegrationSecretRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> IntegrationSecretRepository<'a> {
    /// Create a new integration secret repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert or replace the token for a provider.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(
        &self,
        user_id: UserId,
        provider: &str,
        token: &str,
    ) -> Result<StoredSecret, RepositoryError> {
        let row = sqlx::query_as::<_, StoredSecret>(
            r"
            INSERT INTO brickyard.integration_secret (user_id, provider, token)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, provider)
            DO UPDATE SET token = EXCLUDED.token, updated_at = NOW()
            RETURNING provider, token, updated_at
            ",
        )
        .bind(user_id.as_uuid())
        .bind(provider)
        .bind(token)
        .fetch_one(self.pool)
        .await?;

        Ok(row)
    }

    /// Get the token for a provider.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        user_id: UserId,
        provider: &str,
    ) -> Result<Option<StoredSecret>, RepositoryError> {
        let row = sqlx::query_as::<_, StoredSecret>(
            r"
            SELECT provider, token, updated_at
            FROM brickyard.integration_secret
            WHERE user_id = $1 AND provider = $2
            ",
        )
        .bind(user_id.as_uuid())
        .bind(provider)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Delete the token for a provider.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if nothing was stored.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, user_id: UserId, provider: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM brickyard.integration_secret
            WHERE user_id = $1 AND provider = $2
            ",
        )
        .bind(user_id.as_uuid())
        .bind(provider)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// List providers the user has stored secrets for.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_providers(&self, user_id: UserId) -> Result<Vec<String>, RepositoryError> {
        let providers = sqlx::query_scalar::<_, String>(
            r"
            SELECT provider
            FROM brickyard.integration_secret
            WHERE user_id = $1
            ORDER BY provider
            ",
        )
        .bind(user_id.as_uuid())
        .fetch_all(self.pool)
        .await?;

        Ok(providers)
    }
}
