//! License repository for database operations.
//!
//! Licenses are only ever inserted (by the checkout confirmation path) and
//! read. Grants are idempotent so a replayed webhook is harmless.

use async_trait::async_trait;
use brickyard_core::{License, LicenseId, UserId};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{RepositoryError, map_constraint_error};

/// Internal row type for `PostgreSQL` queries.
#[derive(Debug, sqlx::FromRow)]
struct LicenseRow {
    id: i32,
    user_id: Uuid,
    asset_type_slug: String,
    location_internal_id: String,
    checkout_session_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<LicenseRow> for License {
    fn from(row: LicenseRow) -> Self {
        Self {
            id: LicenseId::new(row.id),
            user_id: UserId::new(row.user_id),
            asset_type_slug: row.asset_type_slug,
            location_internal_id: row.location_internal_id,
            checkout_session_id: row.checkout_session_id,
            created_at: row.created_at,
        }
    }
}

/// Parameters for granting licenses after a confirmed checkout.
#[derive(Debug)]
pub struct GrantParams<'a> {
    pub user_id: UserId,
    /// Location code being licensed.
    pub location_internal_id: &'a str,
    /// One license row is written per asset type.
    pub asset_type_slugs: &'a [String],
    pub checkout_session_id: Option<&'a str>,
}

/// Reads and writes of license rows.
#[async_trait]
pub trait LicenseStore: Send + Sync {
    /// List a user's licenses, optionally restricted to one asset type.
    async fn list_for_user(
        &self,
        user_id: UserId,
        asset_type_slug: Option<&str>,
    ) -> Result<Vec<License>, RepositoryError>;

    /// Grant licenses, returning how many rows were new.
    async fn grant(&self, params: &GrantParams<'_>) -> Result<u64, RepositoryError>;
}

/// Repository for license database operations.
#[derive(Clone)]
pub struct LicenseRepository {
    pool: PgPool,
}

impl LicenseRepository {
    /// Create a new license repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List a user's licenses, optionally restricted to one asset type.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        asset_type_slug: Option<&str>,
    ) -> Result<Vec<License>, RepositoryError> {
        let rows = sqlx::query_as::<_, LicenseRow>(
            r"
            SELECT id, user_id, asset_type_slug, location_internal_id,
                   checkout_session_id, created_at
            FROM brickyard.license
            WHERE user_id = $1
              AND ($2::text IS NULL OR asset_type_slug = $2)
            ORDER BY created_at
            ",
        )
        .bind(user_id.as_uuid())
        .bind(asset_type_slug)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(License::from).collect())
    }

    /// Grant licenses for one location and one or more asset types.
    ///
    /// Existing `(user, asset type, location)` rows are left untouched.
    /// Returns the number of newly created licenses.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if an asset type does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn grant(&self, params: &GrantParams<'_>) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO brickyard.license
                (user_id, asset_type_slug, location_internal_id, checkout_session_id)
            SELECT $1, slug, $3, $4
            FROM unnest($2::text[]) AS slug
            ON CONFLICT (user_id, asset_type_slug, location_internal_id) DO NOTHING
            ",
        )
        .bind(params.user_id.as_uuid())
        .bind(params.asset_type_slugs)
        .bind(params.location_internal_id)
        .bind(params.checkout_session_id)
        .execute(&self.pool)
        .await
        .map_err(map_constraint_error)?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl LicenseStore for LicenseRepository {
    async fn list_for_user(
        &self,
        user_id: UserId,
        asset_type_slug: Option<&str>,
    ) -> Result<Vec<License>, RepositoryError> {
        Self::list_for_user(self, user_id, asset_type_slug).await
    }

    async fn grant(&self, params: &GrantParams<'_>) -> Result<u64, RepositoryError> {
        Self::grant(self, params).await
    }
}
