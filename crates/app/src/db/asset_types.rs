//! Asset type repository.

use async_trait::async_trait;
use brickyard_core::AssetType;
use sqlx::PgPool;

use super::RepositoryError;
use crate::services::search::AssetTypeCatalog;

/// Internal row type for `PostgreSQL` queries.
#[derive(Debug, sqlx::FromRow)]
struct AssetTypeRow {
    slug: String,
    name: String,
    use_codes: Vec<i32>,
}

impl From<AssetTypeRow> for AssetType {
    fn from(row: AssetTypeRow) -> Self {
        Self {
            slug: row.slug,
            name: row.name,
            use_codes: row.use_codes,
        }
    }
}

/// Repository for asset type reference data.
///
/// Holds its own pool handle so it can back the long-lived search aggregator.
#[derive(Clone)]
pub struct AssetTypeRepository {
    pool: PgPool,
}

impl AssetTypeRepository {
    /// Create a new asset type repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get an asset type by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<AssetType>, RepositoryError> {
        let row = sqlx::query_as::<_, AssetTypeRow>(
            r"
            SELECT slug, name, use_codes
            FROM brickyard.asset_type
            WHERE slug = $1
            ",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AssetType::from))
    }

    /// List all asset types, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<AssetType>, RepositoryError> {
        let rows = sqlx::query_as::<_, AssetTypeRow>(
            r"
            SELECT slug, name, use_codes
            FROM brickyard.asset_type
            ORDER BY name
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AssetType::from).collect())
    }
}

#[async_trait]
impl AssetTypeCatalog for AssetTypeRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<AssetType>, RepositoryError> {
        self.get_by_slug(slug).await
    }
}
