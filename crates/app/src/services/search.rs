//! Entitlement-aware search aggregation.
//!
//! Resolves an asset type and location, then either reports that the caller
//! already holds a license (records are fetched elsewhere) or estimates the
//! result count through the provider that serves the asset type.
//!
//! Each call is independent: no caching, coalescing, or retries happen here.
//! The HTTP layer owns the summary cache.

use std::sync::Arc;

use async_trait::async_trait;
use brickyard_core::{
    AssetType, License, Location, LocationError, ProviderKind, SearchSummary, is_licensed,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::db::RepositoryError;
use crate::providers::{CountProvider, CountQuery, ProviderError};

/// Lookup of asset type reference data.
#[async_trait]
pub trait AssetTypeCatalog: Send + Sync {
    /// Find an asset type by slug.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<AssetType>, RepositoryError>;
}

/// Errors that can occur while building a search summary.
#[derive(Debug, Error)]
pub enum SearchError {
    /// A referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The location code could not be parsed.
    #[error("invalid location: {0}")]
    InvalidLocation(#[from] LocationError),

    /// The external count provider failed.
    #[error("upstream provider error: {0}")]
    Upstream(#[from] ProviderError),

    /// Reading reference data failed.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Result of an entitlement-aware search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchOutcome {
    /// The caller holds a license; full records may be retrieved.
    #[serde(rename_all = "camelCase")]
    Licensed {
        asset_type_slug: String,
        internal_id: String,
    },
    /// No license; show the paywall with this estimate.
    Unlicensed(SearchSummary),
}

/// Builds search summaries from reference data and external providers.
#[derive(Clone)]
pub struct SearchAggregator {
    catalog: Arc<dyn AssetTypeCatalog>,
    places: Arc<dyn CountProvider>,
    property_records: Arc<dyn CountProvider>,
}

impl SearchAggregator {
    /// Create an aggregator from its collaborators.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn AssetTypeCatalog>,
        places: Arc<dyn CountProvider>,
        property_records: Arc<dyn CountProvider>,
    ) -> Self {
        Self {
            catalog,
            places,
            property_records,
        }
    }

    fn provider(&self, kind: ProviderKind) -> &dyn CountProvider {
        match kind {
            ProviderKind::Places => self.places.as_ref(),
            ProviderKind::PropertyRecords => self.property_records.as_ref(),
        }
    }

    /// Estimate the result count for an asset type in a location.
    ///
    /// # Errors
    ///
    /// - `SearchError::NotFound("asset type")` for an unknown slug
    /// - `SearchError::InvalidLocation` for an unparsable code
    /// - `SearchError::Upstream` if the provider fails
    /// - `SearchError::Repository` if the catalog lookup fails
    #[instrument(skip(self))]
    pub async fn get_search_summary(
        &self,
        asset_type_slug: &str,
        location_code: &str,
    ) -> Result<SearchSummary, SearchError> {
        let asset_type = self
            .catalog
            .find_by_slug(asset_type_slug)
            .await?
            .ok_or(SearchError::NotFound("asset type"))?;

        let location = Location::parse(location_code)?;
        let kind = asset_type.provider_kind();

        let result_count = self
            .provider(kind)
            .estimate_count(&CountQuery {
                asset_type: &asset_type,
                location: &location,
            })
            .await?;

        debug!(provider = kind.as_str(), result_count, "Search summary built");

        Ok(SearchSummary::new(
            &asset_type,
            &location,
            location_code,
            result_count,
        ))
    }

    /// Decide between record access and the paywall for one location.
    ///
    /// Licensed locations never reach a provider.
    ///
    /// # Errors
    ///
    /// Same as [`SearchAggregator::get_search_summary`] for unlicensed locations.
    pub async fn resolve(
        &self,
        licenses: &[License],
        asset_type_slug: &str,
        location_code: &str,
    ) -> Result<SearchOutcome, SearchError> {
        if is_licensed(licenses, asset_type_slug, location_code) {
            return Ok(SearchOutcome::Licensed {
                asset_type_slug: asset_type_slug.to_string(),
                internal_id: location_code.to_string(),
            });
        }

        self.get_search_summary(asset_type_slug, location_code)
            .await
            .map(SearchOutcome::Unlicensed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use brickyard_core::{LicenseId, UserId};
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    struct StubCatalog(HashMap<String, AssetType>);

    #[async_trait]
    impl AssetTypeCatalog for StubCatalog {
        async fn find_by_slug(&self, slug: &str) -> Result<Option<AssetType>, RepositoryError> {
            Ok(self.0.get(slug).cloned())
        }
    }

    struct StubProvider {
        count: Option<u64>,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn returning(count: u64) -> Arc<Self> {
            Arc::new(Self {
                count: Some(count),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                count: None,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CountProvider for StubProvider {
        async fn estimate_count(&self, _query: &CountQuery<'_>) -> Result<u64, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.count.ok_or(ProviderError::Api {
                status: 503,
                message: "unavailable".to_string(),
            })
        }
    }

    fn catalog() -> Arc<StubCatalog> {
        let types = [
            ("self-storage", "Self Storage", vec![]),
            ("retail", "Retail", vec![169, 170]),
        ];
        Arc::new(StubCatalog(
            types
                .into_iter()
                .map(|(slug, name, use_codes)| {
                    (
                        slug.to_string(),
                        AssetType {
                            slug: slug.to_string(),
                            name: name.to_string(),
                            use_codes,
                        },
                    )
                })
                .collect(),
        ))
    }

    fn license(slug: &str, location: &str) -> License {
        License {
            id: LicenseId::new(1),
            user_id: UserId::new(Uuid::nil()),
            asset_type_slug: slug.to_string(),
            location_internal_id: location.to_string(),
            checkout_session_id: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_self_storage_counts_places() {
        let places = StubProvider::returning(14);
        let records = StubProvider::returning(999);
        let aggregator = SearchAggregator::new(catalog(), places.clone(), records.clone());

        let summary = aggregator
            .get_search_summary("self-storage", "city:Austin:TX")
            .await
            .unwrap();

        assert_eq!(summary.result_count, 14);
        assert_eq!(summary.formatted_location, "Austin, TX");
        assert_eq!(summary.asset_type_name, "Self Storage");
        assert_eq!(summary.internal_id, "city:Austin:TX");
        assert_eq!(places.calls.load(Ordering::SeqCst), 1);
        assert_eq!(records.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_other_types_use_property_records() {
        let places = StubProvider::returning(999);
        let records = StubProvider::returning(312);
        let aggregator = SearchAggregator::new(catalog(), places.clone(), records.clone());

        let summary = aggregator
            .get_search_summary("retail", "county:Travis County:TX")
            .await
            .unwrap();

        assert_eq!(summary.result_count, 312);
        assert_eq!(summary.formatted_location, "Travis County, TX");
        assert_eq!(places.calls.load(Ordering::SeqCst), 0);
        assert_eq!(records.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_asset_type_is_not_found() {
        let aggregator = SearchAggregator::new(
            catalog(),
            StubProvider::returning(1),
            StubProvider::returning(1),
        );

        let err = aggregator
            .get_search_summary("unknown-slug", "loc1")
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::NotFound("asset type")));
    }

    #[tokio::test]
    async fn test_unparsable_location_is_invalid() {
        let records = StubProvider::returning(1);
        let aggregator =
            SearchAggregator::new(catalog(), StubProvider::returning(1), records.clone());

        let err = aggregator
            .get_search_summary("retail", "loc1")
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidLocation(_)));
        assert_eq!(records.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let aggregator = SearchAggregator::new(
            catalog(),
            StubProvider::failing(),
            StubProvider::returning(1),
        );

        let err = aggregator
            .get_search_summary("self-storage", "state:TX")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SearchError::Upstream(ProviderError::Api { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn test_resolve_licensed_skips_providers() {
        let records = StubProvider::returning(5);
        let aggregator =
            SearchAggregator::new(catalog(), StubProvider::returning(5), records.clone());
        let licenses = vec![license("retail", "city:Austin:TX")];

        let outcome = aggregator
            .resolve(&licenses, "retail", "city:Austin:TX")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SearchOutcome::Licensed {
                asset_type_slug: "retail".to_string(),
                internal_id: "city:Austin:TX".to_string(),
            }
        );
        assert_eq!(records.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resolve_unlicensed_returns_summary() {
        let aggregator = SearchAggregator::new(
            catalog(),
            StubProvider::returning(5),
            StubProvider::returning(40),
        );
        let licenses = vec![license("self-storage", "city:Austin:TX")];

        let outcome = aggregator
            .resolve(&licenses, "retail", "city:Austin:TX")
            .await
            .unwrap();

        let SearchOutcome::Unlicensed(summary) = outcome else {
            panic!("expected unlicensed outcome");
        };
        assert_eq!(summary.result_count, 40);
    }

    #[test]
    fn test_outcome_wire_shape() {
        let outcome = SearchOutcome::Licensed {
            asset_type_slug: "retail".to_string(),
            internal_id: "state:TX".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            serde_json::json!({
                "status": "licensed",
                "assetTypeSlug": "retail",
                "internalId": "state:TX",
            })
        );
    }
}
