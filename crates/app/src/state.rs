//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use brickyard_core::SearchSummary;
use moka::future::Cache;
use sqlx::PgPool;

use crate::billing::{BillingError, StripeClient};
use crate::config::AppConfig;
use crate::crypto::{CodecError, SecretCodec};
use crate::db::{AssetTypeRepository, LicenseRepository, LicenseStore};
use crate::providers::{self, PlacesClient, PropertyRecordsClient, ProviderError};
use crate::services::{AuthClient, LicenseCheckout, Pricing, SearchAggregator, TokenVerifier};

/// How long a search summary is served from memory.
pub const SUMMARY_CACHE_TTL: Duration = Duration::from_secs(180);

/// Summary cache key: `(asset type slug, location code)`.
pub type SummaryKey = (String, String);

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("secret codec: {0}")]
    Codec(#[from] CodecError),
    #[error("provider client: {0}")]
    Provider(#[from] ProviderError),
    #[error("billing client: {0}")]
    Billing(#[from] BillingError),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; everything inside is immutable or internally
/// synchronized.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    pool: PgPool,
    codec: SecretCodec,
    asset_types: AssetTypeRepository,
    licenses: Arc<dyn LicenseStore>,
    search: SearchAggregator,
    checkout: LicenseCheckout,
    auth: Arc<dyn TokenVerifier>,
    summaries: Cache<SummaryKey, SearchSummary>,
}

/// Pre-built components for [`AppState::from_parts`].
pub struct AppParts {
    pub config: AppConfig,
    pub pool: PgPool,
    pub codec: SecretCodec,
    pub asset_types: AssetTypeRepository,
    pub licenses: Arc<dyn LicenseStore>,
    pub search: SearchAggregator,
    pub checkout: LicenseCheckout,
    pub auth: Arc<dyn TokenVerifier>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns `StateError::Codec` if no encryption secret is configured, or
    /// an error if an HTTP client cannot be built.
    pub fn new(config: AppConfig, pool: PgPool) -> Result<Self, StateError> {
        let codec = SecretCodec::new(config.encryption_secret.as_ref())?;
        let http = providers::http_client()?;

        let asset_types = AssetTypeRepository::new(pool.clone());
        let licenses = Arc::new(LicenseRepository::new(pool.clone()));
        let search = SearchAggregator::new(
            Arc::new(asset_types.clone()),
            Arc::new(PlacesClient::new(http.clone(), &config.places)),
            Arc::new(PropertyRecordsClient::new(
                http.clone(),
                &config.property_records,
            )),
        );

        let stripe = StripeClient::new(&config.billing)?;
        let checkout = LicenseCheckout::new(
            Arc::new(stripe),
            Arc::new(asset_types.clone()),
            Pricing::from(&config.billing),
            &config.base_url,
        );

        let auth = Arc::new(AuthClient::new(http, &config.auth));

        Ok(Self::from_parts(AppParts {
            config,
            pool,
            codec,
            asset_types,
            licenses,
            search,
            checkout,
            auth,
        }))
    }

    /// Assemble state from already-built components.
    ///
    /// The summary cache always starts empty.
    #[must_use]
    pub fn from_parts(parts: AppParts) -> Self {
        let summaries = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(SUMMARY_CACHE_TTL)
            .build();

        Self {
            inner: Arc::new(AppStateInner {
                config: parts.config,
                pool: parts.pool,
                codec: parts.codec,
                asset_types: parts.asset_types,
                licenses: parts.licenses,
                search: parts.search,
                checkout: parts.checkout,
                auth: parts.auth,
                summaries,
            }),
        }
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the secret codec.
    #[must_use]
    pub fn codec(&self) -> &SecretCodec {
        &self.inner.codec
    }

    /// Get a reference to the asset type repository.
    #[must_use]
    pub fn asset_types(&self) -> &AssetTypeRepository {
        &self.inner.asset_types
    }

    /// Get a reference to the license store.
    #[must_use]
    pub fn licenses(&self) -> &dyn LicenseStore {
        self.inner.licenses.as_ref()
    }

    /// Get a reference to the search aggregator.
    #[must_use]
    pub fn search(&self) -> &SearchAggregator {
        &self.inner.search
    }

    /// Get a reference to the license checkout service.
    #[must_use]
    pub fn checkout(&self) -> &LicenseCheckout {
        &self.inner.checkout
    }

    /// Get a reference to the auth client.
    #[must_use]
    pub fn auth(&self) -> &dyn TokenVerifier {
        self.inner.auth.as_ref()
    }

    /// Get a reference to the search summary cache.
    #[must_use]
    pub fn summaries(&self) -> &Cache<SummaryKey, SearchSummary> {
        &self.inner.summaries
    }
}
