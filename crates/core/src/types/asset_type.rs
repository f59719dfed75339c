//! Asset type reference data.

use serde::{Deserialize, Serialize};

/// Slug of the asset type whose counts come from the places provider.
pub const SELF_STORAGE_SLUG: &str = "self-storage";

/// A category of commercial property (e.g., self-storage, retail).
///
/// Immutable reference data loaded from the database. The `use_codes` are the
/// property-record provider's numeric classification codes for this category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetType {
    /// URL-safe identifier (e.g., `self-storage`).
    pub slug: String,
    /// Display name (e.g., "Self Storage").
    pub name: String,
    /// Provider use codes for property-record searches.
    pub use_codes: Vec<i32>,
}

impl AssetType {
    /// Which external provider estimates result counts for this asset type.
    #[must_use]
    pub fn provider_kind(&self) -> ProviderKind {
        ProviderKind::for_slug(&self.slug)
    }

    /// Whether this is the distinguished self-storage asset type.
    #[must_use]
    pub fn is_self_storage(&self) -> bool {
        self.slug == SELF_STORAGE_SLUG
    }
}

/// The external data provider used to estimate result counts.
///
/// A closed set: adding a provider means adding a variant here and a client
/// that serves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Places-style lookup; the count is the number of facilities returned.
    Places,
    /// Property-record lookup filtered by use codes; reports its own count.
    PropertyRecords,
}

impl ProviderKind {
    /// Select the provider for an asset type slug.
    #[must_use]
    pub fn for_slug(slug: &str) -> Self {
        if slug == SELF_STORAGE_SLUG {
            Self::Places
        } else {
            Self::PropertyRecords
        }
    }

    /// Returns a stable name for logging.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Places => "places",
            Self::PropertyRecords => "property_records",
        }
    }
}
