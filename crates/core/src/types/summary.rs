//! Search summaries shown on the paywall.

use serde::{Deserialize, Serialize};

use super::asset_type::AssetType;
use super::location::Location;

/// Estimated result count for an unlicensed `(asset type, location)` search.
///
/// Derived and transient; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSummary {
    pub result_count: u64,
    /// `"<city or county>, <ST>"`.
    pub formatted_location: String,
    pub asset_type_name: String,
    /// The location code as supplied by the caller.
    pub internal_id: String,
}

impl SearchSummary {
    /// Compose a summary from its parts.
    #[must_use]
    pub fn new(
        asset_type: &AssetType,
        location: &Location,
        location_code: &str,
        result_count: u64,
    ) -> Self {
        Self {
            result_count,
            formatted_location: location.formatted(),
            asset_type_name: asset_type.name.clone(),
            internal_id: location_code.to_string(),
        }
    }
}
