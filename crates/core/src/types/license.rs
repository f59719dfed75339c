//! Licenses and entitlement checks.
//!
//! A license grants its holder unrestricted record access for one
//! `(asset type, location)` pair. Licenses are created when the billing
//! provider confirms a checkout and are never mutated afterwards.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{LicenseId, UserId};

/// An entitlement record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct License {
    pub id: LicenseId,
    pub user_id: UserId,
    pub asset_type_slug: String,
    /// Location code the license covers.
    pub location_internal_id: String,
    /// Billing session that paid for this license, if known.
    pub checkout_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Checkout lifecycle for one `(asset type, location)` pair.
///
/// `PendingPayment` is owned by the billing provider: it is entered when a
/// checkout session is created and left when the confirmation webhook writes
/// the license row. Only `NoLicense` and `Licensed` are ever observed by
/// reading local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseState {
    NoLicense,
    PendingPayment,
    Licensed,
}

impl LicenseState {
    /// Observe the state of a location from a user's license set.
    #[must_use]
    pub fn observe(licenses: &[License], asset_type_slug: &str, location_id: &str) -> Self {
        if is_licensed(licenses, asset_type_slug, location_id) {
            Self::Licensed
        } else {
            Self::NoLicense
        }
    }
}

/// Location ids covered by `licenses` for one asset type.
#[must_use]
pub fn licensed_location_ids<'a>(
    licenses: &'a [License],
    asset_type_slug: &str,
) -> HashSet<&'a str> {
    licenses
        .iter()
        .filter(|license| license.asset_type_slug == asset_type_slug)
        .map(|license| license.location_internal_id.as_str())
        .collect()
}

/// Whether `location_id` is licensed for `asset_type_slug`.
#[must_use]
pub fn is_licensed(licenses: &[License], asset_type_slug: &str, location_id: &str) -> bool {
    licenses.iter().any(|license| {
        license.asset_type_slug == asset_type_slug && license.location_internal_id == location_id
    })
}

/// The requested locations that are not licensed for `asset_type_slug`.
///
/// Preserves the order (and any repeats) of `requested`.
#[must_use]
pub fn unlicensed_locations<S: AsRef<str>>(
    licenses: &[License],
    asset_type_slug: &str,
    requested: &[S],
) -> Vec<String> {
    let licensed = licensed_location_ids(licenses, asset_type_slug);
    requested
        .iter()
        .map(AsRef::as_ref)
        .filter(|location| !licensed.contains(location))
        .map(str::to_string)
        .collect()
}
