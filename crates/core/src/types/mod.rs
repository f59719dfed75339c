//! Core types for Brickyard.
//!
//! This module provides type-safe wrappers for the lead-generation domain.

pub mod asset_type;
pub mod checkout;
pub mod id;
pub mod license;
pub mod location;
pub mod summary;

pub use asset_type::{AssetType, ProviderKind, SELF_STORAGE_SLUG};
pub use checkout::{CheckoutRequest, FieldError, SLUG_SEPARATOR, ValidationErrors};
pub use id::*;
pub use license::{License, LicenseState, is_licensed, licensed_location_ids, unlicensed_locations};
pub use location::{Location, LocationError, LocationKind};
pub use summary::SearchSummary;
