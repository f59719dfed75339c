//! Business logic services for the dashboard.
//!
//! # Services
//!
//! - `search` - Entitlement-aware search summaries
//! - `checkout` - License checkout sessions
//! - `auth` - Bearer token verification

pub mod auth;
pub mod checkout;
pub mod search;

pub use auth::{AuthClient, AuthError, AuthUser, TokenVerifier};
pub use checkout::{CheckoutOutcome, LicenseCheckout, Pricing};
pub use search::{AssetTypeCatalog, SearchAggregator, SearchError, SearchOutcome};
