//! Brickyard Core - Shared domain types library.
//!
//! This crate provides the domain types used across all Brickyard components:
//! - `app` - Dashboard API server (search, licensing, integrations)
//! - `cli` - Command-line tools for migrations, secrets and reconciliation
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Entitlement checks and checkout validation live here
//! so they can be exercised without any collaborators.
//!
//! # Modules
//!
//! - [`types`] - IDs, asset types, location codes, licenses, summaries, checkout input

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
