//! CLI command implementations.

pub mod licenses;
pub mod migrate;
pub mod secret;
