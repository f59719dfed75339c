//! Brickyard dashboard API library.
//!
//! Exposes the server's components as a library so they can be tested and
//! reused by the CLI.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod billing;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod middleware;
pub mod providers;
pub mod routes;
pub mod services;
pub mod state;
