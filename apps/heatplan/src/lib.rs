//! # Heatplan Library
//!
//! This library exposes the heatplan CLI commands and HTTP API for testing
//! and integration.
//!
//! The main binary uses these modules through the `main.rs` entry point.

pub mod api;
pub mod cli;

// Re-export heatplan_core for convenience
pub use heatplan_core;
