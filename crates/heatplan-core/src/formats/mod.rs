//! # Formats Module
//!
//! Serialization and format handling for study results.
//!
//! This module contains:
//! - Binary snapshot format (header + postcard + checksum)
//! - JSON export
//! - CSV export of KPI tables
//!
//! Note: File I/O operations remain in the app layer (apps/heatplan).
//! This module only handles format conversion (pure transformations).

mod persistence;

pub use persistence::*;
