//! # Heatplan Core
//!
//! The deterministic planning engine behind heatplan.
//!
//! Compares district heating (DH) against decentralised heat pumps (HP) for a
//! set of buildings along municipal streets:
//!
//! - `building` / `demand`: envelopes, U-values and heat demand
//! - `calendar` / `profiles`: BDEW standard load profiles per building
//! - `network` / `hydraulics`: dual-pipe DH network and steady-state hydraulics
//! - `grid`: low-voltage feasibility of heat pumps
//! - `scenario` / `simulation` / `kpi` / `report`: the comparison pipeline
//! - `storage` / `formats` / `config`: persistence and configuration
//!
//! ## Constraints
//!
//! - No async, no network, no logging.
//! - File access is limited to the redb `ResultStore` and the input readers
//!   `StudyConfig::load` / `StudyInputs::load`. Output files are written by
//!   the app layer.
//! - `BTreeMap` everywhere ordering is observable.
//! - Path costs are integers so routing is reproducible across platforms.

pub mod building;
pub mod calendar;
pub mod config;
pub mod demand;
pub mod formats;
pub mod grid;
pub mod hydraulics;
pub mod kpi;
pub mod network;
pub mod primitives;
pub mod profiles;
pub mod report;
pub mod scenario;
pub mod simulation;
pub mod storage;

pub use building::{Building, Envelope, Household, HouseholdData, RenovationState, UValues};
pub use config::{StudyConfig, StudyInputs};
pub use demand::{BuildingDemand, DemandParams};
pub use kpi::{CostParams, EmissionFactors, KpiRecord};
pub use primitives::{BuildingId, Point};
pub use scenario::{Scenario, ScenarioKind, ScenarioParams, ScenarioSpec};
pub use simulation::{SimulationInputs, SimulationKpi, SimulationResult};
pub use storage::ResultStore;

use thiserror::Error;

// =============================================================================
// ERRORS
// =============================================================================

/// Errors produced by the planning engine.
#[derive(Debug, Error)]
pub enum HeatplanError {
    /// Input data is malformed or violates a precondition.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Data required for a computation is absent.
    #[error("missing data: {0}")]
    MissingData(String),

    /// Load profile library or generation failure.
    #[error("profile error: {0}")]
    Profile(String),

    /// Street graph or routing failure.
    #[error("network error: {0}")]
    Network(String),

    /// Hydraulic or grid simulation failure.
    #[error("simulation error: {0}")]
    Simulation(String),

    /// Result store failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Encoding or decoding failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Scenario type other than DH or HP.
    #[error("unknown scenario type: {0}")]
    UnknownScenarioType(String),
}

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, HeatplanError>;

impl From<postcard::Error> for HeatplanError {
    fn from(err: postcard::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for HeatplanError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for HeatplanError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<csv::Error> for HeatplanError {
    fn from(err: csv::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Round to a fixed number of decimals.
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}
