//! # Scenarios
//!
//! Scenario specifications from the study configuration, resolved against
//! the building set into concrete scenarios.

use crate::building::{Building, assign_renovation_state, buildings_on_street};
use crate::primitives::BuildingId;
use crate::{HeatplanError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Supply technology of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ScenarioKind {
    /// District heating
    DH,
    /// Decentralised heat pumps
    HP,
}

impl ScenarioKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DH => "DH",
            Self::HP => "HP",
        }
    }

    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::DH => "district heating",
            Self::HP => "decentralised heat pumps",
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioKind {
    type Err = HeatplanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "DH" => Ok(Self::DH),
            "HP" => Ok(Self::HP),
            _ => Err(HeatplanError::UnknownScenarioType(s.to_string())),
        }
    }
}

/// Per-scenario parameter overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioParams {
    /// Multiplier on design load and annual demand.
    pub demand_factor: f64,
    pub supply_temp_c: Option<f64>,
    pub return_temp_c: Option<f64>,
    /// Seasonal heat pump COP used for costs and emissions.
    pub cop: Option<f64>,
    /// Phase summary key for the household base load.
    pub phase_key: Option<String>,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            demand_factor: 1.0,
            supply_temp_c: None,
            return_temp_c: None,
            cop: None,
            phase_key: None,
        }
    }
}

/// Scenario as written in the study configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioSpec {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub params: ScenarioParams,
    /// Attribute equality filter: `function`, `code`, `street`, `renovation_state`.
    pub building_filter: BTreeMap<String, serde_json::Value>,
}

/// A resolved scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: String,
    pub kind: ScenarioKind,
    pub params: ScenarioParams,
    /// Normalised filter the building set was selected with.
    pub building_filter: BTreeMap<String, String>,
    pub building_ids: Vec<BuildingId>,
}

/// Filter keys understood by `generate_scenarios`.
pub const FILTER_KEYS: [&str; 4] = ["function", "code", "street", "renovation_state"];

fn filter_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn attribute(building: &Building, key: &str) -> Option<String> {
    match key {
        "function" => building.function.clone(),
        "code" => building.code.map(|c| c.to_string()),
        "street" => building.street.as_deref().map(|s| s.trim().to_string()),
        "renovation_state" => Some(assign_renovation_state(building).to_string()),
        _ => None,
    }
}

/// Resolve scenario specs against the buildings.
///
/// Unnamed scenarios become `scenario_{i+1}`, untyped ones DH. Every filter
/// entry must match exactly. Unknown types, filter keys and duplicate
/// names are errors.
pub fn generate_scenarios(buildings: &[Building], specs: &[ScenarioSpec]) -> Result<Vec<Scenario>> {
    let mut scenarios = Vec::with_capacity(specs.len());
    let mut names = BTreeSet::new();
    for (i, spec) in specs.iter().enumerate() {
        let name = spec
            .name
            .clone()
            .unwrap_or_else(|| format!("scenario_{}", i + 1));
        if !names.insert(name.clone()) {
            return Err(HeatplanError::InvalidInput(format!(
                "duplicate scenario name '{name}'"
            )));
        }
        let kind = match &spec.kind {
            Some(kind) => kind.parse()?,
            None => ScenarioKind::DH,
        };
        let mut filter = BTreeMap::new();
        for (key, value) in &spec.building_filter {
            if !FILTER_KEYS.contains(&key.as_str()) {
                return Err(HeatplanError::InvalidInput(format!(
                    "unknown building filter key '{key}'"
                )));
            }
            filter.insert(key.clone(), filter_text(value));
        }
        if spec.params.demand_factor < 0.0 {
            return Err(HeatplanError::InvalidInput(format!(
                "negative demand factor in scenario {}",
                i + 1
            )));
        }

        let building_ids = buildings
            .iter()
            .filter(|b| {
                filter
                    .iter()
                    .all(|(k, v)| attribute(b, k).as_deref() == Some(v.as_str()))
            })
            .map(|b| b.id.clone())
            .collect();

        scenarios.push(Scenario {
            name,
            description: spec.description.clone().unwrap_or_default(),
            kind,
            params: spec.params.clone(),
            building_filter: filter,
            building_ids,
        });
    }
    Ok(scenarios)
}

/// A DH and an HP scenario for the buildings of one street.
pub fn street_scenarios(buildings: &[Building], street: &str) -> Result<Vec<Scenario>> {
    let street = street.trim();
    if buildings_on_street(buildings, street).is_empty() {
        return Err(HeatplanError::MissingData(format!(
            "no buildings on street '{street}'"
        )));
    }
    let specs: Vec<ScenarioSpec> = [ScenarioKind::DH, ScenarioKind::HP]
        .into_iter()
        .map(|kind| ScenarioSpec {
            name: Some(format!("{street}_{}", kind.as_str().to_lowercase())),
            description: Some(format!("{} for {street}", kind.description())),
            kind: Some(kind.as_str().to_string()),
            params: ScenarioParams::default(),
            building_filter: BTreeMap::from([(
                "street".to_string(),
                serde_json::Value::String(street.to_string()),
            )]),
        })
        .collect();
    generate_scenarios(buildings, &specs)
}

// =============================================================================
// TESTS
// =============================================================================
