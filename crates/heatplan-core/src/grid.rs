//! # Low-Voltage Grid Assessment
//!
//! Heat pump feasibility on the local low-voltage grid.
//!
//! Every building close enough to the grid is attached to its nearest
//! transformer. Its electric peak is the heat pump draw at design
//! conditions plus the household base load taken from its load profile
//! phase summary. Transformer loading and a per-building service feeder
//! voltage drop are then evaluated with a linear feeder approximation.

use crate::calendar::DEFAULT_PHASE_KEY;
use crate::primitives::{BuildingId, Point, project_onto_segment};
use crate::profiles::PhaseSummary;
use crate::{HeatplanError, Result, round_to};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Standard distribution transformer ratings (kVA).
pub const STANDARD_TRANSFORMER_KVA: [f64; 3] = [250.0, 630.0, 1000.0];

fn default_rating() -> f64 {
    630.0
}

// =============================================================================
// INPUT TYPES
// =============================================================================

/// Distribution transformer (substation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transformer {
    pub id: String,
    pub position: Point,
    #[serde(default = "default_rating")]
    pub rated_kva: f64,
}

/// Low-voltage line as a polyline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerLine {
    #[serde(default)]
    pub id: Option<String>,
    pub coords: Vec<Point>,
}

/// Grid infrastructure of the study area.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridNetwork {
    #[serde(default)]
    pub transformers: Vec<Transformer>,
    #[serde(default)]
    pub lines: Vec<PowerLine>,
}

impl GridNetwork {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Grid assessment parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridParams {
    /// Buildings farther than this from a transformer are not connected (m).
    pub far_threshold_m: f64,
    pub power_factor: f64,
    /// Heat pump COP at design conditions.
    pub design_cop: f64,
    pub line_r_ohm_per_km: f64,
    pub line_x_ohm_per_km: f64,
    pub line_max_current_ka: f64,
    pub voltage_kv: f64,
    /// Slack voltage at the transformer (pu).
    pub slack_voltage_pu: f64,
    /// Phase summary key used for the household base load.
    pub phase_key: String,
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            far_threshold_m: 500.0,
            power_factor: 0.95,
            design_cop: 2.8,
            line_r_ohm_per_km: 0.125,
            line_x_ohm_per_km: 0.078,
            line_max_current_ka: 0.275,
            voltage_kv: 0.4,
            slack_voltage_pu: 1.02,
            phase_key: DEFAULT_PHASE_KEY.to_string(),
        }
    }
}

/// A building as seen by the grid assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConsumer {
    pub building_id: BuildingId,
    pub position: Point,
    pub heat_load_kw: f64,
    /// Household base load at the assessed phase (kW).
    pub base_load_kw: f64,
}

/// Base load from a phase summary: the configured key, then
/// `winter_werktag_abendspitze`, then the first key present.
#[must_use]
pub fn base_load_for(summary: &PhaseSummary, key: &str) -> f64 {
    summary
        .get(key)
        .or_else(|| summary.get(DEFAULT_PHASE_KEY))
        .or_else(|| summary.values().next())
        .copied()
        .unwrap_or(0.0)
}

// =============================================================================
// PROXIMITY
// =============================================================================

/// Distances from a building to the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proximity {
    pub dist_to_line_m: Option<f64>,
    pub dist_to_transformer_m: Option<f64>,
    pub nearest_transformer: Option<usize>,
    pub far_from_line: bool,
    pub far_from_transformer: bool,
}

/// Nearest line and transformer for a point. Missing infrastructure counts as far.
#[must_use]
pub fn proximity(point: &Point, grid: &GridNetwork, far_threshold_m: f64) -> Proximity {
    let dist_to_line_m = grid
        .lines
        .iter()
        .flat_map(|line| line.coords.windows(2))
        .map(|w| project_onto_segment(point, &w[0], &w[1]).1)
        .fold(None, |best: Option<f64>, d| Some(best.map_or(d, |b| b.min(d))));

    let mut nearest: Option<(usize, f64)> = None;
    for (i, t) in grid.transformers.iter().enumerate() {
        let d = point.distance(&t.position);
        if nearest.is_none_or(|(_, bd)| d < bd) {
            nearest = Some((i, d));
        }
    }

    Proximity {
        dist_to_line_m,
        dist_to_transformer_m: nearest.map(|(_, d)| d),
        nearest_transformer: nearest.map(|(i, _)| i),
        far_from_line: dist_to_line_m.is_none_or(|d| d > far_threshold_m),
        far_from_transformer: nearest.is_none_or(|(_, d)| d > far_threshold_m),
    }
}

// =============================================================================
// ASSESSMENT
// =============================================================================

/// Per-building grid figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingGridRow {
    pub building_id: BuildingId,
    pub proximity: Proximity,
    pub transformer_id: Option<String>,
    pub electric_peak_kw: f64,
    pub apparent_power_kva: f64,
    pub feeder_current_a: f64,
    pub feeder_load_percent: f64,
    pub voltage_drop_percent: f64,
    pub voltage_pu: f64,
    /// False for buildings beyond the far threshold.
    pub connected: bool,
}

/// Loading of one transformer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformerLoading {
    pub id: String,
    pub rated_kva: f64,
    pub load_kva: f64,
    pub loading_percent: f64,
    pub buildings: usize,
    /// Smallest standard rating covering the load when overloaded.
    pub suggested_kva: Option<f64>,
}

/// Grid assessment of a heat pump scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridAssessment {
    pub rows: Vec<BuildingGridRow>,
    pub transformers: Vec<TransformerLoading>,
    pub max_trafo_loading_percent: f64,
    pub transformer_overloads: usize,
    pub min_voltage_pu: f64,
    pub max_feeder_load_percent: f64,
    pub n_heat_pumps: usize,
    pub far_buildings: usize,
    pub total_electric_peak_kw: f64,
}

/// Smallest standard rating ≥ `load_kva`, if any.
#[must_use]
pub fn suggested_rating(load_kva: f64) -> Option<f64> {
    STANDARD_TRANSFORMER_KVA
        .iter()
        .copied()
        .find(|kva| *kva >= load_kva)
}

/// Assess heat pump connection of the given buildings.
pub fn assess(
    consumers: &[GridConsumer],
    grid: &GridNetwork,
    params: &GridParams,
) -> Result<GridAssessment> {
    if grid.transformers.is_empty() {
        return Err(HeatplanError::Simulation(
            "grid has no transformers".to_string(),
        ));
    }
    if params.design_cop <= 0.0 || params.power_factor <= 0.0 || params.power_factor > 1.0 {
        return Err(HeatplanError::InvalidInput(
            "design COP must be positive and power factor in (0, 1]".to_string(),
        ));
    }

    let u_v = params.voltage_kv * 1000.0;
    let sin_phi = (1.0 - params.power_factor * params.power_factor).sqrt();
    let mut load_per_trafo: BTreeMap<usize, (f64, usize)> = BTreeMap::new();
    let mut rows = Vec::with_capacity(consumers.len());

    for consumer in consumers {
        let prox = proximity(&consumer.position, grid, params.far_threshold_m);
        let electric_peak_kw = consumer.heat_load_kw / params.design_cop + consumer.base_load_kw;
        let apparent_power_kva = electric_peak_kw / params.power_factor;
        let trafo = prox.nearest_transformer.filter(|_| !prox.far_from_transformer);

        let Some(trafo) = trafo else {
            rows.push(BuildingGridRow {
                building_id: consumer.building_id.clone(),
                proximity: prox,
                transformer_id: None,
                electric_peak_kw,
                apparent_power_kva,
                feeder_current_a: 0.0,
                feeder_load_percent: 0.0,
                voltage_drop_percent: 0.0,
                voltage_pu: params.slack_voltage_pu,
                connected: false,
            });
            continue;
        };

        let entry = load_per_trafo.entry(trafo).or_insert((0.0, 0));
        entry.0 += apparent_power_kva;
        entry.1 += 1;

        // Feeder length: building to transformer.
        let length_km = prox.dist_to_transformer_m.unwrap_or(0.0) / 1000.0;
        let p_w = electric_peak_kw * 1000.0;
        let q_w = apparent_power_kva * 1000.0 * sin_phi;
        let r = params.line_r_ohm_per_km * length_km;
        let x = params.line_x_ohm_per_km * length_km;
        let delta_u = (p_w * r + q_w * x) / (u_v * u_v);
        let current_a = apparent_power_kva * 1000.0 / (3f64.sqrt() * u_v);

        rows.push(BuildingGridRow {
            building_id: consumer.building_id.clone(),
            transformer_id: grid.transformers.get(trafo).map(|t| t.id.clone()),
            proximity: prox,
            electric_peak_kw,
            apparent_power_kva,
            feeder_current_a: current_a,
            feeder_load_percent: current_a / (params.line_max_current_ka * 1000.0) * 100.0,
            voltage_drop_percent: delta_u * 100.0,
            voltage_pu: params.slack_voltage_pu - delta_u,
            connected: true,
        });
    }

    let transformers: Vec<TransformerLoading> = grid
        .transformers
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let (load_kva, buildings) = load_per_trafo.get(&i).copied().unwrap_or((0.0, 0));
            let loading_percent = if t.rated_kva > 0.0 {
                load_kva / t.rated_kva * 100.0
            } else {
                0.0
            };
            TransformerLoading {
                id: t.id.clone(),
                rated_kva: t.rated_kva,
                load_kva: round_to(load_kva, 2),
                loading_percent: round_to(loading_percent, 2),
                buildings,
                suggested_kva: (loading_percent > 100.0)
                    .then(|| suggested_rating(load_kva))
                    .flatten(),
            }
        })
        .collect();

    let connected: Vec<&BuildingGridRow> = rows.iter().filter(|r| r.connected).collect();
    Ok(GridAssessment {
        max_trafo_loading_percent: transformers
            .iter()
            .map(|t| t.loading_percent)
            .fold(0.0, f64::max),
        transformer_overloads: transformers
            .iter()
            .filter(|t| t.loading_percent > 100.0)
            .count(),
        min_voltage_pu: round_to(
            connected
                .iter()
                .map(|r| r.voltage_pu)
                .fold(params.slack_voltage_pu, f64::min),
            4,
        ),
        max_feeder_load_percent: round_to(
            connected
                .iter()
                .map(|r| r.feeder_load_percent)
                .fold(0.0, f64::max),
            2,
        ),
        n_heat_pumps: connected.len(),
        far_buildings: rows.len() - connected.len(),
        total_electric_peak_kw: connected.iter().map(|r| r.electric_peak_kw).sum(),
        transformers,
        rows,
    })
}

// =============================================================================
// TESTS
// =============================================================================
