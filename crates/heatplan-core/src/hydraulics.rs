//! # Hydraulics
//!
//! Steady-state design-point hydraulics for a dual-pipe network.
//!
//! The supply mains form a tree rooted at the plant, so every segment
//! carries exactly the flow of the buildings routed through it. Pipes are
//! sized from a DN catalogue against a velocity limit, pressure drops use
//! Darcy–Weisbach with a Swamee–Jain friction factor, and the pump works
//! against the worst supply + return path.

use crate::network::{DualPipeNetwork, NodeId, PipeKind};
use crate::primitives::BuildingId;
use crate::{HeatplanError, Result, round_to};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Pascal per bar.
const PA_PER_BAR: f64 = 100_000.0;

/// Reynolds number below which flow is treated as laminar.
pub const LAMINAR_REYNOLDS: f64 = 2300.0;

// =============================================================================
// PARAMETERS
// =============================================================================

/// Catalogue entry: nominal size and inner diameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PipeSize {
    pub dn: u32,
    pub inner_diameter_m: f64,
}

/// Steel pipe series, DN 20 to DN 400.
pub const DEFAULT_CATALOGUE: [PipeSize; 15] = [
    PipeSize { dn: 20, inner_diameter_m: 0.0216 },
    PipeSize { dn: 25, inner_diameter_m: 0.0285 },
    PipeSize { dn: 32, inner_diameter_m: 0.0372 },
    PipeSize { dn: 40, inner_diameter_m: 0.0431 },
    PipeSize { dn: 50, inner_diameter_m: 0.0545 },
    PipeSize { dn: 65, inner_diameter_m: 0.0703 },
    PipeSize { dn: 80, inner_diameter_m: 0.0825 },
    PipeSize { dn: 100, inner_diameter_m: 0.1071 },
    PipeSize { dn: 125, inner_diameter_m: 0.1325 },
    PipeSize { dn: 150, inner_diameter_m: 0.1603 },
    PipeSize { dn: 200, inner_diameter_m: 0.2101 },
    PipeSize { dn: 250, inner_diameter_m: 0.2630 },
    PipeSize { dn: 300, inner_diameter_m: 0.3127 },
    PipeSize { dn: 350, inner_diameter_m: 0.3444 },
    PipeSize { dn: 400, inner_diameter_m: 0.3938 },
];

/// Fluid and pipe parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HydraulicParams {
    pub plant_pressure_bar: f64,
    /// kg/m³ at around 70 °C
    pub density_kg_m3: f64,
    /// m²/s
    pub kinematic_viscosity_m2_s: f64,
    /// kJ/kgK
    pub specific_heat_kj_kg_k: f64,
    pub roughness_mm: f64,
    pub max_velocity_m_s: f64,
    pub pump_efficiency: f64,
    pub catalogue: Vec<PipeSize>,
}

impl Default for HydraulicParams {
    fn default() -> Self {
        Self {
            plant_pressure_bar: 5.0,
            density_kg_m3: 977.8,
            kinematic_viscosity_m2_s: 4.04e-7,
            specific_heat_kj_kg_k: 4.186,
            roughness_mm: 0.1,
            max_velocity_m_s: 1.5,
            pump_efficiency: 0.75,
            catalogue: DEFAULT_CATALOGUE.to_vec(),
        }
    }
}

// =============================================================================
// RESULTS
// =============================================================================

/// Hydraulic state of one pipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipeResult {
    pub from: Option<NodeId>,
    pub to: Option<NodeId>,
    pub kind: PipeKind,
    /// Set for service pipes.
    pub building_id: Option<BuildingId>,
    pub length_m: f64,
    pub dn: u32,
    pub inner_diameter_m: f64,
    pub mass_flow_kg_s: f64,
    pub velocity_m_s: f64,
    pub reynolds: f64,
    pub friction_factor: f64,
    pub pressure_drop_bar: f64,
}

/// Network-level hydraulic result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydraulicResult {
    pub pipes: Vec<PipeResult>,
    /// Supply-side pressure at every main node.
    pub node_pressure_bar: BTreeMap<NodeId, f64>,
    pub min_pressure_bar: f64,
    pub max_pressure_bar: f64,
    pub avg_pressure_bar: f64,
    /// Worst supply + return path drop.
    pub max_pressure_drop_bar: f64,
    pub critical_building: Option<BuildingId>,
    pub max_velocity_m_s: f64,
    /// Pipes whose largest catalogue size still exceeds the velocity limit.
    pub velocity_violations: usize,
    pub total_mass_flow_kg_s: f64,
    pub total_volume_flow_m3_h: f64,
    pub pump_power_kw: f64,
    pub pump_energy_kwh: f64,
    pub full_load_hours: f64,
    pub total_design_load_kw: f64,
    pub total_heat_supplied_mwh: f64,
    /// Main + service pipe length.
    pub network_length_m: f64,
}

// =============================================================================
// PHYSICS
// =============================================================================

/// ṁ = Q / (cp·ΔT) in kg/s.
#[must_use]
pub fn mass_flow_kg_s(load_kw: f64, delta_t_k: f64, cp_kj_kg_k: f64) -> f64 {
    if delta_t_k <= 0.0 {
        return 0.0;
    }
    load_kw / (cp_kj_kg_k * delta_t_k)
}

fn velocity(mass_flow: f64, diameter: f64, density: f64) -> f64 {
    let area = std::f64::consts::PI * diameter * diameter / 4.0;
    mass_flow / density / area
}

/// Smallest catalogue size with velocity ≤ limit; the largest size otherwise.
///
/// The flag is `false` when even the largest size is too small.
#[must_use]
pub fn size_pipe(mass_flow: f64, params: &HydraulicParams) -> (PipeSize, bool) {
    let fallback = params
        .catalogue
        .last()
        .copied()
        .unwrap_or(DEFAULT_CATALOGUE[DEFAULT_CATALOGUE.len() - 1]);
    params
        .catalogue
        .iter()
        .find(|size| {
            velocity(mass_flow, size.inner_diameter_m, params.density_kg_m3)
                <= params.max_velocity_m_s
        })
        .map_or((fallback, false), |size| (*size, true))
}

/// Darcy friction factor. Laminar 64/Re, turbulent Swamee–Jain.
#[must_use]
pub fn friction_factor(reynolds: f64, relative_roughness: f64) -> f64 {
    if reynolds <= 0.0 {
        return 0.0;
    }
    if reynolds < LAMINAR_REYNOLDS {
        return 64.0 / reynolds;
    }
    let term = relative_roughness / 3.7 + 5.74 / reynolds.powf(0.9);
    0.25 / term.log10().powi(2)
}

fn pipe_result(
    kind: PipeKind,
    from: Option<NodeId>,
    to: Option<NodeId>,
    building_id: Option<BuildingId>,
    length_m: f64,
    mass_flow: f64,
    params: &HydraulicParams,
) -> (PipeResult, bool) {
    let (size, within_limit) = size_pipe(mass_flow, params);
    let d = size.inner_diameter_m;
    let v = velocity(mass_flow, d, params.density_kg_m3);
    let re = v * d / params.kinematic_viscosity_m2_s;
    let f = friction_factor(re, params.roughness_mm / 1000.0 / d);
    let dp_pa = f * (length_m / d) * params.density_kg_m3 * v * v / 2.0;
    (
        PipeResult {
            from,
            to,
            kind,
            building_id,
            length_m,
            dn: size.dn,
            inner_diameter_m: d,
            mass_flow_kg_s: mass_flow,
            velocity_m_s: v,
            reynolds: re,
            friction_factor: f,
            pressure_drop_bar: dp_pa / PA_PER_BAR,
        },
        within_limit,
    )
}

// =============================================================================
// SIMULATION
// =============================================================================

/// Simulate the network at design load.
///
/// Building loads come from the service connections. Returns a
/// `Simulation` error when no building is routed.
pub fn simulate(network: &DualPipeNetwork, params: &HydraulicParams) -> Result<HydraulicResult> {
    let routed: Vec<_> = network.routed().collect();
    if routed.is_empty() {
        return Err(HeatplanError::Simulation(
            "network has no routed buildings".to_string(),
        ));
    }
    let delta_t = network.params.supply_temp_c - network.params.return_temp_c;
    if delta_t <= 0.0 {
        return Err(HeatplanError::Simulation(format!(
            "supply temperature must exceed return temperature (ΔT = {delta_t} K)"
        )));
    }
    let cp = params.specific_heat_kj_kg_k;
    let flow_of: BTreeMap<&BuildingId, f64> = routed
        .iter()
        .map(|s| (&s.building_id, mass_flow_kg_s(s.design_load_kw, delta_t, cp)))
        .collect();

    let mut pipes = Vec::new();
    let mut violations = 0;
    let mut children: BTreeMap<NodeId, Vec<(NodeId, f64)>> = BTreeMap::new();

    for seg in &network.supply {
        let flow: f64 = seg
            .buildings_served
            .iter()
            .filter_map(|b| flow_of.get(b))
            .sum();
        let (result, ok) = pipe_result(
            PipeKind::Supply,
            Some(seg.from),
            Some(seg.to),
            None,
            seg.length_m,
            flow,
            params,
        );
        violations += usize::from(!ok);
        children
            .entry(seg.from)
            .or_default()
            .push((seg.to, result.pressure_drop_bar));
        pipes.push(result);
    }
    for seg in &network.returns {
        let flow: f64 = seg
            .buildings_served
            .iter()
            .filter_map(|b| flow_of.get(b))
            .sum();
        let (result, ok) = pipe_result(
            PipeKind::Return,
            Some(seg.from),
            Some(seg.to),
            None,
            seg.length_m,
            flow,
            params,
        );
        violations += usize::from(!ok);
        pipes.push(result);
    }

    // Main-network drop from the plant to every node (supply side).
    let mut node_drop: BTreeMap<NodeId, f64> = BTreeMap::new();
    node_drop.insert(network.plant_node, 0.0);
    let mut queue = VecDeque::from([network.plant_node]);
    while let Some(node) = queue.pop_front() {
        let base = node_drop.get(&node).copied().unwrap_or(0.0);
        for (child, dp) in children.get(&node).map(Vec::as_slice).unwrap_or(&[]) {
            if !node_drop.contains_key(child) {
                node_drop.insert(*child, base + dp);
                queue.push_back(*child);
            }
        }
    }

    let mut max_path_drop = 0.0;
    let mut critical_building = None;
    let mut building_pressures = Vec::new();
    for service in &network.services {
        let flow = flow_of.get(&service.building_id).copied().unwrap_or(0.0);
        let (result, ok) = pipe_result(
            service.kind,
            Some(service.node),
            None,
            Some(service.building_id.clone()),
            service.length_m,
            flow,
            params,
        );
        violations += usize::from(!ok);
        if service.kind == PipeKind::SupplyService {
            let main = node_drop.get(&service.node).copied().unwrap_or(0.0);
            let supply_side = main + result.pressure_drop_bar;
            building_pressures.push(params.plant_pressure_bar - supply_side);
            // Return main mirrors supply main with the same flows and sizes.
            let path = 2.0 * supply_side;
            if path > max_path_drop {
                max_path_drop = path;
                critical_building = Some(service.building_id.clone());
            }
        }
        pipes.push(result);
    }

    let node_pressure_bar: BTreeMap<NodeId, f64> = node_drop
        .iter()
        .map(|(n, dp)| (*n, round_to(params.plant_pressure_bar - dp, 4)))
        .collect();
    let all_pressures: Vec<f64> = node_pressure_bar
        .values()
        .copied()
        .chain(building_pressures)
        .collect();
    let min_pressure_bar = all_pressures.iter().copied().fold(f64::INFINITY, f64::min);
    let max_pressure_bar = all_pressures
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let avg_pressure_bar = all_pressures.iter().sum::<f64>() / all_pressures.len() as f64;

    let total_mass_flow_kg_s: f64 = flow_of.values().sum();
    let volume_flow_m3_s = total_mass_flow_kg_s / params.density_kg_m3;
    let pump_power_kw =
        max_path_drop * PA_PER_BAR * volume_flow_m3_s / params.pump_efficiency / 1000.0;
    let total_design_load_kw: f64 = routed.iter().map(|s| s.design_load_kw).sum();
    let total_annual_kwh: f64 = routed.iter().map(|s| s.annual_demand_kwh).sum();
    let full_load_hours = if total_design_load_kw > 0.0 {
        total_annual_kwh / total_design_load_kw
    } else {
        0.0
    };

    Ok(HydraulicResult {
        max_velocity_m_s: pipes.iter().map(|p| p.velocity_m_s).fold(0.0, f64::max),
        pipes,
        node_pressure_bar,
        min_pressure_bar: round_to(min_pressure_bar, 4),
        max_pressure_bar: round_to(max_pressure_bar, 4),
        avg_pressure_bar: round_to(avg_pressure_bar, 4),
        max_pressure_drop_bar: round_to(max_path_drop, 4),
        critical_building,
        velocity_violations: violations,
        total_mass_flow_kg_s,
        total_volume_flow_m3_h: volume_flow_m3_s * 3600.0,
        pump_power_kw,
        pump_energy_kwh: pump_power_kw * full_load_hours,
        full_load_hours,
        total_design_load_kw,
        total_heat_supplied_mwh: total_annual_kwh / 1000.0,
        network_length_m: network.total_pipe_length_m(),
    })
}

// =============================================================================
// TESTS
// =============================================================================
