//! # Simulation
//!
//! Runs resolved scenarios: DH scenarios route a dual-pipe network and
//! solve its hydraulics, HP scenarios assess the low-voltage grid.
//! A failing scenario never aborts a batch; it yields a result with
//! `success = false` and the error text.

use crate::building::Building;
use crate::demand::{BuildingDemand, DemandParams, calculate_demand};
use crate::grid::{GridConsumer, GridNetwork, GridParams, assess, base_load_for};
use crate::hydraulics::{HydraulicParams, simulate};
use crate::network::{Consumer, NetworkParams, Street, build_dual_pipe_network};
use crate::primitives::{BuildingId, Point};
use crate::profiles::PhaseSummary;
use crate::scenario::{Scenario, ScenarioKind};
use crate::{HeatplanError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::thread;

/// Default number of worker threads for `run_batch`.
pub const DEFAULT_WORKERS: usize = 4;

/// Everything a scenario run reads. Shared immutably across workers.
#[derive(Debug, Clone, Default)]
pub struct SimulationInputs {
    pub buildings: Vec<Building>,
    pub streets: Vec<Street>,
    /// Heating plant location for DH scenarios.
    pub plant: Option<Point>,
    /// Low-voltage grid for HP scenarios.
    pub grid: Option<GridNetwork>,
    /// Household base load per building, from generated profiles.
    pub phase_summaries: BTreeMap<BuildingId, PhaseSummary>,
    pub demand: DemandParams,
    pub network: NetworkParams,
    pub hydraulics: HydraulicParams,
    pub grid_params: GridParams,
}

/// Metrics of a district heating run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DhMetrics {
    pub num_buildings: usize,
    pub unrouted_buildings: usize,
    pub total_heat_supplied_mwh: f64,
    pub total_design_load_kw: f64,
    /// Supply + return mains (m).
    pub main_length_m: f64,
    /// Mains plus service pipes (m).
    pub network_length_m: f64,
    pub max_pressure_drop_bar: f64,
    pub min_pressure_bar: f64,
    pub max_pressure_bar: f64,
    pub max_velocity_m_s: f64,
    pub velocity_violations: usize,
    pub total_mass_flow_kg_s: f64,
    pub pump_power_kw: f64,
    pub pump_energy_kwh: f64,
    pub supply_temp_c: f64,
    pub return_temp_c: f64,
}

/// Metrics of a heat pump run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HpMetrics {
    pub num_buildings: usize,
    pub n_heat_pumps: usize,
    pub far_buildings: usize,
    /// Annual heat of the connected buildings.
    pub total_heat_supplied_mwh: f64,
    pub total_electric_peak_kw: f64,
    pub max_trafo_loading_percent: f64,
    pub transformer_overloads: usize,
    pub min_voltage_pu: f64,
    pub max_feeder_load_percent: f64,
    /// Seasonal COP override for costs and emissions.
    pub seasonal_cop: Option<f64>,
}

/// Technology-specific result metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimulationKpi {
    DistrictHeating(DhMetrics),
    HeatPump(HpMetrics),
}

impl SimulationKpi {
    #[must_use]
    pub fn heat_supplied_mwh(&self) -> f64 {
        match self {
            Self::DistrictHeating(m) => m.total_heat_supplied_mwh,
            Self::HeatPump(m) => m.total_heat_supplied_mwh,
        }
    }
}

/// Outcome of one scenario run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub scenario: String,
    pub kind: ScenarioKind,
    pub success: bool,
    pub kpi: Option<SimulationKpi>,
    pub error: Option<String>,
}

impl SimulationResult {
    fn from_outcome(scenario: &Scenario, outcome: Result<SimulationKpi>) -> Self {
        match outcome {
            Ok(kpi) => Self {
                scenario: scenario.name.clone(),
                kind: scenario.kind,
                success: true,
                kpi: Some(kpi),
                error: None,
            },
            Err(err) => Self::failed(scenario, err.to_string()),
        }
    }

    fn failed(scenario: &Scenario, error: String) -> Self {
        Self {
            scenario: scenario.name.clone(),
            kind: scenario.kind,
            success: false,
            kpi: None,
            error: Some(error),
        }
    }
}

// =============================================================================
// SINGLE RUN
// =============================================================================

fn scenario_demands<'a>(
    scenario: &Scenario,
    inputs: &'a SimulationInputs,
) -> Result<Vec<(&'a Building, BuildingDemand)>> {
    let ids: BTreeSet<&BuildingId> = scenario.building_ids.iter().collect();
    let selected: Vec<(&Building, BuildingDemand)> = inputs
        .buildings
        .iter()
        .filter(|b| ids.contains(&b.id))
        .map(|b| {
            let demand = calculate_demand(b, &inputs.demand).scaled(scenario.params.demand_factor);
            (b, demand)
        })
        .collect();
    if selected.is_empty() {
        return Err(HeatplanError::MissingData(format!(
            "scenario '{}' selects no buildings",
            scenario.name
        )));
    }
    Ok(selected)
}

fn run_district_heating(scenario: &Scenario, inputs: &SimulationInputs) -> Result<SimulationKpi> {
    let plant = inputs
        .plant
        .ok_or_else(|| HeatplanError::MissingData("no heating plant location".to_string()))?;
    let demands = scenario_demands(scenario, inputs)?;
    let consumers: Vec<Consumer> = demands
        .iter()
        .filter_map(|(b, d)| Consumer::from_demand(b, d))
        .collect();

    let mut params = inputs.network;
    if let Some(t) = scenario.params.supply_temp_c {
        params.supply_temp_c = t;
    }
    if let Some(t) = scenario.params.return_temp_c {
        params.return_temp_c = t;
    }

    let network = build_dual_pipe_network(&inputs.streets, plant, &consumers, &params)?;
    let hydraulic = simulate(&network, &inputs.hydraulics)?;

    Ok(SimulationKpi::DistrictHeating(DhMetrics {
        num_buildings: network.routed().count(),
        unrouted_buildings: network.unrouted.len(),
        total_heat_supplied_mwh: hydraulic.total_heat_supplied_mwh,
        total_design_load_kw: hydraulic.total_design_load_kw,
        main_length_m: network.main_length_m(),
        network_length_m: network.total_pipe_length_m(),
        max_pressure_drop_bar: hydraulic.max_pressure_drop_bar,
        min_pressure_bar: hydraulic.min_pressure_bar,
        max_pressure_bar: hydraulic.max_pressure_bar,
        max_velocity_m_s: hydraulic.max_velocity_m_s,
        velocity_violations: hydraulic.velocity_violations,
        total_mass_flow_kg_s: hydraulic.total_mass_flow_kg_s,
        pump_power_kw: hydraulic.pump_power_kw,
        pump_energy_kwh: hydraulic.pump_energy_kwh,
        supply_temp_c: params.supply_temp_c,
        return_temp_c: params.return_temp_c,
    }))
}

fn run_heat_pumps(scenario: &Scenario, inputs: &SimulationInputs) -> Result<SimulationKpi> {
    let grid = inputs
        .grid
        .as_ref()
        .ok_or_else(|| HeatplanError::MissingData("no power grid data".to_string()))?;
    let demands = scenario_demands(scenario, inputs)?;
    let key = scenario
        .params
        .phase_key
        .as_deref()
        .unwrap_or(&inputs.grid_params.phase_key);

    let mut annual_kwh = BTreeMap::new();
    let consumers: Vec<GridConsumer> = demands
        .iter()
        .filter_map(|(b, d)| {
            let position = b.centroid()?;
            annual_kwh.insert(b.id.clone(), d.annual_demand_kwh);
            Some(GridConsumer {
                building_id: b.id.clone(),
                position,
                heat_load_kw: d.design_load_kw,
                base_load_kw: inputs
                    .phase_summaries
                    .get(&b.id)
                    .map_or(0.0, |s| base_load_for(s, key)),
            })
        })
        .collect();

    let assessment = assess(&consumers, grid, &inputs.grid_params)?;
    let heat_kwh: f64 = assessment
        .rows
        .iter()
        .filter(|r| r.connected)
        .filter_map(|r| annual_kwh.get(&r.building_id))
        .sum();

    Ok(SimulationKpi::HeatPump(HpMetrics {
        num_buildings: consumers.len(),
        n_heat_pumps: assessment.n_heat_pumps,
        far_buildings: assessment.far_buildings,
        total_heat_supplied_mwh: heat_kwh / 1000.0,
        total_electric_peak_kw: assessment.total_electric_peak_kw,
        max_trafo_loading_percent: assessment.max_trafo_loading_percent,
        transformer_overloads: assessment.transformer_overloads,
        min_voltage_pu: assessment.min_voltage_pu,
        max_feeder_load_percent: assessment.max_feeder_load_percent,
        seasonal_cop: scenario.params.cop,
    }))
}

/// Run one scenario. Errors are folded into the result.
#[must_use]
pub fn run_scenario(scenario: &Scenario, inputs: &SimulationInputs) -> SimulationResult {
    let outcome = match scenario.kind {
        ScenarioKind::DH => run_district_heating(scenario, inputs),
        ScenarioKind::HP => run_heat_pumps(scenario, inputs),
    };
    SimulationResult::from_outcome(scenario, outcome)
}

// =============================================================================
// BATCH
// =============================================================================

/// Run scenarios on at most `min(workers, n)` scoped threads.
///
/// Worker `k` takes scenarios `k, k + w, k + 2w, ...`. Results come back in
/// input order regardless of scheduling.
#[must_use]
pub fn run_batch(
    scenarios: &[Scenario],
    inputs: &SimulationInputs,
    workers: usize,
) -> Vec<SimulationResult> {
    let n = scenarios.len();
    let workers = workers.clamp(1, n.max(1));
    if n <= 1 || workers == 1 {
        return scenarios.iter().map(|s| run_scenario(s, inputs)).collect();
    }

    let mut slots: Vec<Option<SimulationResult>> = vec![None; n];
    thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|k| {
                scope.spawn(move || {
                    (k..n)
                        .step_by(workers)
                        .map(|i| (i, run_scenario(&scenarios[i], inputs)))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        for handle in handles {
            if let Ok(done) = handle.join() {
                for (i, result) in done {
                    slots[i] = Some(result);
                }
            }
        }
    });

    slots
        .into_iter()
        .zip(scenarios)
        .map(|(slot, scenario)| {
            slot.unwrap_or_else(|| {
                SimulationResult::failed(scenario, "simulation worker panicked".to_string())
            })
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{PowerLine, Transformer};
    use crate::scenario::ScenarioParams;

    fn building(id: &str, x: f64, y: f64) -> Building {
        let mut b = Building::new(
            id,
            vec![
                Point::new(x, y),
                Point::new(x + 10.0, y),
                Point::new(x + 10.0, y + 10.0),
                Point::new(x, y + 10.0),
            ],
        );
        b.storeys = Some(2);
        b
    }

    fn inputs() -> SimulationInputs {
        SimulationInputs {
            buildings: vec![building("A", 40.0, 10.0), building("B", 140.0, 10.0)],
            streets: vec![Street {
                name: Some("Hauptstr".to_string()),
                highway: None,
                coords: vec![Point::new(0.0, 0.0), Point::new(200.0, 0.0)],
            }],
            plant: Some(Point::new(0.0, -5.0)),
            grid: Some(GridNetwork {
                transformers: vec![Transformer {
                    id: "T1".to_string(),
                    position: Point::new(100.0, -10.0),
                    rated_kva: 630.0,
                }],
                lines: vec![PowerLine {
                    id: None,
                    coords: vec![Point::new(0.0, -10.0), Point::new(200.0, -10.0)],
                }],
            }),
            ..SimulationInputs::default()
        }
    }

    fn scenario(name: &str, kind: ScenarioKind) -> Scenario {
        Scenario {
            name: name.to_string(),
            description: String::new(),
            kind,
            params: ScenarioParams::default(),
            building_filter: BTreeMap::new(),
            building_ids: vec![BuildingId::from("A"), BuildingId::from("B")],
        }
    }

    #[test]
    fn test_district_heating_run() {
        let result = run_scenario(&scenario("dh", ScenarioKind::DH), &inputs());
        assert!(result.success, "{:?}", result.error);
        let Some(SimulationKpi::DistrictHeating(m)) = result.kpi else {
            panic!("expected DH metrics");
        };
        assert_eq!(m.num_buildings, 2);
        assert!(m.network_length_m > m.main_length_m);
        assert!(m.max_pressure_drop_bar > 0.0);
        assert!(m.pump_energy_kwh > 0.0);
    }

    #[test]
    fn test_heat_pump_run() {
        let result = run_scenario(&scenario("hp", ScenarioKind::HP), &inputs());
        assert!(result.success, "{:?}", result.error);
        let Some(SimulationKpi::HeatPump(m)) = result.kpi else {
            panic!("expected HP metrics");
        };
        assert_eq!(m.n_heat_pumps, 2);
        assert!(m.total_heat_supplied_mwh > 0.0);
    }

    #[test]
    fn test_demand_factor_scales_heat() {
        let base = run_scenario(&scenario("a", ScenarioKind::HP), &inputs());
        let mut half = scenario("b", ScenarioKind::HP);
        half.params.demand_factor = 0.5;
        let half = run_scenario(&half, &inputs());
        let (Some(a), Some(b)) = (base.kpi, half.kpi) else {
            panic!("both runs should succeed");
        };
        assert!((b.heat_supplied_mwh() * 2.0 - a.heat_supplied_mwh()).abs() < 1e-6);
    }

    #[test]
    fn test_missing_inputs_fail_softly() {
        let mut inputs = inputs();
        inputs.plant = None;
        inputs.grid = None;
        let dh = run_scenario(&scenario("dh", ScenarioKind::DH), &inputs);
        let hp = run_scenario(&scenario("hp", ScenarioKind::HP), &inputs);
        assert!(!dh.success && !hp.success);
        assert!(dh.error.unwrap().contains("plant"));
        assert!(hp.kpi.is_none());
    }

    #[test]
    fn test_empty_selection_fails() {
        let mut s = scenario("none", ScenarioKind::DH);
        s.building_ids.clear();
        assert!(!run_scenario(&s, &inputs()).success);
    }

    #[test]
    fn test_batch_preserves_order() {
        let scenarios: Vec<Scenario> = (0..7)
            .map(|i| {
                let kind = if i % 2 == 0 { ScenarioKind::DH } else { ScenarioKind::HP };
                scenario(&format!("s{i}"), kind)
            })
            .collect();
        let inputs = inputs();
        let parallel = run_batch(&scenarios, &inputs, 3);
        let serial = run_batch(&scenarios, &inputs, 1);
        let names: Vec<_> = parallel.iter().map(|r| r.scenario.as_str()).collect();
        assert_eq!(names, vec!["s0", "s1", "s2", "s3", "s4", "s5", "s6"]);
        assert_eq!(parallel, serial);
    }

    #[test]
    fn test_batch_empty() {
        assert!(run_batch(&[], &inputs(), 4).is_empty());
    }
}
