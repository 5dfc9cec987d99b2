//! # KPI Calculator
//!
//! Economic and ecological indicators per scenario: levelised cost of heat
//! (LCoH) and annual CO₂ emissions, plus the technical headline figures
//! carried through to the report.

use crate::round_to;
use crate::scenario::ScenarioKind;
use crate::simulation::{DhMetrics, HpMetrics, SimulationKpi, SimulationResult};
use serde::{Deserialize, Serialize};

/// Cost assumptions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostParams {
    /// Seasonal heat pump COP.
    pub heat_pump_cop: f64,
    pub electricity_price_eur_per_kwh: f64,
    pub biomass_price_eur_per_kwh: f64,
    /// Investment per heat pump (€).
    pub heat_pump_capex_eur: f64,
    /// Investment per metre of network (€/m).
    pub dh_capex_eur_per_m: f64,
    /// Annual O&M as a share of capex.
    pub om_factor: f64,
    pub discount_rate: f64,
    pub lifetime_years: u32,
}

impl Default for CostParams {
    fn default() -> Self {
        Self {
            heat_pump_cop: 3.5,
            electricity_price_eur_per_kwh: 0.35,
            biomass_price_eur_per_kwh: 0.07,
            heat_pump_capex_eur: 14_000.0,
            dh_capex_eur_per_m: 800.0,
            om_factor: 0.01,
            discount_rate: 0.04,
            lifetime_years: 20,
        }
    }
}

/// Emission factors in gCO₂/kWh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmissionFactors {
    pub electricity: f64,
    pub biomass: f64,
    pub other: f64,
}

impl Default for EmissionFactors {
    fn default() -> Self {
        Self {
            electricity: 290.0,
            biomass: 70.0,
            other: 400.0,
        }
    }
}

/// Energy carrier for emission accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fuel {
    Electricity,
    Biomass,
    Other,
}

impl EmissionFactors {
    #[must_use]
    pub fn factor(&self, fuel: Fuel) -> f64 {
        match fuel {
            Fuel::Electricity => self.electricity,
            Fuel::Biomass => self.biomass,
            Fuel::Other => self.other,
        }
    }
}

/// CO₂ in tonnes for an energy amount in kWh.
#[must_use]
pub fn co2_tonnes(kwh: f64, fuel: Fuel, factors: &EmissionFactors) -> f64 {
    kwh * factors.factor(fuel) / 1e6
}

/// Capital recovery factor `q^n·r / (q^n − 1)`, `1/n` at zero interest.
#[must_use]
pub fn annuity_factor(rate: f64, years: u32) -> f64 {
    if years == 0 {
        return 1.0;
    }
    if rate.abs() < f64::EPSILON {
        return 1.0 / f64::from(years);
    }
    let qn = (1.0 + rate).powi(years as i32);
    qn * rate / (qn - 1.0)
}

/// Annualised cost per MWh. `None` when no heat is delivered.
#[must_use]
pub fn compute_lcoh(total_cost_eur: f64, heat_mwh: f64, costs: &CostParams) -> Option<f64> {
    if heat_mwh <= 0.0 {
        return None;
    }
    Some(total_cost_eur * annuity_factor(costs.discount_rate, costs.lifetime_years) / heat_mwh)
}

/// KPI row for one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiRecord {
    pub scenario: String,
    pub kind: ScenarioKind,
    pub success: bool,
    pub lcoh_eur_per_mwh: Option<f64>,
    pub co2_t_per_a: Option<f64>,
    pub capex_eur: Option<f64>,
    pub total_cost_eur: Option<f64>,
    pub heat_supplied_mwh: Option<f64>,
    pub max_pressure_drop_bar: Option<f64>,
    pub pump_energy_kwh: Option<f64>,
    pub network_length_m: Option<f64>,
    pub max_feeder_load_percent: Option<f64>,
    pub transformer_overloads: Option<usize>,
    pub min_voltage_pu: Option<f64>,
    pub n_heat_pumps: Option<usize>,
    pub comment: String,
}

impl KpiRecord {
    fn empty(result: &SimulationResult) -> Self {
        Self {
            scenario: result.scenario.clone(),
            kind: result.kind,
            success: result.success,
            lcoh_eur_per_mwh: None,
            co2_t_per_a: None,
            capex_eur: None,
            total_cost_eur: None,
            heat_supplied_mwh: None,
            max_pressure_drop_bar: None,
            pump_energy_kwh: None,
            network_length_m: None,
            max_feeder_load_percent: None,
            transformer_overloads: None,
            min_voltage_pu: None,
            n_heat_pumps: None,
            comment: String::new(),
        }
    }
}

fn district_heating(
    record: &mut KpiRecord,
    m: &DhMetrics,
    costs: &CostParams,
    emissions: &EmissionFactors,
) {
    let heat_kwh = m.total_heat_supplied_mwh * 1000.0;
    let capex = m.network_length_m * costs.dh_capex_eur_per_m;
    let opex = capex * costs.om_factor * f64::from(costs.lifetime_years);
    let energy = heat_kwh * costs.biomass_price_eur_per_kwh;
    let total = capex + opex + energy;
    let co2 = co2_tonnes(heat_kwh, Fuel::Biomass, emissions)
        + co2_tonnes(m.pump_energy_kwh, Fuel::Electricity, emissions);

    record.lcoh_eur_per_mwh = compute_lcoh(total, m.total_heat_supplied_mwh, costs);
    record.co2_t_per_a = Some(co2);
    record.capex_eur = Some(capex);
    record.total_cost_eur = Some(total);
    record.heat_supplied_mwh = Some(m.total_heat_supplied_mwh);
    record.max_pressure_drop_bar = Some(m.max_pressure_drop_bar);
    record.pump_energy_kwh = Some(m.pump_energy_kwh);
    record.network_length_m = Some(m.network_length_m);
    if m.unrouted_buildings > 0 {
        record.comment = format!("{} buildings without street route", m.unrouted_buildings);
    }
}

fn heat_pumps(
    record: &mut KpiRecord,
    m: &HpMetrics,
    costs: &CostParams,
    emissions: &EmissionFactors,
) {
    let cop = m.seasonal_cop.unwrap_or(costs.heat_pump_cop);
    let electricity_kwh = if cop > 0.0 {
        m.total_heat_supplied_mwh * 1000.0 / cop
    } else {
        0.0
    };
    let capex = costs.heat_pump_capex_eur * m.n_heat_pumps as f64;
    let opex = capex * costs.om_factor * f64::from(costs.lifetime_years);
    let energy = electricity_kwh * costs.electricity_price_eur_per_kwh;
    let total = capex + opex + energy;

    record.lcoh_eur_per_mwh = compute_lcoh(total, m.total_heat_supplied_mwh, costs);
    record.co2_t_per_a = Some(co2_tonnes(electricity_kwh, Fuel::Electricity, emissions));
    record.capex_eur = Some(capex);
    record.total_cost_eur = Some(total);
    record.heat_supplied_mwh = Some(m.total_heat_supplied_mwh);
    record.max_feeder_load_percent = Some(m.max_feeder_load_percent);
    record.transformer_overloads = Some(m.transformer_overloads);
    record.min_voltage_pu = Some(m.min_voltage_pu);
    record.n_heat_pumps = Some(m.n_heat_pumps);
    if m.far_buildings > 0 {
        record.comment = format!("{} buildings too far from the grid", m.far_buildings);
    }
}

fn round_fields(record: &mut KpiRecord) {
    for value in [
        &mut record.lcoh_eur_per_mwh,
        &mut record.co2_t_per_a,
        &mut record.capex_eur,
        &mut record.total_cost_eur,
        &mut record.heat_supplied_mwh,
        &mut record.max_pressure_drop_bar,
        &mut record.pump_energy_kwh,
        &mut record.network_length_m,
        &mut record.max_feeder_load_percent,
        &mut record.min_voltage_pu,
    ] {
        *value = value.map(|v| round_to(v, 2));
    }
}

/// One KPI record per simulation result, in input order.
#[must_use]
pub fn compute_kpis(
    results: &[SimulationResult],
    costs: &CostParams,
    emissions: &EmissionFactors,
) -> Vec<KpiRecord> {
    results
        .iter()
        .map(|result| {
            let mut record = KpiRecord::empty(result);
            match (&result.kpi, result.success) {
                (Some(SimulationKpi::DistrictHeating(m)), true) => {
                    district_heating(&mut record, m, costs, emissions);
                }
                (Some(SimulationKpi::HeatPump(m)), true) => {
                    heat_pumps(&mut record, m, costs, emissions);
                }
                _ => {
                    record.success = false;
                    record.comment = result
                        .error
                        .clone()
                        .unwrap_or_else(|| "simulation failed".to_string());
                }
            }
            round_fields(&mut record);
            record
        })
        .collect()
}

/// Best scenarios by cost and by emissions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranking {
    pub cheapest: Option<String>,
    pub lowest_emissions: Option<String>,
}

fn best_by(kpis: &[KpiRecord], key: impl Fn(&KpiRecord) -> Option<f64>) -> Option<String> {
    let mut best: Option<(&KpiRecord, f64)> = None;
    for record in kpis.iter().filter(|r| r.success) {
        if let Some(value) = key(record)
            && best.is_none_or(|(_, b)| value < b)
        {
            best = Some((record, value));
        }
    }
    best.map(|(r, _)| r.scenario.clone())
}

/// Rank successful scenarios. Ties go to the earlier record.
#[must_use]
pub fn rank(kpis: &[KpiRecord]) -> Ranking {
    Ranking {
        cheapest: best_by(kpis, |r| r.lcoh_eur_per_mwh),
        lowest_emissions: best_by(kpis, |r| r.co2_t_per_a),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dh_result(name: &str, length_m: f64, heat_mwh: f64) -> SimulationResult {
        SimulationResult {
            scenario: name.to_string(),
            kind: ScenarioKind::DH,
            success: true,
            kpi: Some(SimulationKpi::DistrictHeating(DhMetrics {
                num_buildings: 3,
                unrouted_buildings: 0,
                total_heat_supplied_mwh: heat_mwh,
                total_design_load_kw: 60.0,
                main_length_m: length_m * 0.8,
                network_length_m: length_m,
                max_pressure_drop_bar: 0.4,
                min_pressure_bar: 4.6,
                max_pressure_bar: 5.0,
                max_velocity_m_s: 0.8,
                velocity_violations: 0,
                total_mass_flow_kg_s: 0.5,
                pump_power_kw: 0.3,
                pump_energy_kwh: 1000.0,
                supply_temp_c: 70.0,
                return_temp_c: 40.0,
            })),
            error: None,
        }
    }

    fn hp_result(name: &str, n: usize, heat_mwh: f64) -> SimulationResult {
        SimulationResult {
            scenario: name.to_string(),
            kind: ScenarioKind::HP,
            success: true,
            kpi: Some(SimulationKpi::HeatPump(HpMetrics {
                num_buildings: n,
                n_heat_pumps: n,
                far_buildings: 0,
                total_heat_supplied_mwh: heat_mwh,
                total_electric_peak_kw: 30.0,
                max_trafo_loading_percent: 40.0,
                transformer_overloads: 0,
                min_voltage_pu: 0.98,
                max_feeder_load_percent: 35.0,
                seasonal_cop: None,
            })),
            error: None,
        }
    }

    #[test]
    fn test_annuity_factor() {
        assert!((annuity_factor(0.04, 20) - 0.073_582).abs() < 1e-5);
        assert!((annuity_factor(0.0, 20) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_lcoh_zero_heat() {
        assert_eq!(compute_lcoh(1000.0, 0.0, &CostParams::default()), None);
    }

    #[test]
    fn test_co2() {
        let f = EmissionFactors::default();
        assert!((co2_tonnes(1_000_000.0, Fuel::Electricity, &f) - 290.0).abs() < 1e-9);
        assert!((co2_tonnes(1000.0, Fuel::Other, &f) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_district_heating_kpis() {
        let costs = CostParams::default();
        let kpis = compute_kpis(&[dh_result("dh", 100.0, 50.0)], &costs, &EmissionFactors::default());
        let k = &kpis[0];
        // capex 80 000, opex 16 000, energy 3 500
        assert_eq!(k.capex_eur, Some(80_000.0));
        assert_eq!(k.total_cost_eur, Some(99_500.0));
        let expected = round_to(99_500.0 * annuity_factor(0.04, 20) / 50.0, 2);
        assert_eq!(k.lcoh_eur_per_mwh, Some(expected));
        // 50 MWh biomass 3.5 t + 1 MWh pump electricity 0.29 t
        assert_eq!(k.co2_t_per_a, Some(3.79));
        assert_eq!(k.max_feeder_load_percent, None);
    }

    #[test]
    fn test_heat_pump_kpis() {
        let kpis = compute_kpis(
            &[hp_result("hp", 2, 35.0)],
            &CostParams::default(),
            &EmissionFactors::default(),
        );
        let k = &kpis[0];
        // capex 28 000, opex 5 600, 10 000 kWh electricity 3 500
        assert_eq!(k.capex_eur, Some(28_000.0));
        assert_eq!(k.total_cost_eur, Some(37_100.0));
        let expected = round_to(37_100.0 * annuity_factor(0.04, 20) / 35.0, 2);
        assert_eq!(k.lcoh_eur_per_mwh, Some(expected));
        assert_eq!(k.co2_t_per_a, Some(2.9));
        assert_eq!(k.transformer_overloads, Some(0));
        assert_eq!(k.pump_energy_kwh, None);
    }

    #[test]
    fn test_failed_result_comment() {
        let failed = SimulationResult {
            scenario: "broken".to_string(),
            kind: ScenarioKind::DH,
            success: false,
            kpi: None,
            error: None,
        };
        let kpis = compute_kpis(&[failed], &CostParams::default(), &EmissionFactors::default());
        assert!(!kpis[0].success);
        assert_eq!(kpis[0].comment, "simulation failed");
        assert_eq!(kpis[0].lcoh_eur_per_mwh, None);
    }

    #[test]
    fn test_rank() {
        let kpis = compute_kpis(
            &[dh_result("dh", 2000.0, 50.0), hp_result("hp", 2, 35.0)],
            &CostParams::default(),
            &EmissionFactors::default(),
        );
        let ranking = rank(&kpis);
        assert_eq!(ranking.cheapest.as_deref(), Some("hp"));
        assert_eq!(ranking.lowest_emissions.as_deref(), Some("hp"));
        assert_eq!(rank(&[]), Ranking::default());
    }

    #[test]
    fn test_mixed_comparison_costs_and_ranking() {
        let costs = CostParams::default();
        let emissions = EmissionFactors::default();
        // Dense area: 10 m of pipe, 500 MWh, ten buildings
        let kpis = compute_kpis(
            &[hp_result("hp", 10, 500.0), dh_result("dh", 10.0, 500.0)],
            &costs,
            &emissions,
        );
        let (hp, dh) = (&kpis[0], &kpis[1]);

        // DH: capex 8 000, opex 1 600, biomass 35 000
        assert_eq!(dh.total_cost_eur, Some(44_600.0));
        // HP: capex 140 000, opex 28 000, 142 857 kWh electricity 50 000
        assert!((hp.total_cost_eur.unwrap() - 218_000.0).abs() < 0.01);

        let af = annuity_factor(0.04, 20);
        assert!((dh.lcoh_eur_per_mwh.unwrap() - 44_600.0 * af / 500.0).abs() < 0.01);
        assert!((hp.lcoh_eur_per_mwh.unwrap() - 218_000.0 * af / 500.0).abs() < 0.01);

        // 35 t biomass + 0.29 t pump electricity vs 41.43 t grid electricity
        assert_eq!(dh.co2_t_per_a, Some(35.29));
        assert_eq!(hp.co2_t_per_a, Some(41.43));

        let ranking = rank(&kpis);
        assert_eq!(ranking.cheapest.as_deref(), Some("dh"));
        assert_eq!(ranking.lowest_emissions.as_deref(), Some("dh"));
    }

    proptest! {
        #[test]
        fn prop_annuity_increases_with_rate(r in 0.0f64..0.2, dr in 0.001f64..0.1, n in 1u32..50) {
            prop_assert!(annuity_factor(r + dr, n) > annuity_factor(r, n));
        }

        #[test]
        fn prop_annuity_decreases_with_lifetime(r in 0.0f64..0.2, n in 1u32..50) {
            prop_assert!(annuity_factor(r, n + 1) < annuity_factor(r, n));
        }
    }
}
