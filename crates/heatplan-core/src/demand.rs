//! # Heat Demand
//!
//! Simplified transmission-loss model (DIN EN 12831 style) for the design
//! heating load and a degree-day estimate of the annual heat demand.

use crate::building::{
    Building, Envelope, RenovationState, UValues, assign_renovation_state, compute_envelope,
};
use crate::primitives::BuildingId;
use serde::{Deserialize, Serialize};

/// Demand model parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemandParams {
    pub indoor_temp_c: f64,
    pub design_outdoor_temp_c: f64,
    pub heating_degree_days: f64,
    pub system_efficiency: f64,
    /// Window share of the wall area when no window area is given.
    pub window_share: f64,
    pub safety_factor: f64,
    pub min_design_load_kw: f64,
    pub min_annual_demand_kwh: f64,
}

impl Default for DemandParams {
    fn default() -> Self {
        Self {
            indoor_temp_c: 20.0,
            design_outdoor_temp_c: -12.0,
            heating_degree_days: 3000.0,
            system_efficiency: 0.85,
            window_share: 0.2,
            safety_factor: 1.1,
            min_design_load_kw: 2.0,
            min_annual_demand_kwh: 5000.0,
        }
    }
}

/// Demand figures for one building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingDemand {
    pub building_id: BuildingId,
    pub renovation_state: RenovationState,
    pub u_values: UValues,
    pub envelope: Envelope,
    /// UA in W/K.
    pub heat_loss_coefficient_w_k: f64,
    pub design_load_kw: f64,
    pub annual_demand_kwh: f64,
}

impl BuildingDemand {
    /// Scale load and annual demand, e.g. by a scenario demand factor.
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            design_load_kw: self.design_load_kw * factor,
            annual_demand_kwh: self.annual_demand_kwh * factor,
            ..self.clone()
        }
    }
}

/// UA = U_wall·(A_wall − A_win) + U_roof·A_roof + U_floor·A_floor + U_win·A_win (W/K).
#[must_use]
pub fn heat_loss_coefficient(
    envelope: &Envelope,
    u: &UValues,
    window_area_m2: Option<f64>,
    params: &DemandParams,
) -> f64 {
    let window = window_area_m2.unwrap_or(envelope.wall_area_m2 * params.window_share);
    u.wall * (envelope.wall_area_m2 - window)
        + u.roof * envelope.roof_area_m2
        + u.floor * envelope.floor_area_m2
        + u.window * window
}

/// Design heating load in kW, never below the configured minimum.
#[must_use]
pub fn design_heating_load_kw(ua_w_k: f64, params: &DemandParams) -> f64 {
    let delta_t = params.indoor_temp_c - params.design_outdoor_temp_c;
    (ua_w_k * delta_t / 1000.0 * params.safety_factor).max(params.min_design_load_kw)
}

/// Annual heat demand in kWh, never below the configured minimum.
#[must_use]
pub fn annual_heat_demand_kwh(ua_w_k: f64, params: &DemandParams) -> f64 {
    let useful = ua_w_k * params.heating_degree_days * 24.0 / 1000.0;
    (useful / params.system_efficiency).max(params.min_annual_demand_kwh)
}

/// Full demand calculation for one building.
#[must_use]
pub fn calculate_demand(building: &Building, params: &DemandParams) -> BuildingDemand {
    let renovation_state = assign_renovation_state(building);
    let u_values = UValues::for_state(renovation_state);
    let envelope = compute_envelope(building);
    let ua = heat_loss_coefficient(&envelope, &u_values, building.window_area_m2, params);
    BuildingDemand {
        building_id: building.id.clone(),
        renovation_state,
        u_values,
        envelope,
        heat_loss_coefficient_w_k: ua,
        design_load_kw: design_heating_load_kw(ua, params),
        annual_demand_kwh: annual_heat_demand_kwh(ua, params),
    }
}

/// Demand for every building, in input order.
#[must_use]
pub fn calculate_all(buildings: &[Building], params: &DemandParams) -> Vec<BuildingDemand> {
    buildings
        .iter()
        .map(|b| calculate_demand(b, params))
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
