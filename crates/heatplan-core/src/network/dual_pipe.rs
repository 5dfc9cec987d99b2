//! Dual-pipe (supply + return) network along streets.

use super::street::{NodeId, StreetGraph};
use super::{NetworkParams, Street};
use crate::building::Building;
use crate::demand::BuildingDemand;
use crate::primitives::{BuildingId, Point};
use crate::{HeatplanError, Result, round_to};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A building to be connected, reduced to what routing needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consumer {
    pub building_id: BuildingId,
    pub position: Point,
    pub design_load_kw: f64,
    pub annual_demand_kwh: f64,
}

impl Consumer {
    /// Consumer at the building centroid. `None` without a footprint.
    #[must_use]
    pub fn from_demand(building: &Building, demand: &BuildingDemand) -> Option<Self> {
        Some(Self {
            building_id: building.id.clone(),
            position: building.centroid()?,
            design_load_kw: demand.design_load_kw,
            annual_demand_kwh: demand.annual_demand_kwh,
        })
    }
}

/// Pipe role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipeKind {
    Supply,
    Return,
    SupplyService,
    ReturnService,
}

/// Main pipe segment between two street nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipeSegment {
    /// Upstream node in flow direction.
    pub from: NodeId,
    pub to: NodeId,
    pub start: Point,
    pub end: Point,
    pub length_m: f64,
    pub street_name: Option<String>,
    pub kind: PipeKind,
    pub temperature_c: f64,
    /// Buildings whose route uses this segment.
    pub buildings_served: Vec<BuildingId>,
}

/// Service pipe between a building and its street connection node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConnection {
    pub building_id: BuildingId,
    pub building_point: Point,
    pub connection_point: Point,
    pub node: NodeId,
    pub length_m: f64,
    pub street_name: Option<String>,
    pub kind: PipeKind,
    pub temperature_c: f64,
    pub design_load_kw: f64,
    pub annual_demand_kwh: f64,
}

/// Routed dual-pipe network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DualPipeNetwork {
    pub plant: Point,
    pub plant_node: NodeId,
    pub plant_snap_distance_m: f64,
    pub supply: Vec<PipeSegment>,
    pub returns: Vec<PipeSegment>,
    /// Two per routed building: supply service then return service.
    pub services: Vec<ServiceConnection>,
    /// Buildings without a street route from the plant.
    pub unrouted: Vec<BuildingId>,
    /// Whether the street graph was fully connected after link repair.
    pub street_graph_connected: bool,
    pub params: NetworkParams,
}

/// Summary figures of a dual-pipe network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub total_supply_length_km: f64,
    pub total_return_length_km: f64,
    pub total_main_length_km: f64,
    pub unique_supply_segments: usize,
    pub unique_return_segments: usize,
    pub supply_service_length_m: f64,
    pub return_service_length_m: f64,
    pub total_service_length_m: f64,
    pub avg_service_length_m: f64,
    pub max_service_length_m: f64,
    pub service_connections: usize,
    pub num_buildings: usize,
    pub unrouted_buildings: usize,
    pub total_heat_demand_kw: f64,
    pub total_heat_demand_mwh: f64,
    pub network_density_km_per_building: f64,
    pub total_pipe_length_km: f64,
    pub supply_temperature_c: f64,
    pub return_temperature_c: f64,
}

/// Snap plant and consumers, route every consumer from the plant and emit
/// supply, return and service pipes.
pub fn build_dual_pipe_network(
    streets: &[Street],
    plant: Point,
    consumers: &[Consumer],
    params: &NetworkParams,
) -> Result<DualPipeNetwork> {
    let mut graph = StreetGraph::from_streets(streets);
    if graph.edge_count() == 0 {
        return Err(HeatplanError::Network("street network has no segments".to_string()));
    }
    let street_graph_connected = graph.ensure_connectivity(params.max_connectivity_link_m);

    let plant_snap = graph
        .snap(&plant)
        .ok_or_else(|| HeatplanError::Network("cannot snap plant to streets".to_string()))?;

    let mut snapped = Vec::with_capacity(consumers.len());
    for consumer in consumers {
        let snap = graph.snap(&consumer.position).ok_or_else(|| {
            HeatplanError::Network(format!("cannot snap building {}", consumer.building_id))
        })?;
        snapped.push((consumer, snap));
    }

    let tree = graph.shortest_paths(plant_snap.node);
    let mut supply: BTreeMap<(NodeId, NodeId), PipeSegment> = BTreeMap::new();
    let mut services = Vec::new();
    let mut unrouted = Vec::new();

    for (consumer, snap) in &snapped {
        let Some(path) = tree.path_to(snap.node) else {
            unrouted.push(consumer.building_id.clone());
            continue;
        };
        for pair in path.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let Some(edge) = graph.edge(a, b) else {
                continue;
            };
            let segment = supply.entry((a, b)).or_insert_with(|| PipeSegment {
                from: a,
                to: b,
                start: graph.point(a).unwrap_or_default(),
                end: graph.point(b).unwrap_or_default(),
                length_m: edge.length_m,
                street_name: edge.street_name.clone(),
                kind: PipeKind::Supply,
                temperature_c: params.supply_temp_c,
                buildings_served: Vec::new(),
            });
            segment.buildings_served.push(consumer.building_id.clone());
        }

        let street_name = connection_street(&graph, snap.node);
        for (kind, temperature_c) in [
            (PipeKind::SupplyService, params.supply_temp_c),
            (PipeKind::ReturnService, params.return_temp_c),
        ] {
            services.push(ServiceConnection {
                building_id: consumer.building_id.clone(),
                building_point: consumer.position,
                connection_point: snap.point,
                node: snap.node,
                length_m: snap.distance_m,
                street_name: street_name.clone(),
                kind,
                temperature_c,
                design_load_kw: consumer.design_load_kw,
                annual_demand_kwh: consumer.annual_demand_kwh,
            });
        }
    }

    let supply: Vec<PipeSegment> = supply.into_values().collect();
    let mut returns: Vec<PipeSegment> = supply
        .iter()
        .map(|s| PipeSegment {
            from: s.to,
            to: s.from,
            start: s.end,
            end: s.start,
            kind: PipeKind::Return,
            temperature_c: params.return_temp_c,
            ..s.clone()
        })
        .collect();
    returns.sort_by_key(|s| (s.from, s.to));

    Ok(DualPipeNetwork {
        plant,
        plant_node: plant_snap.node,
        plant_snap_distance_m: plant_snap.distance_m,
        supply,
        returns,
        services,
        unrouted,
        street_graph_connected,
        params: *params,
    })
}

/// Street name of any edge at the node, lowest neighbour first.
fn connection_street(graph: &StreetGraph, node: NodeId) -> Option<String> {
    graph
        .edges()
        .filter(|(a, b, _)| *a == node || *b == node)
        .find_map(|(_, _, e)| e.street_name.clone())
}

impl DualPipeNetwork {
    /// Supply service connections, one per routed building.
    pub fn routed(&self) -> impl Iterator<Item = &ServiceConnection> {
        self.services
            .iter()
            .filter(|s| s.kind == PipeKind::SupplyService)
    }

    /// Main pipe length, supply plus return (m).
    #[must_use]
    pub fn main_length_m(&self) -> f64 {
        self.supply
            .iter()
            .chain(&self.returns)
            .map(|s| s.length_m)
            .sum()
    }

    /// Main plus service pipe length (m).
    #[must_use]
    pub fn total_pipe_length_m(&self) -> f64 {
        self.main_length_m() + self.services.iter().map(|s| s.length_m).sum::<f64>()
    }

    #[must_use]
    pub fn statistics(&self) -> NetworkStats {
        let supply_m: f64 = self.supply.iter().map(|s| s.length_m).sum();
        let return_m: f64 = self.returns.iter().map(|s| s.length_m).sum();
        let service_sum = |kind: PipeKind| -> f64 {
            self.services
                .iter()
                .filter(|s| s.kind == kind)
                .map(|s| s.length_m)
                .sum()
        };
        let supply_service_length_m = service_sum(PipeKind::SupplyService);
        let return_service_length_m = service_sum(PipeKind::ReturnService);
        let total_service_length_m = supply_service_length_m + return_service_length_m;

        let routed: Vec<&ServiceConnection> = self.routed().collect();
        let num_buildings = routed.len();
        let avg_service_length_m = if num_buildings > 0 {
            supply_service_length_m / num_buildings as f64
        } else {
            0.0
        };
        let max_service_length_m = routed.iter().map(|s| s.length_m).fold(0.0, f64::max);
        let total_heat_demand_kw: f64 = routed.iter().map(|s| s.design_load_kw).sum();
        let total_heat_demand_mwh: f64 =
            routed.iter().map(|s| s.annual_demand_kwh).sum::<f64>() / 1000.0;

        let total_main_length_km = (supply_m + return_m) / 1000.0;
        NetworkStats {
            total_supply_length_km: round_to(supply_m / 1000.0, 3),
            total_return_length_km: round_to(return_m / 1000.0, 3),
            total_main_length_km: round_to(total_main_length_km, 3),
            unique_supply_segments: self.supply.len(),
            unique_return_segments: self.returns.len(),
            supply_service_length_m: round_to(supply_service_length_m, 2),
            return_service_length_m: round_to(return_service_length_m, 2),
            total_service_length_m: round_to(total_service_length_m, 2),
            avg_service_length_m: round_to(avg_service_length_m, 2),
            max_service_length_m: round_to(max_service_length_m, 2),
            service_connections: self.services.len(),
            num_buildings,
            unrouted_buildings: self.unrouted.len(),
            total_heat_demand_kw: round_to(total_heat_demand_kw, 2),
            total_heat_demand_mwh: round_to(total_heat_demand_mwh, 2),
            network_density_km_per_building: if num_buildings > 0 {
                round_to(total_main_length_km / num_buildings as f64, 4)
            } else {
                0.0
            },
            total_pipe_length_km: round_to(
                total_main_length_km + total_service_length_m / 1000.0,
                3,
            ),
            supply_temperature_c: self.params.supply_temp_c,
            return_temperature_c: self.params.return_temp_c,
        }
    }
}
