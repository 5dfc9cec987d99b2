//! # District Heating Network
//!
//! Street-following dual-pipe network construction.
//!
//! Streets become a weighted graph (`StreetGraph`). The plant and every
//! building are snapped onto the nearest street segment, and one shortest
//! path tree rooted at the plant yields the supply mains. Return mains
//! mirror the supply mains in the opposite direction. Because all routes
//! come from a single tree, the supply network is itself a tree, which the
//! hydraulic model relies on.

mod dual_pipe;
mod street;

pub use dual_pipe::{
    Consumer, DualPipeNetwork, NetworkStats, PipeKind, PipeSegment, ServiceConnection,
    build_dual_pipe_network,
};
pub use street::{NodeId, ShortestPaths, Snap, StreetEdge, StreetGraph};

use crate::primitives::Point;
use crate::{HeatplanError, Result};
use serde::{Deserialize, Serialize};

/// Street centreline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Street {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub highway: Option<String>,
    pub coords: Vec<Point>,
}

/// Network construction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkParams {
    /// Longest link added to join disconnected street components (m).
    pub max_connectivity_link_m: f64,
    pub supply_temp_c: f64,
    pub return_temp_c: f64,
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self {
            max_connectivity_link_m: 100.0,
            supply_temp_c: 70.0,
            return_temp_c: 40.0,
        }
    }
}

/// Parse streets from a JSON array or a GeoJSON `FeatureCollection` of
/// (Multi)LineStrings.
pub fn load_streets(json: &str) -> Result<Vec<Street>> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    if value.is_array() {
        return Ok(serde_json::from_value(value)?);
    }
    let features = value
        .get("features")
        .and_then(|f| f.as_array())
        .ok_or_else(|| {
            HeatplanError::InvalidInput(
                "streets must be a JSON array or a GeoJSON FeatureCollection".to_string(),
            )
        })?;

    let mut streets = Vec::new();
    for feature in features {
        let props = feature.get("properties");
        let text = |key: &str| {
            props
                .and_then(|p| p.get(key))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };
        let Some(geometry) = feature.get("geometry") else {
            continue;
        };
        let coords = geometry.get("coordinates").cloned().unwrap_or_default();
        let lines: Vec<Vec<Point>> = match geometry.get("type").and_then(|t| t.as_str()) {
            Some("LineString") => vec![serde_json::from_value(coords)?],
            Some("MultiLineString") => serde_json::from_value(coords)?,
            _ => continue,
        };
        for line in lines {
            streets.push(Street {
                name: text("name"),
                highway: text("highway"),
                coords: line,
            });
        }
    }
    Ok(streets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_streets_array() {
        let streets =
            load_streets(r#"[{"name": "Hauptstr", "coords": [[0,0],[100,0]]}]"#).unwrap();
        assert_eq!(streets.len(), 1);
        assert_eq!(streets[0].coords[1], Point::new(100.0, 0.0));
    }

    #[test]
    fn test_load_streets_geojson() {
        let json = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"name": "A", "highway": "residential"},
             "geometry": {"type": "LineString", "coordinates": [[0,0],[10,0]]}},
            {"type": "Feature", "properties": {},
             "geometry": {"type": "MultiLineString", "coordinates": [[[0,0],[0,5]], [[0,5],[5,5]]]}},
            {"type": "Feature", "properties": {},
             "geometry": {"type": "Point", "coordinates": [1,1]}}
        ]}"#;
        let streets = load_streets(json).unwrap();
        assert_eq!(streets.len(), 3);
        assert_eq!(streets[0].highway.as_deref(), Some("residential"));
        assert!(streets[1].name.is_none());
    }

    #[test]
    fn test_load_streets_rejects_object() {
        assert!(load_streets(r#"{"a": 1}"#).is_err());
    }
}
