//! # Building Model
//!
//! Cadastral buildings, household distributions, renovation state and the
//! thermal envelope derived from the footprint.
//!
//! Input accepts both English field names and the German cadastral column
//! names (`GebaeudeID`, `Baujahr`, ...). Buildings can be given as a plain
//! JSON array or as a GeoJSON `FeatureCollection` with polygon geometries.

use crate::primitives::{BuildingId, Point, polygon_area, polygon_centroid, polygon_perimeter};
use crate::{HeatplanError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Storey height used when only the storey count is known (m).
pub const STOREY_HEIGHT_M: f64 = 2.6;

/// Height used when neither height nor storeys are known (m).
pub const DEFAULT_HEIGHT_M: f64 = 6.0;

/// Construction year from which a building counts as renovated.
pub const RENOVATED_FROM_YEAR: i32 = 2010;

/// Construction year from which a building counts as partially renovated.
pub const PARTIALLY_RENOVATED_FROM_YEAR: i32 = 1995;

// =============================================================================
// TYPES
// =============================================================================

/// One household living in a building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Household {
    #[serde(alias = "einwohner", alias = "Einwohner")]
    pub residents: u32,
}

/// Household distributions keyed by building id.
pub type HouseholdData = BTreeMap<BuildingId, Vec<Household>>;

/// A building as read from the cadastral extract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    #[serde(alias = "GebaeudeID")]
    pub id: BuildingId,
    #[serde(default, alias = "Gebaeudefunktion")]
    pub function: Option<String>,
    #[serde(default, alias = "Gebaeudecode", deserialize_with = "de_code")]
    pub code: Option<u32>,
    /// Footprint ring in metres. Open or closed.
    #[serde(default)]
    pub footprint: Vec<Point>,
    #[serde(default, alias = "Gebaeudehoehe")]
    pub height_m: Option<f64>,
    #[serde(default, alias = "Etagenzahl")]
    pub storeys: Option<u32>,
    #[serde(default, alias = "Baujahr")]
    pub construction_year: Option<i32>,
    #[serde(default, alias = "Sanierungszustand")]
    pub renovation_label: Option<String>,
    #[serde(default, alias = "Gesamtnettonutzflaeche")]
    pub net_floor_area_m2: Option<f64>,
    #[serde(default)]
    pub window_area_m2: Option<f64>,
    #[serde(default, alias = "Strasse")]
    pub street: Option<String>,
    /// Ids of cadastral parts merged into this building.
    #[serde(default, alias = "Gebaeudeteile")]
    pub parts: Vec<BuildingId>,
    #[serde(default, alias = "Haushaltsverteilung")]
    pub households: Vec<Household>,
}

/// Accepts building codes as numbers or numeric strings.
fn de_code<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum CodeRepr {
        Number(u32),
        Text(String),
    }

    match Option::<CodeRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(CodeRepr::Number(n)) => Ok(Some(n)),
        Some(CodeRepr::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(CodeRepr::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

impl Building {
    /// Minimal building with a footprint, used by tests and tooling.
    #[must_use]
    pub fn new(id: impl Into<String>, footprint: Vec<Point>) -> Self {
        Self {
            id: BuildingId::new(id),
            function: None,
            code: None,
            footprint,
            height_m: None,
            storeys: None,
            construction_year: None,
            renovation_label: None,
            net_floor_area_m2: None,
            window_area_m2: None,
            street: None,
            parts: Vec::new(),
            households: Vec::new(),
        }
    }

    /// Footprint area in m².
    #[must_use]
    pub fn footprint_area(&self) -> f64 {
        polygon_area(&self.footprint)
    }

    /// Footprint centroid, the point used for routing and proximity.
    #[must_use]
    pub fn centroid(&self) -> Option<Point> {
        polygon_centroid(&self.footprint)
    }

    /// Usable floor area: net floor area when known, else footprint × storeys.
    #[must_use]
    pub fn usable_area_m2(&self) -> f64 {
        match self.net_floor_area_m2 {
            Some(area) if area > 0.0 => area,
            _ => self.footprint_area() * f64::from(self.storeys.unwrap_or(1).max(1)),
        }
    }

    /// True when the footprint has at least three vertices and non-zero area.
    #[must_use]
    pub fn has_valid_footprint(&self) -> bool {
        self.footprint.len() >= 3 && self.footprint_area() > 0.0
    }
}

// =============================================================================
// RENOVATION STATE / U-VALUES
// =============================================================================

/// Thermal renovation state of a building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenovationState {
    Unrenovated,
    PartiallyRenovated,
    Renovated,
}

impl RenovationState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unrenovated => "unrenovated",
            Self::PartiallyRenovated => "partially_renovated",
            Self::Renovated => "renovated",
        }
    }
}

impl fmt::Display for RenovationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derive the renovation state from the explicit label, then the year.
///
/// Label matching is a case-insensitive substring test. `"teilsaniert"`
/// is checked before `"nicht"` so partial labels win over negations.
#[must_use]
pub fn assign_renovation_state(building: &Building) -> RenovationState {
    if let Some(label) = &building.renovation_label {
        let label = label.to_lowercase();
        if label.contains("voll") {
            return RenovationState::Renovated;
        }
        if label.contains("teil") {
            return RenovationState::PartiallyRenovated;
        }
        if label.contains("unrenoviert") || label.contains("nicht") {
            return RenovationState::Unrenovated;
        }
    }
    match building.construction_year {
        Some(year) if year >= RENOVATED_FROM_YEAR => RenovationState::Renovated,
        Some(year) if year >= PARTIALLY_RENOVATED_FROM_YEAR => RenovationState::PartiallyRenovated,
        _ => RenovationState::Unrenovated,
    }
}

/// Thermal transmittance per envelope element (W/m²K).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UValues {
    pub wall: f64,
    pub roof: f64,
    pub floor: f64,
    pub window: f64,
}

impl UValues {
    /// Typical values for a renovation state.
    #[must_use]
    pub const fn for_state(state: RenovationState) -> Self {
        match state {
            RenovationState::Unrenovated => Self {
                wall: 1.3,
                roof: 1.0,
                floor: 1.0,
                window: 2.8,
            },
            RenovationState::PartiallyRenovated => Self {
                wall: 0.7,
                roof: 0.3,
                floor: 0.4,
                window: 1.8,
            },
            RenovationState::Renovated => Self {
                wall: 0.3,
                roof: 0.2,
                floor: 0.25,
                window: 1.0,
            },
        }
    }
}

// =============================================================================
// ENVELOPE
// =============================================================================

/// Envelope geometry derived from the footprint. Flat roof assumed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub floor_area_m2: f64,
    pub perimeter_m: f64,
    pub height_m: f64,
    pub wall_area_m2: f64,
    pub roof_area_m2: f64,
    pub volume_m3: f64,
}

/// Compute envelope areas and volume for a building.
#[must_use]
pub fn compute_envelope(building: &Building) -> Envelope {
    let floor_area_m2 = building.footprint_area();
    let perimeter_m = polygon_perimeter(&building.footprint);
    let height_m = match (building.height_m, building.storeys) {
        (Some(h), _) if h > 0.0 => h,
        (_, Some(storeys)) => f64::from(storeys) * STOREY_HEIGHT_M,
        _ => DEFAULT_HEIGHT_M,
    };
    Envelope {
        floor_area_m2,
        perimeter_m,
        height_m,
        wall_area_m2: perimeter_m * height_m,
        roof_area_m2: floor_area_m2,
        volume_m3: floor_area_m2 * height_m,
    }
}

// =============================================================================
// LOADING
// =============================================================================

/// Buildings accepted from an input file plus the ids that were dropped.
#[derive(Debug, Clone, Default)]
pub struct LoadedBuildings {
    pub buildings: Vec<Building>,
    /// Buildings dropped for an empty or degenerate footprint.
    pub skipped: Vec<BuildingId>,
}

/// Parse buildings from a JSON array or a GeoJSON `FeatureCollection`.
///
/// Buildings whose footprint has fewer than three vertices or zero area are
/// reported in `skipped` rather than failing the whole load.
pub fn load_buildings(json: &str) -> Result<LoadedBuildings> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let raw: Vec<Building> = match value {
        serde_json::Value::Array(_) => serde_json::from_value(value)?,
        serde_json::Value::Object(ref map) if map.contains_key("features") => {
            parse_feature_collection(map)?
        }
        _ => {
            return Err(HeatplanError::InvalidInput(
                "buildings must be a JSON array or a GeoJSON FeatureCollection".to_string(),
            ));
        }
    };

    let mut loaded = LoadedBuildings::default();
    for building in raw {
        if building.has_valid_footprint() {
            loaded.buildings.push(building);
        } else {
            loaded.skipped.push(building.id);
        }
    }
    Ok(loaded)
}

fn parse_feature_collection(
    map: &serde_json::Map<String, serde_json::Value>,
) -> Result<Vec<Building>> {
    let features = map
        .get("features")
        .and_then(|f| f.as_array())
        .ok_or_else(|| HeatplanError::InvalidInput("features must be an array".to_string()))?;

    features
        .iter()
        .map(|feature| {
            let mut props = feature
                .get("properties")
                .and_then(|p| p.as_object())
                .cloned()
                .unwrap_or_default();
            let ring = feature.get("geometry").and_then(outer_ring);
            if let Some(ring) = ring {
                props.insert("footprint".to_string(), ring);
            }
            Ok(serde_json::from_value(serde_json::Value::Object(props))?)
        })
        .collect()
}

/// Outer ring of a Polygon, or of the first polygon of a MultiPolygon.
fn outer_ring(geometry: &serde_json::Value) -> Option<serde_json::Value> {
    let coords = geometry.get("coordinates")?;
    match geometry.get("type")?.as_str()? {
        "Polygon" => coords.get(0).cloned(),
        "MultiPolygon" => coords.get(0)?.get(0).cloned(),
        _ => None,
    }
}

/// Parse a household file: building id → list of households.
pub fn load_households(json: &str) -> Result<HouseholdData> {
    Ok(serde_json::from_str(json)?)
}

/// Attach household distributions to buildings that have none.
///
/// Returns the number of buildings that received households.
pub fn merge_households(buildings: &mut [Building], households: &HouseholdData) -> usize {
    let mut merged = 0;
    for building in buildings.iter_mut() {
        if !building.households.is_empty() {
            continue;
        }
        if let Some(list) = households.get(&building.id) {
            building.households = list.clone();
            merged += 1;
        }
    }
    merged
}

/// Subset buildings by id, keeping input order. An empty id list keeps all.
#[must_use]
pub fn filter_buildings(buildings: &[Building], ids: &[BuildingId]) -> Vec<Building> {
    if ids.is_empty() {
        return buildings.to_vec();
    }
    buildings
        .iter()
        .filter(|b| ids.contains(&b.id))
        .cloned()
        .collect()
}

/// Building ids of one street.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreetBuildings {
    pub street: String,
    pub building_ids: Vec<BuildingId>,
}

/// Buildings grouped by street, streets in name order. Buildings without a
/// street are left out.
#[must_use]
pub fn group_by_street(buildings: &[Building]) -> Vec<StreetBuildings> {
    let mut streets: BTreeMap<&str, Vec<BuildingId>> = BTreeMap::new();
    for building in buildings {
        if let Some(street) = building.street.as_deref().map(str::trim)
            && !street.is_empty()
        {
            streets.entry(street).or_default().push(building.id.clone());
        }
    }
    streets
        .into_iter()
        .map(|(street, building_ids)| StreetBuildings {
            street: street.to_string(),
            building_ids,
        })
        .collect()
}

/// Ids of the buildings on `street`, in input order.
#[must_use]
pub fn buildings_on_street(buildings: &[Building], street: &str) -> Vec<BuildingId> {
    let street = street.trim();
    buildings
        .iter()
        .filter(|b| b.street.as_deref().map(str::trim) == Some(street))
        .map(|b| b.id.clone())
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(id: &str, w: f64, h: f64) -> Building {
        Building::new(
            id,
            vec![
                Point::new(0.0, 0.0),
                Point::new(w, 0.0),
                Point::new(w, h),
                Point::new(0.0, h),
            ],
        )
    }

    #[test]
    fn test_renovation_label_takes_precedence() {
        let mut b = rect("b", 10.0, 10.0);
        b.construction_year = Some(1960);
        b.renovation_label = Some("Vollsaniert".to_string());
        assert_eq!(assign_renovation_state(&b), RenovationState::Renovated);

        b.renovation_label = Some("teilsaniert".to_string());
        assert_eq!(assign_renovation_state(&b), RenovationState::PartiallyRenovated);

        b.construction_year = Some(2020);
        b.renovation_label = Some("nicht saniert".to_string());
        assert_eq!(assign_renovation_state(&b), RenovationState::Unrenovated);
    }

    #[test]
    fn test_renovation_from_year() {
        let mut b = rect("b", 10.0, 10.0);
        assert_eq!(assign_renovation_state(&b), RenovationState::Unrenovated);
        b.construction_year = Some(2010);
        assert_eq!(assign_renovation_state(&b), RenovationState::Renovated);
        b.construction_year = Some(1995);
        assert_eq!(assign_renovation_state(&b), RenovationState::PartiallyRenovated);
        b.construction_year = Some(1994);
        assert_eq!(assign_renovation_state(&b), RenovationState::Unrenovated);
    }

    #[test]
    fn test_unknown_label_falls_back_to_year() {
        let mut b = rect("b", 10.0, 10.0);
        b.renovation_label = Some("unbekannt".to_string());
        b.construction_year = Some(2015);
        assert_eq!(assign_renovation_state(&b), RenovationState::Renovated);
    }

    #[test]
    fn test_envelope_height_rules() {
        let mut b = rect("b", 10.0, 5.0);
        let env = compute_envelope(&b);
        assert_eq!(env.height_m, DEFAULT_HEIGHT_M);
        assert_eq!(env.floor_area_m2, 50.0);
        assert_eq!(env.perimeter_m, 30.0);
        assert_eq!(env.wall_area_m2, 180.0);
        assert_eq!(env.roof_area_m2, 50.0);
        assert_eq!(env.volume_m3, 300.0);

        b.storeys = Some(3);
        assert!((compute_envelope(&b).height_m - 7.8).abs() < 1e-9);

        b.height_m = Some(9.5);
        assert_eq!(compute_envelope(&b).height_m, 9.5);
    }

    #[test]
    fn test_load_drops_degenerate_footprints() {
        let json = r#"[
            {"GebaeudeID": "A", "footprint": [[0,0],[10,0],[10,10],[0,10]], "Baujahr": 1980},
            {"id": "B", "footprint": [[0,0],[10,0]]},
            {"id": "C", "footprint": [[0,0],[1,1],[2,2]]},
            {"id": "D"}
        ]"#;
        let loaded = load_buildings(json).unwrap();
        assert_eq!(loaded.buildings.len(), 1);
        assert_eq!(loaded.buildings[0].id, BuildingId::from("A"));
        assert_eq!(loaded.buildings[0].construction_year, Some(1980));
        assert_eq!(loaded.skipped.len(), 3);
    }

    #[test]
    fn test_load_geojson_feature_collection() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"GebaeudeID": "X1", "Gebaeudecode": "1010", "Gebaeudefunktion": "Wohnhaus"},
                "geometry": {"type": "Polygon", "coordinates": [[[0,0],[8,0],[8,8],[0,8],[0,0]]]}
            }]
        }"#;
        let loaded = load_buildings(json).unwrap();
        assert_eq!(loaded.buildings.len(), 1);
        let b = &loaded.buildings[0];
        assert_eq!(b.code, Some(1010));
        assert_eq!(b.function.as_deref(), Some("Wohnhaus"));
        assert_eq!(b.footprint_area(), 64.0);
    }

    #[test]
    fn test_load_rejects_scalar_document() {
        assert!(load_buildings("42").is_err());
    }

    #[test]
    fn test_merge_and_filter() {
        let mut buildings = vec![rect("A", 5.0, 5.0), rect("B", 5.0, 5.0)];
        let households: HouseholdData =
            load_households(r#"{"A": [{"einwohner": 2}, {"residents": 1}]}"#).unwrap();
        assert_eq!(merge_households(&mut buildings, &households), 1);
        assert_eq!(buildings[0].households.len(), 2);
        assert!(buildings[1].households.is_empty());

        let subset = filter_buildings(&buildings, &[BuildingId::from("B")]);
        assert_eq!(subset.len(), 1);
        assert_eq!(filter_buildings(&buildings, &[]).len(), 2);
    }

    #[test]
    fn test_group_by_street() {
        let mut a = rect("A", 5.0, 5.0);
        a.street = Some("Lindenweg".to_string());
        let mut b = rect("B", 5.0, 5.0);
        b.street = Some("Am Markt".to_string());
        let mut c = rect("C", 5.0, 5.0);
        c.street = Some(" Lindenweg ".to_string());
        let d = rect("D", 5.0, 5.0);
        let buildings = vec![a, b, c, d];

        let streets = group_by_street(&buildings);
        let names: Vec<&str> = streets.iter().map(|s| s.street.as_str()).collect();
        assert_eq!(names, vec!["Am Markt", "Lindenweg"]);
        assert_eq!(
            streets[1].building_ids,
            vec![BuildingId::from("A"), BuildingId::from("C")]
        );

        assert_eq!(buildings_on_street(&buildings, "Am Markt"), vec![BuildingId::from("B")]);
        assert_eq!(buildings_on_street(&buildings, "Lindenweg").len(), 2);
        assert!(buildings_on_street(&buildings, "Nirgendwo").is_empty());
    }

    #[test]
    fn test_usable_area() {
        let mut b = rect("b", 10.0, 10.0);
        b.storeys = Some(2);
        assert_eq!(b.usable_area_m2(), 200.0);
        b.net_floor_area_m2 = Some(150.0);
        assert_eq!(b.usable_area_m2(), 150.0);
    }
}
