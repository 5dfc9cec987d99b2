//! # Load Profiles
//!
//! Electricity load profiles per building from BDEW standard load profiles.
//!
//! Pipeline:
//! 1. `classify` picks a profile kind from the building code
//! 2. `yearly_consumption` estimates kWh/a from households or floor area
//! 3. `generate` scales the normalised quarter-hour curves of a
//!    [`ProfileLibrary`] to that consumption
//! 4. `summarize_phases` / `validate` condense and check the result
//!
//! Household profiles are consumed by the grid assessment as the base load
//! on top of which heat pumps are added.

mod generator;
mod library;
mod phases;
mod validate;

pub use generator::{LoadProfile, ProfileBatch, ProfileFailure, generate, generate_all};
pub use library::ProfileLibrary;
pub use phases::{ConsumptionStats, PhaseSummary, consumption_statistics, summarize_phases};
pub use validate::{MAX_YEARLY_DEVIATION, ProfileValidation, validate};

use crate::building::Building;
use crate::primitives::BuildingId;
use crate::{HeatplanError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Building codes that never receive a load profile (garages, sheds, ...).
pub const EXCLUDED_CODES: [u32; 6] = [2523, 2580, 2520, 9998, 1610, 1290];

/// Residential buildings with commercial use on the ground floor.
pub const MIXED_CODES: [u32; 2] = [1120, 1130];

/// Agricultural building codes.
pub const AGRICULTURAL_CODES: [u32; 3] = [2720, 2724, 2740];

/// Pumping station code.
pub const PUMPING_STATION_CODE: u32 = 2512;

/// Fixed consumption of a pumping station (kWh/a).
pub const PUMPING_STATION_KWH: f64 = 45_000.0;

/// Share of a mixed building's area used commercially.
pub const MIXED_COMMERCIAL_SHARE: f64 = 0.5;

// =============================================================================
// PROFILE KIND
// =============================================================================

/// Standard load profile kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProfileKind {
    /// Household
    H0,
    /// Commercial, general
    G0,
    /// Commercial, weekdays 8–18
    G1,
    /// Commercial, evening consumption
    G2,
    /// Commercial, continuous
    G3,
    /// Shops, hairdressers
    G4,
    /// Bakeries
    G5,
    /// Weekend operation
    G6,
    /// Agriculture
    L0,
    /// Household with commercial share (H0 + G0)
    Mixed,
}

impl ProfileKind {
    /// Kinds with their own curve in a profile library.
    pub const LIBRARY_KINDS: [ProfileKind; 9] = [
        ProfileKind::H0,
        ProfileKind::G0,
        ProfileKind::G1,
        ProfileKind::G2,
        ProfileKind::G3,
        ProfileKind::G4,
        ProfileKind::G5,
        ProfileKind::G6,
        ProfileKind::L0,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::H0 => "H0",
            Self::G0 => "G0",
            Self::G1 => "G1",
            Self::G2 => "G2",
            Self::G3 => "G3",
            Self::G4 => "G4",
            Self::G5 => "G5",
            Self::G6 => "G6",
            Self::L0 => "L0",
            Self::Mixed => "Mixed",
        }
    }

    /// Specific consumption for area-based commercial kinds (kWh/m²a).
    #[must_use]
    pub fn specific_consumption(&self) -> Option<f64> {
        match self {
            Self::G0 => Some(73.93),
            Self::G1 => Some(85.0),
            Self::G2 => Some(120.0),
            Self::G3 => Some(180.0),
            Self::G4 => Some(95.0),
            Self::G5 => Some(350.0),
            Self::G6 => Some(250.0),
            _ => None,
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileKind {
    type Err = HeatplanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "H0" => Ok(Self::H0),
            "G0" => Ok(Self::G0),
            "G1" => Ok(Self::G1),
            "G2" => Ok(Self::G2),
            "G3" => Ok(Self::G3),
            "G4" => Ok(Self::G4),
            "G5" => Ok(Self::G5),
            "G6" => Ok(Self::G6),
            "L0" => Ok(Self::L0),
            "MIXED" | "H0G0" | "H0/G0" => Ok(Self::Mixed),
            other => Err(HeatplanError::Profile(format!("unknown profile kind '{other}'"))),
        }
    }
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Code → kind table plus per-building overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileClassifier {
    pub code_kinds: BTreeMap<u32, ProfileKind>,
    pub overrides: BTreeMap<BuildingId, ProfileKind>,
}

/// Profile kind for a building, or `None` when the building is not profiled.
///
/// Overrides win. Then excluded codes, mixed, agricultural and pumping
/// station codes, the configured table, and finally H0 for `1xxx` codes
/// (or buildings without code but with households) and G0 otherwise.
#[must_use]
pub fn classify(building: &Building, classifier: &ProfileClassifier) -> Option<ProfileKind> {
    if let Some(kind) = classifier.overrides.get(&building.id) {
        return Some(*kind);
    }
    let Some(code) = building.code else {
        return Some(if building.households.is_empty() {
            ProfileKind::G0
        } else {
            ProfileKind::H0
        });
    };
    if EXCLUDED_CODES.contains(&code) {
        return None;
    }
    if MIXED_CODES.contains(&code) {
        return Some(ProfileKind::Mixed);
    }
    if AGRICULTURAL_CODES.contains(&code) {
        return Some(ProfileKind::L0);
    }
    if code == PUMPING_STATION_CODE {
        return Some(ProfileKind::G3);
    }
    if let Some(kind) = classifier.code_kinds.get(&code) {
        return Some(*kind);
    }
    Some(if (1000..2000).contains(&code) {
        ProfileKind::H0
    } else {
        ProfileKind::G0
    })
}

// =============================================================================
// YEARLY CONSUMPTION
// =============================================================================

/// Kind and yearly consumption split into household and commercial parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileAssignment {
    pub building_id: BuildingId,
    pub kind: ProfileKind,
    /// Scaled with the H0 curve and the dynamisation factor.
    pub household_kwh: f64,
    /// Scaled with the commercial curve of `kind` (G0 for mixed).
    pub commercial_kwh: f64,
}

impl ProfileAssignment {
    #[must_use]
    pub fn yearly_kwh(&self) -> f64 {
        self.household_kwh + self.commercial_kwh
    }

    /// Library curve used for the commercial share.
    #[must_use]
    pub fn commercial_curve(&self) -> ProfileKind {
        match self.kind {
            ProfileKind::Mixed | ProfileKind::H0 => ProfileKind::G0,
            other => other,
        }
    }
}

/// Yearly consumption of one household by resident count (kWh/a).
#[must_use]
pub fn household_consumption(residents: u32) -> f64 {
    match residents {
        0 | 1 => 1900.0,
        2 => 2890.0,
        3 => 3720.0,
        4 => 4085.0,
        n => 5430.0 + 1020.0 * f64::from(n - 5),
    }
}

/// Specific consumption of agricultural codes (kWh/m²a).
#[must_use]
pub fn agricultural_specific_consumption(code: Option<u32>) -> f64 {
    match code {
        Some(2724) => 85.0,
        Some(2740) => 120.0,
        _ => 65.0,
    }
}

fn households_kwh(building: &Building) -> Result<f64> {
    if building.households.is_empty() {
        return Err(HeatplanError::MissingData(format!(
            "no household data for building {}",
            building.id
        )));
    }
    Ok(building
        .households
        .iter()
        .map(|h| household_consumption(h.residents))
        .sum())
}

fn area(building: &Building) -> Result<f64> {
    let area = building.usable_area_m2();
    if area <= 0.0 {
        return Err(HeatplanError::MissingData(format!(
            "no usable floor area for building {}",
            building.id
        )));
    }
    Ok(area)
}

/// Estimate the yearly consumption for a classified building.
pub fn yearly_consumption(building: &Building, kind: ProfileKind) -> Result<ProfileAssignment> {
    let (household_kwh, commercial_kwh) = if building.code == Some(PUMPING_STATION_CODE) {
        (0.0, PUMPING_STATION_KWH)
    } else {
        match kind {
            ProfileKind::H0 => (households_kwh(building)?, 0.0),
            ProfileKind::Mixed => (
                households_kwh(building)?,
                area(building)? * MIXED_COMMERCIAL_SHARE * 73.93,
            ),
            ProfileKind::L0 => (
                0.0,
                area(building)? * agricultural_specific_consumption(building.code),
            ),
            other => {
                let specific = other.specific_consumption().ok_or_else(|| {
                    HeatplanError::Profile(format!("no specific consumption for {other}"))
                })?;
                (0.0, area(building)? * specific)
            }
        }
    };
    Ok(ProfileAssignment {
        building_id: building.id.clone(),
        kind,
        household_kwh,
        commercial_kwh,
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::building::Household;
    use crate::primitives::Point;

    fn building(code: Option<u32>) -> Building {
        let mut b = Building::new(
            "B",
            vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0),
                Point::new(0.0, 10.0),
            ],
        );
        b.code = code;
        b
    }

    #[test]
    fn test_household_table() {
        assert_eq!(household_consumption(1), 1900.0);
        assert_eq!(household_consumption(4), 4085.0);
        assert_eq!(household_consumption(5), 5430.0);
        assert_eq!(household_consumption(7), 5430.0 + 2040.0);
    }

    #[test]
    fn test_classification_rules() {
        let c = ProfileClassifier::default();
        assert_eq!(classify(&building(Some(2523)), &c), None);
        assert_eq!(classify(&building(Some(1120)), &c), Some(ProfileKind::Mixed));
        assert_eq!(classify(&building(Some(2724)), &c), Some(ProfileKind::L0));
        assert_eq!(classify(&building(Some(2512)), &c), Some(ProfileKind::G3));
        assert_eq!(classify(&building(Some(1010)), &c), Some(ProfileKind::H0));
        assert_eq!(classify(&building(Some(2050)), &c), Some(ProfileKind::G0));
        assert_eq!(classify(&building(None), &c), Some(ProfileKind::G0));
    }

    #[test]
    fn test_classifier_table_and_overrides() {
        let mut c = ProfileClassifier::default();
        c.code_kinds.insert(2050, ProfileKind::G4);
        let b = building(Some(2050));
        assert_eq!(classify(&b, &c), Some(ProfileKind::G4));
        c.overrides.insert(b.id.clone(), ProfileKind::G5);
        assert_eq!(classify(&b, &c), Some(ProfileKind::G5));
    }

    #[test]
    fn test_yearly_consumption_kinds() {
        let mut b = building(Some(1010));
        assert!(yearly_consumption(&b, ProfileKind::H0).is_err());
        b.households = vec![Household { residents: 2 }, Household { residents: 3 }];
        let a = yearly_consumption(&b, ProfileKind::H0).unwrap();
        assert_eq!(a.yearly_kwh(), 2890.0 + 3720.0);

        let g = yearly_consumption(&b, ProfileKind::G2).unwrap();
        assert_eq!(g.commercial_kwh, 100.0 * 120.0);

        let m = yearly_consumption(&b, ProfileKind::Mixed).unwrap();
        assert_eq!(m.household_kwh, 6610.0);
        assert!((m.commercial_kwh - 100.0 * 0.5 * 73.93).abs() < 1e-9);
        assert_eq!(m.commercial_curve(), ProfileKind::G0);

        b.code = Some(2740);
        let l = yearly_consumption(&b, ProfileKind::L0).unwrap();
        assert_eq!(l.commercial_kwh, 12_000.0);
    }

    #[test]
    fn test_pumping_station_fixed() {
        let b = building(Some(PUMPING_STATION_CODE));
        let a = yearly_consumption(&b, ProfileKind::G3).unwrap();
        assert_eq!(a.yearly_kwh(), PUMPING_STATION_KWH);
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("g3".parse::<ProfileKind>().unwrap(), ProfileKind::G3);
        assert_eq!("h0g0".parse::<ProfileKind>().unwrap(), ProfileKind::Mixed);
        assert!("Z9".parse::<ProfileKind>().is_err());
    }
}
