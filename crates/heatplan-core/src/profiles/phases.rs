//! Phase summaries and consumption statistics.

use super::{LoadProfile, ProfileAssignment, ProfileKind};
use crate::building::Building;
use crate::calendar::{Season, day_type, phase_key, phase_of};
use crate::primitives::BuildingId;
use crate::round_to;
use chrono::Timelike;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mean load (kW) per `{season}_{day type}_{phase}` key.
pub type PhaseSummary = BTreeMap<String, f64>;

/// Average the profile per phase key. Only keys with data are present.
#[must_use]
pub fn summarize_phases(profile: &LoadProfile) -> PhaseSummary {
    let mut acc: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for (ts, kw) in profile.iter() {
        let date = ts.date();
        let key = phase_key(Season::of(date), day_type(date), phase_of(ts.hour()));
        let entry = acc.entry(key).or_insert((0.0, 0));
        entry.0 += kw;
        entry.1 += 1;
    }
    acc.into_iter()
        .map(|(k, (sum, n))| (k, round_to(sum / n as f64, 4)))
        .collect()
}

/// Per-building consumption overview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionStats {
    pub building_id: BuildingId,
    pub function: Option<String>,
    pub code: Option<u32>,
    pub kind: ProfileKind,
    pub floor_area_m2: f64,
    pub yearly_consumption_kwh: f64,
    /// `None` when the floor area is zero.
    pub specific_consumption_kwh_m2: Option<f64>,
    /// Cadastral parts other than the building itself.
    pub parts: Vec<BuildingId>,
}

#[must_use]
pub fn consumption_statistics(
    building: &Building,
    assignment: &ProfileAssignment,
) -> ConsumptionStats {
    let floor_area_m2 = building.usable_area_m2();
    let yearly = assignment.yearly_kwh();
    ConsumptionStats {
        building_id: building.id.clone(),
        function: building.function.clone(),
        code: building.code,
        kind: assignment.kind,
        floor_area_m2,
        yearly_consumption_kwh: yearly,
        specific_consumption_kwh_m2: (floor_area_m2 > 0.0).then(|| round_to(yearly / floor_area_m2, 2)),
        parts: building
            .parts
            .iter()
            .filter(|p| **p != building.id)
            .cloned()
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::DEFAULT_PHASE_KEY;
    use crate::primitives::Point;
    use chrono::NaiveDate;

    fn profile(days: usize, value: f64) -> LoadProfile {
        LoadProfile {
            building_id: BuildingId::from("B"),
            kind: ProfileKind::G0,
            // Monday
            start: NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            values_kw: vec![value; days * 96],
        }
    }

    #[test]
    fn test_constant_profile_summary() {
        let summary = summarize_phases(&profile(1, 0.123_456));
        assert_eq!(summary.len(), 5);
        assert_eq!(summary[DEFAULT_PHASE_KEY], 0.1235);
        assert!(summary.contains_key("winter_werktag_nachtphase"));
        assert!(!summary.contains_key("winter_samstag_nachtphase"));
    }

    #[test]
    fn test_phase_means_follow_hours() {
        let mut p = profile(1, 0.0);
        // 17:00–23:00 → slots 68..92
        for v in &mut p.values_kw[68..92] {
            *v = 2.0;
        }
        let summary = summarize_phases(&p);
        assert_eq!(summary["winter_werktag_abendspitze"], 2.0);
        assert_eq!(summary["winter_werktag_nachmittag"], 0.0);
    }

    #[test]
    fn test_consumption_statistics() {
        let mut b = Building::new(
            "B",
            vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0),
                Point::new(0.0, 10.0),
            ],
        );
        b.parts = vec![BuildingId::from("B"), BuildingId::from("B-2")];
        let a = ProfileAssignment {
            building_id: b.id.clone(),
            kind: ProfileKind::G0,
            household_kwh: 0.0,
            commercial_kwh: 7393.0,
        };
        let stats = consumption_statistics(&b, &a);
        assert_eq!(stats.specific_consumption_kwh_m2, Some(73.93));
        assert_eq!(stats.parts, vec![BuildingId::from("B-2")]);
    }
}
