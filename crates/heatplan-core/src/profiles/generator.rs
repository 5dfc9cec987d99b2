//! Quarter-hour profile generation.

use super::{
    ProfileAssignment, ProfileClassifier, ProfileKind, ProfileLibrary, classify, yearly_consumption,
};
use crate::building::Building;
use crate::calendar::{day_type, days, h0_dynamic_factor, period};
use crate::primitives::{BuildingId, QUARTER_HOURS_PER_DAY, REFERENCE_CONSUMPTION_KWH};
use crate::{HeatplanError, Result};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// A quarter-hour load series starting at midnight of `start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadProfile {
    pub building_id: BuildingId,
    pub kind: ProfileKind,
    pub start: NaiveDate,
    pub values_kw: Vec<f64>,
}

impl LoadProfile {
    /// Timestamp of slot `index`.
    #[must_use]
    pub fn timestamp(&self, index: usize) -> NaiveDateTime {
        self.start.and_time(NaiveTime::MIN) + Duration::minutes(15 * index as i64)
    }

    /// `(timestamp, kW)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDateTime, f64)> + '_ {
        self.values_kw
            .iter()
            .enumerate()
            .map(|(i, v)| (self.timestamp(i), *v))
    }

    /// Energy over the series (kWh).
    #[must_use]
    pub fn energy_kwh(&self) -> f64 {
        self.values_kw.iter().sum::<f64>() * 0.25
    }

    #[must_use]
    pub fn peak_kw(&self) -> f64 {
        self.values_kw.iter().copied().fold(0.0, f64::max)
    }

    /// Mean over the slots whose hour satisfies `pred`.
    pub(crate) fn mean_where(&self, pred: impl Fn(u32) -> bool) -> Option<f64> {
        let (sum, n) = self
            .iter()
            .filter(|(t, _)| pred(t.hour()))
            .fold((0.0, 0usize), |(s, n), (_, v)| (s + v, n + 1));
        (n > 0).then(|| sum / n as f64)
    }
}

/// Generate the profile for one assignment over `[start, end]`.
///
/// value_kW = curve_W / 1000 · (kWh / 1000); the household share is
/// multiplied by the H0 dynamisation factor of the day.
pub fn generate(
    library: &ProfileLibrary,
    assignment: &ProfileAssignment,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<LoadProfile> {
    if end < start {
        return Err(HeatplanError::InvalidInput(format!(
            "profile end {end} is before start {start}"
        )));
    }
    let household_scale = assignment.household_kwh / REFERENCE_CONSUMPTION_KWH;
    let commercial_scale = assignment.commercial_kwh / REFERENCE_CONSUMPTION_KWH;
    let commercial_kind = assignment.commercial_curve();

    let mut values_kw = Vec::new();
    for date in days(start, end) {
        let (p, d) = (period(date), day_type(date));
        let dynamic = h0_dynamic_factor(date.ordinal());
        let household = if household_scale > 0.0 {
            Some(library.curve(ProfileKind::H0, p, d)?)
        } else {
            None
        };
        let commercial = if commercial_scale > 0.0 {
            Some(library.curve(commercial_kind, p, d)?)
        } else {
            None
        };
        for q in 0..QUARTER_HOURS_PER_DAY {
            let h = household.map_or(0.0, |c| c[q] / 1000.0 * household_scale * dynamic);
            let g = commercial.map_or(0.0, |c| c[q] / 1000.0 * commercial_scale);
            values_kw.push(h + g);
        }
    }

    Ok(LoadProfile {
        building_id: assignment.building_id.clone(),
        kind: assignment.kind,
        start,
        values_kw,
    })
}

/// A building that could not be profiled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileFailure {
    pub building_id: BuildingId,
    pub error: String,
}

/// Outcome of profiling a building set.
#[derive(Debug, Clone, Default)]
pub struct ProfileBatch {
    pub profiles: Vec<(ProfileAssignment, LoadProfile)>,
    /// Buildings whose code is excluded from profiling.
    pub excluded: Vec<BuildingId>,
    pub failures: Vec<ProfileFailure>,
}

/// Classify, estimate and generate for every building. Failures are collected.
pub fn generate_all(
    library: &ProfileLibrary,
    classifier: &ProfileClassifier,
    buildings: &[Building],
    start: NaiveDate,
    end: NaiveDate,
) -> ProfileBatch {
    let mut batch = ProfileBatch::default();
    for building in buildings {
        let Some(kind) = classify(building, classifier) else {
            batch.excluded.push(building.id.clone());
            continue;
        };
        let outcome = yearly_consumption(building, kind)
            .and_then(|a| generate(library, &a, start, end).map(|p| (a, p)));
        match outcome {
            Ok(pair) => batch.profiles.push(pair),
            Err(e) => batch.failures.push(ProfileFailure {
                building_id: building.id.clone(),
                error: e.to_string(),
            }),
        }
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::building::Household;
    use crate::primitives::Point;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn assignment(kind: ProfileKind, household: f64, commercial: f64) -> ProfileAssignment {
        ProfileAssignment {
            building_id: BuildingId::from("B"),
            kind,
            household_kwh: household,
            commercial_kwh: commercial,
        }
    }

    #[test]
    fn test_commercial_flat_profile_energy() {
        let lib = ProfileLibrary::flat();
        let p = generate(
            &lib,
            &assignment(ProfileKind::G0, 0.0, 8760.0),
            date(2023, 1, 1),
            date(2023, 12, 31),
        )
        .unwrap();
        assert_eq!(p.values_kw.len(), 365 * QUARTER_HOURS_PER_DAY);
        assert!((p.energy_kwh() - 8760.0).abs() < 1e-6);
        assert!((p.values_kw[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_household_share_is_dynamised() {
        let lib = ProfileLibrary::flat();
        let p = generate(
            &lib,
            &assignment(ProfileKind::H0, 1000.0, 0.0),
            date(2024, 1, 1),
            date(2024, 1, 1),
        )
        .unwrap();
        let base = 1000.0 / 8760.0;
        assert!((p.values_kw[0] - base * h0_dynamic_factor(1)).abs() < 1e-12);
    }

    #[test]
    fn test_timestamps() {
        let p = LoadProfile {
            building_id: BuildingId::from("B"),
            kind: ProfileKind::H0,
            start: date(2024, 1, 1),
            values_kw: vec![0.0; 200],
        };
        assert_eq!(p.timestamp(97).to_string(), "2024-01-02 00:15:00");
    }

    #[test]
    fn test_reversed_range_rejected() {
        let lib = ProfileLibrary::flat();
        let a = assignment(ProfileKind::G0, 0.0, 100.0);
        assert!(generate(&lib, &a, date(2024, 2, 1), date(2024, 1, 1)).is_err());
    }

    #[test]
    fn test_generate_all_collects_failures() {
        let square = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let mut ok = Building::new("ok", square.clone());
        ok.code = Some(1010);
        ok.households = vec![Household { residents: 2 }];
        let mut missing = Building::new("missing", square.clone());
        missing.code = Some(1010);
        let mut garage = Building::new("garage", square);
        garage.code = Some(2523);

        let batch = generate_all(
            &ProfileLibrary::flat(),
            &ProfileClassifier::default(),
            &[ok, missing, garage],
            date(2024, 1, 1),
            date(2024, 1, 7),
        );
        assert_eq!(batch.profiles.len(), 1);
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].building_id, BuildingId::from("missing"));
        assert_eq!(batch.excluded, vec![BuildingId::from("garage")]);
    }

    proptest! {
        #[test]
        fn prop_commercial_energy_conserved(kwh in 100.0f64..100_000.0) {
            let lib = ProfileLibrary::flat();
            let p = generate(
                &lib,
                &assignment(ProfileKind::G1, 0.0, kwh),
                date(2023, 1, 1),
                date(2023, 12, 31),
            ).unwrap();
            prop_assert!((p.energy_kwh() - kwh).abs() / kwh < 1e-9);
        }
    }
}
