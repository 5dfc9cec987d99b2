//! Plausibility checks for generated profiles.

use super::LoadProfile;
use crate::calendar::period;
use crate::round_to;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Largest accepted relative deviation of the yearly energy.
pub const MAX_YEARLY_DEVIATION: f64 = 0.05;

/// Result of validating one profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileValidation {
    pub expected_kwh: f64,
    pub actual_kwh: f64,
    /// |actual − expected| / expected
    pub deviation: f64,
    pub yearly_ok: bool,
    pub peak_kw: f64,
    /// Mean load 23:00–05:59.
    pub night_base_kw: Option<f64>,
    /// Mean load 09:00–17:59.
    pub day_load_kw: Option<f64>,
    /// Energy share per BDEW period.
    pub period_shares: BTreeMap<String, f64>,
}

/// Validate the energy balance and derive load indicators.
#[must_use]
pub fn validate(profile: &LoadProfile, expected_kwh: f64) -> ProfileValidation {
    let actual_kwh = profile.energy_kwh();
    let deviation = if expected_kwh > 0.0 {
        (actual_kwh - expected_kwh).abs() / expected_kwh
    } else {
        f64::INFINITY
    };

    let mut per_period: BTreeMap<String, f64> = BTreeMap::new();
    for (ts, kw) in profile.iter() {
        *per_period
            .entry(period(ts.date()).to_string())
            .or_default() += kw * 0.25;
    }
    let period_shares = per_period
        .into_iter()
        .map(|(k, kwh)| {
            let share = if actual_kwh > 0.0 { kwh / actual_kwh } else { 0.0 };
            (k, round_to(share, 4))
        })
        .collect();

    ProfileValidation {
        expected_kwh,
        actual_kwh,
        deviation,
        yearly_ok: deviation < MAX_YEARLY_DEVIATION,
        peak_kw: profile.peak_kw(),
        night_base_kw: profile.mean_where(|h| h >= 23 || h <= 5),
        day_load_kw: profile.mean_where(|h| (9..=17).contains(&h)),
        period_shares,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::BuildingId;
    use crate::profiles::ProfileKind;
    use chrono::NaiveDate;

    fn profile(values: Vec<f64>) -> LoadProfile {
        LoadProfile {
            building_id: BuildingId::from("B"),
            kind: ProfileKind::G0,
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            values_kw: values,
        }
    }

    #[test]
    fn test_balanced_profile_passes() {
        let p = profile(vec![1.0; 96]);
        let v = validate(&p, 24.0);
        assert!(v.yearly_ok);
        assert_eq!(v.deviation, 0.0);
        assert_eq!(v.period_shares["winter"], 1.0);
        assert_eq!(v.night_base_kw, Some(1.0));
    }

    #[test]
    fn test_deviation_threshold() {
        let p = profile(vec![1.0; 96]);
        assert!(!validate(&p, 20.0).yearly_ok);
        assert!(!validate(&p, 0.0).yearly_ok);
    }

    #[test]
    fn test_night_and_day_windows() {
        let mut values = vec![0.0; 96];
        // 09:00–17:59
        for v in &mut values[36..72] {
            *v = 3.0;
        }
        let v = validate(&profile(values), 27.0);
        assert_eq!(v.day_load_kw, Some(3.0));
        assert_eq!(v.night_base_kw, Some(0.0));
        assert_eq!(v.peak_kw, 3.0);
    }
}
