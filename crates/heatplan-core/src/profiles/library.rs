//! Standard load profile curves.

use super::ProfileKind;
use crate::calendar::{DayType, Period};
use crate::primitives::{HOURS_PER_YEAR, QUARTER_HOURS_PER_DAY, REFERENCE_CONSUMPTION_KWH};
use crate::{HeatplanError, Result};
use csv::StringRecord;
use serde::Deserialize;
use std::collections::BTreeMap;

const REQUIRED_COLUMNS: [&str; 4] = ["profile_id", "period", "day", "watts"];

/// One library row. Extra columns are ignored.
#[derive(Debug, Deserialize)]
struct CurveRow {
    profile_id: String,
    period: String,
    day: String,
    watts: f64,
}

/// Quarter-hour curves in W, normalised to 1000 kWh/a, per kind, period and day type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileLibrary {
    curves: BTreeMap<(ProfileKind, Period, DayType), Vec<f64>>,
}

impl ProfileLibrary {
    /// Constant curves: 1000 kWh spread evenly over 8760 h.
    #[must_use]
    pub fn flat() -> Self {
        let watts = REFERENCE_CONSUMPTION_KWH / HOURS_PER_YEAR * 1000.0;
        let mut curves = BTreeMap::new();
        for kind in ProfileKind::LIBRARY_KINDS {
            for period in Period::ALL {
                for day in DayType::ALL {
                    curves.insert((kind, period, day), vec![watts; QUARTER_HOURS_PER_DAY]);
                }
            }
        }
        Self { curves }
    }

    /// Parse a `profile_id, period, day, watts` CSV.
    ///
    /// Column order is free, header case is ignored and extra columns are
    /// skipped. Rows of a group must appear in quarter-hour order and every
    /// group needs exactly 96 rows.
    pub fn from_csv(text: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());
        let headers: StringRecord = reader
            .headers()
            .map_err(|e| HeatplanError::Profile(format!("unreadable header: {e}")))?
            .iter()
            .map(str::to_lowercase)
            .collect();
        if headers.is_empty() {
            return Err(HeatplanError::Profile("empty profile library".to_string()));
        }
        for name in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == name) {
                return Err(HeatplanError::Profile(format!("missing column '{name}'")));
            }
        }
        reader.set_headers(headers);

        let mut curves: BTreeMap<(ProfileKind, Period, DayType), Vec<f64>> = BTreeMap::new();
        for (row, record) in reader.deserialize::<CurveRow>().enumerate() {
            let record =
                record.map_err(|e| HeatplanError::Profile(format!("row {}: {e}", row + 2)))?;
            let kind: ProfileKind = record.profile_id.parse()?;
            let period: Period = record.period.parse()?;
            let day: DayType = record.day.parse()?;
            curves.entry((kind, period, day)).or_default().push(record.watts);
        }

        for ((kind, period, day), values) in &curves {
            if values.len() != QUARTER_HOURS_PER_DAY {
                return Err(HeatplanError::Profile(format!(
                    "{kind} {period} {day}: expected {QUARTER_HOURS_PER_DAY} values, found {}",
                    values.len()
                )));
            }
        }
        Ok(Self { curves })
    }

    /// Curve for a kind, period and day type.
    pub fn curve(&self, kind: ProfileKind, period: Period, day: DayType) -> Result<&[f64]> {
        self.curves
            .get(&(kind, period, day))
            .map(Vec::as_slice)
            .ok_or_else(|| HeatplanError::Profile(format!("no curve for {kind} {period} {day}")))
    }

    /// Kinds with at least one curve.
    #[must_use]
    pub fn kinds(&self) -> Vec<ProfileKind> {
        let mut kinds: Vec<ProfileKind> = self.curves.keys().map(|(k, _, _)| *k).collect();
        kinds.dedup();
        kinds
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.curves.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }
}
