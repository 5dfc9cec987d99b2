//! # Calendar
//!
//! Date classification for standard load profiles:
//!
//! - BDEW periods (winter, summer, transition)
//! - day types, with German nationwide public holidays treated as Sundays
//! - meteorological seasons and intraday phases used for phase summaries
//! - the H0 dynamisation polynomial

use crate::HeatplanError;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// BDEW PERIOD
// =============================================================================

/// BDEW profile period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Winter,
    Summer,
    Transition,
}

impl Period {
    pub const ALL: [Period; 3] = [Period::Winter, Period::Summer, Period::Transition];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Winter => "winter",
            Self::Summer => "summer",
            Self::Transition => "transition",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = HeatplanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "winter" | "wi" => Ok(Self::Winter),
            "summer" | "sommer" | "so" => Ok(Self::Summer),
            "transition" | "uebergang" | "übergang" | "ue" | "üz" => Ok(Self::Transition),
            other => Err(HeatplanError::Profile(format!("unknown period '{other}'"))),
        }
    }
}

/// Winter 1 Nov – 20 Mar, summer 15 May – 14 Sep, transition otherwise.
#[must_use]
pub fn period(date: NaiveDate) -> Period {
    match (date.month(), date.day()) {
        (11 | 12 | 1 | 2, _) => Period::Winter,
        (3, d) if d <= 20 => Period::Winter,
        (5, d) if d >= 15 => Period::Summer,
        (6..=8, _) => Period::Summer,
        (9, d) if d <= 14 => Period::Summer,
        _ => Period::Transition,
    }
}

// =============================================================================
// DAY TYPE
// =============================================================================

/// Day type used by the standard profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayType {
    Workday,
    Saturday,
    Sunday,
}

impl DayType {
    pub const ALL: [DayType; 3] = [DayType::Workday, DayType::Saturday, DayType::Sunday];

    /// German key used in phase summaries.
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::Workday => "werktag",
            Self::Saturday => "samstag",
            Self::Sunday => "sonntag",
        }
    }
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for DayType {
    type Err = HeatplanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "workday" | "werktag" | "wt" => Ok(Self::Workday),
            "saturday" | "samstag" | "sa" => Ok(Self::Saturday),
            "sunday" | "sonntag" | "feiertag" | "su" | "so" => Ok(Self::Sunday),
            other => Err(HeatplanError::Profile(format!("unknown day type '{other}'"))),
        }
    }
}

/// Easter Sunday for a Gregorian year (anonymous computus).
#[must_use]
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year.rem_euclid(19);
    let b = year.div_euclid(100);
    let c = year.rem_euclid(100);
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

/// Nationwide German public holiday.
#[must_use]
pub fn is_public_holiday(date: NaiveDate) -> bool {
    let fixed = matches!(
        (date.month(), date.day()),
        (1, 1) | (5, 1) | (10, 3) | (12, 25) | (12, 26)
    );
    if fixed {
        return true;
    }
    let Some(easter) = easter_sunday(date.year()) else {
        return false;
    };
    let offset = (date - easter).num_days();
    matches!(offset, -2 | 1 | 39 | 50)
}

/// Workday, Saturday or Sunday. Holidays are Sundays, 24/31 Dec Saturdays.
#[must_use]
pub fn day_type(date: NaiveDate) -> DayType {
    if is_public_holiday(date) {
        return DayType::Sunday;
    }
    match date.weekday() {
        Weekday::Sun => DayType::Sunday,
        Weekday::Sat => DayType::Saturday,
        _ if date.month() == 12 && matches!(date.day(), 24 | 31) => DayType::Saturday,
        _ => DayType::Workday,
    }
}

/// Iterate dates in `[start, end]`.
pub fn days(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let count = (end - start).num_days().max(-1) + 1;
    (0..count).map(move |i| start + Duration::days(i))
}

// =============================================================================
// SEASON / PHASE
// =============================================================================

/// Meteorological season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Winter, Season::Spring, Season::Summer, Season::Autumn];

    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        match date.month() {
            12 | 1 | 2 => Self::Winter,
            3..=5 => Self::Spring,
            6..=8 => Self::Summer,
            _ => Self::Autumn,
        }
    }

    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::Winter => "winter",
            Self::Spring => "frühling",
            Self::Summer => "sommer",
            Self::Autumn => "herbst",
        }
    }
}

/// Intraday load phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// 23:00–06:00
    Night,
    /// 06:00–09:00
    MorningPeak,
    /// 09:00–13:00
    Forenoon,
    /// 13:00–17:00
    Afternoon,
    /// 17:00–23:00
    EveningPeak,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Night,
        Phase::MorningPeak,
        Phase::Forenoon,
        Phase::Afternoon,
        Phase::EveningPeak,
    ];

    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::Night => "nachtphase",
            Self::MorningPeak => "morgenspitze",
            Self::Forenoon => "vormittag",
            Self::Afternoon => "nachmittag",
            Self::EveningPeak => "abendspitze",
        }
    }
}

/// Phase of an hour of day. Night wraps midnight.
#[must_use]
pub fn phase_of(hour: u32) -> Phase {
    match hour % 24 {
        6..=8 => Phase::MorningPeak,
        9..=12 => Phase::Forenoon,
        13..=16 => Phase::Afternoon,
        17..=22 => Phase::EveningPeak,
        _ => Phase::Night,
    }
}

/// `{season}_{day type}_{phase}`, e.g. `winter_werktag_abendspitze`.
#[must_use]
pub fn phase_key(season: Season, day: DayType, phase: Phase) -> String {
    format!("{}_{}_{}", season.key(), day.key(), phase.key())
}

/// Phase key used when a configured key is absent.
pub const DEFAULT_PHASE_KEY: &str = "winter_werktag_abendspitze";

// =============================================================================
// DYNAMISATION
// =============================================================================

/// H0 dynamisation factor for a day of year (1-based).
#[must_use]
pub fn h0_dynamic_factor(day_of_year: u32) -> f64 {
    let d = f64::from(day_of_year);
    -3.92e-10 * d.powi(4) + 3.20e-7 * d.powi(3) - 7.02e-5 * d.powi(2) + 2.10e-3 * d + 1.24
}

// =============================================================================
// TESTS
// =============================================================================
