//! Snapshot persistence.
//!
//! Binary layout:
//!
//! ```text
//! +--------+---------+----------+----------------+-----------------+
//! | "HPLN" | version | reserved | postcard body  | FNV-1a-64 (LE)  |
//! | 4 B    | u16 LE  | u16 LE   | variable       | 8 B             |
//! +--------+---------+----------+----------------+-----------------+
//! ```
//!
//! The checksum covers the body only. Encoding the same snapshot twice
//! yields identical bytes.

use crate::kpi::KpiRecord;
use crate::scenario::{Scenario, ScenarioKind};
use crate::simulation::SimulationResult;
use crate::{HeatplanError, Result};
use serde::{Deserialize, Serialize};

/// File magic.
pub const MAGIC: [u8; 4] = *b"HPLN";

/// Current snapshot format version.
pub const FORMAT_VERSION: u16 = 1;

/// Magic + version + reserved.
pub const HEADER_LEN: usize = 8;

const CHECKSUM_LEN: usize = 8;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Everything a study run produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub scenarios: Vec<Scenario>,
    pub results: Vec<SimulationResult>,
    pub kpis: Vec<KpiRecord>,
}

impl Snapshot {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty() && self.results.is_empty() && self.kpis.is_empty()
    }
}

/// 64-bit FNV-1a.
#[must_use]
pub fn fnv1a64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

/// BLAKE3 digest of the encoded snapshot, hex encoded.
#[cfg(feature = "crypto-hash")]
#[must_use]
pub fn content_digest(encoded: &[u8]) -> String {
    blake3::hash(encoded).to_hex().to_string()
}

// =============================================================================
// BINARY
// =============================================================================

/// Encode a snapshot.
pub fn export_binary(snapshot: &Snapshot) -> Result<Vec<u8>> {
    let body = postcard::to_allocvec(snapshot)?;
    let mut out = Vec::with_capacity(HEADER_LEN + body.len() + CHECKSUM_LEN);
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&body);
    out.extend_from_slice(&fnv1a64(&body).to_le_bytes());
    Ok(out)
}

/// Decode a snapshot, verifying magic, version and checksum.
pub fn import_binary(data: &[u8]) -> Result<Snapshot> {
    if data.len() < HEADER_LEN + CHECKSUM_LEN {
        return Err(HeatplanError::Serialization(format!(
            "snapshot too short: {} bytes",
            data.len()
        )));
    }
    let (header, rest) = data.split_at(HEADER_LEN);
    if header[..4] != MAGIC {
        return Err(HeatplanError::Serialization(
            "not a heatplan snapshot (bad magic)".to_string(),
        ));
    }
    let version = u16::from_le_bytes([header[4], header[5]]);
    if version != FORMAT_VERSION {
        return Err(HeatplanError::Serialization(format!(
            "unsupported snapshot version {version}"
        )));
    }

    let (body, trailer) = rest.split_at(rest.len() - CHECKSUM_LEN);
    let mut expected = [0u8; CHECKSUM_LEN];
    expected.copy_from_slice(trailer);
    if fnv1a64(body) != u64::from_le_bytes(expected) {
        return Err(HeatplanError::Serialization(
            "snapshot checksum mismatch".to_string(),
        ));
    }
    Ok(postcard::from_bytes(body)?)
}

// =============================================================================
// JSON / CSV
// =============================================================================

/// Pretty-printed JSON.
pub fn export_json(snapshot: &Snapshot) -> Result<String> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

pub fn import_json(json: &str) -> Result<Snapshot> {
    Ok(serde_json::from_str(json)?)
}

/// Column order of `kpis_to_csv`.
pub const KPI_CSV_HEADER: [&str; 16] = [
    "scenario",
    "type",
    "success",
    "lcoh_eur_per_mwh",
    "co2_t_per_a",
    "capex_eur",
    "total_cost_eur",
    "heat_supplied_mwh",
    "max_pressure_drop_bar",
    "pump_energy_kwh",
    "network_length_m",
    "max_feeder_load_percent",
    "transformer_overloads",
    "min_voltage_pu",
    "n_heat_pumps",
    "comment",
];

/// One CSV line. Field order must match `KPI_CSV_HEADER`.
#[derive(Serialize)]
struct KpiCsvRow<'a> {
    scenario: &'a str,
    kind: ScenarioKind,
    success: bool,
    lcoh_eur_per_mwh: Option<f64>,
    co2_t_per_a: Option<f64>,
    capex_eur: Option<f64>,
    total_cost_eur: Option<f64>,
    heat_supplied_mwh: Option<f64>,
    max_pressure_drop_bar: Option<f64>,
    pump_energy_kwh: Option<f64>,
    network_length_m: Option<f64>,
    max_feeder_load_percent: Option<f64>,
    transformer_overloads: Option<usize>,
    min_voltage_pu: Option<f64>,
    n_heat_pumps: Option<usize>,
    comment: &'a str,
}

impl<'a> From<&'a KpiRecord> for KpiCsvRow<'a> {
    fn from(k: &'a KpiRecord) -> Self {
        Self {
            scenario: &k.scenario,
            kind: k.kind,
            success: k.success,
            lcoh_eur_per_mwh: k.lcoh_eur_per_mwh,
            co2_t_per_a: k.co2_t_per_a,
            capex_eur: k.capex_eur,
            total_cost_eur: k.total_cost_eur,
            heat_supplied_mwh: k.heat_supplied_mwh,
            max_pressure_drop_bar: k.max_pressure_drop_bar,
            pump_energy_kwh: k.pump_energy_kwh,
            network_length_m: k.network_length_m,
            max_feeder_load_percent: k.max_feeder_load_percent,
            transformer_overloads: k.transformer_overloads,
            min_voltage_pu: k.min_voltage_pu,
            n_heat_pumps: k.n_heat_pumps,
            comment: &k.comment,
        }
    }
}

/// KPI table as CSV. Missing values are empty fields.
pub fn kpis_to_csv(kpis: &[KpiRecord]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(KPI_CSV_HEADER)?;
    for k in kpis {
        writer.serialize(KpiCsvRow::from(k))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| HeatplanError::Serialization(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| HeatplanError::Serialization(e.to_string()))
}

// =============================================================================
// TESTS
// =============================================================================
