//! # Study Configuration
//!
//! One JSON or YAML document describes a study: where the input files are,
//! the physical and economic parameters, and the scenarios to compare.
//! Every section is optional and falls back to documented defaults.

use crate::building::{Building, load_buildings, load_households, merge_households};
use crate::demand::DemandParams;
use crate::grid::{GridNetwork, GridParams};
use crate::hydraulics::HydraulicParams;
use crate::kpi::{CostParams, EmissionFactors};
use crate::network::{NetworkParams, Street, load_streets};
use crate::primitives::{BuildingId, DEFAULT_PROFILE_YEAR, Point};
use crate::profiles::{
    PhaseSummary, ProfileBatch, ProfileClassifier, ProfileLibrary, generate_all,
    summarize_phases,
};
use crate::scenario::ScenarioSpec;
use crate::simulation::{DEFAULT_WORKERS, SimulationInputs};
use crate::{HeatplanError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Input file locations. Relative paths resolve against the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputPaths {
    pub buildings: Option<PathBuf>,
    pub households: Option<PathBuf>,
    pub streets: Option<PathBuf>,
    pub grid: Option<PathBuf>,
    /// Heating plant location; defaults to the mean building centroid.
    pub plant: Option<Point>,
}

/// Load profile generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// BDEW library CSV; flat curves when absent.
    pub library: Option<PathBuf>,
    pub year: i32,
    pub classifier: ProfileClassifier,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            library: None,
            year: DEFAULT_PROFILE_YEAR,
            classifier: ProfileClassifier::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub title: String,
    pub study_area: Option<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "Heat Planning Scenario Comparison".to_string(),
            study_area: None,
        }
    }
}

/// A complete study description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    pub inputs: InputPaths,
    pub demand: DemandParams,
    pub profiles: ProfileConfig,
    pub network: NetworkParams,
    pub hydraulics: HydraulicParams,
    pub grid: GridParams,
    pub costs: CostParams,
    pub emissions: EmissionFactors,
    pub scenarios: Vec<ScenarioSpec>,
    pub report: ReportConfig,
    /// Worker threads for batch simulation.
    pub workers: usize,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            inputs: InputPaths::default(),
            demand: DemandParams::default(),
            profiles: ProfileConfig::default(),
            network: NetworkParams::default(),
            hydraulics: HydraulicParams::default(),
            grid: GridParams::default(),
            costs: CostParams::default(),
            emissions: EmissionFactors::default(),
            scenarios: Vec::new(),
            report: ReportConfig::default(),
            workers: DEFAULT_WORKERS,
        }
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| HeatplanError::MissingData(format!("{}: {e}", path.display())))
}

fn resolve(base: &Path, path: &mut Option<PathBuf>) {
    if let Some(p) = path.as_mut()
        && p.is_relative()
    {
        *p = base.join(&*p);
    }
}

impl StudyConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Load from `.json`, `.yaml` or `.yml` and resolve relative input
    /// paths against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = read_file(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let mut config = match ext.as_deref() {
            Some("json") => Self::from_json(&text)?,
            Some("yaml" | "yml") => Self::from_yaml(&text)?,
            _ => {
                return Err(HeatplanError::InvalidInput(format!(
                    "unsupported config format: {}",
                    path.display()
                )));
            }
        };
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn resolve_paths(&mut self, base: &Path) {
        resolve(base, &mut self.inputs.buildings);
        resolve(base, &mut self.inputs.households);
        resolve(base, &mut self.inputs.streets);
        resolve(base, &mut self.inputs.grid);
        resolve(base, &mut self.profiles.library);
    }

    /// Reject parameter combinations no model can work with.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(HeatplanError::InvalidInput("workers must be at least 1".to_string()));
        }
        if self.network.supply_temp_c <= self.network.return_temp_c {
            return Err(HeatplanError::InvalidInput(
                "supply temperature must exceed return temperature".to_string(),
            ));
        }
        if self.demand.system_efficiency <= 0.0 {
            return Err(HeatplanError::InvalidInput(
                "system efficiency must be positive".to_string(),
            ));
        }
        if self.costs.heat_pump_cop <= 0.0 {
            return Err(HeatplanError::InvalidInput("heat pump COP must be positive".to_string()));
        }
        Ok(())
    }

    /// First and last day of the profile year.
    pub fn profile_period(&self) -> Result<(NaiveDate, NaiveDate)> {
        let year = self.profiles.year;
        let start = NaiveDate::from_ymd_opt(year, 1, 1);
        let end = NaiveDate::from_ymd_opt(year, 12, 31);
        start
            .zip(end)
            .ok_or_else(|| HeatplanError::InvalidInput(format!("invalid profile year {year}")))
    }
}

// =============================================================================
// INPUTS
// =============================================================================

/// Input data of a study, read from the configured files.
#[derive(Debug, Clone, Default)]
pub struct StudyInputs {
    pub buildings: Vec<Building>,
    /// Buildings dropped for missing or degenerate footprints.
    pub skipped: Vec<BuildingId>,
    /// Buildings that received household data.
    pub households_merged: usize,
    pub streets: Vec<Street>,
    pub grid: Option<GridNetwork>,
    pub plant: Option<Point>,
    pub library: ProfileLibrary,
}

fn mean_centroid(buildings: &[Building]) -> Option<Point> {
    let centroids: Vec<Point> = buildings.iter().filter_map(Building::centroid).collect();
    if centroids.is_empty() {
        return None;
    }
    let n = centroids.len() as f64;
    let (x, y) = centroids
        .iter()
        .fold((0.0, 0.0), |(x, y), p| (x + p.x, y + p.y));
    Some(Point::new(x / n, y / n))
}

impl StudyInputs {
    /// Read every configured input. Only the buildings file is mandatory.
    pub fn load(config: &StudyConfig) -> Result<Self> {
        let path = config
            .inputs
            .buildings
            .as_deref()
            .ok_or_else(|| HeatplanError::MissingData("no buildings file configured".to_string()))?;
        let loaded = load_buildings(&read_file(path)?)?;
        let mut buildings = loaded.buildings;

        let households_merged = match &config.inputs.households {
            Some(path) => merge_households(&mut buildings, &load_households(&read_file(path)?)?),
            None => 0,
        };
        let streets = match &config.inputs.streets {
            Some(path) => load_streets(&read_file(path)?)?,
            None => Vec::new(),
        };
        let grid = match &config.inputs.grid {
            Some(path) => Some(GridNetwork::from_json(&read_file(path)?)?),
            None => None,
        };
        let library = match &config.profiles.library {
            Some(path) => ProfileLibrary::from_csv(&read_file(path)?)?,
            None => ProfileLibrary::flat(),
        };
        let plant = config.inputs.plant.or_else(|| mean_centroid(&buildings));

        Ok(Self {
            buildings,
            skipped: loaded.skipped,
            households_merged,
            streets,
            grid,
            plant,
            library,
        })
    }

    /// Load profiles for the configured year.
    pub fn generate_profiles(&self, config: &StudyConfig) -> Result<ProfileBatch> {
        let (start, end) = config.profile_period()?;
        Ok(generate_all(
            &self.library,
            &config.profiles.classifier,
            &self.buildings,
            start,
            end,
        ))
    }

    /// Phase summaries of every profiled building.
    #[must_use]
    pub fn phase_summaries(batch: &ProfileBatch) -> BTreeMap<BuildingId, PhaseSummary> {
        batch
            .profiles
            .iter()
            .map(|(assignment, profile)| (assignment.building_id.clone(), summarize_phases(profile)))
            .collect()
    }

    /// Bundle inputs and parameters for the simulation runner.
    #[must_use]
    pub fn simulation_inputs(
        &self,
        config: &StudyConfig,
        phase_summaries: BTreeMap<BuildingId, PhaseSummary>,
    ) -> SimulationInputs {
        SimulationInputs {
            buildings: self.buildings.clone(),
            streets: self.streets.clone(),
            plant: self.plant,
            grid: self.grid.clone(),
            phase_summaries,
            demand: config.demand,
            network: config.network,
            hydraulics: config.hydraulics.clone(),
            grid_params: config.grid.clone(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
