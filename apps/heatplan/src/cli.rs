//! # CLI Commands
//!
//! One `cmd_*` function per subcommand. Each returns `Result<(), CliError>`
//! so the binary and the integration tests drive them the same way.
//!
//! Command output goes to stdout (JSON with `--json`), diagnostics go
//! through `tracing` to stderr.

use heatplan_core::building::{Building, StreetBuildings, assign_renovation_state, group_by_street};
use heatplan_core::demand::calculate_demand;
use heatplan_core::formats::{
    MAGIC, Snapshot, export_binary, export_json, import_binary, import_json, kpis_to_csv,
};
use heatplan_core::hydraulics::simulate;
use heatplan_core::kpi::{KpiRecord, Ranking, compute_kpis, rank};
use heatplan_core::network::{Consumer, build_dual_pipe_network};
use heatplan_core::profiles::{consumption_statistics, validate};
use heatplan_core::report::{ReportMetadata, concatenate, render_markdown, render_text};
use heatplan_core::scenario::{Scenario, ScenarioKind, generate_scenarios, street_scenarios};
use heatplan_core::simulation::{SimulationResult, run_batch};
use heatplan_core::{BuildingId, HeatplanError, ResultStore, StudyConfig, StudyInputs, round_to};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] HeatplanError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{0}")]
    Usage(String),
}

pub type CliResult<T = ()> = Result<T, CliError>;

// =============================================================================
// HELPERS
// =============================================================================

pub fn load_config(path: &Path) -> CliResult<StudyConfig> {
    if !path.exists() {
        return Err(CliError::Usage(format!(
            "config file not found: {} (use --config)",
            path.display()
        )));
    }
    let config = StudyConfig::load(path)?;
    debug!(scenarios = config.scenarios.len(), "loaded config {}", path.display());
    Ok(config)
}

fn open_store(db_path: &Path) -> CliResult<ResultStore> {
    if !db_path.exists() {
        return Err(CliError::Usage(format!(
            "database not found: {} (run `heatplan init` first)",
            db_path.display()
        )));
    }
    Ok(ResultStore::open(db_path)?)
}

fn load_inputs(config: &StudyConfig) -> CliResult<StudyInputs> {
    let inputs = StudyInputs::load(config)?;
    info!(
        buildings = inputs.buildings.len(),
        streets = inputs.streets.len(),
        households = inputs.households_merged,
        "inputs loaded"
    );
    if !inputs.skipped.is_empty() {
        warn!(
            count = inputs.skipped.len(),
            "skipped buildings without a valid footprint"
        );
    }
    Ok(inputs)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> CliResult {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    info!("wrote {}", path.display());
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn file_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

// =============================================================================
// INIT / STATUS
// =============================================================================

/// Create an empty result store.
pub fn cmd_init(db_path: &Path, force: bool) -> CliResult {
    if db_path.exists() {
        if !force {
            return Err(CliError::Usage(format!(
                "database already exists: {} (use --force to overwrite)",
                db_path.display()
            )));
        }
        std::fs::remove_file(db_path)?;
        warn!("removed existing database {}", db_path.display());
    }
    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let store = ResultStore::create(db_path)?;
    store.put_meta("created", &chrono::Local::now().to_rfc3339())?;
    println!("Initialized result store at {}", db_path.display());
    Ok(())
}

pub fn cmd_status(db_path: &Path, json: bool) -> CliResult {
    let store = open_store(db_path)?;
    let status = store.status()?;
    if json {
        return print_json(&status);
    }
    println!("Database:   {}", db_path.display());
    if let Some(created) = store.get_meta("created")? {
        println!("Created:    {created}");
    }
    println!("Scenarios:  {}", status.scenarios);
    println!(
        "Results:    {} ({} successful)",
        status.results, status.successful_results
    );
    println!("KPIs:       {}", status.kpis);
    Ok(())
}

// =============================================================================
// DATA PREPARATION
// =============================================================================

/// Per-building demand overview written by `prepare`.
#[derive(Debug, Serialize)]
pub struct PreparedBuilding {
    pub building_id: BuildingId,
    pub function: Option<String>,
    pub code: Option<u32>,
    pub street: Option<String>,
    pub renovation_state: String,
    pub floor_area_m2: f64,
    pub heat_loss_coefficient_w_k: f64,
    pub design_load_kw: f64,
    pub annual_demand_kwh: f64,
}

fn prepare_rows(buildings: &[Building], config: &StudyConfig) -> Vec<PreparedBuilding> {
    buildings
        .iter()
        .map(|b| {
            let demand = calculate_demand(b, &config.demand);
            PreparedBuilding {
                building_id: b.id.clone(),
                function: b.function.clone(),
                code: b.code,
                street: b.street.clone(),
                renovation_state: assign_renovation_state(b).to_string(),
                floor_area_m2: demand.envelope.floor_area_m2,
                heat_loss_coefficient_w_k: demand.heat_loss_coefficient_w_k,
                design_load_kw: demand.design_load_kw,
                annual_demand_kwh: demand.annual_demand_kwh,
            }
        })
        .collect()
}

/// Load buildings and households, compute demand, write `buildings_prepared.json`.
pub fn cmd_prepare(config_path: &Path, output_dir: &Path, json: bool) -> CliResult {
    let config = load_config(config_path)?;
    let inputs = load_inputs(&config)?;
    let rows = prepare_rows(&inputs.buildings, &config);
    write_json(&output_dir.join("buildings_prepared.json"), &rows)?;

    let total_kw: f64 = rows.iter().map(|r| r.design_load_kw).sum();
    let total_mwh: f64 = rows.iter().map(|r| r.annual_demand_kwh).sum::<f64>() / 1000.0;
    if json {
        return print_json(&serde_json::json!({
            "buildings": rows.len(),
            "skipped": inputs.skipped,
            "total_design_load_kw": total_kw,
            "total_annual_demand_mwh": total_mwh,
        }));
    }
    println!("Prepared {} buildings ({} skipped)", rows.len(), inputs.skipped.len());
    println!("Design load:   {total_kw:.1} kW");
    println!("Annual demand: {total_mwh:.1} MWh");
    Ok(())
}

// =============================================================================
// PROFILES
// =============================================================================

#[derive(Serialize)]
struct ProfileRow {
    timestamp: String,
    load_kw: f64,
}

/// Generate load profiles; write one CSV per building plus summaries.
pub fn cmd_profiles(config_path: &Path, output_dir: &Path, json: bool) -> CliResult {
    let config = load_config(config_path)?;
    let inputs = load_inputs(&config)?;
    if config.profiles.library.is_none() {
        warn!("no profile library configured, using flat curves");
    }
    let batch = inputs.generate_profiles(&config)?;
    for failure in &batch.failures {
        warn!(building = %failure.building_id, "profile failed: {}", failure.error);
    }

    let by_id: BTreeMap<&BuildingId, &Building> =
        inputs.buildings.iter().map(|b| (&b.id, b)).collect();
    let profile_dir = output_dir.join("profiles");
    std::fs::create_dir_all(&profile_dir)?;

    let mut stats = Vec::new();
    let mut validations = BTreeMap::new();
    for (assignment, profile) in &batch.profiles {
        let mut writer = csv::Writer::from_path(
            profile_dir.join(format!("{}.csv", file_name(assignment.building_id.as_str()))),
        )?;
        for (ts, kw) in profile.iter() {
            writer.serialize(ProfileRow {
                timestamp: ts.format("%Y-%m-%d %H:%M").to_string(),
                load_kw: round_to(kw, 6),
            })?;
        }
        writer.flush()?;

        if let Some(building) = by_id.get(&assignment.building_id) {
            stats.push(consumption_statistics(building, assignment));
        }
        let check = validate(profile, assignment.yearly_kwh());
        if !check.yearly_ok {
            warn!(
                building = %assignment.building_id,
                deviation = check.deviation,
                "profile energy deviates from yearly consumption"
            );
        }
        validations.insert(assignment.building_id.clone(), check);
    }

    let summaries = StudyInputs::phase_summaries(&batch);
    write_json(&output_dir.join("phase_summary.json"), &summaries)?;
    write_json(&output_dir.join("consumption_stats.json"), &stats)?;
    write_json(&output_dir.join("profile_validation.json"), &validations)?;

    if json {
        return print_json(&serde_json::json!({
            "profiles": batch.profiles.len(),
            "excluded": batch.excluded,
            "failures": batch.failures,
        }));
    }
    println!(
        "Generated {} profiles ({} excluded, {} failed) in {}",
        batch.profiles.len(),
        batch.excluded.len(),
        batch.failures.len(),
        profile_dir.display()
    );
    Ok(())
}

// =============================================================================
// NETWORK
// =============================================================================

/// Route a DH network to every building and solve its hydraulics.
pub fn cmd_network(config_path: &Path, output_dir: &Path, json: bool) -> CliResult {
    let config = load_config(config_path)?;
    let inputs = load_inputs(&config)?;
    let plant = inputs
        .plant
        .ok_or_else(|| CliError::Usage("no plant location and no buildings".to_string()))?;
    let consumers: Vec<Consumer> = inputs
        .buildings
        .iter()
        .filter_map(|b| Consumer::from_demand(b, &calculate_demand(b, &config.demand)))
        .collect();

    let network = build_dual_pipe_network(&inputs.streets, plant, &consumers, &config.network)?;
    if !network.street_graph_connected {
        warn!("street graph is not fully connected");
    }
    for id in &network.unrouted {
        warn!(building = %id, "no street route from the plant");
    }
    let stats = network.statistics();
    let hydraulics = simulate(&network, &config.hydraulics)?;
    if hydraulics.velocity_violations > 0 {
        warn!(
            count = hydraulics.velocity_violations,
            "pipes exceed the velocity limit even at the largest diameter"
        );
    }

    write_json(&output_dir.join("network.json"), &network)?;
    write_json(&output_dir.join("network_stats.json"), &stats)?;
    write_json(&output_dir.join("hydraulics.json"), &hydraulics)?;

    if json {
        return print_json(&serde_json::json!({
            "stats": stats,
            "max_pressure_drop_bar": hydraulics.max_pressure_drop_bar,
            "pump_energy_kwh": hydraulics.pump_energy_kwh,
        }));
    }
    println!(
        "Network: {} buildings, {:.2} km mains, {:.0} m services",
        stats.num_buildings, stats.total_main_length_km, stats.total_service_length_m
    );
    println!(
        "Hydraulics: max pressure drop {:.3} bar, pump energy {:.0} kWh/a",
        hydraulics.max_pressure_drop_bar, hydraulics.pump_energy_kwh
    );
    Ok(())
}

// =============================================================================
// SCENARIOS / RUN / KPI
// =============================================================================

/// Resolve the configured scenarios and store them.
pub fn define_scenarios(config: &StudyConfig, store: &ResultStore) -> CliResult<Vec<Scenario>> {
    if config.scenarios.is_empty() {
        return Err(CliError::Usage("config defines no scenarios".to_string()));
    }
    let inputs = load_inputs(config)?;
    let scenarios = generate_scenarios(&inputs.buildings, &config.scenarios)?;
    store.put_scenarios(&scenarios)?;
    Ok(scenarios)
}

pub fn cmd_scenarios(config_path: &Path, db_path: &Path, json: bool) -> CliResult {
    let config = load_config(config_path)?;
    let store = open_store(db_path)?;
    let scenarios = define_scenarios(&config, &store)?;
    if json {
        return print_json(&scenarios);
    }
    for s in &scenarios {
        println!("{:<24} {}  {:>5} buildings  {}", s.name, s.kind, s.building_ids.len(), s.description);
    }
    Ok(())
}

/// Simulate the stored scenarios (defining them first if the store has
/// none) and store the results.
pub fn execute_scenarios(
    config: &StudyConfig,
    store: &ResultStore,
    workers: Option<usize>,
) -> CliResult<Vec<SimulationResult>> {
    let mut scenarios = store.list_scenarios()?;
    if scenarios.is_empty() {
        scenarios = define_scenarios(config, store)?;
    }
    let inputs = load_inputs(config)?;
    let summaries = if scenarios.iter().any(|s| s.kind == ScenarioKind::HP) {
        StudyInputs::phase_summaries(&inputs.generate_profiles(config)?)
    } else {
        BTreeMap::new()
    };
    let sim_inputs = inputs.simulation_inputs(config, summaries);

    let workers = workers.unwrap_or(config.workers);
    info!(scenarios = scenarios.len(), workers, "running scenarios");
    let results = run_batch(&scenarios, &sim_inputs, workers);
    for r in results.iter().filter(|r| !r.success) {
        warn!(scenario = %r.scenario, "failed: {}", r.error.as_deref().unwrap_or("unknown"));
    }
    store.put_results(&results)?;
    Ok(results)
}

pub fn cmd_run(config_path: &Path, db_path: &Path, workers: Option<usize>, json: bool) -> CliResult {
    let config = load_config(config_path)?;
    let store = open_store(db_path)?;
    let results = execute_scenarios(&config, &store, workers)?;
    if json {
        return print_json(&results);
    }
    for r in &results {
        let status = if r.success { "ok" } else { "FAILED" };
        println!(
            "{:<24} {}  {status}{}",
            r.scenario,
            r.kind,
            r.error.as_deref().map(|e| format!(": {e}")).unwrap_or_default()
        );
    }
    Ok(())
}

/// KPIs from the stored results.
pub fn compute_and_store_kpis(config: &StudyConfig, store: &ResultStore) -> CliResult<Vec<KpiRecord>> {
    let results = store.list_results()?;
    if results.is_empty() {
        return Err(CliError::Usage("no simulation results (run `heatplan run` first)".to_string()));
    }
    let kpis = compute_kpis(&results, &config.costs, &config.emissions);
    store.put_kpis(&kpis)?;
    Ok(kpis)
}

pub fn cmd_kpi(config_path: &Path, db_path: &Path, output_dir: &Path, json: bool) -> CliResult {
    let config = load_config(config_path)?;
    let store = open_store(db_path)?;
    let kpis = compute_and_store_kpis(&config, &store)?;

    std::fs::create_dir_all(output_dir)?;
    let csv_path = output_dir.join("kpis.csv");
    std::fs::write(&csv_path, kpis_to_csv(&kpis)?)?;
    info!("wrote {}", csv_path.display());

    if json {
        return print_json(&kpis);
    }
    let ranking = rank(&kpis);
    for k in &kpis {
        println!(
            "{:<24} {}  LCoH {:>10}  CO2 {:>8}  {}",
            k.scenario,
            k.kind,
            k.lcoh_eur_per_mwh.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}")),
            k.co2_t_per_a.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}")),
            k.comment
        );
    }
    if let Some(cheapest) = ranking.cheapest {
        println!("Cheapest: {cheapest}");
    }
    if let Some(cleanest) = ranking.lowest_emissions {
        println!("Lowest emissions: {cleanest}");
    }
    Ok(())
}

// =============================================================================
// STREETS
// =============================================================================

/// Street names with the ids of their buildings.
pub fn list_streets(config: &StudyConfig) -> CliResult<Vec<StreetBuildings>> {
    let inputs = load_inputs(config)?;
    Ok(group_by_street(&inputs.buildings))
}

pub fn cmd_streets(config_path: &Path, json: bool) -> CliResult {
    let config = load_config(config_path)?;
    let streets = list_streets(&config)?;
    if json {
        return print_json(&streets);
    }
    for s in &streets {
        let ids: Vec<&str> = s.building_ids.iter().map(BuildingId::as_str).collect();
        println!("{:<32} {:>4}  {}", s.street, ids.len(), ids.join(", "));
    }
    Ok(())
}

/// DH and HP for the buildings of one street, ranked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreetComparison {
    pub street: String,
    pub kpis: Vec<KpiRecord>,
    pub ranking: Ranking,
}

/// Simulate both technologies for one street. Nothing is stored.
pub fn compare_street(
    config: &StudyConfig,
    street: &str,
    workers: Option<usize>,
) -> CliResult<StreetComparison> {
    let inputs = load_inputs(config)?;
    let scenarios = street_scenarios(&inputs.buildings, street)?;
    let summaries = StudyInputs::phase_summaries(&inputs.generate_profiles(config)?);
    let sim_inputs = inputs.simulation_inputs(config, summaries);

    let workers = workers.unwrap_or(config.workers);
    info!(street = street.trim(), workers, "comparing DH and HP");
    let results = run_batch(&scenarios, &sim_inputs, workers);
    for r in results.iter().filter(|r| !r.success) {
        warn!(scenario = %r.scenario, "failed: {}", r.error.as_deref().unwrap_or("unknown"));
    }
    let kpis = compute_kpis(&results, &config.costs, &config.emissions);
    let ranking = rank(&kpis);
    Ok(StreetComparison {
        street: street.trim().to_string(),
        kpis,
        ranking,
    })
}

pub fn cmd_compare(
    config_path: &Path,
    output_dir: &Path,
    street: &str,
    workers: Option<usize>,
    json: bool,
) -> CliResult {
    let config = load_config(config_path)?;
    let comparison = compare_street(&config, street, workers)?;
    write_json(
        &output_dir.join(format!("compare_{}.json", file_name(&comparison.street))),
        &comparison,
    )?;

    if json {
        return print_json(&comparison);
    }
    for k in &comparison.kpis {
        println!(
            "{:<32} {}  LCoH {:>10}  CO2 {:>8}",
            k.scenario,
            k.kind,
            k.lcoh_eur_per_mwh.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}")),
            k.co2_t_per_a.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}")),
        );
    }
    if let Some(cheapest) = &comparison.ranking.cheapest {
        println!("Cheapest: {cheapest}");
    }
    if let Some(cleanest) = &comparison.ranking.lowest_emissions {
        println!("Lowest emissions: {cleanest}");
    }
    Ok(())
}

// =============================================================================
// REPORT
// =============================================================================

/// Report output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Markdown,
    Text,
}

impl std::str::FromStr for ReportFormat {
    type Err = CliError;

    fn from_str(s: &str) -> CliResult<Self> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "text" | "txt" => Ok(Self::Text),
            other => Err(CliError::Usage(format!("unknown report format '{other}'"))),
        }
    }
}

/// Render a report from the stored KPIs. With `per_scenario` every
/// scenario gets its own report and the reports are concatenated.
pub fn render_report(
    config: &StudyConfig,
    store: &ResultStore,
    format: ReportFormat,
    per_scenario: bool,
) -> CliResult<String> {
    let kpis = store.list_kpis()?;
    if kpis.is_empty() {
        return Err(CliError::Usage("no KPIs stored (run `heatplan kpi` first)".to_string()));
    }
    let metadata = ReportMetadata {
        title: config.report.title.clone(),
        study_area: config.report.study_area.clone(),
        generated: Some(chrono::Local::now().date_naive().to_string()),
        scenarios: store.list_scenarios()?,
    };
    let render = |kpis: &[KpiRecord], meta: &ReportMetadata| match format {
        ReportFormat::Markdown => render_markdown(kpis, meta),
        ReportFormat::Text => render_text(kpis, meta),
    };
    if !per_scenario {
        return Ok(render(&kpis, &metadata));
    }
    let reports: Vec<String> = kpis
        .iter()
        .map(|k| {
            let meta = ReportMetadata {
                title: format!("{}: {}", metadata.title, k.scenario),
                ..metadata.clone()
            };
            render(std::slice::from_ref(k), &meta)
        })
        .collect();
    Ok(concatenate(&reports))
}

pub fn cmd_report(
    config_path: &Path,
    db_path: &Path,
    output_dir: &Path,
    format: &str,
    per_scenario: bool,
) -> CliResult {
    let format: ReportFormat = format.parse()?;
    let config = load_config(config_path)?;
    let store = open_store(db_path)?;
    let report = render_report(&config, &store, format, per_scenario)?;

    std::fs::create_dir_all(output_dir)?;
    let name = match format {
        ReportFormat::Markdown => "report.md",
        ReportFormat::Text => "report.txt",
    };
    let path = output_dir.join(name);
    std::fs::write(&path, &report)?;
    println!("Report written to {}", path.display());
    Ok(())
}

// =============================================================================
// EXPORT / IMPORT
// =============================================================================

/// Snapshot export format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Binary,
    Json,
    Csv,
}

impl std::str::FromStr for ExportFormat {
    type Err = CliError;

    fn from_str(s: &str) -> CliResult<Self> {
        match s.to_lowercase().as_str() {
            "binary" | "bin" => Ok(Self::Binary),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(CliError::Usage(format!("unknown export format '{other}'"))),
        }
    }
}

fn snapshot(store: &ResultStore) -> CliResult<Snapshot> {
    Ok(Snapshot {
        scenarios: store.list_scenarios()?,
        results: store.list_results()?,
        kpis: store.list_kpis()?,
    })
}

pub fn cmd_export(db_path: &Path, output: &Path, format: &str) -> CliResult {
    let format: ExportFormat = format.parse()?;
    let store = open_store(db_path)?;
    let snap = snapshot(&store)?;
    match format {
        ExportFormat::Binary => {
            let bytes = export_binary(&snap)?;
            #[cfg(feature = "crypto-hash")]
            info!(digest = %heatplan_core::formats::content_digest(&bytes), "snapshot digest");
            std::fs::write(output, bytes)?;
        }
        ExportFormat::Json => std::fs::write(output, export_json(&snap)?)?,
        ExportFormat::Csv => std::fs::write(output, kpis_to_csv(&snap.kpis)?)?,
    }
    println!(
        "Exported {} scenarios, {} results, {} KPIs to {}",
        snap.scenarios.len(),
        snap.results.len(),
        snap.kpis.len(),
        output.display()
    );
    Ok(())
}

/// Import a binary or JSON snapshot, replacing the store contents.
pub fn cmd_import(db_path: &Path, input: &Path) -> CliResult {
    let data = std::fs::read(input)?;
    let snap = if data.starts_with(&MAGIC) {
        import_binary(&data)?
    } else {
        let text = String::from_utf8(data)
            .map_err(|_| CliError::Usage(format!("{} is neither binary nor JSON", input.display())))?;
        import_json(&text)?
    };

    let store = ResultStore::create(db_path)?;
    store.clear()?;
    store.put_scenarios(&snap.scenarios)?;
    store.put_results(&snap.results)?;
    store.put_kpis(&snap.kpis)?;
    println!(
        "Imported {} scenarios, {} results, {} KPIs into {}",
        snap.scenarios.len(),
        snap.results.len(),
        snap.kpis.len(),
        db_path.display()
    );
    Ok(())
}

// =============================================================================
// SERVE
// =============================================================================

/// Start the HTTP API. The config is optional; without it `POST /run`
/// is unavailable.
pub async fn cmd_serve(
    db_path: &Path,
    config_path: &Path,
    bind: std::net::SocketAddr,
) -> CliResult {
    let store = ResultStore::create(db_path)?;
    let config = if config_path.exists() {
        Some(load_config(config_path)?)
    } else {
        warn!("config {} not found, POST /run disabled", config_path.display());
        None
    };
    let state = crate::api::AppState::new(store, config);
    crate::api::serve(state, bind).await?;
    Ok(())
}

