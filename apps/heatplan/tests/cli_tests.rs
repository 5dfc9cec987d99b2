//! Integration tests for heatplan CLI commands.
//!
//! Uses tempfile for a small study area on disk.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use heatplan::cli::{
    cmd_compare, cmd_export, cmd_import, cmd_init, cmd_kpi, cmd_network, cmd_prepare,
    cmd_profiles, cmd_report, cmd_run, cmd_scenarios, cmd_status, cmd_streets, compare_street,
    execute_scenarios, list_streets, load_config,
};
use heatplan_core::ResultStore;
use heatplan_core::scenario::ScenarioKind;
use std::path::PathBuf;
use tempfile::TempDir;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Create a temporary directory for tests.
fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Three residential buildings and one office north of a single street.
fn create_buildings_json(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("buildings.json");
    let content = r#"[
        {"GebaeudeID": "B1", "Gebaeudecode": 1010, "Baujahr": 1965, "Strasse": "Hauptstrasse",
         "footprint": [[0,0],[10,0],[10,10],[0,10]],
         "Haushaltsverteilung": [{"einwohner": 2}, {"einwohner": 3}]},
        {"GebaeudeID": "B2", "Gebaeudecode": 1010, "Baujahr": 2005, "Strasse": "Hauptstrasse",
         "footprint": [[20,0],[30,0],[30,10],[20,10]],
         "Haushaltsverteilung": [{"einwohner": 1}]},
        {"GebaeudeID": "B3", "Gebaeudecode": 2050, "Strasse": "Nebenweg",
         "footprint": [[40,0],[55,0],[55,12],[40,12]], "Gesamtnettonutzflaeche": 300.0},
        {"GebaeudeID": "B4", "footprint": []}
    ]"#;
    std::fs::write(&path, content).unwrap();
    path
}

fn create_streets_geojson(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("streets.geojson");
    let content = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"name": "Hauptstrasse"},
             "geometry": {"type": "LineString", "coordinates": [[-10,-5],[25,-5],[60,-5]]}}
        ]
    }"#;
    std::fs::write(&path, content).unwrap();
    path
}

fn create_grid_json(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("grid.json");
    let content = r#"{
        "transformers": [{"id": "T1", "position": [25, -10], "rated_kva": 400}],
        "lines": [{"id": "L1", "coords": [[25,-10],[25,-5],[60,-5]]}]
    }"#;
    std::fs::write(&path, content).unwrap();
    path
}

/// Write all inputs and a YAML config with one DH and one HP scenario.
fn create_study(dir: &TempDir) -> PathBuf {
    create_buildings_json(dir);
    create_streets_geojson(dir);
    create_grid_json(dir);
    let path = dir.path().join("heatplan.yaml");
    let content = "\
inputs:
  buildings: buildings.json
  streets: streets.geojson
  grid: grid.json
report:
  study_area: Teststadt
workers: 2
scenarios:
  - name: district_heating
    type: DH
    description: Central biomass plant
  - name: heat_pumps
    type: HP
    params:
      cop: 3.2
";
    std::fs::write(&path, content).unwrap();
    path
}

fn init_db(dir: &TempDir) -> PathBuf {
    let db_path = dir.path().join("heatplan.redb");
    cmd_init(&db_path, false).unwrap();
    db_path
}

// =============================================================================
// INIT / STATUS TESTS
// =============================================================================

#[test]
fn test_init_creates_database() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("test.redb");

    let result = cmd_init(&db_path, false);
    assert!(result.is_ok());
    assert!(db_path.exists());
}

#[test]
fn test_init_fails_if_exists_without_force() {
    let temp = create_temp_dir();
    let db_path = init_db(&temp);

    let result = cmd_init(&db_path, false);
    assert!(result.is_err());
}

#[test]
fn test_init_succeeds_with_force() {
    let temp = create_temp_dir();
    let db_path = init_db(&temp);

    let result = cmd_init(&db_path, true);
    assert!(result.is_ok());
}

#[test]
fn test_status_empty_store() {
    let temp = create_temp_dir();
    let db_path = init_db(&temp);

    assert!(cmd_status(&db_path, false).is_ok());
    assert!(cmd_status(&db_path, true).is_ok());
}

#[test]
fn test_status_missing_database() {
    let temp = create_temp_dir();
    let result = cmd_status(&temp.path().join("missing.redb"), false);
    assert!(result.is_err());
}

// =============================================================================
// CONFIG TESTS
// =============================================================================

#[test]
fn test_missing_config_is_usage_error() {
    let temp = create_temp_dir();
    let result = load_config(&temp.path().join("nope.yaml"));
    assert!(matches!(result, Err(heatplan::cli::CliError::Usage(_))));
}

#[test]
fn test_config_paths_resolved_against_config_dir() {
    let temp = create_temp_dir();
    let config_path = create_study(&temp);

    let config = load_config(&config_path).unwrap();
    assert_eq!(config.inputs.buildings, Some(temp.path().join("buildings.json")));
    assert_eq!(config.workers, 2);
    assert_eq!(config.scenarios.len(), 2);
}

// =============================================================================
// PIPELINE STAGE TESTS
// =============================================================================

#[test]
fn test_prepare_writes_buildings() {
    let temp = create_temp_dir();
    let config_path = create_study(&temp);
    let out = temp.path().join("output");

    let result = cmd_prepare(&config_path, &out, true);
    assert!(result.is_ok());

    let text = std::fs::read_to_string(out.join("buildings_prepared.json")).unwrap();
    let rows: Vec<serde_json::Value> = serde_json::from_str(&text).unwrap();
    // B4 has no footprint
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r["design_load_kw"].as_f64().unwrap() > 0.0));
}

#[test]
fn test_profiles_writes_csv_per_building() {
    let temp = create_temp_dir();
    let config_path = create_study(&temp);
    let out = temp.path().join("output");

    let result = cmd_profiles(&config_path, &out, false);
    assert!(result.is_ok());

    let csv = std::fs::read_to_string(out.join("profiles").join("B1.csv")).unwrap();
    assert!(csv.starts_with("timestamp,load_kw\n"));
    let mut reader = csv::Reader::from_reader(csv.as_bytes());
    let first = reader.records().next().unwrap().unwrap();
    assert_eq!(&first[0], "2024-01-01 00:00");
    assert!(first[1].parse::<f64>().unwrap() >= 0.0);
    assert!(out.join("phase_summary.json").exists());
    assert!(out.join("consumption_stats.json").exists());
    assert!(out.join("profile_validation.json").exists());
}

#[test]
fn test_network_writes_outputs() {
    let temp = create_temp_dir();
    let config_path = create_study(&temp);
    let out = temp.path().join("output");

    let result = cmd_network(&config_path, &out, true);
    assert!(result.is_ok());
    assert!(out.join("network.json").exists());
    assert!(out.join("network_stats.json").exists());
    assert!(out.join("hydraulics.json").exists());
}

// =============================================================================
// SCENARIO / RUN / KPI TESTS
// =============================================================================

#[test]
fn test_scenarios_are_stored() {
    let temp = create_temp_dir();
    let config_path = create_study(&temp);
    let db_path = init_db(&temp);

    let result = cmd_scenarios(&config_path, &db_path, false);
    assert!(result.is_ok());

    let store = ResultStore::open(&db_path).unwrap();
    let scenarios = store.list_scenarios().unwrap();
    assert_eq!(scenarios.len(), 2);
    assert_eq!(scenarios[0].name, "district_heating");
    assert_eq!(scenarios[0].kind, ScenarioKind::DH);
    assert_eq!(scenarios[1].kind, ScenarioKind::HP);
    assert_eq!(scenarios[0].building_ids.len(), 3);
}

#[test]
fn test_run_without_scenarios_defines_them() {
    let temp = create_temp_dir();
    let config_path = create_study(&temp);
    let db_path = init_db(&temp);

    let result = cmd_run(&config_path, &db_path, Some(1), false);
    assert!(result.is_ok());

    let store = ResultStore::open(&db_path).unwrap();
    let status = store.status().unwrap();
    assert_eq!(status.scenarios, 2);
    assert_eq!(status.results, 2);
}

#[test]
fn test_results_follow_scenario_order() {
    let temp = create_temp_dir();
    let config_path = create_study(&temp);
    let db_path = init_db(&temp);
    let config = load_config(&config_path).unwrap();
    let store = ResultStore::open(&db_path).unwrap();

    let results = execute_scenarios(&config, &store, Some(2)).unwrap();
    let names: Vec<&str> = results.iter().map(|r| r.scenario.as_str()).collect();
    assert_eq!(names, vec!["district_heating", "heat_pumps"]);
    assert_eq!(results[0].kind, ScenarioKind::DH);
    assert!(results.iter().all(|r| r.success == r.kpi.is_some()));
}

#[test]
fn test_kpi_requires_results() {
    let temp = create_temp_dir();
    let config_path = create_study(&temp);
    let db_path = init_db(&temp);

    let result = cmd_kpi(&config_path, &db_path, &temp.path().join("output"), false);
    assert!(result.is_err());
}

#[test]
fn test_kpi_writes_csv() {
    let temp = create_temp_dir();
    let config_path = create_study(&temp);
    let db_path = init_db(&temp);
    let out = temp.path().join("output");

    cmd_run(&config_path, &db_path, None, true).unwrap();
    let result = cmd_kpi(&config_path, &db_path, &out, false);
    assert!(result.is_ok());

    let csv = std::fs::read_to_string(out.join("kpis.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("scenario,"));
    assert!(lines[1].contains("district_heating"));
}

#[test]
fn test_rerun_drops_stale_kpis() {
    let temp = create_temp_dir();
    let config_path = create_study(&temp);
    let db_path = init_db(&temp);
    let out = temp.path().join("output");

    cmd_run(&config_path, &db_path, None, true).unwrap();
    cmd_kpi(&config_path, &db_path, &out, true).unwrap();
    assert_eq!(ResultStore::open(&db_path).unwrap().status().unwrap().kpis, 2);

    cmd_run(&config_path, &db_path, None, true).unwrap();
    let status = ResultStore::open(&db_path).unwrap().status().unwrap();
    assert_eq!(status.results, 2);
    assert_eq!(status.kpis, 0);
}

// =============================================================================
// STREET TESTS
// =============================================================================

#[test]
fn test_streets_lists_buildings() {
    let temp = create_temp_dir();
    let config_path = create_study(&temp);
    let config = load_config(&config_path).unwrap();

    let streets = list_streets(&config).unwrap();
    assert_eq!(streets.len(), 2);
    assert_eq!(streets[0].street, "Hauptstrasse");
    assert_eq!(streets[0].building_ids, vec!["B1".into(), "B2".into()]);
    assert_eq!(streets[1].street, "Nebenweg");
    assert_eq!(streets[1].building_ids, vec!["B3".into()]);

    assert!(cmd_streets(&config_path, false).is_ok());
    assert!(cmd_streets(&config_path, true).is_ok());
}

#[test]
fn test_compare_street_ranks_both_technologies() {
    let temp = create_temp_dir();
    let config_path = create_study(&temp);
    let config = load_config(&config_path).unwrap();

    let comparison = compare_street(&config, "Hauptstrasse", Some(2)).unwrap();
    assert_eq!(comparison.street, "Hauptstrasse");
    let names: Vec<&str> = comparison.kpis.iter().map(|k| k.scenario.as_str()).collect();
    assert_eq!(names, vec!["Hauptstrasse_dh", "Hauptstrasse_hp"]);
    assert_eq!(comparison.kpis[0].kind, ScenarioKind::DH);
    assert_eq!(comparison.kpis[1].kind, ScenarioKind::HP);
    let cheapest = comparison.ranking.cheapest.clone().unwrap();
    assert!(names.contains(&cheapest.as_str()));
}

#[test]
fn test_compare_writes_json_and_leaves_store_alone() {
    let temp = create_temp_dir();
    let config_path = create_study(&temp);
    let db_path = init_db(&temp);
    let out = temp.path().join("output");

    let result = cmd_compare(&config_path, &out, "Hauptstrasse", None, false);
    assert!(result.is_ok());

    let json = std::fs::read_to_string(out.join("compare_Hauptstrasse.json")).unwrap();
    let body: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(body["kpis"].as_array().unwrap().len(), 2);
    assert!(body["ranking"].is_object());

    let status = ResultStore::open(&db_path).unwrap().status().unwrap();
    assert_eq!(status.scenarios, 0);
    assert_eq!(status.results, 0);
}

#[test]
fn test_compare_unknown_street_fails() {
    let temp = create_temp_dir();
    let config_path = create_study(&temp);

    let result = cmd_compare(&config_path, &temp.path().join("output"), "Ringstrasse", None, false);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("Ringstrasse"));
}

// =============================================================================
// REPORT TESTS
// =============================================================================

fn run_full_pipeline(temp: &TempDir) -> (PathBuf, PathBuf, PathBuf) {
    let config_path = create_study(temp);
    let db_path = init_db(temp);
    let out = temp.path().join("output");
    cmd_run(&config_path, &db_path, None, false).unwrap();
    cmd_kpi(&config_path, &db_path, &out, false).unwrap();
    (config_path, db_path, out)
}

#[test]
fn test_report_markdown() {
    let temp = create_temp_dir();
    let (config_path, db_path, out) = run_full_pipeline(&temp);

    let result = cmd_report(&config_path, &db_path, &out, "markdown", false);
    assert!(result.is_ok());

    let report = std::fs::read_to_string(out.join("report.md")).unwrap();
    assert!(report.starts_with("# Heat Planning Scenario Comparison"));
    assert!(report.contains("Teststadt"));
    assert!(report.contains("district_heating"));
    assert!(report.contains("heat_pumps"));
}

#[test]
fn test_report_markdown_per_scenario() {
    let temp = create_temp_dir();
    let (config_path, db_path, out) = run_full_pipeline(&temp);

    let result = cmd_report(&config_path, &db_path, &out, "md", true);
    assert!(result.is_ok());

    let report = std::fs::read_to_string(out.join("report.md")).unwrap();
    assert_eq!(report.matches("\n---\n").count(), 1);
    assert!(report.contains("# Heat Planning Scenario Comparison: district_heating"));
    assert!(report.contains("# Heat Planning Scenario Comparison: heat_pumps"));
    assert!(report.ends_with('\n'));
}

#[test]
fn test_report_text() {
    let temp = create_temp_dir();
    let (config_path, db_path, out) = run_full_pipeline(&temp);

    let result = cmd_report(&config_path, &db_path, &out, "text", false);
    assert!(result.is_ok());

    let report = std::fs::read_to_string(out.join("report.txt")).unwrap();
    assert!(report.starts_with("Heat Planning Scenario Comparison\n===="));
    assert!(!report.contains("**"));
}

#[test]
fn test_report_unknown_format() {
    let temp = create_temp_dir();
    let (config_path, db_path, out) = run_full_pipeline(&temp);

    let result = cmd_report(&config_path, &db_path, &out, "pdf", false);
    assert!(result.is_err());
}

// =============================================================================
// EXPORT / IMPORT TESTS
// =============================================================================

#[test]
fn test_export_import_binary() {
    let temp = create_temp_dir();
    let (_, db_path, _) = run_full_pipeline(&temp);
    let snapshot = temp.path().join("snapshot.hpln");

    assert!(cmd_export(&db_path, &snapshot, "binary").is_ok());

    let restored = temp.path().join("restored.redb");
    assert!(cmd_import(&restored, &snapshot).is_ok());

    let original = ResultStore::open(&db_path).unwrap();
    let copy = ResultStore::open(&restored).unwrap();
    assert_eq!(original.list_scenarios().unwrap(), copy.list_scenarios().unwrap());
    assert_eq!(original.list_results().unwrap(), copy.list_results().unwrap());
    assert_eq!(original.list_kpis().unwrap(), copy.list_kpis().unwrap());
}

#[test]
fn test_export_import_json() {
    let temp = create_temp_dir();
    let (_, db_path, _) = run_full_pipeline(&temp);
    let snapshot = temp.path().join("snapshot.json");

    assert!(cmd_export(&db_path, &snapshot, "json").is_ok());
    let text = std::fs::read_to_string(&snapshot).unwrap();
    assert!(text.contains("\"scenarios\""));

    let restored = temp.path().join("restored.redb");
    assert!(cmd_import(&restored, &snapshot).is_ok());
    let copy = ResultStore::open(&restored).unwrap();
    assert_eq!(copy.status().unwrap().kpis, 2);
}

#[test]
fn test_import_replaces_existing_contents() {
    let temp = create_temp_dir();
    let empty_db = init_db(&temp);
    let empty_snapshot = temp.path().join("empty.hpln");
    cmd_export(&empty_db, &empty_snapshot, "bin").unwrap();

    let other = create_temp_dir();
    let (_, full_db, _) = run_full_pipeline(&other);
    assert!(cmd_import(&full_db, &empty_snapshot).is_ok());

    let store = ResultStore::open(&full_db).unwrap();
    let status = store.status().unwrap();
    assert_eq!(status.scenarios, 0);
    assert_eq!(status.results, 0);
    assert_eq!(status.kpis, 0);
}

#[test]
fn test_export_csv() {
    let temp = create_temp_dir();
    let (_, db_path, _) = run_full_pipeline(&temp);
    let csv = temp.path().join("kpis.csv");

    assert!(cmd_export(&db_path, &csv, "csv").is_ok());
    let text = std::fs::read_to_string(&csv).unwrap();
    assert_eq!(text.lines().count(), 3);
}

#[test]
fn test_export_unknown_format() {
    let temp = create_temp_dir();
    let db_path = init_db(&temp);
    let result = cmd_export(&db_path, &temp.path().join("x"), "xml");
    assert!(result.is_err());
}

#[test]
fn test_import_rejects_garbage() {
    let temp = create_temp_dir();
    let input = temp.path().join("garbage.bin");
    std::fs::write(&input, [0xff, 0x00, 0x12]).unwrap();
    let result = cmd_import(&temp.path().join("db.redb"), &input);
    assert!(result.is_err());
}
