//! Integration tests for the heatplan HTTP API.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::StatusCode;
use axum_test::TestServer;
use heatplan::api::{AppState, RunResponse, create_router};
use heatplan::cli::StreetComparison;
use heatplan_core::{ResultStore, StudyConfig};
use serde_json::Value;
use tempfile::TempDir;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Two buildings on one street with a transformer next to them.
fn create_config(dir: &TempDir) -> StudyConfig {
    let buildings = dir.path().join("buildings.json");
    std::fs::write(
        &buildings,
        r#"[
            {"GebaeudeID": "A", "Gebaeudecode": 1010, "Baujahr": 1978, "Strasse": "Ringweg",
             "footprint": [[0,0],[12,0],[12,9],[0,9]],
             "Haushaltsverteilung": [{"einwohner": 4}]},
            {"GebaeudeID": "B", "Gebaeudecode": 1010, "Baujahr": 1999, "Strasse": "Ringweg",
             "footprint": [[30,0],[40,0],[40,10],[30,10]],
             "Haushaltsverteilung": [{"einwohner": 2}]}
        ]"#,
    )
    .unwrap();
    let streets = dir.path().join("streets.json");
    std::fs::write(
        &streets,
        r#"[{"name": "Ringweg", "coords": [[-5,-4],[50,-4]]}]"#,
    )
    .unwrap();
    let grid = dir.path().join("grid.json");
    std::fs::write(
        &grid,
        r#"{"transformers": [{"id": "T1", "position": [20, -8], "rated_kva": 250}], "lines": []}"#,
    )
    .unwrap();

    let yaml = "\
scenarios:
  - name: dh
    type: DH
  - name: hp
    type: HP
";
    let mut config = StudyConfig::from_yaml(yaml).unwrap();
    config.inputs.buildings = Some(buildings);
    config.inputs.streets = Some(streets);
    config.inputs.grid = Some(grid);
    config
}

fn create_server(dir: &TempDir, config: Option<StudyConfig>) -> TestServer {
    let store = ResultStore::create(&dir.path().join("api.redb")).unwrap();
    TestServer::new(create_router(AppState::new(store, config))).unwrap()
}

// =============================================================================
// READ ENDPOINTS
// =============================================================================

#[tokio::test]
async fn test_health() {
    let temp = create_temp_dir();
    let server = create_server(&temp, None);

    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_status_empty_store() {
    let temp = create_temp_dir();
    let server = create_server(&temp, None);

    let response = server.get("/status").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["scenarios"], 0);
    assert_eq!(body["kpis"], 0);
}

#[tokio::test]
async fn test_empty_lists() {
    let temp = create_temp_dir();
    let server = create_server(&temp, None);

    let scenarios: Vec<Value> = server.get("/scenarios").await.json();
    assert!(scenarios.is_empty());
    let kpis: Vec<Value> = server.get("/kpis").await.json();
    assert!(kpis.is_empty());
}

#[tokio::test]
async fn test_missing_result_is_not_found() {
    let temp = create_temp_dir();
    let server = create_server(&temp, None);

    let response = server.get("/results/nothing").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("nothing"));
}

#[tokio::test]
async fn test_report_without_kpis_is_bad_request() {
    let temp = create_temp_dir();
    let server = create_server(&temp, None);

    server
        .get("/report")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

// =============================================================================
// RUN
// =============================================================================

#[tokio::test]
async fn test_run_requires_config() {
    let temp = create_temp_dir();
    let server = create_server(&temp, None);

    let response = server.post("/run").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_run_then_read_back() {
    let temp = create_temp_dir();
    let config = create_config(&temp);
    let server = create_server(&temp, Some(config));

    let response = server.post("/run").add_query_param("workers", 2).await;
    response.assert_status_ok();
    let run: RunResponse = response.json();
    assert_eq!(run.results, 2);
    assert_eq!(run.kpis.len(), 2);
    assert_eq!(run.kpis[0].scenario, "dh");
    assert_eq!(run.kpis[1].scenario, "hp");

    let status: Value = server.get("/status").await.json();
    assert_eq!(status["scenarios"], 2);
    assert_eq!(status["results"], 2);
    assert_eq!(status["kpis"], 2);

    let result = server.get("/results/dh").await;
    result.assert_status_ok();
    let body: Value = result.json();
    assert_eq!(body["scenario"], "dh");
    assert_eq!(body["kind"], "DH");

    let report = server.get("/report").await;
    report.assert_status_ok();
    let text = report.text();
    assert!(text.starts_with("# Heat Planning Scenario Comparison"));
    assert!(text.contains("dh"));

    let plain = server.get("/report").add_query_param("format", "text").await;
    plain.assert_status_ok();
    assert!(plain.text().contains("====="));
}

#[tokio::test]
async fn test_report_unknown_format() {
    let temp = create_temp_dir();
    let config = create_config(&temp);
    let server = create_server(&temp, Some(config));

    server.post("/run").await.assert_status_ok();
    server
        .get("/report")
        .add_query_param("format", "pdf")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

// =============================================================================
// STREETS
// =============================================================================

#[tokio::test]
async fn test_streets_requires_config() {
    let temp = create_temp_dir();
    let server = create_server(&temp, None);

    server
        .get("/streets")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_streets_lists_buildings() {
    let temp = create_temp_dir();
    let config = create_config(&temp);
    let server = create_server(&temp, Some(config));

    let response = server.get("/streets").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["street"], "Ringweg");
    assert_eq!(body[0]["building_ids"], serde_json::json!(["A", "B"]));
}

#[tokio::test]
async fn test_compare_street() {
    let temp = create_temp_dir();
    let config = create_config(&temp);
    let server = create_server(&temp, Some(config));

    let response = server
        .get("/streets/Ringweg/compare")
        .add_query_param("workers", 2)
        .await;
    response.assert_status_ok();
    let comparison: StreetComparison = response.json();
    assert_eq!(comparison.street, "Ringweg");
    assert_eq!(comparison.kpis.len(), 2);
    assert_eq!(comparison.kpis[0].scenario, "Ringweg_dh");
    assert_eq!(comparison.kpis[1].scenario, "Ringweg_hp");

    // Nothing is stored.
    let status: Value = server.get("/status").await.json();
    assert_eq!(status["results"], 0);
}

#[tokio::test]
async fn test_compare_unknown_street_is_not_found() {
    let temp = create_temp_dir();
    let config = create_config(&temp);
    let server = create_server(&temp, Some(config));

    let response = server.get("/streets/Lindenallee/compare").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("Lindenallee"));
}
