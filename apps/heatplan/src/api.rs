//! # HTTP API
//!
//! Read access to the result store plus a `POST /run` trigger.
//!
//! | Method | Path                      | Body                                  |
//! |--------|---------------------------|---------------------------------------|
//! | GET    | `/health`                 | `{status, version}`                   |
//! | GET    | `/status`                 | store row counts                      |
//! | GET    | `/scenarios`              | stored scenarios                      |
//! | GET    | `/results/{name}`         | one simulation result                 |
//! | GET    | `/kpis`                   | KPI records                           |
//! | GET    | `/report`                 | Markdown (`?format=text` for text)    |
//! | GET    | `/streets`                | street names with building ids        |
//! | GET    | `/streets/{name}/compare` | DH vs. HP for one street, not stored  |
//! | POST   | `/run`                    | runs scenarios and KPIs (`?workers=`) |

use crate::cli::{
    CliError, ReportFormat, StreetComparison, compare_street, compute_and_store_kpis,
    execute_scenarios, list_streets, render_report,
};
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use heatplan_core::building::StreetBuildings;
use heatplan_core::kpi::KpiRecord;
use heatplan_core::scenario::Scenario;
use heatplan_core::simulation::SimulationResult;
use heatplan_core::storage::StoreStatus;
use heatplan_core::{HeatplanError, ResultStore, StudyConfig};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

// =============================================================================
// STATE
// =============================================================================

/// Shared server state. Cloning shares the store.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ResultStore>,
    pub config: Option<Arc<StudyConfig>>,
    /// Serialises `POST /run` requests.
    run_lock: Arc<Mutex<()>>,
}

impl AppState {
    #[must_use]
    pub fn new(store: ResultStore, config: Option<StudyConfig>) -> Self {
        Self {
            store: Arc::new(store),
            config: config.map(Arc::new),
            run_lock: Arc::new(Mutex::new(())),
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal(String),
}

impl From<HeatplanError> for ApiError {
    fn from(err: HeatplanError) -> Self {
        match err {
            HeatplanError::InvalidInput(_)
            | HeatplanError::MissingData(_)
            | HeatplanError::UnknownScenarioType(_) => Self::BadRequest(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<CliError> for ApiError {
    fn from(err: CliError) -> Self {
        match err {
            CliError::Core(inner) => inner.into(),
            CliError::Usage(msg) => Self::BadRequest(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(m) => (StatusCode::NOT_FOUND, m),
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            Self::Conflict(m) => (StatusCode::CONFLICT, m),
            Self::Internal(m) => {
                error!("internal error: {m}");
                (StatusCode::INTERNAL_SERVER_ERROR, m)
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// HANDLERS
// =============================================================================

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn status_handler(State(state): State<AppState>) -> ApiResult<Json<StoreStatus>> {
    Ok(Json(state.store.status()?))
}

async fn scenarios_handler(State(state): State<AppState>) -> ApiResult<Json<Vec<Scenario>>> {
    Ok(Json(state.store.list_scenarios()?))
}

async fn result_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<SimulationResult>> {
    state
        .store
        .get_result(&name)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no result for scenario '{name}'")))
}

async fn kpis_handler(State(state): State<AppState>) -> ApiResult<Json<Vec<KpiRecord>>> {
    Ok(Json(state.store.list_kpis()?))
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub format: Option<String>,
    #[serde(default)]
    pub per_scenario: bool,
}

async fn report_handler(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Response> {
    let format: ReportFormat = query.format.as_deref().unwrap_or("markdown").parse()?;
    let config = state.config.as_deref().cloned().unwrap_or_default();
    let body = render_report(&config, &state.store, format, query.per_scenario)?;
    let content_type = match format {
        ReportFormat::Markdown => "text/markdown; charset=utf-8",
        ReportFormat::Text => "text/plain; charset=utf-8",
    };
    Ok(([(header::CONTENT_TYPE, content_type)], body).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct RunQuery {
    pub workers: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunResponse {
    pub results: usize,
    pub successful: usize,
    pub kpis: Vec<KpiRecord>,
}

fn study_config(state: &AppState) -> ApiResult<Arc<StudyConfig>> {
    state
        .config
        .clone()
        .ok_or_else(|| ApiError::BadRequest("server started without a study config".to_string()))
}

async fn run_handler(
    State(state): State<AppState>,
    Query(query): Query<RunQuery>,
) -> ApiResult<(StatusCode, Json<RunResponse>)> {
    let config = study_config(&state)?;
    let Ok(_guard) = state.run_lock.try_lock() else {
        return Err(ApiError::Conflict("a run is already in progress".to_string()));
    };

    info!(workers = ?query.workers, "run requested");
    let store = Arc::clone(&state.store);
    let outcome = tokio::task::spawn_blocking(move || {
        let results = execute_scenarios(&config, &store, query.workers)?;
        let kpis = compute_and_store_kpis(&config, &store)?;
        Ok::<_, CliError>((results, kpis))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("run task failed: {e}")))?;
    let (results, kpis) = outcome?;

    Ok((
        StatusCode::OK,
        Json(RunResponse {
            results: results.len(),
            successful: results.iter().filter(|r| r.success).count(),
            kpis,
        }),
    ))
}

async fn streets_handler(State(state): State<AppState>) -> ApiResult<Json<Vec<StreetBuildings>>> {
    let config = study_config(&state)?;
    let streets = tokio::task::spawn_blocking(move || list_streets(&config))
        .await
        .map_err(|e| ApiError::Internal(format!("streets task failed: {e}")))??;
    Ok(Json(streets))
}

async fn compare_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<RunQuery>,
) -> ApiResult<Json<StreetComparison>> {
    let config = study_config(&state)?;
    let outcome = tokio::task::spawn_blocking(move || compare_street(&config, &name, query.workers))
        .await
        .map_err(|e| ApiError::Internal(format!("compare task failed: {e}")))?;
    match outcome {
        Ok(comparison) => Ok(Json(comparison)),
        Err(CliError::Core(HeatplanError::MissingData(msg))) => Err(ApiError::NotFound(msg)),
        Err(other) => Err(other.into()),
    }
}

// =============================================================================
// ROUTER / SERVER
// =============================================================================

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/scenarios", get(scenarios_handler))
        .route("/results/{name}", get(result_handler))
        .route("/kpis", get(kpis_handler))
        .route("/report", get(report_handler))
        .route("/streets", get(streets_handler))
        .route("/streets/{name}/compare", get(compare_handler))
        .route("/run", post(run_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}

/// Bind and serve until Ctrl-C.
pub async fn serve(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let app = create_router(state);
    let listener = TcpListener::bind(addr).await?;
    info!("heatplan API listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}
