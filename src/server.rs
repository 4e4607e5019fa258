//! JSON HTTP API.
//!
//! Exposes the store, the radar layout, and the analyzer over HTTP for
//! dashboards and scripts. Each request opens its own short-lived pool.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/tools` | List active tools, filtered by query string |
//! | `GET`  | `/tools/search?q=` | Search tools |
//! | `GET`  | `/tools/{name}` | One tool |
//! | `POST` | `/tools` | Save an analysis |
//! | `POST` | `/analyze` | Analyze a description (no save) |
//! | `GET`  | `/stats` | Counts by position and category |
//! | `GET`  | `/radar` | Plotted radar points |
//! | `GET`  | `/export.csv?q=` | CSV download |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "tool not found: Zendesk" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `duplicate` (409),
//! `validation_error` (422), `upstream_error` (502),
//! `analyzer_unavailable` (503), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::analyzer::Analyzer;
use crate::config::Config;
use crate::error::AnalysisError;
use crate::export::{suggested_file_name, to_csv};
use crate::layout::{RadarLayout, RadarPoint};
use crate::llm::AnthropicClient;
use crate::models::{AddOutcome, NewTool, StoreStats, ToolAnalysis, ToolFilters, ToolRecord};
use crate::store::ToolStore;
use crate::validate::validate_analysis;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    /// `None` when no API key is configured; `/analyze` then answers 503.
    analyzer: Option<Arc<Analyzer>>,
}

impl AppState {
    pub fn new(config: Arc<Config>, analyzer: Option<Arc<Analyzer>>) -> Self {
        Self { config, analyzer }
    }
}

/// Build the router with all routes and the CORS layer.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/tools", get(handle_list).post(handle_add))
        .route("/tools/search", get(handle_search))
        .route("/tools/{name}", get(handle_get))
        .route("/analyze", post(handle_analyze))
        .route("/stats", get(handle_stats))
        .route("/radar", get(handle_radar))
        .route("/export.csv", get(handle_export_csv))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind` and runs until the process
/// is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let config = Arc::new(config.clone());

    let analyzer = match AnthropicClient::from_config(&config.llm) {
        Ok(client) => Some(Arc::new(Analyzer::new(Box::new(client), config.clone()))),
        Err(e) => {
            tracing::warn!(error = %e, "analysis disabled, POST /analyze will return 503");
            None
        }
    };

    let app = router(AppState::new(config, analyzer));

    tracing::info!(bind = %bind_addr, "server listening");
    println!("Tech radar API listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!(error = %format!("{:#}", err), "request failed");
        AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", format!("{:#}", err))
    }
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Validation(_) => {
                AppError::new(StatusCode::UNPROCESSABLE_ENTITY, "validation_error", err.to_string())
            }
            AnalysisError::Remote { .. } | AnalysisError::Parse { .. } => {
                AppError::new(StatusCode::BAD_GATEWAY, "upstream_error", err.to_string())
            }
        }
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::BAD_REQUEST, "bad_request", message)
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::NOT_FOUND, "not_found", message)
}

type ApiResult<T> = Result<T, AppError>;

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Tools ============

async fn handle_list(
    State(state): State<AppState>,
    Query(filters): Query<ToolFilters>,
) -> ApiResult<Json<Vec<ToolRecord>>> {
    let store = ToolStore::open(&state.config).await?;
    let tools = store.get_all(&filters).await;
    store.close().await;
    Ok(Json(tools?))
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<ToolRecord>>> {
    if params.q.trim().is_empty() {
        return Err(bad_request("q must not be empty"));
    }
    let store = ToolStore::open(&state.config).await?;
    let tools = store.search(&params.q).await;
    store.close().await;
    Ok(Json(tools?))
}

async fn handle_get(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<ToolRecord>> {
    let store = ToolStore::open(&state.config).await?;
    let tool = store.get_by_name(&name).await;
    store.close().await;
    match tool? {
        Some(t) => Ok(Json(t)),
        None => Err(not_found(format!("tool not found: {}", name))),
    }
}

#[derive(Deserialize)]
struct AddRequest {
    analysis: serde_json::Value,
    #[serde(default)]
    source_url: String,
}

#[derive(Serialize)]
struct AddResponse {
    id: i64,
}

/// Saves a client-supplied analysis. The body goes through the same
/// validation as a model reply, so scores are clamped and the overall
/// score is recomputed.
async fn handle_add(
    State(state): State<AppState>,
    Json(req): Json<AddRequest>,
) -> ApiResult<(StatusCode, Json<AddResponse>)> {
    let analysis = validate_analysis(&req.analysis, &state.config)?;
    let name = analysis.name.clone();

    let store = ToolStore::open(&state.config).await?;
    let outcome = store.add_tool(&NewTool::new(analysis, req.source_url)).await;
    store.close().await;

    match outcome? {
        AddOutcome::Added(id) => Ok((StatusCode::CREATED, Json(AddResponse { id }))),
        AddOutcome::Duplicate => Err(AppError::new(
            StatusCode::CONFLICT,
            "duplicate",
            format!("a tool named '{}' already exists", name),
        )),
    }
}

// ============ POST /analyze ============

#[derive(Deserialize)]
struct AnalyzeRequest {
    content: String,
    #[serde(default)]
    source_url: String,
}

async fn handle_analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> ApiResult<Json<ToolAnalysis>> {
    let analyzer = state.analyzer.as_ref().ok_or_else(|| {
        AppError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "analyzer_unavailable",
            format!("{} is not set on the server", state.config.llm.api_key_env),
        )
    })?;

    if req.content.trim().is_empty() {
        return Err(bad_request("content must not be empty"));
    }

    let analysis = analyzer.analyze(&req.content, &req.source_url).await?;
    Ok(Json(analysis))
}

// ============ Stats, radar, export ============

async fn handle_stats(State(state): State<AppState>) -> ApiResult<Json<StoreStats>> {
    let store = ToolStore::open(&state.config).await?;
    let stats = store.stats().await;
    store.close().await;
    Ok(Json(stats?))
}

async fn handle_radar(
    State(state): State<AppState>,
    Query(filters): Query<ToolFilters>,
) -> ApiResult<Json<Vec<RadarPoint>>> {
    let store = ToolStore::open(&state.config).await?;
    let tools = store.get_all(&filters).await;
    store.close().await;

    let layout = RadarLayout::new(&state.config);
    Ok(Json(layout.plot_all(&tools?)))
}

#[derive(Deserialize)]
struct ExportParams {
    q: Option<String>,
}

async fn handle_export_csv(
    State(state): State<AppState>,
    Query(params): Query<ExportParams>,
) -> ApiResult<Response> {
    let query = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty());

    let store = ToolStore::open(&state.config).await?;
    let tools = match query {
        Some(q) => store.search(q).await,
        None => store.get_all(&ToolFilters::default()).await,
    };
    store.close().await;

    let body = to_csv(&tools?);
    let disposition = format!(
        "attachment; filename=\"{}\"",
        suggested_file_name(query, "csv")
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
