//! HTTP surface — thin request/response mapping over the orchestrator.
//!
//! Routes are rooted at `/v1/dream` plus a root-level health check. Client
//! errors (unknown dream, insufficient concepts, bad pagination) surface
//! with descriptive messages; generation and storage failures are logged in
//! full server-side and become generic 500s.

use crate::dream::{Concept, Dream, DreamError, DreamId, DreamOrchestrator, DreamPage};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// Shared handler state
pub type AppState = Arc<DreamOrchestrator>;

/// Default page size for dream listings
const DEFAULT_LIMIT: u64 = 20;

/// Largest allowed page size
const MAX_LIMIT: u64 = 100;

/// Build the application router.
pub fn router(orchestrator: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/v1/dream/new", get(new_dream))
        .route("/v1/dream/list", get(list_dreams))
        .route("/v1/dream/start", post(start_dream))
        .route("/v1/dream/:dream_id", get(get_dream))
        .route("/v1/dream/:dream_id/continue", post(continue_dream))
        .with_state(orchestrator)
}

/// Bind the given address and serve the API until the process exits.
pub async fn run_server(addr: &str, orchestrator: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router(orchestrator)).await
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GeneratedConcept {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct DreamCreateResponse {
    pub concepts: Vec<GeneratedConcept>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct DreamGetResponse {
    pub dream: Dream,
    pub concepts: Vec<Concept>,
}

#[derive(Debug, Deserialize)]
pub struct DreamStartRequest {
    pub concept_1: String,
    pub concept_2: String,
}

#[derive(Debug, Serialize)]
pub struct DreamStartResponse {
    pub success: bool,
    pub dream_id: DreamId,
}

#[derive(Debug, Serialize)]
pub struct DreamContinueResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub message: &'static str,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map an orchestrator error to its HTTP form.
///
/// `context` names the failed operation for the generic 500 message.
fn error_response(err: DreamError, context: &str) -> ApiError {
    match err {
        DreamError::DreamNotFound(_) => {
            (StatusCode::NOT_FOUND, Json(ErrorResponse::new(err.to_string())))
        }
        DreamError::InsufficientConcepts { .. } => {
            (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(err.to_string())))
        }
        DreamError::Generation(_) | DreamError::Storage(_) => {
            error!("error while {context}: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(format!("Failed to {context}"))),
            )
        }
    }
}

fn not_found(dream_id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(format!(
            "Dream with id {dream_id} not found"
        ))),
    )
}

/// Resolve pagination parameters against their bounds.
fn resolve_page_params(params: &ListParams) -> Result<(u64, u64), String> {
    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);

    if limit < 1 || limit > MAX_LIMIT {
        return Err(format!("limit must be between 1 and {MAX_LIMIT}"));
    }
    Ok((offset, limit))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health(State(orchestrator): State<AppState>) -> Json<HealthResponse> {
    let healthy = orchestrator.check_storage();
    Json(if healthy {
        HealthResponse {
            status: "healthy",
            database: "connected",
            message: "All systems operational",
        }
    } else {
        HealthResponse {
            status: "unhealthy",
            database: "disconnected",
            message: "Database connection failed",
        }
    })
}

async fn new_dream(
    State(orchestrator): State<AppState>,
) -> Result<Json<DreamCreateResponse>, ApiError> {
    let (first, second) = orchestrator
        .preview_new_dream()
        .await
        .map_err(|e| error_response(e, "generate concepts"))?;

    Ok(Json(DreamCreateResponse {
        concepts: vec![
            GeneratedConcept { content: first },
            GeneratedConcept { content: second },
        ],
    }))
}

async fn list_dreams(
    State(orchestrator): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<DreamPage>, ApiError> {
    let (offset, limit) = resolve_page_params(&params)
        .map_err(|msg| (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(msg))))?;

    let page = orchestrator
        .list_dreams(offset, limit)
        .map_err(|e| error_response(e, "list dreams"))?;

    info!(
        "listed {} dreams (total: {}, has_more: {})",
        page.dreams.len(),
        page.total_count,
        page.has_more
    );
    Ok(Json(page))
}

async fn get_dream(
    State(orchestrator): State<AppState>,
    Path(dream_id): Path<String>,
) -> Result<Json<DreamGetResponse>, ApiError> {
    // A malformed id cannot name any dream, so it maps to 404 like an
    // unknown one
    let id = DreamId::parse(&dream_id).ok_or_else(|| not_found(&dream_id))?;

    let (dream, concepts) = orchestrator
        .get_dream(id)
        .map_err(|e| error_response(e, "retrieve dream"))?;

    info!("retrieved dream {id} with {} concepts", concepts.len());
    Ok(Json(DreamGetResponse { dream, concepts }))
}

async fn start_dream(
    State(orchestrator): State<AppState>,
    Json(request): Json<DreamStartRequest>,
) -> Result<Json<DreamStartResponse>, ApiError> {
    let dream_id = orchestrator
        .start_dream(request.concept_1, request.concept_2)
        .await
        .map_err(|e| error_response(e, "start dream"))?;

    Ok(Json(DreamStartResponse {
        success: true,
        dream_id,
    }))
}

async fn continue_dream(
    State(orchestrator): State<AppState>,
    Path(dream_id): Path<String>,
) -> Result<Json<DreamContinueResponse>, ApiError> {
    let id = DreamId::parse(&dream_id).ok_or_else(|| not_found(&dream_id))?;

    orchestrator
        .continue_dream(id)
        .await
        .map_err(|e| error_response(e, "continue dream"))?;

    Ok(Json(DreamContinueResponse { success: true }))
}
