//! HTTP route handlers for the search API.

use crate::engine::{RankedResult, SearchResponse};
use crate::error::SearchError;
use crate::server::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

// --- Request/Response types ---

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub k: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchHit {
    pub rank: usize,
    pub id: usize,
    pub distance: f32,
    pub title: String,
    pub summary: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResultsResponse {
    pub results: Vec<SearchHit>,
    pub elapsed_seconds: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub vector_count: usize,
    pub dimension: usize,
    pub metric: String,
    pub index: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

impl From<RankedResult> for SearchHit {
    fn from(r: RankedResult) -> Self {
        Self {
            rank: r.rank,
            id: r.id,
            distance: r.distance,
            title: r.payload.title,
            summary: r.payload.summary,
        }
    }
}

impl From<SearchResponse> for SearchResultsResponse {
    fn from(response: SearchResponse) -> Self {
        Self {
            elapsed_seconds: response.elapsed_seconds(),
            results: response.results.into_iter().map(SearchHit::from).collect(),
        }
    }
}

fn error_response(status: StatusCode, error: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

fn status_for(e: &SearchError) -> StatusCode {
    if e.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

// --- Router ---

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/search", post(search))
        .route("/health", get(health))
        .with_state(state)
}

// --- Handlers ---

async fn search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResultsResponse>, ApiError> {
    let engine = state.engine.clone();
    let k = req.k.unwrap_or_else(|| engine.default_k());

    // Encoding and scanning are CPU-bound; keep them off the async workers.
    let outcome = tokio::task::spawn_blocking(move || match req.k {
        Some(k) => engine.search(&req.query, k),
        None => engine.search_default(&req.query),
    })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "search task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "search task failed")
        })?;

    match outcome {
        Ok(response) => {
            tracing::debug!(
                k,
                hits = response.results.len(),
                elapsed_us = response.elapsed.as_micros() as u64,
                "search served"
            );
            Ok(Json(response.into()))
        }
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                tracing::error!(error = %e, "search failed");
            }
            Err(error_response(status, e))
        }
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let engine = &state.engine;
    Json(HealthResponse {
        status: "ok".to_string(),
        vector_count: engine.len(),
        dimension: engine.dimension(),
        metric: engine.metric().to_string(),
        index: engine.index().kind().to_string(),
    })
}
