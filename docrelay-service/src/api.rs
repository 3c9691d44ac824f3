//! HTTP API for the docrelay service.
//!
//! Endpoints:
//! - Health and status summary
//! - Document listing, lookup, and the incremental update feed
//! - Processing triggers (by name, by id, full scan)

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::db::StatusCount;
use crate::error::ServiceError;
use crate::service::RelayService;

pub mod documents;
pub mod processing;

use documents::{
    get_document_handler, get_status_handler, list_documents_handler, updates_handler,
};
use processing::{scan_handler, trigger_by_id_handler, trigger_by_name_handler};

/// Application state
pub struct AppState {
    pub service: Arc<RelayService>,
}

/// Build the API router
pub fn router(service: Arc<RelayService>) -> Router {
    let state = Arc::new(AppState { service });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/documents", get(list_documents_handler))
        .route("/documents/{id}", get(get_document_handler))
        .route("/documents/{id}/status", get(get_status_handler))
        .route("/documents/{id}/process", post(trigger_by_id_handler))
        .route("/process", post(trigger_by_name_handler))
        .route("/scan", post(scan_handler))
        .route("/updates", get(updates_handler));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// === Health ===

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: String,
    uptime_seconds: i64,
    documents: Vec<StatusCount>,
}

async fn health_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, ServiceError> {
    let documents = state.service.status_counts()?;

    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.service.uptime_secs(),
        documents,
    }))
}
