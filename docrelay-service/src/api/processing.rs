//! Processing trigger endpoints.
//!
//! Triggers record intent in the document store and nudge the scheduler;
//! actual processing always happens inside the bounded worker pool. The scan
//! endpoint is the exception: it runs a full cycle inline and reports what
//! the cycle did.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::DocumentStatus;
use crate::error::ServiceError;
use crate::poller::CycleSummary;

use super::AppState;

/// Trigger-by-name request body
#[derive(Deserialize)]
pub struct TriggerRequest {
    pub name: String,
}

#[derive(Serialize)]
pub struct TriggerResponse {
    pub document_id: String,
    pub status: DocumentStatus,
    pub version: i64,
}

/// Queue processing for a named source object
pub async fn trigger_by_name_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TriggerRequest>,
) -> Result<Json<TriggerResponse>, ServiceError> {
    if request.name.trim().is_empty() {
        return Err(ServiceError::InvalidRequest {
            message: "name must not be empty".to_string(),
        });
    }

    let document = state.service.trigger_by_name(&request.name).await?;
    Ok(Json(TriggerResponse {
        document_id: document.id,
        status: document.status,
        version: document.version,
    }))
}

/// Re-trigger processing for a known document
pub async fn trigger_by_id_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TriggerResponse>, ServiceError> {
    let document = state.service.trigger_by_id(&id)?;
    Ok(Json(TriggerResponse {
        document_id: document.id,
        status: document.status,
        version: document.version,
    }))
}

/// Run one full discovery-and-admission cycle inline
pub async fn scan_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CycleSummary>, ServiceError> {
    let summary = state.service.run_scan().await?;
    Ok(Json(summary))
}
