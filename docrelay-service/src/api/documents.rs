//! Document read endpoints: listing, lookup, status polling, and the
//! cursor-based update feed consumed by downstream indexers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::{Document, DocumentStatus};
use crate::error::ServiceError;

use super::AppState;

/// List documents query parameters
#[derive(Deserialize)]
pub struct ListDocumentsParams {
    pub status: Option<String>,
    pub name: Option<String>,
}

/// Update feed query parameters
#[derive(Deserialize)]
pub struct UpdatesParams {
    pub cursor: Option<String>,
    pub limit: Option<usize>,
}

/// Compact lifecycle view for status polling
#[derive(Serialize)]
pub struct StatusResponse {
    pub id: String,
    pub status: DocumentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub attempt_count: u32,
    pub updated_at: DateTime<Utc>,
}

/// Page of the update feed; pass `next_cursor` back to continue
#[derive(Serialize)]
pub struct UpdatesResponse {
    pub documents: Vec<Document>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// List documents, optionally filtered by status and/or source name
pub async fn list_documents_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListDocumentsParams>,
) -> Result<Json<Vec<Document>>, ServiceError> {
    let status = match params.status.as_deref() {
        Some(s) => Some(
            DocumentStatus::parse(s).ok_or_else(|| ServiceError::InvalidRequest {
                message: format!("unknown status filter: {s}"),
            })?,
        ),
        None => None,
    };

    let documents = state
        .service
        .list_documents(status, params.name.as_deref())?;
    Ok(Json(documents))
}

/// Fetch one document by id
pub async fn get_document_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Document>, ServiceError> {
    let document =
        state
            .service
            .get_document(&id)?
            .ok_or_else(|| ServiceError::DocumentNotFound {
                document_id: id.clone(),
            })?;
    Ok(Json(document))
}

/// Lifecycle status for one document
pub async fn get_status_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, ServiceError> {
    let document =
        state
            .service
            .get_document(&id)?
            .ok_or_else(|| ServiceError::DocumentNotFound {
                document_id: id.clone(),
            })?;

    Ok(Json(StatusResponse {
        id: document.id,
        status: document.status,
        error: document.error,
        attempt_count: document.attempt_count,
        updated_at: document.updated_at,
    }))
}

/// Documents created after the cursor, oldest first
pub async fn updates_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UpdatesParams>,
) -> Result<Json<UpdatesResponse>, ServiceError> {
    let documents = state
        .service
        .updates_since(params.cursor.as_deref(), params.limit)?;
    let next_cursor = documents.last().map(|d| d.id.clone());

    Ok(Json(UpdatesResponse {
        documents,
        next_cursor,
    }))
}
