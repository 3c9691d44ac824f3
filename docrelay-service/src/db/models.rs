//! Database model structs.
//!
//! This module contains the document record and its lifecycle state machine.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, Type, ValueRef};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a tracked document.
///
/// Forward edges only, plus the `failed -> queued` retry edge. Legality is
/// ultimately enforced by the store's conditional update; `can_transition_to`
/// exists so illegal edges are rejected before touching the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Eligible for pickup by the processing pipeline
    Queued,
    /// Source bytes are being fetched from storage
    Downloading,
    /// Bytes handed to the conversion service, awaiting markdown
    Converting,
    /// Converted content is being written to the destination
    Uploading,
    /// Terminal: destination key set, error cleared
    Completed,
    /// Terminal once the retry budget is exhausted
    Failed,
}

impl DocumentStatus {
    pub const ALL: [DocumentStatus; 6] = [
        DocumentStatus::Queued,
        DocumentStatus::Downloading,
        DocumentStatus::Converting,
        DocumentStatus::Uploading,
        DocumentStatus::Completed,
        DocumentStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Queued => "queued",
            DocumentStatus::Downloading => "downloading",
            DocumentStatus::Converting => "converting",
            DocumentStatus::Uploading => "uploading",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
        }
    }

    /// Parse a status string. Unknown values are rejected rather than
    /// defaulted; the status column is a closed enumeration.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(DocumentStatus::Queued),
            "downloading" => Some(DocumentStatus::Downloading),
            "converting" => Some(DocumentStatus::Converting),
            "uploading" => Some(DocumentStatus::Uploading),
            "completed" => Some(DocumentStatus::Completed),
            "failed" => Some(DocumentStatus::Failed),
            _ => None,
        }
    }

    /// No further automatic transitions occur from a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DocumentStatus::Completed | DocumentStatus::Failed)
    }

    /// A document in one of these states is owned by a pipeline run.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            DocumentStatus::Downloading | DocumentStatus::Converting | DocumentStatus::Uploading
        )
    }

    pub fn can_transition_to(&self, to: DocumentStatus) -> bool {
        use DocumentStatus::*;
        matches!(
            (self, to),
            (Queued, Downloading)
                | (Downloading, Converting)
                | (Converting, Uploading)
                | (Uploading, Completed)
                | (Queued, Failed)
                | (Downloading, Failed)
                | (Converting, Failed)
                | (Uploading, Failed)
                | (Failed, Queued)
        )
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromSql for DocumentStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        DocumentStatus::parse(s)
            .ok_or_else(|| FromSqlError::Other(format!("unknown document status: {s}").into()))
    }
}

/// Document record: one row per (original_name, version) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// UUIDv7, minted once per row; lexicographic order follows creation time
    pub id: String,
    /// Source object key as seen in the bucket; immutable
    pub original_name: String,
    /// Object-storage location the bytes are fetched from
    pub source_key: String,
    /// Set if and only if status is completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_key: Option<String>,
    /// Change-detection fingerprint of the source object
    pub content_fingerprint: String,
    /// Bumped each time a new fingerprint is seen for the same name
    pub version: i64,
    pub status: DocumentStatus,
    /// Last failure description; cleared on completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Transient failures consumed in the current processing cycle
    pub attempt_count: u32,
    /// Earliest instant the next retry may be admitted (backoff)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub(crate) fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let not_before_str: Option<String> = row.get(9)?;
        let created_at_str: String = row.get(10)?;
        let updated_at_str: String = row.get(11)?;
        let attempt_count: i64 = row.get(8)?;

        Ok(Self {
            id: row.get(0)?,
            original_name: row.get(1)?,
            source_key: row.get(2)?,
            destination_key: row.get(3)?,
            content_fingerprint: row.get(4)?,
            version: row.get(5)?,
            status: row.get(6)?,
            error: row.get(7)?,
            attempt_count: attempt_count as u32,
            not_before: not_before_str
                .as_deref()
                .map(|s| parse_timestamp(9, s))
                .transpose()?,
            created_at: parse_timestamp(10, &created_at_str)?,
            updated_at: parse_timestamp(11, &updated_at_str)?,
        })
    }
}

/// A timestamp that fails to parse means the row is corrupt; surface that
/// instead of substituting a fabricated time.
fn parse_timestamp(column: usize, value: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}
