//! Document store operations.
//!
//! `upsert_candidate` is the dedup control point for discovery and
//! `transition` is the optimistic lock that guarantees at-most-one pipeline
//! run can advance a given document. Both hold the connection mutex for the
//! duration of the lookup-plus-write, which serializes concurrent callers.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use uuid::Uuid;

use super::Database;
use super::models::{Document, DocumentStatus};
use crate::error::{DatabaseError, ServiceError, ServiceResult};

const DOCUMENT_COLUMNS: &str = "id, original_name, source_key, destination_key, \
     content_fingerprint, version, status, error, attempt_count, not_before, \
     created_at, updated_at";

/// Optional column updates applied together with a status transition.
#[derive(Debug, Default, Clone)]
pub struct TransitionFields {
    /// New error text; `None` clears the column
    pub error: Option<String>,
    /// Overwrites attempt_count when set
    pub attempt_count: Option<u32>,
    /// Overwrites destination_key when set (never cleared)
    pub destination_key: Option<String>,
    /// Earliest eligible retry instant; `None` clears the column
    pub not_before: Option<DateTime<Utc>>,
}

/// Per-status row count, used for health reporting
#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    pub status: DocumentStatus,
    pub count: i64,
}

/// Timestamps are stored as fixed-width RFC 3339 UTC strings so that
/// lexicographic comparison in SQL matches chronological order.
fn fmt_ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl Database {
    /// Atomically look up the most recent document for `name` and decide
    /// whether the observed fingerprint warrants a new version.
    ///
    /// Returns `(document, true)` when a new row was created. A changed
    /// fingerprint while the latest version is still non-terminal does NOT
    /// create a row; the existing document is returned and the new version is
    /// picked up by a later scan, preserving per-name version ordering.
    pub fn upsert_candidate(
        &self,
        name: &str,
        source_key: &str,
        fingerprint: &str,
    ) -> ServiceResult<(Document, bool)> {
        let conn = self.conn.lock().unwrap();

        let latest = Self::query_latest_by_name(&conn, name)?;

        match latest {
            Some(doc) if doc.content_fingerprint == fingerprint => Ok((doc, false)),
            Some(doc) if !doc.status.is_terminal() => Ok((doc, false)),
            latest => {
                let version = latest.map(|d| d.version + 1).unwrap_or(1);
                let now = Utc::now();
                let doc = Document {
                    id: Uuid::now_v7().to_string(),
                    original_name: name.to_string(),
                    source_key: source_key.to_string(),
                    destination_key: None,
                    content_fingerprint: fingerprint.to_string(),
                    version,
                    status: DocumentStatus::Queued,
                    error: None,
                    attempt_count: 0,
                    not_before: None,
                    created_at: now,
                    updated_at: now,
                };

                conn.execute(
                    r#"
                    INSERT INTO documents (id, original_name, source_key, destination_key,
                        content_fingerprint, version, status, error, attempt_count, not_before,
                        created_at, updated_at)
                    VALUES (?1, ?2, ?3, NULL, ?4, ?5, ?6, NULL, 0, NULL, ?7, ?7)
                    "#,
                    params![
                        doc.id,
                        doc.original_name,
                        doc.source_key,
                        doc.content_fingerprint,
                        doc.version,
                        doc.status.as_str(),
                        fmt_ts(&now),
                    ],
                )
                .map_err(DatabaseError::Query)?;

                Ok((doc, true))
            }
        }
    }

    /// Conditionally advance a document's state.
    ///
    /// The update only applies while the current status equals `from`; a lost
    /// race surfaces as `ServiceError::Conflict` and leaves the row untouched.
    /// Illegal edges are rejected before touching the database.
    pub fn transition(
        &self,
        id: &str,
        from: DocumentStatus,
        to: DocumentStatus,
        fields: &TransitionFields,
    ) -> ServiceResult<Document> {
        if !from.can_transition_to(to) {
            return Err(ServiceError::Internal {
                message: format!("illegal transition {from} -> {to} for document {id}"),
            });
        }

        let conn = self.conn.lock().unwrap();
        let now = Utc::now();

        let rows = conn
            .execute(
                r#"
                UPDATE documents SET
                    status = ?1,
                    error = ?2,
                    not_before = ?3,
                    attempt_count = COALESCE(?4, attempt_count),
                    destination_key = COALESCE(?5, destination_key),
                    updated_at = ?6
                WHERE id = ?7 AND status = ?8
                "#,
                params![
                    to.as_str(),
                    fields.error,
                    fields.not_before.as_ref().map(fmt_ts),
                    fields.attempt_count.map(|a| a as i64),
                    fields.destination_key,
                    fmt_ts(&now),
                    id,
                    from.as_str(),
                ],
            )
            .map_err(DatabaseError::Query)?;

        let doc = Self::query_by_id(&conn, id)?.ok_or_else(|| ServiceError::DocumentNotFound {
            document_id: id.to_string(),
        })?;

        if rows == 0 {
            return Err(ServiceError::Conflict {
                document_id: id.to_string(),
                expected: from.as_str().to_string(),
                actual: doc.status.as_str().to_string(),
            });
        }

        Ok(doc)
    }

    /// Get a document by ID
    pub fn get_document(&self, id: &str) -> ServiceResult<Option<Document>> {
        let conn = self.conn.lock().unwrap();
        Self::query_by_id(&conn, id)
    }

    /// Most recent version for a logical name
    pub fn latest_by_name(&self, name: &str) -> ServiceResult<Option<Document>> {
        let conn = self.conn.lock().unwrap();
        Self::query_latest_by_name(&conn, name)
    }

    /// List documents, optionally filtered by status and/or name.
    /// Ordered by id, which follows creation time.
    pub fn list_documents(
        &self,
        status: Option<DocumentStatus>,
        name: Option<&str>,
    ) -> ServiceResult<Vec<Document>> {
        let conn = self.conn.lock().unwrap();

        let sql = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents \
             WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR original_name = ?2) \
             ORDER BY id ASC"
        );
        let mut stmt = conn.prepare(&sql).map_err(DatabaseError::Query)?;
        let rows = stmt
            .query_map(
                params![status.map(|s| s.as_str()), name],
                Document::from_row,
            )
            .map_err(DatabaseError::Query)?;

        let mut docs = Vec::new();
        for row in rows {
            docs.push(row.map_err(DatabaseError::Query)?);
        }
        Ok(docs)
    }

    /// All documents whose id sorts after the cursor, oldest first.
    /// Supports incremental consumption by downstream systems.
    pub fn updates_since(
        &self,
        cursor: Option<&str>,
        limit: usize,
    ) -> ServiceResult<Vec<Document>> {
        let conn = self.conn.lock().unwrap();

        let sql = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents \
             WHERE (?1 IS NULL OR id > ?1) ORDER BY id ASC LIMIT ?2"
        );
        let mut stmt = conn.prepare(&sql).map_err(DatabaseError::Query)?;
        let rows = stmt
            .query_map(params![cursor, limit as i64], Document::from_row)
            .map_err(DatabaseError::Query)?;

        let mut docs = Vec::new();
        for row in rows {
            docs.push(row.map_err(DatabaseError::Query)?);
        }
        Ok(docs)
    }

    /// Queued documents whose backoff window has elapsed, oldest first
    pub fn claimable(&self, now: DateTime<Utc>, limit: usize) -> ServiceResult<Vec<Document>> {
        let conn = self.conn.lock().unwrap();

        let sql = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents \
             WHERE status = 'queued' AND (not_before IS NULL OR not_before <= ?1) \
             ORDER BY id ASC LIMIT ?2"
        );
        let mut stmt = conn.prepare(&sql).map_err(DatabaseError::Query)?;
        let rows = stmt
            .query_map(params![fmt_ts(&now), limit as i64], Document::from_row)
            .map_err(DatabaseError::Query)?;

        let mut docs = Vec::new();
        for row in rows {
            docs.push(row.map_err(DatabaseError::Query)?);
        }
        Ok(docs)
    }

    /// Recover documents stuck mid-flight past the staleness threshold,
    /// e.g. after a process restart. Treated as a transient failure: the
    /// attempt is counted and the document re-queued while budget remains.
    ///
    /// Returns the number of documents made eligible again.
    pub fn requeue_stale(
        &self,
        cutoff: DateTime<Utc>,
        max_attempts: u32,
    ) -> ServiceResult<usize> {
        let stale: Vec<(String, DocumentStatus, u32)> = {
            let conn = self.conn.lock().unwrap();
            let mut stmt = conn
                .prepare(
                    "SELECT id, status, attempt_count FROM documents \
                     WHERE status IN ('downloading', 'converting', 'uploading') \
                       AND updated_at < ?1",
                )
                .map_err(DatabaseError::Query)?;
            let rows = stmt
                .query_map(params![fmt_ts(&cutoff)], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, DocumentStatus>(1)?,
                        row.get::<_, i64>(2)? as u32,
                    ))
                })
                .map_err(DatabaseError::Query)?;

            let mut stale = Vec::new();
            for row in rows {
                stale.push(row.map_err(DatabaseError::Query)?);
            }
            stale
        };

        let mut requeued = 0;
        for (id, status, attempt_count) in stale {
            let attempts = attempt_count + 1;
            let fields = TransitionFields {
                error: Some("processing attempt interrupted or stalled".to_string()),
                attempt_count: Some(attempts),
                ..Default::default()
            };
            match self.transition(&id, status, DocumentStatus::Failed, &fields) {
                Ok(_) => {}
                // Another worker advanced it in the meantime; leave it alone.
                Err(ServiceError::Conflict { .. }) => continue,
                Err(e) => return Err(e),
            }

            if attempts < max_attempts {
                let fields = TransitionFields {
                    error: Some("processing attempt interrupted or stalled".to_string()),
                    ..Default::default()
                };
                self.transition(&id, DocumentStatus::Failed, DocumentStatus::Queued, &fields)?;
                requeued += 1;
            } else {
                tracing::warn!(doc_id = %id, attempts, "stale document exhausted retry budget");
            }
        }

        Ok(requeued)
    }

    /// Row counts per lifecycle state
    pub fn status_counts(&self) -> ServiceResult<Vec<StatusCount>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare("SELECT status, COUNT(*) FROM documents GROUP BY status")
            .map_err(DatabaseError::Query)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(StatusCount {
                    status: row.get(0)?,
                    count: row.get(1)?,
                })
            })
            .map_err(DatabaseError::Query)?;

        let mut counts = Vec::new();
        for row in rows {
            counts.push(row.map_err(DatabaseError::Query)?);
        }
        Ok(counts)
    }

    fn query_by_id(conn: &Connection, id: &str) -> ServiceResult<Option<Document>> {
        let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1");
        conn.query_row(&sql, params![id], Document::from_row)
            .optional()
            .map_err(DatabaseError::Query)
            .map_err(Into::into)
    }

    fn query_latest_by_name(conn: &Connection, name: &str) -> ServiceResult<Option<Document>> {
        let sql = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents \
             WHERE original_name = ?1 ORDER BY version DESC LIMIT 1"
        );
        conn.query_row(&sql, params![name], Document::from_row)
            .optional()
            .map_err(DatabaseError::Query)
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn test_db() -> (Database, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = Database::open(&dir.path().join("test.db")).unwrap();
        (db, dir)
    }

    fn drive_to_completed(db: &Database, id: &str) -> Document {
        db.transition(
            id,
            DocumentStatus::Queued,
            DocumentStatus::Downloading,
            &TransitionFields::default(),
        )
        .unwrap();
        db.transition(
            id,
            DocumentStatus::Downloading,
            DocumentStatus::Converting,
            &TransitionFields::default(),
        )
        .unwrap();
        db.transition(
            id,
            DocumentStatus::Converting,
            DocumentStatus::Uploading,
            &TransitionFields::default(),
        )
        .unwrap();
        db.transition(
            id,
            DocumentStatus::Uploading,
            DocumentStatus::Completed,
            &TransitionFields {
                destination_key: Some(format!("processed/{id}.md")),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_upsert_creates_first_version() {
        let (db, _dir) = test_db();

        let (doc, is_new) = db
            .upsert_candidate("downloads/report.pdf", "downloads/report.pdf", "h1")
            .unwrap();

        assert!(is_new);
        assert_eq!(doc.version, 1);
        assert_eq!(doc.status, DocumentStatus::Queued);
        assert_eq!(doc.attempt_count, 0);
        assert!(doc.destination_key.is_none());
    }

    #[test]
    fn test_upsert_unchanged_fingerprint_is_idempotent() {
        let (db, _dir) = test_db();

        let (first, _) = db
            .upsert_candidate("downloads/report.pdf", "downloads/report.pdf", "h1")
            .unwrap();

        for _ in 0..3 {
            let (doc, is_new) = db
                .upsert_candidate("downloads/report.pdf", "downloads/report.pdf", "h1")
                .unwrap();
            assert!(!is_new);
            assert_eq!(doc.id, first.id);
            assert_eq!(doc.version, 1);
        }

        let all = db.list_documents(None, None).unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_upsert_changed_fingerprint_after_completion_bumps_version() {
        let (db, _dir) = test_db();

        let (v1, _) = db
            .upsert_candidate("downloads/report.pdf", "downloads/report.pdf", "h1")
            .unwrap();
        drive_to_completed(&db, &v1.id);

        let (v2, is_new) = db
            .upsert_candidate("downloads/report.pdf", "downloads/report.pdf", "h2")
            .unwrap();

        assert!(is_new);
        assert_ne!(v2.id, v1.id);
        assert_eq!(v2.version, 2);
        assert_eq!(v2.status, DocumentStatus::Queued);

        // Prior version untouched
        let v1_after = db.get_document(&v1.id).unwrap().unwrap();
        assert_eq!(v1_after.status, DocumentStatus::Completed);
        assert!(v1_after.destination_key.is_some());
    }

    #[test]
    fn test_upsert_changed_fingerprint_while_in_flight_is_deferred() {
        let (db, _dir) = test_db();

        let (v1, _) = db
            .upsert_candidate("downloads/report.pdf", "downloads/report.pdf", "h1")
            .unwrap();
        db.transition(
            &v1.id,
            DocumentStatus::Queued,
            DocumentStatus::Downloading,
            &TransitionFields::default(),
        )
        .unwrap();

        let (doc, is_new) = db
            .upsert_candidate("downloads/report.pdf", "downloads/report.pdf", "h2")
            .unwrap();

        assert!(!is_new);
        assert_eq!(doc.id, v1.id);
        assert_eq!(db.list_documents(None, None).unwrap().len(), 1);
    }

    #[test]
    fn test_transition_conflict_leaves_row_untouched() {
        let (db, _dir) = test_db();

        let (doc, _) = db
            .upsert_candidate("downloads/a.pdf", "downloads/a.pdf", "h1")
            .unwrap();
        db.transition(
            &doc.id,
            DocumentStatus::Queued,
            DocumentStatus::Downloading,
            &TransitionFields::default(),
        )
        .unwrap();

        // A second claim attempt loses the race
        let err = db
            .transition(
                &doc.id,
                DocumentStatus::Queued,
                DocumentStatus::Downloading,
                &TransitionFields::default(),
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict { .. }));

        let current = db.get_document(&doc.id).unwrap().unwrap();
        assert_eq!(current.status, DocumentStatus::Downloading);
    }

    #[test]
    fn test_transition_illegal_edge_rejected() {
        let (db, _dir) = test_db();

        let (doc, _) = db
            .upsert_candidate("downloads/a.pdf", "downloads/a.pdf", "h1")
            .unwrap();
        let err = db
            .transition(
                &doc.id,
                DocumentStatus::Queued,
                DocumentStatus::Completed,
                &TransitionFields::default(),
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Internal { .. }));

        let current = db.get_document(&doc.id).unwrap().unwrap();
        assert_eq!(current.status, DocumentStatus::Queued);
    }

    #[test]
    fn test_transition_missing_document() {
        let (db, _dir) = test_db();

        let err = db
            .transition(
                "no-such-id",
                DocumentStatus::Queued,
                DocumentStatus::Downloading,
                &TransitionFields::default(),
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::DocumentNotFound { .. }));
    }

    #[test]
    fn test_completed_sets_destination_and_clears_error() {
        let (db, _dir) = test_db();

        let (doc, _) = db
            .upsert_candidate("downloads/a.pdf", "downloads/a.pdf", "h1")
            .unwrap();
        // Simulate a prior transient failure leaving an error recorded
        db.transition(
            &doc.id,
            DocumentStatus::Queued,
            DocumentStatus::Downloading,
            &TransitionFields {
                error: Some("earlier timeout".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        db.transition(
            &doc.id,
            DocumentStatus::Downloading,
            DocumentStatus::Converting,
            &TransitionFields::default(),
        )
        .unwrap();
        db.transition(
            &doc.id,
            DocumentStatus::Converting,
            DocumentStatus::Uploading,
            &TransitionFields::default(),
        )
        .unwrap();
        let done = db
            .transition(
                &doc.id,
                DocumentStatus::Uploading,
                DocumentStatus::Completed,
                &TransitionFields {
                    destination_key: Some("processed/x.md".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(done.status, DocumentStatus::Completed);
        assert_eq!(done.destination_key.as_deref(), Some("processed/x.md"));
        assert!(done.error.is_none());
    }

    #[test]
    fn test_claimable_respects_backoff() {
        let (db, _dir) = test_db();

        let (a, _) = db
            .upsert_candidate("downloads/a.pdf", "downloads/a.pdf", "h1")
            .unwrap();
        let (b, _) = db
            .upsert_candidate("downloads/b.pdf", "downloads/b.pdf", "h1")
            .unwrap();

        // Put `a` behind a backoff window via the failure path
        db.transition(
            &a.id,
            DocumentStatus::Queued,
            DocumentStatus::Failed,
            &TransitionFields {
                error: Some("timeout".to_string()),
                attempt_count: Some(1),
                ..Default::default()
            },
        )
        .unwrap();
        db.transition(
            &a.id,
            DocumentStatus::Failed,
            DocumentStatus::Queued,
            &TransitionFields {
                error: Some("timeout".to_string()),
                not_before: Some(Utc::now() + Duration::seconds(3600)),
                ..Default::default()
            },
        )
        .unwrap();

        let now = Utc::now();
        let eligible = db.claimable(now, 100).unwrap();
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, b.id);

        // Once the window elapses, `a` becomes eligible again
        let later = now + Duration::seconds(7200);
        let eligible = db.claimable(later, 100).unwrap();
        assert_eq!(eligible.len(), 2);
    }

    #[test]
    fn test_updates_since_cursor() {
        let (db, _dir) = test_db();

        let (a, _) = db
            .upsert_candidate("downloads/a.pdf", "downloads/a.pdf", "h1")
            .unwrap();
        let (b, _) = db
            .upsert_candidate("downloads/b.pdf", "downloads/b.pdf", "h1")
            .unwrap();
        let (c, _) = db
            .upsert_candidate("downloads/c.pdf", "downloads/c.pdf", "h1")
            .unwrap();

        let all = db.updates_since(None, 100).unwrap();
        assert_eq!(
            all.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(),
            vec![a.id.as_str(), b.id.as_str(), c.id.as_str()]
        );

        let after_a = db.updates_since(Some(&a.id), 100).unwrap();
        assert_eq!(
            after_a.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(),
            vec![b.id.as_str(), c.id.as_str()]
        );

        let after_c = db.updates_since(Some(&c.id), 100).unwrap();
        assert!(after_c.is_empty());
    }

    #[test]
    fn test_requeue_stale() {
        let (db, _dir) = test_db();

        let (doc, _) = db
            .upsert_candidate("downloads/a.pdf", "downloads/a.pdf", "h1")
            .unwrap();
        db.transition(
            &doc.id,
            DocumentStatus::Queued,
            DocumentStatus::Downloading,
            &TransitionFields::default(),
        )
        .unwrap();

        // Nothing is stale yet
        let cutoff = Utc::now() - Duration::seconds(300);
        assert_eq!(db.requeue_stale(cutoff, 3).unwrap(), 0);

        // A cutoff in the future makes the in-flight row stale
        let cutoff = Utc::now() + Duration::seconds(1);
        let requeued = db.requeue_stale(cutoff, 3).unwrap();
        assert_eq!(requeued, 1);

        let current = db.get_document(&doc.id).unwrap().unwrap();
        assert_eq!(current.status, DocumentStatus::Queued);
        assert_eq!(current.attempt_count, 1);
        assert!(current.error.is_some());
    }

    #[test]
    fn test_requeue_stale_exhausted_budget_stays_failed() {
        let (db, _dir) = test_db();

        let (doc, _) = db
            .upsert_candidate("downloads/a.pdf", "downloads/a.pdf", "h1")
            .unwrap();
        db.transition(
            &doc.id,
            DocumentStatus::Queued,
            DocumentStatus::Downloading,
            &TransitionFields {
                attempt_count: Some(2),
                ..Default::default()
            },
        )
        .unwrap();

        let cutoff = Utc::now() + Duration::seconds(1);
        let requeued = db.requeue_stale(cutoff, 3).unwrap();
        assert_eq!(requeued, 0);

        let current = db.get_document(&doc.id).unwrap().unwrap();
        assert_eq!(current.status, DocumentStatus::Failed);
        assert_eq!(current.attempt_count, 3);
    }

    #[test]
    fn test_corrupt_timestamp_surfaces_error() {
        let (db, _dir) = test_db();

        let (doc, _) = db
            .upsert_candidate("downloads/a.pdf", "downloads/a.pdf", "h1")
            .unwrap();
        {
            let conn = db.conn.lock().unwrap();
            conn.execute(
                "UPDATE documents SET created_at = 'not-a-timestamp' WHERE id = ?1",
                params![doc.id],
            )
            .unwrap();
        }

        let err = db.get_document(&doc.id).unwrap_err();
        assert!(matches!(err, ServiceError::Database(_)));
    }

    #[test]
    fn test_status_counts() {
        let (db, _dir) = test_db();

        let (a, _) = db
            .upsert_candidate("downloads/a.pdf", "downloads/a.pdf", "h1")
            .unwrap();
        db.upsert_candidate("downloads/b.pdf", "downloads/b.pdf", "h1")
            .unwrap();
        drive_to_completed(&db, &a.id);

        let counts = db.status_counts().unwrap();
        let get = |s: DocumentStatus| {
            counts
                .iter()
                .find(|c| c.status == s)
                .map(|c| c.count)
                .unwrap_or(0)
        };
        assert_eq!(get(DocumentStatus::Completed), 1);
        assert_eq!(get(DocumentStatus::Queued), 1);
    }

    #[test]
    fn test_list_documents_filters() {
        let (db, _dir) = test_db();

        let (a, _) = db
            .upsert_candidate("downloads/a.pdf", "downloads/a.pdf", "h1")
            .unwrap();
        db.upsert_candidate("downloads/b.pdf", "downloads/b.pdf", "h1")
            .unwrap();
        drive_to_completed(&db, &a.id);

        let completed = db
            .list_documents(Some(DocumentStatus::Completed), None)
            .unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, a.id);

        let by_name = db.list_documents(None, Some("downloads/b.pdf")).unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].original_name, "downloads/b.pdf");
    }
}
