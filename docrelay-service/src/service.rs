//! Service facade wiring the store, database, and scheduler together.
//!
//! All dependencies are constructed explicitly and handed in; handlers only
//! ever talk to `RelayService`. Trigger endpoints record intent in the
//! database and nudge the scheduler instead of processing inline, so the
//! semaphore bound applies to every admission path.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::db::{Database, Document, DocumentStatus, StatusCount, TransitionFields};
use crate::error::{ServiceError, ServiceResult, StorageError};
use crate::fingerprint::fingerprint_object;
use crate::poller::{CycleSummary, Poller};
use crate::storage::ObjectStore;

/// Page-size bound for update feeds
pub const MAX_UPDATES_PAGE: usize = 500;
pub const DEFAULT_UPDATES_PAGE: usize = 100;

pub struct RelayService {
    db: Arc<Database>,
    store: Arc<dyn ObjectStore>,
    poller: Arc<Poller>,
    trigger: mpsc::Sender<()>,
    source_prefix: String,
    started_at: DateTime<Utc>,
}

impl RelayService {
    pub fn new(
        db: Arc<Database>,
        store: Arc<dyn ObjectStore>,
        poller: Arc<Poller>,
        trigger: mpsc::Sender<()>,
        source_prefix: String,
    ) -> Self {
        Self {
            db,
            store,
            poller,
            trigger,
            source_prefix,
            started_at: Utc::now(),
        }
    }

    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }

    /// Ask the scheduler to run a cycle soon. A full channel means one is
    /// already pending, which serves the same purpose.
    pub fn nudge_scheduler(&self) {
        let _ = self.trigger.try_send(());
    }

    /// Trigger processing for a named source object.
    ///
    /// Heads the object, fingerprints it, and upserts the candidate row:
    /// repeated triggers for the same unchanged object collapse onto one
    /// document. A failed document with the same fingerprint gets a fresh
    /// retry budget instead of a new version.
    pub async fn trigger_by_name(&self, name: &str) -> ServiceResult<Document> {
        let key = self.resolve_source_key(name);
        let meta = match self.store.head(&key).await {
            Ok(meta) => meta,
            Err(StorageError::NotFound { key }) => {
                return Err(ServiceError::ObjectNotFound { key });
            }
            Err(e) => return Err(e.into()),
        };

        let fingerprint = fingerprint_object(self.store.as_ref(), &meta).await?;
        let (doc, is_new) = self.db.upsert_candidate(&key, &key, &fingerprint)?;
        if is_new {
            info!(doc_id = %doc.id, name = %key, version = doc.version, "trigger queued new version");
        } else {
            debug!(doc_id = %doc.id, status = %doc.status, "trigger matched existing document");
        }

        let doc = if !is_new && doc.status == DocumentStatus::Failed {
            self.reset_failed(&doc.id)?
        } else {
            doc
        };

        self.nudge_scheduler();
        Ok(doc)
    }

    /// Re-trigger processing for a known document id.
    ///
    /// An in-flight or queued document is reused as-is. A failed document is
    /// re-queued with its retry budget reset. A completed document is not
    /// reprocessed; publishing a changed source object is how a new version
    /// is requested.
    pub fn trigger_by_id(&self, id: &str) -> ServiceResult<Document> {
        let doc = self
            .db
            .get_document(id)?
            .ok_or_else(|| ServiceError::DocumentNotFound {
                document_id: id.to_string(),
            })?;

        let doc = match doc.status {
            DocumentStatus::Failed => self.reset_failed(&doc.id)?,
            DocumentStatus::Completed => {
                return Err(ServiceError::InvalidRequest {
                    message: format!(
                        "document {id} is completed; update the source object to request reprocessing"
                    ),
                });
            }
            _ => doc,
        };

        self.nudge_scheduler();
        Ok(doc)
    }

    /// Run one full scheduling cycle inline and report what it did.
    pub async fn run_scan(&self) -> ServiceResult<CycleSummary> {
        self.poller.run_cycle().await
    }

    pub fn get_document(&self, id: &str) -> ServiceResult<Option<Document>> {
        self.db.get_document(id)
    }

    pub fn list_documents(
        &self,
        status: Option<DocumentStatus>,
        name: Option<&str>,
    ) -> ServiceResult<Vec<Document>> {
        self.db.list_documents(status, name)
    }

    /// Documents created after the cursor id, oldest first.
    pub fn updates_since(
        &self,
        cursor: Option<&str>,
        limit: Option<usize>,
    ) -> ServiceResult<Vec<Document>> {
        let limit = limit.unwrap_or(DEFAULT_UPDATES_PAGE).min(MAX_UPDATES_PAGE);
        self.db.updates_since(cursor, limit)
    }

    pub fn status_counts(&self) -> ServiceResult<Vec<StatusCount>> {
        self.db.status_counts()
    }

    /// Failed -> queued with a fresh retry budget, eligible immediately.
    fn reset_failed(&self, id: &str) -> ServiceResult<Document> {
        info!(doc_id = %id, "re-queueing failed document");
        self.db.transition(
            id,
            DocumentStatus::Failed,
            DocumentStatus::Queued,
            &TransitionFields {
                attempt_count: Some(0),
                ..Default::default()
            },
        )
    }

    fn resolve_source_key(&self, name: &str) -> String {
        if name.starts_with(&self.source_prefix) {
            name.to_string()
        } else {
            format!("{}{}", self.source_prefix, name)
        }
    }
}
