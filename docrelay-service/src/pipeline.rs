//! Processing pipeline: drives one document through
//! download -> convert -> upload, persisting a state transition before and
//! after each external call.
//!
//! Entering a step's state is the optimistic lock; a worker that loses a
//! transition race aborts cleanly without side effects. The destination
//! object is written exactly once, on the uploading edge, so destination
//! state is never ambiguous.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::config::ProcessingConfig;
use crate::convert::{Converter, content_type_for};
use crate::db::{Database, Document, DocumentStatus, TransitionFields};
use crate::error::{ServiceError, ServiceResult};
use crate::storage::ObjectStore;

pub struct Pipeline {
    db: Arc<Database>,
    store: Arc<dyn ObjectStore>,
    converter: Arc<dyn Converter>,
    processing: ProcessingConfig,
    destination_prefix: String,
}

impl Pipeline {
    pub fn new(
        db: Arc<Database>,
        store: Arc<dyn ObjectStore>,
        converter: Arc<dyn Converter>,
        processing: ProcessingConfig,
        destination_prefix: String,
    ) -> Self {
        Self {
            db,
            store,
            converter,
            processing,
            destination_prefix,
        }
    }

    /// Process one queued document to a terminal state, or back to queued
    /// when a transient failure leaves retry budget. Returns the state the
    /// document was left in.
    pub async fn process(&self, doc: &Document) -> ServiceResult<DocumentStatus> {
        // Claiming the document is the admission lock: exactly one worker
        // wins the queued -> downloading edge.
        let claimed = match self.db.transition(
            &doc.id,
            DocumentStatus::Queued,
            DocumentStatus::Downloading,
            &TransitionFields::default(),
        ) {
            Ok(d) => d,
            Err(ServiceError::Conflict { actual, .. }) => {
                debug!(doc_id = %doc.id, status = %actual, "document already claimed, skipping");
                return Ok(DocumentStatus::parse(&actual).unwrap_or(DocumentStatus::Queued));
            }
            Err(e) => return Err(e),
        };

        info!(
            doc_id = %claimed.id,
            name = %claimed.original_name,
            version = claimed.version,
            attempt = claimed.attempt_count + 1,
            "processing document"
        );

        match self.run_steps(&claimed).await {
            Ok(done) => {
                info!(
                    doc_id = %done.id,
                    destination = %done.destination_key.as_deref().unwrap_or(""),
                    "document completed"
                );
                Ok(done.status)
            }
            Err(e) => self.handle_failure(&claimed.id, e),
        }
    }

    async fn run_steps(&self, doc: &Document) -> ServiceResult<Document> {
        let bytes = self.store.get(&doc.source_key).await?;

        let doc = self.db.transition(
            &doc.id,
            DocumentStatus::Downloading,
            DocumentStatus::Converting,
            &TransitionFields::default(),
        )?;

        let markdown = self
            .converter
            .convert(
                bytes,
                &doc.original_name,
                content_type_for(&doc.original_name),
            )
            .await?;

        let doc = self.db.transition(
            &doc.id,
            DocumentStatus::Converting,
            DocumentStatus::Uploading,
            &TransitionFields::default(),
        )?;

        // Single put on the uploading edge; the destination key is recorded
        // in the same transition that marks the document completed.
        let destination_key = format!("{}{}.md", self.destination_prefix, doc.id);
        self.store.put(&destination_key, markdown.as_bytes()).await?;

        self.db.transition(
            &doc.id,
            DocumentStatus::Uploading,
            DocumentStatus::Completed,
            &TransitionFields {
                destination_key: Some(destination_key),
                ..Default::default()
            },
        )
    }

    /// Apply the retry policy to a failed step.
    ///
    /// Transient failures with budget left take the `failed -> queued` retry
    /// edge with an exponential backoff gate; everything else stays failed.
    /// A conflict anywhere means another worker owns the document now, and
    /// the losing attempt is absorbed silently.
    fn handle_failure(&self, id: &str, err: ServiceError) -> ServiceResult<DocumentStatus> {
        if let ServiceError::Conflict { actual, .. } = &err {
            debug!(doc_id = %id, status = %actual, "lost transition race, aborting attempt");
            return Ok(DocumentStatus::parse(actual).unwrap_or(DocumentStatus::Failed));
        }

        let Some(current) = self.db.get_document(id)? else {
            return Err(ServiceError::DocumentNotFound {
                document_id: id.to_string(),
            });
        };
        if !current.status.is_in_flight() {
            // Another worker (or stale recovery) already resolved it.
            return Ok(current.status);
        }

        let attempts = current.attempt_count + 1;
        let transient = err.is_transient();
        let message = failure_message(&err);

        match self.db.transition(
            &current.id,
            current.status,
            DocumentStatus::Failed,
            &TransitionFields {
                error: Some(message.clone()),
                attempt_count: Some(attempts),
                ..Default::default()
            },
        ) {
            Ok(_) => {}
            Err(ServiceError::Conflict { actual, .. }) => {
                return Ok(DocumentStatus::parse(&actual).unwrap_or(DocumentStatus::Failed));
            }
            Err(e) => return Err(e),
        }

        if transient && attempts < self.processing.max_attempts {
            let delay = self.processing.retry_backoff(attempts);
            warn!(
                doc_id = %id,
                attempt = attempts,
                max_attempts = self.processing.max_attempts,
                retry_in_secs = delay.num_seconds(),
                error = %message,
                "transient failure, document re-queued"
            );
            match self.db.transition(
                id,
                DocumentStatus::Failed,
                DocumentStatus::Queued,
                &TransitionFields {
                    error: Some(message),
                    not_before: Some(Utc::now() + delay),
                    ..Default::default()
                },
            ) {
                Ok(_) => Ok(DocumentStatus::Queued),
                Err(ServiceError::Conflict { actual, .. }) => {
                    Ok(DocumentStatus::parse(&actual).unwrap_or(DocumentStatus::Failed))
                }
                Err(e) => Err(e),
            }
        } else {
            error!(
                doc_id = %id,
                attempts,
                transient,
                error = %message,
                "document failed"
            );
            Ok(DocumentStatus::Failed)
        }
    }
}

/// Error text persisted to the document row; names the failing collaborator.
fn failure_message(err: &ServiceError) -> String {
    match err {
        ServiceError::Storage(e) => format!("storage: {e}"),
        ServiceError::Convert(e) => format!("converter: {e}"),
        ServiceError::Database(e) => format!("database: {e}"),
        other => other.to_string(),
    }
}
