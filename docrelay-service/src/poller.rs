//! Source polling and work admission.
//!
//! One code path serves both admission triggers: a fixed interval tick and an
//! mpsc nudge from the API. Each cycle recovers stale in-flight rows, scans
//! the source prefix for new or changed objects, and admits every claimable
//! document to the pipeline under a semaphore bound.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::ProcessingConfig;
use crate::db::{Database, DocumentStatus};
use crate::error::{ServiceError, ServiceResult};
use crate::fingerprint::fingerprint_object;
use crate::pipeline::Pipeline;
use crate::storage::ObjectStore;

/// Upper bound on documents admitted per cycle; anything left over is picked
/// up by the next tick.
const CLAIM_BATCH_LIMIT: usize = 256;

/// What one scheduling cycle did, reported by the scan endpoint.
#[derive(Debug, Default, Clone, Serialize)]
pub struct CycleSummary {
    /// Objects listed under the source prefix
    pub scanned: usize,
    /// New document versions queued this cycle
    pub new_documents: usize,
    /// In-flight rows recovered from a prior interrupted run
    pub stale_requeued: usize,
    /// Documents handed to the pipeline
    pub admitted: usize,
    pub completed: usize,
    pub failed: usize,
    /// Transient failures re-queued for a later cycle
    pub retried: usize,
}

pub struct Poller {
    db: Arc<Database>,
    store: Arc<dyn ObjectStore>,
    pipeline: Arc<Pipeline>,
    processing: ProcessingConfig,
    source_prefix: String,
}

impl Poller {
    pub fn new(
        db: Arc<Database>,
        store: Arc<dyn ObjectStore>,
        pipeline: Arc<Pipeline>,
        processing: ProcessingConfig,
        source_prefix: String,
    ) -> Self {
        Self {
            db,
            store,
            pipeline,
            processing,
            source_prefix,
        }
    }

    /// Run scheduling cycles until the trigger channel closes.
    pub async fn run(self: Arc<Self>, mut trigger: mpsc::Receiver<()>) {
        let mut interval = tokio::time::interval(self.processing.poll_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.processing.poll_interval_secs,
            workers = self.processing.worker_count,
            source_prefix = %self.source_prefix,
            "scheduler started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                nudge = trigger.recv() => {
                    if nudge.is_none() {
                        info!("trigger channel closed, scheduler stopping");
                        return;
                    }
                    // Drain queued nudges so a burst collapses into one cycle
                    while trigger.try_recv().is_ok() {}
                }
            }

            match self.run_cycle().await {
                Ok(summary) => {
                    if summary.admitted > 0 || summary.new_documents > 0 {
                        info!(
                            scanned = summary.scanned,
                            new = summary.new_documents,
                            admitted = summary.admitted,
                            completed = summary.completed,
                            failed = summary.failed,
                            retried = summary.retried,
                            "cycle finished"
                        );
                    } else {
                        debug!(scanned = summary.scanned, "cycle finished, nothing to do");
                    }
                }
                Err(e) => error!(error = %e, "scheduling cycle failed"),
            }
        }
    }

    /// One full cycle: stale recovery, source scan, admission.
    pub async fn run_cycle(&self) -> ServiceResult<CycleSummary> {
        let mut summary = CycleSummary::default();

        let cutoff = Utc::now() - self.processing.stale_after();
        summary.stale_requeued = self
            .db
            .requeue_stale(cutoff, self.processing.max_attempts)?;
        if summary.stale_requeued > 0 {
            warn!(
                count = summary.stale_requeued,
                "recovered stale in-flight documents"
            );
        }

        let listed = self.store.list(&self.source_prefix).await?;
        summary.scanned = listed.len();

        for meta in &listed {
            let fingerprint = match fingerprint_object(self.store.as_ref(), meta).await {
                Ok(fp) => fp,
                Err(e) => {
                    warn!(key = %meta.key, error = %e, "skipping unreadable source entry");
                    continue;
                }
            };
            match self.db.upsert_candidate(&meta.key, &meta.key, &fingerprint) {
                Ok((doc, true)) => {
                    info!(
                        doc_id = %doc.id,
                        name = %doc.original_name,
                        version = doc.version,
                        "queued new document version"
                    );
                    summary.new_documents += 1;
                }
                Ok((_, false)) => {}
                // One bad entry must not sink the whole scan
                Err(e) => warn!(key = %meta.key, error = %e, "skipping source entry"),
            }
        }

        let eligible = self.db.claimable(Utc::now(), CLAIM_BATCH_LIMIT)?;
        summary.admitted = eligible.len();

        let semaphore = Arc::new(Semaphore::new(self.processing.worker_count.max(1)));
        let mut tasks = JoinSet::new();

        for doc in eligible {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| ServiceError::Internal {
                    message: "worker semaphore closed".to_string(),
                })?;
            let pipeline = self.pipeline.clone();
            tasks.spawn(async move {
                let _permit = permit;
                pipeline.process(&doc).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(DocumentStatus::Completed)) => summary.completed += 1,
                Ok(Ok(DocumentStatus::Failed)) => summary.failed += 1,
                Ok(Ok(DocumentStatus::Queued)) => summary.retried += 1,
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    summary.failed += 1;
                    error!(error = %e, "pipeline run errored");
                }
                Err(e) => {
                    summary.failed += 1;
                    error!(error = %e, "pipeline task panicked");
                }
            }
        }

        Ok(summary)
    }
}
