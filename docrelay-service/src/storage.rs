//! Object storage collaborator seam.
//!
//! The pipeline and poller only see this trait; the shipped implementation
//! is a local-directory store, and an S3-compatible client slots in behind
//! the same seam. Error classification (transient vs permanent) lives on
//! `StorageError` so the retry policy stays collaborator-agnostic.

pub mod fs;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::StorageError;

pub use fs::FsObjectStore;

pub type StorageResult<T> = Result<T, StorageError>;

/// Listing/head metadata for one stored object
#[derive(Debug, Clone, Serialize)]
pub struct ObjectMeta {
    pub key: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub etag: String,
}

/// Minimal object-storage operations consumed by the core.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List objects under a key prefix, ordered by key.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectMeta>>;

    /// Fetch an object's bytes.
    async fn get(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Write an object in a single atomic put.
    async fn put(&self, key: &str, bytes: &[u8]) -> StorageResult<()>;

    /// Fetch metadata without the payload.
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta>;
}
