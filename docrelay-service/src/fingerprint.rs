//! Content fingerprinting for change detection.
//!
//! A fingerprint must be deterministic, side-effect free, stable for
//! unchanged content, and different for changed content. Discovery uses the
//! metadata variant so a scan does not have to download every object; the
//! byte variant exists for callers that already hold the content.

use sha2::{Digest, Sha256};

use crate::storage::{ObjectMeta, ObjectStore, StorageResult};

/// Fingerprint from listing metadata (etag, size, modification time).
pub fn fingerprint_metadata(meta: &ObjectMeta) -> String {
    let mut hasher = Sha256::new();
    hasher.update(meta.etag.as_bytes());
    hasher.update([0]);
    hasher.update(meta.size.to_le_bytes());
    hasher.update([0]);
    hasher.update(meta.modified.timestamp_millis().to_le_bytes());
    format!("{:x}", hasher.finalize())
}

/// SHA-256 hex digest of object bytes.
pub fn fingerprint_bytes(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Fingerprint a listed object. Backends that report no etag get the byte
/// variant: the object is downloaded and hashed instead.
pub async fn fingerprint_object(
    store: &dyn ObjectStore,
    meta: &ObjectMeta,
) -> StorageResult<String> {
    if meta.etag.is_empty() {
        let bytes = store.get(&meta.key).await?;
        Ok(fingerprint_bytes(&bytes))
    } else {
        Ok(fingerprint_metadata(meta))
    }
}
