//! Filesystem-backed object store.
//!
//! Keys map to paths beneath a root directory, `/`-separated the way bucket
//! keys are. Puts are atomic from the reader's perspective: bytes land in a
//! temp file first and are renamed into place. The etag is derived from size
//! and mtime, which is what the metadata fingerprint consumes.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use uuid::Uuid;

use super::{ObjectMeta, ObjectStore, StorageResult};
use crate::error::StorageError;

const MAX_KEY_LEN: usize = 1024;

pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Reject keys that could escape the root directory.
    fn ensure_key_safe(key: &str) -> StorageResult<()> {
        if key.is_empty() || key.len() > MAX_KEY_LEN {
            return Err(StorageError::InvalidKey {
                key: key.to_string(),
            });
        }
        if key.starts_with('/') || key.split('/').any(|seg| seg == "..") {
            return Err(StorageError::InvalidKey {
                key: key.to_string(),
            });
        }
        if key
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(StorageError::InvalidKey {
                key: key.to_string(),
            });
        }
        Ok(())
    }

    fn object_path(&self, key: &str) -> PathBuf {
        let mut path = self.root.clone();
        for segment in key.split('/') {
            path.push(segment);
        }
        path
    }

    fn meta_for(key: &str, md: &std::fs::Metadata) -> ObjectMeta {
        let modified: DateTime<Utc> = md
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        let etag = format!(
            "{:x}",
            md5::compute(format!("{}:{}", md.len(), modified.timestamp_millis()))
        );
        ObjectMeta {
            key: key.to_string(),
            size: md.len(),
            modified,
            etag,
        }
    }

    fn collect_recursive(
        dir: &Path,
        root: &Path,
        prefix: &str,
        out: &mut Vec<ObjectMeta>,
    ) -> std::io::Result<()> {
        let entries = std::fs::read_dir(dir)?;

        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_dir() {
                Self::collect_recursive(&path, root, prefix, out)?;
            } else if path.is_file() {
                let Ok(relative) = path.strip_prefix(root) else {
                    continue;
                };
                let key = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                if !key.starts_with(prefix) {
                    continue;
                }
                // Skip in-progress temp files from concurrent puts
                if key.rsplit('/').next().is_some_and(|n| n.starts_with(".tmp-")) {
                    continue;
                }
                if let Ok(md) = entry.metadata() {
                    out.push(Self::meta_for(&key, &md));
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectMeta>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        Self::collect_recursive(&self.root, &self.root, prefix, &mut out)
            .map_err(StorageError::Io)?;
        out.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(out)
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        Self::ensure_key_safe(key)?;
        fs::read(self.object_path(key))
            .await
            .map_err(|e| StorageError::from_io(e, key))
    }

    async fn put(&self, key: &str, bytes: &[u8]) -> StorageResult<()> {
        Self::ensure_key_safe(key)?;
        let path = self.object_path(key);
        let parent = path
            .parent()
            .ok_or_else(|| StorageError::InvalidKey {
                key: key.to_string(),
            })?
            .to_path_buf();
        fs::create_dir_all(&parent)
            .await
            .map_err(|e| StorageError::from_io(e, key))?;

        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        if let Err(e) = fs::write(&tmp_path, bytes).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::from_io(e, key));
        }
        if let Err(e) = fs::rename(&tmp_path, &path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::from_io(e, key));
        }
        Ok(())
    }

    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        Self::ensure_key_safe(key)?;
        let md = fs::metadata(self.object_path(key))
            .await
            .map_err(|e| StorageError::from_io(e, key))?;
        Ok(Self::meta_for(key, &md))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (FsObjectStore, TempDir) {
        let dir = TempDir::new().unwrap();
        (FsObjectStore::new(dir.path()), dir)
    }

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let (store, _dir) = store();

        store.put("downloads/report.pdf", b"%PDF-1.7").await.unwrap();
        let bytes = store.get("downloads/report.pdf").await.unwrap();
        assert_eq!(bytes, b"%PDF-1.7");
    }

    #[tokio::test]
    async fn test_get_missing_object() {
        let (store, _dir) = store();

        let err = store.get("downloads/missing.pdf").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_list_filters_by_prefix() {
        let (store, _dir) = store();

        store.put("downloads/a.pdf", b"a").await.unwrap();
        store.put("downloads/nested/b.pdf", b"b").await.unwrap();
        store.put("processed/c.md", b"c").await.unwrap();

        let keys: Vec<String> = store
            .list("downloads/")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.key)
            .collect();
        assert_eq!(keys, vec!["downloads/a.pdf", "downloads/nested/b.pdf"]);
    }

    #[tokio::test]
    async fn test_list_empty_root() {
        let store = FsObjectStore::new("/nonexistent/docrelay-test-root");
        assert!(store.list("downloads/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_head_reports_size_and_etag() {
        let (store, _dir) = store();

        store.put("downloads/a.pdf", b"hello").await.unwrap();
        let meta = store.head("downloads/a.pdf").await.unwrap();
        assert_eq!(meta.key, "downloads/a.pdf");
        assert_eq!(meta.size, 5);
        assert!(!meta.etag.is_empty());
    }

    #[tokio::test]
    async fn test_etag_changes_when_content_changes() {
        let (store, _dir) = store();

        store.put("downloads/a.pdf", b"one").await.unwrap();
        let before = store.head("downloads/a.pdf").await.unwrap();
        store.put("downloads/a.pdf", b"longer content").await.unwrap();
        let after = store.head("downloads/a.pdf").await.unwrap();
        assert_ne!(before.etag, after.etag);
    }

    #[tokio::test]
    async fn test_unsafe_keys_rejected() {
        let (store, _dir) = store();

        for key in ["", "/absolute", "a/../../etc/passwd", "bad\\slash"] {
            let err = store.get(key).await.unwrap_err();
            assert!(matches!(err, StorageError::InvalidKey { .. }), "key: {key}");
        }
    }

    #[tokio::test]
    async fn test_overwrite_is_atomic_put() {
        let (store, _dir) = store();

        store.put("downloads/a.pdf", b"v1").await.unwrap();
        store.put("downloads/a.pdf", b"v2").await.unwrap();
        assert_eq!(store.get("downloads/a.pdf").await.unwrap(), b"v2");

        // No temp file residue shows up in listings
        let keys: Vec<String> = store
            .list("")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.key)
            .collect();
        assert_eq!(keys, vec!["downloads/a.pdf"]);
    }
}
