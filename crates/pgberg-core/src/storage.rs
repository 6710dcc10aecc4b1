//! Storage backend abstraction for object storage (S3, local, memory).
//!
//! This module defines the storage contract the catalog cache and the commit
//! pipeline depend on. Keys are relative to the backend root; `root_uri`
//! returns the scheme-qualified location of that root so absolute artifact
//! locations can be built from keys.
//!
//! ## Publication
//!
//! Artifacts are always built completely in a local scratch file and handed
//! to [`StorageBackend::upload`] as one object. Backends never expose a
//! partially written object to readers.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Error, Result};

/// Storage backend trait for lakehouse objects.
///
/// All backends (object store, local filesystem, memory) implement this
/// trait. Calls may block on network I/O and may fail transiently; failures
/// are returned as [`Error::Storage`] naming the operation and key. No
/// backend retries internally beyond what its client is configured to do.
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Reads an entire object.
    ///
    /// Returns `Error::NotFound` if the object doesn't exist.
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Uploads a complete local file to `key`, replacing any existing object.
    ///
    /// The object is visible to subsequent reads once this returns.
    async fn upload(&self, local_file: &Path, key: &str) -> Result<()>;

    /// Returns the stored object's size in bytes, as reported by the backend.
    ///
    /// Returns `Error::NotFound` if the object doesn't exist.
    async fn head_size(&self, key: &str) -> Result<u64>;

    /// Lists every key at or below `prefix`.
    ///
    /// **Ordering**: arbitrary. Callers that need a stable order must sort.
    async fn list_all_keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Lists the directories exactly one level below `prefix`.
    ///
    /// Each returned entry is the full prefix of the child directory with a
    /// trailing `/` (for example `public/orders/` when listing `public/`).
    /// An empty `prefix` lists the top level.
    async fn list_immediate_subdirs(&self, prefix: &str) -> Result<Vec<String>>;

    /// Deletes a batch of keys. Missing keys are ignored.
    ///
    /// Best effort: a failure reports the batch as a whole.
    async fn delete_keys(&self, keys: &[String]) -> Result<()>;

    /// Returns the scheme-qualified root all keys are relative to.
    fn root_uri(&self) -> String;
}

/// Reads a local scratch file into memory for upload.
///
/// # Errors
///
/// Returns a storage error naming the file if it cannot be read.
pub async fn read_local_file(local_file: &Path) -> Result<Bytes> {
    tokio::fs::read(local_file)
        .await
        .map(Bytes::from)
        .map_err(|e| Error::storage_op("read local file", local_file.display(), e))
}

/// Returns the last path segment of a directory prefix (`a/b/` -> `b`).
#[must_use]
pub fn last_segment(prefix: &str) -> &str {
    prefix
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
}

fn normalize_dir_prefix(prefix: &str) -> String {
    if prefix.is_empty() || prefix.ends_with('/') {
        prefix.to_string()
    } else {
        format!("{prefix}/")
    }
}

/// In-memory storage backend for testing.
///
/// Thread-safe via `RwLock`. Not suitable for production.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    objects: Arc<RwLock<BTreeMap<String, Bytes>>>,
    root_uri: String,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self {
            objects: Arc::default(),
            root_uri: "memory://warehouse".to_string(),
        }
    }
}

impl MemoryBackend {
    /// Creates a new empty memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new empty memory backend reporting the given root URI.
    #[must_use]
    pub fn with_root_uri(root_uri: impl Into<String>) -> Self {
        Self {
            root_uri: root_uri.into(),
            ..Self::default()
        }
    }

    /// Stores an object directly, bypassing the upload path.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    pub fn insert(&self, key: impl Into<String>, data: impl Into<Bytes>) -> Result<()> {
        self.objects
            .write()
            .map_err(|_| poisoned())?
            .insert(key.into(), data.into());
        Ok(())
    }

    /// Returns every stored key in sorted order.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    pub fn keys(&self) -> Result<Vec<String>> {
        Ok(self
            .objects
            .read()
            .map_err(|_| poisoned())?
            .keys()
            .cloned()
            .collect())
    }
}

fn poisoned() -> Error {
    Error::Internal {
        message: "lock poisoned".into(),
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Bytes> {
        let objects = self.objects.read().map_err(|_| poisoned())?;
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("object not found: {key}")))
    }

    async fn upload(&self, local_file: &Path, key: &str) -> Result<()> {
        let data = read_local_file(local_file).await?;
        self.insert(key, data)
    }

    async fn head_size(&self, key: &str) -> Result<u64> {
        let objects = self.objects.read().map_err(|_| poisoned())?;
        objects
            .get(key)
            .map(|data| data.len() as u64)
            .ok_or_else(|| Error::NotFound(format!("object not found: {key}")))
    }

    async fn list_all_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let objects = self.objects.read().map_err(|_| poisoned())?;
        Ok(objects
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn list_immediate_subdirs(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = normalize_dir_prefix(prefix);
        let objects = self.objects.read().map_err(|_| poisoned())?;

        let dirs: BTreeSet<String> = objects
            .keys()
            .filter_map(|k| k.strip_prefix(prefix.as_str()))
            .filter_map(|rest| rest.split_once('/'))
            .map(|(child, _)| format!("{prefix}{child}/"))
            .collect();
        Ok(dirs.into_iter().collect())
    }

    async fn delete_keys(&self, keys: &[String]) -> Result<()> {
        let mut objects = self.objects.write().map_err(|_| poisoned())?;
        for key in keys {
            objects.remove(key);
        }
        Ok(())
    }

    fn root_uri(&self) -> String {
        self.root_uri.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn seeded() -> MemoryBackend {
        let backend = MemoryBackend::new();
        for key in [
            "public/orders/metadata/v1.metadata.json",
            "public/orders/data/00000-0-a.parquet",
            "public/users/metadata/v1.metadata.json",
            "sales/leads/metadata/v1.metadata.json",
        ] {
            backend.insert(key, Bytes::from_static(b"x")).unwrap();
        }
        backend
    }

    #[tokio::test]
    async fn test_list_immediate_subdirs_top_level() {
        let dirs = seeded().list_immediate_subdirs("").await.unwrap();
        assert_eq!(dirs, vec!["public/", "sales/"]);
    }

    #[tokio::test]
    async fn test_list_immediate_subdirs_one_level() {
        let backend = seeded();
        let dirs = backend.list_immediate_subdirs("public/").await.unwrap();
        assert_eq!(dirs, vec!["public/orders/", "public/users/"]);

        // Missing trailing slash is treated as a directory.
        let dirs = backend.list_immediate_subdirs("public").await.unwrap();
        assert_eq!(dirs, vec!["public/orders/", "public/users/"]);
    }

    #[tokio::test]
    async fn test_list_all_keys_is_recursive() {
        let keys = seeded().list_all_keys("public/orders/").await.unwrap();
        assert_eq!(keys.len(), 2);
    }

    #[tokio::test]
    async fn test_upload_and_head_size() {
        let backend = MemoryBackend::new();
        let mut scratch = tempfile::NamedTempFile::new().unwrap();
        scratch.write_all(b"hello world").unwrap();

        backend
            .upload(scratch.path(), "public/t/metadata/version-hint.text")
            .await
            .unwrap();

        let size = backend
            .head_size("public/t/metadata/version-hint.text")
            .await
            .unwrap();
        assert_eq!(size, 11);
        assert!(backend.head_size("missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_keys_ignores_missing() {
        let backend = seeded();
        backend
            .delete_keys(&[
                "public/orders/metadata/v1.metadata.json".to_string(),
                "does/not/exist".to_string(),
            ])
            .await
            .unwrap();
        assert_eq!(backend.keys().unwrap().len(), 3);
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("iceberg/public/"), "public");
        assert_eq!(last_segment("public"), "public");
    }
}
