//! Test storage with operation tracing and failure injection.
//!
//! Provides an in-memory backend that records every operation for test
//! assertions and fails any operation whose key starts with an injected
//! prefix.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use pgberg_core::error::{Error, Result};
use pgberg_core::storage::{StorageBackend, read_local_file};

/// Record of a storage operation for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOp {
    /// Whole-object read.
    Get {
        /// Key that was read.
        key: String,
    },
    /// Upload of a local file.
    Upload {
        /// Key that was written.
        key: String,
        /// Bytes written.
        size: usize,
    },
    /// Size lookup.
    Head {
        /// Key that was checked.
        key: String,
    },
    /// Recursive listing.
    ListAll {
        /// Prefix that was listed.
        prefix: String,
    },
    /// One-level directory listing.
    ListDirs {
        /// Prefix that was listed.
        prefix: String,
    },
    /// Key deletion.
    Delete {
        /// Key that was deleted.
        key: String,
    },
}

impl StorageOp {
    /// Returns the key or prefix the operation targeted.
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::Get { key }
            | Self::Upload { key, .. }
            | Self::Head { key }
            | Self::Delete { key }
            | Self::ListAll { prefix: key }
            | Self::ListDirs { prefix: key } => key,
        }
    }
}

/// In-memory storage backend with operation tracing.
#[derive(Debug, Clone)]
pub struct TracingMemoryBackend {
    objects: Arc<Mutex<BTreeMap<String, Bytes>>>,
    operations: Arc<Mutex<Vec<StorageOp>>>,
    fail_prefixes: Arc<Mutex<Vec<String>>>,
    root_uri: String,
}

impl Default for TracingMemoryBackend {
    fn default() -> Self {
        Self {
            objects: Arc::default(),
            operations: Arc::default(),
            fail_prefixes: Arc::default(),
            root_uri: "memory://warehouse".to_string(),
        }
    }
}

impl TracingMemoryBackend {
    /// Creates a new empty tracing storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates storage that reports the given root URI.
    #[must_use]
    pub fn with_root_uri(root_uri: impl Into<String>) -> Self {
        Self {
            root_uri: root_uri.into(),
            ..Self::default()
        }
    }

    /// Returns all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<StorageOp> {
        self.operations.lock().expect("lock").clone()
    }

    /// Clears recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().expect("lock").clear();
    }

    /// Counts directory listings of exactly `prefix`.
    ///
    /// Listing the root (`""`) once per catalog reload makes this the
    /// reload counter in cache tests.
    #[must_use]
    pub fn dir_listings_of(&self, prefix: &str) -> usize {
        self.operations
            .lock()
            .expect("lock")
            .iter()
            .filter(|op| matches!(op, StorageOp::ListDirs { prefix: p } if p == prefix))
            .count()
    }

    /// Returns the keys uploaded so far, in upload order.
    #[must_use]
    pub fn uploaded_keys(&self) -> Vec<String> {
        self.operations
            .lock()
            .expect("lock")
            .iter()
            .filter_map(|op| match op {
                StorageOp::Upload { key, .. } => Some(key.clone()),
                _ => None,
            })
            .collect()
    }

    /// Makes every operation on a key starting with `prefix` fail.
    pub fn inject_failure(&self, prefix: impl Into<String>) {
        self.fail_prefixes.lock().expect("lock").push(prefix.into());
    }

    /// Clears all injected failures.
    pub fn clear_failures(&self) {
        self.fail_prefixes.lock().expect("lock").clear();
    }

    /// Stores an object directly, without recording an operation.
    pub fn seed(&self, key: impl Into<String>, data: impl Into<Bytes>) {
        self.objects
            .lock()
            .expect("lock")
            .insert(key.into(), data.into());
    }

    /// Returns a stored object without recording an operation.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<Bytes> {
        self.objects.lock().expect("lock").get(key).cloned()
    }

    /// Returns all stored keys in sorted order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().expect("lock").keys().cloned().collect()
    }

    fn record(&self, op: StorageOp) {
        self.operations.lock().expect("lock").push(op);
    }

    fn check_failure(&self, operation: &'static str, key: &str) -> Result<()> {
        let fail_prefixes = self.fail_prefixes.lock().expect("lock");
        if fail_prefixes.iter().any(|p| key.starts_with(p.as_str())) {
            return Err(Error::storage_op(
                operation,
                key,
                std::io::Error::other("injected failure"),
            ));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl StorageBackend for TracingMemoryBackend {
    async fn get(&self, key: &str) -> Result<Bytes> {
        self.check_failure("get", key)?;
        self.record(StorageOp::Get {
            key: key.to_string(),
        });
        self.peek(key)
            .ok_or_else(|| Error::NotFound(format!("object not found: {key}")))
    }

    async fn upload(&self, local_file: &Path, key: &str) -> Result<()> {
        self.check_failure("upload", key)?;
        let data = read_local_file(local_file).await?;
        self.record(StorageOp::Upload {
            key: key.to_string(),
            size: data.len(),
        });
        self.seed(key, data);
        Ok(())
    }

    async fn head_size(&self, key: &str) -> Result<u64> {
        self.check_failure("head", key)?;
        self.record(StorageOp::Head {
            key: key.to_string(),
        });
        self.peek(key)
            .map(|data| data.len() as u64)
            .ok_or_else(|| Error::NotFound(format!("object not found: {key}")))
    }

    async fn list_all_keys(&self, prefix: &str) -> Result<Vec<String>> {
        self.check_failure("list", prefix)?;
        self.record(StorageOp::ListAll {
            prefix: prefix.to_string(),
        });
        Ok(self
            .keys()
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect())
    }

    async fn list_immediate_subdirs(&self, prefix: &str) -> Result<Vec<String>> {
        self.check_failure("list directories", prefix)?;
        self.record(StorageOp::ListDirs {
            prefix: prefix.to_string(),
        });

        let dir = if prefix.is_empty() || prefix.ends_with('/') {
            prefix.to_string()
        } else {
            format!("{prefix}/")
        };
        let mut dirs: Vec<String> = self
            .keys()
            .iter()
            .filter_map(|k| k.strip_prefix(dir.as_str()))
            .filter_map(|rest| rest.split_once('/'))
            .map(|(child, _)| format!("{dir}{child}/"))
            .collect();
        dirs.dedup();
        Ok(dirs)
    }

    async fn delete_keys(&self, keys: &[String]) -> Result<()> {
        for key in keys {
            self.check_failure("delete", key)?;
        }
        for key in keys {
            self.record(StorageOp::Delete { key: key.clone() });
            self.objects.lock().expect("lock").remove(key);
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

    #[tokio::test]
    async fn tracing_storage_records_operations() {
        let storage = TracingMemoryBackend::new();
        let mut scratch = tempfile::NamedTempFile::new().unwrap();
        scratch.write_all(b"hello").unwrap();

        storage
            .upload(scratch.path(), "public/t/metadata/version-hint.text")
            .await
            .unwrap();
        let _ = storage.get("public/t/metadata/version-hint.text").await;
        let _ = storage.list_immediate_subdirs("").await;

        let ops = storage.operations();
        assert_eq!(ops.len(), 3);
        assert!(matches!(ops[0], StorageOp::Upload { size: 5, .. }));
        assert!(matches!(ops[1], StorageOp::Get { .. }));
        assert_eq!(storage.dir_listings_of(""), 1);
    }

    #[tokio::test]
    async fn tracing_storage_failure_injection() {
        let storage = TracingMemoryBackend::new();
        storage.seed("fail/a", "x");
        storage.seed("ok/a", "x");
        storage.inject_failure("fail/");

        assert!(storage.get("fail/a").await.is_err());
        assert!(storage.get("ok/a").await.is_ok());

        storage.clear_failures();
        assert!(storage.get("fail/a").await.is_ok());
    }

    #[tokio::test]
    async fn tracing_storage_lists_directories_once() {
        let storage = TracingMemoryBackend::new();
        storage.seed("public/a/metadata/v1.metadata.json", "{}");
        storage.seed("public/a/data/f.parquet", "PAR1");
        storage.seed("public/b/metadata/v1.metadata.json", "{}");

        let dirs = storage.list_immediate_subdirs("public/").await.unwrap();
        assert_eq!(dirs, vec!["public/a/", "public/b/"]);
    }
}
