//! [`StorageBackend`] implementation over the `object_store` crate.
//!
//! One type serves every physical backend: S3 (the reference backend), the
//! local filesystem, and an in-process memory store. Each is wrapped in a
//! [`PrefixStore`] so keys stay relative to the configured root prefix.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt as _, TryStreamExt as _};
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::prefix::PrefixStore;
use object_store::{ObjectStore, PutPayload};

use crate::config::{S3Config, StorageConfig};
use crate::error::{Error, Result};
use crate::storage::{StorageBackend, read_local_file};

/// Storage backend backed by an [`ObjectStore`].
#[derive(Debug, Clone)]
pub struct ObjectStoreBackend {
    store: Arc<dyn ObjectStore>,
    root_uri: String,
}

impl ObjectStoreBackend {
    /// Wraps an arbitrary object store whose root is reachable at `root_uri`.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, root_uri: impl Into<String>) -> Self {
        Self {
            store,
            root_uri: root_uri.into(),
        }
    }

    /// Builds the backend selected by the storage configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the backend cannot be constructed.
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        match config {
            StorageConfig::S3 { s3, iceberg_path } => Self::s3(s3, iceberg_path),
            StorageConfig::Local { dir, iceberg_path } => Self::local(dir, iceberg_path),
            StorageConfig::Memory { iceberg_path } => Ok(Self::memory(iceberg_path)),
        }
    }

    /// Creates an S3 backend rooted at `s3://{bucket}/{iceberg_path}`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the S3 client cannot be built.
    pub fn s3(config: &S3Config, iceberg_path: &str) -> Result<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_region(&config.region)
            .with_bucket_name(&config.bucket)
            .with_access_key_id(&config.access_key_id)
            .with_secret_access_key(config.secret_access_key.expose());
        if let Some(endpoint) = &config.endpoint {
            builder = builder.with_endpoint(endpoint).with_allow_http(true);
        }
        let s3 = builder
            .build()
            .map_err(|e| Error::configuration(format!("failed to build S3 client: {e}")))?;

        let root_uri = join_root(&format!("s3://{}", config.bucket), iceberg_path);
        let store = PrefixStore::new(s3, ObjectPath::from(iceberg_path));
        Ok(Self::new(Arc::new(store), root_uri))
    }

    /// Creates a local-filesystem backend rooted at `{dir}/{iceberg_path}`.
    ///
    /// The root directory is created if missing. Its absolute path (without
    /// a scheme) is the root URI, which is what local table readers expect.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the directory cannot be created.
    pub fn local(dir: &Path, iceberg_path: &str) -> Result<Self> {
        let root: PathBuf = if iceberg_path.is_empty() {
            dir.to_path_buf()
        } else {
            dir.join(iceberg_path)
        };
        std::fs::create_dir_all(&root).map_err(|e| {
            Error::configuration(format!("failed to create {}: {e}", root.display()))
        })?;
        let root = root.canonicalize().map_err(|e| {
            Error::configuration(format!("failed to resolve {}: {e}", root.display()))
        })?;
        let fs = LocalFileSystem::new_with_prefix(&root)
            .map_err(|e| Error::configuration(format!("failed to open local store: {e}")))?;

        Ok(Self::new(Arc::new(fs), root.display().to_string()))
    }

    /// Creates an in-process memory backend rooted at `memory://{iceberg_path}`.
    #[must_use]
    pub fn memory(iceberg_path: &str) -> Self {
        Self::new(
            Arc::new(InMemory::new()),
            join_root("memory://", iceberg_path),
        )
    }
}

fn join_root(base: &str, iceberg_path: &str) -> String {
    let path = iceberg_path.trim_matches('/');
    if path.is_empty() {
        base.trim_end_matches('/').to_string()
    } else if base.ends_with("://") {
        format!("{base}{path}")
    } else {
        format!("{}/{path}", base.trim_end_matches('/'))
    }
}

fn object_path(key: &str) -> ObjectPath {
    ObjectPath::from(key)
}

fn prefix_path(prefix: &str) -> Option<ObjectPath> {
    let trimmed = prefix.trim_matches('/');
    (!trimmed.is_empty()).then(|| ObjectPath::from(trimmed))
}

#[async_trait]
impl StorageBackend for ObjectStoreBackend {
    async fn get(&self, key: &str) -> Result<Bytes> {
        let path = object_path(key);
        let result = self.store.get(&path).await.map_err(|e| match e {
            object_store::Error::NotFound { .. } => {
                Error::NotFound(format!("object not found: {key}"))
            }
            other => Error::storage_op("get", key, other),
        })?;
        result
            .bytes()
            .await
            .map_err(|e| Error::storage_op("get", key, e))
    }

    async fn upload(&self, local_file: &Path, key: &str) -> Result<()> {
        let data = read_local_file(local_file).await?;
        self.store
            .put(&object_path(key), PutPayload::from(data))
            .await
            .map_err(|e| Error::storage_op("upload", key, e))?;
        Ok(())
    }

    async fn head_size(&self, key: &str) -> Result<u64> {
        let meta = self
            .store
            .head(&object_path(key))
            .await
            .map_err(|e| match e {
                object_store::Error::NotFound { .. } => {
                    Error::NotFound(format!("object not found: {key}"))
                }
                other => Error::storage_op("head", key, other),
            })?;
        Ok(meta.size)
    }

    async fn list_all_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix_path = prefix_path(prefix);
        self.store
            .list(prefix_path.as_ref())
            .map_ok(|meta| meta.location.to_string())
            .try_collect()
            .await
            .map_err(|e| Error::storage_op("list", prefix, e))
    }

    async fn list_immediate_subdirs(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix_path = prefix_path(prefix);
        let listing = self
            .store
            .list_with_delimiter(prefix_path.as_ref())
            .await
            .map_err(|e| Error::storage_op("list directories", prefix, e))?;
        Ok(listing
            .common_prefixes
            .into_iter()
            .map(|dir| format!("{dir}/"))
            .collect())
    }

    async fn delete_keys(&self, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let locations = stream::iter(keys.iter().map(|k| Ok(object_path(k)))).boxed();
        let results: Vec<_> = self.store.delete_stream(locations).collect().await;

        let mut failed = 0usize;
        let mut first_error = None;
        for result in results {
            match result {
                Ok(_) | Err(object_store::Error::NotFound { .. }) => {}
                Err(e) => {
                    failed += 1;
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            None => Ok(()),
            Some(e) => Err(Error::storage_op(
                "delete",
                format!("{failed} of {} key(s)", keys.len()),
                e,
            )),
        }
    }

    fn root_uri(&self) -> String {
        self.root_uri.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    async fn upload_bytes(backend: &ObjectStoreBackend, key: &str, data: &[u8]) {
        let mut scratch = tempfile::NamedTempFile::new().unwrap();
        scratch.write_all(data).unwrap();
        backend.upload(scratch.path(), key).await.unwrap();
    }

    #[test]
    fn test_root_uris() {
        assert_eq!(join_root("s3://bucket", "iceberg"), "s3://bucket/iceberg");
        assert_eq!(join_root("s3://bucket", ""), "s3://bucket");
        assert_eq!(join_root("memory://", "/iceberg/"), "memory://iceberg");
    }

    #[tokio::test]
    async fn test_memory_store_contract() {
        let backend = ObjectStoreBackend::memory("iceberg");
        upload_bytes(&backend, "public/orders/metadata/v1.metadata.json", b"{}").await;
        upload_bytes(&backend, "public/users/data/00000-0-a.parquet", b"PAR1").await;
        upload_bytes(&backend, "sales/leads/metadata/v1.metadata.json", b"{}").await;

        let mut schemas = backend.list_immediate_subdirs("").await.unwrap();
        schemas.sort();
        assert_eq!(schemas, vec!["public/", "sales/"]);

        let mut tables = backend.list_immediate_subdirs("public/").await.unwrap();
        tables.sort();
        assert_eq!(tables, vec!["public/orders/", "public/users/"]);

        assert_eq!(
            backend
                .head_size("public/users/data/00000-0-a.parquet")
                .await
                .unwrap(),
            4
        );

        let keys = backend.list_all_keys("public/orders/").await.unwrap();
        assert_eq!(keys, vec!["public/orders/metadata/v1.metadata.json"]);

        backend.delete_keys(&keys).await.unwrap();
        assert!(backend.list_all_keys("public/orders/").await.unwrap().is_empty());
        assert!(
            backend
                .get("public/orders/metadata/v1.metadata.json")
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn test_local_store_contract() {
        let dir = tempfile::tempdir().unwrap();
        let backend = ObjectStoreBackend::local(dir.path(), "iceberg").unwrap();
        assert!(backend.root_uri().ends_with("iceberg"));

        upload_bytes(&backend, "public/orders/metadata/version-hint.text", b"1").await;
        assert!(
            dir.path()
                .join("iceberg/public/orders/metadata/version-hint.text")
                .exists()
        );

        let tables = backend.list_immediate_subdirs("public/").await.unwrap();
        assert_eq!(tables, vec!["public/orders/"]);

        let data = backend
            .get("public/orders/metadata/version-hint.text")
            .await
            .unwrap();
        assert_eq!(&data[..], b"1");

        // Deleting a key that was never written is not an error.
        backend
            .delete_keys(&["public/orders/metadata/missing".to_string()])
            .await
            .unwrap();
    }
}
