//! The set of lakehouse tables known to the rewriter.
//!
//! Tables are discovered by listing the storage root two levels deep:
//! schema directories, then table directories inside each. A reload builds
//! a fresh set and swaps it in whole, so readers see either the old or the
//! new enumeration, never a mix.

use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};

use pgberg_core::observability::catalog_span;
use pgberg_core::storage::last_segment;
use pgberg_core::{SchemaTable, StorageBackend};
use tracing::Instrument as _;

use crate::error::Result;
use crate::metrics;

/// An immutable enumeration of lakehouse tables.
pub type CatalogSnapshot = Arc<BTreeSet<SchemaTable>>;

/// Cached lakehouse table enumeration.
pub struct CatalogCache {
    storage: Arc<dyn StorageBackend>,
    snapshot: RwLock<CatalogSnapshot>,
}

impl std::fmt::Debug for CatalogCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogCache")
            .field("root_uri", &self.storage.root_uri())
            .field("tables", &self.snapshot().len())
            .finish()
    }
}

impl CatalogCache {
    /// Creates a cache populated from the current storage listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage root cannot be listed.
    pub async fn new(storage: Arc<dyn StorageBackend>) -> Result<Self> {
        metrics::register_metrics();
        let tables = list_tables(storage.as_ref())
            .instrument(catalog_span("load"))
            .await?;
        tracing::info!(tables = tables.len(), "Loaded lakehouse catalog");
        Ok(Self {
            storage,
            snapshot: RwLock::new(Arc::new(tables)),
        })
    }

    /// Returns the storage backend the cache lists.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }

    /// Returns the current enumeration.
    #[must_use]
    pub fn snapshot(&self) -> CatalogSnapshot {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns true if `table` is in the current enumeration.
    #[must_use]
    pub fn contains(&self, table: &SchemaTable) -> bool {
        self.snapshot().contains(table)
    }

    /// Re-lists storage and replaces the enumeration.
    ///
    /// On failure the previous enumeration stays in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage root cannot be listed.
    pub async fn reload(&self) -> Result<CatalogSnapshot> {
        let tables = Arc::new(
            list_tables(self.storage.as_ref())
                .instrument(catalog_span("reload"))
                .await?,
        );
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::clone(&tables);
        metrics::record_reload();
        tracing::debug!(tables = tables.len(), "Reloaded lakehouse catalog");
        Ok(tables)
    }
}

async fn list_tables(storage: &dyn StorageBackend) -> Result<BTreeSet<SchemaTable>> {
    let mut tables = BTreeSet::new();
    for schema_dir in storage.list_immediate_subdirs("").await? {
        let schema = last_segment(&schema_dir);
        for table_dir in storage.list_immediate_subdirs(&schema_dir).await? {
            tables.insert(SchemaTable::new(schema, last_segment(&table_dir)));
        }
    }
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgberg_core::MemoryBackend;

    fn backend() -> Arc<MemoryBackend> {
        let storage = MemoryBackend::new();
        for key in [
            "public/orders/metadata/version-hint.text",
            "public/users/metadata/version-hint.text",
            "sales/leads/data/00000-0-a.parquet",
        ] {
            storage.insert(key, "1").unwrap();
        }
        Arc::new(storage)
    }

    #[tokio::test]
    async fn test_new_lists_two_levels() {
        let cache = CatalogCache::new(backend()).await.unwrap();
        let tables: Vec<_> = cache.snapshot().iter().map(ToString::to_string).collect();
        assert_eq!(tables, ["public.orders", "public.users", "sales.leads"]);
    }

    #[tokio::test]
    async fn test_reload_replaces_wholesale() {
        let storage = backend();
        let cache = CatalogCache::new(storage.clone()).await.unwrap();
        let before = cache.snapshot();

        storage
            .delete_keys(&["public/users/metadata/version-hint.text".to_string()])
            .await
            .unwrap();
        storage.insert("public/items/metadata/v1.metadata.json", "{}").unwrap();
        cache.reload().await.unwrap();

        assert!(!cache.contains(&SchemaTable::new("public", "users")));
        assert!(cache.contains(&SchemaTable::new("public", "items")));
        // Earlier snapshots are unaffected by the swap.
        assert!(before.contains(&SchemaTable::new("public", "users")));
    }

    #[tokio::test]
    async fn test_empty_root() {
        let cache = CatalogCache::new(Arc::new(MemoryBackend::new())).await.unwrap();
        assert!(cache.snapshot().is_empty());
    }
}
