//! Reading a committed snapshot back by following its artifact chain.
//!
//! The walk starts at the version pointer and goes backward: version hint,
//! metadata file, current snapshot's manifest list, manifests, data files.
//! No directory listing is needed.

use std::sync::Arc;

use pgberg_core::{ColumnSchema, SchemaTable, StorageBackend, TablePaths};

use crate::codec::{FormatCodec, IcebergCodec, Row};
use crate::error::{IcebergError, IcebergResult};
use crate::types::{Manifest, ManifestList, TableMetadata};

/// Everything reachable from a table's version pointer.
#[derive(Debug, Clone)]
pub struct TableSnapshot {
    /// Version recorded in the version pointer.
    pub version: i64,
    /// Absolute location of the metadata file.
    pub metadata_location: String,
    /// Parsed metadata.
    pub metadata: TableMetadata,
    /// Manifest list of the current snapshot.
    pub manifest_list: ManifestList,
    /// Manifests in manifest-list order.
    pub manifests: Vec<Manifest>,
    /// Column schema of the current table schema.
    pub columns: ColumnSchema,
    /// Data rows as Postgres text output, in manifest order.
    pub rows: Vec<Row>,
}

impl TableSnapshot {
    /// Total record count claimed by the manifests.
    #[must_use]
    pub fn manifest_record_count(&self) -> i64 {
        self.manifests
            .iter()
            .flat_map(|m| &m.entries)
            .map(|e| e.data_file.stats.record_count)
            .sum()
    }
}

/// Reads table snapshots from a storage backend.
pub struct SnapshotReader<C = IcebergCodec> {
    storage: Arc<dyn StorageBackend>,
    codec: C,
}

impl SnapshotReader<IcebergCodec> {
    /// Creates a reader using the standard Iceberg codec.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self::with_codec(storage, IcebergCodec)
    }
}

impl<C: FormatCodec> SnapshotReader<C> {
    /// Creates a reader with a custom codec.
    #[must_use]
    pub fn with_codec(storage: Arc<dyn StorageBackend>, codec: C) -> Self {
        Self { storage, codec }
    }

    /// Reads the current snapshot of `table`, including its data rows.
    ///
    /// # Errors
    ///
    /// Returns an error if any artifact in the chain is missing or cannot be
    /// decoded, or if the metadata references a snapshot or schema it does
    /// not contain.
    pub async fn read_table(&self, table: &SchemaTable) -> IcebergResult<TableSnapshot> {
        let hint = self.storage.get(&TablePaths::version_hint(table)).await?;
        let version = self.codec.decode_version_hint(&hint)?;

        let metadata_key = TablePaths::metadata_file(table, version);
        let metadata = self
            .codec
            .decode_metadata(&self.storage.get(&metadata_key).await?)?;
        let columns = metadata.current_schema()?.to_columns()?;
        let snapshot = metadata.current_snapshot()?;

        let list_bytes = self.storage.get(self.key_of(&snapshot.manifest_list)).await?;
        let manifest_list = self.codec.decode_manifest_list(&list_bytes)?;
        if manifest_list.snapshot_id != snapshot.snapshot_id {
            return Err(IcebergError::invalid_metadata(format!(
                "manifest list belongs to snapshot {}, expected {}",
                manifest_list.snapshot_id, snapshot.snapshot_id
            )));
        }

        let mut manifests = Vec::with_capacity(manifest_list.entries.len());
        let mut rows = Vec::new();
        for file in &manifest_list.entries {
            let manifest_bytes = self.storage.get(self.key_of(&file.manifest_path)).await?;
            let manifest = self.codec.decode_manifest(&manifest_bytes)?;
            for entry in &manifest.entries {
                let data = self
                    .storage
                    .get(self.key_of(&entry.data_file.file_path))
                    .await?;
                rows.extend(self.codec.decode_data(&columns, data)?);
            }
            manifests.push(manifest);
        }

        tracing::debug!(table = %table, version, rows = rows.len(), "Read table snapshot");

        Ok(TableSnapshot {
            version,
            metadata_location: TablePaths::uri(&self.storage.root_uri(), &metadata_key),
            metadata,
            manifest_list,
            manifests,
            columns,
            rows,
        })
    }

    fn key_of<'a>(&self, location: &'a str) -> &'a str {
        TablePaths::key_from_uri(&self.storage.root_uri(), location)
    }
}
