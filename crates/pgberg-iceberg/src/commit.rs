//! Snapshot commit pipeline.
//!
//! A commit writes one complete snapshot of a table:
//!
//! 1. Parquet data file (`data/00000-0-{uuid}.parquet`)
//! 2. Manifest (`metadata/{uuid}-m0.avro`)
//! 3. Manifest list (`metadata/snap-{snapshot_id}-0-{uuid}.avro`)
//! 4. Metadata root (`metadata/v1.metadata.json`)
//! 5. Version pointer (`metadata/version-hint.text`)
//!
//! Every artifact is staged in a local scratch file and uploaded as one
//! object. Steps are strictly sequential; a failure stops the commit with the
//! earlier artifacts in place and the version pointer untouched.
//!
//! Commits always write metadata version 1: committing to an existing table
//! replaces its current snapshot. Concurrent commits to the same table are
//! not coordinated.

use std::collections::BTreeMap;
use std::sync::Arc;

use pgberg_core::observability::commit_span;
use pgberg_core::{ColumnSchema, SchemaTable, StorageBackend, TablePaths};
use rand::Rng as _;
use tracing::Instrument as _;
use uuid::Uuid;

use crate::codec::{Artifact, FormatCodec, IcebergCodec, Row};
use crate::error::{BoxError, IcebergError, IcebergResult};
use crate::metrics;
use crate::scratch::ScratchFile;
use crate::types::{
    CONTENT_DATA, CommitOutcome, DataFile, DataFileDescriptor, FORMAT_VERSION, MAIN_BRANCH,
    Manifest, ManifestDescriptor, ManifestEntry, ManifestFile, ManifestList,
    ManifestListDescriptor, MetadataDescriptor, PartitionSpec, STATUS_ADDED, Schema, Snapshot,
    SnapshotLogEntry, SnapshotRef, SortOrder, TableMetadata,
};

/// Metadata version written by every commit.
pub const METADATA_VERSION: i64 = TablePaths::CURRENT_METADATA_VERSION;

/// Sequence number of the single snapshot a commit creates.
const SEQUENCE_NUMBER: i64 = 1;

/// Partition field ids start above this value; tables are unpartitioned.
const LAST_PARTITION_ID: i32 = 999;

/// Writes table snapshots to a storage backend.
pub struct CommitPipeline<C = IcebergCodec> {
    storage: Arc<dyn StorageBackend>,
    codec: C,
}

impl CommitPipeline<IcebergCodec> {
    /// Creates a pipeline using the standard Iceberg codec.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self::with_codec(storage, IcebergCodec)
    }
}

impl<C: FormatCodec> CommitPipeline<C> {
    /// Creates a pipeline with a custom codec.
    #[must_use]
    pub fn with_codec(storage: Arc<dyn StorageBackend>, codec: C) -> Self {
        metrics::register_metrics();
        Self { storage, codec }
    }

    /// Returns the storage backend.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }

    /// Writes one complete snapshot of `table`.
    ///
    /// `rows` is invoked once, when the data file is built.
    ///
    /// # Errors
    ///
    /// Returns an error if the row source fails, a value cannot be encoded,
    /// a scratch file cannot be written, or a storage operation fails. The
    /// version pointer is only written once every other artifact is stored.
    pub async fn commit<F, E>(
        &self,
        table: &SchemaTable,
        columns: &ColumnSchema,
        rows: F,
    ) -> IcebergResult<CommitOutcome>
    where
        F: FnOnce() -> Result<Vec<Row>, E>,
        E: Into<BoxError>,
    {
        let span = commit_span(&table.schema, &table.table);
        let result = self
            .run_commit(table, columns, rows)
            .instrument(span)
            .await;

        match &result {
            Ok(outcome) => {
                metrics::record_commit(outcome.data_file.record_count);
                tracing::info!(
                    table = %table,
                    snapshot_id = outcome.manifest.snapshot_id,
                    records = outcome.data_file.record_count,
                    metadata = %outcome.metadata.location,
                    "Committed table snapshot"
                );
            }
            Err(e) => {
                metrics::record_failure();
                tracing::warn!(table = %table, error = %e, "Table commit failed");
            }
        }
        result
    }

    async fn run_commit<F, E>(
        &self,
        table: &SchemaTable,
        columns: &ColumnSchema,
        rows: F,
    ) -> IcebergResult<CommitOutcome>
    where
        F: FnOnce() -> Result<Vec<Row>, E>,
        E: Into<BoxError>,
    {
        let schema = Schema::from_columns(columns);

        // Step 1: Data file, with size and stats read back from storage
        let data_file = self.write_data_file(table, columns, rows).await?;

        // Step 2: Manifest under a fresh snapshot id
        let snapshot_id = rand::thread_rng().gen_range(1..i64::MAX);
        let manifest = self
            .write_manifest(table, &schema, &data_file, snapshot_id)
            .await?;

        // Step 3: Manifest list
        let manifest_list = self
            .write_manifest_list(table, &data_file, &manifest)
            .await?;

        // Step 4: Metadata root
        let metadata = self
            .write_metadata(table, schema, &data_file, &manifest, &manifest_list)
            .await?;

        // Step 5: Version pointer
        self.write_version_hint(table, &metadata).await?;

        Ok(CommitOutcome {
            table: table.clone(),
            data_file,
            manifest,
            manifest_list,
            metadata,
        })
    }

    async fn write_data_file<F, E>(
        &self,
        table: &SchemaTable,
        columns: &ColumnSchema,
        rows: F,
    ) -> IcebergResult<DataFileDescriptor>
    where
        F: FnOnce() -> Result<Vec<Row>, E>,
        E: Into<BoxError>,
    {
        let rows = rows().map_err(|e| IcebergError::RowSource { source: e.into() })?;
        let encoded = self.codec.encode_data(columns, &rows)?;

        let uuid = Uuid::new_v4().to_string();
        let key = TablePaths::data_file(table, &uuid);
        self.publish(Artifact::DataFile, &key, &encoded).await?;

        let size = self.storage.head_size(&key).await?;
        let persisted = self.storage.get(&key).await?;
        let stats = self.codec.data_stats(columns, persisted)?;

        Ok(DataFileDescriptor {
            location: self.location(&key),
            uuid,
            key,
            size,
            record_count: stats.record_count,
            stats,
        })
    }

    async fn write_manifest(
        &self,
        table: &SchemaTable,
        schema: &Schema,
        data_file: &DataFileDescriptor,
        snapshot_id: i64,
    ) -> IcebergResult<ManifestDescriptor> {
        let manifest = Manifest {
            schema: schema.clone(),
            entries: vec![ManifestEntry {
                status: STATUS_ADDED,
                snapshot_id: Some(snapshot_id),
                // Inherited from the manifest list.
                sequence_number: None,
                file_sequence_number: None,
                data_file: DataFile {
                    content: CONTENT_DATA,
                    file_path: data_file.location.clone(),
                    file_format: self.codec.data_file_format().to_string(),
                    file_size_in_bytes: to_i64(data_file.size),
                    stats: data_file.stats.clone(),
                },
            }],
        };
        let encoded = self.codec.encode_manifest(&manifest)?;

        let key = TablePaths::manifest(table, &data_file.uuid);
        self.publish(Artifact::Manifest, &key, &encoded).await?;
        let size = self.storage.head_size(&key).await?;

        Ok(ManifestDescriptor {
            location: self.location(&key),
            key,
            size,
            snapshot_id,
        })
    }

    async fn write_manifest_list(
        &self,
        table: &SchemaTable,
        data_file: &DataFileDescriptor,
        manifest: &ManifestDescriptor,
    ) -> IcebergResult<ManifestListDescriptor> {
        let list = ManifestList {
            snapshot_id: manifest.snapshot_id,
            parent_snapshot_id: None,
            sequence_number: SEQUENCE_NUMBER,
            entries: vec![ManifestFile {
                manifest_path: manifest.location.clone(),
                manifest_length: to_i64(manifest.size),
                partition_spec_id: 0,
                content: CONTENT_DATA,
                sequence_number: SEQUENCE_NUMBER,
                min_sequence_number: SEQUENCE_NUMBER,
                added_snapshot_id: manifest.snapshot_id,
                added_files_count: 1,
                existing_files_count: 0,
                deleted_files_count: 0,
                added_rows_count: data_file.record_count,
                existing_rows_count: 0,
                deleted_rows_count: 0,
            }],
        };
        let encoded = self.codec.encode_manifest_list(&list)?;

        let key = TablePaths::manifest_list(table, manifest.snapshot_id, &data_file.uuid);
        self.publish(Artifact::ManifestList, &key, &encoded).await?;

        Ok(ManifestListDescriptor {
            location: self.location(&key),
            key,
        })
    }

    async fn write_metadata(
        &self,
        table: &SchemaTable,
        schema: Schema,
        data_file: &DataFileDescriptor,
        manifest: &ManifestDescriptor,
        manifest_list: &ManifestListDescriptor,
    ) -> IcebergResult<MetadataDescriptor> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let snapshot_id = manifest.snapshot_id;
        let records = data_file.record_count.to_string();
        let files_size = data_file.size.to_string();
        let summary = BTreeMap::from([
            ("operation".to_string(), "append".to_string()),
            ("added-data-files".to_string(), "1".to_string()),
            ("added-records".to_string(), records.clone()),
            ("added-files-size".to_string(), files_size.clone()),
            ("total-data-files".to_string(), "1".to_string()),
            ("total-records".to_string(), records),
            ("total-files-size".to_string(), files_size),
            ("total-delete-files".to_string(), "0".to_string()),
            ("total-position-deletes".to_string(), "0".to_string()),
            ("total-equality-deletes".to_string(), "0".to_string()),
        ]);
        let table_prefix = TablePaths::table_prefix(table);

        let metadata = TableMetadata {
            format_version: FORMAT_VERSION,
            table_uuid: Uuid::new_v4(),
            location: self.location(table_prefix.trim_end_matches('/')),
            last_sequence_number: SEQUENCE_NUMBER,
            last_updated_ms: now_ms,
            last_column_id: schema.highest_field_id(),
            current_schema_id: schema.schema_id,
            schemas: vec![schema],
            default_spec_id: 0,
            partition_specs: vec![PartitionSpec::default()],
            last_partition_id: LAST_PARTITION_ID,
            properties: BTreeMap::from([(
                "write.format.default".to_string(),
                self.codec.data_file_format().to_ascii_lowercase(),
            )]),
            current_snapshot_id: Some(snapshot_id),
            refs: BTreeMap::from([(
                MAIN_BRANCH.to_string(),
                SnapshotRef {
                    snapshot_id,
                    ref_type: "branch".to_string(),
                },
            )]),
            snapshots: vec![Snapshot {
                snapshot_id,
                parent_snapshot_id: None,
                sequence_number: SEQUENCE_NUMBER,
                timestamp_ms: now_ms,
                manifest_list: manifest_list.location.clone(),
                summary,
                schema_id: Some(0),
            }],
            snapshot_log: vec![SnapshotLogEntry {
                snapshot_id,
                timestamp_ms: now_ms,
            }],
            metadata_log: Vec::new(),
            default_sort_order_id: 0,
            sort_orders: vec![SortOrder::default()],
        };
        let encoded = self.codec.encode_metadata(&metadata)?;

        let key = TablePaths::metadata_file(table, METADATA_VERSION);
        self.publish(Artifact::Metadata, &key, &encoded).await?;

        Ok(MetadataDescriptor {
            version: METADATA_VERSION,
            location: self.location(&key),
            key,
        })
    }

    async fn write_version_hint(
        &self,
        table: &SchemaTable,
        metadata: &MetadataDescriptor,
    ) -> IcebergResult<()> {
        let encoded = self.codec.encode_version_hint(metadata.version);
        let key = TablePaths::version_hint(table);
        self.publish(Artifact::VersionHint, &key, &encoded).await
    }

    /// Stages `bytes` locally and uploads them as one object.
    async fn publish(&self, artifact: Artifact, key: &str, bytes: &[u8]) -> IcebergResult<()> {
        let scratch = ScratchFile::write(artifact, bytes)?;
        self.storage.upload(scratch.path(), key).await?;
        metrics::record_artifact(artifact);
        tracing::debug!(artifact = %artifact, key = %key, size = scratch.len(), "Uploaded artifact");
        Ok(())
    }

    fn location(&self, key: &str) -> String {
        TablePaths::uri(&self.storage.root_uri(), key)
    }

    /// Deletes every object stored under the table's prefix.
    ///
    /// Deletion is a plain batch delete: it is not atomic with respect to
    /// concurrent readers. Returns the number of keys deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if listing or deleting fails.
    pub async fn drop_table(&self, table: &SchemaTable) -> IcebergResult<usize> {
        let prefix = TablePaths::table_prefix(table);
        let keys = self.storage.list_all_keys(&prefix).await?;
        if keys.is_empty() {
            tracing::debug!(table = %table, "No objects to delete");
            return Ok(0);
        }

        self.storage.delete_keys(&keys).await?;
        tracing::info!(table = %table, deleted = keys.len(), "Dropped table");
        Ok(keys.len())
    }
}

fn to_i64(size: u64) -> i64 {
    i64::try_from(size).unwrap_or(i64::MAX)
}
