//! Manifest and manifest-list records.
//!
//! Field names follow the Iceberg Avro schemas; maps keyed by field id use
//! `BTreeMap` so encoding is deterministic.

use std::collections::BTreeMap;

use super::metadata::Schema;

/// Manifest entry status: the file was added by the entry's snapshot.
pub const STATUS_ADDED: i32 = 1;

/// Content type for data files and data manifests.
pub const CONTENT_DATA: i32 = 0;

/// Per-column statistics of one data file, keyed by field id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataFileStats {
    /// Number of rows in the file.
    pub record_count: i64,
    /// Compressed on-disk size per column.
    pub column_sizes: BTreeMap<i32, i64>,
    /// Values per column, nulls included.
    pub value_counts: BTreeMap<i32, i64>,
    /// Nulls per column.
    pub null_value_counts: BTreeMap<i32, i64>,
    /// Lower bounds in single-value binary form.
    pub lower_bounds: BTreeMap<i32, Vec<u8>>,
    /// Upper bounds in single-value binary form.
    pub upper_bounds: BTreeMap<i32, Vec<u8>>,
}

/// A data file as recorded inside a manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFile {
    /// Content type (always data).
    pub content: i32,
    /// Absolute file location.
    pub file_path: String,
    /// File format name (`PARQUET`).
    pub file_format: String,
    /// Size reported by the storage backend.
    pub file_size_in_bytes: i64,
    /// Row count and column statistics.
    pub stats: DataFileStats,
}

/// One manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Entry status.
    pub status: i32,
    /// Snapshot that added the file.
    pub snapshot_id: Option<i64>,
    /// Data sequence number.
    pub sequence_number: Option<i64>,
    /// File sequence number.
    pub file_sequence_number: Option<i64>,
    /// The data file.
    pub data_file: DataFile,
}

/// A manifest: the entries of one snapshot plus the table schema it was
/// written against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Table schema at write time.
    pub schema: Schema,
    /// Entries.
    pub entries: Vec<ManifestEntry>,
}

/// A manifest-list entry describing one manifest file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestFile {
    /// Absolute manifest location.
    pub manifest_path: String,
    /// Manifest size in bytes.
    pub manifest_length: i64,
    /// Partition spec the manifest was written with.
    pub partition_spec_id: i32,
    /// Content type (always data).
    pub content: i32,
    /// Sequence number of the adding commit.
    pub sequence_number: i64,
    /// Lowest data sequence number in the manifest.
    pub min_sequence_number: i64,
    /// Snapshot that added the manifest.
    pub added_snapshot_id: i64,
    /// Files added.
    pub added_files_count: i32,
    /// Files carried over.
    pub existing_files_count: i32,
    /// Files deleted.
    pub deleted_files_count: i32,
    /// Rows added.
    pub added_rows_count: i64,
    /// Rows carried over.
    pub existing_rows_count: i64,
    /// Rows deleted.
    pub deleted_rows_count: i64,
}

/// A manifest list: the manifests making up one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestList {
    /// Snapshot the list describes.
    pub snapshot_id: i64,
    /// Parent snapshot, if any.
    pub parent_snapshot_id: Option<i64>,
    /// Sequence number of the snapshot.
    pub sequence_number: i64,
    /// Manifests.
    pub entries: Vec<ManifestFile>,
}
