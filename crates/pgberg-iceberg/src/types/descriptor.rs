//! Descriptors returned by each commit step.
//!
//! Each descriptor carries the identifiers the next artifact embeds: the
//! data file uuid names the manifest, the snapshot id and uuid name the
//! manifest list, and the metadata version is what the version pointer
//! records.

use pgberg_core::SchemaTable;
use serde::Serialize;

use super::manifest::DataFileStats;

/// The written data file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFileDescriptor {
    /// Generated file uuid.
    pub uuid: String,
    /// Backend key.
    pub key: String,
    /// Absolute location recorded in the manifest.
    pub location: String,
    /// Size reported by the storage backend.
    pub size: u64,
    /// Rows written.
    pub record_count: i64,
    /// Statistics recomputed from the persisted file.
    pub stats: DataFileStats,
}

/// The written manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDescriptor {
    /// Backend key.
    pub key: String,
    /// Absolute location recorded in the manifest list.
    pub location: String,
    /// Size reported by the storage backend.
    pub size: u64,
    /// Snapshot the manifest belongs to.
    pub snapshot_id: i64,
}

/// The written manifest list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestListDescriptor {
    /// Backend key.
    pub key: String,
    /// Absolute location recorded in the metadata.
    pub location: String,
}

/// The written metadata root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataDescriptor {
    /// Metadata version (always 1).
    pub version: i64,
    /// Backend key.
    pub key: String,
    /// Absolute location.
    pub location: String,
}

/// Result of one successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Target table.
    pub table: SchemaTable,
    /// Data file.
    pub data_file: DataFileDescriptor,
    /// Manifest.
    pub manifest: ManifestDescriptor,
    /// Manifest list.
    pub manifest_list: ManifestListDescriptor,
    /// Metadata root.
    pub metadata: MetadataDescriptor,
}

impl CommitOutcome {
    /// Summarises the commit for reporting.
    #[must_use]
    pub fn summary(&self) -> CommitSummary {
        CommitSummary {
            table: self.table.to_string(),
            snapshot_id: self.manifest.snapshot_id,
            record_count: self.data_file.record_count,
            data_file_size: self.data_file.size,
            metadata_location: self.metadata.location.clone(),
        }
    }
}

/// Serializable commit report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    /// `schema.table`.
    pub table: String,
    /// New snapshot id.
    pub snapshot_id: i64,
    /// Rows committed.
    pub record_count: i64,
    /// Data file size in bytes.
    pub data_file_size: u64,
    /// Location of the new metadata root.
    pub metadata_location: String,
}
