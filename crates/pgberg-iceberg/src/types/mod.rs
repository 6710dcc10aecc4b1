//! Iceberg artifact types.

pub mod descriptor;
pub mod manifest;
pub mod metadata;

pub use descriptor::{
    CommitOutcome, CommitSummary, DataFileDescriptor, ManifestDescriptor,
    ManifestListDescriptor, MetadataDescriptor,
};
pub use manifest::{
    CONTENT_DATA, DataFile, DataFileStats, Manifest, ManifestEntry, ManifestFile, ManifestList,
    STATUS_ADDED,
};
pub use metadata::{
    FORMAT_VERSION, MAIN_BRANCH, MetadataLogEntry, PartitionSpec, Schema, SchemaField, Snapshot,
    SnapshotLogEntry, SnapshotRef, SortOrder, TableMetadata,
};
