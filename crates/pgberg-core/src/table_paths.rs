//! Canonical storage paths for lakehouse tables.
//!
//! This module is the **single source of truth** for table artifact keys.
//! The commit pipeline writes to these keys and the query rewriter reads the
//! metadata key back, so both sides must go through here.
//!
//! # Path Layout
//!
//! Keys are relative to the storage backend root:
//!
//! ```text
//! {schema}/{table}/
//! ├── data/
//! │   └── 00000-0-{uuid}.parquet
//! └── metadata/
//!     ├── {uuid}-m0.avro
//!     ├── snap-{snapshot_id}-0-{uuid}.avro
//!     ├── v{version}.metadata.json
//!     └── version-hint.text
//! ```

use crate::entity::SchemaTable;

/// Canonical path generator for table artifacts.
///
/// # Example
///
/// ```
/// use pgberg_core::{SchemaTable, TablePaths};
///
/// let table = SchemaTable::new("public", "orders");
/// assert_eq!(
///     TablePaths::metadata_file(&table, 1),
///     "public/orders/metadata/v1.metadata.json"
/// );
/// ```
pub struct TablePaths;

impl TablePaths {
    /// File name of the version pointer inside the metadata directory.
    pub const VERSION_HINT_FILE: &'static str = "version-hint.text";

    /// Data file extension.
    pub const DATA_EXTENSION: &'static str = "parquet";

    /// Manifest and manifest-list extension.
    pub const MANIFEST_EXTENSION: &'static str = "avro";

    /// Metadata version every commit writes; tables hold one snapshot.
    pub const CURRENT_METADATA_VERSION: i64 = 1;

    /// Returns the prefix holding every object of a table (trailing slash).
    #[must_use]
    pub fn table_prefix(table: &SchemaTable) -> String {
        format!("{}/{}/", table.schema, table.table)
    }

    /// Returns the data directory of a table (no trailing slash).
    #[must_use]
    pub fn data_dir(table: &SchemaTable) -> String {
        format!("{}data", Self::table_prefix(table))
    }

    /// Returns the metadata directory of a table (no trailing slash).
    #[must_use]
    pub fn metadata_dir(table: &SchemaTable) -> String {
        format!("{}metadata", Self::table_prefix(table))
    }

    /// Returns the data file key for a file uuid.
    #[must_use]
    pub fn data_file(table: &SchemaTable, file_uuid: &str) -> String {
        format!(
            "{}/00000-0-{file_uuid}.{}",
            Self::data_dir(table),
            Self::DATA_EXTENSION
        )
    }

    /// Returns the manifest key for a data file uuid.
    #[must_use]
    pub fn manifest(table: &SchemaTable, file_uuid: &str) -> String {
        format!(
            "{}/{file_uuid}-m0.{}",
            Self::metadata_dir(table),
            Self::MANIFEST_EXTENSION
        )
    }

    /// Returns the manifest-list key for a snapshot and data file uuid.
    #[must_use]
    pub fn manifest_list(table: &SchemaTable, snapshot_id: i64, file_uuid: &str) -> String {
        format!(
            "{}/snap-{snapshot_id}-0-{file_uuid}.{}",
            Self::metadata_dir(table),
            Self::MANIFEST_EXTENSION
        )
    }

    /// Returns the metadata file key for a version.
    #[must_use]
    pub fn metadata_file(table: &SchemaTable, version: i64) -> String {
        format!("{}/v{version}.metadata.json", Self::metadata_dir(table))
    }

    /// Returns the key of the metadata file readers scan.
    #[must_use]
    pub fn current_metadata_file(table: &SchemaTable) -> String {
        Self::metadata_file(table, Self::CURRENT_METADATA_VERSION)
    }

    /// Returns the version pointer key.
    #[must_use]
    pub fn version_hint(table: &SchemaTable) -> String {
        format!("{}/{}", Self::metadata_dir(table), Self::VERSION_HINT_FILE)
    }

    /// Joins a backend root URI and a relative key.
    #[must_use]
    pub fn uri(root_uri: &str, key: &str) -> String {
        format!(
            "{}/{}",
            root_uri.trim_end_matches('/'),
            key.trim_start_matches('/')
        )
    }

    /// Strips a backend root URI from an absolute location, yielding the key.
    ///
    /// The root must match whole path segments. Locations outside the root
    /// are returned unchanged.
    #[must_use]
    pub fn key_from_uri<'a>(root_uri: &str, location: &'a str) -> &'a str {
        let root = root_uri.trim_end_matches('/');
        match location.strip_prefix(root) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
            _ => location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> SchemaTable {
        SchemaTable::new("public", "orders")
    }

    #[test]
    fn test_directories() {
        assert_eq!(TablePaths::table_prefix(&orders()), "public/orders/");
        assert_eq!(TablePaths::data_dir(&orders()), "public/orders/data");
        assert_eq!(TablePaths::metadata_dir(&orders()), "public/orders/metadata");
    }

    #[test]
    fn test_artifact_names() {
        let uuid = "3f1c5a3e-0000-4000-8000-000000000001";
        assert_eq!(
            TablePaths::data_file(&orders(), uuid),
            format!("public/orders/data/00000-0-{uuid}.parquet")
        );
        assert_eq!(
            TablePaths::manifest(&orders(), uuid),
            format!("public/orders/metadata/{uuid}-m0.avro")
        );
        assert_eq!(
            TablePaths::manifest_list(&orders(), 42, uuid),
            format!("public/orders/metadata/snap-42-0-{uuid}.avro")
        );
        assert_eq!(
            TablePaths::current_metadata_file(&orders()),
            "public/orders/metadata/v1.metadata.json"
        );
        assert_eq!(
            TablePaths::version_hint(&orders()),
            "public/orders/metadata/version-hint.text"
        );
    }

    #[test]
    fn test_uri_roundtrip() {
        let key = TablePaths::metadata_file(&orders(), 1);
        let uri = TablePaths::uri("s3://bucket/iceberg/", &key);
        assert_eq!(uri, "s3://bucket/iceberg/public/orders/metadata/v1.metadata.json");
        assert_eq!(TablePaths::key_from_uri("s3://bucket/iceberg", &uri), key);
        assert_eq!(TablePaths::key_from_uri("s3://other", &key), key);
    }

    #[test]
    fn test_key_from_uri_requires_segment_boundary() {
        assert_eq!(
            TablePaths::key_from_uri("s3://b/iceberg", "s3://b/iceberg2/x"),
            "s3://b/iceberg2/x"
        );
        assert_eq!(TablePaths::key_from_uri("s3://b/iceberg/", "s3://b/iceberg/x"), "x");
        assert_eq!(TablePaths::key_from_uri("s3://b/iceberg", "s3://b/iceberg"), "");
    }
}
