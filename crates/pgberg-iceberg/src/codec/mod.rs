//! Encoding of table artifacts.
//!
//! [`FormatCodec`] is the seam between the commit pipeline and the byte
//! formats it writes. [`IcebergCodec`] is the standard implementation:
//! Parquet data files, Avro manifests and manifest lists, JSON metadata
//! and a plain-text version hint.

mod avro;
mod data;
mod values;

use bytes::Bytes;
use pgberg_core::ColumnSchema;

use crate::error::{IcebergError, IcebergResult};
use crate::types::{DataFileStats, Manifest, ManifestList, TableMetadata};

/// One row as Postgres text output. `None` is SQL NULL.
pub type Row = Vec<Option<String>>;

/// The artifacts making up one snapshot, in commit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    /// Columnar data file.
    DataFile,
    /// Manifest listing the data file.
    Manifest,
    /// Manifest list of the snapshot.
    ManifestList,
    /// Table metadata root.
    Metadata,
    /// Version pointer.
    VersionHint,
}

impl Artifact {
    /// Every artifact, in commit order.
    pub const ALL: [Self; 5] = [
        Self::DataFile,
        Self::Manifest,
        Self::ManifestList,
        Self::Metadata,
        Self::VersionHint,
    ];

    /// Returns the label used in errors, logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DataFile => "data_file",
            Self::Manifest => "manifest",
            Self::ManifestList => "manifest_list",
            Self::Metadata => "metadata",
            Self::VersionHint => "version_hint",
        }
    }
}

impl std::fmt::Display for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reads and writes the bytes of every table artifact.
pub trait FormatCodec: Send + Sync {
    /// File format name recorded in manifests.
    fn data_file_format(&self) -> &'static str;

    /// Encodes rows into a data file.
    ///
    /// # Errors
    ///
    /// Returns an error if a value does not parse as its column type or a row
    /// has the wrong width.
    fn encode_data(&self, columns: &ColumnSchema, rows: &[Row]) -> IcebergResult<Vec<u8>>;

    /// Computes statistics from a persisted data file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be decoded.
    fn data_stats(&self, columns: &ColumnSchema, data: Bytes) -> IcebergResult<DataFileStats>;

    /// Decodes a data file back into text rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be decoded.
    fn decode_data(&self, columns: &ColumnSchema, data: Bytes) -> IcebergResult<Vec<Row>>;

    /// Encodes a manifest.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be written.
    fn encode_manifest(&self, manifest: &Manifest) -> IcebergResult<Vec<u8>>;

    /// Decodes a manifest.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid manifest.
    fn decode_manifest(&self, data: &[u8]) -> IcebergResult<Manifest>;

    /// Encodes a manifest list.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be written.
    fn encode_manifest_list(&self, list: &ManifestList) -> IcebergResult<Vec<u8>>;

    /// Decodes a manifest list.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid manifest list.
    fn decode_manifest_list(&self, data: &[u8]) -> IcebergResult<ManifestList>;

    /// Encodes table metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn encode_metadata(&self, metadata: &TableMetadata) -> IcebergResult<Vec<u8>>;

    /// Decodes table metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not valid metadata JSON.
    fn decode_metadata(&self, data: &[u8]) -> IcebergResult<TableMetadata>;

    /// Encodes the version pointer.
    fn encode_version_hint(&self, version: i64) -> Vec<u8>;

    /// Decodes the version pointer.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not a decimal version.
    fn decode_version_hint(&self, data: &[u8]) -> IcebergResult<i64>;
}

/// Parquet, Avro and JSON encoding of Iceberg format-version 2 artifacts.
#[derive(Debug, Clone, Copy, Default)]
pub struct IcebergCodec;

impl FormatCodec for IcebergCodec {
    fn data_file_format(&self) -> &'static str {
        "PARQUET"
    }

    fn encode_data(&self, columns: &ColumnSchema, rows: &[Row]) -> IcebergResult<Vec<u8>> {
        data::encode_rows(columns, rows)
    }

    fn data_stats(&self, columns: &ColumnSchema, data: Bytes) -> IcebergResult<DataFileStats> {
        data::read_stats(columns, data)
    }

    fn decode_data(&self, columns: &ColumnSchema, data: Bytes) -> IcebergResult<Vec<Row>> {
        data::decode_rows(columns, data)
    }

    fn encode_manifest(&self, manifest: &Manifest) -> IcebergResult<Vec<u8>> {
        avro::encode_manifest(manifest)
    }

    fn decode_manifest(&self, data: &[u8]) -> IcebergResult<Manifest> {
        avro::decode_manifest(data)
    }

    fn encode_manifest_list(&self, list: &ManifestList) -> IcebergResult<Vec<u8>> {
        avro::encode_manifest_list(list)
    }

    fn decode_manifest_list(&self, data: &[u8]) -> IcebergResult<ManifestList> {
        avro::decode_manifest_list(data)
    }

    fn encode_metadata(&self, metadata: &TableMetadata) -> IcebergResult<Vec<u8>> {
        serde_json::to_vec_pretty(metadata)
            .map_err(|e| IcebergError::encode(Artifact::Metadata.as_str(), e))
    }

    fn decode_metadata(&self, data: &[u8]) -> IcebergResult<TableMetadata> {
        serde_json::from_slice(data)
            .map_err(|e| IcebergError::decode(Artifact::Metadata.as_str(), e))
    }

    fn encode_version_hint(&self, version: i64) -> Vec<u8> {
        version.to_string().into_bytes()
    }

    fn decode_version_hint(&self, data: &[u8]) -> IcebergResult<i64> {
        let label = Artifact::VersionHint.as_str();
        let text = std::str::from_utf8(data).map_err(|e| IcebergError::decode(label, e))?;
        text.trim()
            .parse()
            .map_err(|_| IcebergError::decode(label, format!("'{}' is not a version", text.trim())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_labels() {
        let labels: Vec<_> = Artifact::ALL.iter().map(|a| a.as_str()).collect();
        assert_eq!(
            labels,
            ["data_file", "manifest", "manifest_list", "metadata", "version_hint"]
        );
    }

    #[test]
    fn test_version_hint_is_decimal_text() {
        let codec = IcebergCodec;
        assert_eq!(codec.encode_version_hint(1), b"1");
        assert_eq!(codec.decode_version_hint(b"1\n").unwrap(), 1);
        assert!(codec.decode_version_hint(b"one").is_err());
    }
}
