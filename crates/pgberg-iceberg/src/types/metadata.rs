//! Iceberg table metadata (`vN.metadata.json`).

use std::collections::BTreeMap;

use pgberg_core::{ColumnDef, ColumnSchema, ColumnType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{IcebergError, IcebergResult};

/// Format version written by the commit pipeline.
pub const FORMAT_VERSION: i32 = 2;

/// Name of the branch every snapshot is committed to.
pub const MAIN_BRANCH: &str = "main";

/// Iceberg table metadata, format version 2.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TableMetadata {
    /// Format version (1 or 2).
    pub format_version: i32,

    /// Unique table identifier.
    pub table_uuid: Uuid,

    /// Table location (root path for data and metadata).
    pub location: String,

    /// Last sequence number assigned.
    pub last_sequence_number: i64,

    /// Last updated timestamp in milliseconds.
    pub last_updated_ms: i64,

    /// Last assigned column ID.
    pub last_column_id: i32,

    /// Current schema ID.
    pub current_schema_id: i32,

    /// All schemas.
    pub schemas: Vec<Schema>,

    /// Default partition spec ID.
    pub default_spec_id: i32,

    /// Partition specs.
    pub partition_specs: Vec<PartitionSpec>,

    /// Highest assigned partition field ID.
    pub last_partition_id: i32,

    /// Table properties.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,

    /// Current snapshot ID.
    pub current_snapshot_id: Option<i64>,

    /// Snapshot refs (branches and tags).
    #[serde(default)]
    pub refs: BTreeMap<String, SnapshotRef>,

    /// All snapshots.
    #[serde(default)]
    pub snapshots: Vec<Snapshot>,

    /// Snapshot log (history of current-snapshot-id changes).
    #[serde(default)]
    pub snapshot_log: Vec<SnapshotLogEntry>,

    /// Metadata log (history of metadata files).
    #[serde(default)]
    pub metadata_log: Vec<MetadataLogEntry>,

    /// Default sort order ID.
    pub default_sort_order_id: i32,

    /// Sort orders.
    pub sort_orders: Vec<SortOrder>,
}

impl TableMetadata {
    /// Returns the current schema.
    ///
    /// # Errors
    ///
    /// Returns an error if `current-schema-id` names no schema.
    pub fn current_schema(&self) -> IcebergResult<&Schema> {
        self.schemas
            .iter()
            .find(|s| s.schema_id == self.current_schema_id)
            .ok_or_else(|| {
                IcebergError::invalid_metadata(format!(
                    "current schema {} not found",
                    self.current_schema_id
                ))
            })
    }

    /// Returns the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the table has no current snapshot or the id names
    /// no snapshot.
    pub fn current_snapshot(&self) -> IcebergResult<&Snapshot> {
        let id = self
            .current_snapshot_id
            .ok_or_else(|| IcebergError::invalid_metadata("table has no current snapshot"))?;
        self.snapshots
            .iter()
            .find(|s| s.snapshot_id == id)
            .ok_or_else(|| IcebergError::invalid_metadata(format!("snapshot {id} not found")))
    }
}

/// Iceberg schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Schema {
    /// Schema type (always "struct" for table schemas).
    #[serde(rename = "type", default = "default_struct_type")]
    pub schema_type: String,

    /// Schema ID.
    pub schema_id: i32,

    /// Schema fields.
    #[serde(default)]
    pub fields: Vec<SchemaField>,
}

fn default_struct_type() -> String {
    "struct".to_string()
}

impl Schema {
    /// Builds schema 0 from a column schema, assigning field ids from 1.
    #[must_use]
    pub fn from_columns(columns: &ColumnSchema) -> Self {
        let fields = columns
            .columns()
            .iter()
            .zip(1..)
            .map(|(column, id)| SchemaField {
                id,
                name: column.name.clone(),
                required: false,
                field_type: column.column_type.iceberg_type().to_string(),
            })
            .collect();
        Self {
            schema_type: default_struct_type(),
            schema_id: 0,
            fields,
        }
    }

    /// Converts the fields back into a column schema.
    ///
    /// # Errors
    ///
    /// Returns an error if a field has a type the data codec cannot read.
    pub fn to_columns(&self) -> IcebergResult<ColumnSchema> {
        let columns = self
            .fields
            .iter()
            .map(|field| {
                ColumnType::from_iceberg(&field.field_type)
                    .map(|column_type| ColumnDef {
                        name: field.name.clone(),
                        column_type,
                    })
                    .ok_or_else(|| {
                        IcebergError::invalid_metadata(format!(
                            "unsupported type '{}' for field '{}'",
                            field.field_type, field.name
                        ))
                    })
            })
            .collect::<IcebergResult<Vec<_>>>()?;
        Ok(ColumnSchema::new(columns))
    }

    /// Returns the highest field id.
    #[must_use]
    pub fn highest_field_id(&self) -> i32 {
        self.fields.iter().map(|f| f.id).max().unwrap_or(0)
    }
}

/// A field in a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    /// Unique field ID.
    pub id: i32,

    /// Field name.
    pub name: String,

    /// Whether the field is required.
    pub required: bool,

    /// Primitive type name.
    #[serde(rename = "type")]
    pub field_type: String,
}

/// Iceberg snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Snapshot {
    /// Unique snapshot ID.
    pub snapshot_id: i64,

    /// Parent snapshot ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_snapshot_id: Option<i64>,

    /// Sequence number.
    #[serde(default)]
    pub sequence_number: i64,

    /// Timestamp in milliseconds.
    pub timestamp_ms: i64,

    /// Manifest list location.
    pub manifest_list: String,

    /// Snapshot summary.
    #[serde(default)]
    pub summary: BTreeMap<String, String>,

    /// Schema ID for this snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<i32>,
}

/// Entry in the snapshot log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SnapshotLogEntry {
    /// Snapshot ID.
    pub snapshot_id: i64,

    /// Timestamp in milliseconds.
    pub timestamp_ms: i64,
}

/// Entry in the metadata log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MetadataLogEntry {
    /// Metadata file location.
    pub metadata_file: String,

    /// Timestamp in milliseconds.
    pub timestamp_ms: i64,
}

/// Partition specification. Tables written here are unpartitioned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PartitionSpec {
    /// Spec ID.
    pub spec_id: i32,

    /// Partition fields.
    #[serde(default)]
    pub fields: Vec<serde_json::Value>,
}

/// Snapshot reference (branch or tag).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SnapshotRef {
    /// Snapshot ID.
    pub snapshot_id: i64,

    /// Reference type.
    #[serde(rename = "type")]
    pub ref_type: String,
}

/// Sort order specification. Tables written here are unsorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SortOrder {
    /// Order ID.
    pub order_id: i32,

    /// Sort fields.
    #[serde(default)]
    pub fields: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_field_ids_start_at_one() {
        let columns = ColumnSchema::from_pg([("id", "int"), ("name", "text")]).unwrap();
        let schema = Schema::from_columns(&columns);
        assert_eq!(schema.fields[0].id, 1);
        assert_eq!(schema.fields[1].field_type, "string");
        assert_eq!(schema.highest_field_id(), 2);
        assert_eq!(schema.to_columns().unwrap(), columns);
    }

    #[test]
    fn test_metadata_uses_kebab_case_keys() {
        let json = r#"{
            "format-version": 2,
            "table-uuid": "550e8400-e29b-41d4-a716-446655440000",
            "location": "s3://bucket/iceberg/public/orders",
            "last-sequence-number": 1,
            "last-updated-ms": 1700000000000,
            "last-column-id": 1,
            "current-schema-id": 0,
            "schemas": [{"type": "struct", "schema-id": 0, "fields": [
                {"id": 1, "name": "id", "required": false, "type": "int"}
            ]}],
            "default-spec-id": 0,
            "partition-specs": [{"spec-id": 0, "fields": []}],
            "last-partition-id": 999,
            "current-snapshot-id": 7,
            "snapshots": [{"snapshot-id": 7, "sequence-number": 1, "timestamp-ms": 1700000000000,
                "manifest-list": "s3://bucket/iceberg/public/orders/metadata/snap-7-0-x.avro"}],
            "default-sort-order-id": 0,
            "sort-orders": [{"order-id": 0, "fields": []}]
        }"#;

        let metadata: TableMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.current_snapshot().unwrap().snapshot_id, 7);
        assert_eq!(metadata.current_schema().unwrap().fields.len(), 1);
        assert!(metadata.refs.is_empty());
    }

    #[test]
    fn test_missing_snapshot_is_invalid() {
        let json = r#"{
            "format-version": 2,
            "table-uuid": "550e8400-e29b-41d4-a716-446655440000",
            "location": "memory://t",
            "last-sequence-number": 0,
            "last-updated-ms": 0,
            "last-column-id": 0,
            "current-schema-id": 0,
            "schemas": [],
            "default-spec-id": 0,
            "partition-specs": [],
            "last-partition-id": 999,
            "current-snapshot-id": null,
            "default-sort-order-id": 0,
            "sort-orders": []
        }"#;
        let metadata: TableMetadata = serde_json::from_str(json).unwrap();
        assert!(metadata.current_snapshot().is_err());
        assert!(metadata.current_schema().is_err());
    }
}
