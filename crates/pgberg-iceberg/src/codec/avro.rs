//! Avro manifests and manifest lists (Iceberg format version 2).
//!
//! Schemas carry the Iceberg field ids as `field-id` attributes. Int-keyed
//! maps use the Iceberg array-of-key/value-records representation.

use std::collections::BTreeMap;

use apache_avro::types::Value;
use apache_avro::{Reader, Schema as AvroSchema, Writer};
use serde_json::json;

use super::Artifact;
use crate::error::{IcebergError, IcebergResult};
use crate::types::{
    DataFile, DataFileStats, Manifest, ManifestEntry, ManifestFile, ManifestList, Schema,
};

const FORMAT_VERSION: &str = "2";

fn optional(avro_type: serde_json::Value) -> serde_json::Value {
    json!(["null", avro_type])
}

fn int_map(field_id: i32, key_id: i32, value_id: i32, value_type: &str, name: &str) -> serde_json::Value {
    json!({
        "name": name,
        "type": optional(json!({
            "type": "array",
            "logicalType": "map",
            "items": {
                "type": "record",
                "name": format!("k{key_id}_v{value_id}"),
                "fields": [
                    {"name": "key", "type": "int", "field-id": key_id},
                    {"name": "value", "type": value_type, "field-id": value_id}
                ]
            }
        })),
        "default": null,
        "field-id": field_id
    })
}

fn manifest_entry_schema() -> serde_json::Value {
    json!({
        "type": "record",
        "name": "manifest_entry",
        "fields": [
            {"name": "status", "type": "int", "field-id": 0},
            {"name": "snapshot_id", "type": optional(json!("long")), "default": null, "field-id": 1},
            {"name": "sequence_number", "type": optional(json!("long")), "default": null, "field-id": 3},
            {"name": "file_sequence_number", "type": optional(json!("long")), "default": null, "field-id": 4},
            {
                "name": "data_file",
                "field-id": 2,
                "type": {
                    "type": "record",
                    "name": "r2",
                    "fields": [
                        {"name": "content", "type": "int", "field-id": 134},
                        {"name": "file_path", "type": "string", "field-id": 100},
                        {"name": "file_format", "type": "string", "field-id": 101},
                        {
                            "name": "partition",
                            "type": {"type": "record", "name": "r102", "fields": []},
                            "field-id": 102
                        },
                        {"name": "record_count", "type": "long", "field-id": 103},
                        {"name": "file_size_in_bytes", "type": "long", "field-id": 104},
                        int_map(108, 117, 118, "long", "column_sizes"),
                        int_map(109, 119, 120, "long", "value_counts"),
                        int_map(110, 121, 122, "long", "null_value_counts"),
                        int_map(125, 126, 127, "bytes", "lower_bounds"),
                        int_map(128, 129, 130, "bytes", "upper_bounds")
                    ]
                }
            }
        ]
    })
}

fn manifest_file_schema() -> serde_json::Value {
    json!({
        "type": "record",
        "name": "manifest_file",
        "fields": [
            {"name": "manifest_path", "type": "string", "field-id": 500},
            {"name": "manifest_length", "type": "long", "field-id": 501},
            {"name": "partition_spec_id", "type": "int", "field-id": 502},
            {"name": "content", "type": "int", "field-id": 517},
            {"name": "sequence_number", "type": "long", "field-id": 515},
            {"name": "min_sequence_number", "type": "long", "field-id": 516},
            {"name": "added_snapshot_id", "type": "long", "field-id": 503},
            {"name": "added_files_count", "type": "int", "field-id": 504},
            {"name": "existing_files_count", "type": "int", "field-id": 505},
            {"name": "deleted_files_count", "type": "int", "field-id": 506},
            {"name": "added_rows_count", "type": "long", "field-id": 512},
            {"name": "existing_rows_count", "type": "long", "field-id": 513},
            {"name": "deleted_rows_count", "type": "long", "field-id": 514}
        ]
    })
}

fn parse_schema(artifact: Artifact, schema: &serde_json::Value) -> IcebergResult<AvroSchema> {
    AvroSchema::parse(schema)
        .map_err(|e| IcebergError::encode(artifact.as_str(), format!("invalid avro schema: {e}")))
}

fn write_container(
    artifact: Artifact,
    schema: &serde_json::Value,
    metadata: &[(&str, String)],
    records: Vec<Value>,
) -> IcebergResult<Vec<u8>> {
    let label = artifact.as_str();
    let schema = parse_schema(artifact, schema)?;
    let mut writer = Writer::new(&schema, Vec::new());
    for (key, value) in metadata {
        writer
            .add_user_metadata((*key).to_string(), value.as_bytes())
            .map_err(|e| IcebergError::encode(label, e))?;
    }
    for record in records {
        writer
            .append(record)
            .map_err(|e| IcebergError::encode(label, e))?;
    }
    writer
        .into_inner()
        .map_err(|e| IcebergError::encode(label, e))
}

fn read_container(
    artifact: Artifact,
    data: &[u8],
) -> IcebergResult<(BTreeMap<String, String>, Vec<Value>)> {
    let label = artifact.as_str();
    let reader = Reader::new(data).map_err(|e| IcebergError::decode(label, e))?;
    let metadata = reader
        .user_metadata()
        .iter()
        .map(|(k, v)| (k.clone(), String::from_utf8_lossy(v).into_owned()))
        .collect();
    let records = reader
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| IcebergError::decode(label, e))?;
    Ok((metadata, records))
}

// ============================================================================
// Value construction
// ============================================================================

fn opt_long(value: Option<i64>) -> Value {
    match value {
        Some(v) => Value::Union(1, Box::new(Value::Long(v))),
        None => Value::Union(0, Box::new(Value::Null)),
    }
}

fn map_value<T>(map: &BTreeMap<i32, T>, value: impl Fn(&T) -> Value) -> Value {
    let items = map
        .iter()
        .map(|(key, v)| {
            Value::Record(vec![
                ("key".to_string(), Value::Int(*key)),
                ("value".to_string(), value(v)),
            ])
        })
        .collect();
    Value::Union(1, Box::new(Value::Array(items)))
}

fn data_file_value(file: &DataFile) -> Value {
    let stats = &file.stats;
    Value::Record(vec![
        ("content".to_string(), Value::Int(file.content)),
        ("file_path".to_string(), Value::String(file.file_path.clone())),
        ("file_format".to_string(), Value::String(file.file_format.clone())),
        ("partition".to_string(), Value::Record(Vec::new())),
        ("record_count".to_string(), Value::Long(stats.record_count)),
        (
            "file_size_in_bytes".to_string(),
            Value::Long(file.file_size_in_bytes),
        ),
        (
            "column_sizes".to_string(),
            map_value(&stats.column_sizes, |v| Value::Long(*v)),
        ),
        (
            "value_counts".to_string(),
            map_value(&stats.value_counts, |v| Value::Long(*v)),
        ),
        (
            "null_value_counts".to_string(),
            map_value(&stats.null_value_counts, |v| Value::Long(*v)),
        ),
        (
            "lower_bounds".to_string(),
            map_value(&stats.lower_bounds, |v| Value::Bytes(v.clone())),
        ),
        (
            "upper_bounds".to_string(),
            map_value(&stats.upper_bounds, |v| Value::Bytes(v.clone())),
        ),
    ])
}

fn manifest_entry_value(entry: &ManifestEntry) -> Value {
    Value::Record(vec![
        ("status".to_string(), Value::Int(entry.status)),
        ("snapshot_id".to_string(), opt_long(entry.snapshot_id)),
        ("sequence_number".to_string(), opt_long(entry.sequence_number)),
        (
            "file_sequence_number".to_string(),
            opt_long(entry.file_sequence_number),
        ),
        ("data_file".to_string(), data_file_value(&entry.data_file)),
    ])
}

fn manifest_file_value(file: &ManifestFile) -> Value {
    Value::Record(vec![
        ("manifest_path".to_string(), Value::String(file.manifest_path.clone())),
        ("manifest_length".to_string(), Value::Long(file.manifest_length)),
        ("partition_spec_id".to_string(), Value::Int(file.partition_spec_id)),
        ("content".to_string(), Value::Int(file.content)),
        ("sequence_number".to_string(), Value::Long(file.sequence_number)),
        (
            "min_sequence_number".to_string(),
            Value::Long(file.min_sequence_number),
        ),
        ("added_snapshot_id".to_string(), Value::Long(file.added_snapshot_id)),
        ("added_files_count".to_string(), Value::Int(file.added_files_count)),
        (
            "existing_files_count".to_string(),
            Value::Int(file.existing_files_count),
        ),
        (
            "deleted_files_count".to_string(),
            Value::Int(file.deleted_files_count),
        ),
        ("added_rows_count".to_string(), Value::Long(file.added_rows_count)),
        (
            "existing_rows_count".to_string(),
            Value::Long(file.existing_rows_count),
        ),
        (
            "deleted_rows_count".to_string(),
            Value::Long(file.deleted_rows_count),
        ),
    ])
}

// ============================================================================
// Value extraction
// ============================================================================

/// Field access over a decoded Avro record.
struct Fields {
    artifact: &'static str,
    fields: Vec<(String, Value)>,
}

impl Fields {
    fn new(artifact: Artifact, value: Value) -> IcebergResult<Self> {
        match value {
            Value::Record(fields) => Ok(Self {
                artifact: artifact.as_str(),
                fields,
            }),
            other => Err(IcebergError::decode(
                artifact.as_str(),
                format!("expected record, found {other:?}"),
            )),
        }
    }

    fn take(&mut self, name: &str) -> IcebergResult<Value> {
        let position = self
            .fields
            .iter()
            .position(|(field, _)| field == name)
            .ok_or_else(|| IcebergError::decode(self.artifact, format!("missing field '{name}'")))?;
        Ok(match self.fields.swap_remove(position).1 {
            Value::Union(_, inner) => *inner,
            other => other,
        })
    }

    fn mismatch(&self, name: &str, expected: &str) -> IcebergError {
        IcebergError::decode(self.artifact, format!("field '{name}' is not {expected}"))
    }

    fn int(&mut self, name: &str) -> IcebergResult<i32> {
        match self.take(name)? {
            Value::Int(v) => Ok(v),
            _ => Err(self.mismatch(name, "an int")),
        }
    }

    fn long(&mut self, name: &str) -> IcebergResult<i64> {
        match self.take(name)? {
            Value::Long(v) => Ok(v),
            Value::Int(v) => Ok(i64::from(v)),
            _ => Err(self.mismatch(name, "a long")),
        }
    }

    fn opt_long(&mut self, name: &str) -> IcebergResult<Option<i64>> {
        match self.take(name)? {
            Value::Null => Ok(None),
            Value::Long(v) => Ok(Some(v)),
            _ => Err(self.mismatch(name, "an optional long")),
        }
    }

    fn string(&mut self, name: &str) -> IcebergResult<String> {
        match self.take(name)? {
            Value::String(v) => Ok(v),
            _ => Err(self.mismatch(name, "a string")),
        }
    }

    fn record(&mut self, name: &str, artifact: Artifact) -> IcebergResult<Self> {
        let value = self.take(name)?;
        Self::new(artifact, value)
    }

    fn int_map<T>(
        &mut self,
        name: &str,
        value: impl Fn(Value) -> Option<T>,
    ) -> IcebergResult<BTreeMap<i32, T>> {
        let items = match self.take(name)? {
            Value::Null => return Ok(BTreeMap::new()),
            Value::Array(items) => items,
            _ => return Err(self.mismatch(name, "a map")),
        };
        let mut map = BTreeMap::new();
        for item in items {
            let Value::Record(mut pair) = item else {
                return Err(self.mismatch(name, "a map of records"));
            };
            let v = pair.pop();
            let k = pair.pop();
            match (k, v) {
                (Some((_, Value::Int(key))), Some((_, raw))) => {
                    let parsed = value(raw).ok_or_else(|| self.mismatch(name, "a typed map"))?;
                    map.insert(key, parsed);
                }
                _ => return Err(self.mismatch(name, "an int-keyed map")),
            }
        }
        Ok(map)
    }
}

fn as_long(value: Value) -> Option<i64> {
    match value {
        Value::Long(v) => Some(v),
        _ => None,
    }
}

fn as_bytes(value: Value) -> Option<Vec<u8>> {
    match value {
        Value::Bytes(v) => Some(v),
        _ => None,
    }
}

fn decode_entry(value: Value) -> IcebergResult<ManifestEntry> {
    let mut entry = Fields::new(Artifact::Manifest, value)?;
    let mut file = entry.record("data_file", Artifact::Manifest)?;
    let stats = DataFileStats {
        record_count: file.long("record_count")?,
        column_sizes: file.int_map("column_sizes", as_long)?,
        value_counts: file.int_map("value_counts", as_long)?,
        null_value_counts: file.int_map("null_value_counts", as_long)?,
        lower_bounds: file.int_map("lower_bounds", as_bytes)?,
        upper_bounds: file.int_map("upper_bounds", as_bytes)?,
    };
    Ok(ManifestEntry {
        status: entry.int("status")?,
        snapshot_id: entry.opt_long("snapshot_id")?,
        sequence_number: entry.opt_long("sequence_number")?,
        file_sequence_number: entry.opt_long("file_sequence_number")?,
        data_file: DataFile {
            content: file.int("content")?,
            file_path: file.string("file_path")?,
            file_format: file.string("file_format")?,
            file_size_in_bytes: file.long("file_size_in_bytes")?,
            stats,
        },
    })
}

fn decode_manifest_file(value: Value) -> IcebergResult<ManifestFile> {
    let mut file = Fields::new(Artifact::ManifestList, value)?;
    Ok(ManifestFile {
        manifest_path: file.string("manifest_path")?,
        manifest_length: file.long("manifest_length")?,
        partition_spec_id: file.int("partition_spec_id")?,
        content: file.int("content")?,
        sequence_number: file.long("sequence_number")?,
        min_sequence_number: file.long("min_sequence_number")?,
        added_snapshot_id: file.long("added_snapshot_id")?,
        added_files_count: file.int("added_files_count")?,
        existing_files_count: file.int("existing_files_count")?,
        deleted_files_count: file.int("deleted_files_count")?,
        added_rows_count: file.long("added_rows_count")?,
        existing_rows_count: file.long("existing_rows_count")?,
        deleted_rows_count: file.long("deleted_rows_count")?,
    })
}

fn metadata_number(
    artifact: Artifact,
    metadata: &BTreeMap<String, String>,
    key: &str,
) -> IcebergResult<Option<i64>> {
    match metadata.get(key).map(String::as_str) {
        None | Some("null") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|_| {
            IcebergError::decode(artifact.as_str(), format!("metadata '{key}' is not a number"))
        }),
    }
}

// ============================================================================
// Public entry points
// ============================================================================

pub(crate) fn encode_manifest(manifest: &Manifest) -> IcebergResult<Vec<u8>> {
    let schema_json = serde_json::to_string(&manifest.schema)
        .map_err(|e| IcebergError::encode(Artifact::Manifest.as_str(), e))?;
    let metadata = [
        ("schema", schema_json),
        ("schema-id", manifest.schema.schema_id.to_string()),
        ("partition-spec", "[]".to_string()),
        ("partition-spec-id", "0".to_string()),
        ("format-version", FORMAT_VERSION.to_string()),
        ("content", "data".to_string()),
    ];
    let records = manifest.entries.iter().map(manifest_entry_value).collect();
    write_container(
        Artifact::Manifest,
        &manifest_entry_schema(),
        &metadata,
        records,
    )
}

pub(crate) fn decode_manifest(data: &[u8]) -> IcebergResult<Manifest> {
    let (metadata, records) = read_container(Artifact::Manifest, data)?;
    let schema_json = metadata.get("schema").ok_or_else(|| {
        IcebergError::decode(Artifact::Manifest.as_str(), "missing 'schema' metadata")
    })?;
    let schema: Schema = serde_json::from_str(schema_json)
        .map_err(|e| IcebergError::decode(Artifact::Manifest.as_str(), e))?;
    let entries = records
        .into_iter()
        .map(decode_entry)
        .collect::<IcebergResult<Vec<_>>>()?;
    Ok(Manifest { schema, entries })
}

pub(crate) fn encode_manifest_list(list: &ManifestList) -> IcebergResult<Vec<u8>> {
    let metadata = [
        ("snapshot-id", list.snapshot_id.to_string()),
        (
            "parent-snapshot-id",
            list.parent_snapshot_id
                .map_or_else(|| "null".to_string(), |id| id.to_string()),
        ),
        ("sequence-number", list.sequence_number.to_string()),
        ("format-version", FORMAT_VERSION.to_string()),
    ];
    let records = list.entries.iter().map(manifest_file_value).collect();
    write_container(
        Artifact::ManifestList,
        &manifest_file_schema(),
        &metadata,
        records,
    )
}

pub(crate) fn decode_manifest_list(data: &[u8]) -> IcebergResult<ManifestList> {
    let artifact = Artifact::ManifestList;
    let (metadata, records) = read_container(artifact, data)?;
    let snapshot_id = metadata_number(artifact, &metadata, "snapshot-id")?.ok_or_else(|| {
        IcebergError::decode(artifact.as_str(), "missing 'snapshot-id' metadata")
    })?;
    let entries = records
        .into_iter()
        .map(decode_manifest_file)
        .collect::<IcebergResult<Vec<_>>>()?;
    Ok(ManifestList {
        snapshot_id,
        parent_snapshot_id: metadata_number(artifact, &metadata, "parent-snapshot-id")?,
        sequence_number: metadata_number(artifact, &metadata, "sequence-number")?.unwrap_or(0),
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CONTENT_DATA, STATUS_ADDED};
    use pgberg_core::ColumnSchema;

    fn sample_entry() -> ManifestEntry {
        let mut stats = DataFileStats {
            record_count: 2,
            ..DataFileStats::default()
        };
        stats.value_counts.insert(1, 2);
        stats.null_value_counts.insert(1, 0);
        stats.lower_bounds.insert(1, 1_i32.to_le_bytes().to_vec());
        stats.upper_bounds.insert(1, 2_i32.to_le_bytes().to_vec());
        ManifestEntry {
            status: STATUS_ADDED,
            snapshot_id: Some(42),
            sequence_number: None,
            file_sequence_number: None,
            data_file: DataFile {
                content: CONTENT_DATA,
                file_path: "memory://warehouse/public/t/data/00000-0-a.parquet".to_string(),
                file_format: "PARQUET".to_string(),
                file_size_in_bytes: 512,
                stats,
            },
        }
    }

    #[test]
    fn test_manifest_decodes_what_was_encoded() {
        let columns = ColumnSchema::from_pg([("id", "int")]).unwrap();
        let manifest = Manifest {
            schema: Schema::from_columns(&columns),
            entries: vec![sample_entry()],
        };

        let bytes = encode_manifest(&manifest).unwrap();
        assert_eq!(&bytes[..4], b"Obj\x01");
        assert_eq!(decode_manifest(&bytes).unwrap(), manifest);
    }

    #[test]
    fn test_manifest_list_carries_snapshot_metadata() {
        let list = ManifestList {
            snapshot_id: 42,
            parent_snapshot_id: None,
            sequence_number: 1,
            entries: vec![ManifestFile {
                manifest_path: "memory://warehouse/public/t/metadata/a-m0.avro".to_string(),
                manifest_length: 900,
                partition_spec_id: 0,
                content: CONTENT_DATA,
                sequence_number: 1,
                min_sequence_number: 1,
                added_snapshot_id: 42,
                added_files_count: 1,
                existing_files_count: 0,
                deleted_files_count: 0,
                added_rows_count: 2,
                existing_rows_count: 0,
                deleted_rows_count: 0,
            }],
        };

        let bytes = encode_manifest_list(&list).unwrap();
        assert_eq!(decode_manifest_list(&bytes).unwrap(), list);
    }

    #[test]
    fn test_garbage_is_a_decode_error() {
        let err = decode_manifest(b"not avro").unwrap_err();
        assert!(matches!(err, IcebergError::Decode { artifact: "manifest", .. }));
    }
}
