//! Integration tests for the commit pipeline and snapshot reader.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use pgberg_core::{ColumnSchema, SchemaTable, StorageBackend, TablePaths};
use pgberg_iceberg::codec::{FormatCodec, IcebergCodec, Row};
use pgberg_iceberg::types::{CONTENT_DATA, STATUS_ADDED};
use pgberg_iceberg::{CommitPipeline, SnapshotReader};
use pgberg_test_utils::{StorageOp, TracingMemoryBackend, init_test_logging, orders_rows, orders_schema};

struct Fixture {
    backend: Arc<TracingMemoryBackend>,
    pipeline: CommitPipeline,
    reader: SnapshotReader,
}

impl Fixture {
    fn new() -> Self {
        init_test_logging();
        let backend = Arc::new(TracingMemoryBackend::with_root_uri("s3://bucket/iceberg"));
        let storage: Arc<dyn StorageBackend> = backend.clone();
        Self {
            backend,
            pipeline: CommitPipeline::new(storage.clone()),
            reader: SnapshotReader::new(storage),
        }
    }
}

fn text_rows(rows: &[&[Option<&str>]]) -> Vec<Row> {
    rows.iter()
        .map(|row| row.iter().map(|v| v.map(str::to_string)).collect())
        .collect()
}

#[tokio::test]
async fn commit_then_read_recovers_rows() {
    let fx = Fixture::new();
    let table = SchemaTable::new("public", "t");
    let columns = ColumnSchema::from_pg([("id", "int"), ("name", "text")]).expect("columns");
    let rows = text_rows(&[&[Some("1"), Some("a")], &[Some("2"), Some("b")]]);

    let outcome = fx
        .pipeline
        .commit(&table, &columns, || Ok::<_, std::io::Error>(rows.clone()))
        .await
        .expect("commit");

    let snapshot = fx.reader.read_table(&table).await.expect("read");
    assert_eq!(snapshot.version, 1);
    assert_eq!(
        snapshot.metadata_location,
        "s3://bucket/iceberg/public/t/metadata/v1.metadata.json"
    );
    assert_eq!(snapshot.metadata_location, outcome.metadata.location);
    assert_eq!(snapshot.columns, columns);
    assert_eq!(snapshot.rows, rows);
    assert_eq!(outcome.data_file.record_count, 2);
    assert_eq!(snapshot.manifest_record_count(), 2);
}

#[tokio::test]
async fn artifacts_upload_in_chain_order() {
    let fx = Fixture::new();
    let table = SchemaTable::new("sales", "orders");

    let outcome = fx
        .pipeline
        .commit(&table, &orders_schema(), || Ok::<_, std::io::Error>(orders_rows()))
        .await
        .expect("commit");

    let uuid = &outcome.data_file.uuid;
    let snapshot_id = outcome.manifest.snapshot_id;
    assert_eq!(
        fx.backend.uploaded_keys(),
        vec![
            format!("sales/orders/data/00000-0-{uuid}.parquet"),
            format!("sales/orders/metadata/{uuid}-m0.avro"),
            format!("sales/orders/metadata/snap-{snapshot_id}-0-{uuid}.avro"),
            "sales/orders/metadata/v1.metadata.json".to_string(),
            "sales/orders/metadata/version-hint.text".to_string(),
        ]
    );
    assert_eq!(
        fx.backend.peek(&TablePaths::version_hint(&table)).unwrap(),
        "1".as_bytes()
    );

    // Size and stats are read back from the stored data file.
    let ops = fx.backend.operations();
    let data_key = &outcome.data_file.key;
    assert!(ops.contains(&StorageOp::Head { key: data_key.clone() }));
    assert!(ops.contains(&StorageOp::Get { key: data_key.clone() }));
}

#[tokio::test]
async fn chain_links_match_descriptors() {
    let fx = Fixture::new();
    let table = SchemaTable::new("sales", "orders");
    let columns = orders_schema();

    let outcome = fx
        .pipeline
        .commit(&table, &columns, || Ok::<_, std::io::Error>(orders_rows()))
        .await
        .expect("commit");
    let snapshot = fx.reader.read_table(&table).await.expect("read");

    let current = snapshot.metadata.current_snapshot().expect("current snapshot");
    assert_eq!(current.snapshot_id, outcome.manifest.snapshot_id);
    assert_eq!(current.manifest_list, outcome.manifest_list.location);
    assert_eq!(current.summary["added-records"], "3");
    assert_eq!(snapshot.metadata.refs["main"].snapshot_id, current.snapshot_id);
    assert_eq!(snapshot.metadata.location, "s3://bucket/iceberg/sales/orders");
    assert_eq!(snapshot.metadata.last_column_id, 9);

    let list_entry = &snapshot.manifest_list.entries[0];
    assert_eq!(list_entry.manifest_path, outcome.manifest.location);
    assert_eq!(
        u64::try_from(list_entry.manifest_length).unwrap(),
        outcome.manifest.size
    );
    assert_eq!(list_entry.added_rows_count, 3);

    let entry = &snapshot.manifests[0].entries[0];
    assert_eq!(entry.status, STATUS_ADDED);
    assert_eq!(entry.snapshot_id, Some(outcome.manifest.snapshot_id));
    assert_eq!(entry.data_file.content, CONTENT_DATA);
    assert_eq!(entry.data_file.file_path, outcome.data_file.location);
    assert_eq!(entry.data_file.file_format, "PARQUET");
    assert_eq!(
        u64::try_from(entry.data_file.file_size_in_bytes).unwrap(),
        outcome.data_file.size
    );
    assert_eq!(entry.data_file.stats, outcome.data_file.stats);
    assert_eq!(snapshot.manifests[0].schema.fields.len(), 9);
}

#[tokio::test]
async fn stats_cover_every_column() {
    let fx = Fixture::new();
    let table = SchemaTable::new("sales", "orders");

    let outcome = fx
        .pipeline
        .commit(&table, &orders_schema(), || Ok::<_, std::io::Error>(orders_rows()))
        .await
        .expect("commit");
    let stats = &outcome.data_file.stats;

    assert_eq!(stats.record_count, 3);
    for field_id in 1..=9 {
        assert_eq!(stats.value_counts[&field_id], 3, "field {field_id}");
    }
    // customer (2), discount (5) and shipped_at (9) each hold one null.
    assert_eq!(stats.null_value_counts[&2], 1);
    assert_eq!(stats.null_value_counts[&5], 1);
    assert_eq!(stats.null_value_counts[&9], 1);
    assert_eq!(stats.lower_bounds[&1], 1_i64.to_le_bytes().to_vec());
    assert_eq!(stats.upper_bounds[&1], 3_i64.to_le_bytes().to_vec());
    assert_eq!(stats.lower_bounds[&2], b"alice".to_vec());
    assert_eq!(stats.upper_bounds[&2], b"bob".to_vec());
    assert_eq!(stats.lower_bounds[&6], vec![0]);
    assert_eq!(stats.upper_bounds[&6], vec![1]);
}

#[tokio::test]
async fn recommit_replaces_current_snapshot() {
    let fx = Fixture::new();
    let table = SchemaTable::new("public", "t");
    let columns = ColumnSchema::from_pg([("id", "int"), ("name", "text")]).expect("columns");

    let first = fx
        .pipeline
        .commit(&table, &columns, || {
            Ok::<_, std::io::Error>(text_rows(&[&[Some("1"), Some("old")]]))
        })
        .await
        .expect("first commit");
    let second = fx
        .pipeline
        .commit(&table, &columns, || {
            Ok::<_, std::io::Error>(text_rows(&[&[Some("2"), Some("new")]]))
        })
        .await
        .expect("second commit");

    assert_ne!(first.data_file.uuid, second.data_file.uuid);
    let snapshot = fx.reader.read_table(&table).await.expect("read");
    assert_eq!(snapshot.version, 1);
    assert_eq!(snapshot.rows, text_rows(&[&[Some("2"), Some("new")]]));
}

#[tokio::test]
async fn empty_commit_is_a_valid_snapshot() {
    let fx = Fixture::new();
    let table = SchemaTable::new("public", "empty");
    let columns = ColumnSchema::from_pg([("id", "int")]).expect("columns");

    let outcome = fx
        .pipeline
        .commit(&table, &columns, || Ok::<_, std::io::Error>(Vec::new()))
        .await
        .expect("commit");

    assert_eq!(outcome.data_file.record_count, 0);
    let snapshot = fx.reader.read_table(&table).await.expect("read");
    assert!(snapshot.rows.is_empty());
    assert!(snapshot.manifests[0].entries[0].data_file.stats.lower_bounds.is_empty());
}

#[tokio::test]
async fn manifest_metadata_carries_schema() {
    let fx = Fixture::new();
    let table = SchemaTable::new("public", "t");
    let columns = ColumnSchema::from_pg([("id", "bigint")]).expect("columns");

    let outcome = fx
        .pipeline
        .commit(&table, &columns, || {
            Ok::<_, std::io::Error>(text_rows(&[&[Some("7")]]))
        })
        .await
        .expect("commit");

    let bytes = fx.backend.peek(&outcome.manifest.key).unwrap();
    let manifest = IcebergCodec.decode_manifest(&bytes).expect("decode manifest");
    assert_eq!(manifest.schema.fields[0].name, "id");
    assert_eq!(manifest.schema.fields[0].field_type, "long");
}

#[tokio::test]
async fn drop_table_deletes_every_artifact() {
    let fx = Fixture::new();
    let table = SchemaTable::new("public", "t");
    let columns = ColumnSchema::from_pg([("id", "int")]).expect("columns");
    fx.pipeline
        .commit(&table, &columns, || {
            Ok::<_, std::io::Error>(text_rows(&[&[Some("1")]]))
        })
        .await
        .expect("commit");

    let deleted = fx.pipeline.drop_table(&table).await.expect("drop");

    assert_eq!(deleted, 5);
    assert!(fx.backend.keys().is_empty());
    assert!(fx.reader.read_table(&table).await.is_err());
}
