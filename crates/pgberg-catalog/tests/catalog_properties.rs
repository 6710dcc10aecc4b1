//! Cache and resolution properties, including a round trip through the
//! commit pipeline.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use pgberg_catalog::{CatalogCache, QueryCatalogRewriter, StatementRewriter};
use pgberg_core::{ColumnSchema, SchemaTable, StorageBackend, TablePaths};
use pgberg_iceberg::{CommitPipeline, SnapshotReader};
use pgberg_test_utils::{TracingMemoryBackend, init_test_logging, seed_table, test_identity};

const ROOT: &str = "memory://lake";

struct Fixture {
    backend: Arc<TracingMemoryBackend>,
    storage: Arc<dyn StorageBackend>,
    cache: Arc<CatalogCache>,
    rewriter: StatementRewriter,
}

impl Fixture {
    async fn with_tables(tables: &[(&str, &str)]) -> Self {
        init_test_logging();
        let backend = Arc::new(TracingMemoryBackend::with_root_uri(ROOT));
        for (schema, table) in tables {
            seed_table(&backend, schema, table);
        }
        let storage: Arc<dyn StorageBackend> = backend.clone();
        let cache = Arc::new(CatalogCache::new(storage.clone()).await.expect("cache"));
        let rewriter = StatementRewriter::new(QueryCatalogRewriter::new(
            Arc::clone(&cache),
            test_identity(),
        ));
        Self {
            backend,
            storage,
            cache,
            rewriter,
        }
    }

    async fn rewrite(&self, sql: &str) -> String {
        self.rewriter.rewrite_sql(sql).await.expect("rewrite")
    }
}

/// Extracts the metadata location from a rewritten scan.
fn scan_location(sql: &str) -> &str {
    let marker = "iceberg_scan('";
    let start = sql.find(marker).expect("scan") + marker.len();
    let len = sql[start..].find('\'').expect("closing quote");
    &sql[start..start + len]
}

#[tokio::test]
async fn every_cached_table_scans_its_v1_metadata() {
    let tables = [("public", "orders"), ("public", "users"), ("sales", "leads")];
    let fx = Fixture::with_tables(&tables).await;

    for (schema, table) in tables {
        let sql = fx.rewrite(&format!("SELECT * FROM {schema}.{table}")).await;
        let expected = TablePaths::uri(
            ROOT,
            &TablePaths::current_metadata_file(&SchemaTable::new(schema, table)),
        );
        assert_eq!(scan_location(&sql), expected);
        assert_eq!(
            expected,
            format!("{ROOT}/{schema}/{table}/metadata/v1.metadata.json")
        );
    }
}

#[tokio::test]
async fn cache_hit_does_not_reload() {
    let fx = Fixture::with_tables(&[("public", "orders")]).await;
    fx.backend.clear_operations();

    fx.rewrite("SELECT * FROM orders").await;
    assert_eq!(fx.backend.dir_listings_of(""), 0);
}

#[tokio::test]
async fn miss_reloads_exactly_once_and_returns_reference_unchanged() {
    let fx = Fixture::with_tables(&[("public", "orders")]).await;
    fx.backend.clear_operations();

    let sql = "SELECT * FROM public.missing";
    assert_eq!(fx.rewrite(sql).await, sql);
    assert_eq!(fx.backend.dir_listings_of(""), 1);
}

#[tokio::test]
async fn unqualified_table_defaults_to_public() {
    let fx = Fixture::with_tables(&[("public", "t")]).await;
    assert_eq!(
        fx.rewrite("SELECT * FROM t").await,
        fx.rewrite("SELECT * FROM public.t").await
    );
}

#[tokio::test]
async fn statio_view_is_empty_regardless_of_cache() {
    let fx = Fixture::with_tables(&[("public", "orders"), ("public", "users")]).await;
    let sql = fx
        .rewrite("SELECT * FROM pg_catalog.pg_statio_user_tables")
        .await;
    assert!(sql.contains("WHERE false"), "{sql}");
    assert!(!sql.contains("VALUES"), "{sql}");
}

#[tokio::test]
async fn added_table_resolves_without_restart() {
    let fx = Fixture::with_tables(&[]).await;
    seed_table(&fx.backend, "public", "late");

    let sql = fx.rewrite("SELECT * FROM late").await;
    assert_eq!(scan_location(&sql), format!("{ROOT}/public/late/metadata/v1.metadata.json"));
}

#[tokio::test]
async fn removed_table_is_unresolvable_after_reload() {
    let fx = Fixture::with_tables(&[("public", "orders"), ("public", "gone")]).await;
    let gone = SchemaTable::new("public", "gone");
    let keys = fx
        .storage
        .list_all_keys(&TablePaths::table_prefix(&gone))
        .await
        .unwrap();
    fx.storage.delete_keys(&keys).await.unwrap();

    fx.cache.reload().await.unwrap();

    let sql = "SELECT * FROM gone";
    assert_eq!(fx.rewrite(sql).await, sql);
    assert!(fx.rewrite("SELECT * FROM orders").await.contains("iceberg_scan"));
}

#[tokio::test]
async fn failed_reload_keeps_previous_enumeration() {
    let fx = Fixture::with_tables(&[("public", "orders")]).await;
    fx.backend.inject_failure("");

    assert!(fx.cache.reload().await.is_err());
    assert!(fx.rewriter.rewrite_sql("SELECT * FROM missing").await.is_err());

    fx.backend.clear_failures();
    assert!(fx.cache.contains(&SchemaTable::new("public", "orders")));
}

#[tokio::test]
async fn committed_table_round_trips_through_rewritten_scan() {
    let fx = Fixture::with_tables(&[]).await;
    let table = SchemaTable::new("public", "t");
    let columns = ColumnSchema::from_pg([("id", "int"), ("name", "text")]).unwrap();
    let rows = vec![
        vec![Some("1".to_string()), Some("a".to_string())],
        vec![Some("2".to_string()), None],
    ];

    let outcome = CommitPipeline::new(fx.storage.clone())
        .commit(&table, &columns, || Ok::<_, std::io::Error>(rows.clone()))
        .await
        .unwrap();

    let sql = fx.rewrite("SELECT * FROM t").await;
    let location = scan_location(&sql);
    assert_eq!(location, outcome.metadata.location);

    let snapshot = SnapshotReader::new(fx.storage.clone())
        .read_table(&table)
        .await
        .unwrap();
    assert_eq!(snapshot.metadata_location, location);
    assert_eq!(snapshot.rows, rows);
    assert_eq!(outcome.data_file.record_count, 2);
    assert_eq!(snapshot.manifest_record_count(), 2);
}
