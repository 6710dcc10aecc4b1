//! Pre-built fixtures for catalog and commit tests.

use pgberg_core::{ColumnSchema, SchemaTable, ServerIdentity, Secret, TablePaths};

use crate::storage::TracingMemoryBackend;

/// Identity used by catalog emulation tests.
#[must_use]
pub fn test_identity() -> ServerIdentity {
    ServerIdentity {
        user: "alice".to_string(),
        encrypted_password: Secret::new("abc123"),
        database: "lake".to_string(),
    }
}

/// Makes a table visible to catalog listings by seeding a placeholder
/// version hint under its metadata directory.
pub fn seed_table(storage: &TracingMemoryBackend, schema: &str, table: &str) -> SchemaTable {
    let table = SchemaTable::new(schema, table);
    storage.seed(TablePaths::version_hint(&table), "1");
    table
}

/// Column schema covering every supported column type.
#[must_use]
pub fn orders_schema() -> ColumnSchema {
    ColumnSchema::from_pg([
        ("id", "bigint"),
        ("customer", "text"),
        ("quantity", "integer"),
        ("price", "double precision"),
        ("discount", "real"),
        ("paid", "boolean"),
        ("order_date", "date"),
        ("created_at", "timestamp"),
        ("shipped_at", "timestamptz"),
    ])
    .expect("fixture schema is valid")
}

/// Rows matching [`orders_schema`], including nulls.
#[must_use]
pub fn orders_rows() -> Vec<Vec<Option<String>>> {
    let row = |values: [Option<&str>; 9]| {
        values
            .iter()
            .map(|v| v.map(str::to_string))
            .collect::<Vec<_>>()
    };
    vec![
        row([
            Some("1"),
            Some("alice"),
            Some("3"),
            Some("9.5"),
            Some("0.1"),
            Some("true"),
            Some("2024-01-15"),
            Some("2024-01-15 10:00:00"),
            Some("2024-01-16 08:30:00+00"),
        ]),
        row([
            Some("2"),
            Some("bob"),
            Some("1"),
            Some("120.25"),
            None,
            Some("false"),
            Some("2024-02-01"),
            Some("2024-02-01 12:30:00.5"),
            None,
        ]),
        row([
            Some("3"),
            None,
            Some("7"),
            Some("4"),
            Some("0"),
            Some("t"),
            Some("2023-12-31"),
            Some("2023-12-31 23:59:59"),
            Some("2024-01-02 00:00:00-05"),
        ]),
    ]
}
