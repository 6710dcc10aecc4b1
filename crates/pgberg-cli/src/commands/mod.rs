//! CLI command implementations.

pub mod commit;
pub mod drop_table;
pub mod inspect;
pub mod rewrite;
pub mod tables;

use anyhow::Result;
use pgberg_core::SchemaTable;

/// Parses `schema.table` or `table`; a bare table lands in `public`.
///
/// # Errors
///
/// Returns an error for empty names or more than two parts.
pub fn parse_table(raw: &str) -> Result<SchemaTable> {
    let parts: Vec<&str> = raw.trim().split('.').collect();
    match parts.as_slice() {
        [table] if !table.is_empty() => Ok(SchemaTable::with_default_schema("", *table)),
        [schema, table] if !schema.is_empty() && !table.is_empty() => {
            Ok(SchemaTable::new(*schema, *table))
        }
        _ => anyhow::bail!("Invalid table name '{raw}': expected 'schema.table' or 'table'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_table() {
        assert_eq!(parse_table("orders").unwrap(), SchemaTable::new("public", "orders"));
        assert_eq!(parse_table("sales.leads").unwrap(), SchemaTable::new("sales", "leads"));
        assert!(parse_table("").is_err());
        assert!(parse_table("a.b.c").is_err());
        assert!(parse_table(".orders").is_err());
    }
}
