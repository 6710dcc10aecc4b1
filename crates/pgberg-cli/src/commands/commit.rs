//! Commit command - write a table snapshot from JSON-lines rows.
//!
//! Each input line is either a JSON array of values in column order or a
//! JSON object keyed by column name (missing keys are NULL). Values are
//! passed on as Postgres text: strings verbatim, numbers and booleans in
//! their JSON spelling, nested arrays and objects as compact JSON.

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Args;
use owo_colors::OwoColorize;
use serde_json::Value;

use pgberg_core::{ColumnSchema, SchemaTable, StorageBackend as _, TablePaths};
use pgberg_iceberg::{CommitPipeline, Row};

use super::parse_table;
use crate::{Context, OutputFormat};

/// Arguments for the commit command.
#[derive(Debug, Args)]
pub struct CommitArgs {
    /// Target table (`schema.table` or `table`).
    pub table: String,

    /// Column as `name:type`, in order. Repeat for each column.
    #[arg(long = "column", short = 'c', required = true)]
    pub columns: Vec<String>,

    /// JSON-lines file with the rows; `-` reads standard input.
    #[arg(long, short = 'r')]
    pub rows: PathBuf,

    /// Replace an existing table; its old files are deleted once the new
    /// snapshot is committed.
    #[arg(long)]
    pub replace: bool,
}

/// Execute the commit command.
///
/// # Errors
///
/// Returns an error if the columns or rows are invalid, the table already
/// exists without `--replace`, or the commit fails.
pub async fn execute(args: CommitArgs, ctx: &Context) -> Result<()> {
    let table = parse_table(&args.table)?;
    let columns = parse_columns(&args.columns)?;
    let storage = ctx.storage()?;
    let pipeline = CommitPipeline::new(storage.clone());

    let existing = storage
        .list_all_keys(&TablePaths::table_prefix(&table))
        .await
        .context("Failed to check for an existing table")?;
    if !existing.is_empty() && !args.replace {
        anyhow::bail!("Table {table} already exists; use --replace to overwrite it");
    }

    // The old snapshot stays readable until the new one is fully linked.
    let path = args.rows;
    let outcome = pipeline
        .commit(&table, &columns, || read_rows(&path, &columns))
        .await
        .with_context(|| format!("Failed to commit table {table}"))?;

    let superseded = superseded_keys(&table, existing);
    if !superseded.is_empty() {
        storage
            .delete_keys(&superseded)
            .await
            .with_context(|| format!("Failed to delete superseded files of {table}"))?;
        tracing::info!(
            table = %table,
            deleted = superseded.len(),
            "Deleted superseded snapshot files"
        );
    }
    let summary = outcome.summary();

    match ctx.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
            );
        }
        OutputFormat::Text | OutputFormat::Table => {
            println!("{}", "Table committed successfully!".green());
            println!();
            println!("  Table:        {}", summary.table);
            println!("  Snapshot ID:  {}", summary.snapshot_id);
            println!("  Rows:         {}", summary.record_count);
            println!("  Data Size:    {} bytes", summary.data_file_size);
            println!("  Metadata:     {}", summary.metadata_location);
        }
    }

    Ok(())
}

/// Keys of the previous snapshot that a new commit does not overwrite.
fn superseded_keys(table: &SchemaTable, existing: Vec<String>) -> Vec<String> {
    let rewritten = [
        TablePaths::current_metadata_file(table),
        TablePaths::version_hint(table),
    ];
    existing
        .into_iter()
        .filter(|key| !rewritten.contains(key))
        .collect()
}

/// Parses `name:type` column specs.
///
/// # Errors
///
/// Returns an error for specs without a type or with an unsupported type.
pub fn parse_columns(specs: &[String]) -> Result<ColumnSchema> {
    let pairs = specs
        .iter()
        .map(|spec| {
            spec.split_once(':')
                .map(|(name, ty)| (name.trim().to_string(), ty.trim().to_string()))
                .with_context(|| format!("Invalid column '{spec}': expected 'name:type'"))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(ColumnSchema::from_pg(pairs)?)
}

fn read_rows(path: &Path, columns: &ColumnSchema) -> Result<Vec<Row>> {
    let reader: Box<dyn BufRead> = if path.as_os_str() == "-" {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open rows file: {}", path.display()))?;
        Box::new(BufReader::new(file))
    };

    let mut rows = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read rows")?;
        if line.trim().is_empty() {
            continue;
        }
        let row = parse_row(&line, columns)
            .with_context(|| format!("Invalid row on line {}", index + 1))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Converts one JSON-lines record into a text row.
///
/// # Errors
///
/// Returns an error if the line is not a JSON array or object, or an array
/// has the wrong number of values.
pub fn parse_row(line: &str, columns: &ColumnSchema) -> Result<Row> {
    match serde_json::from_str::<Value>(line).context("Failed to parse JSON")? {
        Value::Array(values) => {
            if values.len() != columns.len() {
                anyhow::bail!(
                    "expected {} values, found {}",
                    columns.len(),
                    values.len()
                );
            }
            Ok(values.into_iter().map(to_text).collect())
        }
        Value::Object(mut object) => Ok(columns
            .columns()
            .iter()
            .map(|c| object.remove(&c.name).and_then(to_text))
            .collect()),
        _ => anyhow::bail!("expected a JSON array or object"),
    }
}

fn to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> ColumnSchema {
        parse_columns(&["id:int".to_string(), "name:text".to_string()]).unwrap()
    }

    #[test]
    fn test_parse_columns() {
        let schema = columns();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.columns()[1].name, "name");
        assert!(parse_columns(&["id".to_string()]).is_err());
        assert!(parse_columns(&["id:money".to_string()]).is_err());
    }

    #[test]
    fn test_parse_array_row() {
        let row = parse_row(r#"[1, "a"]"#, &columns()).unwrap();
        assert_eq!(row, vec![Some("1".to_string()), Some("a".to_string())]);
        assert!(parse_row("[1]", &columns()).is_err());
    }

    #[test]
    fn test_parse_object_row_fills_nulls() {
        let row = parse_row(r#"{"name": "b", "extra": true}"#, &columns()).unwrap();
        assert_eq!(row, vec![None, Some("b".to_string())]);
    }

    #[test]
    fn test_superseded_keys_keep_fixed_names() {
        let table = SchemaTable::new("public", "orders");
        let existing = vec![
            "public/orders/data/00000-0-old.parquet".to_string(),
            "public/orders/metadata/old-m0.avro".to_string(),
            TablePaths::current_metadata_file(&table),
            TablePaths::version_hint(&table),
        ];
        assert_eq!(
            superseded_keys(&table, existing),
            vec![
                "public/orders/data/00000-0-old.parquet".to_string(),
                "public/orders/metadata/old-m0.avro".to_string(),
            ]
        );
    }

    #[test]
    fn test_rejects_scalars() {
        assert!(parse_row("42", &columns()).is_err());
        assert!(parse_row("{", &columns()).is_err());
    }

    #[test]
    fn test_read_rows_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.jsonl");
        std::fs::write(&path, "[1, \"a\"]\n\n{\"id\": 2, \"name\": null}\n").unwrap();

        let rows = read_rows(&path, &columns()).unwrap();
        assert_eq!(
            rows,
            vec![
                vec![Some("1".to_string()), Some("a".to_string())],
                vec![Some("2".to_string()), None],
            ]
        );
    }
}
