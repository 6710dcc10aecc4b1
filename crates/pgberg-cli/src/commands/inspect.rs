//! Inspect command - walk a table's snapshot chain.

use anyhow::{Context as _, Result};
use clap::Args;
use owo_colors::OwoColorize;

use pgberg_iceberg::{SnapshotReader, TableSnapshot};

use super::parse_table;
use crate::{Context, OutputFormat};

/// Arguments for the inspect command.
#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Table to inspect (`schema.table` or `table`).
    pub table: String,

    /// Also print the data rows.
    #[arg(long)]
    pub rows: bool,
}

/// Execute the inspect command.
///
/// # Errors
///
/// Returns an error if any artifact in the chain is missing or invalid.
pub async fn execute(args: &InspectArgs, ctx: &Context) -> Result<()> {
    let table = parse_table(&args.table)?;
    let snapshot = SnapshotReader::new(ctx.storage()?)
        .read_table(&table)
        .await
        .with_context(|| format!("Failed to read table {table}"))?;

    match ctx.format {
        OutputFormat::Json => {
            let mut report = serde_json::json!({
                "table": table.to_string(),
                "version": snapshot.version,
                "metadataLocation": snapshot.metadata_location,
                "snapshotId": snapshot.manifest_list.snapshot_id,
                "manifests": snapshot.manifest_list.entries.iter().map(|m| &m.manifest_path).collect::<Vec<_>>(),
                "dataFiles": data_files(&snapshot),
                "recordCount": snapshot.manifest_record_count(),
                "columns": snapshot.columns,
            });
            if args.rows {
                report["rows"] = serde_json::json!(snapshot.rows);
            }
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialize snapshot")?
            );
        }
        OutputFormat::Text => {
            println!("Table: {}", table.bold());
            println!("  Version:       {}", snapshot.version);
            println!("  Metadata:      {}", snapshot.metadata_location);
            println!("  Snapshot ID:   {}", snapshot.manifest_list.snapshot_id);
            println!("  Records:       {}", snapshot.manifest_record_count());
            println!();
            println!("Manifests:");
            for manifest in &snapshot.manifest_list.entries {
                println!(
                    "  {} ({} files, {} rows)",
                    manifest.manifest_path, manifest.added_files_count, manifest.added_rows_count
                );
            }
            println!("Data files:");
            for path in data_files(&snapshot) {
                println!("  {path}");
            }
            if args.rows {
                println!();
                print_rows(&snapshot);
            }
        }
        OutputFormat::Table => print_rows(&snapshot),
    }

    Ok(())
}

fn data_files(snapshot: &TableSnapshot) -> Vec<&str> {
    snapshot
        .manifests
        .iter()
        .flat_map(|m| &m.entries)
        .map(|e| e.data_file.file_path.as_str())
        .collect()
}

fn print_rows(snapshot: &TableSnapshot) {
    let mut builder = tabled::builder::Builder::default();
    builder.push_record(snapshot.columns.columns().iter().map(|c| c.name.clone()));
    for row in &snapshot.rows {
        builder.push_record(
            row.iter()
                .map(|v| v.clone().unwrap_or_else(|| "NULL".dimmed().to_string())),
        );
    }
    println!("{}", builder.build());
}
