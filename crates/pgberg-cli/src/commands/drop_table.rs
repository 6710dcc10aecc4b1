//! Drop-table command - delete every artifact of a table.

use anyhow::{Context as _, Result};
use clap::Args;
use owo_colors::OwoColorize;

use pgberg_iceberg::CommitPipeline;

use super::parse_table;
use crate::{Context, OutputFormat};

/// Arguments for the drop-table command.
#[derive(Debug, Args)]
pub struct DropTableArgs {
    /// Table to drop (`schema.table` or `table`).
    pub table: String,
}

/// Execute the drop-table command.
///
/// # Errors
///
/// Returns an error if listing or deleting the table's keys fails.
pub async fn execute(args: &DropTableArgs, ctx: &Context) -> Result<()> {
    let table = parse_table(&args.table)?;
    let deleted = CommitPipeline::new(ctx.storage()?)
        .drop_table(&table)
        .await
        .with_context(|| format!("Failed to drop table {table}"))?;

    match ctx.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "table": table.to_string(),
                    "deletedKeys": deleted,
                }))
                .context("Failed to serialize response")?
            );
        }
        OutputFormat::Text | OutputFormat::Table => {
            if deleted == 0 {
                println!("{} {table} has no stored artifacts", "Nothing to drop:".yellow());
            } else {
                println!("Dropped {table} ({deleted} objects deleted)");
            }
        }
    }

    Ok(())
}
