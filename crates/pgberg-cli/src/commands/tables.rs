//! Tables command - list the lakehouse tables the catalog sees.

use anyhow::{Context as _, Result};
use clap::Args;
use owo_colors::OwoColorize;

use pgberg_catalog::CatalogCache;

use crate::{Context, OutputFormat};

/// Arguments for the tables command.
#[derive(Debug, Args)]
pub struct TablesArgs {
    /// Only list tables in this schema.
    #[arg(long, short = 's')]
    pub schema: Option<String>,
}

/// Execute the tables command.
///
/// # Errors
///
/// Returns an error if storage cannot be opened or listed.
pub async fn execute(args: &TablesArgs, ctx: &Context) -> Result<()> {
    let cache = CatalogCache::new(ctx.storage()?)
        .await
        .context("Failed to list tables")?;
    let tables: Vec<_> = cache
        .snapshot()
        .iter()
        .filter(|t| args.schema.as_ref().is_none_or(|s| &t.schema == s))
        .cloned()
        .collect();

    match ctx.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&tables).context("Failed to serialize tables")?
            );
        }
        OutputFormat::Text => {
            if tables.is_empty() {
                println!("No tables found");
                return Ok(());
            }
            for table in &tables {
                println!("  {}.{}", table.schema.dimmed(), table.table.bold());
            }
        }
        OutputFormat::Table => {
            use tabled::{Table, Tabled};

            #[derive(Tabled)]
            struct TableRow {
                #[tabled(rename = "Schema")]
                schema: String,
                #[tabled(rename = "Table")]
                table: String,
            }

            let rows: Vec<_> = tables
                .into_iter()
                .map(|t| TableRow {
                    schema: t.schema,
                    table: t.table,
                })
                .collect();

            if rows.is_empty() {
                println!("No tables found");
            } else {
                println!("{}", Table::new(rows));
            }
        }
    }

    Ok(())
}
