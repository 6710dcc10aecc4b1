//! Rewrite command - show a query as the query engine would receive it.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Args;

use pgberg_catalog::{CatalogCache, QueryCatalogRewriter, StatementRewriter};

use crate::{Context, OutputFormat};

/// Arguments for the rewrite command.
#[derive(Debug, Args)]
pub struct RewriteArgs {
    /// SQL to rewrite.
    #[arg(conflicts_with = "file", required_unless_present = "file")]
    pub sql: Option<String>,

    /// Read the SQL from a file instead.
    #[arg(long, short = 'f')]
    pub file: Option<PathBuf>,
}

/// Execute the rewrite command.
///
/// # Errors
///
/// Returns an error if the SQL cannot be read or parsed, or storage fails.
pub async fn execute(args: RewriteArgs, ctx: &Context) -> Result<()> {
    let sql = match (args.sql, &args.file) {
        (Some(sql), _) => sql,
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read SQL file: {}", path.display()))?,
        (None, None) => anyhow::bail!("Provide SQL as an argument or use --file"),
    };

    let cache = CatalogCache::new(ctx.storage()?)
        .await
        .context("Failed to load catalog")?;
    let rewriter = StatementRewriter::new(QueryCatalogRewriter::new(
        Arc::new(cache),
        ctx.config.identity.clone(),
    ));
    let rewritten = rewriter
        .rewrite_sql(&sql)
        .await
        .context("Failed to rewrite query")?;

    match ctx.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "original": sql.trim(),
                    "rewritten": rewritten,
                }))
                .context("Failed to serialize response")?
            );
        }
        OutputFormat::Text | OutputFormat::Table => println!("{rewritten}"),
    }

    Ok(())
}
