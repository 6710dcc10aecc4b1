//! pgberg CLI - command-line interface for lakehouse tables.
//!
//! The main entry point for the `pgberg` binary.

use anyhow::Result;
use clap::Parser;
use pgberg_core::observability::init_logging;

use pgberg_cli::{Cli, Commands, Context};

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.log_format);

    let ctx = Context {
        config: cli.config()?,
        format: cli.format,
    };

    // Create runtime and execute
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match cli.command {
            Commands::Tables(args) => pgberg_cli::commands::tables::execute(&args, &ctx).await,
            Commands::Rewrite(args) => pgberg_cli::commands::rewrite::execute(args, &ctx).await,
            Commands::Commit(args) => pgberg_cli::commands::commit::execute(args, &ctx).await,
            Commands::DropTable(args) => {
                pgberg_cli::commands::drop_table::execute(&args, &ctx).await
            }
            Commands::Inspect(args) => pgberg_cli::commands::inspect::execute(&args, &ctx).await,
        }
    })
}
