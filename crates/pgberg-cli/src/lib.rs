//! # pgberg-cli
//!
//! Command-line interface for pgberg lakehouse tables.
//!
//! ## Commands
//!
//! - `pgberg tables` - List the tables the catalog sees
//! - `pgberg rewrite` - Show how a query is rewritten against the catalog
//! - `pgberg commit` - Write a table snapshot from a JSON-lines file
//! - `pgberg drop-table` - Delete every artifact of a table
//! - `pgberg inspect` - Walk a table's snapshot chain
//!
//! ## Configuration
//!
//! Flags fall back to the same `PGBERG_*` variables the server reads:
//!
//! - `PGBERG_STORAGE` - `local`, `s3` or `memory` (default: `local`)
//! - `PGBERG_ICEBERG_PATH` - Root prefix for tables (default: `iceberg`)
//! - `PGBERG_LOCAL_DIR` - Base directory for local storage (default: `.`)
//! - `PGBERG_USER`, `PGBERG_DATABASE`, `PGBERG_ENCRYPTED_PASSWORD` - Catalog identity
//!
//! S3 connection settings are only read from the environment.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
// CLI uses print! macros intentionally
#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

pub mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use pgberg_core::config::DEFAULT_ICEBERG_PATH;
use pgberg_core::{
    Config, LogFormat, ObjectStoreBackend, Secret, ServerIdentity, StorageBackend, StorageConfig,
};

/// pgberg CLI - Postgres-facing Iceberg lakehouse tooling.
#[derive(Debug, Parser)]
#[command(name = "pgberg")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Storage backend.
    #[arg(long, env = "PGBERG_STORAGE", default_value = "local")]
    pub storage: StorageKind,

    /// Root prefix for tables inside the storage backend.
    #[arg(long, env = "PGBERG_ICEBERG_PATH", default_value = DEFAULT_ICEBERG_PATH)]
    pub iceberg_path: String,

    /// Base directory for local storage.
    #[arg(long, env = "PGBERG_LOCAL_DIR", default_value = ".")]
    pub local_dir: PathBuf,

    /// User shown in synthesized catalog rows.
    #[arg(long, env = "PGBERG_USER", default_value = "pgberg")]
    pub user: String,

    /// Database shown as `table_catalog`.
    #[arg(long, env = "PGBERG_DATABASE", default_value = "pgberg")]
    pub database: String,

    /// Encrypted password shown in `pg_shadow`.
    #[arg(long, env = "PGBERG_ENCRYPTED_PASSWORD", default_value = "", hide_env_values = true)]
    pub encrypted_password: String,

    /// Log format.
    #[arg(long, env = "PGBERG_LOG_FORMAT", default_value = "pretty")]
    pub log_format: LogFormat,

    /// Output format.
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Builds the effective configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if S3 storage is selected and its environment
    /// settings are missing or invalid.
    pub fn config(&self) -> Result<Config> {
        let storage = match self.storage {
            StorageKind::Local => StorageConfig::Local {
                dir: self.local_dir.clone(),
                iceberg_path: self.iceberg_path.clone(),
            },
            StorageKind::Memory => StorageConfig::Memory {
                iceberg_path: self.iceberg_path.clone(),
            },
            StorageKind::S3 => {
                let from_env = Config::from_lookup(|name| match name {
                    "PGBERG_STORAGE" => Some("s3".to_string()),
                    "PGBERG_ICEBERG_PATH" => Some(self.iceberg_path.clone()),
                    _ => std::env::var(name).ok(),
                })
                .context("Failed to load S3 settings")?;
                from_env.storage
            }
        };

        Ok(Config {
            identity: ServerIdentity {
                user: self.user.clone(),
                encrypted_password: Secret::new(self.encrypted_password.clone()),
                database: self.database.clone(),
            },
            storage,
            log_format: self.log_format,
        })
    }
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List lakehouse tables.
    Tables(commands::tables::TablesArgs),
    /// Rewrite a query against the emulated catalog.
    Rewrite(commands::rewrite::RewriteArgs),
    /// Commit a table snapshot from JSON-lines rows.
    Commit(commands::commit::CommitArgs),
    /// Delete every artifact of a table.
    DropTable(commands::drop_table::DropTableArgs),
    /// Walk a table's snapshot chain.
    Inspect(commands::inspect::InspectArgs),
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum StorageKind {
    /// Local filesystem.
    #[default]
    Local,
    /// Amazon S3 or a compatible store.
    S3,
    /// In-process memory; nothing outlives the command.
    Memory,
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// Table output.
    Table,
}

/// Resolved settings shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    /// Effective configuration.
    pub config: Config,
    /// Output format.
    pub format: OutputFormat,
}

impl Context {
    /// Opens the configured storage backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be constructed.
    pub fn storage(&self) -> Result<Arc<dyn StorageBackend>> {
        let backend = ObjectStoreBackend::from_config(&self.config.storage)
            .context("Failed to open storage backend")?;
        Ok(Arc::new(backend))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_config_from_flags() {
        let cli = Cli::parse_from([
            "pgberg",
            "--storage",
            "memory",
            "--iceberg-path",
            "lake",
            "--user",
            "alice",
            "--database",
            "analytics",
            "--encrypted-password",
            "abc123",
            "--format",
            "json",
            "tables",
        ]);

        let config = cli.config().unwrap();
        assert_eq!(
            config.storage,
            StorageConfig::Memory {
                iceberg_path: "lake".to_string()
            }
        );
        assert_eq!(config.identity.user, "alice");
        assert_eq!(config.identity.database, "analytics");
        assert_eq!(config.identity.encrypted_password.expose(), "abc123");
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn test_log_format_flag_initializes_logging() {
        let cli = Cli::parse_from(["pgberg", "--log-format", "json", "tables"]);
        assert_eq!(cli.log_format, LogFormat::Json);
        pgberg_core::init_logging(cli.log_format);
        tracing::info!("logging initialized from the command line");
    }

    #[test]
    fn test_local_storage_uses_dir_flag() {
        let cli = Cli::parse_from(["pgberg", "--storage", "local", "--local-dir", "/data", "tables"]);
        assert!(matches!(
            cli.config().unwrap().storage,
            StorageConfig::Local { ref dir, .. } if dir == &PathBuf::from("/data")
        ));
    }
}
