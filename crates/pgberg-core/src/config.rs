//! Process configuration.
//!
//! Configuration is read from `PGBERG_*` environment variables. Values that
//! are present but malformed are reported as errors instead of being
//! silently replaced by defaults.

use std::fmt;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::observability::LogFormat;

/// Default root prefix for tables inside the storage backend.
pub const DEFAULT_ICEBERG_PATH: &str = "iceberg";

/// A secret value that never appears in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wraps a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the secret value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Identity the emulated server presents through its system catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerIdentity {
    /// Login user name.
    pub user: String,
    /// Encrypted password as stored in `pg_shadow.passwd`.
    pub encrypted_password: Secret,
    /// Database name reported as `table_catalog`.
    pub database: String,
}

impl Default for ServerIdentity {
    fn default() -> Self {
        Self {
            user: "pgberg".to_string(),
            encrypted_password: Secret::default(),
            database: "pgberg".to_string(),
        }
    }
}

/// S3 connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Config {
    /// AWS region.
    pub region: String,
    /// Bucket holding the lakehouse.
    pub bucket: String,
    /// Access key id.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: Secret,
    /// Custom endpoint (S3-compatible stores).
    pub endpoint: Option<String>,
}

/// Storage backend selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    /// Amazon S3 (or compatible) bucket.
    S3 {
        /// Connection settings.
        s3: S3Config,
        /// Root prefix inside the bucket.
        iceberg_path: String,
    },
    /// Local filesystem directory.
    Local {
        /// Base directory.
        dir: PathBuf,
        /// Root prefix inside the directory.
        iceberg_path: String,
    },
    /// In-process memory (tests and demos).
    Memory {
        /// Root prefix.
        iceberg_path: String,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Local {
            dir: PathBuf::from("."),
            iceberg_path: DEFAULT_ICEBERG_PATH.to_string(),
        }
    }
}

/// Top-level process configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Server identity for synthesized catalog rows.
    pub identity: ServerIdentity,
    /// Storage backend.
    pub storage: StorageConfig,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `PGBERG_USER`, `PGBERG_ENCRYPTED_PASSWORD`, `PGBERG_DATABASE`
    /// - `PGBERG_STORAGE` (`s3` | `local` | `memory`, default: `local`)
    /// - `PGBERG_ICEBERG_PATH` (default: `iceberg`)
    /// - `PGBERG_LOCAL_DIR` (default: `.`)
    /// - `PGBERG_AWS_REGION`, `PGBERG_AWS_S3_BUCKET`, `PGBERG_AWS_ACCESS_KEY_ID`,
    ///   `PGBERG_AWS_SECRET_ACCESS_KEY`, `PGBERG_AWS_ENDPOINT`
    /// - `PGBERG_LOG_FORMAT` (`json` | `pretty`)
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but invalid, or if the S3
    /// backend is selected without its required settings.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`Config::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| non_empty(lookup(name));
        let mut config = Self::default();

        if let Some(user) = get("PGBERG_USER") {
            config.identity.user = user;
        }
        if let Some(password) = get("PGBERG_ENCRYPTED_PASSWORD") {
            config.identity.encrypted_password = Secret::new(password);
        }
        if let Some(database) = get("PGBERG_DATABASE") {
            config.identity.database = database;
        }

        let iceberg_path =
            get("PGBERG_ICEBERG_PATH").unwrap_or_else(|| DEFAULT_ICEBERG_PATH.to_string());
        let storage = get("PGBERG_STORAGE").unwrap_or_else(|| "local".to_string());
        config.storage = match storage.to_ascii_lowercase().as_str() {
            "local" => StorageConfig::Local {
                dir: get("PGBERG_LOCAL_DIR").map_or_else(|| PathBuf::from("."), PathBuf::from),
                iceberg_path,
            },
            "memory" => StorageConfig::Memory { iceberg_path },
            "s3" => {
                let require = |name: &str| {
                    get(name).ok_or_else(|| {
                        Error::configuration(format!("{name} is required when PGBERG_STORAGE=s3"))
                    })
                };
                StorageConfig::S3 {
                    s3: S3Config {
                        region: require("PGBERG_AWS_REGION")?,
                        bucket: require("PGBERG_AWS_S3_BUCKET")?,
                        access_key_id: require("PGBERG_AWS_ACCESS_KEY_ID")?,
                        secret_access_key: Secret::new(require("PGBERG_AWS_SECRET_ACCESS_KEY")?),
                        endpoint: get("PGBERG_AWS_ENDPOINT"),
                    },
                    iceberg_path,
                }
            }
            other => {
                return Err(Error::configuration(format!(
                    "PGBERG_STORAGE must be one of s3, local, memory (got '{other}')"
                )));
            }
        };

        if let Some(format) = get("PGBERG_LOG_FORMAT") {
            config.log_format = format.parse()?;
        }

        Ok(config)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
