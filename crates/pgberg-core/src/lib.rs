//! # pgberg-core
//!
//! Shared building blocks for pgberg, a Postgres-compatible front end over an
//! Iceberg lakehouse.
//!
//! - **Entity Model**: schema/table identities and writer-supplied column schemas
//! - **Table Paths**: the one place artifact keys are derived from
//! - **Storage**: the async backend contract plus S3, local and memory backends
//! - **Configuration**: `PGBERG_*` environment settings
//! - **Error Types**: shared error definitions and result types
//!
//! ## Example
//!
//! ```rust
//! use pgberg_core::prelude::*;
//!
//! let table = SchemaTable::with_default_schema("", "orders");
//! assert_eq!(TablePaths::table_prefix(&table), "public/orders/");
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod entity;
pub mod error;
pub mod object_store_backend;
pub mod observability;
pub mod storage;
pub mod table_paths;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{Config, S3Config, Secret, ServerIdentity, StorageConfig};
    pub use crate::entity::{ColumnDef, ColumnSchema, ColumnType, DEFAULT_SCHEMA, SchemaTable};
    pub use crate::error::{Error, Result};
    pub use crate::object_store_backend::ObjectStoreBackend;
    pub use crate::storage::{MemoryBackend, StorageBackend};
    pub use crate::table_paths::TablePaths;
}

pub use config::{Config, S3Config, Secret, ServerIdentity, StorageConfig};
pub use entity::{ColumnDef, ColumnSchema, ColumnType, DEFAULT_SCHEMA, SchemaTable};
pub use error::{Error, Result};
pub use object_store_backend::ObjectStoreBackend;
pub use observability::{LogFormat, init_logging};
pub use storage::{MemoryBackend, StorageBackend};
pub use table_paths::TablePaths;
