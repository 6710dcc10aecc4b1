//! # pgberg-iceberg
//!
//! Writes and reads Iceberg table snapshots for pgberg.
//!
//! - **Commit pipeline**: data file, manifest, manifest list, metadata and
//!   version pointer, written in that order and each uploaded whole
//! - **Format codec**: Parquet data files, Avro manifests, JSON metadata
//! - **Snapshot reader**: walks a table from its version pointer back to its
//!   data rows
//!
//! ## Layout
//!
//! Artifact keys come from [`pgberg_core::TablePaths`], the same source the
//! query rewriter uses to locate a table's metadata file.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pgberg_core::{ColumnSchema, MemoryBackend, SchemaTable};
//! use pgberg_iceberg::CommitPipeline;
//!
//! let pipeline = CommitPipeline::new(Arc::new(MemoryBackend::new()));
//! let columns = ColumnSchema::from_pg([("id", "int"), ("name", "text")])?;
//! let outcome = pipeline
//!     .commit(&SchemaTable::new("public", "t"), &columns, || {
//!         Ok::<_, std::io::Error>(vec![vec![Some("1".into()), Some("a".into())]])
//!     })
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod codec;
pub mod commit;
pub mod error;
pub mod metrics;
pub mod reader;
pub mod scratch;
pub mod types;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::codec::{Artifact, FormatCodec, IcebergCodec, Row};
    pub use crate::commit::CommitPipeline;
    pub use crate::error::{IcebergError, IcebergResult};
    pub use crate::reader::{SnapshotReader, TableSnapshot};
    pub use crate::types::*;
}

pub use codec::{Artifact, FormatCodec, IcebergCodec, Row};
pub use commit::{CommitPipeline, METADATA_VERSION};
pub use error::{BoxError, IcebergError, IcebergResult};
pub use reader::{SnapshotReader, TableSnapshot};
pub use scratch::ScratchFile;
