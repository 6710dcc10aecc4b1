//! # pgberg-catalog
//!
//! Postgres catalog emulation for an Iceberg lakehouse.
//!
//! A client introspecting the server sees a populated Postgres catalog:
//! selected `pg_catalog` views are answered with synthesized rows,
//! `information_schema.tables` lists the lakehouse tables, and plain table
//! references become scans of the table's Iceberg metadata file.
//!
//! - **Catalog Cache**: the `(schema, table)` enumeration, reloaded wholesale
//! - **Classification**: the ordered rules a table reference is matched against
//! - **Rewriter**: per-reference replacement of tables, table functions and
//!   nested function calls
//! - **Statement Rewriter**: applies the rewriter to every reference of a
//!   parsed statement
//!
//! ## Example
//!
//! ```rust
//! use pgberg_catalog::identity::{CatalogRule, TableIdentity};
//! use sqlparser::ast::{Ident, ObjectName, ObjectNamePart};
//!
//! let name = ObjectName(vec![
//!     ObjectNamePart::Identifier(Ident::new("pg_catalog")),
//!     ObjectNamePart::Identifier(Ident::new("pg_shadow")),
//! ]);
//! let identity = TableIdentity::from_name(&name, None).unwrap();
//! assert_eq!(CatalogRule::classify(&identity), CatalogRule::PgShadow);
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod cache;
pub mod error;
pub mod identity;
pub mod keywords;
pub mod metrics;
pub mod rewriter;
pub mod statement;
pub mod views;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::cache::{CatalogCache, CatalogSnapshot};
    pub use crate::error::{CatalogError, Result};
    pub use crate::identity::{CatalogRule, TableIdentity};
    pub use crate::rewriter::QueryCatalogRewriter;
    pub use crate::statement::StatementRewriter;
}

pub use cache::{CatalogCache, CatalogSnapshot};
pub use error::{CatalogError, Result};
pub use identity::{CatalogRule, TableIdentity};
pub use rewriter::QueryCatalogRewriter;
pub use statement::StatementRewriter;
