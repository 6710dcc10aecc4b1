//! Entity model shared by the catalog rewriter and the commit pipeline.
//!
//! A [`SchemaTable`] locates one lakehouse table; a [`ColumnSchema`] describes
//! its columns in the order they are written.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Schema an unqualified table reference resolves to.
pub const DEFAULT_SCHEMA: &str = "public";

/// A `(schema, table)` pair identifying one lakehouse table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaTable {
    /// Schema (namespace) name.
    pub schema: String,
    /// Table name.
    pub table: String,
}

impl SchemaTable {
    /// Creates a new schema/table pair.
    #[must_use]
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Creates a pair, substituting [`DEFAULT_SCHEMA`] for an empty schema.
    #[must_use]
    pub fn with_default_schema(schema: &str, table: impl Into<String>) -> Self {
        let schema = if schema.is_empty() {
            DEFAULT_SCHEMA
        } else {
            schema
        };
        Self::new(schema, table)
    }
}

impl fmt::Display for SchemaTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// Logical column type, named after the Iceberg primitive it is stored as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// `boolean`.
    Boolean,
    /// 32-bit signed integer (`smallint`, `integer`).
    Int,
    /// 64-bit signed integer (`bigint`).
    Long,
    /// 32-bit float (`real`).
    Float,
    /// 64-bit float (`double precision`).
    Double,
    /// UTF-8 string (`text`, `varchar`, ...).
    String,
    /// Calendar date.
    Date,
    /// Timestamp without time zone, microsecond precision.
    Timestamp,
    /// Timestamp with time zone, stored in UTC, microsecond precision.
    TimestampTz,
}

impl ColumnType {
    /// Parses a Postgres type name (case-insensitive, modifiers ignored).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for types the data codec cannot store.
    pub fn from_pg(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        // Drop a `(...)` modifier but keep what follows it, so
        // `timestamp(3) with time zone` reads as `timestamp with time zone`.
        let base = match normalized.split_once('(') {
            Some((head, rest)) => {
                let tail = rest.split_once(')').map_or("", |(_, tail)| tail);
                format!("{} {}", head.trim(), tail.trim())
            }
            None => normalized,
        };

        match base.trim() {
            "bool" | "boolean" => Ok(Self::Boolean),
            "int2" | "smallint" | "int" | "int4" | "integer" => Ok(Self::Int),
            "int8" | "bigint" => Ok(Self::Long),
            "float4" | "real" => Ok(Self::Float),
            "float8" | "double precision" => Ok(Self::Double),
            "text" | "varchar" | "character varying" | "char" | "character" | "bpchar"
            | "name" | "uuid" | "json" | "jsonb" => Ok(Self::String),
            "date" => Ok(Self::Date),
            "timestamp" | "timestamp without time zone" => Ok(Self::Timestamp),
            "timestamptz" | "timestamp with time zone" => Ok(Self::TimestampTz),
            other => Err(Error::InvalidInput(format!(
                "unsupported column type '{other}'"
            ))),
        }
    }

    /// Returns the Iceberg primitive type name.
    #[must_use]
    pub const fn iceberg_type(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
            Self::Date => "date",
            Self::Timestamp => "timestamp",
            Self::TimestampTz => "timestamptz",
        }
    }

    /// Parses an Iceberg primitive type name produced by [`Self::iceberg_type`].
    #[must_use]
    pub fn from_iceberg(name: &str) -> Option<Self> {
        match name {
            "boolean" => Some(Self::Boolean),
            "int" => Some(Self::Int),
            "long" => Some(Self::Long),
            "float" => Some(Self::Float),
            "double" => Some(Self::Double),
            "string" => Some(Self::String),
            "date" => Some(Self::Date),
            "timestamp" => Some(Self::Timestamp),
            "timestamptz" => Some(Self::TimestampTz),
            _ => None,
        }
    }
}

/// One named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Logical type.
    pub column_type: ColumnType,
}

/// Ordered column list of a table, supplied by the writer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    columns: Vec<ColumnDef>,
}

impl ColumnSchema {
    /// Creates a schema from already-typed columns.
    #[must_use]
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        Self { columns }
    }

    /// Builds a schema from `(name, postgres type)` pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if a type is unsupported, a name is empty, or a name
    /// is repeated.
    pub fn from_pg<N, T>(pairs: impl IntoIterator<Item = (N, T)>) -> Result<Self>
    where
        N: Into<String>,
        T: AsRef<str>,
    {
        let mut columns: Vec<ColumnDef> = Vec::new();
        for (name, pg_type) in pairs {
            let name = name.into();
            if name.is_empty() {
                return Err(Error::InvalidInput("column name must not be empty".into()));
            }
            if columns.iter().any(|c| c.name == name) {
                return Err(Error::InvalidInput(format!("duplicate column '{name}'")));
            }
            columns.push(ColumnDef {
                name,
                column_type: ColumnType::from_pg(pg_type.as_ref())?,
            });
        }
        Ok(Self { columns })
    }

    /// Returns the columns in order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true when the schema has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_applies_only_when_empty() {
        assert_eq!(
            SchemaTable::with_default_schema("", "orders"),
            SchemaTable::new("public", "orders")
        );
        assert_eq!(
            SchemaTable::with_default_schema("sales", "orders"),
            SchemaTable::new("sales", "orders")
        );
    }

    #[test]
    fn test_pg_type_names() {
        assert_eq!(ColumnType::from_pg("int").unwrap(), ColumnType::Int);
        assert_eq!(ColumnType::from_pg("BIGINT").unwrap(), ColumnType::Long);
        assert_eq!(
            ColumnType::from_pg("character varying(255)").unwrap(),
            ColumnType::String
        );
        assert_eq!(
            ColumnType::from_pg("timestamp with time zone").unwrap(),
            ColumnType::TimestampTz
        );
        assert!(ColumnType::from_pg("numeric(10,2)").is_err());
        assert!(ColumnType::from_pg("double").is_err());
    }

    #[test]
    fn test_pg_type_modifiers_keep_suffix() {
        assert_eq!(
            ColumnType::from_pg("timestamp(3) with time zone").unwrap(),
            ColumnType::TimestampTz
        );
        assert_eq!(
            ColumnType::from_pg("TIMESTAMP (6) WITHOUT TIME ZONE").unwrap(),
            ColumnType::Timestamp
        );
        assert_eq!(
            ColumnType::from_pg("timestamp(0)").unwrap(),
            ColumnType::Timestamp
        );
        assert_eq!(ColumnType::from_pg("varchar(32)").unwrap(), ColumnType::String);
        assert!(ColumnType::from_pg("time(3) with time zone").is_err());
    }

    #[test]
    fn test_iceberg_type_names_roundtrip() {
        for ty in [ColumnType::Date, ColumnType::TimestampTz, ColumnType::Float] {
            assert_eq!(ColumnType::from_iceberg(ty.iceberg_type()), Some(ty));
        }
        assert_eq!(ColumnType::from_iceberg("decimal(10,2)"), None);
    }

    #[test]
    fn test_schema_rejects_duplicates() {
        let err = ColumnSchema::from_pg([("id", "int"), ("id", "text")]).unwrap_err();
        assert!(err.to_string().contains("duplicate column"));
    }

    #[test]
    fn test_schema_preserves_order() {
        let schema = ColumnSchema::from_pg([("id", "int"), ("name", "text")]).unwrap();
        let names: Vec<_> = schema.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name"]);
        assert_eq!(schema.columns()[1].column_type, ColumnType::String);
    }
}
