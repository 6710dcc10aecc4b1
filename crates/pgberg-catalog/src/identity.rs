//! Classification of table references against the emulated Postgres catalog.
//!
//! [`CatalogRule::RESOLUTION_ORDER`] is the fixed priority list a reference
//! is checked against; the first rule whose predicate holds decides how the
//! reference is rewritten.

use sqlparser::ast::{Ident, ObjectName, ObjectNamePart, TableAlias, TableFactor};

/// The Postgres system schema.
pub const PG_CATALOG: &str = "pg_catalog";

/// The SQL-standard information schema.
pub const INFORMATION_SCHEMA: &str = "information_schema";

/// A table reference reduced to its normalized `(schema, table)` identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableIdentity {
    /// Schema qualifier; empty when the reference is unqualified.
    pub schema: String,
    /// Table name.
    pub table: String,
    /// Alias the replacement is exposed under: the reference's alias, or the
    /// table name as written.
    pub alias: Ident,
    /// The reference's own alias clause, if any.
    pub explicit_alias: Option<TableAlias>,
}

impl TableIdentity {
    /// Builds an identity from an object name and optional alias.
    ///
    /// Unquoted identifiers are folded to lower case. Names with more than two
    /// parts keep the last two (`db.schema.table`). Returns `None` for names
    /// that are not plain identifiers.
    #[must_use]
    pub fn from_name(name: &ObjectName, alias: Option<&TableAlias>) -> Option<Self> {
        let idents = name
            .0
            .iter()
            .map(|part| match part {
                ObjectNamePart::Identifier(ident) => Some(ident),
                #[allow(unreachable_patterns)]
                _ => None,
            })
            .collect::<Option<Vec<_>>>()?;
        let (table_ident, qualifiers) = idents.split_last()?;
        let schema = qualifiers.last().map(|ident| normalize(ident)).unwrap_or_default();

        Some(Self {
            schema,
            table: normalize(table_ident),
            alias: alias.map_or_else(|| (*table_ident).clone(), |a| a.name.clone()),
            explicit_alias: alias.cloned(),
        })
    }

    /// Builds an identity from a plain table reference.
    ///
    /// Returns `None` for table functions, derived tables and joins.
    #[must_use]
    pub fn from_table_factor(factor: &TableFactor) -> Option<Self> {
        match factor {
            TableFactor::Table {
                name,
                alias,
                args: None,
                ..
            } => Self::from_name(name, alias.as_ref()),
            _ => None,
        }
    }

    fn is(&self, schema: &str, table: &str) -> bool {
        self.schema == schema && self.table == table
    }
}

/// Folds an identifier the way Postgres does.
#[must_use]
pub fn normalize(ident: &Ident) -> String {
    if ident.quote_style.is_some() {
        ident.value.clone()
    } else {
        ident.value.to_lowercase()
    }
}

/// How a table reference is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogRule {
    /// `pg_catalog.pg_statio_user_tables`: no rows.
    PgStatioUserTables,
    /// `pg_catalog.pg_shadow`: the configured user and password.
    PgShadow,
    /// `pg_catalog.pg_roles`: the configured user as a superuser role.
    PgRoles,
    /// `pg_catalog.pg_shdescription`: no rows.
    PgShdescription,
    /// Any other `pg_catalog` relation: left to the engine.
    PgCatalog,
    /// `information_schema.tables`: the lakehouse tables.
    InformationSchemaTables,
    /// Any other `information_schema` relation: left to the engine.
    InformationSchema,
    /// Everything else: a lakehouse table scan, if the table exists.
    Lakehouse,
}

impl CatalogRule {
    /// Rules in the order they are tried.
    pub const RESOLUTION_ORDER: [Self; 8] = [
        Self::PgStatioUserTables,
        Self::PgShadow,
        Self::PgRoles,
        Self::PgShdescription,
        Self::PgCatalog,
        Self::InformationSchemaTables,
        Self::InformationSchema,
        Self::Lakehouse,
    ];

    /// Returns the first rule matching `identity`.
    #[must_use]
    pub fn classify(identity: &TableIdentity) -> Self {
        Self::RESOLUTION_ORDER
            .into_iter()
            .find(|rule| rule.matches(identity))
            .unwrap_or(Self::Lakehouse)
    }

    /// Returns true if the rule applies to `identity`.
    #[must_use]
    pub fn matches(self, identity: &TableIdentity) -> bool {
        match self {
            Self::PgStatioUserTables => identity.is(PG_CATALOG, "pg_statio_user_tables"),
            Self::PgShadow => identity.is(PG_CATALOG, "pg_shadow"),
            Self::PgRoles => identity.is(PG_CATALOG, "pg_roles"),
            Self::PgShdescription => identity.is(PG_CATALOG, "pg_shdescription"),
            Self::PgCatalog => identity.schema == PG_CATALOG,
            Self::InformationSchemaTables => identity.is(INFORMATION_SCHEMA, "tables"),
            Self::InformationSchema => identity.schema == INFORMATION_SCHEMA,
            Self::Lakehouse => true,
        }
    }

    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PgStatioUserTables => "pg_statio_user_tables",
            Self::PgShadow => "pg_shadow",
            Self::PgRoles => "pg_roles",
            Self::PgShdescription => "pg_shdescription",
            Self::PgCatalog => "pg_catalog",
            Self::InformationSchemaTables => "information_schema_tables",
            Self::InformationSchema => "information_schema",
            Self::Lakehouse => "lakehouse",
        }
    }

    /// Returns true for rules that leave the reference unchanged.
    #[must_use]
    pub const fn is_passthrough(self) -> bool {
        matches!(self, Self::PgCatalog | Self::InformationSchema)
    }
}
