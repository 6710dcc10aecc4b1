//! Synthesized replacements for Postgres catalog relations.
//!
//! Every builder renders a relation in SQL and parses it back into a
//! [`TableFactor`], so the replacement is always a node the query engine's
//! own dialect accepts. Literal row sets use `VALUES`; empty views use a
//! typed projection filtered by `WHERE FALSE` so the column shape survives.

use pgberg_core::{SchemaTable, ServerIdentity};
use sqlparser::ast::{Ident, SetExpr, Statement, TableFactor, Value};
use sqlparser::dialect::DuckDbDialect;
use sqlparser::parser::Parser;

use crate::error::{CatalogError, Result};
use crate::keywords::keywords;

/// Object id Postgres gives the bootstrap superuser.
const SUPERUSER_OID: i64 = 10;

const PG_STATIO_USER_TABLES_COLUMNS: &[(&str, &str)] = &[
    ("relid", "BIGINT"),
    ("schemaname", "TEXT"),
    ("relname", "TEXT"),
    ("heap_blks_read", "BIGINT"),
    ("heap_blks_hit", "BIGINT"),
    ("idx_blks_read", "BIGINT"),
    ("idx_blks_hit", "BIGINT"),
    ("toast_blks_read", "BIGINT"),
    ("toast_blks_hit", "BIGINT"),
    ("tidx_blks_read", "BIGINT"),
    ("tidx_blks_hit", "BIGINT"),
];

const PG_SHDESCRIPTION_COLUMNS: &[(&str, &str)] = &[
    ("objoid", "BIGINT"),
    ("classoid", "BIGINT"),
    ("description", "TEXT"),
];

const PG_SHADOW_COLUMNS: &[&str] = &[
    "usename",
    "usesysid",
    "usecreatedb",
    "usesuper",
    "userepl",
    "usebypassrls",
    "passwd",
    "valuntil",
    "useconfig",
];

const PG_ROLES_COLUMNS: &[&str] = &[
    "rolname",
    "rolsuper",
    "rolinherit",
    "rolcreaterole",
    "rolcreatedb",
    "rolcanlogin",
    "rolreplication",
    "rolconnlimit",
    "rolpassword",
    "rolvaliduntil",
    "rolbypassrls",
    "rolconfig",
    "oid",
];

const INFORMATION_SCHEMA_TABLES_COLUMNS: &[&str] = &[
    "table_catalog",
    "table_schema",
    "table_name",
    "table_type",
    "self_referencing_column_name",
    "reference_generation",
    "user_defined_type_catalog",
    "user_defined_type_schema",
    "user_defined_type_name",
    "is_insertable_into",
    "is_typed",
    "commit_action",
];

const PG_GET_KEYWORDS_COLUMNS: &[&str] = &["word", "catcode", "barelabel", "catdesc", "baredesc"];

const NULL_TEXT: &str = "CAST(NULL AS TEXT)";

/// Renders a string as a single-quoted SQL literal.
#[must_use]
pub fn literal(value: &str) -> String {
    Value::SingleQuotedString(value.to_string()).to_string()
}

/// Parses `relation` as the single relation of a `FROM` clause.
///
/// # Errors
///
/// Returns [`CatalogError::Template`] if the rendered SQL does not parse to
/// a plain `SELECT ... FROM <relation>`.
pub fn parse_relation(relation: &str) -> Result<TableFactor> {
    let sql = format!("SELECT * FROM {relation}");
    let mut statements =
        Parser::parse_sql(&DuckDbDialect {}, &sql).map_err(|e| CatalogError::template(&sql, e))?;
    if statements.len() != 1 {
        return Err(CatalogError::template(sql, "expected exactly one statement"));
    }

    let Statement::Query(query) = statements.remove(0) else {
        return Err(CatalogError::template(sql, "expected a query"));
    };
    let SetExpr::Select(select) = *query.body else {
        return Err(CatalogError::template(sql, "expected a SELECT"));
    };
    let mut select = *select;
    if select.from.len() != 1 || !select.from[0].joins.is_empty() {
        return Err(CatalogError::template(sql, "expected a single relation"));
    }
    Ok(select.from.remove(0).relation)
}

/// `pg_catalog.pg_statio_user_tables`: no rows.
///
/// # Errors
///
/// Returns an error if the replacement fails to parse.
pub fn pg_statio_user_tables(alias: &Ident) -> Result<TableFactor> {
    empty_relation(PG_STATIO_USER_TABLES_COLUMNS, alias)
}

/// `pg_catalog.pg_shdescription`: no rows.
///
/// # Errors
///
/// Returns an error if the replacement fails to parse.
pub fn pg_shdescription(alias: &Ident) -> Result<TableFactor> {
    empty_relation(PG_SHDESCRIPTION_COLUMNS, alias)
}

/// `pg_catalog.pg_shadow`: the configured user with its encrypted password.
///
/// # Errors
///
/// Returns an error if the replacement fails to parse.
pub fn pg_shadow(identity: &ServerIdentity, alias: &Ident) -> Result<TableFactor> {
    let row = [
        literal(&identity.user),
        format!("CAST({SUPERUSER_OID} AS BIGINT)"),
        "TRUE".to_string(),
        "TRUE".to_string(),
        "TRUE".to_string(),
        "TRUE".to_string(),
        literal(identity.encrypted_password.expose()),
        NULL_TEXT.to_string(),
        NULL_TEXT.to_string(),
    ];
    values_relation(&[row.to_vec()], PG_SHADOW_COLUMNS, alias)
}

/// `pg_catalog.pg_roles`: the configured user as a superuser role.
///
/// # Errors
///
/// Returns an error if the replacement fails to parse.
pub fn pg_roles(identity: &ServerIdentity, alias: &Ident) -> Result<TableFactor> {
    let row = [
        literal(&identity.user),
        "TRUE".to_string(),
        "TRUE".to_string(),
        "TRUE".to_string(),
        "TRUE".to_string(),
        "TRUE".to_string(),
        "TRUE".to_string(),
        "-1".to_string(),
        literal("********"),
        NULL_TEXT.to_string(),
        "TRUE".to_string(),
        NULL_TEXT.to_string(),
        format!("CAST({SUPERUSER_OID} AS BIGINT)"),
    ];
    values_relation(&[row.to_vec()], PG_ROLES_COLUMNS, alias)
}

/// `information_schema.tables`: one `BASE TABLE` row per lakehouse table.
///
/// # Errors
///
/// Returns an error if `tables` is empty or the replacement fails to parse.
pub fn information_schema_tables<'a>(
    database: &str,
    tables: impl IntoIterator<Item = &'a SchemaTable>,
    alias: &Ident,
) -> Result<TableFactor> {
    let rows: Vec<Vec<String>> = tables
        .into_iter()
        .map(|table| {
            vec![
                literal(database),
                literal(&table.schema),
                literal(&table.table),
                literal("BASE TABLE"),
                NULL_TEXT.to_string(),
                NULL_TEXT.to_string(),
                NULL_TEXT.to_string(),
                NULL_TEXT.to_string(),
                NULL_TEXT.to_string(),
                literal("YES"),
                literal("NO"),
                NULL_TEXT.to_string(),
            ]
        })
        .collect();
    values_relation(&rows, INFORMATION_SCHEMA_TABLES_COLUMNS, alias)
}

/// `pg_catalog.pg_get_keywords()`: the Postgres keyword list.
///
/// # Errors
///
/// Returns an error if the replacement fails to parse.
pub fn pg_get_keywords(alias: &Ident) -> Result<TableFactor> {
    let rows: Vec<Vec<String>> = keywords()
        .into_iter()
        .map(|keyword| {
            vec![
                literal(keyword.word),
                literal(keyword.category.code()),
                if keyword.bare_label { "TRUE" } else { "FALSE" }.to_string(),
                literal(keyword.category.description()),
                literal(keyword.bare_description()),
            ]
        })
        .collect();
    values_relation(&rows, PG_GET_KEYWORDS_COLUMNS, alias)
}

/// A scan of an Iceberg table through its metadata file.
///
/// `alias_sql` is rendered verbatim after `AS`, so it may carry a column
/// list.
///
/// # Errors
///
/// Returns an error if the replacement fails to parse.
pub fn lakehouse_scan(metadata_uri: &str, alias_sql: &str) -> Result<TableFactor> {
    parse_relation(&format!(
        "iceberg_scan({}, skip_schema_inference = true) AS {alias_sql}",
        literal(metadata_uri)
    ))
}

fn values_relation(rows: &[Vec<String>], columns: &[&str], alias: &Ident) -> Result<TableFactor> {
    let rows = rows
        .iter()
        .map(|row| format!("({})", row.join(", ")))
        .collect::<Vec<_>>()
        .join(", ");
    let columns = columns
        .iter()
        .map(|c| Ident::new(*c).to_string())
        .collect::<Vec<_>>()
        .join(", ");
    parse_relation(&format!("(VALUES {rows}) AS {alias}({columns})"))
}

fn empty_relation(columns: &[(&str, &str)], alias: &Ident) -> Result<TableFactor> {
    let projection = columns
        .iter()
        .map(|(name, ty)| format!("CAST(NULL AS {ty}) AS {name}"))
        .collect::<Vec<_>>()
        .join(", ");
    parse_relation(&format!("(SELECT {projection} WHERE FALSE) AS {alias}"))
}
