//! Rewriting of single table, table-function and nested-function references.

use std::sync::Arc;

use pgberg_core::{SchemaTable, ServerIdentity, TablePaths};
use sqlparser::ast::{
    Expr, Function, FunctionArg, FunctionArgExpr, FunctionArguments, TableFactor,
    TableFunctionArgs,
};
use sqlparser::dialect::DuckDbDialect;
use sqlparser::parser::Parser;

use crate::cache::CatalogCache;
use crate::error::{CatalogError, Result};
use crate::identity::{CatalogRule, PG_CATALOG, TableIdentity};
use crate::metrics;
use crate::views;

/// Table function listing the server's SQL keywords.
pub const PG_GET_KEYWORDS: &str = "pg_get_keywords";

/// Array function rewritten to the engine's length function.
pub const ARRAY_UPPER: &str = "array_upper";

/// Rewrites references to Postgres catalog relations and lakehouse tables.
///
/// Each call takes one reference and returns its replacement. References
/// the rewriter does not handle come back unchanged, including lakehouse
/// tables that do not exist, so the query engine reports them itself.
#[derive(Debug)]
pub struct QueryCatalogRewriter {
    cache: Arc<CatalogCache>,
    identity: ServerIdentity,
}

impl QueryCatalogRewriter {
    /// Creates a rewriter over a catalog cache.
    #[must_use]
    pub fn new(cache: Arc<CatalogCache>, identity: ServerIdentity) -> Self {
        Self { cache, identity }
    }

    /// Returns the catalog cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<CatalogCache> {
        &self.cache
    }

    /// Returns the identity shown in synthesized catalog rows.
    #[must_use]
    pub fn identity(&self) -> &ServerIdentity {
        &self.identity
    }

    /// Rewrites a plain table reference.
    ///
    /// # Errors
    ///
    /// Returns an error if a catalog reload fails or a replacement cannot
    /// be built. A missing lakehouse table is not an error.
    pub async fn remap_table(&self, factor: &TableFactor) -> Result<TableFactor> {
        let Some(identity) = TableIdentity::from_table_factor(factor) else {
            return Ok(factor.clone());
        };

        let rule = CatalogRule::classify(&identity);
        let replacement = match rule {
            CatalogRule::PgStatioUserTables => Some(views::pg_statio_user_tables(&identity.alias)?),
            CatalogRule::PgShadow => Some(views::pg_shadow(&self.identity, &identity.alias)?),
            CatalogRule::PgRoles => Some(views::pg_roles(&self.identity, &identity.alias)?),
            CatalogRule::PgShdescription => Some(views::pg_shdescription(&identity.alias)?),
            CatalogRule::PgCatalog | CatalogRule::InformationSchema => None,
            CatalogRule::InformationSchemaTables => self.information_schema_tables(&identity).await?,
            CatalogRule::Lakehouse => self.lakehouse_table(&identity).await?,
        };

        Ok(finish(rule.as_str(), factor, replacement))
    }

    /// Rewrites a table-function reference.
    ///
    /// Nested function calls in the arguments are rewritten first; then
    /// `pg_get_keywords()` is replaced by the keyword list.
    ///
    /// # Errors
    ///
    /// Returns an error if a replacement cannot be built.
    pub fn remap_table_function(&self, factor: &TableFactor) -> Result<TableFactor> {
        let mut factor = factor.clone();
        let Some(args) = function_args_mut(&mut factor) else {
            return Ok(factor);
        };
        for arg in args.iter_mut() {
            if let Some(expr) = arg_expr_mut(arg) {
                if let Expr::Function(function) = expr {
                    *expr = self.remap_nested_function(function)?;
                }
            }
        }

        let keywords = match &factor {
            TableFactor::Table { name, alias, .. } | TableFactor::Function { name, alias, .. } => {
                TableIdentity::from_name(name, alias.as_ref())
                    .filter(|id| id.table == PG_GET_KEYWORDS)
                    .filter(|id| id.schema.is_empty() || id.schema == PG_CATALOG)
            }
            _ => None,
        };
        let replacement = match keywords {
            Some(identity) => Some(views::pg_get_keywords(&identity.alias)?),
            None => None,
        };
        Ok(finish(PG_GET_KEYWORDS, &factor, replacement))
    }

    /// Rewrites a function call that is an argument of a table function.
    ///
    /// `array_upper(x, 1)` becomes `len(x)`; other calls are returned
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the replacement cannot be built.
    #[allow(clippy::unused_self)]
    pub fn remap_nested_function(&self, function: &Function) -> Result<Expr> {
        let Some(array) = array_upper_operand(function) else {
            return Ok(Expr::Function(function.clone()));
        };

        let sql = format!("len({array})");
        let expr = Parser::new(&DuckDbDialect {})
            .try_with_sql(&sql)
            .and_then(|mut parser| parser.parse_expr())
            .map_err(|e| CatalogError::template(&sql, e))?;
        metrics::record_rewrite(ARRAY_UPPER);
        tracing::debug!(rewritten = %expr, "Rewrote nested function");
        Ok(expr)
    }

    async fn information_schema_tables(
        &self,
        identity: &TableIdentity,
    ) -> Result<Option<TableFactor>> {
        let tables = self.cache.reload().await?;
        if tables.is_empty() {
            return Ok(None);
        }
        views::information_schema_tables(&self.identity.database, tables.iter(), &identity.alias)
            .map(Some)
    }

    async fn lakehouse_table(&self, identity: &TableIdentity) -> Result<Option<TableFactor>> {
        let table = SchemaTable::with_default_schema(&identity.schema, identity.table.clone());

        // Step 1: one reload on a miss, then defer to the engine.
        if !self.cache.contains(&table) && !self.cache.reload().await?.contains(&table) {
            metrics::record_miss();
            tracing::debug!(table = %table, "Lakehouse table not found");
            return Ok(None);
        }

        // Step 2: scan the current metadata file under the reference's alias.
        let metadata_uri = TablePaths::uri(
            &self.cache.storage().root_uri(),
            &TablePaths::current_metadata_file(&table),
        );
        let alias = identity
            .explicit_alias
            .as_ref()
            .map_or_else(|| identity.alias.to_string(), ToString::to_string);
        views::lakehouse_scan(&metadata_uri, &alias).map(Some)
    }
}

fn finish(
    rule: &'static str,
    original: &TableFactor,
    replacement: Option<TableFactor>,
) -> TableFactor {
    match replacement {
        Some(replacement) => {
            metrics::record_rewrite(rule);
            tracing::debug!(
                rule,
                original = %original,
                rewritten = %replacement,
                "Rewrote table reference"
            );
            replacement
        }
        None => original.clone(),
    }
}

fn function_args_mut(factor: &mut TableFactor) -> Option<&mut Vec<FunctionArg>> {
    match factor {
        TableFactor::Table {
            args: Some(TableFunctionArgs { args, .. }),
            ..
        }
        | TableFactor::Function { args, .. } => Some(args),
        _ => None,
    }
}

fn arg_expr_mut(arg: &mut FunctionArg) -> Option<&mut Expr> {
    match arg {
        FunctionArg::Named {
            arg: FunctionArgExpr::Expr(expr),
            ..
        }
        | FunctionArg::Unnamed(FunctionArgExpr::Expr(expr)) => Some(expr),
        _ => None,
    }
}

/// Returns `x` if `function` is `array_upper(x, 1)`.
fn array_upper_operand(function: &Function) -> Option<&Expr> {
    let name = TableIdentity::from_name(&function.name, None)?;
    if name.table != ARRAY_UPPER || !(name.schema.is_empty() || name.schema == PG_CATALOG) {
        return None;
    }
    let FunctionArguments::List(list) = &function.args else {
        return None;
    };
    match list.args.as_slice() {
        [FunctionArg::Unnamed(FunctionArgExpr::Expr(array)), FunctionArg::Unnamed(FunctionArgExpr::Expr(dimension))]
            if dimension.to_string() == "1" =>
        {
            Some(array)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgberg_core::MemoryBackend;
    use sqlparser::dialect::PostgreSqlDialect;

    async fn rewriter() -> QueryCatalogRewriter {
        let cache = CatalogCache::new(Arc::new(MemoryBackend::new())).await.unwrap();
        QueryCatalogRewriter::new(Arc::new(cache), ServerIdentity::default())
    }

    fn function(sql: &str) -> Function {
        let expr = Parser::new(&PostgreSqlDialect {})
            .try_with_sql(sql)
            .unwrap()
            .parse_expr()
            .unwrap();
        match expr {
            Expr::Function(function) => function,
            other => panic!("not a function: {other}"),
        }
    }

    #[tokio::test]
    async fn test_array_upper_becomes_len() {
        let rewriter = rewriter().await;
        let expr = rewriter
            .remap_nested_function(&function("ARRAY_UPPER(current_schemas(false), 1)"))
            .unwrap();
        assert_eq!(expr.to_string(), "len(current_schemas(false))");
    }

    #[tokio::test]
    async fn test_other_nested_calls_are_unchanged() {
        let rewriter = rewriter().await;
        for sql in ["array_upper(a, 2)", "array_lower(a, 1)", "array_upper(a)"] {
            let call = function(sql);
            let expr = rewriter.remap_nested_function(&call).unwrap();
            assert_eq!(expr, Expr::Function(call), "{sql}");
        }
    }

    #[tokio::test]
    async fn test_non_table_factors_pass_through() {
        let rewriter = rewriter().await;
        let derived = views::parse_relation("(SELECT 1) AS one").unwrap();
        assert_eq!(rewriter.remap_table(&derived).await.unwrap(), derived);
        assert_eq!(rewriter.remap_table_function(&derived).unwrap(), derived);
    }
}
