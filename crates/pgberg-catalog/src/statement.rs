//! Applies [`QueryCatalogRewriter`] to every reference in a SQL statement.
//!
//! Rewriting runs in two passes over the same tree. The first pass collects
//! table and table-function references in post-order; each is resolved,
//! which may reload the catalog; the second pass writes the replacements
//! back in the same order. Replacements happen after a node's children are
//! visited, so both passes see the same sequence of references.

use std::ops::ControlFlow;
use std::vec::IntoIter;

use pgberg_core::observability::catalog_span;
use sqlparser::ast::{Statement, TableFactor, Visit, VisitMut, Visitor, VisitorMut};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use tracing::Instrument as _;

use crate::error::{CatalogError, Result};
use crate::rewriter::QueryCatalogRewriter;

/// Rewrites whole SQL statements.
#[derive(Debug)]
pub struct StatementRewriter {
    rewriter: QueryCatalogRewriter,
}

impl StatementRewriter {
    /// Creates a statement rewriter.
    #[must_use]
    pub fn new(rewriter: QueryCatalogRewriter) -> Self {
        Self { rewriter }
    }

    /// Returns the reference rewriter.
    #[must_use]
    pub fn rewriter(&self) -> &QueryCatalogRewriter {
        &self.rewriter
    }

    /// Parses `sql` as Postgres, rewrites every statement and renders the
    /// result, statements joined by `"; "`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Parse`] if `sql` does not parse, or any error
    /// from rewriting a reference.
    pub async fn rewrite_sql(&self, sql: &str) -> Result<String> {
        let statements = Parser::parse_sql(&PostgreSqlDialect {}, sql).map_err(CatalogError::parse)?;

        let mut rendered = Vec::with_capacity(statements.len());
        for mut statement in statements {
            self.rewrite_statement(&mut statement).await?;
            rendered.push(statement.to_string());
        }
        Ok(rendered.join("; "))
    }

    /// Rewrites the references of one parsed statement in place.
    ///
    /// Returns the number of references that changed.
    ///
    /// # Errors
    ///
    /// Returns any error from rewriting a reference; the statement is left
    /// untouched in that case.
    pub async fn rewrite_statement(&self, statement: &mut Statement) -> Result<usize> {
        async {
            // Step 1: collect references in post-order.
            let mut collector = ReferenceCollector::default();
            let _ = Visit::visit(&*statement, &mut collector);

            // Step 2: resolve each one.
            let mut replacements = Vec::with_capacity(collector.references.len());
            let mut changed = 0;
            for reference in &collector.references {
                let replacement = match reference {
                    TableFactor::Table { args: None, .. } => self.rewriter.remap_table(reference).await?,
                    _ => self.rewriter.remap_table_function(reference)?,
                };
                if replacement != *reference {
                    changed += 1;
                }
                replacements.push(replacement);
            }

            // Step 3: write them back in the same order.
            let mut writer = ReferenceWriter {
                replacements: replacements.into_iter(),
            };
            let _ = VisitMut::visit(statement, &mut writer);

            tracing::debug!(
                references = collector.references.len(),
                changed,
                "Rewrote statement"
            );
            Ok::<_, CatalogError>(changed)
        }
        .instrument(catalog_span("rewrite"))
        .await
    }
}

fn is_reference(factor: &TableFactor) -> bool {
    matches!(factor, TableFactor::Table { .. } | TableFactor::Function { .. })
}

#[derive(Default)]
struct ReferenceCollector {
    references: Vec<TableFactor>,
}

impl Visitor for ReferenceCollector {
    type Break = ();

    fn post_visit_table_factor(&mut self, table_factor: &TableFactor) -> ControlFlow<()> {
        if is_reference(table_factor) {
            self.references.push(table_factor.clone());
        }
        ControlFlow::Continue(())
    }
}

struct ReferenceWriter {
    replacements: IntoIter<TableFactor>,
}

impl VisitorMut for ReferenceWriter {
    type Break = ();

    fn post_visit_table_factor(&mut self, table_factor: &mut TableFactor) -> ControlFlow<()> {
        if is_reference(table_factor) {
            if let Some(replacement) = self.replacements.next() {
                *table_factor = replacement;
            }
        }
        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use pgberg_core::{MemoryBackend, ServerIdentity};

    use crate::cache::CatalogCache;

    async fn rewriter() -> StatementRewriter {
        let cache = CatalogCache::new(Arc::new(MemoryBackend::new())).await.unwrap();
        StatementRewriter::new(QueryCatalogRewriter::new(
            Arc::new(cache),
            ServerIdentity::default(),
        ))
    }

    #[tokio::test]
    async fn test_unknown_tables_render_unchanged() {
        let rewriter = rewriter().await;
        let sql = "SELECT a FROM t, u WHERE t.id = u.id";
        assert_eq!(rewriter.rewrite_sql(sql).await.unwrap(), sql);
    }

    #[tokio::test]
    async fn test_multiple_statements_are_joined() {
        let rewriter = rewriter().await;
        let sql = "SELECT 1; SELECT 2";
        assert_eq!(rewriter.rewrite_sql(sql).await.unwrap(), "SELECT 1; SELECT 2");
    }

    #[tokio::test]
    async fn test_parse_failure() {
        let rewriter = rewriter().await;
        assert!(matches!(
            rewriter.rewrite_sql("SELEC 1").await,
            Err(CatalogError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn test_counts_changed_references() {
        let rewriter = rewriter().await;
        let mut statement = Parser::parse_sql(
            &PostgreSqlDialect {},
            "SELECT * FROM pg_catalog.pg_shdescription d, pg_catalog.pg_class c, missing",
        )
        .unwrap()
        .remove(0);
        assert_eq!(rewriter.rewrite_statement(&mut statement).await.unwrap(), 1);
    }
}
