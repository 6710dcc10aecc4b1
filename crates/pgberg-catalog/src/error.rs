//! Error types for catalog emulation and query rewriting.

use thiserror::Error;

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors that can occur while listing tables or rewriting queries.
///
/// A lakehouse table that does not exist is not an error: the reference is
/// returned unchanged and the query engine reports it.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A storage listing failed.
    #[error(transparent)]
    Core(#[from] pgberg_core::Error),

    /// A synthesized replacement did not parse.
    #[error("invalid rewrite template: {message}")]
    Template {
        /// SQL that failed to parse.
        sql: String,
        /// Parser message.
        message: String,
    },

    /// The input query did not parse.
    #[error("failed to parse query: {message}")]
    Parse {
        /// Parser message.
        message: String,
    },
}

impl CatalogError {
    /// Creates a template error.
    #[must_use]
    pub fn template(sql: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Template {
            sql: sql.into(),
            message: message.to_string(),
        }
    }

    /// Creates a parse error.
    #[must_use]
    pub fn parse(message: impl std::fmt::Display) -> Self {
        Self::Parse {
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_errors_pass_through() {
        let err: CatalogError = pgberg_core::Error::storage("list directories failed for ''").into();
        assert_eq!(
            err.to_string(),
            "storage error: list directories failed for ''"
        );
    }

    #[test]
    fn test_template_error_keeps_sql() {
        let err = CatalogError::template("SELECT", "unexpected end of input");
        assert!(matches!(err, CatalogError::Template { ref sql, .. } if sql == "SELECT"));
        assert!(err.to_string().contains("unexpected end of input"));
    }
}
