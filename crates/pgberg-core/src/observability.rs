//! Observability infrastructure for pgberg.
//!
//! Structured logging with consistent spans for the two hot paths: catalog
//! resolution during query rewriting, and table commits.

use std::str::FromStr;
use std::sync::Once;

use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::Error;

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "text" => Ok(Self::Pretty),
            other => Err(Error::configuration(format!(
                "log format must be 'json' or 'pretty' (got '{other}')"
            ))),
        }
    }
}

/// Initializes the logging subsystem.
///
/// Call once at application startup. Safe to call multiple times;
/// subsequent calls are no-ops. Events go to stderr so command output on
/// stdout stays machine-readable.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Controls log levels (e.g., `info`, `pgberg_catalog=debug`)
///
/// # Example
///
/// ```rust
/// use pgberg_core::observability::{init_logging, LogFormat};
///
/// init_logging(LogFormat::Pretty);
/// ```
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json().with_writer(std::io::stderr))
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().pretty().with_writer(std::io::stderr))
                    .init();
            }
        }
    });
}

/// Creates a span for catalog resolution.
///
/// # Example
///
/// ```rust
/// use pgberg_core::observability::catalog_span;
///
/// let span = catalog_span("reload");
/// let _guard = span.enter();
/// ```
#[must_use]
pub fn catalog_span(operation: &str) -> Span {
    tracing::info_span!("catalog", op = operation)
}

/// Creates a span for a table commit.
#[must_use]
pub fn commit_span(schema: &str, table: &str) -> Span {
    tracing::info_span!("commit", schema = schema, table = table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_succeeds() {
        init_logging(LogFormat::Pretty);
        init_logging(LogFormat::Json);
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_span_helpers_create_spans() {
        let span = commit_span("public", "orders");
        let _guard = span.enter();
        tracing::info!("commit message in span");
        let _catalog = catalog_span("reload").entered();
    }
}
