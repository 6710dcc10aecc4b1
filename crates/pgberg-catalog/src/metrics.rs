//! Catalog metrics.

use std::sync::OnceLock;

use metrics::{counter, describe_counter};

/// Catalog reloads (full re-listings of the storage root).
pub const CATALOG_RELOADS_TOTAL: &str = "pgberg_catalog_reloads_total";

/// Table references rewritten, labelled by rule.
pub const CATALOG_REWRITES_TOTAL: &str = "pgberg_catalog_rewrites_total";

/// Lakehouse references left unchanged because the table does not exist.
pub const CATALOG_MISSES_TOTAL: &str = "pgberg_catalog_misses_total";

static METRICS_REGISTERED: OnceLock<()> = OnceLock::new();

/// Registers catalog metric descriptions.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn register_metrics() {
    METRICS_REGISTERED.get_or_init(|| {
        describe_counter!(CATALOG_RELOADS_TOTAL, "Total number of catalog reloads");
        describe_counter!(
            CATALOG_REWRITES_TOTAL,
            "Total number of rewritten table references"
        );
        describe_counter!(
            CATALOG_MISSES_TOTAL,
            "Total number of lakehouse references to unknown tables"
        );
    });
}

pub(crate) fn record_reload() {
    counter!(CATALOG_RELOADS_TOTAL).increment(1);
}

pub(crate) fn record_rewrite(rule: &'static str) {
    counter!(CATALOG_REWRITES_TOTAL, "rule" => rule).increment(1);
}

pub(crate) fn record_miss() {
    counter!(CATALOG_MISSES_TOTAL).increment(1);
}
