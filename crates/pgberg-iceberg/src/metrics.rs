//! Commit pipeline metrics.

use std::sync::OnceLock;

use metrics::{counter, describe_counter};

use crate::codec::Artifact;

/// Artifacts uploaded, labelled by artifact kind.
pub const COMMIT_ARTIFACTS_WRITTEN_TOTAL: &str = "pgberg_commit_artifacts_written_total";

/// Commits that published a version pointer.
pub const COMMITS_TOTAL: &str = "pgberg_commits_total";

/// Commits that stopped before publishing a version pointer.
pub const COMMITS_FAILED_TOTAL: &str = "pgberg_commits_failed_total";

/// Rows written by successful commits.
pub const ROWS_COMMITTED_TOTAL: &str = "pgberg_rows_committed_total";

static METRICS_REGISTERED: OnceLock<()> = OnceLock::new();

/// Registers commit metric descriptions.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn register_metrics() {
    METRICS_REGISTERED.get_or_init(|| {
        describe_counter!(
            COMMIT_ARTIFACTS_WRITTEN_TOTAL,
            "Total number of table artifacts uploaded"
        );
        describe_counter!(COMMITS_TOTAL, "Total number of completed commits");
        describe_counter!(COMMITS_FAILED_TOTAL, "Total number of failed commits");
        describe_counter!(ROWS_COMMITTED_TOTAL, "Total number of rows committed");
    });
}

pub(crate) fn record_artifact(artifact: Artifact) {
    counter!(COMMIT_ARTIFACTS_WRITTEN_TOTAL, "artifact" => artifact.as_str()).increment(1);
}

pub(crate) fn record_commit(rows: i64) {
    counter!(COMMITS_TOTAL).increment(1);
    counter!(ROWS_COMMITTED_TOTAL).increment(u64::try_from(rows).unwrap_or(0));
}

pub(crate) fn record_failure() {
    counter!(COMMITS_FAILED_TOTAL).increment(1);
}
