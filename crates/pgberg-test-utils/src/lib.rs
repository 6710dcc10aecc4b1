//! Shared test utilities for pgberg.
//!
//! This crate provides:
//! - [`TracingMemoryBackend`]: In-memory storage with operation recording
//!   and failure injection
//! - Fixtures for identities, seeded tables, schemas and rows

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

pub mod fixtures;
pub mod storage;

pub use fixtures::*;
pub use storage::*;

/// Crates whose events are shown at debug level in tests.
const LOGGED_CRATES: [&str; 3] = ["pgberg_core", "pgberg_iceberg", "pgberg_catalog"];

/// Routes pgberg events to the test writer. Safe to call from every test.
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = LOGGED_CRATES.iter().fold(EnvFilter::from_default_env(), |filter, krate| {
        filter.add_directive(format!("{krate}=debug").parse().expect("valid directive"))
    });
    let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
}
