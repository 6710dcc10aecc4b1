//! Error types for the commit pipeline and snapshot reader.

use thiserror::Error;

/// Result type alias for Iceberg operations.
pub type IcebergResult<T> = Result<T, IcebergError>;

/// Boxed error produced by a caller-supplied row source.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while writing or reading table artifacts.
#[derive(Debug, Error)]
pub enum IcebergError {
    /// A storage or core-model failure (carries operation and key).
    #[error(transparent)]
    Core(#[from] pgberg_core::Error),

    /// An artifact could not be encoded.
    #[error("failed to encode {artifact}: {message}")]
    Encode {
        /// Artifact kind (data file, manifest, ...).
        artifact: &'static str,
        /// Human-readable error message.
        message: String,
    },

    /// A stored artifact could not be decoded.
    #[error("failed to decode {artifact}: {message}")]
    Decode {
        /// Artifact kind (data file, manifest, ...).
        artifact: &'static str,
        /// Human-readable error message.
        message: String,
    },

    /// The caller's row source failed.
    #[error("row source failed")]
    RowSource {
        /// The underlying cause.
        #[source]
        source: BoxError,
    },

    /// A local scratch file could not be written.
    #[error("scratch file I/O failed for {artifact}")]
    Scratch {
        /// Artifact kind being staged.
        artifact: &'static str,
        /// The underlying cause.
        #[source]
        source: std::io::Error,
    },

    /// Table metadata is inconsistent with the artifacts it references.
    #[error("invalid table metadata: {message}")]
    InvalidMetadata {
        /// Human-readable error message.
        message: String,
    },
}

impl IcebergError {
    /// Creates an encode error.
    #[must_use]
    pub fn encode(artifact: &'static str, message: impl std::fmt::Display) -> Self {
        Self::Encode {
            artifact,
            message: message.to_string(),
        }
    }

    /// Creates a decode error.
    #[must_use]
    pub fn decode(artifact: &'static str, message: impl std::fmt::Display) -> Self {
        Self::Decode {
            artifact,
            message: message.to_string(),
        }
    }

    /// Creates an invalid metadata error.
    #[must_use]
    pub fn invalid_metadata(message: impl Into<String>) -> Self {
        Self::InvalidMetadata {
            message: message.into(),
        }
    }
}
