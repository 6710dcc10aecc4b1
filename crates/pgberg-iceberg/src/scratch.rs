//! Local scratch files for staging artifacts before upload.
//!
//! A [`ScratchFile`] owns a named temporary file that is removed when the
//! value is dropped, so every exit path of a commit step (success, encode
//! failure, upload failure) cleans up.

use std::io::Write as _;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::codec::Artifact;
use crate::error::{IcebergError, IcebergResult};

/// A fully written local copy of one artifact.
#[derive(Debug)]
pub struct ScratchFile {
    artifact: Artifact,
    file: NamedTempFile,
    len: u64,
}

impl ScratchFile {
    /// Writes `bytes` to a new scratch file and flushes it.
    ///
    /// # Errors
    ///
    /// Returns [`IcebergError::Scratch`] if the file cannot be created or
    /// written.
    pub fn write(artifact: Artifact, bytes: &[u8]) -> IcebergResult<Self> {
        let scratch_err = |source| IcebergError::Scratch {
            artifact: artifact.as_str(),
            source,
        };
        let mut file = tempfile::Builder::new()
            .prefix(&format!("pgberg-{artifact}-"))
            .tempfile()
            .map_err(scratch_err)?;
        file.write_all(bytes).map_err(scratch_err)?;
        file.as_file().sync_all().map_err(scratch_err)?;
        Ok(Self {
            artifact,
            file,
            len: bytes.len() as u64,
        })
    }

    /// Local path of the staged file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Artifact kind staged in this file.
    #[must_use]
    pub fn artifact(&self) -> Artifact {
        self.artifact
    }

    /// Number of bytes staged.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns true if nothing was staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_file_is_removed_on_drop() {
        let scratch = ScratchFile::write(Artifact::Manifest, b"avro bytes").unwrap();
        let path = scratch.path().to_path_buf();
        assert_eq!(std::fs::read(&path).unwrap(), b"avro bytes");
        assert_eq!(scratch.len(), 10);
        assert!(path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("pgberg-manifest-")));

        drop(scratch);
        assert!(!path.exists());
    }
}
