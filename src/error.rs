//! Error types for archive operations.
//!
//! Every fallible operation in this crate returns [`Result<T>`]. Failures
//! fall into three broad classes, reported by [`ArchiveError::kind`]:
//!
//! - [`ErrorKind::PathNotFound`]: an input path is missing or is the wrong kind
//! - [`ErrorKind::NotAZipFile`]: the archive path is not an existing regular file
//! - [`ErrorKind::IoFailure`]: anything that went wrong while streaming

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Coarse classification of an [`ArchiveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    PathNotFound,
    NotAZipFile,
    IoFailure,
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    /// A source file or directory does not exist or has the wrong type.
    #[error("path not found: {}", path.display())]
    PathNotFound { path: PathBuf },

    /// The archive path is missing or is not a regular file.
    #[error("not a zip file: {}", path.display())]
    NotAZipFile { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),

    /// The container is structurally broken (bad signature, CRC mismatch, ...).
    #[error("invalid zip archive: {0}")]
    InvalidArchive(String),

    #[error("unsupported compression method: {0}")]
    UnsupportedCompression(u16),

    /// An entry name would resolve outside the extraction directory.
    #[error("unsafe entry name: {0}")]
    UnsafeEntryName(String),

    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
}

impl ArchiveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ArchiveError::PathNotFound { .. } => ErrorKind::PathNotFound,
            ArchiveError::NotAZipFile { .. } => ErrorKind::NotAZipFile,
            ArchiveError::Io(_)
            | ArchiveError::InvalidArchive(_)
            | ArchiveError::UnsupportedCompression(_)
            | ArchiveError::UnsafeEntryName(_)
            | ArchiveError::Walk(_) => ErrorKind::IoFailure,
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ArchiveError::InvalidArchive(msg.into())
    }
}

/// Unwraps errors that travelled through an `io::Read`/`io::Write` boundary.
impl From<std::io::Error> for ArchiveError {
    fn from(err: std::io::Error) -> Self {
        let nested = err
            .get_ref()
            .is_some_and(|inner| inner.is::<ArchiveError>());
        if !nested {
            return ArchiveError::Io(err);
        }

        match err.into_inner().map(|inner| inner.downcast::<ArchiveError>()) {
            Some(Ok(inner)) => *inner,
            _ => ArchiveError::invalid("malformed nested error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let err = ArchiveError::PathNotFound {
            path: PathBuf::from("/missing"),
        };
        assert_eq!(err.kind(), ErrorKind::PathNotFound);

        let err = ArchiveError::NotAZipFile {
            path: PathBuf::from("/missing.zip"),
        };
        assert_eq!(err.kind(), ErrorKind::NotAZipFile);

        assert_eq!(ArchiveError::invalid("bad crc").kind(), ErrorKind::IoFailure);
        assert_eq!(
            ArchiveError::UnsafeEntryName("../x".into()).kind(),
            ErrorKind::IoFailure
        );
        let io = std::io::Error::other("disk full");
        assert_eq!(ArchiveError::from(io).kind(), ErrorKind::IoFailure);
    }

    #[test]
    fn test_nested_error_is_unwrapped() {
        let io = std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            ArchiveError::UnsupportedCompression(12),
        );
        match ArchiveError::from(io) {
            ArchiveError::UnsupportedCompression(12) => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_display_contains_path() {
        let err = ArchiveError::NotAZipFile {
            path: PathBuf::from("/tmp/a.zip"),
        };
        assert!(err.to_string().contains("/tmp/a.zip"));
    }
}
