//! Error types for archive mounting and filesystem operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `MountError`.
pub type Result<T> = std::result::Result<T, MountError>;

/// Errors that abort mount setup.
///
/// These occur before any filesystem call can be served; without a
/// successful initial listing there is no tree to answer against.
#[derive(Error, Debug)]
pub enum MountError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No ZIP local-file-header signature found in the scanned head.
    #[error("no ZIP signature found in {path}")]
    MissingZipSignature {
        /// The file that was scanned.
        path: PathBuf,
    },

    /// Archive is corrupted or invalid.
    #[error("invalid archive: {0}")]
    InvalidArchive(String),
}

/// Errors reported back to the host filesystem layer, one per
/// failed operation.
///
/// Each variant corresponds to a standard failure code; none of them
/// terminate the mount session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FsError {
    /// A path segment did not resolve, or a non-terminal segment
    /// resolved to a file.
    #[error("no such entry")]
    NotFound,

    /// A directory operation was requested on a file.
    #[error("not a directory")]
    NotADirectory,

    /// A file operation was requested on a directory.
    #[error("is a directory")]
    IsADirectory,

    /// An open requested write, append, create, or truncate access.
    #[error("read-only filesystem")]
    ReadOnly,

    /// Operation on an unknown or already-released file handle.
    #[error("invalid file handle: {handle}")]
    InvalidHandle {
        /// The offending handle number.
        handle: u64,
    },

    /// The archive decoder could not produce the requested bytes.
    #[error("archive decode failure: {0}")]
    Decode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_error_display() {
        let err = MountError::MissingZipSignature {
            path: PathBuf::from("report.ufdr"),
        };
        assert!(err.to_string().contains("no ZIP signature"));
        assert!(err.to_string().contains("report.ufdr"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: MountError = io_err.into();
        assert!(matches!(err, MountError::Io(_)));
    }

    #[test]
    fn test_fs_error_display() {
        assert_eq!(FsError::NotFound.to_string(), "no such entry");
        assert_eq!(FsError::ReadOnly.to_string(), "read-only filesystem");
        assert!(
            FsError::InvalidHandle { handle: 7 }
                .to_string()
                .contains('7')
        );
    }
}
