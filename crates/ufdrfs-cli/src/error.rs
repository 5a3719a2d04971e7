//! Error conversion utilities for CLI.
//!
//! Converts ufdrfs-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use std::path::Path;
use ufdrfs_core::MountError;

/// Converts `MountError` to a user-friendly anyhow error with context
pub fn convert_mount_error(err: MountError, archive: &Path) -> anyhow::Error {
    match err {
        MountError::MissingZipSignature { path } => {
            anyhow!(
                "No ZIP payload found in '{}'\n\
                 HINT: UFDR exports carry an embedded ZIP; this file has no ZIP signature \
                 in its first 16 KiB and cannot be mounted.",
                path.display()
            )
        }
        MountError::InvalidArchive(reason) => {
            anyhow!(
                "Invalid archive '{}': {}\n\
                 HINT: The ZIP payload may be corrupted or truncated.",
                archive.display(),
                reason
            )
        }
        MountError::Io(io_err) => {
            anyhow!(
                "I/O error while opening '{}': {}",
                archive.display(),
                io_err
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn test_convert_missing_signature() {
        let err = MountError::MissingZipSignature {
            path: PathBuf::from("notes.txt"),
        };
        let converted = convert_mount_error(err, Path::new("notes.txt"));
        let msg = format!("{converted:?}");
        assert!(msg.contains("No ZIP payload"));
        assert!(msg.contains("notes.txt"));
        assert!(msg.contains("HINT"));
    }

    #[test]
    fn test_convert_invalid_archive() {
        let err = MountError::InvalidArchive("bad central directory".into());
        let converted = convert_mount_error(err, Path::new("export.ufdr"));
        let msg = format!("{converted:?}");
        assert!(msg.contains("Invalid archive"));
        assert!(msg.contains("bad central directory"));
    }

    #[test]
    fn test_convert_io_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let converted = convert_mount_error(MountError::Io(io_err), Path::new("gone.zip"));
        let msg = format!("{converted:?}");
        assert!(msg.contains("I/O error"));
    }
}
