//! Archive decoding: ZIP access and UFDR envelope handling.
//!
//! A `.ufdr` export is an XML metadata blob followed by an ordinary ZIP
//! archive; a plain `.zip` is the degenerate case with a zero-length
//! blob. The reader locates the embedded ZIP by scanning for the
//! local-file-header signature, keeps the preceding bytes in memory, and
//! serves ranged decompressed reads for individual entries.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use tracing::info;

use crate::error::{MountError, Result};

/// ZIP local-file-header signature marking the start of the payload.
const ZIP_SIGNATURE: &[u8; 4] = b"PK\x03\x04";

/// End-of-central-directory signature; a ZIP with zero entries has no
/// local file header, so this is the only marker present.
const ZIP_EOCD_SIGNATURE: &[u8; 4] = b"PK\x05\x06";

/// How far into the file the signature scan looks. UFDR metadata blobs
/// are small; anything past this is treated as not-an-archive.
const SIGNATURE_SCAN_LIMIT: u64 = 16 * 1024;

/// Name under which a non-empty UFDR metadata blob is exposed at the
/// filesystem root.
pub const METADATA_NAME: &str = "metadata.xml";

/// Identifies where an entry's bytes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrySource {
    /// ZIP entry at the given central-directory index.
    Zip(usize),
    /// The in-memory UFDR metadata blob.
    Metadata,
}

/// One record from the archive's flat entry listing.
///
/// Immutable once read; the tree builder consumes these in order.
#[derive(Debug, Clone)]
pub struct EntryRecord {
    /// Archive-relative, slash-separated path.
    pub path: String,
    /// Uncompressed size in bytes.
    pub size: u64,
    /// Whether the archive marks this entry as a directory.
    pub is_dir: bool,
    /// Handle for fetching the entry's decompressed bytes.
    pub source: EntrySource,
}

/// Read-only access to the ZIP payload of an archive file.
///
/// The backing file is opened once and held for the lifetime of the
/// reader. Methods take `&mut self` because ZIP decoding needs a
/// mutable cursor; callers wanting shared access wrap the reader in a
/// mutex.
#[derive(Debug)]
pub struct ArchiveReader {
    zip: zip::ZipArchive<File>,
    metadata: Vec<u8>,
    zip_offset: u64,
}

impl ArchiveReader {
    /// Opens an archive file and locates its ZIP payload.
    ///
    /// # Errors
    ///
    /// Returns [`MountError::MissingZipSignature`] when no ZIP signature
    /// occurs within the scan window, [`MountError::InvalidArchive`]
    /// when the payload's central directory cannot be parsed, or
    /// [`MountError::Io`] if the file cannot be read.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;

        let mut head = Vec::new();
        (&file).take(SIGNATURE_SCAN_LIMIT).read_to_end(&mut head)?;
        let zip_offset = find_zip_start(&head).ok_or_else(|| MountError::MissingZipSignature {
            path: path.to_path_buf(),
        })?;
        let metadata = head[..zip_offset].to_vec();

        // The ZIP reader locates the central directory from the end of
        // the file, so prepended metadata needs no offset translation.
        let zip = zip::ZipArchive::new(file)
            .map_err(|e| MountError::InvalidArchive(format!("failed to open ZIP payload: {e}")))?;

        info!(
            zip_offset,
            metadata_bytes = metadata.len(),
            entries = zip.len(),
            "located ZIP payload"
        );

        Ok(Self {
            zip,
            metadata,
            zip_offset: zip_offset as u64,
        })
    }

    /// Lists every entry in the archive.
    ///
    /// When the UFDR metadata blob is non-empty, a synthetic
    /// [`METADATA_NAME`] record is emitted first; the tree builder's
    /// first-claim-wins policy then shadows any ZIP entry of the same
    /// name.
    pub fn entries(&mut self) -> Result<Vec<EntryRecord>> {
        let mut records = Vec::with_capacity(self.zip.len() + 1);

        if !self.metadata.is_empty() {
            records.push(EntryRecord {
                path: METADATA_NAME.to_owned(),
                size: self.metadata.len() as u64,
                is_dir: false,
                source: EntrySource::Metadata,
            });
        }

        for index in 0..self.zip.len() {
            let entry = self.zip.by_index(index).map_err(|e| {
                MountError::InvalidArchive(format!("failed to read ZIP entry {index}: {e}"))
            })?;
            records.push(EntryRecord {
                path: entry.name().to_owned(),
                size: entry.size(),
                is_dir: entry.is_dir(),
                source: EntrySource::Zip(index),
            });
        }

        Ok(records)
    }

    /// Reads up to `length` decompressed bytes of an entry starting at
    /// `offset`.
    ///
    /// Compressed streams cannot seek, so the leading `offset` bytes
    /// are decoded and discarded. Fewer bytes than requested are
    /// returned at end-of-entry; offsets past the end yield an empty
    /// buffer.
    pub fn read_entry(&mut self, source: EntrySource, offset: u64, length: u64) -> Result<Vec<u8>> {
        match source {
            EntrySource::Metadata => {
                let total = self.metadata.len() as u64;
                let start = offset.min(total) as usize;
                let end = offset.saturating_add(length).min(total) as usize;
                Ok(self.metadata[start..end].to_vec())
            }
            EntrySource::Zip(index) => {
                let mut entry = self.zip.by_index(index).map_err(|e| {
                    MountError::InvalidArchive(format!("failed to open ZIP entry {index}: {e}"))
                })?;
                if offset > 0 {
                    io::copy(&mut (&mut entry).take(offset), &mut io::sink())?;
                }
                let mut buffer = Vec::new();
                entry.take(length).read_to_end(&mut buffer)?;
                Ok(buffer)
            }
        }
    }

    /// Byte offset of the ZIP payload within the backing file.
    #[must_use]
    pub fn zip_offset(&self) -> u64 {
        self.zip_offset
    }

    /// The UFDR metadata blob preceding the ZIP payload. Empty for
    /// plain ZIP archives.
    #[must_use]
    pub fn metadata(&self) -> &[u8] {
        &self.metadata
    }
}

/// Locates the start of the ZIP payload in the scanned head.
///
/// Prefers the first local file header; falls back to the
/// end-of-central-directory marker so that archives with zero entries
/// still mount.
fn find_zip_start(head: &[u8]) -> Option<usize> {
    let local = head
        .windows(ZIP_SIGNATURE.len())
        .position(|window| window == ZIP_SIGNATURE);
    if local.is_some() {
        return local;
    }
    head.windows(ZIP_EOCD_SIGNATURE.len())
        .position(|window| window == ZIP_EOCD_SIGNATURE)
}
