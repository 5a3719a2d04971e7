//! The mount session: one archive, one tree, one open-handle table.
//!
//! All filesystem operations go through [`MountSession`]. Every call
//! resolves its path from the root of the immutable tree; the only
//! mutable shared state is the table of open file handles, so the
//! session is safe to share across the host's worker threads.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use tracing::{debug, info};

use crate::archive::{ArchiveReader, EntrySource};
use crate::error::{FsError, MountError};
use crate::tree::{NodeKind, TreeNode, build_tree};

/// Attributes of a resolved tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryAttr {
    /// Directory or file.
    pub kind: NodeKind,
    /// Uncompressed size in bytes; 0 for directories.
    pub size: u64,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Child name (single path segment).
    pub name: String,
    /// Kind of the child.
    pub kind: NodeKind,
}

/// Filesystem-level statistics for `statfs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsStats {
    /// Sum of all file node sizes in bytes.
    pub total_bytes: u64,
    /// Number of file nodes.
    pub file_count: u64,
    /// Fixed block size used for capacity reporting.
    pub block_size: u32,
}

/// An issued open-file handle, bound to a file node's archive source.
///
/// Handles share no mutable state; every read carries its own offset.
#[derive(Debug, Clone, Copy)]
struct OpenHandle {
    source: EntrySource,
    size: u64,
}

/// A mounted archive: the open reader, the immutable tree, and the
/// open-handle table.
///
/// Built once at mount time; serves independent operation calls until
/// the mount is torn down. Dropping the session releases everything.
#[derive(Debug)]
pub struct MountSession {
    reader: Mutex<ArchiveReader>,
    root: TreeNode,
    handles: Mutex<HashMap<u64, OpenHandle>>,
    next_handle: AtomicU64,
    mounted_at: SystemTime,
    stats: FsStats,
}

impl MountSession {
    /// Block size reported by [`MountSession::statfs`].
    pub const BLOCK_SIZE: u32 = 512;

    /// Opens an archive and builds the directory tree.
    ///
    /// # Errors
    ///
    /// Fails when the archive cannot be opened or listed; this is the
    /// one unrecoverable failure point, before any operation is served.
    pub fn new<P: AsRef<Path>>(archive: P) -> Result<Self, MountError> {
        let mut reader = ArchiveReader::open(archive)?;
        let entries = reader.entries()?;
        let root = build_tree(&entries);

        let file_entries = entries.iter().filter(|e| !e.is_dir);
        let stats = FsStats {
            total_bytes: file_entries.clone().map(|e| e.size).sum(),
            file_count: file_entries.count() as u64,
            block_size: Self::BLOCK_SIZE,
        };
        info!(
            files = stats.file_count,
            bytes = stats.total_bytes,
            "mount session ready"
        );

        Ok(Self {
            reader: Mutex::new(reader),
            root,
            handles: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
            mounted_at: SystemTime::now(),
            stats,
        })
    }

    fn resolve(&self, path: &str) -> Result<&TreeNode, FsError> {
        self.root.resolve(path).ok_or(FsError::NotFound)
    }

    /// Returns the kind and size of the node at `path`.
    pub fn getattr(&self, path: &str) -> Result<EntryAttr, FsError> {
        debug!(path, "getattr");
        let node = self.resolve(path)?;
        Ok(EntryAttr {
            kind: node.kind(),
            size: node.size(),
        })
    }

    /// Lists the immediate children of the directory at `path`.
    ///
    /// The conventional `.`/`..` entries are the mount adapter's
    /// concern; this returns exactly the child set.
    pub fn readdir(&self, path: &str) -> Result<Vec<DirEntry>, FsError> {
        debug!(path, "readdir");
        let node = self.resolve(path)?;
        if node.kind() != NodeKind::Directory {
            return Err(FsError::NotADirectory);
        }
        Ok(node
            .children()
            .map(|child| DirEntry {
                name: child.name().to_owned(),
                kind: child.kind(),
            })
            .collect())
    }

    /// Opens the file at `path` and issues a new handle.
    ///
    /// `write_requested` reflects any write, append, create, or
    /// truncate intent in the host's open flags; the filesystem is
    /// permanently read-only, so such intent is rejected outright.
    pub fn open(&self, path: &str, write_requested: bool) -> Result<u64, FsError> {
        debug!(path, write_requested, "open");
        let node = self.resolve(path)?;
        if node.kind() == NodeKind::Directory {
            return Err(FsError::IsADirectory);
        }
        if write_requested {
            return Err(FsError::ReadOnly);
        }
        // File nodes always carry a source; the tree builder guarantees it.
        let source = node.source().ok_or(FsError::NotFound)?;

        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.handles().insert(
            handle,
            OpenHandle {
                source,
                size: node.size(),
            },
        );
        Ok(handle)
    }

    /// Reads up to `length` bytes from an open handle starting at
    /// `offset`.
    ///
    /// The range is clamped to the entry's declared size: offsets at or
    /// beyond end-of-file return an empty buffer, never an error.
    pub fn read(&self, handle: u64, offset: u64, length: u64) -> Result<Vec<u8>, FsError> {
        debug!(handle, offset, length, "read");
        let open = self
            .handles()
            .get(&handle)
            .copied()
            .ok_or(FsError::InvalidHandle { handle })?;

        if offset >= open.size {
            return Ok(Vec::new());
        }
        let length = length.min(open.size - offset);

        self.reader
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .read_entry(open.source, offset, length)
            .map_err(|e| FsError::Decode(e.to_string()))
    }

    /// Releases an open handle.
    ///
    /// Idempotent: releasing an unknown or already-released handle is a
    /// logged no-op.
    pub fn release(&self, handle: u64) {
        if self.handles().remove(&handle).is_none() {
            debug!(handle, "release of unknown handle ignored");
        } else {
            debug!(handle, "release");
        }
    }

    /// Reports read-only filesystem statistics.
    #[must_use]
    pub fn statfs(&self) -> FsStats {
        self.stats
    }

    /// The instant the session was built; used for all reported
    /// timestamps.
    #[must_use]
    pub fn mounted_at(&self) -> SystemTime {
        self.mounted_at
    }

    /// Root of the directory tree.
    #[must_use]
    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    /// Number of currently open handles.
    #[must_use]
    pub fn open_handles(&self) -> usize {
        self.handles().len()
    }

    fn handles(&self) -> std::sync::MutexGuard<'_, HashMap<u64, OpenHandle>> {
        self.handles
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::test_utils::create_test_zip;

    fn session_with(entries: Vec<(&str, &[u8])>) -> (NamedTempFile, MountSession) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&create_test_zip(entries)).unwrap();
        file.flush().unwrap();
        let session = MountSession::new(file.path()).unwrap();
        (file, session)
    }

    #[test]
    fn test_getattr_file_and_directory() {
        let (_file, session) = session_with(vec![("docs/readme.txt", b"hello world")]);

        let attr = session.getattr("/docs/readme.txt").unwrap();
        assert_eq!(attr.kind, NodeKind::File);
        assert_eq!(attr.size, 11);

        let attr = session.getattr("/docs").unwrap();
        assert_eq!(attr.kind, NodeKind::Directory);
        assert_eq!(attr.size, 0);

        assert_eq!(session.getattr("/missing"), Err(FsError::NotFound));
    }

    #[test]
    fn test_readdir_children() {
        let (_file, session) = session_with(vec![
            ("docs/readme.txt", b"hello world".as_slice()),
            ("docs/img/photo.bin", b"\x00\x01\x02\x03".as_slice()),
        ]);

        let names: Vec<String> = session
            .readdir("/docs")
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["img", "readme.txt"]);

        assert_eq!(
            session.readdir("/docs/readme.txt"),
            Err(FsError::NotADirectory)
        );
        assert_eq!(session.readdir("/nope"), Err(FsError::NotFound));
    }

    #[test]
    fn test_open_rejects_write_intent() {
        let (_file, session) = session_with(vec![("f.txt", b"data")]);

        assert_eq!(session.open("/f.txt", true), Err(FsError::ReadOnly));
        assert_eq!(session.open("/", false), Err(FsError::IsADirectory));
        assert_eq!(session.open("/missing", false), Err(FsError::NotFound));
        assert!(session.open("/f.txt", false).is_ok());
    }

    #[test]
    fn test_read_clamps_to_size() {
        let (_file, session) = session_with(vec![("f.txt", b"hello world")]);
        let handle = session.open("/f.txt", false).unwrap();

        assert_eq!(session.read(handle, 0, 20).unwrap(), b"hello world");
        assert_eq!(session.read(handle, 6, 5).unwrap(), b"world");
        assert!(session.read(handle, 11, 4).unwrap().is_empty());
        assert!(session.read(handle, 500, 4).unwrap().is_empty());
    }

    #[test]
    fn test_release_then_read_fails() {
        let (_file, session) = session_with(vec![("f.txt", b"data")]);
        let handle = session.open("/f.txt", false).unwrap();

        session.release(handle);
        assert_eq!(
            session.read(handle, 0, 4),
            Err(FsError::InvalidHandle { handle })
        );
        // Idempotent: double release must not disturb the session
        session.release(handle);
        assert_eq!(session.open_handles(), 0);
    }

    #[test]
    fn test_concurrent_handles_independent() {
        let (_file, session) = session_with(vec![("f.txt", b"hello world")]);
        let h1 = session.open("/f.txt", false).unwrap();
        let h2 = session.open("/f.txt", false).unwrap();
        assert_ne!(h1, h2);

        session.release(h1);
        assert_eq!(session.read(h2, 0, 5).unwrap(), b"hello");
        session.release(h2);
    }

    #[test]
    fn test_statfs_totals() {
        let (_file, session) = session_with(vec![
            ("a.txt", b"12345".as_slice()),
            ("dir/b.txt", b"123".as_slice()),
        ]);

        let stats = session.statfs();
        assert_eq!(stats.total_bytes, 8);
        assert_eq!(stats.file_count, 2);
        assert_eq!(stats.block_size, MountSession::BLOCK_SIZE);
    }

    #[test]
    fn test_empty_archive_mounts() {
        let (_file, session) = session_with(vec![]);

        assert_eq!(session.getattr("/").unwrap().kind, NodeKind::Directory);
        assert!(session.readdir("/").unwrap().is_empty());
        assert_eq!(session.statfs().file_count, 0);
    }
}
