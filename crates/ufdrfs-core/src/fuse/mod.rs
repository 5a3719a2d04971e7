//! FUSE driver binding a [`MountSession`] to the kernel.
//!
//! The driver translates the kernel's inode-addressed calls into the
//! session's path-addressed operations via an [`InodeTable`], maps
//! [`FsError`] variants to errno values, and renders node attributes
//! with a fixed read-only permission mask. The session itself never
//! sees an inode, which keeps it testable without a mount.

mod inode_table;

pub use inode_table::InodeTable;

use std::ffi::OsStr;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use fuser::{
    FileAttr, FileType, Filesystem, MountOption, ReplyAttr, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyOpen, ReplyStatfs, Request,
};
use tracing::debug;

use crate::error::{FsError, Result};
use crate::session::{EntryAttr, MountSession};
use crate::tree::NodeKind;

/// Attribute cache lifetime handed to the kernel. The tree never
/// changes, so any value is correct; 1s keeps unmount prompt.
const TTL: Duration = Duration::from_secs(1);

/// Maps an operation error to the errno reported to the kernel.
fn errno(err: &FsError) -> libc::c_int {
    match err {
        FsError::NotFound => libc::ENOENT,
        FsError::NotADirectory => libc::ENOTDIR,
        FsError::IsADirectory => libc::EISDIR,
        FsError::ReadOnly => libc::EROFS,
        FsError::InvalidHandle { .. } => libc::EBADF,
        FsError::Decode(_) => libc::EIO,
    }
}

/// Returns `true` when open flags carry any mutating intent.
fn write_requested(flags: i32) -> bool {
    flags & libc::O_ACCMODE != libc::O_RDONLY
        || flags & (libc::O_APPEND | libc::O_TRUNC | libc::O_CREAT) != 0
}

/// FUSE filesystem serving a mounted archive.
pub struct ArchiveFuse {
    session: Arc<MountSession>,
    inodes: Mutex<InodeTable>,
}

impl ArchiveFuse {
    /// Creates a driver over an established mount session.
    #[must_use]
    pub fn new(session: Arc<MountSession>) -> Self {
        Self {
            session,
            inodes: Mutex::new(InodeTable::new()),
        }
    }

    fn inode_path(&self, inode: u64) -> Option<String> {
        self.inodes().path(inode).map(str::to_owned)
    }

    fn inodes(&self) -> std::sync::MutexGuard<'_, InodeTable> {
        self.inodes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn attr_for(&self, inode: u64, attr: EntryAttr) -> FileAttr {
        let when = self.session.mounted_at();
        let (kind, perm, nlink) = match attr.kind {
            NodeKind::Directory => (FileType::Directory, 0o555, 2),
            NodeKind::File => (FileType::RegularFile, 0o444, 1),
        };
        FileAttr {
            ino: inode,
            size: attr.size,
            blocks: attr.size.div_ceil(u64::from(MountSession::BLOCK_SIZE)),
            atime: when,
            mtime: when,
            ctime: when,
            crtime: when,
            kind,
            perm,
            nlink,
            uid: 0,
            gid: 0,
            rdev: 0,
            flags: 0,
            blksize: MountSession::BLOCK_SIZE,
        }
    }
}

impl Filesystem for ArchiveFuse {
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some(parent_path) = self.inode_path(parent) else {
            reply.error(libc::ENOENT);
            return;
        };
        let child_path = InodeTable::join(&parent_path, &name.to_string_lossy());
        match self.session.getattr(&child_path) {
            Ok(attr) => {
                let inode = self.inodes().get_or_create(&child_path);
                reply.entry(&TTL, &self.attr_for(inode, attr), 0);
            }
            Err(err) => reply.error(errno(&err)),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, inode: u64, _fh: Option<u64>, reply: ReplyAttr) {
        let Some(path) = self.inode_path(inode) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.session.getattr(&path) {
            Ok(attr) => reply.attr(&TTL, &self.attr_for(inode, attr)),
            Err(err) => reply.error(errno(&err)),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        inode: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let Some(path) = self.inode_path(inode) else {
            reply.error(libc::ENOENT);
            return;
        };
        let children = match self.session.readdir(&path) {
            Ok(children) => children,
            Err(err) => {
                reply.error(errno(&err));
                return;
            }
        };

        let mut listing = Vec::with_capacity(children.len() + 2);
        listing.push((inode, FileType::Directory, ".".to_owned()));
        let parent_inode = self.inodes().get_or_create(InodeTable::parent(&path));
        listing.push((parent_inode, FileType::Directory, "..".to_owned()));
        for child in children {
            let child_path = InodeTable::join(&path, &child.name);
            let child_inode = self.inodes().get_or_create(&child_path);
            let file_type = match child.kind {
                NodeKind::Directory => FileType::Directory,
                NodeKind::File => FileType::RegularFile,
            };
            listing.push((child_inode, file_type, child.name));
        }

        let start = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
        for (idx, (child_inode, file_type, name)) in listing.into_iter().enumerate().skip(start) {
            if reply.add(child_inode, (idx + 1) as i64, file_type, name) {
                break;
            }
        }
        reply.ok();
    }

    fn open(&mut self, _req: &Request<'_>, inode: u64, flags: i32, reply: ReplyOpen) {
        let Some(path) = self.inode_path(inode) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.session.open(&path, write_requested(flags)) {
            Ok(handle) => reply.opened(handle, 0),
            Err(err) => reply.error(errno(&err)),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        _inode: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        if offset < 0 {
            reply.error(libc::EINVAL);
            return;
        }
        match self.session.read(fh, offset as u64, u64::from(size)) {
            Ok(data) => reply.data(&data),
            Err(err) => reply.error(errno(&err)),
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _inode: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        self.session.release(fh);
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, _inode: u64, reply: ReplyStatfs) {
        let stats = self.session.statfs();
        let blocks = stats.total_bytes.div_ceil(u64::from(stats.block_size));
        reply.statfs(
            blocks,
            0,
            0,
            stats.file_count,
            0,
            stats.block_size,
            255,
            stats.block_size,
        );
    }
}

/// Mounts the session at the given mountpoint and serves filesystem
/// calls until unmounted.
///
/// Blocks the calling thread. The mount is read-only and auto-unmounts
/// when the process exits.
pub fn mount<P: AsRef<Path>>(session: MountSession, mountpoint: P, allow_other: bool) -> Result<()> {
    let mountpoint = mountpoint.as_ref();
    let mut options = vec![
        MountOption::RO,
        MountOption::FSName("ufdrfs".to_owned()),
        MountOption::AutoUnmount,
    ];
    if allow_other {
        options.push(MountOption::AllowOther);
    }
    debug!(mountpoint = %mountpoint.display(), "starting FUSE loop");
    fuser::mount2(ArchiveFuse::new(Arc::new(session)), mountpoint, &options)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_mapping() {
        assert_eq!(errno(&FsError::NotFound), libc::ENOENT);
        assert_eq!(errno(&FsError::NotADirectory), libc::ENOTDIR);
        assert_eq!(errno(&FsError::IsADirectory), libc::EISDIR);
        assert_eq!(errno(&FsError::ReadOnly), libc::EROFS);
        assert_eq!(errno(&FsError::InvalidHandle { handle: 3 }), libc::EBADF);
        assert_eq!(errno(&FsError::Decode("bad".into())), libc::EIO);
    }

    #[test]
    fn test_write_requested() {
        assert!(!write_requested(libc::O_RDONLY));
        assert!(write_requested(libc::O_WRONLY));
        assert!(write_requested(libc::O_RDWR));
        assert!(write_requested(libc::O_RDONLY | libc::O_TRUNC));
        assert!(write_requested(libc::O_RDONLY | libc::O_APPEND));
        assert!(write_requested(libc::O_RDONLY | libc::O_CREAT));
    }
}
