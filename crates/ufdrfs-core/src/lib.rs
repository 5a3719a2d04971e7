//! Read-only FUSE view over ZIP and UFDR archives without extraction.
//!
//! `ufdrfs-core` indexes the flat entry list of a ZIP archive (or the
//! ZIP payload embedded in a forensic `.ufdr` export) into an in-memory
//! directory tree at mount time, then answers filesystem operations
//! (attribute lookup, directory listing, open/read/release) against that
//! tree, decompressing entry bytes lazily per read.
//!
//! # Examples
//!
//! ```no_run
//! use ufdrfs_core::MountSession;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let session = MountSession::new("export.ufdr")?;
//! for entry in session.readdir("/")? {
//!     println!("{}", entry.name);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod archive;
pub mod error;
#[cfg(feature = "fuse")]
pub mod fuse;
pub mod session;
pub mod test_utils;
pub mod tree;

// Re-export main API types
#[cfg(feature = "fuse")]
pub use fuse::ArchiveFuse;
#[cfg(feature = "fuse")]
pub use fuse::mount;

pub use archive::ArchiveReader;
pub use archive::EntryRecord;
pub use archive::EntrySource;
pub use error::FsError;
pub use error::MountError;
pub use error::Result;
pub use session::DirEntry;
pub use session::EntryAttr;
pub use session::FsStats;
pub use session::MountSession;
pub use tree::NodeKind;
pub use tree::TreeNode;
pub use tree::build_tree;
