//! Inode ↔ path mapping for the FUSE driver.
//!
//! FUSE identifies files by 64-bit inode numbers while the mount
//! session is purely path-addressed. The table hands out stable inode
//! numbers on first sight of a path; the tree is immutable for the
//! mount's lifetime, so mappings are never invalidated.

use std::collections::HashMap;

/// Bidirectional mapping between inode numbers and absolute paths.
#[derive(Debug)]
pub struct InodeTable {
    path_to_inode: HashMap<String, u64>,
    inode_to_path: HashMap<u64, String>,
    next_inode: u64,
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InodeTable {
    /// Root inode number (always 1 in FUSE).
    pub const ROOT_INODE: u64 = 1;

    /// Creates a new table with the root path pre-registered.
    #[must_use]
    pub fn new() -> Self {
        let mut table = Self {
            path_to_inode: HashMap::new(),
            inode_to_path: HashMap::new(),
            next_inode: Self::ROOT_INODE + 1,
        };
        table.path_to_inode.insert("/".to_owned(), Self::ROOT_INODE);
        table.inode_to_path.insert(Self::ROOT_INODE, "/".to_owned());
        table
    }

    /// Returns the inode for a path, allocating one on first sight.
    pub fn get_or_create(&mut self, path: &str) -> u64 {
        let normalized = Self::normalize(path);
        if let Some(&inode) = self.path_to_inode.get(&normalized) {
            return inode;
        }
        let inode = self.next_inode;
        self.next_inode += 1;
        self.path_to_inode.insert(normalized.clone(), inode);
        self.inode_to_path.insert(inode, normalized);
        inode
    }

    /// Returns the path registered for an inode, if any.
    #[must_use]
    pub fn path(&self, inode: u64) -> Option<&str> {
        self.inode_to_path.get(&inode).map(String::as_str)
    }

    /// Normalizes a path to leading-slash, no-trailing-slash form.
    fn normalize(path: &str) -> String {
        let path = path.trim();
        if path.is_empty() || path == "/" {
            return "/".to_owned();
        }
        let mut normalized = if path.starts_with('/') {
            path.to_owned()
        } else {
            format!("/{path}")
        };
        while normalized.len() > 1 && normalized.ends_with('/') {
            normalized.pop();
        }
        normalized
    }

    /// Joins a child name onto a normalized parent path.
    #[must_use]
    pub fn join(parent: &str, name: &str) -> String {
        if parent == "/" {
            format!("/{name}")
        } else {
            format!("{parent}/{name}")
        }
    }

    /// Returns the parent of a normalized path (`/` is its own parent).
    #[must_use]
    pub fn parent(path: &str) -> &str {
        match path.rfind('/') {
            Some(0) | None => "/",
            Some(pos) => &path[..pos],
        }
    }
}
