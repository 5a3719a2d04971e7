//! Flat-to-hierarchical reconciliation of archive entry paths.
//!
//! Archives list entries as a flat set of slash-separated paths, often
//! without explicit records for intermediate directories. The builder
//! materializes a proper tree: every path segment becomes a node, parents
//! are synthesized on demand, and conflicting claims about a path's kind
//! are resolved deterministically (first claim wins).

use std::collections::BTreeMap;

use tracing::warn;

use crate::archive::{EntryRecord, EntrySource};

/// Kind of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Directory; may have children, size is always 0.
    Directory,
    /// Regular file backed by an archive entry; never has children.
    File,
}

/// One node of the in-memory directory tree.
///
/// Built once per mount and immutable thereafter. The root is a
/// synthetic directory with an empty name, present even for an empty
/// archive.
#[derive(Debug)]
pub struct TreeNode {
    name: String,
    kind: NodeKind,
    size: u64,
    source: Option<EntrySource>,
    children: BTreeMap<String, TreeNode>,
}

impl TreeNode {
    fn directory(name: String) -> Self {
        Self {
            name,
            kind: NodeKind::Directory,
            size: 0,
            source: None,
            children: BTreeMap::new(),
        }
    }

    fn file(name: String, size: u64, source: EntrySource) -> Self {
        Self {
            name,
            kind: NodeKind::File,
            size,
            source: Some(source),
            children: BTreeMap::new(),
        }
    }

    /// The path segment owned by this node (empty for the root).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this node is a directory or a file.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Uncompressed byte length; 0 for directories.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The archive entry backing a file node; `None` for directories.
    #[must_use]
    pub fn source(&self) -> Option<EntrySource> {
        self.source
    }

    /// Looks up an immediate child by name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&TreeNode> {
        self.children.get(name)
    }

    /// Iterates this node's immediate children in name order.
    pub fn children(&self) -> impl Iterator<Item = &TreeNode> {
        self.children.values()
    }

    /// Resolves an absolute slash-separated path against this node.
    ///
    /// Walks segment by segment from `self`; empty and `.` segments are
    /// ignored. Returns `None` the moment a segment is missing, a
    /// non-terminal segment resolves to a file, or a `..` segment is
    /// encountered.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<&TreeNode> {
        let mut node = self;
        for segment in path.split('/') {
            if segment.is_empty() || segment == "." {
                continue;
            }
            if segment == ".." {
                return None;
            }
            node = node.children.get(segment)?;
        }
        Some(node)
    }
}

/// Builds the directory tree from the archive's flat entry list.
///
/// Entries with malformed paths (no usable segments, or containing a
/// `..` segment) are skipped with a warning and never corrupt sibling
/// entries. Conflicting kind claims for the same path keep the first
/// claim; later conflicting entries are dropped with a warning.
#[must_use]
pub fn build_tree(entries: &[EntryRecord]) -> TreeNode {
    let mut root = TreeNode::directory(String::new());
    for entry in entries {
        insert(&mut root, entry);
    }
    root
}

fn insert(root: &mut TreeNode, entry: &EntryRecord) {
    let segments: Vec<&str> = entry
        .path
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();

    if segments.is_empty() {
        warn!(path = %entry.path, "skipping entry with no usable path segments");
        return;
    }
    if segments.contains(&"..") {
        warn!(path = %entry.path, "skipping entry with parent-directory segment");
        return;
    }

    let mut node = root;
    for segment in &segments[..segments.len() - 1] {
        let existing = node
            .children
            .entry((*segment).to_owned())
            .or_insert_with(|| TreeNode::directory((*segment).to_owned()));
        if existing.kind == NodeKind::File {
            warn!(
                path = %entry.path,
                segment,
                "skipping entry whose parent path is already a file"
            );
            return;
        }
        node = existing;
    }

    let name = segments[segments.len() - 1];
    match node.children.get(name) {
        None => {
            let child = if entry.is_dir {
                TreeNode::directory(name.to_owned())
            } else {
                TreeNode::file(name.to_owned(), entry.size, entry.source)
            };
            node.children.insert(name.to_owned(), child);
        }
        // Explicit directory entry for an already-synthesized directory.
        Some(existing) if existing.kind == NodeKind::Directory && entry.is_dir => {}
        Some(_) => {
            warn!(path = %entry.path, "dropping conflicting claim for existing path");
        }
    }
}
