/// A single directory node in the arena-allocated path tree.
///
/// Nodes are stored in a flat `Vec<Node>`. Parent-child relationships use
/// indices rather than pointers, so the parent back-reference never owns
/// anything and the structure cannot form reference cycles.
use compact_str::CompactString;
use std::ffi::{OsStr, OsString};

/// Lightweight index into the arena `Vec<Node>`.
///
/// `u32` keeps nodes small; four billion directories is beyond any real
/// filesystem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    /// Create a new `NodeIndex` from a `usize`.
    #[inline]
    pub fn new(index: usize) -> Self {
        debug_assert!(index <= u32::MAX as usize, "NodeIndex overflow");
        Self(index as u32)
    }

    /// Return the index as a `usize` for Vec indexing.
    #[inline]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

/// One directory in the tree.
#[derive(Debug, Clone)]
pub struct Node {
    /// Path segment only (NOT the full path), as displayed. Names that are
    /// not valid UTF-8 are shown lossily, so two siblings may share an id.
    pub id: CompactString,

    /// The exact segment when it is not valid UTF-8. Siblings are told
    /// apart by [`Node::name`], never by `id` alone.
    raw_name: Option<OsString>,

    /// Bytes held by files directly inside this directory.
    pub isolated_size: u64,

    /// `isolated_size` plus the totals of all children.
    /// Stale until [`PathTree::aggregate_sizes`](super::PathTree::aggregate_sizes) runs.
    pub total_size: u64,

    /// `true` once `isolated_size` came from a real probe (or an import).
    /// Intermediate segments created on the way to a deeper path stay `false`.
    pub probed: bool,

    /// Enclosing node. `None` for the root.
    pub parent: Option<NodeIndex>,

    /// Owned children, in insertion order until sorted.
    pub children: Vec<NodeIndex>,
}

impl Node {
    /// Create an unprobed node with zero sizes.
    pub fn new(id: CompactString, parent: Option<NodeIndex>) -> Self {
        Self {
            id,
            raw_name: None,
            isolated_size: 0,
            total_size: 0,
            probed: false,
            parent,
            children: Vec::new(),
        }
    }

    /// Create an unprobed node for a filesystem segment.
    pub fn from_name(name: &OsStr, parent: Option<NodeIndex>) -> Self {
        match name.to_str() {
            Some(utf8) => Self::new(CompactString::new(utf8), parent),
            None => Self {
                raw_name: Some(name.to_os_string()),
                ..Self::new(CompactString::new(name.to_string_lossy()), parent)
            },
        }
    }

    /// The exact segment this node stands for.
    pub fn name(&self) -> &OsStr {
        match &self.raw_name {
            Some(raw) => raw,
            None => OsStr::new(self.id.as_str()),
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}
