/// Arena-backed directory tree keyed by path segment.
///
/// All nodes live in a single `Vec<Node>`. Children are owned index lists on
/// each node; a tree-level `(parent, name) -> child` map keeps child lookup
/// O(1) even for very wide directories. The map is keyed on the exact
/// `OsStr` segment, so names that only differ in non-UTF-8 bytes stay apart.
///
/// Merging, aggregation, sorting, and export live in sibling modules as
/// further `impl PathTree` blocks.
use super::node::{Node, NodeIndex};
use compact_str::CompactString;
use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::path::{Component, Path, PathBuf};

/// A rooted tree of directories with isolated and total sizes.
#[derive(Debug, Clone)]
pub struct PathTree {
    nodes: Vec<Node>,
    root: NodeIndex,
    lookup: HashMap<(NodeIndex, OsString), NodeIndex>,
}

impl PathTree {
    /// Create a tree holding only a root node with the given id.
    pub fn new(root_id: impl Into<CompactString>) -> Self {
        Self::with_capacity(root_id, 1)
    }

    /// Create a tree with pre-allocated room for `estimated_nodes` nodes.
    pub fn with_capacity(root_id: impl Into<CompactString>, estimated_nodes: usize) -> Self {
        let mut nodes = Vec::with_capacity(estimated_nodes.max(1));
        nodes.push(Node::new(root_id.into(), None));
        Self {
            nodes,
            root: NodeIndex(0),
            lookup: HashMap::with_capacity(estimated_nodes),
        }
    }

    /// Build a single-branch fragment for one `(path, size)` observation.
    ///
    /// The fragment's root is an anonymous sentinel standing in for the scan
    /// root; only the final segment carries `size`. An empty segment list
    /// puts the size on the sentinel itself.
    pub fn fragment<I, S>(segments: I, size: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut tree = Self::new("");
        let root = tree.root;
        tree.insert_segments(root, segments, size);
        tree
    }

    #[inline]
    pub fn root(&self) -> NodeIndex {
        self.root
    }

    #[inline]
    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.nodes[index.idx()]
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, index: NodeIndex) -> &mut Node {
        &mut self.nodes[index.idx()]
    }

    /// All nodes in arena order (parents before their children).
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Total number of nodes, root included.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Children of `parent` in their current order.
    #[inline]
    pub fn children(&self, parent: NodeIndex) -> &[NodeIndex] {
        &self.nodes[parent.idx()].children
    }

    /// Look up the child of `parent` whose segment is exactly `name`.
    pub fn child(&self, parent: NodeIndex, name: impl AsRef<OsStr>) -> Option<NodeIndex> {
        self.lookup
            .get(&(parent, name.as_ref().to_os_string()))
            .copied()
    }

    /// Return the child of `parent` named `name`, creating an unprobed one if absent.
    pub fn child_or_insert(&mut self, parent: NodeIndex, name: impl AsRef<OsStr>) -> NodeIndex {
        let name = name.as_ref();
        match self.child(parent, name) {
            Some(existing) => existing,
            None => self.push_child(parent, name),
        }
    }

    /// Append a new child without checking for an existing sibling of the
    /// same name. Lookup keeps resolving to the first such sibling.
    pub(crate) fn push_child(&mut self, parent: NodeIndex, name: &OsStr) -> NodeIndex {
        let idx = NodeIndex::new(self.nodes.len());
        self.nodes.push(Node::from_name(name, Some(parent)));
        self.nodes[parent.idx()].children.push(idx);
        self.lookup
            .entry((parent, name.to_os_string()))
            .or_insert(idx);
        idx
    }

    /// Record a probed isolated size for `index`, overwriting any prior value.
    pub fn set_isolated_size(&mut self, index: NodeIndex, size: u64) {
        let node = &mut self.nodes[index.idx()];
        node.isolated_size = size;
        node.probed = true;
    }

    /// Walk (creating as needed) from `start` down `segments` and set the
    /// isolated size of the final node. Returns that node.
    pub fn insert_segments<I, S>(&mut self, start: NodeIndex, segments: I, size: u64) -> NodeIndex
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut current = start;
        for segment in segments {
            current = self.child_or_insert(current, segment);
        }
        self.set_isolated_size(current, size);
        current
    }

    /// Insert a separator-delimited path below the root.
    ///
    /// Empty segments (leading, trailing, or doubled separators) are ignored,
    /// so `""` addresses the root itself.
    pub fn insert_path(&mut self, path: &str, size: u64) -> NodeIndex {
        let segments = path
            .split(std::path::is_separator)
            .filter(|s| !s.is_empty());
        self.insert_segments(self.root, segments, size)
    }

    /// Reconstruct the full path of a node by walking up to the root.
    pub fn full_path(&self, index: NodeIndex) -> PathBuf {
        let mut segments = Vec::new();
        let mut current = Some(index);
        while let Some(idx) = current {
            segments.push(self.nodes[idx.idx()].name());
            current = self.nodes[idx.idx()].parent;
        }
        segments.iter().rev().filter(|s| !s.is_empty()).collect()
    }

    /// Nodes without children ("ends").
    pub fn leaves(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_leaf())
            .map(|(i, _)| NodeIndex::new(i))
    }

    /// Breadth-first layering of the subtree under `start`.
    ///
    /// Generation 0 is `[start]`; generation k+1 holds the children of every
    /// node in generation k. Stops at the first empty generation or after
    /// `max_depth` further layers, whichever comes first.
    pub fn generations_from(&self, start: NodeIndex, max_depth: Option<usize>) -> Vec<Vec<NodeIndex>> {
        let mut generations = vec![vec![start]];
        loop {
            if max_depth.is_some_and(|max| generations.len() > max) {
                break;
            }
            let next: Vec<NodeIndex> = generations[generations.len() - 1]
                .iter()
                .flat_map(|&idx| self.nodes[idx.idx()].children.iter().copied())
                .collect();
            if next.is_empty() {
                break;
            }
            generations.push(next);
        }
        generations
    }

    /// Breadth-first layering of the whole tree.
    pub fn generations(&self) -> Vec<Vec<NodeIndex>> {
        self.generations_from(self.root, None)
    }

    /// Number of generations below the root (a lone root has height 0).
    pub fn height(&self) -> usize {
        self.generations().len() - 1
    }
}

/// Split a relative filesystem path into the segments used as node names.
///
/// Only normal components count; `.` and prefix/root markers are dropped.
pub fn path_segments(relative: &Path) -> impl Iterator<Item = &OsStr> + '_ {
    relative.components().filter_map(|component| match component {
        Component::Normal(name) => Some(name),
        _ => None,
    })
}
