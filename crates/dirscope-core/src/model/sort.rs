/// Ordering of children by total size.
use super::node::NodeIndex;
use super::path_tree::PathTree;
use std::cmp::Ordering;

impl PathTree {
    /// Reorder children by `total_size`, largest first, from `start` down to
    /// `depth` levels below it.
    ///
    /// `depth == 0` sorts only the immediate children of `start`. Deeper
    /// levels are sorted before shallower ones. Equal totals fall back to
    /// ascending id so the order is deterministic. Only meaningful after
    /// [`aggregate_sizes`](PathTree::aggregate_sizes).
    pub fn sort_by_size(&mut self, start: NodeIndex, depth: usize) {
        let layers = self.generations_from(start, Some(depth));
        for layer in layers.iter().rev() {
            for &idx in layer {
                self.sort_children(idx);
            }
        }
    }

    /// Sort every level of the tree.
    pub fn sort_all(&mut self) {
        let height = self.height();
        self.sort_by_size(self.root(), height);
    }

    fn sort_children(&mut self, parent: NodeIndex) {
        let mut children = std::mem::take(&mut self.node_mut(parent).children);
        children.sort_by(|&a, &b| self.compare_by_size(a, b));
        self.node_mut(parent).children = children;
    }

    fn compare_by_size(&self, a: NodeIndex, b: NodeIndex) -> Ordering {
        let (a, b) = (self.node(a), self.node(b));
        b.total_size
            .cmp(&a.total_size)
            .then_with(|| a.id.cmp(&b.id))
            .then_with(|| a.name().cmp(b.name()))
    }
}
