/// Bottom-up total-size aggregation.
///
/// The tree is layered into breadth-first generations and processed from the
/// deepest generation up. Every child lives in a strictly deeper generation
/// than its parent, so by the time a node is visited all of its children
/// already hold final totals. O(n) time, no recursion, no stack growth with
/// directory depth.
use super::node::NodeIndex;
use super::path_tree::PathTree;
use std::collections::HashSet;

impl PathTree {
    /// Compute `total_size` for every node.
    ///
    /// Safe to call repeatedly; totals are recomputed from isolated sizes
    /// each time, never accumulated on top of a previous pass.
    pub fn aggregate_sizes(&mut self) {
        let ends: HashSet<NodeIndex> = self.leaves().collect();
        let generations = self.generations();

        for generation in generations.iter().rev() {
            for &idx in generation {
                let total = if ends.contains(&idx) {
                    self.node(idx).isolated_size
                } else {
                    self.children(idx)
                        .iter()
                        .fold(self.node(idx).isolated_size, |acc, &child| {
                            acc.saturating_add(self.node(child).total_size)
                        })
                };
                self.node_mut(idx).total_size = total;
            }
        }
    }

    /// Check the aggregation invariant at every node.
    ///
    /// Returns the first node whose total disagrees with its isolated size
    /// plus the totals of its children.
    pub fn find_aggregation_violation(&self) -> Option<NodeIndex> {
        self.nodes().iter().enumerate().find_map(|(i, node)| {
            let expected = node.children.iter().fold(node.isolated_size, |acc, &child| {
                acc.saturating_add(self.node(child).total_size)
            });
            (node.total_size != expected).then(|| NodeIndex::new(i))
        })
    }
}
