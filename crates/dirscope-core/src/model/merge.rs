/// Conflict-free merging of independently built trees ("safe add").
///
/// Fragments produced by concurrent batches share path prefixes. Merging
/// deduplicates them segment by segment: an id already present under the
/// target is never replaced, the incoming node's children are folded into
/// the existing one instead. Everything here is iterative so merge depth is
/// not bounded by the thread stack.
use super::node::{Node, NodeIndex};
use super::path_tree::PathTree;
use crate::error::ScanError;
use tracing::debug;

impl PathTree {
    /// Fold a set of fragments into a fresh tree whose root is `root_id`.
    ///
    /// Each fragment's root is treated as the scan root itself. The result is
    /// the same for any fragment order unless two fragments carry different
    /// probed sizes for the same path, which is reported as
    /// [`ScanError::MergeConflict`].
    pub fn merge_fragments<I>(root_id: &str, fragments: I) -> Result<PathTree, ScanError>
    where
        I: IntoIterator<Item = PathTree>,
    {
        let fragments = fragments.into_iter();
        let mut tree = PathTree::with_capacity(root_id, fragments.size_hint().0 + 1);
        let root = tree.root();
        let mut merged = 0usize;
        for fragment in fragments {
            tree.absorb(root, &fragment, fragment.root())?;
            merged += 1;
        }
        debug!("Merged {merged} fragments into {} nodes", tree.node_count());
        Ok(tree)
    }

    /// Merge the subtree of `other` rooted at `from` as a child of `parent`.
    ///
    /// If `parent` already has a child with the same name, that child keeps its
    /// identity and the incoming children are merged into it; otherwise the
    /// whole incoming subtree is attached as a new child.
    pub fn safe_add(
        &mut self,
        parent: NodeIndex,
        other: &PathTree,
        from: NodeIndex,
    ) -> Result<(), ScanError> {
        match self.child(parent, other.node(from).name()) {
            Some(existing) => self.absorb(existing, other, from),
            None => {
                self.graft(parent, other, from);
                Ok(())
            }
        }
    }

    /// Treat `other[from]` and `self[into]` as the same directory: reconcile
    /// their sizes, then safe-add every incoming child.
    pub fn absorb(
        &mut self,
        into: NodeIndex,
        other: &PathTree,
        from: NodeIndex,
    ) -> Result<(), ScanError> {
        let mut stack = vec![(into, from)];
        while let Some((target, source)) = stack.pop() {
            self.reconcile(target, other.node(source))?;
            for &child in other.children(source) {
                match self.child(target, other.node(child).name()) {
                    Some(existing) => stack.push((existing, child)),
                    None => self.graft(target, other, child),
                }
            }
        }
        Ok(())
    }

    /// Adopt the incoming probed size if ours is only an intermediate default.
    fn reconcile(&mut self, target: NodeIndex, incoming: &Node) -> Result<(), ScanError> {
        if !incoming.probed {
            return Ok(());
        }
        let existing = self.node(target);
        if !existing.probed {
            self.set_isolated_size(target, incoming.isolated_size);
            return Ok(());
        }
        if existing.isolated_size != incoming.isolated_size {
            return Err(ScanError::MergeConflict {
                path: self.full_path(target),
                existing: existing.isolated_size,
                incoming: incoming.isolated_size,
            });
        }
        Ok(())
    }

    /// Copy the subtree `other[from]` under `parent`, where no child with the
    /// same id exists yet.
    fn graft(&mut self, parent: NodeIndex, other: &PathTree, from: NodeIndex) {
        let mut stack = vec![(parent, from)];
        while let Some((target_parent, source)) = stack.pop() {
            let src = other.node(source);
            let idx = self.child_or_insert(target_parent, src.name());
            let node = self.node_mut(idx);
            node.isolated_size = src.isolated_size;
            node.total_size = src.total_size;
            node.probed = src.probed;
            for &child in src.children.iter().rev() {
                stack.push((idx, child));
            }
        }
    }
}
