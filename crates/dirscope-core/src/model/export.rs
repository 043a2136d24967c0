/// JSON export of an aggregated tree.
///
/// The exported shape is a nested object per node:
///
/// ```json
/// {"id":"src","isolatedSize":120,"totalSize":4096,"children":[ ... ]}
/// ```
///
/// Children are emitted in the tree's current order, so sort before
/// exporting if a size-ordered document is wanted. Nesting depth is only
/// bounded by the tree: writing walks an explicit stack, reading lifts
/// serde_json's recursion limit and grows the stack on demand, and dropping
/// an `ExportNode` unlinks its descendants iteratively.
use super::node::NodeIndex;
use super::path_tree::PathTree;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::io::{self, Read, Write};

/// One exported node and its (possibly truncated) children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportNode {
    pub id: String,
    pub isolated_size: u64,
    pub total_size: u64,
    pub children: Vec<ExportNode>,
}

impl ExportNode {
    /// Snapshot the subtree under `start`, keeping at most `max_depth` levels
    /// below it (`None` = unlimited). Nodes at the cutoff get empty children.
    pub fn from_tree(tree: &PathTree, start: NodeIndex, max_depth: Option<usize>) -> Self {
        let layers = tree.generations_from(start, max_depth);
        let mut built: HashMap<NodeIndex, ExportNode> = HashMap::new();

        for layer in layers.iter().rev() {
            for &idx in layer {
                let node = tree.node(idx);
                let children = node
                    .children
                    .iter()
                    .filter_map(|child| built.remove(child))
                    .collect();
                built.insert(
                    idx,
                    ExportNode {
                        id: node.id.to_string(),
                        isolated_size: node.isolated_size,
                        total_size: node.total_size,
                        children,
                    },
                );
            }
        }

        built.remove(&start).unwrap_or_else(|| ExportNode {
            id: tree.node(start).id.to_string(),
            isolated_size: tree.node(start).isolated_size,
            total_size: tree.node(start).total_size,
            children: Vec::new(),
        })
    }
}

impl Drop for ExportNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Pending output while streaming the tree.
enum Step {
    Open { index: NodeIndex, depth: usize },
    Separator,
    Close,
}

/// Stream the tree as compact JSON, at most `max_depth` levels below the
/// root (`None` = unlimited).
pub fn write_json<W: Write>(
    tree: &PathTree,
    max_depth: Option<usize>,
    mut writer: W,
) -> io::Result<()> {
    let mut stack = vec![Step::Open {
        index: tree.root(),
        depth: 0,
    }];
    while let Some(step) = stack.pop() {
        match step {
            Step::Open { index, depth } => {
                let node = tree.node(index);
                writer.write_all(b"{\"id\":")?;
                serde_json::to_writer(&mut writer, node.id.as_str())?;
                write!(
                    writer,
                    ",\"isolatedSize\":{},\"totalSize\":{},\"children\":[",
                    node.isolated_size, node.total_size
                )?;
                stack.push(Step::Close);
                if max_depth.map_or(true, |max| depth < max) {
                    for (i, &child) in node.children.iter().enumerate().rev() {
                        stack.push(Step::Open {
                            index: child,
                            depth: depth + 1,
                        });
                        if i > 0 {
                            stack.push(Step::Separator);
                        }
                    }
                }
            }
            Step::Separator => writer.write_all(b",")?,
            Step::Close => writer.write_all(b"]}")?,
        }
    }
    Ok(())
}

/// Render the tree as a compact JSON string.
pub fn to_json_string(tree: &PathTree, max_depth: Option<usize>) -> io::Result<String> {
    let mut buf = Vec::new();
    write_json(tree, max_depth, &mut buf)?;
    String::from_utf8(buf).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

/// Parse an export of any depth.
pub fn read_json<R: Read>(reader: R) -> serde_json::Result<ExportNode> {
    let mut deserializer = serde_json::Deserializer::from_reader(reader);
    deserializer.disable_recursion_limit();
    let export = ExportNode::deserialize(serde_stacker::Deserializer::new(&mut deserializer))?;
    deserializer.end()?;
    Ok(export)
}

impl PathTree {
    /// Rebuild a tree from an export. Every node is treated as probed and
    /// keeps its exported total. Siblings are kept apart even when their
    /// exported ids coincide.
    pub fn from_export(export: &ExportNode) -> PathTree {
        let mut tree = PathTree::new(export.id.as_str());
        let root = tree.root();
        copy_sizes(&mut tree, root, export);

        let mut stack: Vec<(NodeIndex, &ExportNode)> = export
            .children
            .iter()
            .rev()
            .map(|child| (root, child))
            .collect();
        while let Some((parent, current)) = stack.pop() {
            let idx = tree.push_child(parent, OsStr::new(&current.id));
            copy_sizes(&mut tree, idx, current);
            stack.extend(current.children.iter().rev().map(|child| (idx, child)));
        }
        tree
    }
}

fn copy_sizes(tree: &mut PathTree, idx: NodeIndex, export: &ExportNode) {
    tree.set_isolated_size(idx, export.isolated_size);
    tree.node_mut(idx).total_size = export.total_size;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PathTree {
        let mut tree = PathTree::new("root");
        tree.insert_path("", 1);
        tree.insert_path("a", 2);
        tree.insert_path("a/b", 10);
        tree.insert_path("a/c/d", 20);
        tree.insert_path("e", 5);
        tree.aggregate_sizes();
        tree.sort_all();
        tree
    }

    fn assert_same(original: &PathTree, a: NodeIndex, rebuilt: &PathTree, b: NodeIndex) {
        let mut stack = vec![(a, b)];
        while let Some((x, y)) = stack.pop() {
            let (nx, ny) = (original.node(x), rebuilt.node(y));
            assert_eq!(nx.id, ny.id);
            assert_eq!(nx.isolated_size, ny.isolated_size);
            assert_eq!(nx.total_size, ny.total_size);
            assert_eq!(nx.children.len(), ny.children.len());
            for &child in &nx.children {
                let id = original.node(child).name();
                let twin = rebuilt.child(y, id).expect("child missing after round trip");
                stack.push((child, twin));
            }
        }
    }

    #[test]
    fn json_uses_camel_case_fields() {
        let json = to_json_string(&sample(), None).unwrap();
        assert!(json.contains("\"isolatedSize\""));
        assert!(json.contains("\"totalSize\""));
        assert!(json.contains("\"children\""));
    }

    #[test]
    fn round_trip_at_unlimited_depth() {
        let tree = sample();
        let json = to_json_string(&tree, None).unwrap();
        let parsed = read_json(json.as_bytes()).unwrap();
        let rebuilt = PathTree::from_export(&parsed);
        assert_eq!(rebuilt.node_count(), tree.node_count());
        assert_same(&tree, tree.root(), &rebuilt, rebuilt.root());
    }

    fn chain(depth: usize) -> PathTree {
        let segments: Vec<String> = (0..depth).map(|i| format!("d{i}")).collect();
        let mut tree = PathTree::new("root");
        let root = tree.root();
        tree.insert_segments(root, &segments, 5);
        tree.aggregate_sizes();
        tree
    }

    #[test]
    fn deep_chain_round_trips() {
        let tree = chain(300);
        let json = to_json_string(&tree, None).unwrap();
        let parsed = read_json(json.as_bytes()).unwrap();
        let rebuilt = PathTree::from_export(&parsed);
        assert_eq!(rebuilt.node_count(), 301);
        assert_same(&tree, tree.root(), &rebuilt, rebuilt.root());
    }

    #[test]
    fn very_deep_chain_exports_without_overflow() {
        let tree = chain(10_000);
        let json = to_json_string(&tree, None).unwrap();
        assert_eq!(json.matches("\"totalSize\":5").count(), 10_001);

        let from_tree = ExportNode::from_tree(&tree, tree.root(), None);
        drop(from_tree);

        let parsed = read_json(json.as_bytes()).unwrap();
        let rebuilt = PathTree::from_export(&parsed);
        assert_eq!(rebuilt.height(), 10_000);
    }

    #[test]
    fn write_json_matches_serde_shape() {
        let tree = sample();
        let streamed: serde_json::Value =
            serde_json::from_str(&to_json_string(&tree, None).unwrap()).unwrap();
        let derived = serde_json::to_value(ExportNode::from_tree(&tree, tree.root(), None)).unwrap();
        assert_eq!(streamed, derived);
    }

    #[test]
    fn duplicate_ids_survive_import() {
        let leaf = |id: &str, size| ExportNode {
            id: id.to_string(),
            isolated_size: size,
            total_size: size,
            children: Vec::new(),
        };
        let export = ExportNode {
            id: "root".into(),
            isolated_size: 0,
            total_size: 30,
            children: vec![leaf("a\u{FFFD}", 10), leaf("a\u{FFFD}", 20)],
        };
        let tree = PathTree::from_export(&export);
        let sizes: Vec<u64> = tree
            .children(tree.root())
            .iter()
            .map(|&c| tree.node(c).total_size)
            .collect();
        assert_eq!(sizes, vec![10, 20]);
    }

    #[test]
    fn depth_cutoff_empties_children() {
        let tree = sample();
        let export = ExportNode::from_tree(&tree, tree.root(), Some(1));
        assert_eq!(export.children.len(), 2);
        assert!(export.children.iter().all(|c| c.children.is_empty()));
        // Totals still reflect the full subtree.
        assert_eq!(export.total_size, 38);
    }

    #[test]
    fn depth_zero_exports_only_the_start_node() {
        let tree = sample();
        let export = ExportNode::from_tree(&tree, tree.root(), Some(0));
        assert_eq!(export.id, "root");
        assert!(export.children.is_empty());
    }

    #[test]
    fn children_follow_tree_order() {
        let tree = sample();
        let export = ExportNode::from_tree(&tree, tree.root(), None);
        let ids: Vec<_> = export.children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "e"]);
    }

    #[test]
    fn write_json_writes_to_any_writer() {
        let mut buf = Vec::new();
        write_json(&sample(), Some(1), &mut buf).unwrap();
        let parsed = read_json(buf.as_slice()).unwrap();
        assert_eq!(parsed.id, "root");
    }
}
