/// Data model for the dirscope directory tree.
///
/// The arena-backed [`PathTree`] is extended by one module per phase:
/// insertion and lookup, safe merging, aggregation, sorting, and export.
pub mod aggregate;
pub mod export;
pub mod merge;
pub mod node;
pub mod path_tree;
pub mod size;
pub mod sort;

pub use export::ExportNode;
pub use node::{Node, NodeIndex};
pub use path_tree::PathTree;
