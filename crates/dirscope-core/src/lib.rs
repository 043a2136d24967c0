/// dirscope core: scanning, merging, aggregation, and the data model.
///
/// This crate contains all business logic with zero UI dependencies.
/// The CLI in `dirscope-cli` is one frontend; nothing here prints.
///
/// # Modules
///
/// - [`model`]: arena-allocated path tree with merge, aggregation, sorting, and export.
/// - [`scanner`]: parallel discovery and size probing, the exclusion set, progress reporting.
/// - [`error`]: error types shared by both.
pub mod error;
pub mod model;
pub mod scanner;

pub use error::{FsFailure, ScanError};
pub use model::{ExportNode, Node, NodeIndex, PathTree};
pub use scanner::exclusion::ExclusionSet;
pub use scanner::{scan, start_scan, ScanConfig, ScanHandle, ScanOutcome};
