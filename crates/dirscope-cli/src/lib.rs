//! dirscope CLI: argument handling, tree rendering, and the run lifecycle.
//!
//! All scanning logic lives in `dirscope-core`; this crate only turns
//! arguments into a [`dirscope_core::ScanConfig`] and prints the result.

pub mod app;
pub mod args;
pub mod render;

pub use app::{run, App};
pub use args::{Args, ColorMode};
