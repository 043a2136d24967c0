/// Error types for the scanning engine.
///
/// Per-path filesystem failures are classified into [`FsFailure`] and are
/// almost always absorbed by the scanner (skip, log, continue). Only the
/// failures that invalidate a whole run surface as [`ScanError`].
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can make a scan (or its persistence) fail outright.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Two fragments reported different probed sizes for the same path.
    #[error("conflicting sizes for {path}: existing {existing} bytes, incoming {incoming} bytes")]
    MergeConflict {
        path: PathBuf,
        existing: u64,
        incoming: u64,
    },

    /// The worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Reading or writing the persisted exclusion list failed.
    #[error("exclusion list {path}: {source}")]
    ExclusionStore {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A caller-supplied setting is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The background scan thread could not be started.
    #[error("failed to spawn scan thread: {0}")]
    SpawnThread(#[source] io::Error),

    /// The scan thread exited without producing a result.
    #[error("scan thread terminated unexpectedly")]
    ScanThreadPanicked,
}

/// Classification of a single filesystem failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsFailure {
    /// Permission denied. Enumeration excludes the path from future descent.
    AccessDenied,
    /// The path vanished between discovery and access.
    NotFound,
    /// Anything else. Logged and skipped.
    Other,
}

impl FsFailure {
    pub fn classify(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => Self::AccessDenied,
            io::ErrorKind::NotFound => Self::NotFound,
            _ => Self::Other,
        }
    }
}
