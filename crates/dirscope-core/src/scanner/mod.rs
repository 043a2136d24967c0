/// Scanner module: orchestrates a full scan.
///
/// A scan runs in two parallel phases on one bounded rayon pool, each closed
/// by a join barrier:
///
/// 1. **Discovery** ([`catalog`]): enumerate directories up to the depth bound.
/// 2. **Sizing** ([`chunked`]): probe isolated sizes in fixed-size batches,
///    producing one single-branch fragment per directory.
///
/// The fragments are then merged into one tree and aggregated bottom-up on
/// the scan thread. Progress is reported over a bounded crossbeam channel.
pub mod catalog;
pub mod chunked;
pub mod exclusion;
pub mod probe;
pub mod progress;

use crate::error::ScanError;
use crate::model::PathTree;
use catalog::PathCatalog;
use chunked::{ChunkedSizeComputer, DEFAULT_BATCH_SIZE};
use exclusion::ExclusionSet;
use progress::{ScanPhase, ScanProgress};

use crossbeam_channel::{Receiver, Sender};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

/// Maximum number of progress messages that may queue up in the channel.
///
/// Workers block on `send` once the frontend falls this far behind, which
/// bounds memory instead of queueing every per-directory error.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 4_096;

/// Tunables for one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Levels below the root to discover (>= 1).
    pub depth: usize,
    /// Paths per sizing batch (>= 1).
    pub batch_size: usize,
    /// Worker threads in the scan pool (>= 1).
    pub threads: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            depth: 1,
            batch_size: DEFAULT_BATCH_SIZE,
            threads: num_cpus::get(),
        }
    }
}

impl ScanConfig {
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            ..Self::default()
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn validate(&self) -> Result<(), ScanError> {
        if self.depth == 0 {
            return Err(ScanError::InvalidConfig("depth must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(ScanError::InvalidConfig("batch size must be at least 1".into()));
        }
        if self.threads == 0 {
            return Err(ScanError::InvalidConfig("thread count must be at least 1".into()));
        }
        Ok(())
    }
}

/// The result of a completed scan.
#[derive(Debug)]
pub struct ScanOutcome {
    /// Merged and aggregated tree; the root's id is the scan root path.
    pub tree: PathTree,
    pub duration: Duration,
    /// Directories discovered (and probed).
    pub directories: usize,
    /// Directories skipped or zeroed because of I/O errors.
    pub error_count: u64,
    /// Paths this scan added to the exclusion set.
    pub newly_excluded: usize,
}

/// Run a complete scan on the calling thread.
///
/// Per-path failures are absorbed (see [`catalog`] and [`probe`]); only a
/// bad configuration, a pool that cannot be built, or a merge conflict fail
/// the scan.
pub fn scan(
    root: &Path,
    config: &ScanConfig,
    exclusions: &ExclusionSet,
    progress_tx: &Sender<ScanProgress>,
) -> Result<ScanOutcome, ScanError> {
    config.validate()?;
    let start = Instant::now();
    info!(
        "Scanning {} (depth {}, {} threads, batches of {})",
        root.display(),
        config.depth,
        config.threads,
        config.batch_size
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .thread_name(|i| format!("dirscope-worker-{i}"))
        .build()?;

    let _ = progress_tx.send(ScanProgress::PhaseStarted(ScanPhase::Discovery));
    let catalog = PathCatalog::new(root, config.depth, exclusions, progress_tx).enumerate(&pool);
    let _ = progress_tx.send(ScanProgress::Discovered {
        directories: catalog.paths.len(),
        excluded: catalog.newly_excluded,
    });

    let _ = progress_tx.send(ScanProgress::PhaseStarted(ScanPhase::Sizing));
    let sizing = ChunkedSizeComputer::new(root, config.batch_size, progress_tx)
        .compute(&catalog.paths, &pool);

    let _ = progress_tx.send(ScanProgress::PhaseStarted(ScanPhase::Aggregation));
    let mut tree = PathTree::merge_fragments(&root_display_name(root), sizing.fragments)?;
    tree.aggregate_sizes();

    let duration = start.elapsed();
    let error_count = catalog.error_count + sizing.error_count;
    let total_size = tree.node(tree.root()).total_size;
    info!(
        "Scan complete: {} directories, {} bytes, {} errors in {:?}",
        catalog.paths.len(),
        total_size,
        error_count,
        duration
    );
    let _ = progress_tx.send(ScanProgress::Complete {
        duration,
        directories: catalog.paths.len(),
        total_size,
        error_count,
    });

    Ok(ScanOutcome {
        tree,
        duration,
        directories: catalog.paths.len(),
        error_count,
        newly_excluded: catalog.newly_excluded,
    })
}

/// Handle to a scan running on a background thread.
pub struct ScanHandle {
    /// Progress updates; disconnects once the scan thread has finished.
    pub progress_rx: Receiver<ScanProgress>,
    thread: thread::JoinHandle<Result<ScanOutcome, ScanError>>,
}

impl ScanHandle {
    /// Wait for the scan to finish and take its result.
    pub fn join(self) -> Result<ScanOutcome, ScanError> {
        self.thread
            .join()
            .map_err(|_| ScanError::ScanThreadPanicked)?
    }
}

/// Start a scan on a named background thread.
///
/// Drain `progress_rx` while waiting: workers block once
/// [`PROGRESS_CHANNEL_CAPACITY`] messages are queued.
pub fn start_scan(
    root: PathBuf,
    config: ScanConfig,
    exclusions: ExclusionSet,
) -> Result<ScanHandle, ScanError> {
    let (progress_tx, progress_rx) =
        crossbeam_channel::bounded::<ScanProgress>(PROGRESS_CHANNEL_CAPACITY);

    let thread = thread::Builder::new()
        .name("dirscope-scanner".into())
        .spawn(move || scan(&root, &config, &exclusions, &progress_tx))
        .map_err(ScanError::SpawnThread)?;

    Ok(ScanHandle {
        progress_rx,
        thread,
    })
}

/// Id used for the tree root: the scan root as given, minus trailing separators.
fn root_display_name(path: &Path) -> String {
    let s = path.to_string_lossy();
    let trimmed = s.trim_end_matches(std::path::is_separator);
    if trimmed.is_empty() {
        s.into_owned()
    } else {
        trimmed.to_string()
    }
}
