/// Scan progress reporting: lightweight messages sent from the scan
/// thread and its workers to the frontend via a crossbeam channel.
use std::time::Duration;

/// The two phases of a scan, each closed by a join barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    /// Enumerating directories under the depth bound.
    Discovery,
    /// Probing isolated sizes in batches.
    Sizing,
    /// Merging fragments and aggregating totals.
    Aggregation,
}

/// Progress updates sent from the scan to the frontend.
///
/// The tree itself is returned through [`ScanHandle::join`](super::ScanHandle::join);
/// these messages carry only counters and status.
#[derive(Debug, Clone)]
pub enum ScanProgress {
    /// A phase has begun.
    PhaseStarted(ScanPhase),
    /// Discovery finished with this many directories to probe.
    Discovered { directories: usize, excluded: usize },
    /// One sizing batch finished.
    BatchComplete {
        batches_done: usize,
        batches_total: usize,
    },
    /// A non-fatal error (e.g. permission denied on one directory).
    Error { path: String, message: String },
    /// Scanning completed; the aggregated tree is ready.
    Complete {
        duration: Duration,
        directories: usize,
        total_size: u64,
        error_count: u64,
    },
}
