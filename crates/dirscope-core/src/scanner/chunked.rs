/// Batched, parallel size probing.
///
/// The catalog's flat path list is cut into fixed-size batches; each batch is
/// one unit of work on the scan pool and turns every path into a
/// single-branch [`PathTree`] fragment whose leaf carries the probed size.
/// Batches never touch shared tree state, so the only coordination is the
/// join at the end of [`ChunkedSizeComputer::compute`].
use crate::model::path_tree::path_segments;
use crate::model::PathTree;
use crate::scanner::probe::probe;
use crate::scanner::progress::ScanProgress;
use crossbeam_channel::Sender;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, error, warn};

/// Number of paths probed per unit of work.
///
/// Large enough that scheduling overhead is negligible, small enough that a
/// wide tree still spreads across every worker.
pub const DEFAULT_BATCH_SIZE: usize = 2_000;

/// Fragments from every batch.
#[derive(Debug, Default)]
pub struct SizingResult {
    pub fragments: Vec<PathTree>,
    /// Paths whose probe failed and which therefore count as 0 bytes.
    pub error_count: u64,
}

pub struct ChunkedSizeComputer<'a> {
    root: &'a Path,
    batch_size: usize,
    progress_tx: &'a Sender<ScanProgress>,
}

impl<'a> ChunkedSizeComputer<'a> {
    /// `root` is the scan root every path is made relative to.
    pub fn new(root: &'a Path, batch_size: usize, progress_tx: &'a Sender<ScanProgress>) -> Self {
        Self {
            root,
            batch_size: batch_size.max(1),
            progress_tx,
        }
    }

    /// Probe every path on `pool` and wait for all batches.
    pub fn compute(&self, paths: &[PathBuf], pool: &ThreadPool) -> SizingResult {
        let batches_total = paths.len().div_ceil(self.batch_size);
        let batches_done = AtomicUsize::new(0);
        debug!(
            "Sizing {} directories in {batches_total} batches of up to {}",
            paths.len(),
            self.batch_size
        );

        let batches: Vec<SizingResult> = pool.install(|| {
            paths
                .par_chunks(self.batch_size)
                .map(|batch| {
                    let result = self.run_batch(batch);
                    let done = batches_done.fetch_add(1, Ordering::Relaxed) + 1;
                    let _ = self.progress_tx.send(ScanProgress::BatchComplete {
                        batches_done: done,
                        batches_total,
                    });
                    result
                })
                .collect()
        });

        let mut combined = SizingResult {
            fragments: Vec::with_capacity(paths.len()),
            error_count: 0,
        };
        for batch in batches {
            combined.fragments.extend(batch.fragments);
            combined.error_count += batch.error_count;
        }
        combined
    }

    /// One batch; a panic loses only this batch's fragments.
    fn run_batch(&self, batch: &[PathBuf]) -> SizingResult {
        panic::catch_unwind(AssertUnwindSafe(|| {
            let mut result = SizingResult {
                fragments: Vec::with_capacity(batch.len()),
                error_count: 0,
            };
            for path in batch {
                let Some(relative) = self.relative(path) else {
                    continue;
                };
                let probed = probe(path, self.progress_tx);
                if probed.failure.is_some() {
                    result.error_count += 1;
                }
                result
                    .fragments
                    .push(PathTree::fragment(path_segments(relative), probed.size));
            }
            result
        }))
        .unwrap_or_else(|_| {
            error!("Sizing batch of {} paths panicked; dropping it", batch.len());
            SizingResult {
                fragments: Vec::new(),
                error_count: batch.len() as u64,
            }
        })
    }

    fn relative<'p>(&self, path: &'p Path) -> Option<&'p Path> {
        match path.strip_prefix(self.root) {
            Ok(relative) => Some(relative),
            Err(_) => {
                warn!(
                    "{} is outside scan root {}; skipping",
                    path.display(),
                    self.root.display()
                );
                None
            }
        }
    }
}
