/// Directory discovery under a depth bound.
///
/// The root is listed on the calling thread; each immediate subdirectory then
/// becomes one independent unit of work on the scan's rayon pool. A unit
/// walks its own subtree with an explicit stack and returns a flat path
/// list, so units share nothing except the [`ExclusionSet`].
///
/// # Failure policy
///
/// - Access denied: the directory is dropped from the catalog, not descended,
///   and added to the exclusion set.
/// - Not found: the directory vanished mid-scan; dropped silently.
/// - Anything else: dropped and logged.
///
/// Symlinked directories are reported but never descended into.
use crate::error::FsFailure;
use crate::scanner::exclusion::ExclusionSet;
use crate::scanner::progress::ScanProgress;
use crossbeam_channel::Sender;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// A discovered directory and whether it is reached through a link.
#[derive(Debug, Clone)]
struct Subdir {
    path: PathBuf,
    is_link: bool,
}

/// Output of one discovery unit.
#[derive(Debug, Default)]
struct UnitResult {
    paths: Vec<PathBuf>,
    error_count: u64,
}

/// Everything discovery produced.
#[derive(Debug, Default)]
pub struct CatalogResult {
    /// Directories to probe, root first, in sorted order.
    pub paths: Vec<PathBuf>,
    /// Directories skipped because of an I/O error.
    pub error_count: u64,
    /// How many paths this run added to the exclusion set.
    pub newly_excluded: usize,
}

/// Enumerates the directories under a root, up to `depth` levels below it.
pub struct PathCatalog<'a> {
    root: &'a Path,
    depth: usize,
    exclusions: &'a ExclusionSet,
    progress_tx: &'a Sender<ScanProgress>,
}

impl<'a> PathCatalog<'a> {
    pub fn new(
        root: &'a Path,
        depth: usize,
        exclusions: &'a ExclusionSet,
        progress_tx: &'a Sender<ScanProgress>,
    ) -> Self {
        Self {
            root,
            depth: depth.max(1),
            exclusions,
            progress_tx,
        }
    }

    /// Run discovery on `pool` and wait for every unit to finish.
    ///
    /// The root itself is the first entry so its own files get probed.
    pub fn enumerate(&self, pool: &ThreadPool) -> CatalogResult {
        let excluded_before = self.exclusions.len();
        let mut result = CatalogResult::default();

        if self.exclusions.is_excluded(self.root) {
            warn!("Scan root {} is excluded; nothing to scan", self.root.display());
            return result;
        }

        let top_level = match list_subdirs(self.root) {
            Ok(children) => children,
            Err(err) => {
                result.error_count += 1;
                self.record_failure(self.root, &err);
                return result;
            }
        };
        result.paths.push(self.root.to_path_buf());

        debug!(
            "Discovery: {} top-level units under {} (depth {})",
            top_level.len(),
            self.root.display(),
            self.depth
        );

        let units: Vec<UnitResult> = pool.install(|| {
            top_level
                .into_par_iter()
                .map(|subdir| self.run_unit(subdir))
                .collect()
        });

        for unit in units {
            result.paths.extend(unit.paths);
            result.error_count += unit.error_count;
        }
        result.paths.sort();
        result.newly_excluded = self.exclusions.len().saturating_sub(excluded_before);

        info!(
            "Discovered {} directories ({} errors, {} newly excluded)",
            result.paths.len(),
            result.error_count,
            result.newly_excluded
        );
        result
    }

    /// One unit of work; a panic is contained to this unit.
    fn run_unit(&self, start: Subdir) -> UnitResult {
        let label = start.path.clone();
        panic::catch_unwind(AssertUnwindSafe(|| self.explore(start, self.depth - 1)))
            .unwrap_or_else(|_| {
                error!("Discovery unit for {} panicked; dropping it", label.display());
                UnitResult {
                    paths: Vec::new(),
                    error_count: 1,
                }
            })
    }

    /// Walk the subtree under `start`, at most `remaining` levels further down.
    fn explore(&self, start: Subdir, remaining: usize) -> UnitResult {
        let mut unit = UnitResult::default();
        let mut stack = vec![(start, remaining)];

        while let Some((subdir, remaining)) = stack.pop() {
            if self.exclusions.is_excluded(&subdir.path) {
                debug!("Skipping excluded {}", subdir.path.display());
                continue;
            }
            if subdir.is_link || remaining == 0 {
                unit.paths.push(subdir.path);
                continue;
            }
            match list_subdirs(&subdir.path) {
                Ok(children) => {
                    unit.paths.push(subdir.path);
                    stack.extend(children.into_iter().map(|child| (child, remaining - 1)));
                }
                Err(err) => {
                    unit.error_count += 1;
                    self.record_failure(&subdir.path, &err);
                }
            }
        }
        unit
    }

    fn record_failure(&self, path: &Path, err: &io::Error) {
        match FsFailure::classify(err) {
            FsFailure::AccessDenied => {
                debug!("Access denied to {}; excluding it", path.display());
                self.exclusions.insert(path.to_path_buf());
            }
            FsFailure::NotFound => {
                debug!("{} vanished during discovery", path.display());
                return;
            }
            FsFailure::Other => warn!("Cannot list {}: {err}", path.display()),
        }
        let _ = self.progress_tx.send(ScanProgress::Error {
            path: path.to_string_lossy().into_owned(),
            message: format!("{err}"),
        });
    }
}

/// Immediate subdirectories of `dir`, including symlinks that resolve to a directory.
fn list_subdirs(dir: &Path) -> io::Result<Vec<Subdir>> {
    let mut subdirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!("Skipping unreadable entry in {}: {err}", dir.display());
                continue;
            }
        };
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            subdirs.push(Subdir {
                path: entry.path(),
                is_link: false,
            });
        } else if file_type.is_symlink() {
            let path = entry.path();
            if fs::metadata(&path).is_ok_and(|meta| meta.is_dir()) {
                subdirs.push(Subdir {
                    path,
                    is_link: true,
                });
            }
        }
    }
    Ok(subdirs)
}
