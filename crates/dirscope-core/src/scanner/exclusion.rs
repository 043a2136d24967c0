/// The exclusion set: paths that traversal must never enter.
///
/// Shared by every discovery unit of a scan (and by the interrupt handler),
/// so it is a cloneable handle around a lock-guarded set. Entries are only
/// ever added during a run. A path is excluded when it, or any of its
/// ancestors, is in the set; matching is per path component, so `/a/b`
/// excludes `/a/b/c` but not `/a/bc`.
///
/// On disk the set is a newline-delimited list of absolute paths.
use crate::error::ScanError;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    inner: Arc<RwLock<BTreeSet<PathBuf>>>,
}

impl ExclusionSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The set used when no list has been persisted yet: just the OS system directory.
    pub fn with_defaults() -> Self {
        Self::from_paths([default_system_dir()])
    }

    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let set: BTreeSet<PathBuf> = paths.into_iter().map(Into::into).collect();
        Self {
            inner: Arc::new(RwLock::new(set)),
        }
    }

    /// `true` if `path` or one of its ancestors has been excluded.
    pub fn is_excluded(&self, path: &Path) -> bool {
        let set = self.inner.read();
        !set.is_empty() && path.ancestors().any(|ancestor| set.contains(ancestor))
    }

    /// Add a path. Returns `true` if it was not already present.
    pub fn insert(&self, path: PathBuf) -> bool {
        self.inner.write().insert(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.inner.read().contains(path)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Sorted copy of the current entries.
    pub fn snapshot(&self) -> Vec<PathBuf> {
        self.inner.read().iter().cloned().collect()
    }

    /// Load a persisted list. A missing file yields [`ExclusionSet::with_defaults`].
    pub fn load(file: &Path) -> Result<Self, ScanError> {
        match fs::read_to_string(file) {
            Ok(contents) => {
                let set = Self::from_paths(parse_lines(&contents));
                debug!("Loaded {} exclusions from {}", set.len(), file.display());
                Ok(set)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("No exclusion list at {}, using defaults", file.display());
                Ok(Self::with_defaults())
            }
            Err(source) => Err(ScanError::ExclusionStore {
                path: file.to_path_buf(),
                source,
            }),
        }
    }

    /// Write the set back to `file`, creating parent directories as needed.
    pub fn save(&self, file: &Path) -> Result<(), ScanError> {
        let to_store_error = |source| ScanError::ExclusionStore {
            path: file.to_path_buf(),
            source,
        };
        if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(to_store_error)?;
        }

        let entries = self.snapshot();
        let mut contents = String::new();
        for entry in &entries {
            contents.push_str(&entry.to_string_lossy());
            contents.push('\n');
        }
        fs::write(file, contents).map_err(to_store_error)?;
        info!("Saved {} exclusions to {}", entries.len(), file.display());
        Ok(())
    }
}

fn parse_lines(contents: &str) -> impl Iterator<Item = PathBuf> + '_ {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
}

/// The operating system directory excluded by default.
pub fn default_system_dir() -> PathBuf {
    #[cfg(windows)]
    {
        std::env::var_os("SystemRoot")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(r"C:\Windows"))
    }
    #[cfg(not(windows))]
    {
        PathBuf::from("/proc")
    }
}
