/// Isolated-size probing of a single directory.
///
/// Only the regular files directly inside the directory count; nested
/// directories are probed on their own. Failures never propagate past
/// [`probe`]: an unreadable directory simply contributes 0 bytes.
use crate::error::FsFailure;
use crate::scanner::progress::ScanProgress;
use crossbeam_channel::Sender;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

/// Result of probing one directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pub size: u64,
    /// Set when the directory could not be read; `size` is then 0.
    pub failure: Option<FsFailure>,
}

/// Sum of the byte lengths of regular files directly inside `dir`.
///
/// Symlinked files are not followed, and a `dir` that is itself a symlink
/// reports 0 so the link target is never counted twice. Entries whose
/// metadata cannot be read are skipped.
pub fn isolated_size(dir: &Path) -> io::Result<u64> {
    if fs::symlink_metadata(dir)?.file_type().is_symlink() {
        return Ok(0);
    }

    let mut total: u64 = 0;
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!("Skipping unreadable entry in {}: {err}", dir.display());
                continue;
            }
        };
        match entry.file_type() {
            Ok(file_type) if file_type.is_file() => match entry.metadata() {
                Ok(meta) => total = total.saturating_add(meta.len()),
                Err(err) => debug!("No metadata for {}: {err}", entry.path().display()),
            },
            Ok(_) => {}
            Err(err) => debug!("No file type for {}: {err}", entry.path().display()),
        }
    }
    Ok(total)
}

/// Probe `dir`, turning any failure into a zero size plus a diagnostic.
///
/// The exclusion set is deliberately untouched here; only discovery decides
/// what gets excluded.
pub fn probe(dir: &Path, progress_tx: &Sender<ScanProgress>) -> Probe {
    match isolated_size(dir) {
        Ok(size) => Probe {
            size,
            failure: None,
        },
        Err(err) => {
            let failure = FsFailure::classify(&err);
            match failure {
                FsFailure::Other => warn!("Size probe failed for {}: {err}", dir.display()),
                _ => debug!("Size probe skipped {}: {err}", dir.display()),
            }
            let _ = progress_tx.send(ScanProgress::Error {
                path: dir.to_string_lossy().into_owned(),
                message: format!("{err}"),
            });
            Probe {
                size: 0,
                failure: Some(failure),
            }
        }
    }
}
