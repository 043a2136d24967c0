/// End-to-end scanner integration tests.
///
/// These tests run the real two-phase pipeline (discovery, batched sizing,
/// merge, aggregation) against a real temporary filesystem, through both the
/// blocking `scan` entry point and the background `start_scan` handle.
use dirscope_core::scanner::progress::ScanProgress;
use dirscope_core::scanner::{scan, start_scan, ScanConfig, PROGRESS_CHANNEL_CAPACITY};
use dirscope_core::{ExclusionSet, PathTree};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Create a reproducible directory tree for scanner tests:
///
/// ```text
/// root/
///   alpha/
///     a.txt   (100 bytes)
///     b.rs    (200 bytes)
///   beta/
///     c.png   (300 bytes)
///   d.zip     (400 bytes)
/// ```
///
/// Total file bytes: 1 000.
fn build_test_tree(root: &Path) {
    let alpha = root.join("alpha");
    let beta = root.join("beta");
    fs::create_dir_all(&alpha).unwrap();
    fs::create_dir_all(&beta).unwrap();

    write_bytes(&alpha.join("a.txt"), 100);
    write_bytes(&alpha.join("b.rs"), 200);
    write_bytes(&beta.join("c.png"), 300);
    write_bytes(&root.join("d.zip"), 400);
}

fn write_bytes(path: &Path, n: usize) {
    let mut f = fs::File::create(path).unwrap();
    f.write_all(&vec![0u8; n]).unwrap();
}

fn run(root: &Path, config: ScanConfig, exclusions: &ExclusionSet) -> PathTree {
    let (tx, _rx) = crossbeam_channel::unbounded();
    scan(root, &config, exclusions, &tx).expect("scan failed").tree
}

fn total_of(tree: &PathTree, id: &str) -> u64 {
    let idx = tree.child(tree.root(), id).expect("missing child");
    tree.node(idx).total_size
}

// ── Tests ─────────────────────────────────────────────────────────────────────

/// Every file directly inside a scanned directory is counted once.
#[test]
fn scan_sums_isolated_and_total_sizes() {
    let tmp = TempDir::new().unwrap();
    build_test_tree(tmp.path());

    let tree = run(tmp.path(), ScanConfig::new(3), &ExclusionSet::new());
    let root = tree.node(tree.root());

    assert_eq!(root.isolated_size, 400);
    assert_eq!(root.total_size, 1_000);
    assert_eq!(total_of(&tree, "alpha"), 300);
    assert_eq!(total_of(&tree, "beta"), 300);
    assert_eq!(tree.node_count(), 3);
    assert_eq!(tree.find_aggregation_violation(), None);
}

/// Tiny batches and many threads must give the same tree as one big batch.
#[test]
fn batch_size_does_not_change_the_result() {
    let tmp = TempDir::new().unwrap();
    for i in 0..20 {
        let dir = tmp.path().join(format!("d{i:02}")).join("inner");
        fs::create_dir_all(&dir).unwrap();
        write_bytes(&dir.join("f.bin"), 10 + i);
        write_bytes(&dir.parent().unwrap().join("g.bin"), 1);
    }

    let exclusions = ExclusionSet::new();
    let one_batch = run(tmp.path(), ScanConfig::new(4).with_threads(1), &exclusions);
    let many_batches = run(
        tmp.path(),
        ScanConfig::new(4).with_batch_size(3).with_threads(4),
        &exclusions,
    );

    assert_eq!(one_batch.node_count(), 41);
    assert_eq!(one_batch.node_count(), many_batches.node_count());
    assert_eq!(
        one_batch.node(one_batch.root()).total_size,
        many_batches.node(many_batches.root()).total_size
    );
    for i in 0..20 {
        let id = format!("d{i:02}");
        assert_eq!(total_of(&one_batch, &id), total_of(&many_batches, &id));
        assert_eq!(total_of(&one_batch, &id), 11 + i as u64);
    }
}

/// Files below the depth bound are not discovered and therefore not counted.
#[test]
fn depth_bound_limits_what_is_counted() {
    let tmp = TempDir::new().unwrap();
    let deep = tmp.path().join("x").join("y");
    fs::create_dir_all(&deep).unwrap();
    write_bytes(&tmp.path().join("x").join("top.bin"), 5);
    write_bytes(&deep.join("deep.bin"), 50);

    let shallow = run(tmp.path(), ScanConfig::new(1), &ExclusionSet::new());
    assert_eq!(shallow.node(shallow.root()).total_size, 5);

    let full = run(tmp.path(), ScanConfig::new(2), &ExclusionSet::new());
    assert_eq!(full.node(full.root()).total_size, 55);
}

/// Scans of an empty directory yield exactly the root with zero size.
#[test]
fn scan_empty_directory() {
    let tmp = TempDir::new().unwrap();
    let tree = run(tmp.path(), ScanConfig::new(2), &ExclusionSet::new());
    assert_eq!(tree.node_count(), 1);
    assert_eq!(tree.node(tree.root()).total_size, 0);
}

/// An invalid configuration is rejected before any work starts.
#[test]
fn zero_depth_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let (tx, _rx) = crossbeam_channel::unbounded();
    let result = scan(tmp.path(), &ScanConfig::new(0), &ExclusionSet::new(), &tx);
    assert!(result.is_err());
}

/// The background handle reports phases and completion, then yields the tree.
#[test]
fn start_scan_reports_progress_and_joins() {
    let tmp = TempDir::new().unwrap();
    build_test_tree(tmp.path());

    let handle = start_scan(
        tmp.path().to_path_buf(),
        ScanConfig::new(2),
        ExclusionSet::new(),
    )
    .unwrap();

    let messages: Vec<ScanProgress> = handle.progress_rx.iter().collect();
    assert!(messages
        .iter()
        .any(|m| matches!(m, ScanProgress::Discovered { directories: 3, .. })));
    assert!(matches!(
        messages.last(),
        Some(ScanProgress::Complete {
            total_size: 1_000,
            directories: 3,
            ..
        })
    ));

    let outcome = handle.join().unwrap();
    assert_eq!(outcome.directories, 3);
    assert_eq!(outcome.error_count, 0);
    assert_eq!(outcome.tree.node(outcome.tree.root()).total_size, 1_000);
}

/// Sorting after a real scan orders every level by total size.
#[test]
fn scan_then_sort_orders_children() {
    let tmp = TempDir::new().unwrap();
    build_test_tree(tmp.path());
    write_bytes(&tmp.path().join("beta").join("more.bin"), 1);

    let mut tree = run(tmp.path(), ScanConfig::new(2), &ExclusionSet::new());
    tree.sort_all();
    let order: Vec<_> = tree
        .children(tree.root())
        .iter()
        .map(|&c| tree.node(c).id.to_string())
        .collect();
    assert_eq!(order, vec!["beta", "alpha"]);
}

/// An access-denied directory lands in the exclusion set, survives a
/// save/load cycle, and is never descended into by a later scan.
#[cfg(unix)]
#[test]
fn access_denied_directory_is_excluded_and_persisted() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = TempDir::new().unwrap();
    let locked = tmp.path().join("open").join("locked");
    fs::create_dir_all(locked.join("hidden")).unwrap();
    write_bytes(&tmp.path().join("open").join("o.bin"), 7);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users can read anyway; nothing to verify in that case.
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let exclusions = ExclusionSet::new();
    let (tx, _rx) = crossbeam_channel::unbounded();
    let first = scan(tmp.path(), &ScanConfig::new(5), &exclusions, &tx).unwrap();
    assert!(exclusions.contains(&locked));
    assert_eq!(first.newly_excluded, 1);
    assert_eq!(first.tree.node(first.tree.root()).total_size, 7);

    let store = tmp.path().join("exclusions.txt");
    exclusions.save(&store).unwrap();
    let persisted = fs::read_to_string(&store).unwrap();
    assert!(persisted.contains(&*locked.to_string_lossy()));

    let second = scan(tmp.path(), &ScanConfig::new(5), &exclusions, &tx).unwrap();
    assert_eq!(second.newly_excluded, 0);
    let open = second.tree.child(second.tree.root(), "open").unwrap();
    assert!(second.tree.child(open, "locked").is_none());

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
}

/// A locked directory at the depth boundary is cataloged but never listed:
/// its probe fails with zero size and it is not added to the exclusions.
#[cfg(unix)]
#[test]
fn locked_directory_at_depth_boundary_is_not_excluded() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = TempDir::new().unwrap();
    let locked = tmp.path().join("locked");
    fs::create_dir(&locked).unwrap();
    write_bytes(&locked.join("f.bin"), 32);
    write_bytes(&tmp.path().join("r.bin"), 3);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let exclusions = ExclusionSet::new();
    let (tx, _rx) = crossbeam_channel::unbounded();
    let outcome = scan(tmp.path(), &ScanConfig::new(1), &exclusions, &tx);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    let outcome = outcome.unwrap();

    assert!(!exclusions.contains(&locked));
    assert_eq!(outcome.newly_excluded, 0);
    assert_eq!(outcome.error_count, 1);
    assert_eq!(total_of(&outcome.tree, "locked"), 0);
    assert_eq!(outcome.tree.node(outcome.tree.root()).total_size, 3);
}

/// Sibling directories whose names are not valid UTF-8 are sized
/// separately even though they display identically.
#[cfg(unix)]
#[test]
fn non_utf8_sibling_names_are_kept_apart() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let tmp = TempDir::new().unwrap();
    let first = tmp.path().join(OsStr::from_bytes(b"a\xff"));
    let second = tmp.path().join(OsStr::from_bytes(b"a\xfe"));
    // Some filesystems only accept UTF-8 names.
    if fs::create_dir(&first).is_err() || fs::create_dir(&second).is_err() {
        return;
    }
    write_bytes(&first.join("f.bin"), 10);
    write_bytes(&second.join("f.bin"), 20);

    let tree = run(tmp.path(), ScanConfig::new(1), &ExclusionSet::new());
    let root = tree.root();
    assert_eq!(tree.children(root).len(), 2);
    assert_eq!(tree.node(root).total_size, 30);
    let a = tree.child(root, OsStr::from_bytes(b"a\xff")).unwrap();
    let b = tree.child(root, OsStr::from_bytes(b"a\xfe")).unwrap();
    assert_eq!(tree.node(a).total_size, 10);
    assert_eq!(tree.node(b).total_size, 20);
}

/// `PROGRESS_CHANNEL_CAPACITY` must never be 0, which would make every
/// `send()` block until the frontend receives.
const _: () = assert!(
    PROGRESS_CHANNEL_CAPACITY > 0,
    "PROGRESS_CHANNEL_CAPACITY must be > 0"
);
