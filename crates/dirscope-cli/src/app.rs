//! Run lifecycle: load exclusions, scan, persist, sort, report.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirscope_core::model::export::write_json;
use dirscope_core::scanner::progress::ScanProgress;
use dirscope_core::{start_scan, ExclusionSet, PathTree, ScanConfig, ScanError, ScanOutcome};
use termcolor::{ColorChoice, StandardStream, WriteColor};
use tracing::{debug, error, info, warn};

use crate::args::Args;
use crate::render::TreeRenderer;

/// Exit status used after an interrupt, matching the shell convention for SIGINT.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

const EXCLUSIONS_FILE_NAME: &str = "exclusions.txt";

/// Where the exclusion list lives when `--exclusions` is not given.
pub fn default_exclusions_file() -> PathBuf {
    match dirs::config_dir() {
        Some(dir) => dir.join("dirscope").join(EXCLUSIONS_FILE_NAME),
        None => PathBuf::from("dirscope-exclusions.txt"),
    }
}

/// One invocation of the tool.
pub struct App {
    args: Args,
    exclusions_file: PathBuf,
    exclusions: ExclusionSet,
}

impl App {
    /// Load the persisted exclusion list for `args`.
    pub fn new(args: Args) -> Result<Self> {
        let exclusions_file = args
            .exclusions
            .clone()
            .unwrap_or_else(default_exclusions_file);
        let exclusions = ExclusionSet::load(&exclusions_file)
            .with_context(|| format!("loading {}", exclusions_file.display()))?;
        debug!(
            "{} exclusions active from {}",
            exclusions.len(),
            exclusions_file.display()
        );
        Ok(Self {
            args,
            exclusions_file,
            exclusions,
        })
    }

    pub fn exclusions(&self) -> &ExclusionSet {
        &self.exclusions
    }

    pub fn exclusions_file(&self) -> &Path {
        &self.exclusions_file
    }

    /// On Ctrl-C, save the exclusion list (best effort) and exit immediately.
    ///
    /// In-flight work is abandoned; nothing else is flushed.
    pub fn install_interrupt_handler(&self) -> Result<()> {
        let exclusions = self.exclusions.clone();
        let file = self.exclusions_file.clone();
        ctrlc::set_handler(move || {
            warn!("Interrupted; saving exclusions before exit");
            if let Err(err) = exclusions.save(&file) {
                error!("{err}");
            }
            std::process::exit(INTERRUPTED_EXIT_CODE);
        })
        .context("installing the Ctrl-C handler")
    }

    /// Scan, persist the exclusion list, and return the tree sorted down to
    /// the print depth.
    ///
    /// The exclusion list is saved whether or not the scan succeeds.
    pub fn scan(&self) -> Result<PathTree> {
        let outcome = self.run_scan();
        self.persist_exclusions();
        let outcome = outcome?;

        if outcome.newly_excluded > 0 {
            info!("{} paths newly excluded", outcome.newly_excluded);
        }

        let mut tree = outcome.tree;
        match self.args.print_limit() {
            Some(levels) => {
                let root = tree.root();
                tree.sort_by_size(root, levels - 1);
            }
            None => tree.sort_all(),
        }
        Ok(tree)
    }

    /// Print the tree (or JSON) to `out` and write any requested JSON file.
    pub fn report<W: WriteColor>(&self, tree: &PathTree, out: &mut W) -> Result<()> {
        let limit = self.args.print_limit();
        if self.args.json_to_stdout() {
            write_json(tree, limit, &mut *out).context("writing JSON to stdout")?;
            writeln!(out)?;
            return Ok(());
        }

        TreeRenderer::new(limit)
            .render(tree, out)
            .context("rendering tree")?;

        if let Some(path) = &self.args.json {
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            write_json(tree, limit, &mut writer)
                .with_context(|| format!("writing {}", path.display()))?;
            writer.flush()?;
            info!("Exported JSON to {}", path.display());
        }
        Ok(())
    }

    fn run_scan(&self) -> Result<ScanOutcome, ScanError> {
        let mut config = ScanConfig::new(self.args.depth).with_batch_size(self.args.batch_size);
        if let Some(threads) = self.args.threads {
            config = config.with_threads(threads);
        }

        let handle = start_scan(self.args.root.clone(), config, self.exclusions.clone())?;
        for message in handle.progress_rx.iter() {
            log_progress(&message);
        }
        handle.join()
    }

    /// Save failures are reported but never fail the run.
    fn persist_exclusions(&self) {
        if let Err(err) = self.exclusions.save(&self.exclusions_file) {
            warn!("Could not save exclusions: {err}");
        }
    }
}

fn log_progress(message: &ScanProgress) {
    match message {
        ScanProgress::PhaseStarted(phase) => debug!("Phase started: {phase:?}"),
        ScanProgress::Discovered {
            directories,
            excluded,
        } => info!("Found {directories} directories ({excluded} newly excluded)"),
        ScanProgress::BatchComplete {
            batches_done,
            batches_total,
        } => debug!("Sized batch {batches_done}/{batches_total}"),
        ScanProgress::Error { path, message } => debug!("Skipped {path}: {message}"),
        ScanProgress::Complete {
            duration,
            error_count,
            ..
        } => info!("Scan finished in {duration:?} with {error_count} errors"),
    }
}

/// Full run for the binary: scan and print to stdout.
pub fn run(args: Args) -> Result<()> {
    let choice = if args.color.use_color() {
        ColorChoice::Always
    } else {
        ColorChoice::Never
    };
    let app = App::new(args)?;
    app.install_interrupt_handler()?;
    let tree = app.scan()?;

    let mut stdout = StandardStream::stdout(choice);
    app.report(&tree, &mut stdout)
}
