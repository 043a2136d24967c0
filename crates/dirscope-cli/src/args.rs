//! Command-line arguments.

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, ValueEnum};
use dirscope_core::scanner::chunked::DEFAULT_BATCH_SIZE;

/// Color output mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect based on terminal and environment
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl ColorMode {
    /// Resolve `Auto` against `NO_COLOR`, `TERM=dumb` and whether stdout is a TTY.
    pub fn use_color(self) -> bool {
        match self {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => {
                if std::env::var_os("NO_COLOR").is_some() {
                    return false;
                }
                if std::env::var("TERM").map(|t| t == "dumb").unwrap_or(false) {
                    return false;
                }
                std::io::stdout().is_terminal()
            }
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "dirscope")]
#[command(about = "Show recursive disk usage of a directory as a sorted tree")]
#[command(version)]
pub struct Args {
    /// Directory to analyse
    pub root: PathBuf,

    /// Directory levels below the root to scan (at least 1)
    #[arg(value_parser = parse_positive)]
    pub depth: usize,

    /// Levels below the root to print (0 = unlimited)
    pub print_depth: usize,

    /// Exclusion list to load and update (defaults to the user config directory)
    #[arg(long, value_name = "FILE")]
    pub exclusions: Option<PathBuf>,

    /// Also export the tree as JSON to FILE ("-" prints JSON instead of the tree)
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// Control color output: auto, always, never
    #[arg(long = "color", value_name = "WHEN", default_value = "auto")]
    pub color: ColorMode,

    /// Directories probed per work unit
    #[arg(long, value_name = "N", default_value_t = DEFAULT_BATCH_SIZE, value_parser = parse_positive)]
    pub batch_size: usize,

    /// Worker threads (defaults to the number of CPUs)
    #[arg(long, value_name = "N", value_parser = parse_positive)]
    pub threads: Option<usize>,

    /// Log debug detail to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Parse the process arguments, exiting with usage on any invalid value.
    pub fn parse_validated() -> Self {
        let args = Self::parse();
        if let Err(err) = args.validate() {
            err.exit();
        }
        args
    }

    /// Checks clap cannot express declaratively.
    pub fn validate(&self) -> Result<(), clap::Error> {
        if !self.root.is_dir() {
            return Err(Self::command().error(
                ErrorKind::ValueValidation,
                format!("root path '{}' is not an existing directory", self.root.display()),
            ));
        }
        Ok(())
    }

    /// Print depth as an optional bound (`None` = unlimited).
    pub fn print_limit(&self) -> Option<usize> {
        (self.print_depth > 0).then_some(self.print_depth)
    }

    /// `true` when JSON replaces the text tree on stdout.
    pub fn json_to_stdout(&self) -> bool {
        self.json.as_deref().is_some_and(|p| p.as_os_str() == "-")
    }
}

fn parse_positive(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}
