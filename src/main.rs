//! dirscope: du-style disk usage analyser.
//!
//! Thin binary entry point. All logic lives in the `dirscope-core`
//! and `dirscope-cli` crates.

fn main() -> anyhow::Result<()> {
    // Invalid arguments print usage and exit before anything else happens.
    let args = dirscope_cli::Args::parse_validated();

    // Structured logging goes to stderr so stdout stays clean for the tree or JSON.
    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("dirscope starting");

    dirscope_cli::run(args)
}
