//! CLI entry point: one invocation performs one run.

use clap::Parser;
use poddown::{ConfigPaths, Poddown, Settings};
use std::process::ExitCode;
use tracing::{debug, error};

mod cli;

use cli::Args;

/// Exit status when configuration cannot be loaded
const EXIT_INIT_FAILED: u8 = 2;

fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let downloader = match init(args) {
        Ok(downloader) => downloader,
        Err(e) => {
            error!(error = %e, "INIT FAILED");
            eprintln!("INIT FAILED: {e}");
            return ExitCode::from(EXIT_INIT_FAILED);
        }
    };

    match downloader.run() {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Run aborted");
            ExitCode::FAILURE
        }
    }
}

fn init(args: Args) -> poddown::Result<Poddown> {
    let paths = ConfigPaths::resolve(args.config_dir)?;
    debug!(dir = %paths.dir().display(), "using configuration directory");
    let settings = Settings::load(&paths.settings_file())?;
    Poddown::new(settings, paths)
}
