//! CLI argument definitions.

use clap::Parser;
use std::path::PathBuf;

/// Download new podcast episodes from every configured feed
#[derive(Parser, Debug)]
#[command(name = "poddown")]
#[command(author, version, about)]
pub struct Args {
    /// Configuration directory holding settings.json and the run marker
    /// (default: the platform config directory joined with "poddown")
    #[arg(long, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}
