//! # poddown
//!
//! Podcast downloader built around two bounded worker pools.
//!
//! ## Design
//!
//! - **Feed pool** - one job per configured source fetches the feed, picks the
//!   entries that are new since the previous run and queues them
//! - **Episode pool** - one job per entry downloads the media file through a
//!   `.part` file that survives failures and is resumed next time
//! - **Run marker** - the start time of the last run is persisted and used as
//!   the freshness cutoff for the next one
//!
//! Failures of single sources or episodes never stop a run. They set a shared
//! error flag that decides whether the run marker advances.
//!
//! ## Quick Start
//!
//! ```no_run
//! use poddown::{ConfigPaths, Poddown, Settings};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let paths = ConfigPaths::resolve(None)?;
//!     let settings = Settings::load(&paths.settings_file())?;
//!
//!     let report = Poddown::new(settings, paths)?.run()?;
//!     if report.had_error {
//!         eprintln!("some downloads failed");
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Resumable episode downloader
pub mod downloader;
/// Error types
pub mod error;
/// Feed document parsing
pub mod feed;
/// Feed jobs
pub mod feed_task;
/// Run orchestration
pub mod orchestrator;
/// Bounded worker pool
pub mod pool;
/// Sources and episodes
pub mod source;
/// Run state and the prior-run marker
pub mod state;
/// Network access
pub mod transport;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{ConfigPaths, DownloadConfig, LocationConfig, Settings, TuningConfig};
pub use downloader::{EpisodeJob, EpisodeOutcome, download_episode};
pub use error::{Error, Result, TransportError};
pub use feed::{FeedEntry, parse_feed};
pub use feed_task::{FeedJob, FeedOutcome, process_feed};
pub use orchestrator::{Poddown, RunReport};
pub use pool::{Job, PoolHandle, TaskPool};
pub use source::{Episode, ExplicitPolicy, Source, SourceRecord};
pub use state::RunContext;
pub use transport::{HttpTransport, Transport};
