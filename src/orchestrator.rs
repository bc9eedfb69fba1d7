//! One run of the pipeline
//!
//! [`Poddown::run`] performs, in order:
//! 1. read the prior-run marker
//! 2. start the episode pool and the feed pool
//! 3. submit one [`FeedJob`] per usable source
//! 4. drain the feed pool, then the episode pool
//! 5. advance the marker unless the run failed and the policy forbids it
//! 6. shut down the episode pool, then the feed pool
//!
//! Draining in this order is what makes the episode pool's quiescence
//! meaningful: feed jobs submit their episodes before they return, so once the
//! feed pool is drained no new episode can appear.

use crate::config::{ConfigPaths, Settings};
use crate::downloader::EpisodeJob;
use crate::error::{Error, Result};
use crate::feed_task::FeedJob;
use crate::pool::{PoolHandle, TaskPool};
use crate::source::{Source, load_source_records};
use crate::state::{RunContext, now_timestamp, read_last_download, write_last_download};
use crate::transport::{HttpTransport, Transport};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Summary of a finished run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunReport {
    /// Some source, feed or episode failed
    pub had_error: bool,
    /// Feed jobs handed to the feed pool
    pub sources_submitted: usize,
    /// The prior-run marker now holds this run's start time
    pub marker_advanced: bool,
}

/// The podcast downloader
///
/// # Example
///
/// ```no_run
/// use poddown::{ConfigPaths, Poddown, Settings};
///
/// # fn main() -> poddown::Result<()> {
/// let paths = ConfigPaths::resolve(None)?;
/// let settings = Settings::load(&paths.settings_file())?;
/// let report = Poddown::new(settings, paths)?.run()?;
/// println!("errors: {}", report.had_error);
/// # Ok(())
/// # }
/// ```
pub struct Poddown {
    settings: Arc<Settings>,
    paths: ConfigPaths,
    transport: Arc<dyn Transport>,
}

impl Poddown {
    /// Create a downloader that talks HTTP
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] if the HTTP client cannot be built.
    pub fn new(settings: Settings, paths: ConfigPaths) -> Result<Self> {
        let transport = HttpTransport::new()?;
        Ok(Self::with_transport(settings, paths, Arc::new(transport)))
    }

    /// Create a downloader on top of a custom transport
    pub fn with_transport(
        settings: Settings,
        paths: ConfigPaths,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            paths,
            transport,
        }
    }

    /// Active settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Configuration file locations
    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    /// Run once, stamping the run with the current time
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if a pool worker thread cannot be started.
    /// Failures of individual sources, feeds and episodes are not errors; they
    /// show up in [`RunReport::had_error`].
    pub fn run(&self) -> Result<RunReport> {
        self.run_started_at(now_timestamp())
    }

    /// Run once with an explicit start time (seconds since the epoch)
    ///
    /// The start time becomes the next run's freshness cutoff.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn run_started_at(&self, started_at: i64) -> Result<RunReport> {
        let marker = self.paths.last_download_file();
        let ctx = Arc::new(RunContext::new(read_last_download(&marker), started_at));
        info!(
            last_download = ctx.last_download(),
            started_at,
            "Starting run"
        );

        let episodes: TaskPool<EpisodeJob> =
            TaskPool::new("episode", self.settings.tuning.episode_pool_size())?;
        let feeds: TaskPool<FeedJob> =
            TaskPool::new("feed", self.settings.tuning.feed_pool_size())?;

        let sources_submitted = self.seed(&ctx, &feeds, &episodes.handle());

        feeds.drain();
        episodes.drain();

        let marker_advanced = self.advance_marker(&ctx);

        let discarded = episodes.shutdown() + feeds.shutdown();
        if discarded > 0 {
            warn!(discarded, "jobs were still queued at shutdown");
        }

        let report = RunReport {
            had_error: ctx.had_error(),
            sources_submitted,
            marker_advanced,
        };
        info!(
            sources = report.sources_submitted,
            had_error = report.had_error,
            marker_advanced = report.marker_advanced,
            "Run finished"
        );
        Ok(report)
    }

    /// Submit a feed job for every usable source in the cast list
    fn seed(
        &self,
        ctx: &Arc<RunContext>,
        feeds: &TaskPool<FeedJob>,
        episodes: &PoolHandle<EpisodeJob>,
    ) -> usize {
        let list = self.settings.cast_list();
        let records = match load_source_records(list) {
            Ok(records) => records,
            Err(Error::Io(e)) => {
                warn!(path = %list.display(), error = %e, "Could not read cast list, nothing to do");
                return 0;
            }
            Err(e) => {
                error!(path = %list.display(), error = %e, "Could not parse cast list");
                ctx.flag_error();
                return 0;
            }
        };
        debug!(count = records.len(), "loaded cast list");

        let mut submitted = 0;
        for (index, record) in records.iter().enumerate() {
            let Some(source) = Source::from_record(record) else {
                error!(index, name = ?record.name, "Cast entry has no URL");
                ctx.flag_error();
                continue;
            };

            let dir = self.settings.cast_dir().join(source.prefix_path());
            if let Err(e) = std::fs::create_dir_all(&dir) {
                error!(cast = source.label(), path = %dir.display(), error = %e, "Failed to create cast directory");
                ctx.flag_error();
                continue;
            }

            let job = FeedJob::new(
                source,
                Arc::clone(ctx),
                Arc::clone(&self.settings),
                Arc::clone(&self.transport),
                episodes.clone(),
            );
            match feeds.submit(job) {
                Ok(()) => submitted += 1,
                Err(e) => {
                    error!(index, error = %e, "Failed to queue feed");
                    ctx.flag_error();
                }
            }
        }
        submitted
    }

    fn advance_marker(&self, ctx: &RunContext) -> bool {
        if !ctx.should_advance(self.settings.tuning.update_lastdl_on_error) {
            info!("Run had errors, keeping previous download marker");
            return false;
        }
        let marker = self.paths.last_download_file();
        match write_last_download(&marker, ctx.started_at()) {
            Ok(()) => true,
            Err(e) => {
                error!(path = %marker.display(), error = %e, "Failed to write download marker");
                false
            }
        }
    }
}
