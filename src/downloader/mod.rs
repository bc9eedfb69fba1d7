//! Resumable episode downloader
//!
//! One [`EpisodeJob`] downloads one media file. The job is split by stage:
//! - this module derives the destination, skips unchanged or finished files
//!   and reports the [`EpisodeOutcome`]
//! - [`transfer`] decides whether to resume, streams the body into the
//!   `.part` file and verifies its size
//! - [`finalization`] promotes the `.part` file or cleans it up
//!
//! Every failure sets the run's error flag; nothing is propagated to the pool.

mod finalization;
mod transfer;

use crate::config::Settings;
use crate::pool::Job;
use crate::source::Episode;
use crate::state::RunContext;
use crate::transport::Transport;
use crate::utils::filename_from_url;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Suffix of in-progress downloads
pub const PART_SUFFIX: &str = ".part";

/// What happened to one episode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EpisodeOutcome {
    /// The URL has no usable file name; skipped without flagging an error
    InvalidFilename,
    /// The server reports no change since the previous run
    Unchanged,
    /// The destination file already exists
    AlreadyPresent,
    /// The file was transferred and moved into place
    Downloaded {
        /// Final size of the file on disk
        bytes: u64,
        /// Whether the transfer continued an earlier `.part` file
        resumed: bool,
    },
    /// The transfer or its verification failed; the run is flagged
    Failed,
}

/// Pool job wrapping [`download_episode`]
pub struct EpisodeJob {
    episode: Episode,
    ctx: Arc<RunContext>,
    settings: Arc<Settings>,
    transport: Arc<dyn Transport>,
}

impl EpisodeJob {
    /// Bind an episode to the shared run state
    pub fn new(
        episode: Episode,
        ctx: Arc<RunContext>,
        settings: Arc<Settings>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            episode,
            ctx,
            settings,
            transport,
        }
    }

    /// The episode this job downloads
    pub fn episode(&self) -> &Episode {
        &self.episode
    }
}

impl Job for EpisodeJob {
    fn run(self) {
        download_episode(
            &self.ctx,
            &self.settings,
            self.transport.as_ref(),
            &self.episode,
        );
    }
}

/// Download one episode into `cast_dir/prefix_path/<file name>`
///
/// Never fails outright: every problem is logged, flagged on `ctx` where it
/// counts as an error, and summarized in the returned outcome.
pub fn download_episode(
    ctx: &RunContext,
    settings: &Settings,
    transport: &dyn Transport,
    episode: &Episode,
) -> EpisodeOutcome {
    let Some(filename) = filename_from_url(&episode.url).filter(|name| is_safe_filename(name))
    else {
        tracing::debug!(url = %episode.url, "no file name in episode URL, skipping");
        return EpisodeOutcome::InvalidFilename;
    };

    if !url_has_changed(ctx, settings, transport, &episode.url) {
        tracing::debug!(url = %episode.url, "episode unchanged since last run");
        return EpisodeOutcome::Unchanged;
    }

    let final_path = settings
        .cast_dir()
        .join(&episode.prefix_path)
        .join(filename);
    if final_path.exists() {
        tracing::debug!(path = %final_path.display(), "episode already downloaded");
        return EpisodeOutcome::AlreadyPresent;
    }

    let part_path = part_path_for(&final_path);
    tracing::info!(cast = %episode.cast_name, url = %episode.url, "Downloading episode");

    match transfer::run(settings, transport, episode, &part_path) {
        Ok(done) => match finalization::promote(&part_path, &final_path) {
            Ok(()) => {
                tracing::info!(
                    cast = %episode.cast_name,
                    path = %final_path.display(),
                    bytes = done.bytes,
                    resumed = done.resumed,
                    "Episode downloaded"
                );
                EpisodeOutcome::Downloaded {
                    bytes: done.bytes,
                    resumed: done.resumed,
                }
            }
            Err(e) => {
                tracing::error!(
                    from = %part_path.display(),
                    to = %final_path.display(),
                    error = %e,
                    "Failed to move finished download into place"
                );
                ctx.flag_error();
                EpisodeOutcome::Failed
            }
        },
        Err(e) => {
            tracing::warn!(cast = %episode.cast_name, url = %episode.url, error = %e, "Episode download failed");
            ctx.flag_error();
            finalization::discard_or_keep(&part_path, settings.download.keep_partial);
            EpisodeOutcome::Failed
        }
    }
}

/// Whether `url` may have changed since the previous run
///
/// Answers yes on a first run, when last-modified hints are ignored, and
/// whenever the probe fails or the server gives no date. Only a positive
/// `Last-Modified` strictly older than the previous run counts as unchanged.
pub fn url_has_changed(
    ctx: &RunContext,
    settings: &Settings,
    transport: &dyn Transport,
    url: &str,
) -> bool {
    if ctx.is_first_run() || settings.download.ignore_last_modified {
        return true;
    }
    match transport.last_modified(url) {
        Ok(Some(modified)) => !(modified > 0 && modified < ctx.last_download()),
        Ok(None) => true,
        Err(e) => {
            tracing::debug!(url, error = %e, "last-modified probe failed, assuming changed");
            true
        }
    }
}

/// `<final>.part`
pub fn part_path_for(final_path: &Path) -> PathBuf {
    let mut name = final_path.as_os_str().to_owned();
    name.push(PART_SUFFIX);
    PathBuf::from(name)
}

fn is_safe_filename(name: &str) -> bool {
    name != "." && name != ".." && !name.contains('\\')
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
