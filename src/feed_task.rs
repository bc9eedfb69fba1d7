//! Feed job: turn one source into episode jobs
//!
//! A [`FeedJob`] runs on a feed-pool worker and performs the whole sequence
//! synchronously: conditional fetch, fetch, parse, filter, submit. When the
//! job returns, every episode it will ever produce is already queued on the
//! episode pool, so the feed pool draining implies no more episodes arrive.

use crate::config::Settings;
use crate::downloader::{EpisodeJob, url_has_changed};
use crate::feed::{FeedEntry, parse_feed};
use crate::pool::{Job, PoolHandle};
use crate::source::{Episode, Source};
use crate::state::RunContext;
use crate::transport::Transport;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What happened to one feed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedOutcome {
    /// Not modified since the previous run
    Unchanged,
    /// The feed could not be fetched; the run is flagged
    FetchFailed,
    /// The document was not a usable feed; the run is flagged
    ParseFailed,
    /// Entries were examined and `submitted` episodes queued
    Processed {
        /// Episode jobs handed to the episode pool
        submitted: usize,
    },
}

/// Pool job wrapping [`process_feed`]
pub struct FeedJob {
    source: Source,
    ctx: Arc<RunContext>,
    settings: Arc<Settings>,
    transport: Arc<dyn Transport>,
    episodes: PoolHandle<EpisodeJob>,
}

impl FeedJob {
    /// Bind a source to the shared run state and the episode pool
    pub fn new(
        source: Source,
        ctx: Arc<RunContext>,
        settings: Arc<Settings>,
        transport: Arc<dyn Transport>,
        episodes: PoolHandle<EpisodeJob>,
    ) -> Self {
        Self {
            source,
            ctx,
            settings,
            transport,
            episodes,
        }
    }
}

impl Job for FeedJob {
    fn run(self) {
        process_feed(
            &self.source,
            &self.ctx,
            &self.settings,
            &self.transport,
            &self.episodes,
        );
    }
}

/// Fetch, filter and enqueue the episodes of one source
pub fn process_feed(
    source: &Source,
    ctx: &Arc<RunContext>,
    settings: &Arc<Settings>,
    transport: &Arc<dyn Transport>,
    episodes: &PoolHandle<EpisodeJob>,
) -> FeedOutcome {
    if !url_has_changed(ctx, settings, transport.as_ref(), source.url()) {
        debug!(cast = source.label(), "feed unchanged since last run");
        return FeedOutcome::Unchanged;
    }

    let body = match transport.fetch(source.url()) {
        Ok(body) => body,
        Err(e) => {
            warn!(cast = source.label(), url = source.url(), error = %e, "Failed to fetch feed");
            ctx.flag_error();
            return FeedOutcome::FetchFailed;
        }
    };

    let entries = match parse_feed(&body) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(cast = source.label(), url = source.url(), error = %e, "Failed to parse feed");
            ctx.flag_error();
            return FeedOutcome::ParseFailed;
        }
    };

    let allow_explicit = source.allows_explicit(settings.download.allow_explicit);
    let limit = entry_window(settings.download.recent_num(), ctx.is_first_run());
    let mut submitted = 0;

    for entry in entries.iter().take(limit) {
        if !entry.is_fresh(ctx.last_download()) {
            continue;
        }
        if !entry.passes_explicit_filter(allow_explicit) {
            debug!(cast = source.label(), marker = ?entry.explicit, "skipping explicit entry");
            continue;
        }
        let Some(episode) = episode_from_entry(source, entry) else {
            error!(cast = source.label(), "Couldn't find URL for episode");
            ctx.flag_error();
            continue;
        };

        let job = EpisodeJob::new(
            episode,
            Arc::clone(ctx),
            Arc::clone(settings),
            Arc::clone(transport),
        );
        match episodes.submit(job) {
            Ok(()) => submitted += 1,
            Err(e) => {
                error!(cast = source.label(), error = %e, "Failed to queue episode");
                ctx.flag_error();
            }
        }
    }

    info!(cast = source.label(), entries = entries.len(), submitted, "Feed processed");
    FeedOutcome::Processed { submitted }
}

/// How many leading entries to consider
///
/// `recent` of zero means no limit, except on the very first run where only
/// the newest entry is taken to avoid a bulk backfill.
pub fn entry_window(recent: usize, first_run: bool) -> usize {
    match recent {
        0 if first_run => 1,
        0 => usize::MAX,
        n => n,
    }
}

fn episode_from_entry(source: &Source, entry: &FeedEntry) -> Option<Episode> {
    let url = entry.enclosure_url.as_deref()?;
    Some(Episode::new(url, source).with_size_hint(entry.size_hint()))
}
