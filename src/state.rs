//! Run-level state shared by every job
//!
//! A run has exactly two pieces of cross-thread state:
//! - the prior-run timestamp (`lastdl`), read once before any job starts and
//!   read-only afterwards
//! - a "something failed" flag that any job may set and that is only read
//!   after both pools have drained
//!
//! Both live in [`RunContext`], which is handed to every job as an `Arc`.
//! The prior-run timestamp persists between runs in a one-line marker file.

use crate::error::Result;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Shared state for one run of the pipeline
#[derive(Debug)]
pub struct RunContext {
    /// Start of the previous successful run (seconds since epoch, 0 = never)
    last_download: i64,
    /// Start of this run; becomes the next run's `last_download`
    started_at: i64,
    /// Set by any job that hits a recoverable failure
    had_error: AtomicBool,
}

impl RunContext {
    /// Create the context for a run that started at `started_at`
    #[must_use]
    pub fn new(last_download: i64, started_at: i64) -> Self {
        Self {
            last_download: last_download.max(0),
            started_at,
            had_error: AtomicBool::new(false),
        }
    }

    /// Timestamp of the previous run, 0 if there was none
    #[must_use]
    pub fn last_download(&self) -> i64 {
        self.last_download
    }

    /// Timestamp captured when this run started
    #[must_use]
    pub fn started_at(&self) -> i64 {
        self.started_at
    }

    /// No previous run has been recorded
    #[must_use]
    pub fn is_first_run(&self) -> bool {
        self.last_download == 0
    }

    /// Record that a recoverable failure happened somewhere in the run
    pub fn flag_error(&self) {
        self.had_error.store(true, Ordering::Release);
    }

    /// Whether any job flagged an error
    #[must_use]
    pub fn had_error(&self) -> bool {
        self.had_error.load(Ordering::Acquire)
    }

    /// Whether the marker file should be moved forward to [`started_at`](Self::started_at)
    #[must_use]
    pub fn should_advance(&self, update_on_error: bool) -> bool {
        !self.had_error() || update_on_error
    }
}

/// Current wall-clock time in seconds since the epoch
#[must_use]
pub fn now_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Read the prior-run timestamp from the marker file
///
/// A missing, unreadable, unparsable or negative marker means "first run" (0).
#[must_use]
pub fn read_last_download(path: &Path) -> i64 {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no prior-run marker, treating as first run");
            return 0;
        }
    };

    match raw.trim().parse::<i64>() {
        Ok(ts) if ts > 0 => ts,
        Ok(_) => 0,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unparsable prior-run marker");
            0
        }
    }
}

/// Persist `timestamp` as the prior-run marker
///
/// If the write fails the marker is removed, so the next run never sees a
/// half-written value.
///
/// # Errors
///
/// Returns the write error after attempting the cleanup.
pub fn write_last_download(path: &Path, timestamp: i64) -> Result<()> {
    if let Err(e) = std::fs::write(path, timestamp.to_string()) {
        let _ = std::fs::remove_file(path);
        return Err(e.into());
    }
    debug!(path = %path.display(), timestamp, "prior-run marker updated");
    Ok(())
}
