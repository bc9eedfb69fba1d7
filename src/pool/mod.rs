//! Bounded-concurrency FIFO task pool
//!
//! A [`TaskPool`] owns a fixed set of worker threads that pull jobs from a
//! single FIFO queue. It knows nothing about feeds or downloads; the pipeline
//! runs one pool of [`FeedJob`](crate::feed_task::FeedJob)s and one pool of
//! [`EpisodeJob`](crate::downloader::EpisodeJob)s.
//!
//! ## Quiescence
//!
//! The queue and the count of workers currently running a job are guarded by
//! the same mutex. A worker bumps the active count in the same critical
//! section in which it dequeues, so [`TaskPool::drain`] can never observe an
//! empty queue while a dequeued job has not started yet. A pool is quiescent
//! when the queue is empty *and* no worker is active.
//!
//! ## Shutdown
//!
//! [`TaskPool::shutdown`] drops every queued job that has not started,
//! lets in-flight jobs finish and joins all workers. Dropping the pool does
//! the same.
//!
//! ## Usage
//!
//! ```
//! use poddown::pool::{BoxedJob, TaskPool};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! # fn main() -> poddown::Result<()> {
//! let pool: TaskPool<BoxedJob> = TaskPool::new("example", 4)?;
//! let done = Arc::new(AtomicUsize::new(0));
//!
//! for _ in 0..16 {
//!     let done = Arc::clone(&done);
//!     pool.submit(Box::new(move || {
//!         done.fetch_add(1, Ordering::SeqCst);
//!     }))?;
//! }
//!
//! pool.drain();
//! assert_eq!(done.load(Ordering::SeqCst), 16);
//! pool.shutdown();
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

/// Worker count used when a pool is created with zero workers
pub const DEFAULT_WORKERS: usize = 2;

/// A unit of work executed by a pool worker
///
/// Jobs handle their own failures; nothing a job returns crosses the pool
/// boundary. A panicking job is caught and logged so the pool's bookkeeping
/// stays intact.
pub trait Job: Send + 'static {
    /// Execute the job to completion on the calling worker thread
    fn run(self);
}

/// Boxed closure job, handy for ad-hoc pools
pub type BoxedJob = Box<dyn FnOnce() + Send + 'static>;

impl Job for BoxedJob {
    fn run(self) {
        self()
    }
}

struct PoolState<J> {
    /// Jobs waiting for a worker, oldest first
    queue: VecDeque<J>,
    /// Workers currently running a job
    active: usize,
    /// Set once by shutdown; workers exit and submissions are refused
    stopping: bool,
}

struct Shared<J> {
    name: String,
    state: Mutex<PoolState<J>>,
    /// Signalled on submission and on shutdown
    work_ready: Condvar,
    /// Signalled when the pool becomes quiescent
    idle: Condvar,
}

impl<J> Shared<J> {
    fn lock(&self) -> MutexGuard<'_, PoolState<J>> {
        // Jobs never run under the lock, so a poisoned lock still holds consistent state
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn submit(&self, job: J) -> Result<()> {
        let mut state = self.lock();
        if state.stopping {
            return Err(Error::ShuttingDown);
        }
        state.queue.push_back(job);
        drop(state);
        self.work_ready.notify_one();
        Ok(())
    }
}

/// Fixed-size pool of worker threads draining a FIFO queue
pub struct TaskPool<J: Job> {
    shared: Arc<Shared<J>>,
    workers: Vec<JoinHandle<()>>,
}

impl<J: Job> TaskPool<J> {
    /// Start a pool with `workers` threads (0 means [`DEFAULT_WORKERS`])
    ///
    /// Worker threads are named `<name>-<index>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if a worker thread cannot be spawned. Any workers
    /// already started are stopped and joined first.
    pub fn new(name: &str, workers: usize) -> Result<Self> {
        let count = if workers == 0 { DEFAULT_WORKERS } else { workers };
        let shared = Arc::new(Shared {
            name: name.to_string(),
            state: Mutex::new(PoolState {
                queue: VecDeque::new(),
                active: 0,
                stopping: false,
            }),
            work_ready: Condvar::new(),
            idle: Condvar::new(),
        });

        let mut pool = Self {
            shared,
            workers: Vec::with_capacity(count),
        };

        for index in 0..count {
            let shared = Arc::clone(&pool.shared);
            let spawned = thread::Builder::new()
                .name(format!("{name}-{index}"))
                .spawn(move || worker_loop(shared));
            match spawned {
                Ok(handle) => pool.workers.push(handle),
                Err(e) => {
                    pool.stop_and_join();
                    return Err(e.into());
                }
            }
        }

        debug!(pool = name, workers = count, "task pool started");
        Ok(pool)
    }

    /// Queue a job for execution
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShuttingDown`] once the pool has begun shutting down.
    pub fn submit(&self, job: J) -> Result<()> {
        self.shared.submit(job)
    }

    /// A cloneable submission handle that can be moved into other jobs
    #[must_use]
    pub fn handle(&self) -> PoolHandle<J> {
        PoolHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Block until the queue is empty and no worker is running a job
    ///
    /// Jobs submitted while draining (including from inside running jobs)
    /// are waited for as well.
    pub fn drain(&self) {
        let mut state = self.shared.lock();
        while !(state.queue.is_empty() && state.active == 0) {
            state = self
                .shared
                .idle
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Discard queued jobs, wait for running jobs, and stop all workers
    ///
    /// Returns the number of queued jobs that were discarded without running.
    pub fn shutdown(mut self) -> usize {
        self.stop_and_join()
    }

    /// Number of worker threads
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    /// Jobs waiting for a worker
    #[must_use]
    pub fn queued(&self) -> usize {
        self.shared.lock().queue.len()
    }

    /// Workers currently running a job
    #[must_use]
    pub fn active(&self) -> usize {
        self.shared.lock().active
    }

    fn stop_and_join(&mut self) -> usize {
        let dropped_jobs = {
            let mut state = self.shared.lock();
            state.stopping = true;
            std::mem::take(&mut state.queue)
        };
        self.shared.work_ready.notify_all();
        let discarded = dropped_jobs.len();
        drop(dropped_jobs);

        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!(pool = %self.shared.name, "worker thread exited abnormally");
            }
        }

        if discarded > 0 {
            debug!(pool = %self.shared.name, discarded, "discarded queued jobs on shutdown");
        }
        discarded
    }
}

impl<J: Job> Drop for TaskPool<J> {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.stop_and_join();
        }
    }
}

/// Submission handle for a [`TaskPool`]
///
/// Handles can outlive the pool; submitting after shutdown fails with
/// [`Error::ShuttingDown`].
pub struct PoolHandle<J> {
    shared: Arc<Shared<J>>,
}

impl<J> Clone for PoolHandle<J> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<J: Job> PoolHandle<J> {
    /// Queue a job for execution
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShuttingDown`] once the pool has begun shutting down.
    pub fn submit(&self, job: J) -> Result<()> {
        self.shared.submit(job)
    }
}

fn worker_loop<J: Job>(shared: Arc<Shared<J>>) {
    loop {
        let job = {
            let mut state = shared.lock();
            while state.queue.is_empty() && !state.stopping {
                state = shared
                    .work_ready
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            if state.stopping {
                break;
            }
            // Counted as active before the job is even looked at
            state.active += 1;
            state.queue.pop_front()
        };

        if let Some(job) = job
            && let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| job.run()))
        {
            error!(pool = %shared.name, panic = panic_message(&*payload), "job panicked");
        }

        let mut state = shared.lock();
        state.active -= 1;
        if state.active == 0 && state.queue.is_empty() {
            shared.idle.notify_all();
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
