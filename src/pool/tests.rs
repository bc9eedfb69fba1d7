use super::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::Duration;

fn counting_job(counter: &Arc<AtomicUsize>) -> BoxedJob {
    let counter = Arc::clone(counter);
    Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

// ---------------------------------------------------------------
// creation
// ---------------------------------------------------------------

#[test]
fn zero_workers_defaults_to_minimum() {
    let pool: TaskPool<BoxedJob> = TaskPool::new("zero", 0).unwrap();
    assert_eq!(pool.workers(), DEFAULT_WORKERS);
    pool.shutdown();
}

#[test]
fn requested_worker_count_is_honored() {
    let pool: TaskPool<BoxedJob> = TaskPool::new("five", 5).unwrap();
    assert_eq!(pool.workers(), 5);
    assert_eq!(pool.queued(), 0);
    assert_eq!(pool.active(), 0);
    pool.shutdown();
}

// ---------------------------------------------------------------
// drain
// ---------------------------------------------------------------

#[test]
fn drain_on_idle_pool_returns_immediately() {
    let pool: TaskPool<BoxedJob> = TaskPool::new("idle", 3).unwrap();
    pool.drain();
    pool.drain();
    pool.shutdown();
}

#[test]
fn every_job_runs_exactly_once_before_drain_returns() {
    for n in [1usize, 7, 200] {
        let pool: TaskPool<BoxedJob> = TaskPool::new("once", 4).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        for i in 0..n {
            let counter = Arc::clone(&counter);
            pool.submit(Box::new(move || {
                if i % 10 == 0 {
                    std::thread::sleep(Duration::from_millis(2));
                }
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        }

        pool.drain();
        assert_eq!(counter.load(Ordering::SeqCst), n, "n = {n}");
        assert_eq!(pool.queued(), 0);
        assert_eq!(pool.active(), 0);
        assert_eq!(pool.shutdown(), 0, "nothing left to discard after drain");
    }
}

#[test]
fn drain_waits_for_jobs_submitted_by_running_jobs() {
    let pool: TaskPool<BoxedJob> = TaskPool::new("nested", 2).unwrap();
    let handle = pool.handle();
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..5 {
        let handle = handle.clone();
        let counter = Arc::clone(&counter);
        pool.submit(Box::new(move || {
            std::thread::sleep(Duration::from_millis(5));
            for _ in 0..3 {
                handle.submit(counting_job(&counter)).unwrap();
            }
        }))
        .unwrap();
    }

    pool.drain();
    assert_eq!(counter.load(Ordering::SeqCst), 15);
    pool.shutdown();
}

#[test]
fn drain_survives_a_panicking_job() {
    let pool: TaskPool<BoxedJob> = TaskPool::new("panic", 1).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    pool.submit(Box::new(|| panic!("boom"))).unwrap();
    pool.submit(counting_job(&counter)).unwrap();

    pool.drain();
    assert_eq!(counter.load(Ordering::SeqCst), 1, "worker keeps going after a panic");
    assert_eq!(pool.active(), 0);
    pool.shutdown();
}

// ---------------------------------------------------------------
// ordering and concurrency
// ---------------------------------------------------------------

#[test]
fn single_worker_runs_jobs_in_fifo_order() {
    let pool: TaskPool<BoxedJob> = TaskPool::new("fifo", 1).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));

    for i in 0..50 {
        let seen = Arc::clone(&seen);
        pool.submit(Box::new(move || seen.lock().unwrap().push(i)))
            .unwrap();
    }

    pool.drain();
    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen, (0..50).collect::<Vec<_>>());
    pool.shutdown();
}

#[test]
fn concurrency_never_exceeds_worker_count() {
    let pool: TaskPool<BoxedJob> = TaskPool::new("bounded", 3).unwrap();
    let current = Arc::new(AtomicUsize::new(0));
    let max = Arc::new(AtomicUsize::new(0));

    for _ in 0..24 {
        let current = Arc::clone(&current);
        let max = Arc::clone(&max);
        pool.submit(Box::new(move || {
            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
            max.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(10));
            current.fetch_sub(1, Ordering::SeqCst);
        }))
        .unwrap();
    }

    pool.drain();
    let observed = max.load(Ordering::SeqCst);
    assert!(observed <= 3, "observed {observed} concurrent jobs");
    assert!(observed >= 1);
    pool.shutdown();
}

// ---------------------------------------------------------------
// shutdown
// ---------------------------------------------------------------

#[test]
fn shutdown_discards_queued_and_finishes_running() {
    let pool: TaskPool<BoxedJob> = TaskPool::new("stop", 1).unwrap();
    let (started_tx, started_rx) = mpsc::channel();
    let finished = Arc::new(AtomicBool::new(false));
    let counter = Arc::new(AtomicUsize::new(0));

    {
        let finished = Arc::clone(&finished);
        pool.submit(Box::new(move || {
            started_tx.send(()).unwrap();
            std::thread::sleep(Duration::from_millis(100));
            finished.store(true, Ordering::SeqCst);
        }))
        .unwrap();
    }

    // The single worker is now busy, so everything below stays queued
    started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    for _ in 0..4 {
        pool.submit(counting_job(&counter)).unwrap();
    }

    let discarded = pool.shutdown();

    assert_eq!(discarded, 4);
    assert!(finished.load(Ordering::SeqCst), "in-flight job ran to completion");
    assert_eq!(counter.load(Ordering::SeqCst), 0, "queued jobs never ran");
}

#[test]
fn handle_submit_after_shutdown_fails() {
    let pool: TaskPool<BoxedJob> = TaskPool::new("late", 2).unwrap();
    let handle = pool.handle();
    pool.shutdown();

    let result = handle.submit(Box::new(|| {}));
    assert!(matches!(result, Err(Error::ShuttingDown)));
}

#[test]
fn dropping_pool_stops_workers() {
    let counter = Arc::new(AtomicUsize::new(0));
    let handle = {
        let pool: TaskPool<BoxedJob> = TaskPool::new("drop", 2).unwrap();
        pool.submit(counting_job(&counter)).unwrap();
        pool.drain();
        pool.handle()
    };

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert!(handle.submit(counting_job(&counter)).is_err());
}

#[test]
fn custom_job_types_run_through_the_pool() {
    struct Tally(Arc<AtomicUsize>, usize);

    impl Job for Tally {
        fn run(self) {
            self.0.fetch_add(self.1, Ordering::SeqCst);
        }
    }

    let pool: TaskPool<Tally> = TaskPool::new("typed", 2).unwrap();
    let total = Arc::new(AtomicUsize::new(0));
    for n in 1..=10 {
        pool.submit(Tally(Arc::clone(&total), n)).unwrap();
    }

    pool.drain();
    assert_eq!(total.load(Ordering::SeqCst), 55);
    pool.shutdown();
}
