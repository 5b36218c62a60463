///
/// osal-stress - concurrency smoke tool for the osal host backend
///
/// Spawns N cooperative worker threads that contend on the exclusive
/// lock, each bumping a plain (non-atomic) counter inside the critical
/// section. After the requested duration the workers are killed and
/// joined, and the counter is checked against the recorded hit total: a
/// mismatch means the lock failed to exclude.
///

use std::cell::UnsafeCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use clap::Parser;

use osal::{
    CyclicJob, CyclicThread, Joinable, Mutex, RawLock, ThreadConfig, ThreadControl, WAIT_FOREVER,
};

#[derive(Parser)]
#[command(name = "osal-stress", about = "Stress the portable thread and lock layer", long_about = None)]
struct Cli {
    /// Number of worker threads
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// How long to run, in milliseconds
    #[arg(long, default_value_t = 1000)]
    duration_ms: u64,

    /// Per-iteration lock acquisition timeout, in milliseconds
    #[arg(long, default_value_t = 100)]
    lock_timeout_ms: u32,
}

/// The value the lock protects. Deliberately non-atomic: only the lock
/// keeps the increments race-free.
struct GuardedCounter(UnsafeCell<u64>);

// Access is serialized by the exclusive lock around every touch.
unsafe impl Sync for GuardedCounter {}

struct SharedState {
    lock: Mutex,
    counter: GuardedCounter,
    hits: AtomicU64,
    misses: AtomicU64,
}

struct Worker {
    shared: Arc<SharedState>,
    lock_timeout_ms: u32,
}

impl CyclicJob for Worker {
    fn begin(&self) {
        tracing::debug!("worker starting");
    }

    fn cycle(&self) {
        if self.shared.lock.lock(self.lock_timeout_ms) {
            unsafe { *self.shared.counter.0.get() += 1 };
            self.shared.lock.unlock();
            self.shared.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.shared.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn end(&self) {
        tracing::debug!("worker stopping");
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();

    let shared = Arc::new(SharedState {
        lock: Mutex::new(),
        counter: GuardedCounter(UnsafeCell::new(0)),
        hits: AtomicU64::new(0),
        misses: AtomicU64::new(0),
    });

    let workers: Vec<_> = (0..cli.workers)
        .map(|_| {
            CyclicThread::new(
                ThreadConfig::new(0, 0, Joinable::Joinable).named("stress-worker"),
                Worker {
                    shared: Arc::clone(&shared),
                    lock_timeout_ms: cli.lock_timeout_ms,
                },
            )
        })
        .collect();

    let started = Instant::now();
    let mut running = 0usize;
    for worker in &workers {
        if worker.run() {
            running += 1;
        } else {
            tracing::error!("worker failed to start");
        }
    }
    tracing::info!(running, requested = cli.workers, "workers started");

    std::thread::sleep(Duration::from_millis(cli.duration_ms));

    for worker in &workers {
        worker.kill();
    }
    for worker in &workers {
        if !worker.join(WAIT_FOREVER) {
            tracing::error!(name = worker.name(), "worker failed to join");
        }
    }
    let elapsed = started.elapsed();

    let hits = shared.hits.load(Ordering::Relaxed);
    let misses = shared.misses.load(Ordering::Relaxed);
    let counted = unsafe { *shared.counter.0.get() };

    println!("workers:   {running}");
    println!("elapsed:   {elapsed:?}");
    println!("acquired:  {hits}");
    println!("timed out: {misses}");
    println!("counter:   {counted}");

    if counted != hits {
        tracing::error!(counted, hits, "lock failed to exclude");
        std::process::exit(1);
    }
}
