//!
//! Thread lifecycle tests, exercised against the host backend.
//!

#![cfg(feature = "host")]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use osal::{
    CyclicJob, CyclicThread, Joinable, Job, SpawnError, Thread, ThreadConfig, ThreadControl,
    ThreadState, WAIT_FOREVER,
};

fn wait_until(pred: impl Fn() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if pred() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    pred()
}

struct QuickJob {
    ran: Arc<AtomicUsize>,
}

impl Job for QuickJob {
    fn job(&self) {
        self.ran.fetch_add(1, Ordering::SeqCst);
    }
}

/// Spins until told to stop, bumping a counter every pass.
struct SpinJob {
    ticks: Arc<AtomicUsize>,
    stop: Arc<AtomicBool>,
}

impl SpinJob {
    fn new() -> Self {
        Self {
            ticks: Arc::new(AtomicUsize::new(0)),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Job for SpinJob {
    fn job(&self) {
        while !self.stop.load(Ordering::SeqCst) {
            self.ticks.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(1));
        }
    }
}

#[test]
fn test_detached_join_always_fails() {
    let ran = Arc::new(AtomicUsize::new(0));
    let t = Thread::new(
        ThreadConfig::new(0, 0, Joinable::Detached),
        QuickJob { ran: Arc::clone(&ran) },
    );
    assert!(!t.is_joinable());
    assert!(!t.join(0));

    assert!(t.run());
    assert!(wait_until(
        || ran.load(Ordering::SeqCst) == 1,
        Duration::from_secs(5)
    ));

    // Still false after the workload finished.
    assert!(!t.join(0));
    assert!(!t.join(100));
}

#[test]
fn test_join_is_idempotent_after_completion() {
    let ran = Arc::new(AtomicUsize::new(0));
    let t = Thread::new(
        ThreadConfig::new(0, 0, Joinable::Joinable),
        QuickJob { ran: Arc::clone(&ran) },
    );
    assert!(t.is_joinable());
    assert!(t.run());
    assert!(t.join(WAIT_FOREVER));
    assert_eq!(ran.load(Ordering::SeqCst), 1);

    // No re-blocking once completed, whatever the timeout.
    assert!(t.join(0));
    assert!(t.join(5));
    assert!(t.join(WAIT_FOREVER));
    assert_eq!(t.state(), ThreadState::Terminated);
}

#[test]
fn test_second_run_is_a_no_op() {
    let job = SpinJob::new();
    let stop = Arc::clone(&job.stop);
    let ticks = Arc::clone(&job.ticks);
    let t = Thread::new(ThreadConfig::new(0, 0, Joinable::Joinable).named("spinner"), job);

    assert_eq!(t.state(), ThreadState::Created);
    assert!(t.run());
    assert!(!t.run());
    assert!(wait_until(
        || ticks.load(Ordering::SeqCst) > 0,
        Duration::from_secs(5)
    ));
    assert!(t.is_running());
    assert_eq!(t.name(), "spinner");

    stop.store(true, Ordering::SeqCst);
    assert!(t.join(WAIT_FOREVER));
    assert!(!t.is_running());
}

#[test]
fn test_run_reports_creation_failure() {
    // An unsatisfiable stack request forces the OS to refuse creation.
    let ran = Arc::new(AtomicUsize::new(0));
    let t = Thread::new(
        ThreadConfig::new(0, usize::MAX / 2, Joinable::Joinable),
        QuickJob { ran: Arc::clone(&ran) },
    );
    assert!(!t.run());
    assert!(!t.is_running());
    assert_eq!(t.state(), ThreadState::Created);
    assert_eq!(ran.load(Ordering::SeqCst), 0);

    // The host-only variant exposes the OS error behind the boolean.
    assert!(matches!(t.try_run(), Err(SpawnError::Create(_))));
}

#[test]
fn test_try_run_reports_already_started() {
    let job = SpinJob::new();
    let stop = Arc::clone(&job.stop);
    let t = Thread::new(ThreadConfig::new(0, 0, Joinable::Joinable), job);
    assert!(t.run());
    assert!(matches!(
        t.try_run(),
        Err(SpawnError::AlreadyStarted { name: "unnamed" })
    ));
    stop.store(true, Ordering::SeqCst);
    assert!(t.join(WAIT_FOREVER));
}

#[test]
fn test_suspend_freezes_and_resume_restarts() {
    let job = SpinJob::new();
    let stop = Arc::clone(&job.stop);
    let ticks = Arc::clone(&job.ticks);
    let t = Thread::new(ThreadConfig::new(0, 0, Joinable::Joinable), job);

    assert!(t.run());
    assert!(wait_until(
        || ticks.load(Ordering::SeqCst) > 0,
        Duration::from_secs(5)
    ));

    assert!(!t.resume(), "resume of a running thread must fail");
    assert!(t.suspend());
    assert_eq!(t.state(), ThreadState::Suspended);
    assert!(!t.is_running());
    assert!(!t.suspend(), "suspend of a suspended thread must fail");

    let frozen_at = ticks.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(ticks.load(Ordering::SeqCst), frozen_at);

    assert!(t.resume());
    assert!(t.is_running());
    assert!(wait_until(
        || ticks.load(Ordering::SeqCst) > frozen_at,
        Duration::from_secs(5)
    ));

    stop.store(true, Ordering::SeqCst);
    assert!(t.join(WAIT_FOREVER));
    assert_eq!(t.state(), ThreadState::Terminated);
}

#[test]
fn test_suspend_before_run_fails() {
    let t = Thread::new(
        ThreadConfig::new(0, 0, Joinable::Joinable),
        QuickJob {
            ran: Arc::new(AtomicUsize::new(0)),
        },
    );
    assert!(!t.suspend());
    assert!(!t.resume());
    assert_eq!(t.state(), ThreadState::Created);
}

#[test]
fn test_priority_tracks_applied_changes_only() {
    let job = SpinJob::new();
    let stop = Arc::clone(&job.stop);
    let t = Thread::new(ThreadConfig::new(0, 0, Joinable::Joinable), job);
    assert_eq!(t.priority(), 0);

    // Before run the request becomes the creation priority.
    assert!(t.set_priority(0));

    assert!(t.run());
    // Whatever the scheduler actually granted is re-appliable.
    let applied = t.priority();
    assert!(t.set_priority(applied));
    assert_eq!(t.priority(), applied);

    // No scheduling class admits this; the rejected request must not
    // leak into the cached value.
    assert!(!t.set_priority(1_000_000));
    assert_eq!(t.priority(), applied, "a rejected request must not be cached");

    stop.store(true, Ordering::SeqCst);
    assert!(t.join(WAIT_FOREVER));
}

#[derive(Default)]
struct Counters {
    begins: AtomicUsize,
    cycles: AtomicUsize,
    ends: AtomicUsize,
}

struct Worker {
    counters: Arc<Counters>,
    cycle_len: Duration,
}

impl CyclicJob for Worker {
    fn begin(&self) {
        self.counters.begins.fetch_add(1, Ordering::SeqCst);
    }

    fn cycle(&self) {
        self.counters.cycles.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.cycle_len);
    }

    fn end(&self) {
        self.counters.ends.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_kill_then_join_runs_end_exactly_once() {
    let counters = Arc::new(Counters::default());
    let w = CyclicThread::new(
        ThreadConfig::new(0, 0, Joinable::Joinable).named("worker"),
        Worker {
            counters: Arc::clone(&counters),
            cycle_len: Duration::from_millis(1),
        },
    );
    assert!(w.run());
    assert!(wait_until(
        || counters.cycles.load(Ordering::SeqCst) >= 3,
        Duration::from_secs(5)
    ));

    w.kill();
    w.kill(); // idempotent
    assert!(w.join(WAIT_FOREVER));
    assert!(w.join(0));

    assert_eq!(counters.begins.load(Ordering::SeqCst), 1);
    assert_eq!(counters.ends.load(Ordering::SeqCst), 1);
    assert!(counters.cycles.load(Ordering::SeqCst) >= 3);

    // The loop really stopped.
    let settled = counters.cycles.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(20));
    assert_eq!(counters.cycles.load(Ordering::SeqCst), settled);
}

#[test]
fn test_cyclic_thread_is_always_joinable() {
    let w = CyclicThread::new(
        ThreadConfig::new(0, 0, Joinable::Detached),
        Worker {
            counters: Arc::new(Counters::default()),
            cycle_len: Duration::from_millis(1),
        },
    );
    assert!(w.is_joinable());
    assert!(w.run());
    w.kill();
    assert!(w.join(WAIT_FOREVER));
}

struct SlowCycle {
    entered: Arc<AtomicUsize>,
    completed: Arc<AtomicUsize>,
}

impl CyclicJob for SlowCycle {
    fn begin(&self) {}

    fn cycle(&self) {
        self.entered.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(30));
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    fn end(&self) {}
}

#[test]
fn test_kill_does_not_preempt_a_cycle() {
    let entered = Arc::new(AtomicUsize::new(0));
    let completed = Arc::new(AtomicUsize::new(0));
    let w = CyclicThread::new(
        ThreadConfig::new(0, 0, Joinable::Joinable),
        SlowCycle {
            entered: Arc::clone(&entered),
            completed: Arc::clone(&completed),
        },
    );
    assert!(w.run());
    assert!(wait_until(
        || entered.load(Ordering::SeqCst) >= 1,
        Duration::from_secs(5)
    ));

    // Kill lands mid-cycle; the cycle must still finish.
    w.kill();
    assert!(w.join(WAIT_FOREVER));
    assert_eq!(
        entered.load(Ordering::SeqCst),
        completed.load(Ordering::SeqCst)
    );
}
