//!
//! Cooperative-Loop Thread
//!
//! A ready-made lifecycle for "run until signalled to stop" workloads:
//! `begin` once, `cycle` repeatedly, `end` once. Termination is strictly
//! cooperative: [`CyclicThread::kill`] raises a flag that the loop
//! observes at the next iteration boundary; an in-progress `cycle` is
//! never preempted. `kill` followed by `join` is the shutdown sequence.
//!

use core::sync::atomic::{AtomicBool, Ordering};

use crate::backend::Thread;
use crate::config::{Joinable, ThreadConfig};
use crate::thread::{Job, ThreadControl, ThreadState};

/// The workload of a cooperative-loop thread.
///
/// `begin` and `end` each run exactly once per lifetime, bracketing zero
/// or more `cycle` calls (zero when the kill flag was already raised when
/// the loop first checked it).
pub trait CyclicJob: Send + Sync + 'static {
    fn begin(&self);
    fn cycle(&self);
    fn end(&self);
}

struct Cycle<J: CyclicJob> {
    job: J,
    kill: AtomicBool,
}

impl<J: CyclicJob> Job for Cycle<J> {
    fn job(&self) {
        self.job.begin();
        while !self.kill.load(Ordering::Acquire) {
            self.job.cycle();
        }
        self.job.end();
    }
}

/// A thread that repeats a work step until killed.
///
/// Always joinable, regardless of what the supplied configuration says:
/// the documented shutdown sequence is `kill()` then `join()`, and the
/// latter must be able to observe completion of `end`.
pub struct CyclicThread<J: CyclicJob> {
    thread: Thread<Cycle<J>>,
}

impl<J: CyclicJob> CyclicThread<J> {
    pub fn new(config: ThreadConfig, job: J) -> Self {
        let config = ThreadConfig {
            joinable: Joinable::Joinable,
            ..config
        };
        Self {
            thread: Thread::new(
                config,
                Cycle {
                    job,
                    kill: AtomicBool::new(false),
                },
            ),
        }
    }

    /// The workload this thread was constructed with.
    pub fn job(&self) -> &J {
        &self.thread.job().job
    }

    /// Requests cooperative termination.
    ///
    /// Safe to call from any thread and idempotent. Does not preempt an
    /// in-progress `cycle`; the loop exits at the next iteration boundary
    /// and runs `end` before completing.
    pub fn kill(&self) {
        self.thread.job().kill.store(true, Ordering::Release);
    }
}

impl<J: CyclicJob> ThreadControl for CyclicThread<J> {
    fn run(&self) -> bool {
        self.thread.run()
    }

    fn state(&self) -> ThreadState {
        self.thread.state()
    }

    fn join(&self, timeout_ms: u32) -> bool {
        self.thread.join(timeout_ms)
    }

    fn is_joinable(&self) -> bool {
        self.thread.is_joinable()
    }

    fn suspend(&self) -> bool {
        self.thread.suspend()
    }

    fn resume(&self) -> bool {
        self.thread.resume()
    }

    fn set_priority(&self, priority: i32) -> bool {
        self.thread.set_priority(priority)
    }

    fn priority(&self) -> i32 {
        self.thread.priority()
    }

    fn name(&self) -> &'static str {
        self.thread.name()
    }
}
