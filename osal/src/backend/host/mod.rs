//!
//! POSIX Host Backend
//!
//! Threads map onto `std::thread` with the native pthread kept reachable
//! for priority and suspension control. The completion event joinable
//! threads wait on is a `Mutex<bool>` + `Condvar` pair; suspension uses a
//! reserved-signal protocol (see `suspend.rs`).
//!
//! The backend reserves `SIGUSR1`/`SIGUSR2` process-wide once the first
//! suspension is requested; applications that install their own handlers
//! for those signals cannot use `suspend`/`resume`.
//!

use std::os::unix::thread::JoinHandleExt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex as StdMutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::{ThreadConfig, WAIT_FOREVER};
use crate::error::SpawnError;
use crate::thread::{Job, ThreadControl, ThreadState};

mod lock;
mod suspend;

pub use lock::{Mutex, RecursiveMutex};

const STATE_CREATED: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_SUSPENDED: u8 = 2;
const STATE_TERMINATED: u8 = 3;

/// Delays the calling thread for `ms` milliseconds.
pub fn sleep(ms: u32) {
    thread::sleep(Duration::from_millis(u64::from(ms)));
}

/// Locks a mutex, recovering the guard if a panicking holder poisoned it.
/// The lock primitives promise boolean failure, never a propagated panic.
fn lock_unpoisoned<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Completion event for joinable threads: flips to signalled exactly once,
/// when the job returns, and never reverses.
struct Completion {
    done: StdMutex<bool>,
    cond: Condvar,
}

impl Completion {
    fn new() -> Self {
        Self {
            done: StdMutex::new(false),
            cond: Condvar::new(),
        }
    }

    fn signal(&self) {
        let mut done = lock_unpoisoned(&self.done);
        *done = true;
        self.cond.notify_all();
    }

    fn wait(&self, timeout_ms: u32) -> bool {
        let mut done = lock_unpoisoned(&self.done);
        if timeout_ms == WAIT_FOREVER {
            while !*done {
                done = self
                    .cond
                    .wait(done)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
            }
            return true;
        }
        let timeout = Duration::from_millis(u64::from(timeout_ms));
        let (done, _timed_out) = self
            .cond
            .wait_timeout_while(done, timeout, |done| !*done)
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *done
    }
}

/// State shared between the thread object, the spawned execution unit and
/// the suspension signal handler.
struct Shared {
    state: AtomicU8,
    /// Last successfully applied priority.
    priority: AtomicI32,
    /// Suspension request flag, read by the signal handler on the target
    /// thread.
    suspended: AtomicBool,
    completion: Option<Completion>,
}

/// A host thread bound to a [`Job`].
///
/// The `JoinHandle` is retained (never std-joined; completion is observed
/// through the [`Completion`] event) so the underlying `pthread_t` stays
/// valid for priority and suspension calls. Dropping the thread object
/// detaches a still-running unit.
pub struct Thread<J: Job> {
    config: ThreadConfig,
    job: Arc<J>,
    shared: Arc<Shared>,
    native: StdMutex<Option<JoinHandle<()>>>,
}

impl<J: Job> Thread<J> {
    pub fn new(config: ThreadConfig, job: J) -> Self {
        let completion = config.joinable.is_joinable().then(Completion::new);
        let shared = Shared {
            state: AtomicU8::new(STATE_CREATED),
            priority: AtomicI32::new(config.priority),
            suspended: AtomicBool::new(false),
            completion,
        };
        Self {
            config,
            job: Arc::new(job),
            shared: Arc::new(shared),
            native: StdMutex::new(None),
        }
    }

    /// The job this thread was constructed with.
    pub fn job(&self) -> &J {
        &self.job
    }

    /// Host-only variant of [`ThreadControl::run`] that reports the
    /// creation failure cause instead of reducing it to a boolean.
    pub fn try_run(&self) -> Result<(), SpawnError> {
        if self
            .shared
            .state
            .compare_exchange(
                STATE_CREATED,
                STATE_RUNNING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return Err(SpawnError::AlreadyStarted {
                name: self.config.name,
            });
        }

        let mut builder = thread::Builder::new().name(self.config.name.to_string());
        if self.config.stack_size > 0 {
            builder = builder.stack_size(self.config.stack_size);
        }

        let shared = Arc::clone(&self.shared);
        let job = Arc::clone(&self.job);
        let name = self.config.name;
        match builder.spawn(move || trampoline(job, shared, name)) {
            Ok(handle) => {
                self.apply_initial_priority(&handle);
                *lock_unpoisoned(&self.native) = Some(handle);
                Ok(())
            }
            Err(err) => {
                // The unit was never created; the thread object stays
                // startable so the caller can decide whether to retry.
                self.shared.state.store(STATE_CREATED, Ordering::Release);
                Err(SpawnError::Create(err))
            }
        }
    }

    /// Applies the configured priority to the freshly spawned unit. A
    /// refused request does not fail `run`; the cache is corrected to what
    /// the scheduler actually reports so `priority` never shows a value
    /// that was not applied.
    fn apply_initial_priority(&self, handle: &JoinHandle<()>) {
        let requested = self.shared.priority.load(Ordering::Acquire);
        let pthread = handle.as_pthread_t();
        if pthread_set_priority(pthread, requested) {
            return;
        }
        tracing::warn!(
            thread = self.config.name,
            priority = requested,
            "host scheduler rejected the creation priority"
        );
        if let Some(actual) = pthread_get_priority(pthread) {
            self.shared.priority.store(actual, Ordering::Release);
        }
    }
}

fn trampoline(job: Arc<impl Job>, shared: Arc<Shared>, name: &'static str) {
    if panic::catch_unwind(AssertUnwindSafe(|| job.job())).is_err() {
        tracing::error!(thread = name, "job panicked");
    }
    shared.state.store(STATE_TERMINATED, Ordering::Release);
    if let Some(completion) = &shared.completion {
        completion.signal();
    }
}

impl<J: Job> ThreadControl for Thread<J> {
    fn run(&self) -> bool {
        match self.try_run() {
            Ok(()) => true,
            Err(err @ SpawnError::Create(_)) => {
                tracing::error!(thread = self.config.name, error = %err, "thread start failed");
                false
            }
            Err(SpawnError::AlreadyStarted { .. }) => false,
        }
    }

    fn state(&self) -> ThreadState {
        match self.shared.state.load(Ordering::Acquire) {
            STATE_CREATED => ThreadState::Created,
            STATE_RUNNING => ThreadState::Running,
            STATE_SUSPENDED => ThreadState::Suspended,
            _ => ThreadState::Terminated,
        }
    }

    fn join(&self, timeout_ms: u32) -> bool {
        match &self.shared.completion {
            Some(completion) => completion.wait(timeout_ms),
            None => false,
        }
    }

    fn is_joinable(&self) -> bool {
        self.config.joinable.is_joinable()
    }

    fn suspend(&self) -> bool {
        if self.shared.state.load(Ordering::Acquire) != STATE_RUNNING {
            return false;
        }
        let native = lock_unpoisoned(&self.native);
        match native.as_ref() {
            Some(handle) => suspend::park(handle.as_pthread_t(), &self.shared),
            None => false,
        }
    }

    fn resume(&self) -> bool {
        if self.shared.state.load(Ordering::Acquire) != STATE_SUSPENDED {
            return false;
        }
        let native = lock_unpoisoned(&self.native);
        match native.as_ref() {
            Some(handle) => suspend::unpark(handle.as_pthread_t(), &self.shared),
            None => false,
        }
    }

    fn set_priority(&self, priority: i32) -> bool {
        let native = lock_unpoisoned(&self.native);
        match native.as_ref() {
            // Not started yet: the request becomes the creation priority.
            None => {
                self.shared.priority.store(priority, Ordering::Release);
                true
            }
            Some(handle) => {
                if pthread_set_priority(handle.as_pthread_t(), priority) {
                    self.shared.priority.store(priority, Ordering::Release);
                    true
                } else {
                    tracing::warn!(
                        thread = self.config.name,
                        priority,
                        "host scheduler rejected priority change"
                    );
                    false
                }
            }
        }
    }

    fn priority(&self) -> i32 {
        self.shared.priority.load(Ordering::Acquire)
    }

    fn name(&self) -> &'static str {
        self.config.name
    }
}

fn pthread_get_priority(handle: libc::pthread_t) -> Option<i32> {
    let mut policy: libc::c_int = 0;
    let mut param: libc::sched_param = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::pthread_getschedparam(handle, &mut policy, &mut param) };
    (rc == 0).then_some(param.sched_priority)
}

fn pthread_set_priority(handle: libc::pthread_t, priority: i32) -> bool {
    let mut policy: libc::c_int = 0;
    let mut param: libc::sched_param = unsafe { std::mem::zeroed() };
    if unsafe { libc::pthread_getschedparam(handle, &mut policy, &mut param) } != 0 {
        return false;
    }
    param.sched_priority = priority;
    unsafe { libc::pthread_setschedparam(handle, policy, &param) == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountJob {
        hits: AtomicUsize,
    }

    impl Job for CountJob {
        fn job(&self) {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_completion_signals_once() {
        let completion = Completion::new();
        assert!(!completion.wait(0));
        assert!(!completion.wait(20));
        completion.signal();
        assert!(completion.wait(0));
        assert!(completion.wait(0));
        assert!(completion.wait(WAIT_FOREVER));
    }

    #[test]
    fn test_job_runs_exactly_once() {
        let t = Thread::new(
            ThreadConfig::new(0, 0, crate::config::Joinable::Joinable),
            CountJob {
                hits: AtomicUsize::new(0),
            },
        );
        assert_eq!(t.state(), ThreadState::Created);
        assert!(t.run());
        assert!(t.join(WAIT_FOREVER));
        assert_eq!(t.job().hits.load(Ordering::SeqCst), 1);
        assert_eq!(t.state(), ThreadState::Terminated);
    }

    #[test]
    fn test_panicking_job_still_completes() {
        struct PanicJob;
        impl Job for PanicJob {
            fn job(&self) {
                panic!("boom");
            }
        }

        let t = Thread::new(
            ThreadConfig::new(0, 0, crate::config::Joinable::Joinable).named("panicky"),
            PanicJob,
        );
        assert!(t.run());
        assert!(t.join(WAIT_FOREVER));
        assert_eq!(t.state(), ThreadState::Terminated);
    }
}
