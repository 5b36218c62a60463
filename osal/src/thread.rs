//!
//! Portable Thread Lifecycle Contract
//!
//! Defines the traits every backend's thread type satisfies. The hard
//! requirement is not any single call but the lifecycle all backends must
//! honor identically:
//!
//! ```text
//! Created ──run()──> Running <──resume()── Suspended
//!                       │  └───suspend()───────^
//!                       └──job() returns──> Terminated
//! ```
//!
//! Suspended is reachable only from Running and returns only to Running;
//! Terminated is reached only from Running and is final. Backends report
//! richer native state sets (FreeRTOS `eTaskState`, CMSIS
//! `osThreadState_t`, host-tracked state); [`ThreadState`] is the
//! normalized view they all map onto.
//!

/// Normalized thread state.
///
/// A backend's {ready, running, blocked} all map to `Running`: a thread
/// waiting on a lock or a timed join is blocked by its own doing, not
/// suspended by request, and still counts as running for this contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThreadState {
    Created,
    Running,
    Suspended,
    Terminated,
}

/// A thread's work routine.
///
/// The backend trampoline invokes `job` exactly once per lifetime. The
/// implementor is shared with the spawned execution unit, hence the
/// `Send + Sync` bound.
pub trait Job: Send + Sync + 'static {
    fn job(&self);
}

/// The uniform lifecycle surface, one conforming implementation per
/// backend, selected at compile time.
///
/// All failure is a boolean result: timeouts, refused backend calls and
/// contract misuse (joining a detached thread) each report `false`; none
/// of them panic.
pub trait ThreadControl {
    /// Starts the thread.
    ///
    /// Valid only from [`ThreadState::Created`]; a second `run` on an
    /// already-started thread is a no-op returning `false` (restart is not
    /// supported by any built backend). Returns `true` iff the backend
    /// confirmed creation of the native execution unit; partial failure is
    /// never reported as success.
    fn run(&self) -> bool;

    /// Reports the normalized state of the underlying execution unit.
    fn state(&self) -> ThreadState;

    /// `true` while the backend reports the unit as ready, running or
    /// blocked. Suspension by request and termination both report `false`.
    fn is_running(&self) -> bool {
        self.state() == ThreadState::Running
    }

    /// Waits up to `timeout_ms` for the work routine to complete.
    ///
    /// Returns `false` immediately for detached threads. Idempotent:
    /// once a joinable thread has completed, every further `join` returns
    /// `true` without blocking, for any timeout including zero. Pass
    /// [`crate::WAIT_FOREVER`](crate::config::WAIT_FOREVER) to wait
    /// without bound.
    ///
    /// Joining a thread that was never started blocks until the timeout
    /// and returns `false`; doing so is caller misuse, not an error the
    /// implementation distinguishes.
    fn join(&self, timeout_ms: u32) -> bool;

    /// Whether the thread was configured joinable.
    fn is_joinable(&self) -> bool;

    /// Requests backend-level suspension of the execution unit.
    ///
    /// An asynchronous request: returns `true` iff the backend
    /// subsequently reports the unit as [`ThreadState::Suspended`].
    /// Suspending a unit that has not been started, or is already
    /// suspended or terminated, returns `false`.
    fn suspend(&self) -> bool;

    /// Requests resumption of a suspended unit.
    ///
    /// Returns `true` iff the backend subsequently reports the unit
    /// running again. Resuming a unit that is not suspended returns
    /// `false`.
    fn resume(&self) -> bool;

    /// Applies a new priority to the execution unit.
    ///
    /// Returns `true` only if the backend accepted the change; a rejected
    /// request leaves the value reported by [`priority`](Self::priority)
    /// untouched. Before `run`, the requested value becomes the creation
    /// priority and the call succeeds.
    fn set_priority(&self, priority: i32) -> bool;

    /// The last successfully applied priority (the creation priority until
    /// a `set_priority` call is accepted).
    fn priority(&self) -> i32;

    /// The configured thread name.
    fn name(&self) -> &'static str;
}
