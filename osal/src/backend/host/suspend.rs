//!
//! Signal-Based Thread Suspension
//!
//! POSIX offers no direct thread-suspend call, so the host backend uses
//! the stop-the-world technique garbage collectors use: a reserved signal
//! whose handler parks the target thread in `sigsuspend` until a resume
//! signal arrives.
//!
//! Protocol, per request:
//!
//! 1. `park` takes the process-wide operation lock, raises the target's
//!    suspension flag, publishes the target's shared state in a global
//!    slot and delivers `SIGUSR1`.
//! 2. The handler, running on the target thread, records the Suspended
//!    state (the acknowledgment `park` waits for) and blocks in
//!    `sigsuspend` with only `SIGUSR2` deliverable. `SIGUSR2` is masked
//!    during the handler itself, so a resume racing the park cannot be
//!    consumed before `sigsuspend` atomically unblocks it.
//! 3. `unpark` clears the flag and delivers `SIGUSR2`; the handler loop
//!    observes the cleared flag, records Running and returns.
//!
//! Only async-signal-safe operations (atomics and `sigsuspend`) happen in
//! the handler.
//!

use std::mem;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::{Arc, Mutex as StdMutex, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

use super::{STATE_RUNNING, STATE_SUSPENDED, Shared, lock_unpoisoned};

const SIG_SUSPEND: libc::c_int = libc::SIGUSR1;
const SIG_RESUME: libc::c_int = libc::SIGUSR2;

/// Upper bound on how long a transition may take to become observable
/// before the request is reported as failed.
const ACK_TIMEOUT: Duration = Duration::from_millis(500);

/// Serializes suspend/resume process-wide so the handler can locate its
/// target through the single global slot below.
static SUSPEND_OP: StdMutex<()> = StdMutex::new(());
static SUSPEND_TARGET: AtomicPtr<Shared> = AtomicPtr::new(ptr::null_mut());
static HANDLERS: OnceLock<bool> = OnceLock::new();

fn install_handlers() -> bool {
    unsafe {
        let mut park: libc::sigaction = mem::zeroed();
        park.sa_sigaction = suspend_handler as extern "C" fn(libc::c_int) as usize;
        libc::sigemptyset(&mut park.sa_mask);
        // Keep the resume signal pending while the handler runs; only
        // sigsuspend may consume it.
        libc::sigaddset(&mut park.sa_mask, SIG_RESUME);
        park.sa_flags = libc::SA_RESTART;
        if libc::sigaction(SIG_SUSPEND, &park, ptr::null_mut()) != 0 {
            return false;
        }

        let mut wake: libc::sigaction = mem::zeroed();
        wake.sa_sigaction = resume_handler as extern "C" fn(libc::c_int) as usize;
        libc::sigemptyset(&mut wake.sa_mask);
        wake.sa_flags = libc::SA_RESTART;
        libc::sigaction(SIG_RESUME, &wake, ptr::null_mut()) == 0
    }
}

extern "C" fn resume_handler(_sig: libc::c_int) {}

extern "C" fn suspend_handler(_sig: libc::c_int) {
    let target = SUSPEND_TARGET.load(Ordering::Acquire);
    if target.is_null() {
        return;
    }
    let shared: &Shared = unsafe { &*target };
    if !shared.suspended.load(Ordering::Acquire) {
        return;
    }

    // Acknowledge, then park until the flag clears.
    shared.state.store(STATE_SUSPENDED, Ordering::Release);
    unsafe {
        let mut mask: libc::sigset_t = mem::zeroed();
        libc::sigfillset(&mut mask);
        libc::sigdelset(&mut mask, SIG_RESUME);
        while shared.suspended.load(Ordering::Acquire) {
            libc::sigsuspend(&mask);
        }
    }
    shared.state.store(STATE_RUNNING, Ordering::Release);
}

/// Suspends the thread behind `handle`. Returns `true` once the target
/// acknowledged the Suspended state from inside the handler.
pub(super) fn park(handle: libc::pthread_t, shared: &Arc<Shared>) -> bool {
    if !*HANDLERS.get_or_init(install_handlers) {
        return false;
    }
    let _op = lock_unpoisoned(&SUSPEND_OP);

    shared.suspended.store(true, Ordering::Release);
    SUSPEND_TARGET.store(Arc::as_ptr(shared) as *mut Shared, Ordering::Release);
    let delivered = unsafe { libc::pthread_kill(handle, SIG_SUSPEND) } == 0;
    let acked = delivered && wait_for_state(shared, STATE_SUSPENDED);
    SUSPEND_TARGET.store(ptr::null_mut(), Ordering::Release);

    if !acked {
        // The unit terminated or the signal was refused; withdraw the
        // request so a later lifetime cannot trip over it.
        shared.suspended.store(false, Ordering::Release);
    }
    acked
}

/// Resumes the thread behind `handle`. Returns `true` once the target
/// reports Running again.
pub(super) fn unpark(handle: libc::pthread_t, shared: &Arc<Shared>) -> bool {
    let _op = lock_unpoisoned(&SUSPEND_OP);

    if !shared.suspended.swap(false, Ordering::AcqRel) {
        return false;
    }
    if unsafe { libc::pthread_kill(handle, SIG_RESUME) } != 0 {
        return false;
    }
    wait_for_state(shared, STATE_RUNNING)
}

fn wait_for_state(shared: &Shared, expected: u8) -> bool {
    let deadline = Instant::now() + ACK_TIMEOUT;
    while Instant::now() < deadline {
        if shared.state.load(Ordering::Acquire) == expected {
            return true;
        }
        thread::sleep(Duration::from_micros(50));
    }
    shared.state.load(Ordering::Acquire) == expected
}
