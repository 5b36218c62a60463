//!
//! CMSIS-RTOS2 (RTX) Backend
//!
//! Threads are detached kernel threads; join is implemented over a
//! counting semaphore (max 1, initially empty) because a detached thread
//! cleans itself up on `osThreadExit` and leaves nothing to kernel-join.
//! RTX reports a suspended thread as Blocked, so the adapter tracks
//! suspension itself to keep the normalized state honest.
//!
//! Mutex handles are created lazily on first `lock`, with the creation
//! step guarded by the kernel lock so concurrent first use stays
//! race-free; the kernel's own exclusion primitive is the only one
//! available before the mutex exists.
//!

use alloc::ffi::CString;
use alloc::sync::Arc;
use core::ffi::c_void;
use core::ptr;
use core::sync::atomic::{AtomicBool, AtomicI32, AtomicPtr, Ordering};

use crate::config::{ThreadConfig, WAIT_FOREVER};
use crate::lock::RawLock;
use crate::thread::{Job, ThreadControl, ThreadState};

mod sys;

fn ms_to_ticks(ms: u32) -> u32 {
    if ms == WAIT_FOREVER {
        return sys::osWaitForever;
    }
    let freq = unsafe { sys::osKernelGetTickFreq() };
    ((u64::from(ms) * u64::from(freq)) / 1000) as u32
}

/// Delays the calling thread for `ms` milliseconds.
pub fn sleep(ms: u32) {
    unsafe { sys::osDelay(ms_to_ticks(ms)) };
}

/// Scoped owner of a kernel semaphore; deletes it on drop if present.
struct SemOwner(sys::osSemaphoreId_t);

// Kernel objects are safe to touch from any thread.
unsafe impl Send for SemOwner {}
unsafe impl Sync for SemOwner {}

impl Drop for SemOwner {
    fn drop(&mut self) {
        if !self.0.is_null() {
            unsafe { sys::osSemaphoreDelete(self.0) };
        }
    }
}

struct Shared<J: Job> {
    job: J,
    completion: Option<SemOwner>,
    /// RTX keeps the attribute name pointer, so the storage must outlive
    /// the kernel thread; it lives here, next to the job.
    name: CString,
}

/// An RTX thread bound to a [`Job`].
pub struct Thread<J: Job> {
    config: ThreadConfig,
    /// Last successfully applied priority.
    priority: AtomicI32,
    started: AtomicBool,
    /// Set while a suspend request is in effect; RTX itself reports the
    /// thread as merely Blocked.
    suspended: AtomicBool,
    id: AtomicPtr<c_void>,
    shared: Arc<Shared<J>>,
}

impl<J: Job> Thread<J> {
    pub fn new(config: ThreadConfig, job: J) -> Self {
        let completion = config
            .joinable
            .is_joinable()
            .then(|| SemOwner(unsafe { sys::osSemaphoreNew(1, 0, ptr::null()) }));
        let name = CString::new(config.name).unwrap_or_default();
        let priority = AtomicI32::new(config.priority);
        Self {
            config,
            priority,
            started: AtomicBool::new(false),
            suspended: AtomicBool::new(false),
            id: AtomicPtr::new(ptr::null_mut()),
            shared: Arc::new(Shared {
                job,
                completion,
                name,
            }),
        }
    }

    /// The job this thread was constructed with.
    pub fn job(&self) -> &J {
        &self.shared.job
    }
}

unsafe extern "C" fn trampoline<J: Job>(arg: *mut c_void) {
    let shared = unsafe { Arc::from_raw(arg as *const Shared<J>) };
    shared.job.job();
    if let Some(sem) = &shared.completion {
        unsafe { sys::osSemaphoreRelease(sem.0) };
    }
    drop(shared);
    unsafe { sys::osThreadExit() };
}

impl<J: Job> ThreadControl for Thread<J> {
    fn run(&self) -> bool {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let attr = sys::osThreadAttr_t {
            name: self.shared.name.as_ptr(),
            attr_bits: sys::osThreadDetached,
            cb_mem: ptr::null_mut(),
            cb_size: 0,
            stack_mem: ptr::null_mut(),
            stack_size: self.config.stack_size as u32,
            priority: self.priority.load(Ordering::Acquire),
            tz_module: 0,
            reserved: 0,
        };

        let ctx = Arc::into_raw(Arc::clone(&self.shared)) as *mut c_void;
        let id = unsafe { sys::osThreadNew(trampoline::<J>, ctx, &attr) };
        if id.is_null() {
            // The kernel never took the context reference; reclaim it and
            // leave the thread startable.
            drop(unsafe { Arc::from_raw(ctx as *const Shared<J>) });
            self.started.store(false, Ordering::Release);
            return false;
        }
        self.id.store(id, Ordering::Release);
        true
    }

    fn state(&self) -> ThreadState {
        let id = self.id.load(Ordering::Acquire);
        if id.is_null() {
            return ThreadState::Created;
        }
        if let Some(sem) = &self.shared.completion {
            if unsafe { sys::osSemaphoreGetCount(sem.0) } > 0 {
                return ThreadState::Terminated;
            }
        }
        if self.suspended.load(Ordering::Acquire) {
            return ThreadState::Suspended;
        }
        match unsafe { sys::osThreadGetState(id) } {
            sys::osThreadReady | sys::osThreadRunning | sys::osThreadBlocked => {
                ThreadState::Running
            }
            _ => ThreadState::Terminated,
        }
    }

    fn join(&self, timeout_ms: u32) -> bool {
        let Some(sem) = &self.shared.completion else {
            return false;
        };
        let taken =
            unsafe { sys::osSemaphoreAcquire(sem.0, ms_to_ticks(timeout_ms)) } == sys::osOK;
        if taken {
            // Re-latch so every later join observes completion
            // immediately.
            unsafe { sys::osSemaphoreRelease(sem.0) };
        }
        taken
    }

    fn is_joinable(&self) -> bool {
        self.config.joinable.is_joinable()
    }

    fn suspend(&self) -> bool {
        let id = self.id.load(Ordering::Acquire);
        if id.is_null() || self.state() != ThreadState::Running {
            return false;
        }
        if unsafe { sys::osThreadSuspend(id) } != sys::osOK {
            return false;
        }
        self.suspended.store(true, Ordering::Release);
        true
    }

    fn resume(&self) -> bool {
        let id = self.id.load(Ordering::Acquire);
        if id.is_null() || !self.suspended.load(Ordering::Acquire) {
            return false;
        }
        if unsafe { sys::osThreadResume(id) } != sys::osOK {
            return false;
        }
        self.suspended.store(false, Ordering::Release);
        self.state() == ThreadState::Running
    }

    fn set_priority(&self, priority: i32) -> bool {
        let id = self.id.load(Ordering::Acquire);
        if id.is_null() {
            // Not started yet: the request becomes the creation priority.
            self.priority.store(priority, Ordering::Release);
            return true;
        }
        if unsafe { sys::osThreadSetPriority(id, priority) } != sys::osOK {
            return false;
        }
        self.priority.store(priority, Ordering::Release);
        true
    }

    fn priority(&self) -> i32 {
        self.priority.load(Ordering::Acquire)
    }

    fn name(&self) -> &'static str {
        self.config.name
    }
}

/// Creates a kernel mutex on first use. The slot is published under the
/// kernel lock so two threads racing the first `lock` cannot both create.
fn lazy_create(slot: &AtomicPtr<c_void>, attr_bits: u32) -> sys::osMutexId_t {
    let existing = slot.load(Ordering::Acquire);
    if !existing.is_null() {
        return existing;
    }
    unsafe {
        let saved = sys::osKernelLock();
        let mut id = slot.load(Ordering::Acquire);
        if id.is_null() {
            let attr = sys::osMutexAttr_t {
                name: ptr::null(),
                attr_bits,
                cb_mem: ptr::null_mut(),
                cb_size: 0,
            };
            id = sys::osMutexNew(&attr);
            slot.store(id, Ordering::Release);
        }
        sys::osKernelRestoreLock(saved);
        id
    }
}

/// Exclusive kernel mutex, created lazily on first `lock`.
pub struct Mutex {
    id: AtomicPtr<c_void>,
}

impl Mutex {
    pub const fn new() -> Self {
        Self {
            id: AtomicPtr::new(ptr::null_mut()),
        }
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Mutex {
    fn drop(&mut self) {
        let id = self.id.load(Ordering::Acquire);
        if !id.is_null() {
            unsafe { sys::osMutexDelete(id) };
        }
    }
}

impl RawLock for Mutex {
    fn lock(&self, timeout_ms: u32) -> bool {
        let id = lazy_create(&self.id, sys::osMutexRobust);
        if id.is_null() {
            return false;
        }
        unsafe { sys::osMutexAcquire(id, ms_to_ticks(timeout_ms)) == sys::osOK }
    }

    fn unlock(&self) {
        let id = self.id.load(Ordering::Acquire);
        if !id.is_null() {
            unsafe { sys::osMutexRelease(id) };
        }
    }
}

/// Recursive kernel mutex, created lazily on first `lock`.
pub struct RecursiveMutex {
    id: AtomicPtr<c_void>,
}

impl RecursiveMutex {
    pub const fn new() -> Self {
        Self {
            id: AtomicPtr::new(ptr::null_mut()),
        }
    }
}

impl Default for RecursiveMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RecursiveMutex {
    fn drop(&mut self) {
        let id = self.id.load(Ordering::Acquire);
        if !id.is_null() {
            unsafe { sys::osMutexDelete(id) };
        }
    }
}

impl RawLock for RecursiveMutex {
    fn lock(&self, timeout_ms: u32) -> bool {
        let id = lazy_create(&self.id, sys::osMutexRecursive | sys::osMutexRobust);
        if id.is_null() {
            return false;
        }
        unsafe { sys::osMutexAcquire(id, ms_to_ticks(timeout_ms)) == sys::osOK }
    }

    fn unlock(&self) {
        let id = self.id.load(Ordering::Acquire);
        if !id.is_null() {
            unsafe { sys::osMutexRelease(id) };
        }
    }
}
