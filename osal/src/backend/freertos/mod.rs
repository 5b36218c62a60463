//!
//! FreeRTOS Backend
//!
//! Threads are kernel tasks; the completion event joinable threads wait
//! on is a binary semaphore from the queue layer. Lock handles are
//! created eagerly at construction and deleted on drop.
//!
//! Tick conversion assumes the port's usual 1 kHz tick
//! (`configTICK_RATE_HZ == 1000`); adjust [`TICK_RATE_HZ`] when building
//! against a kernel configured differently.
//!

use alloc::sync::Arc;
use core::ffi::c_void;
use core::mem;
use core::ptr;
use core::sync::atomic::{AtomicBool, AtomicI32, AtomicPtr, Ordering};

use crate::config::{ThreadConfig, WAIT_FOREVER};
use crate::lock::RawLock;
use crate::thread::{Job, ThreadControl, ThreadState};

mod sys;

/// Kernel tick frequency this build is written against.
const TICK_RATE_HZ: u32 = 1000;

/// The kernel copies the task name into the TCB, truncated to
/// `configMAX_TASK_NAME_LEN` (16 in the stock configuration).
const TASK_NAME_LEN: usize = 16;

/// Lower bound on the stack handed to `xTaskCreate`, in words, applied
/// when the configuration requests the backend default (`stack_size == 0`).
const MIN_STACK_WORDS: usize = 128;

fn ms_to_ticks(ms: u32) -> sys::TickType_t {
    if ms == WAIT_FOREVER {
        return sys::portMAX_DELAY;
    }
    ((u64::from(ms) * u64::from(TICK_RATE_HZ)) / 1000) as sys::TickType_t
}

/// Delays the calling task for `ms` milliseconds.
pub fn sleep(ms: u32) {
    unsafe { sys::vTaskDelay(ms_to_ticks(ms)) };
}

/// Scoped owner of a queue-layer handle (semaphores and mutexes are
/// queues underneath); deletes it on drop if creation succeeded.
struct QueueOwner(sys::QueueHandle_t);

// Kernel queue objects are safe to touch from any task.
unsafe impl Send for QueueOwner {}
unsafe impl Sync for QueueOwner {}

impl Drop for QueueOwner {
    fn drop(&mut self) {
        if !self.0.is_null() {
            unsafe { sys::vQueueDelete(self.0) };
        }
    }
}

struct Shared<J: Job> {
    job: J,
    completion: Option<QueueOwner>,
}

/// A FreeRTOS task bound to a [`Job`].
pub struct Thread<J: Job> {
    config: ThreadConfig,
    /// Last successfully applied priority.
    priority: AtomicI32,
    started: AtomicBool,
    task: AtomicPtr<c_void>,
    shared: Arc<Shared<J>>,
}

impl<J: Job> Thread<J> {
    pub fn new(config: ThreadConfig, job: J) -> Self {
        let completion = config.joinable.is_joinable().then(|| {
            QueueOwner(unsafe {
                sys::xQueueGenericCreate(1, 0, sys::queueQUEUE_TYPE_BINARY_SEMAPHORE)
            })
        });
        let priority = AtomicI32::new(config.priority);
        Self {
            config,
            priority,
            started: AtomicBool::new(false),
            task: AtomicPtr::new(ptr::null_mut()),
            shared: Arc::new(Shared { job, completion }),
        }
    }

    /// The job this thread was constructed with.
    pub fn job(&self) -> &J {
        &self.shared.job
    }

    fn stack_depth(&self) -> u16 {
        let words = if self.config.stack_size == 0 {
            MIN_STACK_WORDS
        } else {
            (self.config.stack_size / mem::size_of::<usize>()).max(MIN_STACK_WORDS)
        };
        words.min(usize::from(u16::MAX)) as u16
    }
}

unsafe extern "C" fn trampoline<J: Job>(arg: *mut c_void) {
    let shared = unsafe { Arc::from_raw(arg as *const Shared<J>) };
    if let Some(sem) = &shared.completion {
        // Drain any stale signal so join only observes this lifetime.
        unsafe { sys::xQueueSemaphoreTake(sem.0, 0) };
    }
    shared.job.job();
    if let Some(sem) = &shared.completion {
        unsafe { sys::xQueueGenericSend(sem.0, ptr::null(), 0, sys::queueSEND_TO_BACK) };
    }
    drop(shared);
    // A task must delete itself rather than return.
    unsafe { sys::vTaskDelete(ptr::null_mut()) };
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

        // The kernel copies the name out of this stack buffer.
        let mut name = [0u8; TASK_NAME_LEN];
        let bytes = self.config.name.as_bytes();
        let len = bytes.len().min(TASK_NAME_LEN - 1);
        name[..len].copy_from_slice(&bytes[..len]);

        let ctx = Arc::into_raw(Arc::clone(&self.shared)) as *mut c_void;
        let mut handle: sys::TaskHandle_t = ptr::null_mut();
        let created = unsafe {
            sys::xTaskCreate(
                trampoline::<J>,
                name.as_ptr().cast(),
                self.stack_depth(),
                ctx,
                self.priority.load(Ordering::Acquire).max(0) as sys::UBaseType_t,
                &mut handle,
            )
        } == sys::pdPASS;

        if created && !handle.is_null() {
            self.task.store(handle, Ordering::Release);
            true
        } else {
            // The kernel never took the context reference; reclaim it and
            // leave the thread startable.
            drop(unsafe { Arc::from_raw(ctx as *const Shared<J>) });
            self.started.store(false, Ordering::Release);
            false
        }
    }

    fn state(&self) -> ThreadState {
        let task = self.task.load(Ordering::Acquire);
        if task.is_null() {
            return ThreadState::Created;
        }
        if let Some(sem) = &self.shared.completion {
            // A latched completion means the job finished; prefer that
            // over querying a handle the kernel may already have retired.
            if unsafe { sys::uxQueueMessagesWaiting(sem.0) } > 0 {
                return ThreadState::Terminated;
            }
        }
        match unsafe { sys::eTaskGetState(task) } {
            sys::eRunning | sys::eReady | sys::eBlocked => ThreadState::Running,
            sys::eSuspended => ThreadState::Suspended,
            _ => ThreadState::Terminated,
        }
    }

    fn join(&self, timeout_ms: u32) -> bool {
        let Some(sem) = &self.shared.completion else {
            return false;
        };
        let taken = unsafe { sys::xQueueSemaphoreTake(sem.0, ms_to_ticks(timeout_ms)) }
            == sys::pdTRUE;
        if taken {
            // Re-latch so every later join observes completion
            // immediately.
            unsafe { sys::xQueueGenericSend(sem.0, ptr::null(), 0, sys::queueSEND_TO_BACK) };
        }
        taken
    }

    fn is_joinable(&self) -> bool {
        self.config.joinable.is_joinable()
    }

    fn suspend(&self) -> bool {
        let task = self.task.load(Ordering::Acquire);
        if task.is_null() || self.state() != ThreadState::Running {
            return false;
        }
        unsafe { sys::vTaskSuspend(task) };
        unsafe { sys::eTaskGetState(task) == sys::eSuspended }
    }

    fn resume(&self) -> bool {
        let task = self.task.load(Ordering::Acquire);
        if task.is_null() || self.state() != ThreadState::Suspended {
            return false;
        }
        unsafe { sys::vTaskResume(task) };
        matches!(
            unsafe { sys::eTaskGetState(task) },
            sys::eRunning | sys::eReady | sys::eBlocked
        )
    }

    fn set_priority(&self, priority: i32) -> bool {
        if priority < 0 {
            return false;
        }
        let task = self.task.load(Ordering::Acquire);
        if task.is_null() {
            // Not started yet: the request becomes the creation priority.
            self.priority.store(priority, Ordering::Release);
            return true;
        }
        unsafe { sys::vTaskPrioritySet(task, priority as sys::UBaseType_t) };
        // The kernel clamps out-of-range requests; only an exact apply
        // counts as success, and the cache tracks what is in effect.
        let applied = unsafe { sys::uxTaskPriorityGet(task) } as i32;
        self.priority.store(applied, Ordering::Release);
        applied == priority
    }

    fn priority(&self) -> i32 {
        self.priority.load(Ordering::Acquire)
    }

    fn name(&self) -> &'static str {
        self.config.name
    }
}

/// Exclusive kernel mutex (priority inheritance per the kernel's own
/// rules). Created eagerly; a creation failure surfaces as `lock`
/// returning `false`.
pub struct Mutex {
    handle: QueueOwner,
}

impl Mutex {
    pub fn new() -> Self {
        Self {
            handle: QueueOwner(unsafe { sys::xQueueCreateMutex(sys::queueQUEUE_TYPE_MUTEX) }),
        }
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}

impl RawLock for Mutex {
    fn lock(&self, timeout_ms: u32) -> bool {
        if self.handle.0.is_null() {
            return false;
        }
        unsafe { sys::xQueueSemaphoreTake(self.handle.0, ms_to_ticks(timeout_ms)) == sys::pdTRUE }
    }

    fn unlock(&self) {
        if !self.handle.0.is_null() {
            unsafe { sys::xQueueGenericSend(self.handle.0, ptr::null(), 0, sys::queueSEND_TO_BACK) };
        }
    }
}

/// Recursive kernel mutex.
pub struct RecursiveMutex {
    handle: QueueOwner,
}

impl RecursiveMutex {
    pub fn new() -> Self {
        Self {
            handle: QueueOwner(unsafe {
                sys::xQueueCreateMutex(sys::queueQUEUE_TYPE_RECURSIVE_MUTEX)
            }),
        }
    }
}

impl Default for RecursiveMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl RawLock for RecursiveMutex {
    fn lock(&self, timeout_ms: u32) -> bool {
        if self.handle.0.is_null() {
            return false;
        }
        unsafe {
            sys::xQueueTakeMutexRecursive(self.handle.0, ms_to_ticks(timeout_ms)) == sys::pdTRUE
        }
    }

    fn unlock(&self) {
        if !self.handle.0.is_null() {
            unsafe { sys::xQueueGiveMutexRecursive(self.handle.0) };
        }
    }
}
