//!
//! osal - Uniform Thread and Mutual-Exclusion Abstraction
//!
//! Exposes one thread lifecycle and two lock primitives over three
//! incompatible execution environments:
//!
//! - `host` (default): POSIX desktop OS via `std::thread` and libc
//! - `freertos`: FreeRTOS tasks and queue-based semaphores
//! - `rtx`: CMSIS-RTOS2 (Keil RTX) kernel objects
//!
//! Exactly one backend is compiled in per build; selection happens through
//! cargo features, never at runtime. Every backend satisfies the same
//! lifecycle contract, expressed by the [`ThreadControl`] and [`RawLock`]
//! traits.
//!
//! ## Thread lifecycle
//!
//! ```text
//! Created ──run()──> Running <──resume()── Suspended
//!                       │  └───suspend()───────^
//!                       └──job() returns──> Terminated
//! ```
//!
//! A thread is constructed from a [`ThreadConfig`] and a [`Job`]; `run`
//! hands the job to the backend scheduler. Joinable threads own a binary
//! completion event that `join` blocks on; detached threads report `join`
//! failure deterministically. All failure on this surface is a boolean
//! result, never a panic.
//!
//! ## Locks
//!
//! [`Mutex`] is intentionally non-reentrant; [`RecursiveMutex`] allows the
//! owning thread to nest acquisitions, released when every acquisition has
//! been matched by a release. Both take a millisecond timeout and report
//! acquisition as a boolean.
//!
//! ## Cooperative shutdown
//!
//! [`CyclicThread`] packages the "run until told to stop" lifecycle:
//! `begin`, repeated `cycle` calls, then `end` once [`CyclicThread::kill`]
//! has been observed at an iteration boundary. There is no forced
//! termination primitive; `kill` followed by `join` is the shutdown
//! sequence.
//!

#![cfg_attr(not(feature = "host"), no_std)]

#[cfg(not(feature = "host"))]
extern crate alloc;

#[cfg(not(any(feature = "host", feature = "freertos", feature = "rtx")))]
compile_error!("select a backend: enable one of the `host`, `freertos` or `rtx` features");

#[cfg(any(
    all(feature = "host", feature = "freertos"),
    all(feature = "host", feature = "rtx"),
    all(feature = "freertos", feature = "rtx"),
))]
compile_error!(
    "backend features are mutually exclusive: enable exactly one of `host`, `freertos`, `rtx` \
     (kernel backends need `--no-default-features`)"
);

pub mod backend;
pub mod config;
pub mod cyclic;
pub mod lock;
pub mod thread;

#[cfg(feature = "host")]
pub mod error;

pub use backend::{Mutex, RecursiveMutex, Thread, sleep};
pub use config::{Joinable, ThreadConfig, WAIT_FOREVER};
pub use cyclic::{CyclicJob, CyclicThread};
pub use lock::RawLock;
pub use thread::{Job, ThreadControl, ThreadState};

#[cfg(feature = "host")]
pub use error::SpawnError;
