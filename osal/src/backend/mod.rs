//!
//! Backend Selection
//!
//! Exactly one backend module is compiled in, chosen by cargo feature.
//! Each backend exports the same four names: `Thread`, `Mutex`,
//! `RecursiveMutex` and `sleep`, all conforming to the portable contracts
//! in [`crate::thread`] and [`crate::lock`].
//!

#[cfg(feature = "host")]
mod host;
#[cfg(feature = "host")]
pub use host::{Mutex, RecursiveMutex, Thread, sleep};

#[cfg(feature = "freertos")]
mod freertos;
#[cfg(feature = "freertos")]
pub use freertos::{Mutex, RecursiveMutex, Thread, sleep};

#[cfg(feature = "rtx")]
mod rtx;
#[cfg(feature = "rtx")]
pub use rtx::{Mutex, RecursiveMutex, Thread, sleep};
