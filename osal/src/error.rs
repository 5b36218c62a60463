//!
//! Host Backend Error Types
//!
//! Creation failures on the host carry an underlying OS error worth
//! reporting; the portable surface still reduces them to a boolean, but
//! the host exposes the cause through `Thread::try_run`.
//!

use std::io;

use thiserror::Error;

/// Why the host backend could not start a thread.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// The OS refused to create the thread (resource exhaustion, an
    /// unsatisfiable stack request, process limits).
    #[error("thread creation failed: {0}")]
    Create(#[from] io::Error),

    /// The thread has already been started; starting is valid exactly
    /// once per thread object.
    #[error("thread `{name}` was already started")]
    AlreadyStarted { name: &'static str },
}
