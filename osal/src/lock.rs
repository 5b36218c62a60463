//!
//! Portable Lock Contract
//!
//! Mutual exclusion as every backend exposes it: a timed acquisition that
//! reports a boolean, and an unconditional release. Each backend provides
//! two implementations, an exclusive `Mutex` and a `RecursiveMutex`.
//!

/// Backend-native mutual exclusion behind one call shape.
///
/// ## Exclusive locks
///
/// Held by at most one thread at a time. Re-acquiring an exclusive lock
/// from the thread that already holds it is intentional non-reentrancy:
/// it deadlocks or times out, per backend semantics.
///
/// ## Recursive locks
///
/// The owning thread may acquire repeatedly; each acquisition must be
/// matched by exactly one release, and the lock is free again only when
/// the release count equals the acquisition count. Other threads block or
/// time out exactly as for the exclusive variant.
pub trait RawLock {
    /// Attempts to acquire the lock, blocking the caller up to
    /// `timeout_ms`. Returns `true` iff acquired; timeout and backend
    /// failure (handle creation refused, dead handle) both report `false`.
    /// Never panics. A timeout of `0` is a non-blocking attempt;
    /// [`crate::WAIT_FOREVER`](crate::config::WAIT_FOREVER) waits without
    /// bound.
    fn lock(&self, timeout_ms: u32) -> bool;

    /// Releases ownership.
    ///
    /// Calling `unlock` without holding the lock is caller responsibility:
    /// the result is backend-dependent and deliberately not guarded here.
    /// No backend makes it memory-unsafe, but no further behavior is
    /// specified.
    fn unlock(&self);
}
