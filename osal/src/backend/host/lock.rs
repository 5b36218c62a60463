//!
//! Host Lock Primitives
//!
//! `std::sync::Mutex` exposes no timed acquisition, so both lock types
//! are built from a state-carrying mutex and a condvar: the exclusive
//! variant tracks a held flag, the recursive variant an owner and an
//! acquisition depth.
//!

use std::sync::{Condvar, Mutex as StdMutex};
use std::thread::{self, ThreadId};
use std::time::Duration;

use super::lock_unpoisoned;
use crate::config::WAIT_FOREVER;
use crate::lock::RawLock;

/// Exclusive, intentionally non-reentrant lock.
///
/// A second acquisition from the holding thread blocks until the timeout
/// expires, exactly like contention from another thread.
pub struct Mutex {
    held: StdMutex<bool>,
    cond: Condvar,
}

impl Mutex {
    pub fn new() -> Self {
        Self {
            held: StdMutex::new(false),
            cond: Condvar::new(),
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
        let mut held = lock_unpoisoned(&self.held);
        if timeout_ms == WAIT_FOREVER {
            while *held {
                held = self
                    .cond
                    .wait(held)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
            }
            *held = true;
            return true;
        }
        let timeout = Duration::from_millis(u64::from(timeout_ms));
        let (mut held, _) = self
            .cond
            .wait_timeout_while(held, timeout, |held| *held)
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *held {
            return false;
        }
        *held = true;
        true
    }

    fn unlock(&self) {
        let mut held = lock_unpoisoned(&self.held);
        *held = false;
        self.cond.notify_one();
    }
}

struct Owner {
    owner: Option<ThreadId>,
    depth: u32,
}

/// Recursive lock: the owning thread may nest acquisitions; the lock is
/// free again once every acquisition has been matched by a release.
pub struct RecursiveMutex {
    state: StdMutex<Owner>,
    cond: Condvar,
}

impl RecursiveMutex {
    pub fn new() -> Self {
        Self {
            state: StdMutex::new(Owner {
                owner: None,
                depth: 0,
            }),
            cond: Condvar::new(),
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
        let me = thread::current().id();
        let mut state = lock_unpoisoned(&self.state);
        if state.owner == Some(me) {
            state.depth += 1;
            return true;
        }
        if timeout_ms == WAIT_FOREVER {
            while state.owner.is_some() {
                state = self
                    .cond
                    .wait(state)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
            }
        } else {
            let timeout = Duration::from_millis(u64::from(timeout_ms));
            let (reacquired, _) = self
                .cond
                .wait_timeout_while(state, timeout, |state| state.owner.is_some())
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            state = reacquired;
        }
        if state.owner.is_some() {
            return false;
        }
        state.owner = Some(me);
        state.depth = 1;
        true
    }

    fn unlock(&self) {
        let mut state = lock_unpoisoned(&self.state);
        match state.depth {
            0 => {}
            1 => {
                state.depth = 0;
                state.owner = None;
                self.cond.notify_one();
            }
            _ => state.depth -= 1,
        }
    }
}
