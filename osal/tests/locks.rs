//!
//! Lock contract tests, exercised against the host backend.
//!

#![cfg(feature = "host")]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use osal::{Mutex, RawLock, RecursiveMutex, WAIT_FOREVER};

/// Attempts the lock from a fresh thread, releasing it again on success
/// so ownership never outlives the probe.
fn probe<L>(lock: &Arc<L>, timeout_ms: u32) -> bool
where
    L: RawLock + Send + Sync + 'static,
{
    let lock = Arc::clone(lock);
    thread::spawn(move || {
        let acquired = lock.lock(timeout_ms);
        if acquired {
            lock.unlock();
        }
        acquired
    })
    .join()
    .unwrap()
}

#[test]
fn test_exclusive_lock_times_out_under_contention() {
    let m = Arc::new(Mutex::new());
    assert!(m.lock(0));

    let contender = {
        let m = Arc::clone(&m);
        thread::spawn(move || {
            let start = Instant::now();
            let acquired = m.lock(50);
            (acquired, start.elapsed())
        })
    };
    let (acquired, waited) = contender.join().unwrap();
    assert!(!acquired);
    assert!(
        waited >= Duration::from_millis(40),
        "returned before the window: {waited:?}"
    );
    assert!(waited < Duration::from_secs(5), "over-waited: {waited:?}");

    m.unlock();
    assert!(probe(&m, 1_000), "must be acquirable after release");
}

#[test]
fn test_exclusive_lock_excludes() {
    struct Guarded {
        lock: Mutex,
        inside: AtomicBool,
        hits: AtomicUsize,
    }

    let shared = Arc::new(Guarded {
        lock: Mutex::new(),
        inside: AtomicBool::new(false),
        hits: AtomicUsize::new(0),
    });

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                for _ in 0..100 {
                    assert!(shared.lock.lock(WAIT_FOREVER));
                    assert!(
                        !shared.inside.swap(true, Ordering::SeqCst),
                        "two threads inside the critical section"
                    );
                    shared.hits.fetch_add(1, Ordering::SeqCst);
                    shared.inside.store(false, Ordering::SeqCst);
                    shared.lock.unlock();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(shared.hits.load(Ordering::SeqCst), 800);
}

#[test]
fn test_lock_forever_waits_for_release() {
    let m = Arc::new(Mutex::new());
    assert!(m.lock(0));

    let waiter = {
        let m = Arc::clone(&m);
        thread::spawn(move || {
            let acquired = m.lock(WAIT_FOREVER);
            if acquired {
                m.unlock();
            }
            acquired
        })
    };
    thread::sleep(Duration::from_millis(50));
    m.unlock();
    assert!(waiter.join().unwrap());
}

#[test]
fn test_recursive_lock_requires_matched_releases() {
    let m = Arc::new(RecursiveMutex::new());
    assert!(m.lock(0));
    assert!(m.lock(0));
    assert!(m.lock(0));

    assert!(!probe(&m, 50), "held after three acquisitions");

    m.unlock();
    m.unlock();
    assert!(
        !probe(&m, 50),
        "still held while releases lag acquisitions"
    );

    m.unlock();
    assert!(probe(&m, 500), "final matching release must free the lock");
}

#[test]
fn test_recursive_lock_reenters_without_blocking() {
    let m = RecursiveMutex::new();
    let start = Instant::now();
    assert!(m.lock(WAIT_FOREVER));
    assert!(m.lock(WAIT_FOREVER));
    assert!(m.lock(0));
    assert!(
        start.elapsed() < Duration::from_secs(1),
        "re-entry must not block the owner"
    );
    m.unlock();
    m.unlock();
    m.unlock();
}
