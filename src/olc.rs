//! Optimistic Lock Coupling primitives.
//!
//! Mirrors `lock.hpp`/`lock.cpp`: a 64-bit version word per node where bit 0
//! marks the node obsolete, bit 1 marks it locked, and the remaining bits
//! count successful writes. Every read is optimistic: it proceeds without
//! blocking and is validated afterwards; any inconsistency restarts the
//! whole operation from the root rather than trying to repair the walk
//! in place.

use std::sync::atomic::{AtomicU64, Ordering};

const OBSOLETE_BIT: u64 = 1;
const LOCKED_BIT: u64 = 2;

/// Signals that a concurrent write invalidated an in-progress read or write
/// attempt; the caller must restart from the root.
#[derive(Debug)]
pub(crate) struct Restart;

pub(crate) type OlcResult<T> = Result<T, Restart>;

/// Spins until `version` is unlocked, then returns it. Fails if the node is
/// already marked obsolete.
pub(crate) fn read_lock_or_restart(version: &AtomicU64) -> OlcResult<u64> {
    let mut v = version.load(Ordering::SeqCst);
    while v & LOCKED_BIT != 0 {
        std::hint::spin_loop();
        v = version.load(Ordering::SeqCst);
    }
    if v & OBSOLETE_BIT != 0 {
        return Err(Restart);
    }
    Ok(v)
}

/// Re-reads `version` and fails if it no longer matches `expected`. Used
/// both to validate optimistic reads and, under its alias
/// [`read_unlock_or_restart`], to release a read lock.
pub(crate) fn check_or_restart(version: &AtomicU64, expected: u64) -> OlcResult<()> {
    if version.load(Ordering::SeqCst) == expected {
        Ok(())
    } else {
        Err(Restart)
    }
}

#[inline]
pub(crate) fn read_unlock_or_restart(version: &AtomicU64, expected: u64) -> OlcResult<()> {
    check_or_restart(version, expected)
}

/// Atomically swaps an optimistic read for an exclusive write lock, failing
/// if the version has moved since `expected` was observed.
pub(crate) fn upgrade_to_write_lock_or_restart(version: &AtomicU64, expected: u64) -> OlcResult<()> {
    version
        .compare_exchange(expected, expected | LOCKED_BIT, Ordering::SeqCst, Ordering::SeqCst)
        .map(|_| ())
        .map_err(|_| Restart)
}

/// Releases a write lock, bumping the version so concurrent optimistic
/// readers observe the change.
pub(crate) fn write_unlock(version: &AtomicU64) {
    version.fetch_add(2, Ordering::SeqCst);
}

/// Releases a write lock while marking the node obsolete, so concurrent
/// readers that still hold a reference to it restart instead of trusting
/// its contents.
pub(crate) fn write_unlock_obsolete(version: &AtomicU64) {
    version.fetch_add(3, Ordering::SeqCst);
}
