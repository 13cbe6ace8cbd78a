//! Allocation bookkeeping.
//!
//! `allocator.hpp` wraps `malloc`/`free` behind a typed allocate/release
//! contract so the rest of the tree never calls the system allocator
//! directly; `memkv::art::ArtMemoryStats` reports the resulting counts back
//! to the caller. We keep the same separation of concerns: [`node`] and
//! [`leaf`] own the actual `std::alloc` calls, and this module is the single
//! place that counts them, so [`crate::Tree::stats`] can report live node
//! and leaf counts without threading a counter through every call site
//! (including the asynchronous frees performed by [`crate::retire`]).

use std::sync::atomic::{AtomicI64, Ordering};

static NODES_LIVE: AtomicI64 = AtomicI64::new(0);
static LEAVES_LIVE: AtomicI64 = AtomicI64::new(0);
static RESTARTS: AtomicI64 = AtomicI64::new(0);

#[inline]
pub(crate) fn record_node_alloc() {
    NODES_LIVE.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub(crate) fn record_node_free() {
    NODES_LIVE.fetch_sub(1, Ordering::Relaxed);
}

#[inline]
pub(crate) fn record_leaf_alloc() {
    LEAVES_LIVE.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub(crate) fn record_leaf_free() {
    LEAVES_LIVE.fetch_sub(1, Ordering::Relaxed);
}

#[inline]
pub(crate) fn record_restart() {
    RESTARTS.fetch_add(1, Ordering::Relaxed);
}

/// Point-in-time memory and contention counters for a tree.
///
/// These are process-wide rather than per-tree: the crate is built around a
/// single long-lived index per process, so a snapshot for diagnostics is
/// more useful than a precise per-instance ledger.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeStats {
    /// Inner nodes (N4/N16/N48/N256, including the root) currently live.
    pub nodes_live: i64,
    /// Leaves currently live.
    pub leaves_live: i64,
    /// Total number of times an operation restarted from the root after
    /// observing a concurrent structural change.
    pub restarts: i64,
}

pub(crate) fn snapshot() -> TreeStats {
    TreeStats {
        nodes_live: NODES_LIVE.load(Ordering::Relaxed),
        leaves_live: LEAVES_LIVE.load(Ordering::Relaxed),
        restarts: RESTARTS.load(Ordering::Relaxed),
    }
}
