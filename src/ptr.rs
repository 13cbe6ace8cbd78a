//! Tagged child pointers.
//!
//! A child slot is a plain machine word. Low bit 1 means the word (with the
//! bit masked off) is the address of a [`Leaf`](crate::leaf::Leaf); low bit 0
//! means it is the address of a [`NodeHeader`](crate::node::NodeHeader), or
//! zero for "no child".

use std::ptr::NonNull;

use crate::leaf::Leaf;
use crate::node::NodeHeader;

/// A tagged pointer stored in a child slot, a key-end slot, or a root slot.
///
/// Represented as the raw bit pattern (`usize`) rather than an enum so it can
/// live directly inside `#[repr(C)]` node payloads and be read/written with a
/// single machine load/store.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(transparent)]
pub(crate) struct ChildPtr(pub(crate) usize);

impl ChildPtr {
    #[inline]
    pub(crate) fn is_null(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub(crate) fn is_leaf(self) -> bool {
        self.0 & 1 != 0
    }

    #[inline]
    pub(crate) fn from_leaf(leaf: NonNull<Leaf>) -> Self {
        let addr = leaf.as_ptr() as usize;
        debug_assert!(addr & 1 == 0, "leaf allocations must be 2-byte aligned");
        Self(addr | 1)
    }

    #[inline]
    pub(crate) fn from_header(header: NonNull<NodeHeader>) -> Self {
        let addr = header.as_ptr() as usize;
        debug_assert!(addr & 1 == 0, "node allocations must be 2-byte aligned");
        Self(addr)
    }

    /// # Safety
    /// `self` must be a non-null, leaf-tagged pointer produced by `from_leaf`.
    #[inline]
    pub(crate) unsafe fn as_leaf(self) -> NonNull<Leaf> {
        debug_assert!(self.is_leaf() && !self.is_null());
        unsafe { NonNull::new_unchecked((self.0 & !1) as *mut Leaf) }
    }

    /// # Safety
    /// `self` must be a non-null, non-leaf-tagged pointer produced by `from_header`.
    #[inline]
    pub(crate) unsafe fn as_header(self) -> NonNull<NodeHeader> {
        debug_assert!(!self.is_leaf() && !self.is_null());
        unsafe { NonNull::new_unchecked(self.0 as *mut NodeHeader) }
    }
}

/// Decoded view of a child slot. Callers match on this instead of testing
/// the tag bit directly, per the sum-type treatment the design notes call
/// for: the raw tagged representation stays internal to [`ChildPtr`].
pub(crate) enum Child {
    None,
    Leaf(NonNull<Leaf>),
    Inner(NonNull<NodeHeader>),
}

impl ChildPtr {
    /// Decodes this slot's tag. Equivalent to matching `is_null`/`is_leaf`
    /// by hand, but call sites get a value they can destructure instead of
    /// three separate unsafe casts.
    ///
    /// # Safety
    /// If non-null, `self` must point at a currently-live leaf or node.
    #[inline]
    pub(crate) unsafe fn decode(self) -> Child {
        if self.is_null() {
            Child::None
        } else if self.is_leaf() {
            Child::Leaf(unsafe { self.as_leaf() })
        } else {
            Child::Inner(unsafe { self.as_header() })
        }
    }
}
