//! Inner node layout and the N4/N16/N48/N256 variants.
//!
//! Each variant is a single contiguous allocation: a [`NodeHeader`] (which
//! carries the OLC version word, the materialised prefix and the key-end
//! slot) immediately followed by the variant's own keys/children arrays.
//! This follows `memkv::art_fast`'s `#[repr(C)]` header-then-payload layout,
//! generalized with the materialised-prefix-overflow and key-end-child
//! mechanics described by `actions.cpp`.

use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU32, AtomicU64};

use crate::alloc::record_node_alloc;
use crate::leaf::Leaf;
use crate::ptr::ChildPtr;

/// Bytes of prefix materialised directly in the header. Beyond this length
/// the prefix is tracked only as a count; recovering the remaining bytes
/// requires descending to the subtree's minimum-key leaf.
pub(crate) const PREFIX_CAP: usize = 8;

/// Sentinel marking an unused `N48` index slot.
pub(crate) const N48_EMPTY: u8 = 48;

#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum NodeType {
    N4 = 0,
    N16 = 1,
    N48 = 2,
    N256 = 3,
}

#[repr(C)]
pub(crate) struct NodeHeader {
    /// OLC version word: bit 0 obsolete, bit 1 locked, bits 2.. version count.
    pub(crate) version: AtomicU64,
    pub(crate) ref_count: AtomicU32,
    pub(crate) node_type: NodeType,
    pub(crate) children_count: u16,
    /// Smallest child byte currently stored; valid only for N48/N256, whose
    /// child slots are not kept in sorted order.
    pub(crate) min_key: u8,
    /// Logical prefix length; may exceed `PREFIX_CAP`.
    pub(crate) prefix_len: u32,
    pub(crate) prefix: [u8; PREFIX_CAP],
    /// Tagged leaf pointer for a key that ends exactly at this node, or null.
    pub(crate) key_end: usize,
}

impl NodeHeader {
    fn new(node_type: NodeType) -> NodeHeader {
        NodeHeader {
            version: AtomicU64::new(0),
            ref_count: AtomicU32::new(1),
            node_type,
            children_count: 0,
            min_key: 0,
            prefix_len: 0,
            prefix: [0; PREFIX_CAP],
            key_end: 0,
        }
    }
}

#[repr(C)]
pub(crate) struct N4 {
    pub(crate) header: NodeHeader,
    pub(crate) keys: [u8; 4],
    pub(crate) children: [usize; 4],
}

#[repr(C)]
pub(crate) struct N16 {
    pub(crate) header: NodeHeader,
    pub(crate) keys: [u8; 16],
    pub(crate) children: [usize; 16],
}

#[repr(C)]
pub(crate) struct N48 {
    pub(crate) header: NodeHeader,
    pub(crate) child_index: [u8; 256],
    pub(crate) children: [usize; 48],
}

#[repr(C)]
pub(crate) struct N256 {
    pub(crate) header: NodeHeader,
    pub(crate) children: [usize; 256],
}

macro_rules! impl_alloc {
    ($ty:ty, $variant:expr) => {
        impl $ty {
            pub(crate) fn alloc() -> NonNull<$ty> {
                let layout = Layout::new::<$ty>();
                let raw = unsafe { alloc(layout) };
                let Some(ptr) = NonNull::new(raw as *mut $ty) else {
                    handle_alloc_error(layout);
                };
                unsafe {
                    std::ptr::write_bytes(raw, 0, layout.size());
                    (*ptr.as_ptr()).header = NodeHeader::new($variant);
                }
                record_node_alloc();
                ptr
            }
        }
    };
}

impl_alloc!(N4, NodeType::N4);
impl_alloc!(N16, NodeType::N16);
impl_alloc!(N256, NodeType::N256);

impl N48 {
    pub(crate) fn alloc() -> NonNull<N48> {
        let layout = Layout::new::<N48>();
        let raw = unsafe { alloc(layout) };
        let Some(ptr) = NonNull::new(raw as *mut N48) else {
            handle_alloc_error(layout);
        };
        unsafe {
            (*ptr.as_ptr()).header = NodeHeader::new(NodeType::N48);
            (*ptr.as_ptr()).child_index = [N48_EMPTY; 256];
            (*ptr.as_ptr()).children = [0; 48];
        }
        record_node_alloc();
        ptr
    }
}

/// # Safety
/// `header` must point at a live node of the variant recorded in its own
/// `node_type` field.
pub(crate) unsafe fn free_node(header: NonNull<NodeHeader>) {
    unsafe {
        match header.as_ref().node_type {
            NodeType::N4 => dealloc(header.as_ptr() as *mut u8, Layout::new::<N4>()),
            NodeType::N16 => dealloc(header.as_ptr() as *mut u8, Layout::new::<N16>()),
            NodeType::N48 => dealloc(header.as_ptr() as *mut u8, Layout::new::<N48>()),
            NodeType::N256 => dealloc(header.as_ptr() as *mut u8, Layout::new::<N256>()),
        }
    }
}

/// Returns a pointer to the child slot holding `byte`, or null if absent.
///
/// # Safety
/// `header` must point at a live, correctly-typed node.
pub(crate) unsafe fn find_child(header: *mut NodeHeader, byte: u8) -> *mut usize {
    unsafe {
        match (*header).node_type {
            NodeType::N4 => {
                let n = header as *mut N4;
                let cc = (*n).header.children_count as usize;
                for i in 0..cc {
                    if (*n).keys[i] == byte {
                        return &mut (*n).children[i] as *mut usize;
                    }
                }
                std::ptr::null_mut()
            }
            NodeType::N16 => {
                // Scalar fallback for what is conceptually a SIMD-width
                // branch-free scan.
                let n = header as *mut N16;
                let cc = (*n).header.children_count as usize;
                for i in 0..cc {
                    if (*n).keys[i] == byte {
                        return &mut (*n).children[i] as *mut usize;
                    }
                }
                std::ptr::null_mut()
            }
            NodeType::N48 => {
                let n = header as *mut N48;
                let idx = (*n).child_index[byte as usize];
                if idx == N48_EMPTY {
                    std::ptr::null_mut()
                } else {
                    &mut (*n).children[idx as usize] as *mut usize
                }
            }
            NodeType::N256 => {
                let n = header as *mut N256;
                let slot = &mut (*n).children[byte as usize] as *mut usize;
                if *slot == 0 {
                    std::ptr::null_mut()
                } else {
                    slot
                }
            }
        }
    }
}

/// Whether the node has no room for an additional child without growing.
///
/// # Safety
/// `header` must point at a live node.
pub(crate) unsafe fn is_full(header: *const NodeHeader) -> bool {
    unsafe {
        match (*header).node_type {
            NodeType::N4 => (*header).children_count >= 4,
            NodeType::N16 => (*header).children_count >= 16,
            NodeType::N48 => (*header).children_count >= 48,
            NodeType::N256 => false,
        }
    }
}

unsafe fn update_min_key(header: *mut NodeHeader, byte: u8) {
    unsafe {
        if (*header).children_count == 1 || byte < (*header).min_key {
            (*header).min_key = byte;
        }
    }
}

/// Inserts `child` under `byte`. The node must not be full.
///
/// # Safety
/// `header` must point at a live, correctly-typed, non-full node with no
/// existing entry for `byte`.
pub(crate) unsafe fn add_child(header: *mut NodeHeader, byte: u8, child: usize) {
    unsafe {
        match (*header).node_type {
            NodeType::N4 => {
                let n = header as *mut N4;
                let cc = (*n).header.children_count as usize;
                debug_assert!(cc < 4);
                let mut pos = cc;
                for i in 0..cc {
                    if byte < (*n).keys[i] {
                        pos = i;
                        break;
                    }
                }
                for i in (pos..cc).rev() {
                    (*n).keys[i + 1] = (*n).keys[i];
                    (*n).children[i + 1] = (*n).children[i];
                }
                (*n).keys[pos] = byte;
                (*n).children[pos] = child;
                (*n).header.children_count += 1;
            }
            NodeType::N16 => {
                let n = header as *mut N16;
                let cc = (*n).header.children_count as usize;
                debug_assert!(cc < 16);
                let mut pos = cc;
                for i in 0..cc {
                    if byte < (*n).keys[i] {
                        pos = i;
                        break;
                    }
                }
                for i in (pos..cc).rev() {
                    (*n).keys[i + 1] = (*n).keys[i];
                    (*n).children[i + 1] = (*n).children[i];
                }
                (*n).keys[pos] = byte;
                (*n).children[pos] = child;
                (*n).header.children_count += 1;
            }
            NodeType::N48 => {
                let n = header as *mut N48;
                let cc = (*n).header.children_count as usize;
                debug_assert!(cc < 48);
                (*n).children[cc] = child;
                (*n).child_index[byte as usize] = cc as u8;
                (*n).header.children_count += 1;
                update_min_key(header, byte);
            }
            NodeType::N256 => {
                let n = header as *mut N256;
                (*n).children[byte as usize] = child;
                (*n).header.children_count += 1;
                update_min_key(header, byte);
            }
        }
    }
}

unsafe fn copy_common_header(dst: &mut NodeHeader, src: &NodeHeader, node_type: NodeType) {
    dst.node_type = node_type;
    dst.prefix_len = src.prefix_len;
    dst.prefix = src.prefix;
    dst.key_end = src.key_end;
    dst.min_key = src.min_key;
    dst.children_count = src.children_count;
}

/// Promotes a node to the next larger variant, copying header and children.
/// The caller is responsible for freeing `header` once installed.
///
/// # Safety
/// `header` must point at a live, full N4/N16/N48 node (N256 never grows).
pub(crate) unsafe fn grow(header: *mut NodeHeader) -> NonNull<NodeHeader> {
    unsafe {
        match (*header).node_type {
            NodeType::N4 => grow_n4_to_n16(header as *mut N4),
            NodeType::N16 => grow_n16_to_n48(header as *mut N16),
            NodeType::N48 => grow_n48_to_n256(header as *mut N48),
            NodeType::N256 => unreachable!("N256 never grows"),
        }
    }
}

unsafe fn grow_n4_to_n16(old: *mut N4) -> NonNull<NodeHeader> {
    unsafe {
        let new = N16::alloc();
        let newp = new.as_ptr();
        copy_common_header(&mut (*newp).header, &(*old).header, NodeType::N16);
        let cc = (*old).header.children_count as usize;
        (*newp).keys[..cc].copy_from_slice(&(*old).keys[..cc]);
        (*newp).children[..cc].copy_from_slice(&(*old).children[..cc]);
        NonNull::new_unchecked(newp as *mut NodeHeader)
    }
}

unsafe fn grow_n16_to_n48(old: *mut N16) -> NonNull<NodeHeader> {
    unsafe {
        let new = N48::alloc();
        let newp = new.as_ptr();
        copy_common_header(&mut (*newp).header, &(*old).header, NodeType::N48);
        let cc = (*old).header.children_count as usize;
        for i in 0..cc {
            (*newp).children[i] = (*old).children[i];
            (*newp).child_index[(*old).keys[i] as usize] = i as u8;
        }
        // N4/N16 never maintain `min_key` (only N48/N256 consult it), so the
        // copied header field is stale. N16's keys are kept sorted, so the
        // smallest byte is simply the first one.
        if cc > 0 {
            (*newp).header.min_key = (*old).keys[0];
        }
        NonNull::new_unchecked(newp as *mut NodeHeader)
    }
}

unsafe fn grow_n48_to_n256(old: *mut N48) -> NonNull<NodeHeader> {
    unsafe {
        let new = N256::alloc();
        let newp = new.as_ptr();
        copy_common_header(&mut (*newp).header, &(*old).header, NodeType::N256);
        for byte in 0..256usize {
            let idx = (*old).child_index[byte];
            if idx != N48_EMPTY {
                (*newp).children[byte] = (*old).children[idx as usize];
            }
        }
        NonNull::new_unchecked(newp as *mut NodeHeader)
    }
}

unsafe fn first_child(header: *mut NodeHeader) -> usize {
    unsafe {
        match (*header).node_type {
            NodeType::N4 => (*(header as *mut N4)).children[0],
            NodeType::N16 => (*(header as *mut N16)).children[0],
            _ => unreachable!("only called when children_count > 0 on a sorted variant"),
        }
    }
}

/// Descends to the leaf reachable by always taking the smallest child,
/// falling back to the key-end child when a node has none. Used both to
/// recover a prefix beyond `PREFIX_CAP` and to decide split direction.
///
/// # Safety
/// `node` must be a non-null tagged pointer to a live leaf or inner node.
pub(crate) unsafe fn find_minimum_key(mut node: usize) -> NonNull<Leaf> {
    loop {
        let tagged = ChildPtr(node);
        if tagged.is_leaf() {
            return unsafe { tagged.as_leaf() };
        }
        let header = unsafe { tagged.as_header().as_ptr() };
        node = unsafe {
            if (*header).children_count == 0 {
                debug_assert!((*header).key_end != 0);
                (*header).key_end
            } else {
                match (*header).node_type {
                    NodeType::N4 | NodeType::N16 => first_child(header),
                    NodeType::N48 => {
                        let n = header as *mut N48;
                        let idx = (*n).child_index[(*header).min_key as usize];
                        (*n).children[idx as usize]
                    }
                    NodeType::N256 => {
                        let n = header as *mut N256;
                        (*n).children[(*header).min_key as usize]
                    }
                }
            }
        };
    }
}

/// Outcome of comparing a node's logical prefix against `key` starting at `depth`.
pub(crate) struct PrefixMatch {
    pub(crate) matches: bool,
    /// Number of prefix bytes confirmed equal before a mismatch (or before
    /// the prefix/key ran out).
    pub(crate) first_diff: usize,
}

/// Compares a node's prefix against `key[depth..]`, fetching a minimum-key
/// leaf to recover bytes beyond `PREFIX_CAP` only when necessary.
///
/// # Safety
/// `header` must point at a live node.
pub(crate) unsafe fn prefix_matches(header: *const NodeHeader, key: &[u8], depth: usize) -> PrefixMatch {
    unsafe {
        let prefix_len = (*header).prefix_len as usize;
        let materialised_len = prefix_len.min(PREFIX_CAP);
        let available = key.len().saturating_sub(depth);
        let stop = materialised_len.min(available);

        let mut i = 0;
        while i < stop {
            if key[depth + i] != (*header).prefix[i] {
                return PrefixMatch {
                    matches: false,
                    first_diff: i,
                };
            }
            i += 1;
        }

        if depth + i == key.len() {
            // Key exhausted while still inside (or exactly at the end of)
            // the materialised prefix: only a match if the node's logical
            // prefix also ends exactly here.
            return PrefixMatch {
                matches: i == prefix_len,
                first_diff: i,
            };
        }

        if i == prefix_len {
            return PrefixMatch {
                matches: true,
                first_diff: i,
            };
        }

        // prefix_len > PREFIX_CAP and the key still has bytes left: resolve
        // the remainder lazily against a representative leaf.
        let leaf_ptr = find_minimum_key(ChildPtr::from_header(NonNull::new_unchecked(header as *mut NodeHeader)).0);
        let leaf = leaf_ptr.as_ref();
        let leaf_key = leaf.key();
        let stop2 = prefix_len.min(leaf_key.len()).min(key.len().saturating_sub(depth));
        while i < stop2 {
            if key[depth + i] != leaf_key[depth + i] {
                return PrefixMatch {
                    matches: false,
                    first_diff: i,
                };
            }
            i += 1;
        }
        // Only a match if the node's full logical prefix was confirmed; a
        // key that runs out before `prefix_len` bytes are verified (even
        // though every byte it did have agreed) must be treated as a
        // mismatch, the same as the materialised-only branch above.
        PrefixMatch {
            matches: i == prefix_len,
            first_diff: i,
        }
    }
}
