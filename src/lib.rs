//! # art-olc
//!
//! A concurrent, in-memory ordered index mapping variable-length byte-string
//! keys to fixed-width `i64` values: an Adaptive Radix Tree (Leis et al.,
//! 2013) with path compression, lazy prefix expansion for keys beyond the
//! materialised prefix capacity, and an optimistic-lock-coupling (OLC)
//! concurrency protocol that lets `search` run wait-free against concurrent
//! `insert`s.
//!
//! ## Example
//!
//! ```rust
//! use art_olc::Tree;
//!
//! let tree = Tree::new();
//! tree.insert(b"hello", 12);
//! tree.insert(b"hell", 13);
//!
//! assert_eq!(tree.search(b"hello"), Some(12));
//! assert_eq!(tree.search(b"hell"), Some(13));
//! assert_eq!(tree.search(b"hel"), None);
//! ```
//!
//! `Tree` is `Send + Sync`: share one behind an `Arc` across threads and
//! call `insert`/`search` concurrently without any external locking.
//!
//! Deletion, range scans, ordered iteration, and durability are out of
//! scope; see the module docs on [`tree`] for the full concurrency contract.

#![deny(unsafe_op_in_unsafe_fn)]

mod alloc;
mod leaf;
mod node;
mod olc;
mod ptr;
mod retire;
mod tree;

pub use alloc::TreeStats;
pub use leaf::Value;
pub use tree::Tree;


#[cfg(test)]
mod proptests;
