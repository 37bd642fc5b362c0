//! # cbtrie
//!
//! Compact binary tries: ordered sets and maps whose only per-entry overhead
//! is a pair of links embedded in each record.
//!
//! Every record serves both as a leaf holding its key and, from the moment
//! it is inserted below an existing entry, as the internal node splitting
//! the two. No separate node is ever allocated; the first entry of a tree
//! has both links pointing to itself. A descent tells the two roles apart
//! from the keys alone, so nodes carry no tag, no depth and no parent link.
//!
//! Records live in caller-owned storage and are addressed by [`NodeId`].
//! Keys are scalars, fixed-size byte blocks, NUL-terminated strings or the
//! record's own id ([`ByAddress`]); see [`TrieKey`].
//!
//! ## Example
//!
//! ```rust
//! use cbtrie::{CbTree, Entry, NodeId};
//!
//! let mut records = vec![Entry::new(30u32, "c"), Entry::new(10, "a"), Entry::new(20, "b")];
//! let mut tree = CbTree::new();
//! for i in 0..records.len() {
//!     tree.insert(&mut records, NodeId::new(i));
//! }
//!
//! let ten = tree.lookup(&records, &10).unwrap();
//! assert_eq!(records[ten.index()].value, "a");
//!
//! let after = tree.next(&records, ten).unwrap();
//! assert_eq!(records[after.index()].key, 20);
//!
//! let ceiling = tree.lookup_ge(&records, &21).unwrap();
//! assert_eq!(records[ceiling.index()].value, "c");
//!
//! let values: Vec<&str> = tree.iter(&records).map(|id| records[id.index()].value).collect();
//! assert_eq!(values, ["a", "b", "c"]);
//!
//! assert_eq!(tree.delete(&mut records, ten), Some(ten));
//! assert_eq!(tree.delete(&mut records, ten), None);
//! ```

#![forbid(unsafe_code)]

mod arena;
mod descend;
mod key;
mod node;
mod tracing_helpers;
mod tree;

pub use arena::{Arena, ByAddress, Entry, Linked, Record, RefEntry, StrEntry};
pub use key::TrieKey;
pub use node::{Node, NodeId};
pub use tree::{CbTree, DebugEntries, Iter};

#[cfg(test)]
mod proptests;
