//! Record storage.
//!
//! A tree never owns its entries. The caller keeps them in some indexable
//! storage and hands that storage to each tree operation as an [`Arena`]. The
//! blanket arenas over `[R]` and `Vec<R>` cover the common case of a vector
//! of records embedding a [`Node`]; [`ByAddress`] keys the same records by
//! their own position instead of a stored key.

use std::borrow::Cow;
use std::ffi::{CStr, CString};
use std::ops::{Deref, DerefMut};

use crate::key::TrieKey;
use crate::node::{Node, NodeId};

/// Anything that embeds a [`Node`].
pub trait Linked {
    fn node(&self) -> &Node;

    fn node_mut(&mut self) -> &mut Node;
}

/// A linked record carrying its own key.
pub trait Record: Linked {
    type Key: TrieKey + ?Sized;

    /// Must stay constant while the record is linked.
    fn key(&self) -> &Self::Key;
}

/// Indexable storage of records.
///
/// `key` returns a [`Cow`] so that arenas whose key is derived from the
/// record's position (see [`ByAddress`]) can produce it on the fly.
pub trait Arena {
    type Key: TrieKey + ?Sized;

    fn node(&self, id: NodeId) -> &Node;

    fn node_mut(&mut self, id: NodeId) -> &mut Node;

    fn key(&self, id: NodeId) -> Cow<'_, Self::Key>;
}

impl<R: Record> Arena for [R] {
    type Key = R::Key;

    #[inline]
    fn node(&self, id: NodeId) -> &Node {
        self[id.index()].node()
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self[id.index()].node_mut()
    }

    #[inline]
    fn key(&self, id: NodeId) -> Cow<'_, R::Key> {
        Cow::Borrowed(self[id.index()].key())
    }
}

impl<R: Record> Arena for Vec<R> {
    type Key = R::Key;

    #[inline]
    fn node(&self, id: NodeId) -> &Node {
        self.as_slice().node(id)
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.as_mut_slice().node_mut(id)
    }

    #[inline]
    fn key(&self, id: NodeId) -> Cow<'_, R::Key> {
        self.as_slice().key(id)
    }
}

// =============================================================================
// Identity-keyed storage
// =============================================================================

/// Orders records by their own [`NodeId`].
///
/// Useful for sets of objects that have no natural key but must be found
/// again quickly, or walked in a stable order.
#[derive(Clone, Debug, Default)]
pub struct ByAddress<R> {
    records: Vec<R>,
}

impl<R> ByAddress<R> {
    pub fn new(records: Vec<R>) -> Self {
        Self { records }
    }

    pub fn into_inner(self) -> Vec<R> {
        self.records
    }
}

impl<R> Deref for ByAddress<R> {
    type Target = Vec<R>;

    fn deref(&self) -> &Vec<R> {
        &self.records
    }
}

impl<R> DerefMut for ByAddress<R> {
    fn deref_mut(&mut self) -> &mut Vec<R> {
        &mut self.records
    }
}

impl<R: Linked> Arena for ByAddress<R> {
    type Key = NodeId;

    #[inline]
    fn node(&self, id: NodeId) -> &Node {
        self.records[id.index()].node()
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.records[id.index()].node_mut()
    }

    #[inline]
    fn key(&self, id: NodeId) -> Cow<'_, NodeId> {
        Cow::Owned(id)
    }
}

// =============================================================================
// Ready-made records
// =============================================================================

/// A record holding its key inline: scalars or fixed-size blocks.
#[derive(Clone, Debug)]
pub struct Entry<K, V> {
    node: Node,
    pub key: K,
    pub value: V,
}

impl<K, V> Entry<K, V> {
    pub fn new(key: K, value: V) -> Self {
        Self {
            node: Node::new(),
            key,
            value,
        }
    }

    pub fn is_linked(&self) -> bool {
        !self.node.is_detached()
    }
}

impl<K, V> Linked for Entry<K, V> {
    #[inline]
    fn node(&self) -> &Node {
        &self.node
    }

    #[inline]
    fn node_mut(&mut self) -> &mut Node {
        &mut self.node
    }
}

impl<K: TrieKey, V> Record for Entry<K, V> {
    type Key = K;

    #[inline]
    fn key(&self) -> &K {
        &self.key
    }
}

/// A record owning a NUL-terminated string key.
#[derive(Clone, Debug)]
pub struct StrEntry<V> {
    node: Node,
    key: CString,
    pub value: V,
}

impl<V> StrEntry<V> {
    pub fn new(key: CString, value: V) -> Self {
        Self {
            node: Node::new(),
            key,
            value,
        }
    }
}

impl<V> Linked for StrEntry<V> {
    #[inline]
    fn node(&self) -> &Node {
        &self.node
    }

    #[inline]
    fn node_mut(&mut self) -> &mut Node {
        &mut self.node
    }
}

impl<V> Record for StrEntry<V> {
    type Key = CStr;

    #[inline]
    fn key(&self) -> &CStr {
        &self.key
    }
}

/// A record whose key lives elsewhere and is only referenced.
#[derive(Debug)]
pub struct RefEntry<'a, K: ?Sized, V> {
    node: Node,
    pub key: &'a K,
    pub value: V,
}

impl<'a, K: ?Sized, V> RefEntry<'a, K, V> {
    pub fn new(key: &'a K, value: V) -> Self {
        Self {
            node: Node::new(),
            key,
            value,
        }
    }
}

impl<K: ?Sized, V> Linked for RefEntry<'_, K, V> {
    #[inline]
    fn node(&self) -> &Node {
        &self.node
    }

    #[inline]
    fn node_mut(&mut self) -> &mut Node {
        &mut self.node
    }
}

impl<K: TrieKey + ?Sized, V> Record for RefEntry<'_, K, V> {
    type Key = K;

    #[inline]
    fn key(&self) -> &K {
        self.key
    }
}
