//! The container.
//!
//! [`CbTree`] holds nothing but the id of its top record. Every operation
//! borrows the arena holding the records for its duration, so one arena may
//! back any number of trees as long as each record is linked into at most
//! one of them at a time.

use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;

use crate::arena::Arena;
use crate::descend::{descend, Descent, Parent, Slot, Stop, Walk};
use crate::key::TrieKey;
use crate::node::{NodeId, Side};
use crate::tracing_helpers::debug_log;

/// A compact binary trie over records keyed by `K`.
///
/// Records are identified by [`NodeId`]; the tree never allocates and never
/// moves them. All results are ids of linked records.
pub struct CbTree<K: ?Sized> {
    top: NodeId,
    _key: PhantomData<fn(&K)>,
}

impl<K: ?Sized> Default for CbTree<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ?Sized> CbTree<K> {
    #[inline]
    pub const fn new() -> Self {
        Self {
            top: NodeId::NULL,
            _key: PhantomData,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.top.is_null()
    }

    /// Id of the top record, `None` when empty.
    #[inline]
    pub fn top(&self) -> Option<NodeId> {
        self.top.get()
    }
}

impl<K: TrieKey + ?Sized> CbTree<K> {
    // =========================================================================
    // Mutation
    // =========================================================================

    /// Links record `id` into the tree.
    ///
    /// Returns `id` once linked, or the id of the record already holding an
    /// equal key, in which case nothing changes.
    ///
    /// # Panics
    ///
    /// Panics if `id` is new to this tree but still linked somewhere.
    pub fn insert<A>(&mut self, arena: &mut A, id: NodeId) -> NodeId
    where
        A: Arena<Key = K> + ?Sized,
    {
        let Some(top) = self.top() else {
            assert!(
                arena.node(id).is_detached(),
                "record {id:?} is still linked elsewhere"
            );
            arena.node_mut(id).set_both(id, id);
            self.top = id;
            debug_log!(record = ?id, "first entry");
            return id;
        };

        let d = {
            let arena = &*arena;
            let key = arena.key(id);
            descend(arena, top, Walk::Equal, Some(&*key), false)
        };
        if let Some(existing) = d.found {
            return existing;
        }
        assert!(
            arena.node(id).is_detached(),
            "record {id:?} is still linked elsewhere"
        );

        let occupant = d.closest;
        match d.nside {
            Side::Right => arena.node_mut(id).set_both(occupant, id),
            Side::Left => arena.node_mut(id).set_both(id, occupant),
        }
        self.relink(arena, d.insertion_slot(), id);
        id
    }

    /// Unlinks record `id`.
    ///
    /// Returns `None` if the record is not linked, or if the record linked
    /// under its key is a different one. Deleting twice is harmless.
    pub fn delete<A>(&mut self, arena: &mut A, id: NodeId) -> Option<NodeId>
    where
        A: Arena<Key = K> + ?Sized,
    {
        if arena.node(id).is_detached() {
            return None;
        }
        let d = {
            let arena = &*arena;
            let key = arena.key(id);
            self.locate(arena, &*key)?
        };
        if d.found != Some(id) {
            return None;
        }
        self.unlink(arena, &d);
        Some(id)
    }

    /// Unlinks and returns the record holding `key`.
    ///
    /// # Panics
    ///
    /// Panics if the record found under `key` does not carry it, which can
    /// only happen when a linked key was modified in place.
    pub fn pick<A>(&mut self, arena: &mut A, key: &K) -> Option<NodeId>
    where
        A: Arena<Key = K> + ?Sized,
    {
        let d = self.locate(&*arena, key)?;
        let id = d.found?;
        self.unlink(arena, &d);
        assert!(
            *arena.key(id) == *key,
            "picked record {id:?} does not carry key {key:?}"
        );
        Some(id)
    }

    fn locate<A>(&self, arena: &A, key: &K) -> Option<Descent>
    where
        A: Arena<Key = K> + ?Sized,
    {
        let top = self.top()?;
        Some(descend(arena, top, Walk::Equal, Some(key), true))
    }

    /// Removes `d.closest`, which `d` found with node tracking on.
    fn unlink<A>(&mut self, arena: &mut A, d: &Descent)
    where
        A: Arena<Key = K> + ?Sized,
    {
        let ret = d.closest;
        let Parent::Node(lparent) = d.leaf_parent.parent else {
            debug_log!(record = ?ret, "removed sole entry");
            self.top = NodeId::NULL;
            arena.node_mut(ret).detach();
            return;
        };

        // The leaf parent's node goes away: its other branch takes its place.
        let sibling = arena.node(lparent).branch(d.leaf_parent.side.opposite());
        self.relink(arena, d.grand_parent, sibling);

        if lparent == ret {
            debug_log!(record = ?ret, "removed leaf hanging off its own node");
        } else {
            let node = *arena.node(ret);
            if node.left() == node.right() {
                debug_log!(record = ?ret, heir = ?lparent, "removed nodeless leaf");
                arena.node_mut(lparent).set_both(lparent, lparent);
            } else {
                // The freed leaf parent takes over the removed record's node.
                debug_log!(record = ?ret, heir = ?lparent, "moved node role");
                arena.node_mut(lparent).set_both(node.left(), node.right());
                self.relink(arena, d.node_parent, lparent);
            }
        }
        arena.node_mut(ret).detach();
    }

    fn relink<A>(&mut self, arena: &mut A, slot: Slot, id: NodeId)
    where
        A: Arena<Key = K> + ?Sized,
    {
        match slot.parent {
            Parent::Root => self.top = id,
            Parent::Node(p) => arena.node_mut(p).set(slot.side, id),
        }
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn lookup<A>(&self, arena: &A, key: &K) -> Option<NodeId>
    where
        A: Arena<Key = K> + ?Sized,
    {
        let top = self.top()?;
        descend(arena, top, Walk::Equal, Some(key), false).found
    }

    #[inline]
    pub fn contains_key<A>(&self, arena: &A, key: &K) -> bool
    where
        A: Arena<Key = K> + ?Sized,
    {
        self.lookup(arena, key).is_some()
    }

    /// Record with the smallest key at or above `key`.
    pub fn lookup_ge<A>(&self, arena: &A, key: &K) -> Option<NodeId>
    where
        A: Arena<Key = K> + ?Sized,
    {
        self.ceiling(arena, key, Walk::GreaterEqual)
    }

    /// Record with the smallest key strictly above `key`.
    pub fn lookup_gt<A>(&self, arena: &A, key: &K) -> Option<NodeId>
    where
        A: Arena<Key = K> + ?Sized,
    {
        self.ceiling(arena, key, Walk::GreaterThan)
    }

    /// Record with the largest key at or below `key`.
    pub fn lookup_le<A>(&self, arena: &A, key: &K) -> Option<NodeId>
    where
        A: Arena<Key = K> + ?Sized,
    {
        self.floor(arena, key, Walk::LessEqual)
    }

    /// Record with the largest key strictly below `key`.
    pub fn lookup_lt<A>(&self, arena: &A, key: &K) -> Option<NodeId>
    where
        A: Arena<Key = K> + ?Sized,
    {
        self.floor(arena, key, Walk::LessThan)
    }

    fn ceiling<A>(&self, arena: &A, key: &K, walk: Walk) -> Option<NodeId>
    where
        A: Arena<Key = K> + ?Sized,
    {
        let top = self.top()?;
        let d = descend(arena, top, walk, Some(key), false);
        if d.found.is_some() {
            return d.found;
        }
        if d.stop == Stop::Above && d.order == Ordering::Greater {
            // The whole subtree sits above the key.
            return Some(descend(arena, d.closest, Walk::First, None, false).closest);
        }
        let anchor = d.anchor?;
        Some(descend(arena, anchor, Walk::Next, None, false).closest)
    }

    fn floor<A>(&self, arena: &A, key: &K, walk: Walk) -> Option<NodeId>
    where
        A: Arena<Key = K> + ?Sized,
    {
        let top = self.top()?;
        let d = descend(arena, top, walk, Some(key), false);
        if d.found.is_some() {
            return d.found;
        }
        if d.stop == Stop::Above && d.order == Ordering::Less {
            return Some(descend(arena, d.closest, Walk::Last, None, false).closest);
        }
        let anchor = d.anchor?;
        Some(descend(arena, anchor, Walk::Prev, None, false).closest)
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    pub fn first<A>(&self, arena: &A) -> Option<NodeId>
    where
        A: Arena<Key = K> + ?Sized,
    {
        let top = self.top()?;
        Some(descend(arena, top, Walk::First, None, false).closest)
    }

    pub fn last<A>(&self, arena: &A) -> Option<NodeId>
    where
        A: Arena<Key = K> + ?Sized,
    {
        let top = self.top()?;
        Some(descend(arena, top, Walk::Last, None, false).closest)
    }

    /// Record following `id`, which must be linked in this tree.
    ///
    /// Each call descends again from the top, so it is only as consistent as
    /// the tree it observes.
    pub fn next<A>(&self, arena: &A, id: NodeId) -> Option<NodeId>
    where
        A: Arena<Key = K> + ?Sized,
    {
        self.neighbor(arena, id, Walk::FindThenNext, Walk::Next)
    }

    /// Record preceding `id`, which must be linked in this tree.
    pub fn prev<A>(&self, arena: &A, id: NodeId) -> Option<NodeId>
    where
        A: Arena<Key = K> + ?Sized,
    {
        self.neighbor(arena, id, Walk::FindThenPrev, Walk::Prev)
    }

    fn neighbor<A>(&self, arena: &A, id: NodeId, find: Walk, step: Walk) -> Option<NodeId>
    where
        A: Arena<Key = K> + ?Sized,
    {
        let top = self.top()?;
        let key = arena.key(id);
        let d = descend(arena, top, find, Some(&*key), false);
        d.found?;
        let anchor = d.anchor?;
        Some(descend(arena, anchor, step, None, false).closest)
    }

    /// Ids in ascending key order.
    pub fn iter<'a, A>(&'a self, arena: &'a A) -> Iter<'a, K, A>
    where
        A: Arena<Key = K> + ?Sized,
    {
        Iter {
            tree: self,
            arena,
            front: self.first(arena),
            back: self.last(arena),
        }
    }

    /// Debug view of the entries as an id to key map, in key order.
    pub fn debug<'a, A>(&'a self, arena: &'a A) -> DebugEntries<'a, K, A>
    where
        A: Arena<Key = K> + ?Sized,
    {
        DebugEntries { tree: self, arena }
    }
}

impl<K: ?Sized> fmt::Debug for CbTree<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CbTree").field("top", &self.top).finish()
    }
}

// =============================================================================
// Iteration
// =============================================================================

/// Double-ended walk over a tree, built from `first`/`next` and `last`/`prev`.
pub struct Iter<'a, K: ?Sized, A: ?Sized> {
    tree: &'a CbTree<K>,
    arena: &'a A,
    front: Option<NodeId>,
    back: Option<NodeId>,
}

impl<K, A> Iterator for Iter<'_, K, A>
where
    K: TrieKey + ?Sized,
    A: Arena<Key = K> + ?Sized,
{
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let cur = self.front?;
        if self.back == Some(cur) {
            self.front = None;
            self.back = None;
        } else {
            self.front = self.tree.next(self.arena, cur);
        }
        Some(cur)
    }
}

impl<K, A> DoubleEndedIterator for Iter<'_, K, A>
where
    K: TrieKey + ?Sized,
    A: Arena<Key = K> + ?Sized,
{
    fn next_back(&mut self) -> Option<NodeId> {
        let cur = self.back?;
        if self.front == Some(cur) {
            self.front = None;
            self.back = None;
        } else {
            self.back = self.tree.prev(self.arena, cur);
        }
        Some(cur)
    }
}

impl<K, A> std::iter::FusedIterator for Iter<'_, K, A>
where
    K: TrieKey + ?Sized,
    A: Arena<Key = K> + ?Sized,
{
}

pub struct DebugEntries<'a, K: ?Sized, A: ?Sized> {
    tree: &'a CbTree<K>,
    arena: &'a A,
}

impl<K, A> fmt::Debug for DebugEntries<'_, K, A>
where
    K: TrieKey + ?Sized,
    A: Arena<Key = K> + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for id in self.tree.iter(self.arena) {
            let key = self.arena.key(id);
            map.entry(&id, &&*key);
        }
        map.finish()
    }
}
