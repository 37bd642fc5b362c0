//! The descent engine.
//!
//! Every operation of the tree is one or two calls to [`descend`]. A record
//! plays two roles over its life: it is the *node* splitting the keys that
//! were present when it was inserted, and the *leaf* holding its own key. The
//! walk never stores which role it is looking at; it infers it from the keys:
//!
//! - a record whose two branches are the same record is the nodeless first
//!   leaf (both branches point to itself);
//! - below a node, the split (closeness of the two branch keys) strictly
//!   increases. A record whose branches are *less* close than the previous
//!   node's can only be the leaf appearance of a node already passed above;
//! - a record whose chosen branch points back to itself is a leaf too.
//!
//! For keyed walks there is one more way out: when the key is less close to
//! both branches than they are to each other, it diverges from the whole
//! subtree and cannot appear below. The walk then stops *above* that node.

use std::cmp::Ordering;

use crate::arena::Arena;
use crate::key::TrieKey;
use crate::node::{NodeId, Side};
use crate::tracing_helpers::trace_log;

/// How a descent picks its branches and what it accepts at the end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Walk {
    /// Leftmost entry.
    First,
    /// Right once, then left: first entry of the right subtree.
    Next,
    /// Left once, then right: last entry of the left subtree.
    Prev,
    /// Rightmost entry.
    Last,
    Equal,
    GreaterEqual,
    GreaterThan,
    LessEqual,
    LessThan,
    /// Exact match, remembering the last left turn.
    FindThenNext,
    /// Exact match, remembering the last right turn.
    FindThenPrev,
}

impl Walk {
    #[inline]
    pub(crate) fn is_keyed(self) -> bool {
        !matches!(self, Walk::First | Walk::Next | Walk::Prev | Walk::Last)
    }

    #[inline]
    fn initial_side(self) -> Side {
        match self {
            Walk::Next | Walk::Last => Side::Right,
            _ => Side::Left,
        }
    }

    /// Walks that later need the smallest entry above the visited path.
    #[inline]
    fn anchors_left(self) -> bool {
        matches!(
            self,
            Walk::FindThenNext | Walk::GreaterEqual | Walk::GreaterThan
        )
    }

    /// Walks that later need the largest entry below the visited path.
    #[inline]
    fn anchors_right(self) -> bool {
        matches!(self, Walk::FindThenPrev | Walk::LessEqual | Walk::LessThan)
    }

    fn accepts(self, stop: Stop, order: Ordering) -> bool {
        match self {
            Walk::First | Walk::Next | Walk::Prev | Walk::Last => true,
            Walk::Equal | Walk::FindThenNext | Walk::FindThenPrev => order == Ordering::Equal,
            // Stopping above a node says nothing about that node's own key
            // being the nearest one; composition resolves it.
            Walk::GreaterEqual => stop == Stop::Leaf && order != Ordering::Less,
            Walk::GreaterThan => stop == Stop::Leaf && order == Ordering::Greater,
            Walk::LessEqual => stop == Stop::Leaf && order != Ordering::Greater,
            Walk::LessThan => stop == Stop::Leaf && order == Ordering::Less,
        }
    }
}

/// Holder of a branch: the tree's top reference, or a record's node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Parent {
    Root,
    Node(NodeId),
}

/// One branch slot. The side is meaningless for [`Parent::Root`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Slot {
    pub parent: Parent,
    pub side: Side,
}

impl Slot {
    pub(crate) const ROOT: Slot = Slot {
        parent: Parent::Root,
        side: Side::Left,
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Stop {
    /// Ended on a single entry.
    Leaf,
    /// The key diverges from the whole subtree of the closest record.
    Above,
}

/// Everything a single walk learned.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Descent {
    /// Record the walk ended on.
    pub closest: NodeId,
    /// `closest`, if it satisfies the walk.
    pub found: Option<NodeId>,
    pub stop: Stop,
    /// `closest`'s key against the sought key; `Equal` for keyless walks.
    pub order: Ordering,
    /// Slot referencing `closest`; a new record gets spliced in here.
    pub leaf_parent: Slot,
    /// Side a new record takes below itself, `closest` taking the other one.
    pub nside: Side,
    /// Slot referencing the record holding `leaf_parent`.
    pub grand_parent: Slot,
    /// Slot referencing the node appearance of the sought record.
    /// Only filled when requested.
    pub node_parent: Slot,
    /// Last record where the walk turned left (ascending walks) or right
    /// (descending walks).
    pub anchor: Option<NodeId>,
}

impl Descent {
    #[inline]
    pub(crate) fn insertion_slot(&self) -> Slot {
        self.leaf_parent
    }
}

/// Walks down from `top` in a single pass.
///
/// `top` must be linked. It is either the tree's top record or, for
/// re-descents, a record previously visited in its node role. Keyed walks
/// take `Some(key)`, keyless walks `None`. `track_node` enables the extra
/// key comparison at every level that locates the sought record's node
/// appearance; only deletion needs it.
pub(crate) fn descend<A: Arena + ?Sized>(
    arena: &A,
    top: NodeId,
    walk: Walk,
    key: Option<&A::Key>,
    track_node: bool,
) -> Descent {
    debug_assert_eq!(walk.is_keyed(), key.is_some(), "walk {walk:?} key mismatch");

    let mut p = top;
    let mut leaf_parent = Slot::ROOT;
    let mut grand_parent = Slot::ROOT;
    let mut node_parent = Slot::ROOT;
    let mut anchor = None;
    let mut side = walk.initial_side();
    let mut prev_split = <A::Key as TrieKey>::FLOOR;

    let stop = loop {
        let node = arena.node(p);
        let (l, r) = (node.left(), node.right());
        debug_assert!(!node.is_detached(), "descended into detached record {p:?}");

        if l == r {
            trace_log!(?walk, node = ?p, "nodeless leaf");
            break Stop::Leaf;
        }

        let lkey = arena.key(l);
        let rkey = arena.key(r);

        // Branch choice first: ties go right so that an equal key lands on
        // its own leaf.
        let spans = key.map(|key| {
            let llen = key.common(&lkey);
            let rlen = key.common(&rkey);
            side = Side::right_if(llen <= rlen);
            (llen, rlen)
        });

        let split = lkey.common(&rkey);
        if split < prev_split {
            trace_log!(?walk, node = ?p, ?split, ?prev_split, "leaf below its node");
            break Stop::Leaf;
        }

        if let (Some(key), Some((llen, rlen))) = (key, spans) {
            if llen < split && rlen < split {
                trace_log!(?walk, node = ?p, ?split, "key diverges above node");
                break Stop::Above;
            }
            if track_node && *key == *arena.key(p) {
                node_parent = leaf_parent;
            }
        }
        prev_split = split;

        let taken = side;
        match taken {
            Side::Left => {
                if walk.anchors_left() {
                    anchor = Some(p);
                }
                if walk == Walk::Prev {
                    side = Side::Right;
                }
            }
            Side::Right => {
                if walk.anchors_right() {
                    anchor = Some(p);
                }
                if walk == Walk::Next {
                    side = Side::Left;
                }
            }
        }

        grand_parent = leaf_parent;
        leaf_parent = Slot {
            parent: Parent::Node(p),
            side: taken,
        };

        let child = node.branch(taken);
        if child == p {
            trace_log!(?walk, node = ?p, side = ?taken, "self loop");
            break Stop::Leaf;
        }
        p = child;
    };

    let order = match key {
        Some(key) => Ord::cmp(&*arena.key(p), key),
        None => Ordering::Equal,
    };
    let found = walk.accepts(stop, order).then_some(p);
    trace_log!(?walk, closest = ?p, ?stop, ?order, ?found, ?anchor, "descent done");

    Descent {
        closest: p,
        found,
        stop,
        order,
        leaf_parent,
        nside: Side::right_if(order != Ordering::Greater),
        grand_parent,
        node_parent,
        anchor,
    }
}
