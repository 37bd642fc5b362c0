// =============================================================================
// Node identity and links
// =============================================================================

use std::fmt;

/// Stable index of a record inside its arena.
///
/// Records never move once inserted, so an id stays valid for as long as the
/// caller keeps the record at that position. `u32::MAX` is reserved as the
/// "no record" sentinel and is never handed out by [`NodeId::new`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) const NULL: NodeId = NodeId(u32::MAX);

    /// Wraps an arena index.
    ///
    /// # Panics
    ///
    /// Panics if `index` does not fit below the reserved sentinel.
    #[inline]
    pub fn new(index: usize) -> Self {
        assert!(
            index < u32::MAX as usize,
            "arena index {index} exceeds the addressable record range"
        );
        Self(index as u32)
    }

    #[inline]
    pub fn index(self) -> usize {
        debug_assert!(!self.is_null());
        self.0 as usize
    }

    #[inline]
    pub(crate) fn is_null(self) -> bool {
        self.0 == Self::NULL.0
    }

    #[inline]
    pub(crate) fn raw(self) -> u32 {
        self.0
    }

    /// `Some(self)` unless this is the sentinel.
    #[inline]
    pub(crate) fn get(self) -> Option<NodeId> {
        (!self.is_null()).then_some(self)
    }
}

impl From<usize> for NodeId {
    #[inline]
    fn from(index: usize) -> Self {
        Self::new(index)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("#null")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// Branch direction below a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left = 0,
    Right = 1,
}

impl Side {
    #[inline]
    pub(crate) fn right_if(cond: bool) -> Self {
        if cond {
            Side::Right
        } else {
            Side::Left
        }
    }

    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// The two links a record embeds to take part in a tree.
///
/// A record is linked while both branches hold an id. The only structural
/// information is the pair itself: a record whose two branches both point at
/// itself is the nodeless first leaf, and a cleared left branch marks a
/// record that is not (or no longer) in any tree.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Node {
    b: [NodeId; 2],
}

impl Node {
    /// A detached node, ready for insertion.
    #[inline]
    pub const fn new() -> Self {
        Self {
            b: [NodeId::NULL; 2],
        }
    }

    /// Whether the record currently sits outside any tree.
    #[inline]
    pub fn is_detached(&self) -> bool {
        self.b[Side::Left as usize].is_null()
    }

    #[inline]
    pub(crate) fn branch(&self, side: Side) -> NodeId {
        self.b[side as usize]
    }

    #[inline]
    pub(crate) fn left(&self) -> NodeId {
        self.b[0]
    }

    #[inline]
    pub(crate) fn right(&self) -> NodeId {
        self.b[1]
    }

    #[inline]
    pub(crate) fn set(&mut self, side: Side, id: NodeId) {
        self.b[side as usize] = id;
    }

    #[inline]
    pub(crate) fn set_both(&mut self, left: NodeId, right: NodeId) {
        self.b = [left, right];
    }

    /// Clears the left branch so later deletions see the record as gone.
    #[inline]
    pub(crate) fn detach(&mut self) {
        self.b[Side::Left as usize] = NodeId::NULL;
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_detached() {
            return f.write_str("Node(detached)");
        }
        f.debug_tuple("Node").field(&self.b[0]).field(&self.b[1]).finish()
    }
}
