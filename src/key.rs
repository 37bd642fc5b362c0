//! Key strategies.
//!
//! The descent never looks at key bits directly. It only asks two things of a
//! key type: how close two keys are ([`TrieKey::common`]) and how they order
//! ([`Ord`]). Both must agree: if `a < b < c` then `common(a, c)` can be no
//! larger than either `common(a, b)` or `common(b, c)`.
//!
//! Closeness is expressed as a [`TrieKey::Span`] where a larger value means
//! more leading bits shared. Byte keys report the number of identical leading
//! bits; fixed-width scalars report the complemented XOR of the two values,
//! which orders the same way as the position of the highest differing bit
//! while keeping the lower bits around for free. Identical keys always report
//! the largest representable span.

use std::ffi::CStr;
use std::fmt;

use crate::node::NodeId;

// =============================================================================
// Bit utilities
// =============================================================================

/// Number of identical leading bits of two equally long blocks, or
/// `usize::MAX` if they are identical. Bits are numbered from the MSB of the
/// first byte, the way the blocks compare lexicographically.
#[inline]
pub(crate) fn equal_bits(a: &[u8], b: &[u8]) -> usize {
    debug_assert_eq!(a.len(), b.len(), "blocks must share one length");

    let mut base = 0usize;
    let mut wa = a.chunks_exact(8);
    let mut wb = b.chunks_exact(8);
    for (x, y) in (&mut wa).zip(&mut wb) {
        let diff = load_be_u64(x) ^ load_be_u64(y);
        if diff != 0 {
            return base + diff.leading_zeros() as usize;
        }
        base += 64;
    }

    for (x, y) in wa.remainder().iter().zip(wb.remainder()) {
        let diff = x ^ y;
        if diff != 0 {
            return base + diff.leading_zeros() as usize;
        }
        base += 8;
    }
    usize::MAX
}

/// Like [`equal_bits`] for NUL-terminated strings (terminator included).
///
/// A string that is a strict prefix of another differs from it at its
/// terminator, so "1" and "10" share 10 bits: the whole first byte and the
/// two leading zero bits of `'0'` (0x30) against NUL.
#[inline]
pub(crate) fn string_equal_bits(a: &[u8], b: &[u8]) -> usize {
    for (i, (&x, &y)) in a.iter().zip(b).enumerate() {
        let diff = x ^ y;
        if diff != 0 {
            return i * 8 + diff.leading_zeros() as usize;
        }
        if x == 0 {
            break;
        }
    }
    usize::MAX
}

#[inline]
fn load_be_u64(chunk: &[u8]) -> u64 {
    let mut w = [0u8; 8];
    w.copy_from_slice(chunk);
    u64::from_be_bytes(w)
}

// =============================================================================
// Strategy trait
// =============================================================================

/// A key the trie can branch on.
pub trait TrieKey: Ord + ToOwned + fmt::Debug {
    /// Closeness between two keys; larger means a longer shared prefix.
    type Span: Copy + Ord + fmt::Debug;

    /// Initial "previous split" of a descent. No two distinct keys may report
    /// a span below it, so the first record visited is never taken for a leaf.
    const FLOOR: Self::Span;

    /// Closeness of `self` and `other`; maximal when they are equal.
    fn common(&self, other: &Self) -> Self::Span;
}

macro_rules! scalar_key {
    ($($t:ty),* $(,)?) => {$(
        impl TrieKey for $t {
            type Span = $t;
            const FLOOR: $t = 0;

            #[inline]
            fn common(&self, other: &Self) -> $t {
                !(self ^ other)
            }
        }
    )*};
}

scalar_key!(u8, u16, u32, u64, u128, usize);

/// Fixed-length opaque blocks. Every key of one tree has the same length by
/// construction, which is what makes bitwise closeness meaningful.
impl<const N: usize> TrieKey for [u8; N] {
    type Span = usize;
    const FLOOR: usize = 0;

    #[inline]
    fn common(&self, other: &Self) -> usize {
        equal_bits(self, other)
    }
}

impl TrieKey for CStr {
    type Span = usize;
    const FLOOR: usize = 0;

    #[inline]
    fn common(&self, other: &Self) -> usize {
        string_equal_bits(self.to_bytes_with_nul(), other.to_bytes_with_nul())
    }
}

/// Identity keys: a record's own position orders it.
impl TrieKey for NodeId {
    type Span = u32;
    const FLOOR: u32 = 0;

    #[inline]
    fn common(&self, other: &Self) -> u32 {
        !(self.raw() ^ other.raw())
    }
}
