use super::*;

use crate::arena::{Entry, Record, StrEntry};
use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::ffi::{CStr, CString};
use std::ops::Bound::{Excluded, Unbounded};

/// Walks the raw structure, checking the leaf/node duality rules, and
/// returns the leaves in order. Also checks the public traversal agrees.
fn validate_tree<A: Arena + ?Sized>(tree: &CbTree<A::Key>, arena: &A) -> Vec<NodeId> {
    let mut leaves = Vec::new();
    if let Some(top) = tree.top() {
        collect_leaves(arena, top, <A::Key as TrieKey>::FLOOR, &mut leaves);
    }

    let unique: HashSet<NodeId> = leaves.iter().copied().collect();
    assert_eq!(unique.len(), leaves.len(), "record reached twice as a leaf");
    for w in leaves.windows(2) {
        assert!(
            *arena.key(w[0]) < *arena.key(w[1]),
            "leaves out of order: {:?} then {:?}",
            w[0],
            w[1]
        );
    }

    let walked: Vec<NodeId> = tree.iter(arena).collect();
    assert_eq!(walked, leaves, "public traversal disagrees with structure");
    let mut back: Vec<NodeId> = tree.iter(arena).rev().collect();
    back.reverse();
    assert_eq!(back, leaves, "reverse traversal disagrees with structure");
    leaves
}

fn collect_leaves<A: Arena + ?Sized>(
    arena: &A,
    p: NodeId,
    prev_split: <A::Key as TrieKey>::Span,
    out: &mut Vec<NodeId>,
) {
    let node = arena.node(p);
    assert!(!node.is_detached(), "reached detached record {p:?}");
    let (l, r) = (node.left(), node.right());
    if l == r {
        assert_eq!(l, p, "twin branches must loop back");
        out.push(p);
        return;
    }
    let split = arena.key(l).common(&arena.key(r));
    if split < prev_split {
        out.push(p);
        return;
    }
    for child in [l, r] {
        if child == p {
            out.push(p);
        } else {
            collect_leaves(arena, child, split, out);
        }
    }
}

// =============================================================================
// Masked scalar keys: two records per key value
// =============================================================================

const TWIN: usize = 256;

struct Scalars {
    arena: Vec<Entry<u32, ()>>,
    tree: CbTree<u32>,
}

impl Scalars {
    fn new() -> Self {
        Self {
            arena: (0..2 * TWIN).map(|i| Entry::new((i % TWIN) as u32, ())).collect(),
            tree: CbTree::new(),
        }
    }

    fn id(k: u8, twin: bool) -> NodeId {
        NodeId::new(k as usize + if twin { TWIN } else { 0 })
    }

    fn check_against(&self, m: &BTreeMap<u32, NodeId>) {
        let leaves = validate_tree(&self.tree, &self.arena);
        let want: Vec<NodeId> = m.values().copied().collect();
        assert_eq!(leaves, want);
        for (i, &id) in want.iter().enumerate() {
            let next = want.get(i + 1).copied();
            let prev = i.checked_sub(1).map(|j| want[j]);
            assert_eq!(self.tree.next(&self.arena, id), next, "next of {id:?}");
            assert_eq!(self.tree.prev(&self.arena, id), prev, "prev of {id:?}");
        }
    }
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 4)]
    Insert(u8, bool),
    #[proptest(weight = 2)]
    Delete(u8, bool),
    Pick(u8),
    Lookup(u8),
    Ge(u8),
    Gt(u8),
    Le(u8),
    Lt(u8),
    Next(u8),
    Prev(u8),
}

fn apply(s: &mut Scalars, m: &mut BTreeMap<u32, NodeId>, op: Op) -> Result<(), TestCaseError> {
    match op {
        Op::Insert(k, twin) => {
            let id = Scalars::id(k, twin);
            let got = s.tree.insert(&mut s.arena, id);
            let want = *m.entry(k as u32).or_insert(id);
            prop_assert_eq!(got, want);
        }
        Op::Delete(k, twin) => {
            let id = Scalars::id(k, twin);
            let got = s.tree.delete(&mut s.arena, id);
            let want = if m.get(&(k as u32)) == Some(&id) {
                m.remove(&(k as u32))
            } else {
                None
            };
            prop_assert_eq!(got, want);
            prop_assert!(!s.arena[id.index()].is_linked() || want.is_none());
        }
        Op::Pick(k) => {
            let got = s.tree.pick(&mut s.arena, &(k as u32));
            prop_assert_eq!(got, m.remove(&(k as u32)));
        }
        Op::Lookup(k) => {
            let got = s.tree.lookup(&s.arena, &(k as u32));
            prop_assert_eq!(got, m.get(&(k as u32)).copied());
        }
        Op::Ge(k) => {
            let want = m.range(k as u32..).next().map(|(_, id)| *id);
            prop_assert_eq!(s.tree.lookup_ge(&s.arena, &(k as u32)), want);
        }
        Op::Gt(k) => {
            let want = m.range((Excluded(k as u32), Unbounded)).next().map(|(_, id)| *id);
            prop_assert_eq!(s.tree.lookup_gt(&s.arena, &(k as u32)), want);
        }
        Op::Le(k) => {
            let want = m.range(..=k as u32).next_back().map(|(_, id)| *id);
            prop_assert_eq!(s.tree.lookup_le(&s.arena, &(k as u32)), want);
        }
        Op::Lt(k) => {
            let want = m.range(..k as u32).next_back().map(|(_, id)| *id);
            prop_assert_eq!(s.tree.lookup_lt(&s.arena, &(k as u32)), want);
        }
        Op::Next(k) => match m.get(&(k as u32)) {
            Some(&id) => {
                let want = m.range((Excluded(k as u32), Unbounded)).next().map(|(_, id)| *id);
                prop_assert_eq!(s.tree.next(&s.arena, id), want);
            }
            None => {
                prop_assert_eq!(s.tree.next(&s.arena, Scalars::id(k, false)), None);
            }
        },
        Op::Prev(k) => match m.get(&(k as u32)) {
            Some(&id) => {
                let want = m.range(..k as u32).next_back().map(|(_, id)| *id);
                prop_assert_eq!(s.tree.prev(&s.arena, id), want);
            }
            None => {
                prop_assert_eq!(s.tree.prev(&s.arena, Scalars::id(k, false)), None);
            }
        },
    }
    Ok(())
}

// =============================================================================
// String keys over a tiny alphabet: long prefix chains
// =============================================================================

struct Strings {
    arena: Vec<StrEntry<()>>,
    ids: HashMap<String, NodeId>,
    tree: CbTree<CStr>,
}

impl Strings {
    fn new() -> Self {
        Self {
            arena: Vec::new(),
            ids: HashMap::new(),
            tree: CbTree::new(),
        }
    }

    /// Record for `s`, created on first use.
    fn record(&mut self, s: &str) -> NodeId {
        if let Some(&id) = self.ids.get(s) {
            return id;
        }
        let id = NodeId::new(self.arena.len());
        self.arena.push(StrEntry::new(CString::new(s).unwrap(), ()));
        self.ids.insert(s.to_owned(), id);
        id
    }

    fn name(&self, id: Option<NodeId>) -> Option<String> {
        id.map(|id| self.arena[id.index()].key().to_str().unwrap().to_owned())
    }

    fn keys(&self) -> Vec<String> {
        validate_tree(&self.tree, &self.arena)
            .into_iter()
            .map(|id| self.name(Some(id)).unwrap())
            .collect()
    }
}

#[derive(Clone, Debug)]
enum StrOp {
    Insert(String),
    Delete(String),
    Ge(String),
    Le(String),
}

fn str_ops() -> impl Strategy<Value = Vec<StrOp>> {
    let key = "[0-2]{0,5}";
    let op = prop_oneof![
        4 => key.prop_map(StrOp::Insert),
        2 => key.prop_map(StrOp::Delete),
        1 => key.prop_map(StrOp::Ge),
        1 => key.prop_map(StrOp::Le),
    ];
    prop::collection::vec(op, 0..=300)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence_masked(ops in prop::collection::vec(any::<Op>(), 0..=400)) {
        let mut s = Scalars::new();
        let mut m: BTreeMap<u32, NodeId> = BTreeMap::new();
        for op in ops {
            apply(&mut s, &mut m, op)?;
        }
        s.check_against(&m);
    }

    #[test]
    fn prop_equivalence_strings(ops in str_ops()) {
        let mut s = Strings::new();
        let mut m: BTreeSet<String> = BTreeSet::new();

        for op in ops {
            match op {
                StrOp::Insert(k) => {
                    let id = s.record(&k);
                    prop_assert_eq!(s.tree.insert(&mut s.arena, id), id);
                    m.insert(k);
                }
                StrOp::Delete(k) => {
                    let id = s.record(&k);
                    let got = s.tree.delete(&mut s.arena, id);
                    prop_assert_eq!(got.is_some(), m.remove(&k));
                }
                StrOp::Ge(k) => {
                    let q = CString::new(k.clone()).unwrap();
                    let got = s.name(s.tree.lookup_ge(&s.arena, &q));
                    prop_assert_eq!(got, m.range(k..).next().cloned());
                }
                StrOp::Le(k) => {
                    let q = CString::new(k.clone()).unwrap();
                    let got = s.name(s.tree.lookup_le(&s.arena, &q));
                    prop_assert_eq!(got, m.range(..=k).next_back().cloned());
                }
            }
        }

        prop_assert_eq!(s.keys(), m.iter().cloned().collect::<Vec<_>>());
    }

    #[test]
    fn prop_wide_keys(
        keys in prop::collection::vec(any::<u64>(), 1..=200),
        probes in prop::collection::vec(any::<u64>(), 0..=50),
    ) {
        let mut arena: Vec<Entry<u64, ()>> = keys.iter().map(|&k| Entry::new(k, ())).collect();
        let mut tree = CbTree::new();
        let mut m: BTreeMap<u64, NodeId> = BTreeMap::new();
        for (i, &k) in keys.iter().enumerate() {
            let id = NodeId::new(i);
            prop_assert_eq!(tree.insert(&mut arena, id), *m.entry(k).or_insert(id));
        }
        prop_assert_eq!(validate_tree(&tree, &arena), m.values().copied().collect::<Vec<_>>());

        let all = probes.iter().copied().chain(keys.iter().copied());
        for q in all {
            let ge = m.range(q..).next().map(|(_, id)| *id);
            let le = m.range(..=q).next_back().map(|(_, id)| *id);
            prop_assert_eq!(tree.lookup_ge(&arena, &q), ge);
            prop_assert_eq!(tree.lookup_le(&arena, &q), le);
            // Inequality consistency: only an exact hit tells ge from gt.
            match m.get(&q) {
                Some(&id) => {
                    prop_assert_eq!(ge, Some(id));
                }
                None => {
                    prop_assert_eq!(tree.lookup_gt(&arena, &q), ge);
                    prop_assert_eq!(tree.lookup_lt(&arena, &q), le);
                }
            }
        }

        let doomed: Vec<(u64, NodeId)> = m.iter().step_by(2).map(|(k, id)| (*k, *id)).collect();
        for (k, id) in doomed {
            prop_assert_eq!(tree.delete(&mut arena, id), Some(id));
            prop_assert_eq!(tree.delete(&mut arena, id), None);
            prop_assert_eq!(tree.lookup(&arena, &k), None);
            m.remove(&k);
        }
        prop_assert_eq!(validate_tree(&tree, &arena), m.values().copied().collect::<Vec<_>>());
    }
}

// =============================================================================
// Exhaustive orders
// =============================================================================

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

const PREFIX_CHAIN: [&str; 6] = ["", "1", "10", "100", "11", "2"];

#[test]
fn exhaustive_insert_order_prefix_chain() {
    for_each_permutation(&PREFIX_CHAIN, |perm| {
        let mut s = Strings::new();
        for k in &perm {
            let id = s.record(k);
            assert_eq!(s.tree.insert(&mut s.arena, id), id);
        }
        assert_eq!(s.keys(), PREFIX_CHAIN);

        let id_of = |k: &str| s.ids[k];
        assert_eq!(s.tree.next(&s.arena, id_of("1")), Some(id_of("10")));
        assert_eq!(s.tree.next(&s.arena, id_of("10")), Some(id_of("100")));
        assert_eq!(s.tree.prev(&s.arena, id_of("11")), Some(id_of("100")));
        assert_eq!(s.tree.prev(&s.arena, id_of("")), None);
    });
}

#[test]
fn exhaustive_delete_order_prefix_chain() {
    for_each_permutation(&PREFIX_CHAIN, |perm| {
        let mut s = Strings::new();
        for k in PREFIX_CHAIN {
            let id = s.record(k);
            s.tree.insert(&mut s.arena, id);
        }

        let mut left: Vec<&str> = PREFIX_CHAIN.to_vec();
        for k in perm {
            let id = s.ids[k];
            assert_eq!(s.tree.delete(&mut s.arena, id), Some(id));
            assert_eq!(s.tree.delete(&mut s.arena, id), None);
            left.retain(|&w| w != k);
            assert_eq!(s.keys(), left);
        }
        assert!(s.tree.is_empty());
    });
}

#[test]
fn exhaustive_insert_delete_scalars() {
    let keys: [u8; 6] = [0, 1, 2, 3, 128, 255];
    for_each_permutation(&keys, |perm| {
        let mut s = Scalars::new();
        let mut m = BTreeMap::new();
        for &k in &perm {
            apply(&mut s, &mut m, Op::Insert(k, false)).unwrap();
        }
        s.check_against(&m);
        // Delete in the reverse of the insertion order.
        for &k in perm.iter().rev() {
            apply(&mut s, &mut m, Op::Delete(k, false)).unwrap();
            s.check_against(&m);
        }
    });
}

// =============================================================================
// Randomized stress
// =============================================================================

#[test]
fn random_stress_masked_keys() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const MASK: u32 = 0xFF;

    let mut rng = StdRng::seed_from_u64(3);
    let mut s = Scalars::new();
    let mut m: BTreeMap<u32, NodeId> = BTreeMap::new();

    for round in 0..100_000u32 {
        let k = (rng.gen::<u32>() & MASK) as u8;
        let twin = rng.gen_bool(0.5);
        let op = match rng.gen_range(0..8) {
            0..=2 => Op::Insert(k, twin),
            3 | 4 => Op::Delete(k, twin),
            5 => Op::Pick(k),
            6 => Op::Lookup(k),
            _ => Op::Ge(k),
        };
        apply(&mut s, &mut m, op).unwrap();

        if round % 10_000 == 0 {
            s.check_against(&m);
        }
    }
    s.check_against(&m);
}

#[test]
fn random_insert_then_delete_keeps_detach_state() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(4);
    let mut s = Scalars::new();
    let mut m: BTreeMap<u32, NodeId> = BTreeMap::new();

    // Each inserted record is immediately deleted again half of the time.
    for _ in 0..20_000 {
        let k: u8 = rng.gen();
        let id = Scalars::id(k, false);
        apply(&mut s, &mut m, Op::Insert(k, false)).unwrap();
        if rng.gen_bool(0.5) {
            apply(&mut s, &mut m, Op::Delete(k, false)).unwrap();
            assert!(!s.arena[id.index()].is_linked());
        }
    }

    for (i, rec) in s.arena.iter().enumerate() {
        let linked = m.values().any(|id| id.index() == i);
        assert_eq!(rec.is_linked(), linked, "record {i}");
    }
    s.check_against(&m);
}

// =============================================================================
// Logging
// =============================================================================

#[test]
fn traced_prefix_chain() {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let mut s = Strings::new();
        for k in ["100", "1", "10"] {
            let id = s.record(k);
            s.tree.insert(&mut s.arena, id);
        }
        let one = s.ids["1"];
        let next = s.tree.next(&s.arena, one);
        assert_eq!(s.name(next).as_deref(), Some("10"));

        for k in ["10", "1", "100"] {
            let id = s.ids[k];
            assert_eq!(s.tree.delete(&mut s.arena, id), Some(id));
        }
        assert!(s.tree.is_empty());
    });
}
