#![cfg(test)]

// Property tests for ChainTable kept inside the crate so they can check the
// structural invariants (bucket placement, cached digests, allocator live
// count, key uniqueness) after every operation.

use crate::chain_table::{ChainTable, TableConfig};
use core::hash::BuildHasher;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hasher;

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations so shrinking moves toward earlier keys.
#[derive(Clone, Debug)]
enum Op {
    Insert(usize, i32),
    Modify(usize, i32),
    Erase(usize),
    Find(usize),
    Contains(String),
    GetOrInsert(usize, i32),
    Rehash(usize),
    Iterate,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-z]{0,4}", 1..=10).prop_flat_map(|pool| {
        let idx = proptest::sample::select((0..pool.len()).collect::<Vec<_>>());
        let op = prop_oneof![
            3 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Insert(i, v)),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Modify(i, v)),
            2 => idx.clone().prop_map(Op::Erase),
            1 => idx.clone().prop_map(Op::Find),
            1 => "[a-z]{0,4}".prop_map(Op::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::GetOrInsert(i, v)),
            1 => (1usize..40).prop_map(Op::Rehash),
            1 => Just(Op::Iterate),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

// State-machine equivalence against std::collections::HashMap.
// - insert succeeds iff the key is absent; a rejected insert keeps the value.
// - modify succeeds iff present and never inserts.
// - erase returns true iff present and shrinks len by exactly one.
// - iteration yields the model's entries once each.
// - load_factor == len / bucket_count after every step.
fn run<S: BuildHasher>(
    mut sut: ChainTable<Key, i32, S>,
    pool: Vec<String>,
    ops: Vec<Op>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<Key, i32> = HashMap::new();
    let key = |i: usize| Key(pool[i].clone());

    for op in ops {
        match op {
            Op::Insert(i, v) => {
                let k = key(i);
                let already = model.contains_key(&k);
                let inserted = sut.insert(k.clone(), v).expect("unbounded arena");
                prop_assert_eq!(inserted, !already);
                if inserted {
                    model.insert(k, v);
                }
            }
            Op::Modify(i, v) => {
                let k = key(i);
                let modified = sut.modify(&k, v);
                prop_assert_eq!(modified, model.contains_key(&k));
                if let Some(mv) = model.get_mut(&k) {
                    *mv = v;
                }
            }
            Op::Erase(i) => {
                let k = key(i);
                let before = sut.len();
                let erased = sut.erase(&k);
                prop_assert_eq!(erased, model.remove(&k).is_some());
                prop_assert_eq!(sut.len(), if erased { before - 1 } else { before });
                prop_assert!(sut.find(&k).is_none());
            }
            Op::Find(i) => {
                let k = key(i);
                prop_assert_eq!(sut.find(&k).map(|n| *n.value()), model.get(&k).copied());
            }
            Op::Contains(s) => {
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(sut.contains_key(s.as_str()), has_model);
            }
            Op::GetOrInsert(i, v) => {
                let k = key(i);
                let got = *sut.get_or_insert_with(k.clone(), || v).expect("unbounded arena");
                let expected = *model.entry(k).or_insert(v);
                prop_assert_eq!(got, expected);
            }
            Op::Rehash(n) => {
                sut.rehash(n);
                prop_assert_eq!(sut.bucket_count(), n);
            }
            Op::Iterate => {
                let s: BTreeMap<Key, i32> = sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
                let m: BTreeMap<Key, i32> = model.iter().map(|(k, v)| (k.clone(), *v)).collect();
                prop_assert_eq!(s, m);
            }
        }

        sut.assert_invariants();
        prop_assert_eq!(sut.len(), model.len());
        let expected_lf = model.len() as f64 / sut.bucket_count() as f64;
        prop_assert!((sut.load_factor() - expected_lf).abs() < 1e-12);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run(ChainTable::new(), pool, ops)?;
    }
}

// Every key lands in one chain: worst case for equality probing and splicing.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run(ChainTable::with_hasher(ConstBuildHasher), pool, ops)?;
    }
}

// Same model with automatic growth switched on; growth must never disturb
// the entries and must keep the load factor under the threshold.
proptest! {
    #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]
    #[test]
    fn prop_growth_policy(keys in proptest::collection::btree_set(0u32..10_000, 0..300)) {
        let cfg = TableConfig::new().with_bucket_count(2).with_max_load_factor(0.75);
        let mut t: ChainTable<u32, u32> = ChainTable::with_config(cfg);
        for &k in &keys {
            prop_assert!(t.insert(k, k ^ 0x5a5a).unwrap());
            prop_assert!(t.load_factor() <= 0.75);
        }
        t.assert_invariants();
        for &k in &keys {
            prop_assert_eq!(t.get(&k), Some(&(k ^ 0x5a5a)));
        }
    }
}
