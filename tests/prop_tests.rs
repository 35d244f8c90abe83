use quickcheck::{quickcheck, Arbitrary, Gen};
use rbset::RedBlackTree;
use std::collections::BTreeSet;

const MAX_SIZE: usize = 257;

type Tree = RedBlackTree<i64, MAX_SIZE>;

/// Insert/remove over a small value domain so sequences hit duplicates,
/// absent removes, and deep rebalancing cases often.
#[derive(Copy, Clone, Debug)]
enum Op {
    Insert(i64),
    Remove(i64),
}

impl Arbitrary for Op {
    fn arbitrary(g: &mut Gen) -> Self {
        let v = i64::arbitrary(g).rem_euclid(64);
        if bool::arbitrary(g) {
            Op::Insert(v)
        } else {
            Op::Remove(v)
        }
    }
}

fn apply(tree: &mut Tree, set: &mut BTreeSet<i64>, op: Op) {
    match op {
        Op::Insert(v) => {
            tree.insert(v);
            set.insert(v);
        }
        Op::Remove(v) => {
            assert_eq!(tree.remove(&v), set.take(&v));
        }
    }
}

quickcheck! {
    fn invariants_hold_after_every_op(ops: Vec<Op>) -> bool {
        let mut tree = Tree::new();
        let mut set = BTreeSet::new();
        for op in ops {
            apply(&mut tree, &mut set, op);
            if !tree.follows_rules() {
                return false;
            }
        }
        tree.len() == set.len()
    }

    fn matches_btreeset_model(ops: Vec<Op>) -> bool {
        let mut tree = Tree::new();
        let mut set = BTreeSet::new();
        for op in ops {
            apply(&mut tree, &mut set, op);
        }
        (0..64i64).all(|v| tree.contains(&v) == set.contains(&v))
            && tree.iter().copied().eq(set.iter().copied())
    }

    fn min_max_match_model(ops: Vec<Op>) -> bool {
        let mut tree = Tree::new();
        let mut set = BTreeSet::new();
        for op in ops {
            apply(&mut tree, &mut set, op);
            if tree.find_min().ok() != set.iter().next().copied() {
                return false;
            }
            if tree.find_max().ok() != set.iter().next_back().copied() {
                return false;
            }
        }
        true
    }

    fn insert_is_idempotent(xs: Vec<i64>) -> bool {
        let mut tree = Tree::new();
        for x in &xs {
            let v = x.rem_euclid(128);
            let first = tree.insert(v);
            let len = tree.len();
            if tree.insert(v) != first || tree.len() != len {
                return false;
            }
        }
        xs.iter().all(|x| tree.contains(&x.rem_euclid(128))) && tree.follows_rules()
    }
}
