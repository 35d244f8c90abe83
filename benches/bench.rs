use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rbset::{FromSlice, RedBlackTree};
use std::collections::BTreeSet;

const MAX_SIZE: usize = 4097;

type Tree = RedBlackTree<u64, MAX_SIZE>;

fn bench_insert_4096(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_4096_u64");
    group.bench_function("rbset", |b| {
        b.iter(|| {
            let mut buf = vec![0u8; std::mem::size_of::<Tree>()];
            let tree = Tree::new_from_slice(buf.as_mut_slice());
            for v in 0..4096u64 {
                tree.insert(black_box(v));
            }
        })
    });
    group.bench_function("std_btreeset", |b| {
        b.iter(|| {
            let mut set = BTreeSet::new();
            for v in 0..4096u64 {
                set.insert(black_box(v));
            }
        })
    });
    group.finish();
}

fn bench_contains_4096(c: &mut Criterion) {
    let mut buf = vec![0u8; std::mem::size_of::<Tree>()];
    let tree = Tree::new_from_slice(buf.as_mut_slice());
    let mut set = BTreeSet::new();
    for v in 0..4096u64 {
        tree.insert(v);
        set.insert(v);
    }
    let mut group = c.benchmark_group("contains_4096_u64");
    group.bench_function("rbset", |b| {
        b.iter(|| {
            for v in 0..4096u64 {
                black_box(tree.contains(black_box(&v)));
            }
        })
    });
    group.bench_function("std_btreeset", |b| {
        b.iter(|| {
            for v in 0..4096u64 {
                black_box(set.contains(black_box(&v)));
            }
        })
    });
    group.finish();
}

criterion_group!(benches, bench_insert_4096, bench_contains_4096);
criterion_main!(benches);
