//! Benchmarks for the cache's pure scheduling components.

use std::collections::{HashMap, HashSet};

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use dynamic_prefetch_cache::cache::prediction::rank_candidates;
use dynamic_prefetch_cache::cache::scheduler::reconcile;
use dynamic_prefetch_cache::{EntryMeta, EvictionPolicy, Key, OldestFirst};

fn bench_rank_candidates(c: &mut Criterion) {
    // 10,000 candidate keys with scores spread across (0, 1].
    let likelihoods: HashMap<Key, f64> = (0..10_000u64)
        .map(|k| (k, ((k % 97) + 1) as f64 / 97.0))
        .collect();
    let resident: HashSet<Key> = (0..500).collect();

    c.bench_function("rank_candidates_10k", |b| {
        b.iter(|| {
            let ranked = rank_candidates(
                black_box(likelihoods.clone()),
                5_000,
                black_box(&resident),
                16,
            );
            black_box(ranked);
        })
    });
}

fn bench_reconcile(c: &mut Criterion) {
    let in_flight: HashSet<Key> = (0..16).collect();
    let desired: Vec<Key> = (8..24).collect();

    c.bench_function("reconcile_16_in_flight", |b| {
        b.iter(|| {
            let plan = reconcile(black_box(&in_flight), black_box(&desired), 16);
            black_box(plan);
        })
    });
}

fn bench_eviction_selection(c: &mut Criterion) {
    let entries: Vec<EntryMeta> = (0..10_000u64)
        .map(|k| EntryMeta {
            key: k,
            insertion_sequence: (k * 7) % 10_000,
            weight: (k % 13) as usize + 1,
        })
        .collect();

    c.bench_function("eviction_select_100_from_10k", |b| {
        b.iter(|| {
            let victims = OldestFirst.select_victims(black_box(&entries), 100);
            black_box(victims);
        })
    });
}

criterion_group!(
    benches,
    bench_rank_candidates,
    bench_reconcile,
    bench_eviction_selection,
);
criterion_main!(benches);
