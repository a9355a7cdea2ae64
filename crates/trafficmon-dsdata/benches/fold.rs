//! Aggregation benchmarks for large cache fleets.
//!
//! Run with:
//! ```bash
//! cargo bench --bench fold
//! ```

#![allow(clippy::expect_used)]

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::collections::BTreeMap;
use std::hint::black_box;
use trafficmon_dsdata::{
    CacheMembership, CacheName, CacheStats, DeliveryServiceAggregator, SharedStats, StatBool,
    StatFloat, StatInt, TextMerge,
};

fn fleet(caches: usize) -> (Vec<CacheMembership>, BTreeMap<CacheName, CacheStats>) {
    let mut members = Vec::with_capacity(caches);
    let mut samples = BTreeMap::new();
    for i in 0..caches {
        let name = format!("edge-{i:05}");
        members.push(CacheMembership::new(
            name.as_str(),
            format!("group-{}", i % 32),
            if i % 4 == 0 { "MID" } else { "EDGE" },
        ));
        let value = i64::try_from(i).expect("fleet size fits in i64");
        samples.insert(
            CacheName::from(name),
            CacheStats {
                out_bytes: StatInt::new(value * 1024, 1),
                is_available: StatBool::new(i % 7 != 0, 1),
                status_2xx: StatInt::new(value, 1),
                kbps: StatFloat::new(1.5, 1),
                tps_total: StatInt::new(value, 1),
                ..CacheStats::default()
            },
        );
    }
    (members, samples)
}

fn bench_fold(c: &mut Criterion) {
    let mut group = c.benchmark_group("fold");
    for caches in [100, 1_000, 10_000] {
        let (_, samples) = fleet(caches);
        group.bench_with_input(BenchmarkId::from_parameter(caches), &samples, |b, samples| {
            b.iter(|| black_box(CacheStats::fold(samples.values(), TextMerge::Concatenate)));
        });
    }
    group.finish();
}

fn bench_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("cycle");
    let aggregator = DeliveryServiceAggregator::default();
    for caches in [100, 1_000] {
        let (members, samples) = fleet(caches);
        let shared = SharedStats::new(60);
        group.bench_with_input(
            BenchmarkId::from_parameter(caches),
            &(members, samples),
            |b, (members, samples)| {
                b.iter(|| {
                    let mut update = shared.begin_update();
                    aggregator.aggregate_into(update.stat_mut("cdn1"), members, samples, 1);
                    update.commit();
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_fold, bench_cycle);
criterion_main!(benches);
