//! Performance benchmarks for geodata-cache
//!
//! This benchmark suite measures:
//! - SnapshotCache operations (hit, fill, invalidate)
//! - Repository listings served from the snapshot vs read from the store
//! - Performance across different collection sizes
//!
//! Run with: cargo bench
//! View results: open target/criterion/report/index.html

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use geodata_cache::schema::CITIES;
use geodata_cache::store::{InMemoryConnector, InMemoryStore};
use geodata_cache::{
    CacheStrategy, ConnectionConfig, DataService, Document, Filter, Snapshot, SnapshotCache,
};
use serde_json::json;
use std::hint::black_box;

// ============================================================================
// Benchmark Fixtures
// ============================================================================

fn cities(count: usize) -> Vec<Document> {
    (0..count)
        .filter_map(|i| {
            json!({
                "name": format!("City {:06}", i),
                "population": i * 100,
                "state_code": (if i % 2 == 0 { "NC" } else { "TX" }),
            })
            .as_object()
            .cloned()
        })
        .collect()
}

fn service(rt: &tokio::runtime::Runtime, count: usize) -> DataService<InMemoryConnector> {
    let store = InMemoryStore::new();
    store.seed(CITIES, cities(count));
    rt.block_on(DataService::start(
        ConnectionConfig::default(),
        InMemoryConnector::new(store),
    ))
    .expect("Failed to start service")
}

// ============================================================================
// Group 1: SnapshotCache Benchmarks
// ============================================================================

fn snapshot_cache_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_cache");
    let rt = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");

    for size in [10, 1_000, 10_000].iter() {
        let docs = cities(*size);

        // Build a snapshot from raw documents
        group
            .throughput(Throughput::Elements(*size as u64))
            .bench_with_input(BenchmarkId::new("build_snapshot", size), &docs, |b, docs| {
                b.iter(|| Snapshot::from_documents(CITIES, "name", black_box(docs.clone())))
            });

        // HIT: slot already populated
        group.bench_with_input(BenchmarkId::new("read_hit", size), &docs, |b, docs| {
            let cache = SnapshotCache::new();
            rt.block_on(async {
                cache
                    .read(CITIES, || async {
                        Snapshot::from_documents(CITIES, "name", docs.clone())
                    })
                    .await
                    .expect("Failed to populate cache");
            });

            b.to_async(&rt).iter(|| async {
                cache
                    .read(black_box(CITIES), || async {
                        Ok(Snapshot::empty(CITIES, "name"))
                    })
                    .await
            });
        });

        // MISS: invalidate then fill every iteration
        group.bench_with_input(BenchmarkId::new("invalidate_fill", size), &docs, |b, docs| {
            let cache = SnapshotCache::new();

            b.to_async(&rt).iter(|| async {
                cache.invalidate(CITIES);
                cache
                    .read(black_box(CITIES), || async {
                        Snapshot::from_documents(CITIES, "name", docs.clone())
                    })
                    .await
            });
        });
    }

    group.finish();
}

// ============================================================================
// Group 2: Repository Listing Benchmarks
// ============================================================================

fn repository_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("repository");
    let rt = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");

    for size in [100, 1_000, 10_000].iter() {
        let service = service(&rt, *size);
        let repo = service.repository().clone();
        let nc = Filter::new().equals("state_code", "NC");

        // Cached listing: filter over the snapshot
        group
            .throughput(Throughput::Elements(*size as u64))
            .bench_with_input(BenchmarkId::new("fetch_all_cached", size), size, |b, _| {
                b.to_async(&rt).iter(|| async {
                    repo.fetch_all(black_box(CITIES), Some(&nc))
                        .await
                        .expect("Failed to fetch")
                });
            });

        // Bypass: full store read and snapshot build every time
        group
            .throughput(Throughput::Elements(*size as u64))
            .bench_with_input(BenchmarkId::new("fetch_all_bypass", size), size, |b, _| {
                b.to_async(&rt).iter(|| async {
                    repo.fetch_all_with(black_box(CITIES), Some(&nc), CacheStrategy::Bypass)
                        .await
                        .expect("Failed to fetch")
                });
            });

        // Point lookup from the snapshot
        group.bench_with_input(BenchmarkId::new("fetch_one", size), size, |b, _| {
            b.to_async(&rt).iter(|| async {
                repo.fetch_one(black_box(CITIES), black_box("City 000000"))
                    .await
                    .expect("Failed to fetch")
            });
        });
    }

    group.finish();
}

criterion_group!(benches, snapshot_cache_benchmarks, repository_benchmarks);
criterion_main!(benches);
