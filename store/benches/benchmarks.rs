//! Performance benchmarks for gymlog-store

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gymlog_store::{
    ChecksumAlgorithm, DataExport, DataStorage, Entry, IntegrityTag, StorageConfig,
};
use serde_json::json;
use std::collections::BTreeMap;
use tempfile::TempDir;

fn weight_logs(count: usize) -> Vec<Entry> {
    (0..count)
        .map(|i| {
            serde_json::from_value(json!({
                "id": i + 1,
                "exercise_id": i % 26 + 1,
                "weight": 40.0 + (i % 50) as f64,
                "reps": 8,
                "date": "2026-10-19T08:30:00",
                "notes": ""
            }))
            .unwrap()
        })
        .collect()
}

fn open(dir: &TempDir) -> DataStorage {
    DataStorage::open(StorageConfig::new(dir.path()).with_max_backups(3)).unwrap()
}

fn bench_storage_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("storage_operations");

    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("save", size), size, |b, &size| {
            let dir = TempDir::new().unwrap();
            let mut storage = open(&dir);
            let data = weight_logs(size);

            b.iter(|| storage.save("weights", black_box(&data)).unwrap())
        });

        group.bench_with_input(BenchmarkId::new("load", size), size, |b, &size| {
            let dir = TempDir::new().unwrap();
            let mut storage = open(&dir);
            storage.save("weights", &weight_logs(size)).unwrap();

            b.iter(|| storage.load(black_box("weights")).unwrap())
        });
    }

    group.finish();
}

fn bench_integrity(c: &mut Criterion) {
    let mut group = c.benchmark_group("integrity");
    let bytes = serde_json::to_vec_pretty(&weight_logs(1000)).unwrap();

    group.bench_function("sha256", |b| {
        b.iter(|| IntegrityTag::compute(ChecksumAlgorithm::Sha256, black_box(&bytes)))
    });

    group.bench_function("sha512", |b| {
        b.iter(|| IntegrityTag::compute(ChecksumAlgorithm::Sha512, black_box(&bytes)))
    });

    group.finish();
}

fn bench_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("export");

    for size in [100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("new", size), size, |b, &size| {
            let mut collections = BTreeMap::new();
            collections.insert("weights".to_string(), weight_logs(size));

            b.iter(|| DataExport::new(black_box(collections.clone())).unwrap())
        });

        group.bench_with_input(BenchmarkId::new("from_json", size), size, |b, &size| {
            let mut collections = BTreeMap::new();
            collections.insert("weights".to_string(), weight_logs(size));
            let json = DataExport::new(collections).unwrap().to_json_pretty().unwrap();

            b.iter(|| DataExport::from_json(black_box(&json)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_storage_operations, bench_integrity, bench_export);
criterion_main!(benches);
