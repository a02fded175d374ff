// Copyright (C) 2025 LedgerGit Contributors
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Hashing and tree rebuild benchmarks
//!
//! - Blob hashing across content sizes
//! - Incremental rebuild of a wide, deep tree after a single-file change

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ledgergit_versioning::{hash_blob, FileChange, Tree, TreeBuilder};

fn generate_test_data(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

fn bench_hash_blob(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash_blob");
    for size in [1024usize, 15 * 1024, 1024 * 1024] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let data = generate_test_data(size);
            b.iter(|| black_box(hash_blob(&data)));
        });
    }
    group.finish();
}

fn bench_incremental_rebuild(c: &mut Criterion) {
    let mut builder = TreeBuilder::new(Tree::new());
    for dir in 0..20 {
        for sub in 0..10 {
            for file in 0..10 {
                let path = format!("d{}/s{}/f{}.txt", dir, sub, file);
                builder
                    .apply(&FileChange::write(path.clone(), hash_blob(path.as_bytes())))
                    .unwrap();
            }
        }
    }
    let base = builder.build().tree;

    c.bench_function("rebuild_one_file_in_2000", |b| {
        b.iter(|| {
            let mut builder = TreeBuilder::new(base.clone());
            builder
                .apply(&FileChange::write("d7/s3/f5.txt", hash_blob(b"changed")))
                .unwrap();
            black_box(builder.build().root)
        })
    });
}

criterion_group!(benches, bench_hash_blob, bench_incremental_rebuild);
criterion_main!(benches);
