// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Benchmarks for ledger commits, change feeds and reclamation.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use rewinddb::catalog::{ObjectId, ObjectKind};
use rewinddb::changes::ChangeMode;
use rewinddb::config::EngineConfig;
use rewinddb::engine::{RetentionEngine, TableDef};
use rewinddb::ledger::{Ledger, LedgerBatch, OpKind, SnapshotRef};
use rewinddb::resolve::PointInTime;
use rewinddb::snapshot::{row, MemorySnapshotStore, Value};
use rewinddb::time::{Clock, ManualClock, Timestamp};

fn bench_append(c: &mut Criterion) {
    let ledger = Ledger::new();
    let mut batch = LedgerBatch::new();
    batch.create(ObjectId(1), ObjectKind::Table, "t", None, SnapshotRef::EMPTY);
    ledger.commit(&batch, None, Timestamp::from_secs(1)).unwrap();

    let counter = AtomicU64::new(0);

    let mut group = c.benchmark_group("ledger");
    group.throughput(Throughput::Elements(1));

    group.bench_function("append", |b| {
        b.iter(|| {
            let i = counter.fetch_add(1, Ordering::Relaxed);
            let result = ledger.append(
                ObjectId(1),
                OpKind::Mutate,
                SnapshotRef(i + 1),
                None,
                Timestamp::from_secs(i + 2),
            );
            black_box(result)
        })
    });

    group.finish();
}

fn bench_batch_commit(c: &mut Criterion) {
    let ledger = Ledger::new();
    let counter = AtomicU64::new(0);

    let mut group = c.benchmark_group("ledger");
    group.throughput(Throughput::Elements(10));

    group.bench_function("commit_10_creates", |b| {
        b.iter_batched(
            || {
                let base = counter.fetch_add(10, Ordering::Relaxed);
                let mut batch = LedgerBatch::new();
                for i in 0..10 {
                    let id = base + i + 1;
                    batch.create(
                        ObjectId(id),
                        ObjectKind::Table,
                        format!("t{}", id),
                        None,
                        SnapshotRef::EMPTY,
                    );
                }
                batch
            },
            |batch| black_box(ledger.commit(&batch, None, Timestamp::from_secs(1))),
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

fn bench_changes(c: &mut Criterion) {
    let clock = Arc::new(ManualClock::default());
    let engine = RetentionEngine::with_parts(
        EngineConfig::default(),
        Arc::new(MemorySnapshotStore::new()),
        Arc::clone(&clock),
    )
    .unwrap();
    let db = engine.create_database("bench").unwrap();
    let schema = engine.create_schema(db, "public").unwrap();
    let table = engine
        .create_table(schema, "events", TableDef::new(["id"]).change_tracking())
        .unwrap();

    clock.advance_secs(1);
    let start = PointInTime::at_timestamp(clock.now());
    for i in 0..1000 {
        clock.advance_secs(1);
        engine
            .insert_rows(table, vec![row([("id", Value::Int(i))])], None)
            .unwrap();
    }

    let mut group = c.benchmark_group("changes");
    group.throughput(Throughput::Elements(1000));

    group.bench_function("default_1000_rows", |b| {
        b.iter(|| {
            let records = engine
                .changes(table, &start, None, ChangeMode::Default)
                .unwrap();
            black_box(records.len())
        })
    });

    group.finish();
}

fn bench_reclaim(c: &mut Criterion) {
    c.bench_function("reclaim::pass_100_versions", |b| {
        b.iter_batched(
            || {
                let clock = Arc::new(ManualClock::default());
                let engine = RetentionEngine::with_parts(
                    EngineConfig::default(),
                    Arc::new(MemorySnapshotStore::new()),
                    Arc::clone(&clock),
                )
                .unwrap();
                let db = engine.create_database("bench").unwrap();
                let schema = engine.create_schema(db, "public").unwrap();
                let table = engine
                    .create_table(schema, "events", TableDef::new(["id"]))
                    .unwrap();
                for i in 0..100 {
                    clock.advance_secs(1);
                    engine
                        .insert_rows(table, vec![row([("id", Value::Int(i))])], None)
                        .unwrap();
                }
                clock.advance_secs(2 * 86_400);
                engine
            },
            |engine| black_box(engine.reclaim_now()),
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(
    benches,
    bench_append,
    bench_batch_commit,
    bench_changes,
    bench_reclaim,
);
criterion_main!(benches);
