use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use corelib::{Key, NodeId, KEY_SPACE};
use replication::{LogEntry, ReplicaSet, ReplicatedStore};

fn initialized() -> ReplicatedStore {
    let store = ReplicatedStore::new();
    let owners = ReplicaSet::new(vec![NodeId::from("A"), NodeId::from("B"), NodeId::from("C")]);
    store
        .initialize(vec![owners; KEY_SPACE])
        .expect("fresh store");
    store
}

fn bench_update(c: &mut Criterion) {
    let store = initialized();
    let mut ts = 0i64;
    c.bench_function("store_update", |b| {
        b.iter(|| {
            ts += 1;
            store
                .update(black_box(Key((ts % 256) as u8)), "value", ts)
                .expect("initialized")
        })
    });
}

fn bench_read(c: &mut Criterion) {
    let store = initialized();
    store.update(Key(42), "value", 1).expect("initialized");
    c.bench_function("store_read", |b| {
        b.iter(|| store.read(black_box(Key(42))).expect("initialized"))
    });
}

fn bench_replay(c: &mut Criterion) {
    let entries: Vec<LogEntry> = (0..10_000i64)
        .map(|i| LogEntry::new(Key((i % 256) as u8), format!("v{}", i), i))
        .collect();
    c.bench_function("store_replay_10k", |b| {
        b.iter_batched(
            || (initialized(), entries.clone()),
            |(store, entries)| store.replay(entries).expect("initialized"),
            BatchSize::SmallInput,
        )
    });
}

fn bench_owner_lookup(c: &mut Criterion) {
    let store = initialized();
    c.bench_function("store_owners", |b| {
        b.iter(|| store.owners(black_box(Key(200))).expect("initialized"))
    });
}

criterion_group!(benches, bench_update, bench_read, bench_replay, bench_owner_lookup);
criterion_main!(benches);
