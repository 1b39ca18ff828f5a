//! Throughput Benchmark for QuillKV
//!
//! Measures the storage engine, the RESP codec and a round trip through the
//! dispatcher's event loop.

use bytes::{Bytes, BytesMut};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use quillkv::commands::{Command, CommandKind};
use quillkv::dispatcher::Dispatcher;
use quillkv::protocol::{decode, RespValue};
use quillkv::storage::{deadline_after, StorageEngine};
use std::time::Instant;

/// Benchmark SET operations
fn bench_set(c: &mut Criterion) {
    let mut engine = StorageEngine::new();

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_small", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            engine.set(key, Bytes::from("small_value"), None);
            i += 1;
        });
    });

    group.bench_function("set_medium", |b| {
        let mut i = 0u64;
        let value = Bytes::from("x".repeat(1024));
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            engine.set(key, value.clone(), None);
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark GET operations
fn bench_get(c: &mut Criterion) {
    let mut engine = StorageEngine::new();

    for i in 0..100_000 {
        let key = Bytes::from(format!("key:{}", i));
        let value = Bytes::from(format!("value:{}", i));
        engine.set(key, value, None);
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i % 100_000));
            black_box(engine.get(&key));
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("missing:{}", i));
            black_box(engine.get(&key));
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark deadline bookkeeping and the active cleanup cycle
fn bench_expiry(c: &mut Criterion) {
    let mut group = c.benchmark_group("expiry");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_with_ttl", |b| {
        let mut engine = StorageEngine::new();
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            let deadline = deadline_after(Instant::now(), 3600);
            engine.set(key, Bytes::from("value"), Some(deadline));
            i += 1;
        });
    });

    group.bench_function("cleanup_live_candidates", |b| {
        let mut engine = StorageEngine::new();
        for i in 0..10_000 {
            let deadline = deadline_after(Instant::now(), 3600);
            engine.set(Bytes::from(format!("key:{}", i)), Bytes::from("v"), Some(deadline));
        }
        b.iter(|| black_box(engine.cleanup()));
    });

    group.bench_function("cleanup_dead_candidates", |b| {
        b.iter_batched(
            || {
                let mut engine = StorageEngine::new();
                for i in 0..1_000 {
                    let deadline = deadline_after(Instant::now(), -1);
                    engine.set(Bytes::from(format!("key:{}", i)), Bytes::from("v"), Some(deadline));
                }
                engine
            },
            |mut engine| black_box(engine.cleanup()),
            criterion::BatchSize::LargeInput,
        );
    });

    group.finish();
}

/// Benchmark sorted collection inserts and rank queries
fn bench_sorted(c: &mut Criterion) {
    let mut group = c.benchmark_group("sorted");
    group.throughput(Throughput::Elements(1));

    group.bench_function("zadd", |b| {
        let mut engine = StorageEngine::new();
        let key = Bytes::from("board");
        let mut i = 0i64;
        b.iter(|| {
            let member = Bytes::from(format!("member:{}", i % 10_000));
            black_box(engine.zadd(key.clone(), vec![(i % 977, member)]));
            i += 1;
        });
    });

    group.bench_function("zrange_top_10", |b| {
        let mut engine = StorageEngine::new();
        let key = Bytes::from("board");
        let pairs = (0..10_000)
            .map(|i| (i, Bytes::from(format!("member:{}", i))))
            .collect();
        engine.zadd(key.clone(), pairs);

        b.iter(|| black_box(engine.zrange(&key, -10, -1, true)));
    });

    group.finish();
}

/// Benchmark the wire codec
fn bench_codec(c: &mut Criterion) {
    let request = RespValue::bulk_array(["SET", "user:1000", "some moderately sized value"]);
    let wire = request.serialize();

    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Bytes(wire.len() as u64));

    group.bench_function("decode_request", |b| {
        b.iter(|| {
            let mut buf = BytesMut::from(&wire[..]);
            black_box(decode(&mut buf).unwrap());
        });
    });

    group.bench_function("encode_request", |b| {
        let mut out = Vec::with_capacity(wire.len());
        b.iter(|| {
            out.clear();
            request.serialize_into(&mut out);
            black_box(out.len());
        });
    });

    group.finish();
}

/// Benchmark a full submit/reply round trip through the event loop
fn bench_dispatcher(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();
    let (dispatcher, _event_loop) = runtime.block_on(async { Dispatcher::start(StorageEngine::new()) });

    let mut group = c.benchmark_group("dispatcher");
    group.throughput(Throughput::Elements(1));

    group.bench_function("submit_set", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let command = Command::new(
                CommandKind::Set,
                vec![Bytes::from(format!("key:{}", i % 1000)), Bytes::from("value")],
            );
            black_box(runtime.block_on(dispatcher.submit(command)).unwrap());
            i += 1;
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_set,
    bench_get,
    bench_expiry,
    bench_sorted,
    bench_codec,
    bench_dispatcher,
);

criterion_main!(benches);
