use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use laneq_core::{operator_fn, Done, KeyedSerialQueue, TaskQueue};
use std::time::Duration;

fn benchmark_keyed_serial_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("keyed_serial_queue");
    group.measurement_time(Duration::from_secs(10));

    for channels in [1u32, 16, 256] {
        group.bench_with_input(
            BenchmarkId::new("sync_done_10k", channels),
            &channels,
            |b, &channels| {
                let queue = KeyedSerialQueue::new(|_item: u32, done: Done<u32, u32, ()>| done.done());
                b.iter(|| {
                    for i in 0..10_000u32 {
                        queue.enqueue(i % channels, i);
                    }
                })
            },
        );
    }

    group.finish();
}

fn benchmark_task_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("task_queue");
    group.measurement_time(Duration::from_secs(10));
    let runtime = tokio::runtime::Runtime::new().unwrap();

    for channels in [1u32, 64] {
        group.bench_with_input(
            BenchmarkId::new("drain_1k", channels),
            &channels,
            |b, &channels| {
                b.to_async(&runtime).iter(|| async move {
                    let queue = TaskQueue::new(operator_fn(|_key: u32, _item: u32| async { Ok(()) }))
                        .unwrap();
                    for i in 0..1_000u32 {
                        queue.enqueue(i % channels, i);
                    }
                    queue.idle().await;
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_keyed_serial_queue, benchmark_task_queue);
criterion_main!(benches);
