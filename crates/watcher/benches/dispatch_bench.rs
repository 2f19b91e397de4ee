//! Dispatch throughput benchmarks for dirwatch

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dirwatch::platform::ManualBackend;
use dirwatch::{EventTranslator, FsContext, KindSet, LogicalKind, NativeEvent, NativeToken, WatchRequest, Watcher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn bench_translate(c: &mut Criterion) {
    let full = EventTranslator::new(KindSet::all());
    let partial = EventTranslator::new(LogicalKind::Create.into());
    let tokens = [
        NativeToken::EntryCreate,
        NativeToken::EntryModify,
        NativeToken::EntryDelete,
        NativeToken::Overflow,
        NativeToken::Unknown,
    ];

    c.bench_function("to_logical_all_kinds", |b| {
        b.iter(|| {
            for token in tokens {
                black_box(full.to_logical(black_box(token)));
            }
        });
    });

    c.bench_function("to_logical_create_only", |b| {
        b.iter(|| {
            for token in tokens {
                black_box(partial.to_logical(black_box(token)));
            }
        });
    });
}

fn bench_session_dispatch(c: &mut Criterion) {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let backend = ManualBackend::new();
    let watcher = Watcher::new(FsContext::new(temp_dir.path()), backend.clone());

    let seen = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = crossbeam_channel::unbounded::<()>();
    let target = Arc::new(AtomicUsize::new(usize::MAX));

    let counter = Arc::clone(&seen);
    let overflow_counter = Arc::clone(&seen);
    let event_target = Arc::clone(&target);
    let overflow_target = Arc::clone(&target);
    let overflow_tx = tx.clone();

    let request = WatchRequest::new(temp_dir.path(), KindSet::all(), move |_, _| {
        if counter.fetch_add(1, Ordering::Relaxed) + 1 == event_target.load(Ordering::Relaxed) {
            let _ = tx.send(());
        }
    })
    .on_overflow(move |_, _| {
        if overflow_counter.fetch_add(1, Ordering::Relaxed) + 1 == overflow_target.load(Ordering::Relaxed) {
            let _ = overflow_tx.send(());
        }
    });

    let handle = watcher.start(request).unwrap();
    let feed = backend.last_feed().unwrap();
    let dir = handle.dir().to_path_buf();

    let mut group = c.benchmark_group("session_dispatch");
    for size in [1usize, 64, 1024] {
        let batch: Vec<NativeEvent> = (0..size)
            .map(|i| {
                let token = match i % 4 {
                    0 => NativeToken::EntryCreate,
                    1 => NativeToken::EntryModify,
                    2 => NativeToken::EntryDelete,
                    _ => NativeToken::Overflow,
                };
                NativeEvent::new(token, dir.join(format!("file-{}", i)))
            })
            .collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &batch, |b, batch| {
            b.iter(|| {
                seen.store(0, Ordering::Relaxed);
                target.store(batch.len(), Ordering::Relaxed);
                feed.push(batch.clone());
                rx.recv_timeout(Duration::from_secs(5)).unwrap();
            });
        });
    }
    group.finish();

    handle.cancel();
}

criterion_group!(benches, bench_translate, bench_session_dispatch);
criterion_main!(benches);
