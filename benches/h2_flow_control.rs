//! HTTP/2 Input Flow Control Benchmarks
//!
//! This benchmark suite measures:
//! - Uncontended advance / window update on a single window
//! - Contended advance from several threads on one window
//! - Stream + connection accounting through the coordinator
//!
//! Run with: cargo bench --bench h2_flow_control

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use h2flow::h2::{
    flow_control::InputFlowControl, ConnectionInputFlowControl, FlowControlSettingsBuilder,
    WindowUpdateFrame, MAX_WINDOW_SIZE,
};
use std::sync::Arc;
use std::thread;

// ========== Single Window Benchmarks ==========

fn bench_window_single_thread(c: &mut Criterion) {
    let mut group = c.benchmark_group("window_single_thread");

    group.bench_function("advance_then_update", |b| {
        let window = InputFlowControl::new(MAX_WINDOW_SIZE, 32768);
        b.iter(|| {
            black_box(window.try_advance(black_box(16384)));
            black_box(window.try_update_window(black_box(16384)));
        });
    });

    group.bench_function("advance_after_abort", |b| {
        let window = InputFlowControl::new(MAX_WINDOW_SIZE, 32768);
        window.abort();
        b.iter(|| {
            black_box(window.try_advance(black_box(1)));
        });
    });

    group.finish();
}

fn bench_window_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("window_contended");
    const OPS: u32 = 10_000;

    for threads in [1u32, 2, 4] {
        group.throughput(Throughput::Elements((OPS * threads) as u64));
        group.bench_with_input(
            BenchmarkId::new("advance_1_byte", threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    let window = InputFlowControl::new(OPS * threads, 1);
                    thread::scope(|s| {
                        for _ in 0..threads {
                            s.spawn(|| {
                                for _ in 0..OPS {
                                    black_box(window.try_advance(1));
                                }
                            });
                        }
                    });
                    black_box(window.available());
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("update_1_byte", threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    let window = InputFlowControl::new(0, 1024);
                    thread::scope(|s| {
                        for _ in 0..threads {
                            s.spawn(|| {
                                for _ in 0..OPS {
                                    black_box(window.try_update_window(1));
                                }
                            });
                        }
                    });
                    black_box(window.available());
                });
            },
        );
    }

    group.finish();
}

// ========== Coordinator Benchmarks ==========

fn bench_stream_data_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_data_path");

    let settings = FlowControlSettingsBuilder::new()
        .initial_connection_window_size(MAX_WINDOW_SIZE)
        .initial_stream_window_size(MAX_WINDOW_SIZE)
        .build()
        .unwrap();
    let conn = ConnectionInputFlowControl::new(
        settings,
        Arc::new(|frame: WindowUpdateFrame| {
            black_box(frame.encode());
        }),
    );
    let stream = conn.open_stream(1).unwrap();

    group.throughput(Throughput::Bytes(16384));
    group.bench_function("receive_and_consume_16k", |b| {
        b.iter(|| {
            black_box(stream.advance(black_box(16384)).unwrap());
            stream.update_windows(black_box(16384));
        });
    });

    group.bench_function("padded_frame", |b| {
        b.iter(|| {
            black_box(stream.advance_padded(black_box(16128), black_box(256)).unwrap());
            stream.update_windows(black_box(16128));
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_window_single_thread,
    bench_window_contended,
    bench_stream_data_path
);
criterion_main!(benches);
