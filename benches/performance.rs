// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Performance benchmarks for CLIPGRID
//!
//! Run with: cargo bench
//!
//! These benchmarks measure:
//! - Transport subdivision math
//! - Scheduler tick cost across a fully loaded grid
//! - Mixer render throughput with many live voices

use std::sync::{Arc, Mutex};

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use clipgrid::audio::Mixer;
use clipgrid::config::EngineConfig;
use clipgrid::engine::Engine;
use clipgrid::sample::SampleHandle;
use clipgrid::timing::Transport;

const SR: u32 = 48_000;

fn test_sample() -> Arc<SampleHandle> {
    let frames = 2 * SR as usize; // one reference bar
    let data: Vec<f32> = (0..frames).map(|i| (i as f32 * 0.001).sin() * 0.5).collect();
    Arc::new(SampleHandle::from_frames("bench.wav", "bench.wav", data, 1, SR))
}

/// Benchmark the per-subdivision transport math (core timing operation)
fn bench_transport_advance(c: &mut Criterion) {
    c.bench_function("transport_advance", |b| {
        let mut transport = Transport::new(128.0);
        b.iter(|| {
            transport.advance(black_box(8));
            black_box(transport.next_event_time)
        })
    });
}

/// Benchmark a full scheduler tick with every cell queued to launch
fn bench_engine_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_tick");

    for size in [4usize, 8, 16].iter() {
        group.bench_with_input(BenchmarkId::new("grid", size), size, |b, &size| {
            b.iter_batched(
                || {
                    let mixer = Arc::new(Mutex::new(Mixer::new(SR, 2)));
                    let config = EngineConfig {
                        rows: size,
                        cols: size,
                        ..Default::default()
                    };
                    let mut engine = Engine::new(&config, mixer);
                    let sample = test_sample();
                    for row in 0..size {
                        for col in 0..size {
                            engine.assign_sample(row, col, Arc::clone(&sample)).unwrap();
                            engine.trigger(row, col).unwrap();
                        }
                    }
                    engine.start(0.0);
                    engine
                },
                |mut engine| {
                    // Crosses the first launch boundary for size*size cells
                    engine.tick(black_box(0.5));
                    black_box(engine.live_voices())
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

/// Benchmark mixer rendering with varying numbers of live voices
fn bench_mixer_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixer_render");

    for voices in [1usize, 16, 64].iter() {
        group.bench_with_input(BenchmarkId::new("voices", voices), voices, |b, &voices| {
            let mut mixer = Mixer::new(SR, 2);
            let sample = test_sample();
            for id in 0..voices as u64 {
                mixer.spawn_voice(id, Arc::clone(&sample), 1.0, 0.5, 0.0);
            }
            let mut out = vec![0.0f32; 512 * 2];
            b.iter(|| {
                mixer.render(black_box(&mut out));
                black_box(out[0])
            })
        });
    }
    group.finish();
}

/// Benchmark the gain recompute across a grid of live voices
fn bench_mute_solo_sweep(c: &mut Criterion) {
    c.bench_function("mute_solo_sweep", |b| {
        let mixer = Arc::new(Mutex::new(Mixer::new(SR, 2)));
        let config = EngineConfig {
            rows: 8,
            cols: 8,
            ..Default::default()
        };
        let mut engine = Engine::new(&config, mixer);
        let sample = test_sample();
        for row in 0..8 {
            for col in 0..8 {
                engine.assign_sample(row, col, Arc::clone(&sample)).unwrap();
                engine.trigger(row, col).unwrap();
            }
        }
        engine.start(0.0);
        engine.tick(0.5);

        let mut col = 0usize;
        b.iter(|| {
            engine.toggle_solo(black_box(col)).unwrap();
            col = (col + 1) % 8;
        })
    });
}

criterion_group!(
    benches,
    bench_transport_advance,
    bench_engine_tick,
    bench_mixer_render,
    bench_mute_solo_sweep
);
criterion_main!(benches);
