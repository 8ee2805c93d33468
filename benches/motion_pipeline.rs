//! Motion Pipeline Benchmarks
//!
//! Measures the per-packet and per-frame hot paths: frame parsing, the
//! orientation pipeline, nested hit-testing, and a full engine packet plus
//! render tick.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::{Duration, Instant};

use motion_pointer::cursor::NullRenderer;
use motion_pointer::device::{parse_frame, DeviceId, DeviceProfile, ProfileStore};
use motion_pointer::engine::{Engine, EngineOptions};
use motion_pointer::interaction::{
    find_interactive, resolve_point, FrameContent, Node, Rect, RecordingSink, Scene,
};
use motion_pointer::pipeline::{self, PipelineState, Viewport};

/// One hub frame carrying `devices` samples
fn generate_frame(devices: usize, step: usize) -> String {
    let samples: Vec<String> = (0..devices)
        .map(|i| {
            format!(
                r#"{{"device":"Dev{}","x":{:.2},"y":{:.2},"z":{:.2},"gx":12,"gy":-980,"gz":140,"lax":3,"lay":-8,"laz":1,"b1":0,"b2":1}}"#,
                i,
                (step % 40) as f64 - 20.0,
                (step % 30) as f64 * 0.5,
                180.0 + (step % 7) as f64
            )
        })
        .collect();
    format!("[{}]", samples.join(","))
}

/// Scene with `depth` nested same-origin frames and a button at the bottom
fn nested_scene(depth: u32) -> Scene {
    let mut inner = Scene::from_nodes(vec![
        Node::new(1, "div", Rect::new(0.0, 0.0, 400.0, 400.0)),
        Node::new(2, "button", Rect::new(20.0, 20.0, 120.0, 60.0)).with_parent(1),
    ]);

    for level in 0..depth {
        inner = Scene::from_nodes(vec![
            Node::new(1, "div", Rect::new(0.0, 0.0, 1920.0, 1080.0)),
            Node::new(10 + level, "iframe", Rect::new(10.0, 10.0, 1600.0, 900.0))
                .with_parent(1)
                .with_frame(FrameContent::Document(Box::new(inner))),
        ]);
    }
    inner
}

fn bench_parse_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_frame");

    for devices in [1usize, 2, 4] {
        let frame = generate_frame(devices, 7);
        group.throughput(Throughput::Elements(devices as u64));
        group.bench_with_input(BenchmarkId::new("devices", devices), &frame, |b, text| {
            b.iter(|| black_box(parse_frame(black_box(text))))
        });
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_process");
    let viewport = Viewport::new(1920.0, 1080.0);

    for (name, relative) in [("absolute", false), ("relative", true)] {
        let mut profile = DeviceProfile::for_device(&DeviceId::new("Dev0"));
        profile.use_relative_mode = relative;
        let samples = parse_frame(&generate_frame(1, 3)).samples;
        let sample = &samples[0];

        group.bench_function(name, |b| {
            let mut state = PipelineState::new(&viewport);
            b.iter(|| {
                black_box(pipeline::process(
                    black_box(sample),
                    &profile,
                    &mut state,
                    &viewport,
                    false,
                ))
            })
        });
    }

    group.finish();
}

fn bench_hit_test(c: &mut Criterion) {
    let mut group = c.benchmark_group("hit_test");

    for depth in [0u32, 2, 8] {
        let scene = nested_scene(depth);
        let offset = 10.0 * f64::from(depth);
        let (x, y) = (offset + 50.0, offset + 40.0);

        group.bench_with_input(BenchmarkId::new("resolve_point", depth), &scene, |b, s| {
            b.iter(|| black_box(resolve_point(s, black_box(x), black_box(y))))
        });
        group.bench_with_input(BenchmarkId::new("find_interactive", depth), &scene, |b, s| {
            b.iter(|| black_box(find_interactive(s, black_box(x), black_box(y), "game-card")))
        });
    }

    group.finish();
}

fn bench_engine_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine");

    group.bench_function("packet_and_render", |b| {
        let mut engine = Engine::new(
            EngineOptions::default(),
            ProfileStore::with_defaults(),
            nested_scene(2),
            RecordingSink::new(),
            NullRenderer,
        );
        let frames: Vec<String> = (0..64).map(|i| generate_frame(2, i)).collect();
        let start = Instant::now();
        let mut tick = 0u64;

        b.iter(|| {
            let now = start + Duration::from_millis(tick * 16);
            let frame = &frames[tick as usize % frames.len()];
            black_box(engine.handle_frame(frame, now));
            engine.render_tick(now);
            engine.poll_timers(now);
            engine.sink_mut().drain();
            tick += 1;
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_parse_frame,
    bench_pipeline,
    bench_hit_test,
    bench_engine_tick
);
criterion_main!(benches);
