//! # Dispatch Benchmark
//!
//! Cost of one handler run over a populated registry, with and without
//! churn from callbacks.
//!
//! Run with: `cargo bench --package rondo_core --bench dispatch_benchmark`

// Benchmarks don't need docs and may have intentionally unused code
#![allow(missing_docs)]
#![allow(dead_code)]

use bytemuck::{Pod, Zeroable};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rondo_core::{Handler, HookError, Registry, TemplateIndex};

const ACTOR: TemplateIndex = TemplateIndex(1);
const SPARK: TemplateIndex = TemplateIndex(2);

#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct Actor {
    x: f32,
    y: f32,
    health: f32,
    ticks: u32,
}

fn populated(count: usize) -> (Registry, Handler) {
    let mut registry = Registry::new().unwrap();
    registry.add_template_of::<Actor>(ACTOR).unwrap();
    registry.add_template_of::<Actor>(SPARK).unwrap();
    let mut handler =
        Handler::with_priority(&mut registry, |index| if index == SPARK { 1 } else { 0 }).unwrap();
    handler.bind(ACTOR, |ctx| {
        let actor = ctx
            .state_mut::<Actor>()
            .ok_or_else(|| HookError::new("no state"))?;
        actor.x += 1.0;
        actor.ticks += 1;
        Ok(())
    });
    for _ in 0..count {
        registry.spawn(ACTOR).unwrap();
    }
    handler.run(&mut registry).unwrap();
    (registry, handler)
}

/// Benchmark: steady-state run, no structural changes.
fn bench_steady_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("handler_run");

    for count in [100, 10_000] {
        let (mut registry, mut handler) = populated(count);
        group.bench_function(BenchmarkId::from_parameter(count), |b| {
            b.iter(|| black_box(handler.run(&mut registry).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark: every spark kills itself and spawns a replacement.
fn bench_churn_run(c: &mut Criterion) {
    let setup = || {
        let (mut registry, mut handler) = populated(1_000);
        handler.bind(SPARK, |ctx| {
            ctx.kill_self()?;
            ctx.spawn(SPARK)?;
            Ok(())
        });
        for _ in 0..100 {
            registry.spawn(SPARK).unwrap();
        }
        (registry, handler)
    };

    c.bench_function("handler_run_churn_100", |b| {
        b.iter_batched(
            setup,
            |(mut registry, mut handler)| black_box(handler.run(&mut registry).unwrap()),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_steady_run, bench_churn_run);
criterion_main!(benches);
