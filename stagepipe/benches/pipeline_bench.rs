//! Benchmarks for command traversal and session sweeps.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stagepipe::prelude::*;

struct Counter {
    hits: u64,
}

fn config(stages: usize) -> PipelineConfig {
    let mut config = PipelineConfig::new().with_options(EngineOptions::new().with_emit_events(false));
    for index in 0..stages {
        let commands = CommandRegistry::<Counter>::new()
            .with_command::<u64, _>(
                Some("Add"),
                CommandDefinition::new(|c: &mut Counter, p: &mut CommandParams<'_, u64>| {
                    c.hits += *p.payload();
                    Ok(PipelineAction::Continue)
                }),
            )
            .with_start_session(SessionCommandDefinition::new(|_: &mut Counter| {
                Ok(PipelineAction::Continue)
            }));
        config
            .add_stage(format!("counter-{index}"), || Counter { hits: 0 }, commands)
            .expect("stage names are unique");
    }
    config
}

fn traversal_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_command");
    for stages in [1, 8, 64] {
        for cached in [true, false] {
            let config = config(stages)
                .with_options(EngineOptions::new().with_emit_events(false).with_cache_commands(cached));
            let mut engine = config.create_pipeline();
            let label = if cached { "cached" } else { "uncached" };
            group.bench_with_input(BenchmarkId::new(label, stages), &stages, |b, _| {
                b.iter(|| {
                    let mut payload = 1_u64;
                    black_box(engine.run_command(Some("Add"), &mut payload))
                });
            });
        }
    }
    group.finish();
}

fn session_benchmark(c: &mut Criterion) {
    let config = config(16);
    c.bench_function("session_cycle_16", |b| {
        b.iter(|| {
            let mut engine = config.create_pipeline();
            engine.start_session().expect("start");
            engine.end_session().expect("end");
            black_box(engine.session_started())
        });
    });
}

criterion_group!(benches, traversal_benchmark, session_benchmark);
criterion_main!(benches);
