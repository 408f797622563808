use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use savanna::simulation::{GameVariant, Simulation};
use savanna::SimulationConfig;
use std::time::Duration;

const STEPS: usize = 60;

fn bench_world_steps(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_step");
    group.sample_size(20);
    group.measurement_time(Duration::from_secs(8));

    let presets = [
        ("chase", GameVariant::Chase, SimulationConfig::chase()),
        ("tribal", GameVariant::Tribal, SimulationConfig::tribal()),
    ];
    for (name, variant, config) in presets {
        for broad_phase in [false, true] {
            let mut config = config.clone();
            config.interaction.use_broad_phase = broad_phase;
            let label = if broad_phase { "hashed" } else { "scan" };
            group.bench_function(format!("{}_{}_{}steps", name, label, STEPS), |b| {
                b.iter_batched(
                    || Simulation::from_config(variant, config.clone()).expect("preset builds"),
                    |mut sim| {
                        for _ in 0..STEPS {
                            sim.advance_world(16.0);
                        }
                        sim
                    },
                    BatchSize::SmallInput,
                )
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_world_steps);
criterion_main!(benches);
