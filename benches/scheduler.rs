use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, SamplingMode};

use tardiness::{InstanceBuilder, Scheduler, SolverConfig};

// Orders (processing time, due date, priority) of a small reference instance
const EXAMPLE: [(u32, u32, u32); 4] = [(5, 12, 3), (7, 15, 2), (4, 10, 4), (6, 20, 1)];

fn bench_scheduler_example(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("scheduler: varying machines with {EXAMPLE:?}"));
    group.sampling_mode(SamplingMode::Flat);
    group.sample_size(10);

    for r in [1usize, 2, 3].iter() {
        let builder = EXAMPLE
            .iter()
            .enumerate()
            .fold(InstanceBuilder::new(), |b, (j, &(p, d, w))| {
                b.order(format!("O{j}"), p, d, w)
            });

        let builder = (0..*r).fold(builder, |b, i| b.machine(format!("M{i}")));

        let builder = (0..EXAMPLE.len())
            .flat_map(|j| (0..EXAMPLE.len()).filter(move |&k| k != j).map(move |k| (j, k)))
            .fold(builder, |b, (j, k)| b.setup(format!("O{j}"), format!("O{k}"), 2));

        let instance = builder.build().expect("valid instance");
        let scheduler = Scheduler::lp(SolverConfig::default());

        group.bench_with_input(BenchmarkId::new("lp", r), &instance, |b, instance| {
            b.iter(|| scheduler.schedule(black_box(instance)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_scheduler_example);

criterion_main!(benches);
