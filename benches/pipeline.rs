use apiwatch::config::PipelineConfig;
use apiwatch::pipeline::AnomalyPipeline;
use apiwatch::synthetic::LogGenerator;
use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("detection");
    group.sample_size(10); // training-heavy benchmarks

    for n_records in [500, 2000, 5000].iter() {
        let records = LogGenerator::new(*n_records)
            .with_seed(42)
            .with_start(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap())
            .generate();

        group.bench_with_input(
            BenchmarkId::new("run", n_records),
            &records,
            |b, records| {
                b.iter(|| {
                    let pipeline = AnomalyPipeline::new(PipelineConfig::default()).unwrap();
                    pipeline.run(black_box(records)).unwrap()
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_detection);
criterion_main!(benches);
