//! Benchmark for whole-map generation.
//!
//! Run with: cargo bench --package tundra_procedural --bench generation_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tundra_procedural::{generate, ClassicParams, FlatParams, GenParams, RealisticTemplate};

fn benchmark_generators(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_128x128x64");
    group.sample_size(10);

    let flat = GenParams::Flat(FlatParams { width: 128, length: 128, height: 64, ground_level: None });
    group.bench_function("flat", |b| b.iter(|| black_box(generate(flat.clone()).unwrap())));

    let classic = GenParams::Classic(ClassicParams {
        seed: 1,
        width: 128,
        length: 128,
        height: 64,
        ..ClassicParams::default()
    });
    group.bench_function("classic", |b| b.iter(|| black_box(generate(classic.clone()).unwrap())));

    for template in [RealisticTemplate::Default, RealisticTemplate::Mountains, RealisticTemplate::Island] {
        let params = GenParams::Realistic(template.params(128, 128, 64, 1));
        group.bench_function(format!("realistic_{template}"), |b| {
            b.iter(|| black_box(generate(params.clone()).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_generators);
criterion_main!(benches);
