use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use rowfeed::{RandSource, SeededRandom, ThreadRandom, display_view, generate_batch};

// Record counts per benchmark iteration.
const SIZES: [usize; 3] = [10, 1_000, 100_000];

/// Benchmarks batch synthesis with a given random source.
fn bench_generate<R: RandSource>(c: &mut Criterion, group_name: &str, mut rng: R) {
    let mut group = c.benchmark_group(group_name);

    for size in SIZES {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("elems/{size}"), |b| {
            b.iter(|| black_box(generate_batch(size, &mut rng)));
        });
    }

    group.finish();
}

/// Benchmarks deriving the display view, which only touches the last records.
fn bench_display_view(c: &mut Criterion) {
    let mut group = c.benchmark_group("display_view");
    let batch = generate_batch(100_000, &mut SeededRandom::new(0));

    group.bench_function("no_overrides", |b| {
        b.iter(|| black_box(display_view(&batch, "")));
    });
    group.bench_function("overrides", |b| {
        b.iter(|| black_box(display_view(&batch, "1, 2, abc, 4, 0x10")));
    });

    group.finish();
}

fn benches(c: &mut Criterion) {
    bench_generate(c, "generate/thread_random", ThreadRandom);
    bench_generate(c, "generate/seeded", SeededRandom::new(0));
    bench_display_view(c);
}

criterion_group!(group, benches);
criterion_main!(group);
