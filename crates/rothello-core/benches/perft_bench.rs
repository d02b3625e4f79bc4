use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rothello_core::perft::perft;

fn perft_benchmarks(c: &mut Criterion) {
    c.bench_function("perft 7", |b| b.iter(|| perft(black_box(7))));
    c.bench_function("perft 9", |b| b.iter(|| perft(black_box(9))));
}

criterion_group!(benches, perft_benchmarks);
criterion_main!(benches);
