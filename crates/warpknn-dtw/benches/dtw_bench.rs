//! Criterion benchmarks for warpknn-dtw: distance, early abandoning, pairwise matrix.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use warpknn_dtw::{Dtw, TimeSeries};

fn make_sine_series(n: usize, offset: f64) -> TimeSeries {
    let values: Vec<f64> = (0..n).map(|i| (i as f64 * 0.1).sin() + offset).collect();
    TimeSeries::new(values).unwrap()
}

fn bench_distance(c: &mut Criterion) {
    let mut group = c.benchmark_group("dtw_distance");

    for len in [64usize, 256, 1024] {
        for (window, label) in [(None, "unconstrained"), (Some(8), "r8"), (Some(32), "r32")] {
            let a = make_sine_series(len, 0.0);
            let b = make_sine_series(len, 0.5);
            let dtw = window.map_or_else(Dtw::unconstrained, Dtw::with_sakoe_chiba);
            group.bench_with_input(
                BenchmarkId::new(format!("len{len}"), label),
                &(a, b, dtw),
                |bencher, (a, b, dtw)| bencher.iter(|| dtw.distance(a.as_view(), b.as_view())),
            );
        }
    }

    group.finish();
}

fn bench_cutoff(c: &mut Criterion) {
    let a = make_sine_series(512, 0.0);
    let b = make_sine_series(512, 3.0);
    let dtw = Dtw::unconstrained();

    c.bench_function("dtw_cutoff_512_abandon", |bencher| {
        bencher.iter(|| dtw.distance_with_cutoff(a.as_view(), b.as_view(), 1.0));
    });
}

fn bench_pairwise(c: &mut Criterion) {
    let series: Vec<TimeSeries> = (0..50).map(|i| make_sine_series(128, i as f64 * 0.2)).collect();
    let dtw = Dtw::with_sakoe_chiba(8);

    c.bench_function("dtw_pairwise_50x128_r8", |b| b.iter(|| dtw.pairwise(&series)));
}

criterion_group!(benches, bench_distance, bench_cutoff, bench_pairwise);
criterion_main!(benches);
