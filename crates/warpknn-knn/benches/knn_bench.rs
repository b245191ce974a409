//! Criterion benchmarks for warpknn-knn: single and batch prediction, grid search.

use criterion::{Criterion, criterion_group, criterion_main};

use warpknn_dtw::TimeSeries;
use warpknn_knn::{GridSearch, KnnConfig, LabeledExample};

fn make_examples(n_per_class: usize, len: usize, phase: f64) -> Vec<LabeledExample<usize>> {
    let mut out = Vec::new();
    for class in 0..4 {
        for j in 0..n_per_class {
            let values: Vec<f64> = (0..len)
                .map(|i| {
                    let t = i as f64 * 0.1 + phase + j as f64 * 0.03;
                    (t * (class + 1) as f64).sin() + j as f64 * 0.01
                })
                .collect();
            out.push(LabeledExample::new(TimeSeries::new(values).unwrap(), class));
        }
    }
    out
}

fn queries(examples: &[LabeledExample<usize>]) -> Vec<TimeSeries> {
    examples.iter().map(|e| e.series.clone()).collect()
}

fn bench_predict_single(c: &mut Criterion) {
    let clf = KnnConfig::new(3).unwrap().fit(make_examples(25, 128, 0.0)).unwrap();
    let query = make_examples(1, 128, 0.5).remove(0).series;

    c.bench_function("predict_single_100refs_len128_k3", |b| {
        b.iter(|| clf.predict(query.as_view()).unwrap());
    });
}

fn bench_predict_batch(c: &mut Criterion) {
    let train = make_examples(25, 128, 0.0);
    let test = queries(&make_examples(10, 128, 0.5));
    let mut group = c.benchmark_group("predict_batch_100refs_40q_len128");

    for window in [None, Some(12)] {
        let clf = KnnConfig::new(1).unwrap().with_window(window).fit(train.clone()).unwrap();
        let name = window.map_or_else(|| "unconstrained".to_string(), |w| format!("r{w}"));
        group.bench_function(name, |b| {
            b.iter(|| clf.predict_batch(&test).unwrap());
        });
    }
    group.finish();
}

fn bench_grid_search(c: &mut Criterion) {
    let train = make_examples(10, 64, 0.0);
    let validation = make_examples(5, 64, 0.3);
    let grid = GridSearch::new(vec![1, 3, 5], vec![None, Some(4), Some(8)]).unwrap();

    c.bench_function("grid_search_40x20_len64_9cand", |b| {
        b.iter(|| grid.evaluate(&train, &validation).unwrap());
    });
}

criterion_group!(benches, bench_predict_single, bench_predict_batch, bench_grid_search);
criterion_main!(benches);
