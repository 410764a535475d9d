use criterion::{criterion_group, criterion_main, Criterion};
use probabilistic_sketches::count_min_sketch::CountMinSketch;

fn bench_incr_by(c: &mut Criterion) {
    let mut sketch = CountMinSketch::create_by_prob(0.001, 0.01).unwrap();
    let mut i = 0u32;
    c.bench_function("bench incr_by", |b| {
        b.iter(|| {
            i = i.wrapping_add(1);
            sketch.incr_by(i.to_be_bytes(), 1)
        })
    });
}

fn bench_merge(c: &mut Criterion) {
    let mut sketches = Vec::new();
    for seed in 0..4u32 {
        let mut sketch = CountMinSketch::create_by_dim(2000, 5).unwrap();
        for i in 0..1000u32 {
            sketch.incr_by((seed * 1000 + i).to_be_bytes(), 1).unwrap();
        }
        sketches.push(sketch);
    }
    let sources: Vec<&CountMinSketch> = sketches.iter().collect();
    let weights: [u64; 4] = [1, 2, 3, 4];
    let mut destination = CountMinSketch::create_by_dim(2000, 5).unwrap();
    c.bench_function("bench weighted merge of 4", |b| {
        b.iter(|| destination.merge(&sources, Some(&weights[..])))
    });
}

criterion_group!(benches, bench_incr_by, bench_merge);
criterion_main!(benches);
