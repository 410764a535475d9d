use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use probabilistic_sketches::cuckoo::CuckooFilter;

fn bench_add(c: &mut Criterion) {
    let mut initial_items = 0u32;
    while initial_items < 1024 - 32 {
        c.bench_function(&format!("bench add {}", initial_items), |b| {
            b.iter_batched_ref(
                || {
                    let mut filter = CuckooFilter::create(1024, 16, 4).unwrap();
                    for i in 0..initial_items {
                        filter.add(i.to_be_bytes()).unwrap();
                    }
                    filter
                },
                |filter| filter.add(0xDEAD_BEEFu32.to_be_bytes()),
                BatchSize::PerIteration,
            )
        });
        initial_items += 32;
    }
}

fn bench_delete(c: &mut Criterion) {
    c.bench_function("bench delete", |b| {
        b.iter_batched_ref(
            || {
                let mut filter = CuckooFilter::create(1024, 16, 4).unwrap();
                for i in 0..512u32 {
                    filter.add(i.to_be_bytes()).unwrap();
                }
                filter
            },
            |filter| filter.delete(256u32.to_be_bytes()),
            BatchSize::PerIteration,
        )
    });
}

criterion_group!(benches, bench_add, bench_delete);
criterion_main!(benches);
