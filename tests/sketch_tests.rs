use probabilistic_sketches::bloom::{BloomConfig, BloomFilter};
use probabilistic_sketches::count_min_sketch::CountMinSketch;
use probabilistic_sketches::cuckoo::{CuckooConfig, CuckooFilter};
use probabilistic_sketches::top_k::{TopK, TopKConfig};
use probabilistic_sketches::{Error, Merge, Operation, Reply, Shared, Sketch, Structure};
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
use std::collections::HashMap;

fn item(index: u32) -> String {
    format!("item{}", index)
}

#[test]
fn test_bloom_filter_false_positive_rate() {
    let mut filter = BloomFilter::create(1000, 0.01).unwrap();
    for i in 0..1000 {
        filter.add(format!("known-{}", i));
    }
    for i in 0..1000 {
        assert!(filter.exists(format!("known-{}", i)));
    }

    let samples = 100_000;
    let false_positives = (0..samples)
        .filter(|i| filter.exists(format!("unknown-{}", i)))
        .count();
    let rate = false_positives as f64 / samples as f64;
    assert!(rate < 0.02, "false positive rate: {}", rate);
}

#[test]
fn test_bloom_filter_scaling() {
    let config = BloomConfig::new().with_capacity(100).with_error_rate(0.01);
    let mut filter = BloomFilter::with_config(config).unwrap();
    for i in 0..2000 {
        filter.add(item(i));
    }
    assert!(filter.filter_count() > 1);
    for i in 0..2000 {
        assert!(filter.exists(item(i)));
    }

    let info = filter.info();
    assert_eq!(info.item_count, filter.item_count());
    assert_eq!(info.filter_count, filter.filter_count());
}

#[test]
fn test_cuckoo_filter_add_nx_delete() {
    let mut filter = CuckooFilter::create(1000, 32, 4).unwrap();
    for i in 0..500 {
        assert_eq!(filter.add_nx(item(i)), Ok(true));
    }

    let before = filter.clone();
    assert_eq!(filter.add_nx(item(7)), Ok(false));
    assert_eq!(filter, before);

    assert!(filter.delete(item(7)));
    assert!(!filter.exists(item(7)));
    assert_eq!(filter.len(), 499);
    assert_eq!(filter.items_deleted(), 1);
}

#[test]
fn test_cuckoo_filter_full_keeps_items() {
    let config = CuckooConfig::new()
        .with_capacity(64)
        .with_fingerprint_bits(16)
        .with_bucket_size(2)
        .with_max_kicks(50);
    let mut filter = CuckooFilter::with_rng(config, XorShiftRng::seed_from_u64(0)).unwrap();

    let mut added = Vec::new();
    let mut overflows = 0;
    for i in 0..200 {
        match filter.add(item(i)) {
            Ok(()) => added.push(i),
            Err(Error::FilterFull { kicks }) => {
                assert_eq!(kicks, 50);
                overflows += 1;
            }
            Err(err) => panic!("unexpected error: {}", err),
        }
    }

    assert!(overflows > 0);
    assert_eq!(filter.overflow_count(), overflows);
    assert_eq!(filter.len(), added.len());
    for i in added {
        assert!(filter.exists(item(i)));
    }
}

#[test]
fn test_count_min_sketch_error_bound() {
    let mut sketch = CountMinSketch::create_by_prob(0.001, 0.01).unwrap();
    assert_eq!(sketch.width(), 2719);
    assert_eq!(sketch.depth(), 5);

    let mut rng = XorShiftRng::seed_from_u64(0);
    let mut counts = HashMap::new();
    for _ in 0..10_000 {
        // Skewed towards the low indexes.
        let index = (rng.gen::<f64>().powi(2) * 5.0) as u32;
        sketch.incr_by(item(index), 1).unwrap();
        *counts.entry(index).or_insert(0) += 1;
    }

    assert_eq!(sketch.total_count(), 10_000);
    let bound = (sketch.error() * sketch.total_count() as f64).ceil() as u64;
    for (index, count) in counts {
        let estimate = sketch.query(item(index));
        assert!(estimate >= count);
        assert!(estimate - count <= bound);
    }
}

#[test]
fn test_count_min_sketch_merge_is_exact() {
    let mut sketch_1 = CountMinSketch::create_by_dim(200, 4).unwrap();
    let mut sketch_2 = CountMinSketch::create_by_dim(200, 4).unwrap();
    let mut expected = CountMinSketch::create_by_dim(200, 4).unwrap();
    for i in 0..100 {
        let delta = i64::from(i % 7 + 1);
        sketch_1.incr_by(item(i), delta).unwrap();
        expected.incr_by(item(i), delta).unwrap();
    }
    for i in 50..150 {
        let delta = i64::from(i % 3 + 1);
        sketch_2.incr_by(item(i), delta).unwrap();
        expected.incr_by(item(i), delta).unwrap();
    }

    let mut merged = CountMinSketch::create_by_dim(200, 4).unwrap();
    merged.merge(&[&sketch_1, &sketch_2], None).unwrap();
    assert_eq!(merged, expected);

    sketch_1.merge_from(&sketch_2).unwrap();
    assert_eq!(sketch_1, expected);
}

#[test]
fn test_top_k_heavy_hitters() {
    let mut top_k = TopK::create(3, 64, 5, 0.9).unwrap();
    for i in 1..=6 {
        top_k.incr_by(item(i), i64::from(i) * 1000).unwrap();
    }

    assert_eq!(
        top_k.list(),
        vec![item(6).into_bytes(), item(5).into_bytes(), item(4).into_bytes()],
    );
    assert_eq!(
        top_k.list_with_count(),
        vec![
            (item(6).into_bytes(), 6000),
            (item(5).into_bytes(), 5000),
            (item(4).into_bytes(), 4000),
        ],
    );
    assert_eq!(top_k.query(item(1)), None);
    assert_eq!(top_k.query(item(6)), Some(6000));
}

#[test]
fn test_top_k_merge() {
    let config = TopKConfig::new().with_k(2).with_width(64).with_depth(5);
    let mut top_k_1 = TopK::with_config(config).unwrap();
    let mut top_k_2 = TopK::with_config(config).unwrap();
    top_k_1.incr_by("foo", 10).unwrap();
    top_k_1.incr_by("bar", 3).unwrap();
    top_k_2.incr_by("baz", 8).unwrap();
    top_k_2.incr_by("bar", 6).unwrap();

    top_k_1.merge(&top_k_2).unwrap();
    assert_eq!(
        top_k_1.list_with_count(),
        vec![(b"foo".to_vec(), 10), (b"bar".to_vec(), 9)],
    );
}

#[test]
fn test_config_validation() {
    assert!(matches!(BloomFilter::create(0, 0.01), Err(Error::InvalidConfig(_))));
    assert!(matches!(BloomFilter::create(100, 0.0), Err(Error::InvalidConfig(_))));
    assert!(matches!(BloomFilter::create(100, 1.0), Err(Error::InvalidConfig(_))));

    assert!(matches!(CuckooFilter::create(0, 8, 4), Err(Error::InvalidConfig(_))));
    assert!(matches!(CuckooFilter::create(100, 0, 4), Err(Error::InvalidConfig(_))));
    assert!(matches!(CuckooFilter::create(100, 8, 0), Err(Error::InvalidConfig(_))));

    assert!(matches!(CountMinSketch::create_by_dim(0, 5), Err(Error::InvalidConfig(_))));
    assert!(matches!(CountMinSketch::create_by_dim(100, 0), Err(Error::InvalidConfig(_))));
    assert!(matches!(CountMinSketch::create_by_prob(0.0, 0.01), Err(Error::InvalidConfig(_))));
    assert!(matches!(CountMinSketch::create_by_prob(0.01, 1.0), Err(Error::InvalidConfig(_))));

    assert!(matches!(TopK::create(0, 8, 7, 0.9), Err(Error::InvalidConfig(_))));
    assert!(matches!(TopK::create(10, 0, 7, 0.9), Err(Error::InvalidConfig(_))));
    assert!(matches!(TopK::create(10, 8, 0, 0.9), Err(Error::InvalidConfig(_))));
}

#[test]
fn test_ser_de() {
    let mut bloom_filter = BloomFilter::create(100, 0.01).unwrap();
    let mut cuckoo_filter = CuckooFilter::create(100, 8, 4).unwrap();
    let mut count_min_sketch = CountMinSketch::create_by_dim(100, 5).unwrap();
    let mut top_k = TopK::create(5, 64, 5, 0.9).unwrap();
    for i in 0..20 {
        bloom_filter.add(item(i));
        cuckoo_filter.add(item(i)).unwrap();
        count_min_sketch.incr_by(item(i), i64::from(i)).unwrap();
        top_k.incr_by(item(i), i64::from(i)).unwrap();
    }

    let de_bloom_filter = BloomFilter::from_bytes(&bloom_filter.to_bytes().unwrap()).unwrap();
    let de_cuckoo_filter: CuckooFilter =
        CuckooFilter::from_bytes(&cuckoo_filter.to_bytes().unwrap()).unwrap();
    let de_count_min_sketch =
        CountMinSketch::from_bytes(&count_min_sketch.to_bytes().unwrap()).unwrap();
    let de_top_k: TopK = TopK::from_bytes(&top_k.to_bytes().unwrap()).unwrap();

    assert_eq!(de_bloom_filter, bloom_filter);
    assert_eq!(de_cuckoo_filter, cuckoo_filter);
    assert_eq!(de_count_min_sketch, count_min_sketch);
    assert_eq!(de_top_k, top_k);
    for i in 0..40 {
        assert_eq!(de_bloom_filter.exists(item(i)), bloom_filter.exists(item(i)));
        assert_eq!(de_cuckoo_filter.count(item(i)), cuckoo_filter.count(item(i)));
        assert_eq!(de_count_min_sketch.query(item(i)), count_min_sketch.query(item(i)));
        assert_eq!(de_top_k.query(item(i)), top_k.query(item(i)));
    }
    assert_eq!(de_top_k.list_with_count(), top_k.list_with_count());

    let bytes = count_min_sketch.to_bytes().unwrap();
    assert!(matches!(
        BloomFilter::from_bytes(&bytes),
        Err(Error::CorruptState(_)),
    ));
    assert!(matches!(
        CountMinSketch::from_bytes(&bytes[..bytes.len() - 3]),
        Err(Error::CorruptState(_)),
    ));
    assert_eq!(
        Structure::from_bytes(&bytes).unwrap(),
        Structure::CountMinSketch(count_min_sketch),
    );
}

#[test]
fn test_shared_dispatch() {
    let shared = Shared::new(Structure::from(CountMinSketch::create_by_dim(100, 5).unwrap()));
    assert_eq!(
        shared.apply(Operation::IncrBy(b"foo".to_vec(), 4)),
        Ok(Reply::Count(4)),
    );
    assert_eq!(shared.apply(Operation::Query(b"foo".to_vec())), Ok(Reply::Count(4)));
    assert_eq!(
        shared.apply(Operation::Exists(b"foo".to_vec())),
        Err(Error::WrongStructure {
            operation: "exists",
            kind: "count-min sketch",
        }),
    );

    shared.merge_from(&shared).unwrap();
    assert_eq!(shared.apply(Operation::Query(b"foo".to_vec())), Ok(Reply::Count(8)));
}
