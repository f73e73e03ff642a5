#[macro_use]
extern crate criterion;
extern crate rand;
extern crate xorwide;

use criterion::{BenchmarkId, Criterion};
use rand::Rng;
use xorwide::{Filter, WideBuilder};

const SAMPLE_SIZE: u32 = 10_000;

fn populate_wide(c: &mut Criterion) {
    let mut group = c.benchmark_group("WideXorN");
    let group = group.sample_size(10);

    let mut rng = rand::thread_rng();
    let keys: Vec<[u8; 32]> = (0..SAMPLE_SIZE).map(|_| rng.gen()).collect();

    group.bench_with_input(BenchmarkId::new("populate_wide", SAMPLE_SIZE), &keys, |b, keys| {
        let mut builder = WideBuilder::new();
        b.iter(|| builder.populate_wide(keys, 16).unwrap());
    });
}

fn contains(c: &mut Criterion) {
    let mut group = c.benchmark_group("WideXorN");

    let mut rng = rand::thread_rng();
    let keys: Vec<[u8; 32]> = (0..SAMPLE_SIZE).map(|_| rng.gen()).collect();
    let filter = WideBuilder::new().populate_wide(&keys, 16).unwrap();

    group.bench_function(BenchmarkId::new("contains", SAMPLE_SIZE), |b| {
        let key: [u8; 32] = rng.gen();
        b.iter(|| filter.contains(&key[..]));
    });
}

criterion_group!(wide, populate_wide, contains);
criterion_main!(wide);
