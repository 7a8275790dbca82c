use mpround::{can_round_raw, BigInt, Context, Float, RoundingMode};

use RoundingMode::NearestTiesToEven as rme;

/// Returns a value near 1/3 with `prec` bits, which has a long mantissa.
fn third(prec: usize) -> Float {
    let mut ctx = Context::default();
    let mut x = Float::new(prec);
    x.set_div(&Float::from_u64(2, 1), &Float::from_u64(2, 3), rme, &mut ctx);
    x
}

fn test_add(prec: usize) {
    let mut ctx = Context::default();
    let a = third(prec);
    let b = Float::from_u64(prec, 7);
    let mut r = Float::new(prec);
    for _ in 0..100 {
        black_box(r.set_add(&a, &b, rme, &mut ctx));
        black_box(r.set_sub(&a, &b, rme, &mut ctx));
    }
}

fn test_mul(prec: usize) {
    let mut ctx = Context::default();
    let a = third(prec);
    let mut r = Float::new(prec);
    for _ in 0..100 {
        black_box(r.set_mul(&a, &a, rme, &mut ctx));
    }
}

fn test_div(prec: usize) {
    let mut ctx = Context::default();
    let a = third(prec);
    let b = Float::from_u64(prec, 7);
    let mut r = Float::new(prec);
    for _ in 0..10 {
        black_box(r.set_div(&b, &a, rme, &mut ctx));
    }
}

fn test_sqrt(prec: usize) {
    let mut ctx = Context::default();
    let a = third(prec);
    let mut r = Float::new(prec);
    for _ in 0..10 {
        black_box(r.set_sqrt(&a, rme, &mut ctx));
    }
}

fn test_can_round() {
    let a = third(10000);
    for prec in 2..200 {
        black_box(can_round_raw(a.get_mantissa(), false, 9000, rme, rme, prec));
    }
}

fn test_bigint_div() {
    let a = BigInt::pseudorandom(1000, 12345);
    let b = BigInt::pseudorandom(500, 67890);
    black_box(a.div_rem(&b));
}

use criterion::{black_box, criterion_group, criterion_main, Criterion};

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("test_add_64", |b| b.iter(|| test_add(64)));
    c.bench_function("test_add_2000", |b| b.iter(|| test_add(2000)));
    c.bench_function("test_mul_2000", |b| b.iter(|| test_mul(2000)));
    c.bench_function("test_div_2000", |b| b.iter(|| test_div(2000)));
    c.bench_function("test_sqrt_2000", |b| b.iter(|| test_sqrt(2000)));
    c.bench_function("test_can_round", |b| b.iter(test_can_round));
    c.bench_function("test_bigint_div", |b| b.iter(test_bigint_div));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
