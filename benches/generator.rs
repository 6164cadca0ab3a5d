//! # Generator driving overhead
//!
//! **Real-world scenario**: turning a producer loop into a pull-driven
//! sequence, the way a parser or a log-line iterator does, and measuring
//! what the generator machinery costs on top of the equivalent plain loop.
//!
//! Two drivers are compared:
//! - [`cadence::generator::sync`], driven with the null-waker trick on an
//!   ordinary `for _ in sequence.iter() {}` loop.
//! - [`cadence::generator::async_gen`], driven with `futures::executor`'s
//!   real waker via `to_list()`.
//!
//! `yield_all` delegation is benched separately since its cost per
//! nesting level is a property worth holding constant.

use cadence::generator::{async_generate, generate};
use cadence::sequence::SequenceExt;
use cadence::task::run_async;
use criterion::{criterion_group, criterion_main, Criterion};

const ITEMS: i64 = 10_000;

fn baseline_loop(c: &mut Criterion) {
    c.bench_function("generator/baseline_vec", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(ITEMS as usize);
            for i in 0..ITEMS {
                out.push(i);
            }
            out
        });
    });
}

fn sync_generator(c: &mut Criterion) {
    c.bench_function("generator/sync", |b| {
        b.iter(|| {
            let seq = generate(|y| async move {
                for i in 0..ITEMS {
                    y.yield_(i).await;
                }
                Ok::<(), std::convert::Infallible>(())
            });
            seq.to_list().unwrap()
        });
    });
}

fn sync_generator_yield_all(c: &mut Criterion) {
    c.bench_function("generator/sync_yield_all_one_level", |b| {
        b.iter(|| {
            let seq = generate(|y| async move {
                y.yield_all(0..ITEMS).await;
                Ok::<(), std::convert::Infallible>(())
            });
            seq.to_list().unwrap()
        });
    });
}

fn async_generator(c: &mut Criterion) {
    c.bench_function("generator/async", |b| {
        b.iter(|| {
            let seq = async_generate(|y| async move {
                for i in 0..ITEMS {
                    y.yield_(i).await;
                }
                Ok::<(), std::convert::Infallible>(())
            });
            run_async(seq.stream().to_list())
        });
    });
}

criterion_group!(
    benches,
    baseline_loop,
    sync_generator,
    sync_generator_yield_all,
    async_generator
);
criterion_main!(benches);
