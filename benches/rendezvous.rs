//! # Rendezvous throughput & latency
//!
//! **Real-world scenario**: a producer and consumer handing off values one
//! at a time, the way a market-data feed hands ticks to a pricing thread or
//! an RPC client waits on a single in-flight request.
//!
//! ```text
//! ┌──────────┐   rendezvous   ┌──────────┐
//! │ Producer │ ─────────────► │ Consumer │
//! └──────────┘                └──────────┘
//! ```
//!
//! Two shapes are measured:
//! - `throughput`: producer sends as fast as the consumer can keep up,
//!   `Runner::Synchronous` (inline dispatch) vs. a two-worker thread pool.
//! - `ping_pong`: strict request/response, one round trip at a time; this
//!   is latency-bound rather than throughput-bound, so the inline runner
//!   should win (no thread-pool hop on the hot path).

use std::thread;

use cadence::rendezvous::channel;
use cadence::runner::Runner;
use criterion::{criterion_group, criterion_main, Criterion};

const MESSAGES: usize = 10_000;
const PING_PONG_ROUNDS: usize = 2_000;

fn throughput_synchronous(c: &mut Criterion) {
    c.bench_function("rendezvous/throughput/synchronous", |b| {
        b.iter(|| {
            let (tx, rx) = channel::<usize>(Runner::Synchronous);
            let producer = thread::spawn(move || {
                for i in 0..MESSAGES {
                    tx.send_blocking(i).unwrap();
                }
            });
            for _ in 0..MESSAGES {
                rx.recv_blocking().unwrap();
            }
            producer.join().unwrap();
        });
    });
}

fn throughput_thread_pool(c: &mut Criterion) {
    c.bench_function("rendezvous/throughput/thread_pool", |b| {
        b.iter(|| {
            let (tx, rx) = channel::<usize>(Runner::thread_pool(2));
            let producer = thread::spawn(move || {
                for i in 0..MESSAGES {
                    tx.send_blocking(i).unwrap();
                }
            });
            for _ in 0..MESSAGES {
                rx.recv_blocking().unwrap();
            }
            producer.join().unwrap();
        });
    });
}

fn ping_pong(c: &mut Criterion) {
    c.bench_function("rendezvous/ping_pong/synchronous", |b| {
        b.iter(|| {
            let (tx_req, rx_req) = channel::<usize>(Runner::Synchronous);
            let (tx_resp, rx_resp) = channel::<usize>(Runner::Synchronous);
            let responder = thread::spawn(move || {
                for _ in 0..PING_PONG_ROUNDS {
                    let v = rx_req.recv_blocking().unwrap();
                    tx_resp.send_blocking(v + 1).unwrap();
                }
            });
            for i in 0..PING_PONG_ROUNDS {
                tx_req.send_blocking(i).unwrap();
                rx_resp.recv_blocking().unwrap();
            }
            responder.join().unwrap();
        });
    });
}

criterion_group!(benches, throughput_synchronous, throughput_thread_pool, ping_pong);
criterion_main!(benches);
