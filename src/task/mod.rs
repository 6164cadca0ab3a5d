//! The future-controller primitive and async task spawning.
//!
//! [`OneShot`] is the single cell every asynchronous completion in this
//! crate is built from: a channel's `send`/`receive`, a generator's
//! `hasNext`, and [`ValueFuture`] all reduce to "register a completion
//! closure now, resolve a `Future` exactly once later", the standard
//! `Mutex<Option<T>>` plus `AtomicWaker` shape for a single-assignment
//! future cell.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use futures::task::AtomicWaker;

struct Inner<T> {
    value: Mutex<Option<T>>,
    waker: AtomicWaker,
}

/// A single-assignment future cell.
pub(crate) struct OneShot<T> {
    inner: Arc<Inner<T>>,
}

impl<T: Send + 'static> OneShot<T> {
    /// Call `register` with a completion closure, and return a future that
    /// resolves to whatever value that closure is eventually called with.
    ///
    /// `register` runs synchronously, before this function returns; it is
    /// where the caller kicks off whatever work will complete the cell
    /// (e.g. [`crate::rendezvous::core::Core::send`]).
    pub(crate) fn awaiting(
        register: impl FnOnce(Box<dyn FnOnce(T) + Send>),
    ) -> OneShotFuture<T> {
        let inner = Arc::new(Inner {
            value: Mutex::new(None),
            waker: AtomicWaker::new(),
        });
        let complete = {
            let inner = Arc::clone(&inner);
            move |result: T| {
                *inner.value.lock().unwrap() = Some(result);
                inner.waker.wake();
            }
        };
        register(Box::new(complete));
        OneShotFuture { inner }
    }
}

/// The future returned by [`OneShot::awaiting`].
pub(crate) struct OneShotFuture<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Future for OneShotFuture<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        if let Some(value) = self.inner.value.lock().unwrap().take() {
            return Poll::Ready(value);
        }
        self.inner.waker.register(cx.waker());
        // Re-check: the completion closure may have run between our first
        // check and registering the waker.
        if let Some(value) = self.inner.value.lock().unwrap().take() {
            return Poll::Ready(value);
        }
        Poll::Pending
    }
}

/// An externally-resolvable future: create one half with
/// [`ValueFuture::new`], keep the [`ValueFuture`] itself to await, and
/// call the paired resolver closure from wherever the result becomes
/// available; a callback, another thread, a generator's producer loop.
pub struct ValueFuture<T> {
    inner: Arc<Inner<T>>,
}

impl<T: Send + 'static> ValueFuture<T> {
    /// Create a pending future, paired with the closure that resolves it.
    pub fn new() -> (Self, impl FnOnce(T) + Send) {
        let inner = Arc::new(Inner {
            value: Mutex::new(None),
            waker: AtomicWaker::new(),
        });
        let resolver = {
            let inner = Arc::clone(&inner);
            move |result: T| {
                *inner.value.lock().unwrap() = Some(result);
                inner.waker.wake();
            }
        };
        (ValueFuture { inner }, resolver)
    }
}

impl<T> Future for ValueFuture<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        if let Some(value) = self.inner.value.lock().unwrap().take() {
            return Poll::Ready(value);
        }
        self.inner.waker.register(cx.waker());
        if let Some(value) = self.inner.value.lock().unwrap().take() {
            return Poll::Ready(value);
        }
        Poll::Pending
    }
}

/// Drive `future` to completion on the calling thread, blocking.
///
/// Thin wrapper over [`futures::executor::block_on`], the idiomatic
/// stand-in for a blocking `get()` on a future.
pub fn run_async<F: Future>(future: F) -> F::Output {
    futures::executor::block_on(future)
}

/// Run `future` to completion on a background thread of `runner`, without
/// blocking the caller. The returned [`ValueFuture`] resolves with its
/// output.
///
/// Uses the same `Runner`/thread-pool dispatch pattern as
/// [`crate::rendezvous`], applied to whole futures rather than single
/// callbacks.
pub fn spawn_async<F>(runner: &crate::runner::Runner, future: F) -> ValueFuture<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let (result, resolve) = ValueFuture::new();
    runner.run(move || resolve(futures::executor::block_on(future)));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::Runner;

    #[test]
    fn one_shot_resolves_after_register() {
        let fut = OneShot::awaiting(|complete| complete(7));
        assert_eq!(run_async(fut), 7);
    }

    #[test]
    fn value_future_resolves_when_resolver_is_called() {
        let (fut, resolve) = ValueFuture::<i32>::new();
        resolve(42);
        assert_eq!(run_async(fut), 42);
    }

    #[test]
    fn spawn_async_runs_on_the_runner() {
        let runner = Runner::thread_pool(1);
        let handle = spawn_async(&runner, async { 1 + 1 });
        assert_eq!(run_async(handle), 2);
    }

    #[test]
    fn run_async_drives_a_ready_future() {
        assert_eq!(run_async(async { "done" }), "done");
    }
}
