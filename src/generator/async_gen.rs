//! Async counterpart of [`super::sync::SyncGenerator`], implementing
//! [`futures::Stream`] instead of [`Iterator`].
//!
//! The key difference from the synchronous generator: `poll_next` is
//! handed the *real* waker supplied by whatever executor is driving the
//! stream, and passes it straight through to the body's own poll. A body
//! that does `some_future.await` alongside `yielder.yield_(v).await`
//! therefore gets genuine suspend-and-resume for free; no null-waker
//! trick, no extra bookkeeping, because Rust's own `async` state machine
//! already multiplexes every awaited sub-future onto the one `Context` it
//! was polled with.
//!
//! The body's inner future lives behind a [`RefCell`] rather than a bare
//! `Pin<Box<Fut>>`: this is what lets [`poll_once`](AsyncGenerator::poll_once)
//! take `&self` instead of `&mut self`, so a caller holding a shared handle
//! to the same generator (e.g. an `Rc`) can be polled reentrantly without
//! `unsafe`; and have that reentrancy cleanly reported as
//! [`GeneratorError::Reentrant`] instead of panicking or racing.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use futures::Stream;

use crate::error::GeneratorError;

type Shared<T> = Arc<Mutex<Option<T>>>;

/// Passed into an [`async_generate`] body.
pub struct AsyncYielder<T>(Shared<T>);

impl<T> Clone for AsyncYielder<T> {
    fn clone(&self) -> Self {
        AsyncYielder(Arc::clone(&self.0))
    }
}

impl<T> AsyncYielder<T> {
    /// Suspend the body, handing `item` to whoever polled the stream.
    pub fn yield_(&self, item: T) -> YieldFuture<'_, T> {
        YieldFuture {
            shared: &self.0,
            value: Some(item),
        }
    }

    /// Delegate to another stream, yielding each of its items in turn.
    pub async fn yield_all<S>(&self, mut items: S)
    where
        S: Stream<Item = T> + Unpin,
    {
        use futures::StreamExt;
        while let Some(item) = items.next().await {
            self.yield_(item).await;
        }
    }
}

#[doc(hidden)]
pub struct YieldFuture<'a, T> {
    shared: &'a Mutex<Option<T>>,
    value: Option<T>,
}

impl<'a, T> Unpin for YieldFuture<'a, T> {}

impl<'a, T> Future for YieldFuture<'a, T> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        let mut slot = this.shared.lock().unwrap();
        if let Some(item) = this.value.take() {
            *slot = Some(item);
            Poll::Pending
        } else {
            Poll::Ready(())
        }
    }
}

/// A generator starts
/// `Initial`, is `Running` for the duration of one `poll_once` call,
/// `HasValue` immediately after a `yield_`, `Stopped` once the body
/// finishes, and `Exception` once it fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncState {
    Initial,
    Running,
    HasValue,
    Stopped,
    Exception,
}

/// Dyn-compatible handle to [`AsyncGenerator::poll_once`], used so a
/// generator body can hold a type-erased reference to the very generator
/// it is running inside of (see the reentrancy test in this module).
pub trait PollOnce<T> {
    fn poll_once(&self, cx: &mut Context<'_>) -> Poll<Option<Result<T, GeneratorError>>>;
}

/// A single run of an asynchronous generator body, implementing
/// [`futures::Stream`].
pub struct AsyncGenerator<T, Fut> {
    shared: Shared<T>,
    future: RefCell<Pin<Box<Fut>>>,
    state: Cell<AsyncState>,
}

impl<T, Fut, E> AsyncGenerator<T, Fut>
where
    Fut: Future<Output = Result<(), E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    fn new(shared: Shared<T>, future: Pin<Box<Fut>>) -> Self {
        Self {
            shared,
            future: RefCell::new(future),
            state: Cell::new(AsyncState::Initial),
        }
    }

    /// The generator's current state, for diagnostics.
    pub fn state(&self) -> AsyncState {
        self.state.get()
    }

    /// Poll the body once, advancing it to its next yielded value,
    /// completion, or failure. Takes `&self`: if another `poll_once` (or
    /// `poll_next`) call on this same generator is already in progress,
    /// necessarily on the same thread, reached through shared ownership of
    /// this generator from inside its own body, this call observes the
    /// already-borrowed inner future and reports
    /// [`GeneratorError::Reentrant`] rather than panicking.
    pub fn poll_once(&self, cx: &mut Context<'_>) -> Poll<Option<Result<T, GeneratorError>>> {
        match self.state.get() {
            AsyncState::Stopped | AsyncState::Exception => return Poll::Ready(None),
            AsyncState::Initial | AsyncState::HasValue | AsyncState::Running => {}
        }

        let mut future_ref = match self.future.try_borrow_mut() {
            Ok(r) => r,
            Err(_) => return Poll::Ready(Some(Err(GeneratorError::Reentrant))),
        };
        self.state.set(AsyncState::Running);

        let poll_result =
            std::panic::catch_unwind(AssertUnwindSafe(|| future_ref.as_mut().poll(cx)));
        drop(future_ref);

        match poll_result {
            Ok(Poll::Pending) => {
                if let Some(item) = self.shared.lock().unwrap().take() {
                    self.state.set(AsyncState::HasValue);
                    Poll::Ready(Some(Ok(item)))
                } else {
                    // still `Running` until the wrapped future wakes us;
                    // resetting to `HasValue` here would let a second,
                    // concurrent poll through as if nothing were in flight.
                    Poll::Pending
                }
            }
            Ok(Poll::Ready(Ok(()))) => {
                self.state.set(AsyncState::Stopped);
                Poll::Ready(None)
            }
            Ok(Poll::Ready(Err(e))) => {
                self.state.set(AsyncState::Exception);
                Poll::Ready(Some(Err(GeneratorError::from_body_err(Box::new(e)))))
            }
            Err(payload) => {
                self.state.set(AsyncState::Exception);
                Poll::Ready(Some(Err(GeneratorError::from_panic(payload))))
            }
        }
    }
}

impl<T, Fut, E> PollOnce<T> for AsyncGenerator<T, Fut>
where
    Fut: Future<Output = Result<(), E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    fn poll_once(&self, cx: &mut Context<'_>) -> Poll<Option<Result<T, GeneratorError>>> {
        AsyncGenerator::poll_once(self, cx)
    }
}

impl<T, Fut, E> Stream for AsyncGenerator<T, Fut>
where
    Fut: Future<Output = Result<(), E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    type Item = Result<T, GeneratorError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_once(cx)
    }
}

/// A factory over an async generator body, mirroring
/// [`super::sync::Sequence`]. `.stream()` starts a fresh run each time.
pub struct AsyncSequence<T, F> {
    body: F,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T, F, Fut, E> AsyncSequence<T, F>
where
    F: Fn(AsyncYielder<T>) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    pub(crate) fn new(body: F) -> Self {
        Self {
            body,
            _marker: std::marker::PhantomData,
        }
    }

    /// Start a fresh run of the body, returning a stream over its yielded
    /// items.
    pub fn stream(&self) -> AsyncGenerator<T, Fut> {
        let shared: Shared<T> = Arc::new(Mutex::new(None));
        let future = Box::pin((self.body)(AsyncYielder(Arc::clone(&shared))));
        AsyncGenerator::new(shared, future)
    }
}

/// Build an asynchronous generator from a body that calls
/// [`AsyncYielder::yield_`], and may freely `.await` other futures.
pub fn async_generate<T, F, Fut, E>(body: F) -> AsyncSequence<T, F>
where
    F: Fn(AsyncYielder<T>) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    AsyncSequence::new(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::cell::RefCell as StdRefCell;
    use std::rc::Rc;

    fn ok() -> Result<(), std::io::Error> {
        Ok(())
    }

    #[test]
    fn yields_values_in_order() {
        let seq = async_generate(|y| async move {
            y.yield_(1).await;
            y.yield_(2).await;
            ok()
        });
        let items: Vec<_> = crate::task::run_async(seq.stream().collect::<Vec<_>>());
        assert_eq!(
            items.into_iter().collect::<Result<Vec<_>, _>>().unwrap(),
            vec![1, 2]
        );
    }

    struct YieldNow(bool);
    impl Future for YieldNow {
        type Output = ();
        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
            if self.0 {
                Poll::Ready(())
            } else {
                self.0 = true;
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        }
    }

    #[test]
    fn awaits_an_ordinary_future_between_yields() {
        let seq = async_generate(|y| async move {
            y.yield_(1).await;
            YieldNow(false).await;
            y.yield_(2).await;
            ok()
        });
        let items: Vec<_> = crate::task::run_async(seq.stream().collect::<Vec<_>>());
        assert_eq!(
            items.into_iter().collect::<Result<Vec<_>, _>>().unwrap(),
            vec![1, 2]
        );
    }

    #[test]
    fn propagates_a_body_error() {
        let seq = async_generate(|y: AsyncYielder<i32>| async move {
            y.yield_(1).await;
            Err(std::io::Error::new(std::io::ErrorKind::Other, "boom"))
        });
        let items: Vec<_> = crate::task::run_async(seq.stream().collect::<Vec<_>>());
        assert!(items[0].as_ref().unwrap() == &1);
        assert!(matches!(items[1], Err(GeneratorError::Coroutine(_))));
    }

    /// S6: calling the generator's own `poll_once` synchronously from
    /// inside its body; reached here through a shared handle the body
    /// holds to itself, the realistic way this happens in safe Rust
    /// (compare to a waker that synchronously re-enters the task it
    /// belongs to); reports `Reentrant` rather than panicking or
    /// deadlocking.
    #[test]
    fn reentrant_poll_is_reported_not_panicked() {
        let handle: Rc<StdRefCell<Option<Rc<dyn PollOnce<i32>>>>> =
            Rc::new(StdRefCell::new(None));
        let handle_for_body = Rc::clone(&handle);

        let seq = async_generate(move |y: AsyncYielder<i32>| {
            let handle = Rc::clone(&handle_for_body);
            async move {
                y.yield_(1).await;

                let waker = futures::task::noop_waker();
                let mut cx = Context::from_waker(&waker);
                let reentrant = handle
                    .borrow()
                    .as_ref()
                    .expect("handle installed before driving the stream")
                    .poll_once(&mut cx);
                match reentrant {
                    Poll::Ready(Some(Err(GeneratorError::Reentrant))) => {}
                    other => panic!("expected a Reentrant error, got {other:?}"),
                }

                y.yield_(2).await;
                ok()
            }
        });

        let generator: Rc<AsyncGenerator<i32, _>> = Rc::new(seq.stream());
        *handle.borrow_mut() = Some(Rc::clone(&generator) as Rc<dyn PollOnce<i32>>);

        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut items = Vec::new();
        loop {
            match generator.poll_once(&mut cx) {
                Poll::Ready(Some(Ok(v))) => items.push(v),
                Poll::Ready(Some(Err(e))) => panic!("unexpected error: {e}"),
                Poll::Ready(None) => break,
                Poll::Pending => continue,
            }
        }
        assert_eq!(items, vec![1, 2]);
    }
}
