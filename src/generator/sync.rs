//! Turn an `async fn` body into a synchronous [`Iterator`].
//!
//! [`next`] polls the body with a no-op [`Wake`] impl, since nothing
//! outside this thread will ever wake it; the only thing that makes
//! progress possible is another call to `next`.

use std::cell::Cell;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Wake};

use crate::error::GeneratorError;

type Shared<T> = Arc<Mutex<Option<T>>>;

/// Passed into the body closure; the only way a body produces values.
pub struct Yielder<T>(Shared<T>);

impl<T> Clone for Yielder<T> {
    fn clone(&self) -> Self {
        Yielder(Arc::clone(&self.0))
    }
}

impl<T> Yielder<T> {
    /// Suspend the body, handing `item` to whoever called `next()`.
    /// Resumes the next time `next()` is called.
    pub fn yield_(&self, item: T) -> YieldFuture<'_, T> {
        YieldFuture {
            shared: &self.0,
            value: Some(item),
        }
    }

    /// Delegate to another iterator, yielding each of its items in turn.
    ///
    /// Ordinary `.await` composition inside one `async fn` state machine:
    /// nesting this N levels deep costs O(1) additional work per level per
    /// item, since each level is just one more `.await` point in the same
    /// poll chain, not an extra iterator adapter wrapping the one below it.
    pub async fn yield_all(&self, items: impl IntoIterator<Item = T>) {
        for item in items {
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
            debug_assert!(slot.is_none(), "generator body raced its own yielder");
            Poll::Ready(())
        }
    }
}

struct NoopWake;
impl Wake for NoopWake {
    fn wake(self: Arc<Self>) {}
}

/// A synchronous, single-use iterator driving one invocation of a
/// generator body. Produced by [`Sequence::iter`]; most callers reach for
/// [`super::generate`] and use [`Sequence`] directly.
pub struct SyncGenerator<T, Fut> {
    shared: Shared<T>,
    future: Pin<Box<Fut>>,
    running: Cell<bool>,
    done: bool,
}

impl<T, Fut, E> SyncGenerator<T, Fut>
where
    Fut: Future<Output = Result<(), E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    fn new(shared: Shared<T>, future: Pin<Box<Fut>>) -> Self {
        Self {
            shared,
            future,
            running: Cell::new(false),
            done: false,
        }
    }
}

impl<T, Fut, E> Iterator for SyncGenerator<T, Fut>
where
    Fut: Future<Output = Result<(), E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    type Item = Result<T, GeneratorError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.running.get() {
            return Some(Err(GeneratorError::Reentrant));
        }
        self.running.set(true);

        let waker = Arc::new(NoopWake).into();
        let mut cx = Context::from_waker(&waker);

        enum Step<T, E> {
            Yielded(T),
            Finished(Result<(), E>),
        }

        let poll_result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| loop {
            match self.future.as_mut().poll(&mut cx) {
                Poll::Pending => {
                    if let Some(item) = self.shared.lock().unwrap().take() {
                        return Step::Yielded(item);
                    }
                    // body awaited something other than `yield_`; keep
                    // polling since there is no external waker to rely on.
                    continue;
                }
                Poll::Ready(result) => return Step::Finished(result),
            }
        }));

        self.running.set(false);

        match poll_result {
            Ok(Step::Yielded(item)) => Some(Ok(item)),
            Ok(Step::Finished(Ok(()))) => {
                self.done = true;
                None
            }
            Ok(Step::Finished(Err(e))) => {
                self.done = true;
                Some(Err(GeneratorError::from_body_err(Box::new(e))))
            }
            Err(payload) => {
                self.done = true;
                Some(Err(GeneratorError::from_panic(payload)))
            }
        }
    }
}

/// A re-usable generator factory: each call to [`Sequence::iter`] starts a
/// fresh run of the body from the top, satisfying the re-iterability
/// requirement (a `Sequence` can be turned into a list twice).
pub struct Sequence<T, F> {
    body: F,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T, F, Fut, E> Sequence<T, F>
where
    F: Fn(Yielder<T>) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    pub(crate) fn new(body: F) -> Self {
        Self {
            body,
            _marker: std::marker::PhantomData,
        }
    }

    /// Start a fresh run of the body, returning an iterator over its
    /// yielded items.
    pub fn iter(&self) -> SyncGenerator<T, Fut> {
        let shared: Shared<T> = Arc::new(Mutex::new(None));
        let future = Box::pin((self.body)(Yielder(Arc::clone(&shared))));
        SyncGenerator::new(shared, future)
    }

    /// Run the body to completion, collecting every yielded item.
    pub fn to_list(&self) -> Result<Vec<T>, GeneratorError> {
        self.iter().collect()
    }
}

impl<'a, T, F, Fut, E> IntoIterator for &'a Sequence<T, F>
where
    F: Fn(Yielder<T>) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    type Item = Result<T, GeneratorError>;
    type IntoIter = SyncGenerator<T, Fut>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Build a synchronous generator from a body that calls
/// [`Yielder::yield_`] to produce values.
///
/// ```
/// use cadence::generator::generate;
///
/// let seq = generate(|y| async move {
///     for i in 0..3 {
///         y.yield_(i).await;
///     }
///     Ok::<(), std::convert::Infallible>(())
/// });
/// assert_eq!(seq.to_list().unwrap(), vec![0, 1, 2]);
/// assert_eq!(seq.to_list().unwrap(), vec![0, 1, 2]); // re-iterable
/// ```
pub fn generate<T, F, Fut, E>(body: F) -> Sequence<T, F>
where
    F: Fn(Yielder<T>) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    Sequence::new(body)
}
