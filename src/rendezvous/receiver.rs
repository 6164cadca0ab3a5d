//! The receiving half of a rendezvous channel.

use std::future::Future;
use std::sync::Arc;

use crate::error::ChannelError;
use crate::rendezvous::core::Core;
use crate::rendezvous::sender::block_on;

/// The receiving half of a channel created by [`crate::rendezvous::channel`].
///
/// At most one receiver may be parked in `receive` at a time, regardless of
/// how many clones exist; a second one observes
/// [`ChannelError::AlreadyReceiving`].
pub struct Receiver<T> {
    core: Arc<Core<T>>,
}

impl<T> Clone for Receiver<T> {
    fn clone(&self) -> Self {
        self.core.add_receiver();
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T: Send + 'static> Receiver<T> {
    pub(crate) fn new(core: Arc<Core<T>>) -> Self {
        Self { core }
    }

    pub(crate) fn core(&self) -> &Arc<Core<T>> {
        &self.core
    }

    /// Block the calling thread until a value arrives or the channel is
    /// closed.
    pub fn recv_blocking(&self) -> Result<T, ChannelError> {
        block_on(|done| self.core.receive(done))
    }

    /// `true` once every [`crate::rendezvous::Sender`] clone has been
    /// dropped.
    pub fn is_closed(&self) -> bool {
        self.core.sender_gone()
    }
}

#[cfg(feature = "async")]
impl<T: Send + 'static> Receiver<T> {
    /// Async counterpart of [`Receiver::recv_blocking`], and the primitive
    /// [`crate::select::Select`] polls when racing multiple channels.
    ///
    /// Dropping the returned future before it resolves (e.g. because a
    /// `select` raced it against another channel that won) withdraws its
    /// `receive` registration from the `Core`, rather than leaving a parked
    /// waiter that would otherwise swallow the channel's next value and
    /// make every later `receive` on it observe `AlreadyReceiving` forever.
    pub fn receive(&self) -> ReceiveFuture<T> {
        ReceiveFuture {
            core: Arc::clone(&self.core),
            inner: None,
        }
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        self.core.drop_receiver();
    }
}

/// Future returned by [`Receiver::receive`].
///
/// The inner [`crate::task::OneShotFuture`] registers with the `Core` only
/// once this future is first polled (it is constructed lazily, inside
/// `poll`, not at `receive()`-call time), since `OneShot::awaiting` parks
/// eagerly as soon as it is built. Its `Drop` cancels that registration if
/// it is still outstanding.
#[cfg(feature = "async")]
pub struct ReceiveFuture<T: Send + 'static> {
    core: Arc<Core<T>>,
    inner: Option<crate::task::OneShotFuture<Result<T, ChannelError>>>,
}

#[cfg(feature = "async")]
impl<T: Send + 'static> std::future::Future for ReceiveFuture<T> {
    type Output = Result<T, ChannelError>;

    fn poll(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Self::Output> {
        let this = self.get_mut();
        let core = Arc::clone(&this.core);
        let fut = this
            .inner
            .get_or_insert_with(|| crate::task::OneShot::awaiting(move |done| core.receive(done)));
        match std::pin::Pin::new(fut).poll(cx) {
            std::task::Poll::Ready(value) => {
                this.inner = None;
                std::task::Poll::Ready(value)
            }
            std::task::Poll::Pending => std::task::Poll::Pending,
        }
    }
}

#[cfg(feature = "async")]
impl<T: Send + 'static> Drop for ReceiveFuture<T> {
    fn drop(&mut self) {
        if self.inner.is_some() {
            self.core.cancel_receive();
        }
    }
}
