//! The sending half of a rendezvous channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::Thread;

use crate::error::ChannelError;
use crate::rendezvous::core::Core;

/// The sending half of a channel created by [`crate::rendezvous::channel`].
///
/// Cloning a [`Sender`] does not change the channel's single-slot nature:
/// at most one sender may be parked in `send` or `register_sender` at a
/// time, and a second one observes [`ChannelError::AlreadySending`].
pub struct Sender<T> {
    core: Arc<Core<T>>,
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        self.core.add_sender();
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T: Send + 'static> Sender<T> {
    pub(crate) fn new(core: Arc<Core<T>>) -> Self {
        Self { core }
    }

    /// Announce intent to send without a value yet, unblocking a receiver
    /// that is already parked in `receive` so it knows a sender exists.
    ///
    /// Blocks the calling thread until a receiver arrives or the channel is
    /// closed.
    pub fn register_sender_blocking(&self) -> Result<(), ChannelError> {
        block_on_callback(|done| self.core.register_sender(done))
    }

    /// Hand `value` to a receiver, blocking until one arrives or the
    /// channel is closed.
    pub fn send_blocking(&self, value: T) -> Result<(), ChannelError> {
        block_on_callback(|done| self.core.send(value, done))
    }

    /// `true` once every [`crate::rendezvous::Receiver`] clone has been
    /// dropped.
    pub fn is_closed(&self) -> bool {
        self.core.receiver_gone()
    }
}

#[cfg(feature = "async")]
impl<T: Send + 'static> Sender<T> {
    /// Async counterpart of [`Sender::register_sender_blocking`].
    pub fn register_sender(&self) -> impl std::future::Future<Output = Result<(), ChannelError>> {
        let core = Arc::clone(&self.core);
        crate::task::OneShot::awaiting(move |done| core.register_sender(done))
    }

    /// Async counterpart of [`Sender::send_blocking`].
    pub fn send(&self, value: T) -> impl std::future::Future<Output = Result<(), ChannelError>> {
        let core = Arc::clone(&self.core);
        crate::task::OneShot::awaiting(move |done| core.send(value, done))
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        self.core.drop_sender();
    }
}

/// Park the calling thread until `register` invokes its completion
/// callback, then return the result it was called with.
///
/// This is the blocking-API analog of [`crate::task::OneShot::awaiting`]:
/// instead of registering a waker, it parks on [`std::thread::park`] and
/// wakes via [`Thread::unpark`], the same "register a completion closure,
/// park, unpark on completion" shape as a blocking channel `recv`.
pub(crate) fn block_on_callback<R: Send + 'static>(
    register: impl FnOnce(Box<dyn FnOnce(R) + Send>),
) -> R {
    let slot: Arc<std::sync::Mutex<Option<R>>> = Arc::new(std::sync::Mutex::new(None));
    let done = Arc::new(AtomicBool::new(false));
    let thread: Thread = std::thread::current();

    let slot2 = Arc::clone(&slot);
    let done2 = Arc::clone(&done);
    register(Box::new(move |result| {
        *slot2.lock().unwrap() = Some(result);
        done2.store(true, Ordering::Release);
        thread.unpark();
    }));

    while !done.load(Ordering::Acquire) {
        std::thread::park();
    }
    slot.lock().unwrap().take().expect("completion callback sets the slot before unparking")
}

pub(crate) use block_on_callback as block_on;
