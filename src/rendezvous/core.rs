//! The four-variant state cell behind [`super::Sender`] and [`super::Receiver`].
//!
//! # Synchronization
//!
//! The cell's discriminant lives in a single [`AtomicU8`] tag. Every
//! operation first wins a short-lived `LOCKED` CAS on that tag; the only
//! spinning this module ever does, and it is held for nothing more than a
//! handful of `Option::take`/`Option::replace` calls on the three payload
//! cells below, never across a user callback. This generalizes a
//! sequence-stamp protocol for gating a ring buffer's fixed slots down to
//! a single rendezvous slot: there is no dynamic allocation of state
//! nodes, so there is no reclamation hazard to reason about, only the tag
//! transition itself.
//!
//! | Operation | Memory ordering | Purpose |
//! |-----------|------------------|---------|
//! | Acquire the lock | `Acquire` CAS | see the previous owner's payload writes |
//! | Release the lock  | `Release` store | publish our payload writes |
//!
//! Callbacks are always dispatched through [`Runner::run`] *after* the tag
//! has been released; the lock is never held across user code.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

use crate::error::ChannelError;
use crate::runner::Runner;

pub(crate) type SendWaiter = Box<dyn FnOnce(Result<(), ChannelError>) + Send>;
pub(crate) type RecvWaiter<T> = Box<dyn FnOnce(Result<T, ChannelError>) + Send>;

const EMPTY: u8 = 0;
const SENDER_REGISTERED: u8 = 1;
const SENDER_WAITING: u8 = 2;
const RECEIVER_WAITING: u8 = 3;
const LOCKED: u8 = 4;

pub(crate) struct Core<T> {
    tag: CachePadded<AtomicU8>,
    // Tracked separately rather than as a single shared `Arc<Core<T>>`
    // refcount: `Sender` and `Receiver` hold the same `Arc`, so the count
    // only ever hits 1 when the very last handle of *either* side drops,
    // by which point the other side is already long gone. A `Sender`
    // needs to know when every `Receiver` clone is gone, and vice versa,
    // which requires the two sides counted independently.
    sender_count: CachePadded<AtomicUsize>,
    receiver_count: CachePadded<AtomicUsize>,
    // SAFETY: these three cells are only ever read or written by the thread
    // that holds the `LOCKED` tag. Acquiring the lock (winning the CAS to
    // `LOCKED`) happens-before any access; releasing it (storing the new
    // tag with `Release`) happens-after every access, and happens-before
    // the next thread's `Acquire` CAS observes the new tag. No two threads
    // ever hold the lock at once, by construction of the CAS.
    value: UnsafeCell<Option<T>>,
    send_waiter: UnsafeCell<Option<SendWaiter>>,
    recv_waiter: UnsafeCell<Option<RecvWaiter<T>>>,
    pub(crate) runner: Runner,
}

unsafe impl<T: Send> Send for Core<T> {}
unsafe impl<T: Send> Sync for Core<T> {}

/// What happened as a result of a transition, to be dispatched via the
/// runner *after* the lock has been released.
enum Effect<T> {
    /// The caller parked; nothing to run.
    Parked,
    /// Run the caller's own handler with this outcome.
    Caller(CallerWaiter<T>, Result<(), ChannelError>),
    /// A full rendezvous: run the receiver's callback with the value, then
    /// the sender's completion callback. Order matters, and both must run
    /// as one job so an `Executor` runner cannot reorder them relative to
    /// each other.
    Rendezvous(RecvWaiter<T>, T, SendWaiter),
}

enum CallerWaiter<T> {
    Send(SendWaiter),
    Recv(RecvWaiter<T>),
}

impl<T: Send + 'static> Core<T> {
    pub(crate) fn new(runner: Runner) -> Self {
        Self {
            tag: CachePadded::new(AtomicU8::new(EMPTY)),
            sender_count: CachePadded::new(AtomicUsize::new(1)),
            receiver_count: CachePadded::new(AtomicUsize::new(1)),
            value: UnsafeCell::new(None),
            send_waiter: UnsafeCell::new(None),
            recv_waiter: UnsafeCell::new(None),
            runner,
        }
    }

    /// Spin until we own the transient `LOCKED` tag, returning the tag that
    /// was there before we locked it.
    fn lock(&self) -> u8 {
        loop {
            let current = self.tag.load(Ordering::Acquire);
            if current == LOCKED {
                std::hint::spin_loop();
                continue;
            }
            if self
                .tag
                .compare_exchange_weak(current, LOCKED, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return current;
            }
        }
    }

    fn unlock(&self, new_tag: u8) {
        self.tag.store(new_tag, Ordering::Release);
    }

    fn dispatch(&self, effect: Effect<T>) {
        match effect {
            Effect::Parked => {}
            Effect::Caller(CallerWaiter::Send(h), result) => self.runner.run(move || h(result)),
            Effect::Caller(CallerWaiter::Recv(r), result) => {
                self.runner.run(move || r(result.map(|_| unreachable!())))
            }
            Effect::Rendezvous(r, value, h) => self.runner.run(move || {
                r(Ok(value));
                h(Ok(()));
            }),
        }
    }

    pub(crate) fn register_sender(&self, on_complete: SendWaiter) {
        if self.receiver_gone() {
            self.runner.run(move || on_complete(Err(ChannelError::Disconnected)));
            return;
        }
        let prev = self.lock();
        tracing::trace!(target: "cadence::rendezvous", from = prev, "register_sender");
        let (new_tag, effect) = match prev {
            EMPTY => {
                unsafe { *self.send_waiter.get() = Some(on_complete) };
                (SENDER_REGISTERED, Effect::Parked)
            }
            SENDER_REGISTERED | SENDER_WAITING => (
                prev,
                Effect::Caller(CallerWaiter::Send(on_complete), Err(ChannelError::AlreadySending)),
            ),
            RECEIVER_WAITING => (
                prev,
                Effect::Caller(CallerWaiter::Send(on_complete), Ok(())),
            ),
            _ => unreachable!("invalid tag observed under lock"),
        };
        self.unlock(new_tag);
        self.dispatch(effect);
    }

    pub(crate) fn send(&self, value: T, on_complete: SendWaiter) {
        if self.receiver_gone() {
            self.runner.run(move || on_complete(Err(ChannelError::Disconnected)));
            return;
        }
        let prev = self.lock();
        tracing::trace!(target: "cadence::rendezvous", from = prev, "send");
        let (new_tag, effect) = match prev {
            EMPTY | SENDER_REGISTERED => {
                unsafe {
                    *self.send_waiter.get() = None;
                    *self.value.get() = Some(value);
                    *self.send_waiter.get() = Some(on_complete);
                }
                (SENDER_WAITING, Effect::Parked)
            }
            SENDER_WAITING => (
                prev,
                Effect::Caller(CallerWaiter::Send(on_complete), Err(ChannelError::AlreadySending)),
            ),
            RECEIVER_WAITING => {
                let r = unsafe { (*self.recv_waiter.get()).take() }
                    .expect("ReceiverWaiting tag implies a parked receiver");
                (EMPTY, Effect::Rendezvous(r, value, on_complete))
            }
            _ => unreachable!("invalid tag observed under lock"),
        };
        self.unlock(new_tag);
        self.dispatch(effect);
    }

    pub(crate) fn receive(&self, on_value: RecvWaiter<T>) {
        if self.sender_gone() {
            self.runner.run(move || on_value(Err(ChannelError::Disconnected)));
            return;
        }
        let prev = self.lock();
        tracing::trace!(target: "cadence::rendezvous", from = prev, "receive");
        let (new_tag, effect) = match prev {
            EMPTY => {
                unsafe { *self.recv_waiter.get() = Some(on_value) };
                (RECEIVER_WAITING, Effect::Parked)
            }
            SENDER_REGISTERED => {
                let h = unsafe { (*self.send_waiter.get()).take() }
                    .expect("SenderRegistered tag implies a parked sender");
                unsafe { *self.recv_waiter.get() = Some(on_value) };
                (RECEIVER_WAITING, Effect::Caller(CallerWaiter::Send(h), Ok(())))
            }
            RECEIVER_WAITING => (
                prev,
                Effect::Caller(CallerWaiter::Recv(on_value), Err(ChannelError::AlreadyReceiving)),
            ),
            SENDER_WAITING => {
                let value = unsafe { (*self.value.get()).take() }
                    .expect("SenderWaiting tag implies a parked value");
                let h = unsafe { (*self.send_waiter.get()).take() }
                    .expect("SenderWaiting tag implies a parked sender");
                (EMPTY, Effect::Rendezvous(on_value, value, h))
            }
            _ => unreachable!("invalid tag observed under lock"),
        };
        self.unlock(new_tag);
        self.dispatch(effect);
    }

    /// Withdraw a still-parked `receive()` registration, e.g. because the
    /// future that registered it is being dropped without ever observing a
    /// value. A no-op if the channel has since moved on (a rendezvous
    /// already completed, or closed), since in either case there is nothing
    /// left to withdraw; at most one receiver may ever be parked at a time,
    /// so if we are still `ReceiverWaiting` the parked waiter is ours.
    pub(crate) fn cancel_receive(&self) {
        let prev = self.lock();
        let new_tag = if prev == RECEIVER_WAITING {
            unsafe { *self.recv_waiter.get() = None };
            EMPTY
        } else {
            prev
        };
        self.unlock(new_tag);
    }
}

/// Handle-count bookkeeping, kept on the unconstrained `impl<T>` (rather
/// than the `T: Send + 'static` block above) so `Sender`/`Receiver`'s
/// `Clone`/`Drop` impls, which carry no bound of their own, can call these
/// without requiring one.
///
/// A party already parked when the other side's last handle drops is not
/// woken immediately; it observes `Disconnected` the next time it is
/// re-driven (another `poll`, or a fresh operation), since `register_sender`
/// / `send` / `receive` all re-check the relevant `_gone()` flag before
/// parking. A parked sender's value, if any, is simply dropped: a
/// deliberate choice, not an oversight.
impl<T> Core<T> {
    pub(crate) fn sender_gone(&self) -> bool {
        self.sender_count.load(Ordering::Acquire) == 0
    }

    pub(crate) fn receiver_gone(&self) -> bool {
        self.receiver_count.load(Ordering::Acquire) == 0
    }

    pub(crate) fn add_sender(&self) {
        self.sender_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_receiver(&self) {
        self.receiver_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn drop_sender(&self) {
        self.sender_count.fetch_sub(1, Ordering::Release);
    }

    pub(crate) fn drop_receiver(&self) {
        self.receiver_count.fetch_sub(1, Ordering::Release);
    }
}
