//! Racing `receive` against several channels, running exactly one handler.
//!
//! ```ignore
//! let winner = Select::new()
//!     .on(&rx1, |v| format!("first: {v}"))
//!     .on(&rx2, |v| format!("second: {v}"))
//!     .run()
//!     .await;
//! ```
//!
//! Every registered receiver is polled concurrently; the first to produce a
//! value wins, its handler runs with that value, and the rest are left
//! parked (they remain valid to `receive` from again later; `select`
//! takes no ownership of the channels it races). A [`SubscriptionToken`]
//! shared by all branches guarantees exactly one handler ever runs, even
//! if two channels become ready back-to-back before the loser's future is
//! dropped.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::error::SelectError;
use crate::rendezvous::Receiver;
use crate::token::SubscriptionToken;

type BranchFuture<'a, R> = Pin<Box<dyn Future<Output = Option<R>> + Send + 'a>>;

/// Accumulates `(channel, handler)` branches before [`Select::run`] races
/// them.
pub struct Select<'a, R> {
    branches: Vec<BranchFuture<'a, R>>,
    channel_identities: Vec<usize>,
    duplicate: Option<SelectError>,
}

impl<'a, R: Send + 'a> Default for Select<'a, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, R: Send + 'a> Select<'a, R> {
    pub fn new() -> Self {
        Self {
            branches: Vec::new(),
            channel_identities: Vec::new(),
            duplicate: None,
        }
    }

    /// Register a channel and the handler to run with its value if it wins
    /// the race. Registering the same [`Receiver`] (by underlying identity,
    /// not by value) twice poisons this `Select` with
    /// [`SelectError::DuplicateChannel`], surfaced when [`run`](Self::run)
    /// is awaited.
    pub fn on<T, F>(mut self, rx: &'a Receiver<T>, handler: F) -> Self
    where
        T: Send + 'static,
        F: FnOnce(T) -> R + Send + 'a,
    {
        let identity = std::sync::Arc::as_ptr(rx.core()) as *const () as usize;
        if self.channel_identities.contains(&identity) {
            self.duplicate = Some(SelectError::DuplicateChannel);
        }
        self.channel_identities.push(identity);

        let branch: BranchFuture<'a, R> = Box::pin(async move {
            match rx.receive().await {
                Ok(value) => Some(handler(value)),
                Err(_) => None,
            }
        });
        self.branches.push(branch);
        self
    }

    /// Race all registered branches, returning the winning handler's
    /// result. Resolves to [`SelectError::AllChannelsDisconnected`] if
    /// every branch observes its channel disconnected before any value
    /// arrives.
    pub fn run(self) -> impl Future<Output = Result<R, SelectError>> + 'a
    where
        R: 'a,
    {
        RaceFuture {
            branches: self.branches.into_iter().map(Some).collect(),
            duplicate: self.duplicate,
            token: SubscriptionToken::new(),
        }
    }

    /// Block the calling thread until a branch wins.
    pub fn block(self) -> Result<R, SelectError>
    where
        R: 'a,
    {
        crate::task::run_async(self.run())
    }
}

struct RaceFuture<'a, R> {
    branches: Vec<Option<BranchFuture<'a, R>>>,
    duplicate: Option<SelectError>,
    token: SubscriptionToken,
}

impl<'a, R> Future for RaceFuture<'a, R> {
    type Output = Result<R, SelectError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Some(err) = this.duplicate.take() {
            return Poll::Ready(Err(err));
        }

        let mut still_pending = false;
        for slot in this.branches.iter_mut() {
            let Some(branch) = slot else { continue };
            match branch.as_mut().poll(cx) {
                Poll::Ready(Some(value)) => {
                    *slot = None;
                    if this.token.release() {
                        tracing::trace!(target: "cadence::select", "branch won");
                        return Poll::Ready(Ok(value));
                    }
                }
                Poll::Ready(None) => *slot = None,
                Poll::Pending => still_pending = true,
            }
        }
        if still_pending {
            Poll::Pending
        } else {
            Poll::Ready(Err(SelectError::AllChannelsDisconnected))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendezvous::channel;
    use crate::runner::Runner;

    #[test]
    fn fires_the_handler_of_whichever_channel_is_ready() {
        let (tx1, rx1) = channel::<u32>(Runner::Synchronous);
        let (_tx2, rx2) = channel::<u32>(Runner::Synchronous);
        // A rendezvous send only completes once a receiver is waiting, so it
        // must run concurrently with the select below, not before it.
        let sender = std::thread::spawn(move || tx1.send_blocking(5).unwrap());

        let result = Select::new()
            .on(&rx1, |v| format!("one:{v}"))
            .on(&rx2, |v| format!("two:{v}"))
            .block()
            .unwrap();
        assert_eq!(result, "one:5");
        sender.join().unwrap();
    }

    #[test]
    fn duplicate_channel_is_rejected() {
        let (_tx, rx) = channel::<u32>(Runner::Synchronous);
        let result: Result<(), SelectError> = Select::new()
            .on(&rx, |_| ())
            .on(&rx, |_| ())
            .block();
        assert!(matches!(result, Err(SelectError::DuplicateChannel)));
    }

    #[test]
    fn all_disconnected_is_reported() {
        let (tx, rx) = channel::<u32>(Runner::Synchronous);
        drop(tx);
        let result: Result<(), SelectError> = Select::new().on(&rx, |_| ()).block();
        assert!(matches!(result, Err(SelectError::AllChannelsDisconnected)));
    }
}
