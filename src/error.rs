//! Error taxonomy for the crate.
//!
//! The three enums below mirror the error taxonomy of the coordination
//! protocols they belong to: [`ChannelError`] for [`crate::rendezvous`],
//! [`SelectError`] for [`crate::select`], and [`GeneratorError`] for
//! [`crate::generator`] and [`crate::task`]. None of them are ever raised on
//! the runner thread; they are always handed to the caller's own
//! callback or future.

use std::error::Error as StdError;
use std::fmt;

/// Failure modes of a [`crate::rendezvous`] channel operation.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// A second sender tried to register or send while one was already parked.
    #[error("another sender is already waiting on this channel")]
    AlreadySending,
    /// A second receiver tried to receive while one was already parked.
    #[error("another receiver is already waiting on this channel")]
    AlreadyReceiving,
    /// The other half of the channel has been dropped.
    #[error("the other half of the channel has been dropped")]
    Disconnected,
}

/// Failure modes of a [`crate::select`] invocation.
#[derive(Debug, thiserror::Error)]
pub enum SelectError {
    /// The same channel was registered with `on` more than once.
    #[error("two handlers registered for the same channel")]
    DuplicateChannel,
    /// Every registered channel reported [`ChannelError::Disconnected`].
    #[error("all channels registered with select are disconnected")]
    AllChannelsDisconnected,
}

/// Failure modes surfaced by generators and future-wrapped coroutine bodies.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// A public entry point was re-entered while already `Running`.
    #[error("illegal reentrancy: generator was re-entered while running")]
    Reentrant,
    /// The coroutine body returned an error, or panicked.
    #[error("coroutine body failed: {0}")]
    Coroutine(#[source] BodyError),
}

/// A boxed error or captured panic payload from a coroutine body.
///
/// Wrapping this separately (rather than storing `Box<dyn Error>` directly
/// in [`GeneratorError::Coroutine`]) lets us represent two distinct failure
/// shapes without losing information: the body returning `Err`, and a
/// genuine Rust panic, each with its own message.
#[derive(Debug)]
pub enum BodyError {
    /// The body's `Future::Output` resolved to `Err(_)`.
    Returned(Box<dyn StdError + Send + Sync>),
    /// The body panicked while being polled.
    Panicked(String),
}

impl fmt::Display for BodyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyError::Returned(e) => write!(f, "{e}"),
            BodyError::Panicked(msg) => write!(f, "panicked: {msg}"),
        }
    }
}

impl StdError for BodyError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            BodyError::Returned(e) => Some(e.as_ref()),
            BodyError::Panicked(_) => None,
        }
    }
}

impl GeneratorError {
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        GeneratorError::Coroutine(BodyError::Panicked(msg))
    }

    pub(crate) fn from_body_err(e: Box<dyn StdError + Send + Sync>) -> Self {
        GeneratorError::Coroutine(BodyError::Returned(e))
    }
}
