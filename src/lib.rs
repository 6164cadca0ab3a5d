//! Lock-free rendezvous channels, `select`, and coroutine-style
//! generators built on Rust's native `async`/`.await`.
//!
//! - [`rendezvous`]; unbuffered single-slot channels (`Sender`/`Receiver`).
//! - [`select`]; race `receive` across several channels.
//! - [`generator`]; turn an `async` body into a pull-driven [`Iterator`]
//!   ([`generator::sync`]) or [`futures::Stream`] ([`generator::async_gen`]).
//! - [`sequence`]; combinators over an async sequence (`map`, `filter`,
//!   `contains`, `to_list`, ...).
//! - [`task`]; the future-controller primitive (`ValueFuture`) and
//!   `spawn_async`/`run_async` entry points.
//!
//! The `async` Cargo feature (on by default) gates everything that depends
//! on the `futures` crate: [`task`], [`select`], [`sequence`], the async
//! generator, and the `Future`-returning methods on [`rendezvous::Sender`]
//! / [`rendezvous::Receiver`]. With it disabled, only the blocking API
//! surface and [`generator::sync`] are available.

pub mod error;
pub mod generator;
pub mod rendezvous;
pub mod runner;
pub mod token;

#[cfg(feature = "async")]
pub mod select;
#[cfg(feature = "async")]
pub mod sequence;
#[cfg(feature = "async")]
pub mod task;

pub use error::{BodyError, ChannelError, GeneratorError, SelectError};
pub use runner::{Execute, Runner};
pub use token::SubscriptionToken;
