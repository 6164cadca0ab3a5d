//! Generators: turning an `async` body into a pull-driven sequence of
//! values, synchronously ([`sync`]) or asynchronously ([`async_gen`]).

#[cfg(feature = "async")]
pub mod async_gen;
pub mod sync;

#[cfg(feature = "async")]
pub use async_gen::{
    async_generate, AsyncGenerator, AsyncSequence, AsyncState, AsyncYielder, PollOnce,
};
pub use sync::{generate, Sequence, SyncGenerator, Yielder};
