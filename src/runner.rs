//! Dispatch strategy for invoking completion callbacks.
//!
//! [`Runner`] decouples "a channel transition has a callback to invoke" from
//! "which thread runs it". [`Runner::Synchronous`] runs callbacks inline on
//! the caller's stack; useful for deterministic tests, and required for a
//! channel to be usable without pulling in a thread pool. [`Runner::Executor`]
//! submits the callback to a pool, which is what keeps long `send`/`receive`
//! chains from recursing the caller's stack to death.
//!
//! The [`crate::rendezvous`] state machine never enforces ordering between
//! distinct [`Runner::run`] submissions: callbacks dispatched for unrelated
//! channels, or even unrelated transitions of the same channel, may
//! interleave freely with other threads' work.

use std::sync::Arc;

/// A thread pool abstraction. `Runner::Executor` is generic over this trait
/// so callers can plug in any pool; [`ThreadPoolExecutor`] is the concrete
/// implementation this crate ships.
pub trait Execute: Send + Sync {
    /// Submit `job` for execution. Implementations must not block the
    /// caller waiting for `job` to run.
    fn execute(&self, job: Box<dyn FnOnce() + Send>);
}

/// Dispatches completion callbacks either inline or on an executor.
#[derive(Clone)]
pub enum Runner {
    /// Run callbacks inline, on whichever thread triggers the transition.
    ///
    /// Callers choosing this variant must accept that a `send` may run
    /// arbitrary user code (the matched `receive`'s callback) on their own
    /// stack.
    Synchronous,
    /// Submit callbacks to a shared executor.
    Executor(Arc<dyn Execute>),
}

impl Runner {
    /// Build a [`Runner::Executor`] backed by a fixed-size OS thread pool.
    pub fn thread_pool(workers: usize) -> Self {
        Runner::Executor(Arc::new(ThreadPoolExecutor::new(workers)))
    }

    /// Dispatch `job` per this runner's strategy.
    pub(crate) fn run(&self, job: impl FnOnce() + Send + 'static) {
        match self {
            Runner::Synchronous => job(),
            Runner::Executor(pool) => pool.execute(Box::new(job)),
        }
    }
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Runner::Synchronous => f.write_str("Runner::Synchronous"),
            Runner::Executor(_) => f.write_str("Runner::Executor(..)"),
        }
    }
}

use std::fmt;

/// [`Execute`] backed by the `threadpool` crate.
pub struct ThreadPoolExecutor(threadpool::ThreadPool);

impl ThreadPoolExecutor {
    pub fn new(workers: usize) -> Self {
        Self(threadpool::ThreadPool::new(workers.max(1)))
    }
}

impl Execute for ThreadPoolExecutor {
    fn execute(&self, job: Box<dyn FnOnce() + Send>) {
        self.0.execute(job);
    }
}
