//! One-shot "still interested" flag used by [`crate::select`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A single-bit, lock-free election flag.
///
/// A [`SubscriptionToken`] starts active. The first caller to [`release`]
/// it wins; every other caller's `release` returns `false`. It is
/// monotonic: once inactive, it never becomes active again.
///
/// This is not a cancellation token; it does not stop work in flight, it
/// only lets racing completions agree on which one "wins".
#[derive(Clone, Debug)]
pub struct SubscriptionToken {
    active: Arc<AtomicBool>,
}

impl SubscriptionToken {
    /// Create a new, active token.
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Read the current state without synchronizing with other operations.
    ///
    /// May be read without synchronization because it is only ever used as
    /// a fast-path hint (e.g. "don't bother building a value if we're
    /// already certain to lose the race"); the authoritative check is
    /// always [`release`](Self::release)'s CAS.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    /// Atomically flip active -> inactive.
    ///
    /// Returns `true` if this call was the one that flipped it, `false` if
    /// the token was already inactive.
    pub fn release(&self) -> bool {
        self.active
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }
}

impl Default for SubscriptionToken {
    fn default() -> Self {
        Self::new()
    }
}
