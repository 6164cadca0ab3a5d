//! Combinators over an asynchronous sequence of values.
//!
//! Named `map`, `filter`, `contains`, `toList`, `forEach`, `asyncSequenceOf`
//! and implemented as a thin extension trait over [`futures::Stream`], so
//! they work uniformly on an [`crate::generator::AsyncGenerator`] or on any
//! other stream a caller already has (e.g. one built with
//! [`async_sequence_of`]). `take`, `enumerate`, and `fold` are supplemented
//! beyond that named list since `toList`/`forEach` already need the same
//! machinery internally, and most async-stream surfaces expose them
//! alongside `map`/`filter`.

use futures::{Stream, StreamExt};

/// Build a ready-made async sequence from a plain iterator; the async
/// counterpart of `vec![...].into_iter()`.
pub fn async_sequence_of<T>(items: impl IntoIterator<Item = T>) -> impl Stream<Item = T> {
    futures::stream::iter(items)
}

/// Extension methods giving [`futures::Stream`] this crate's generator vocabulary.
pub trait SequenceExt: Stream + Sized {
    /// Transform every item, lazily.
    fn map_items<U, F>(self, f: F) -> impl Stream<Item = U>
    where
        F: FnMut(Self::Item) -> U,
    {
        self.map(f)
    }

    /// Keep only items matching `predicate`, lazily.
    fn filter_items<F>(self, mut predicate: F) -> impl Stream<Item = Self::Item>
    where
        F: FnMut(&Self::Item) -> bool,
    {
        self.filter(move |item| futures::future::ready(predicate(item)))
    }

    /// Resolve to `true` once an item equal to `target` is produced.
    fn contains(self, target: Self::Item) -> impl std::future::Future<Output = bool>
    where
        Self: Unpin,
        Self::Item: PartialEq,
    {
        let mut this = self;
        async move {
            while let Some(item) = this.next().await {
                if item == target {
                    return true;
                }
            }
            false
        }
    }

    /// Run `f` once per item, for side effects.
    fn for_each_item<F>(self, mut f: F) -> impl std::future::Future<Output = ()>
    where
        F: FnMut(Self::Item),
    {
        self.for_each(move |item| {
            f(item);
            futures::future::ready(())
        })
    }

    /// Drive the sequence to completion, collecting every item.
    fn to_list(self) -> impl std::future::Future<Output = Vec<Self::Item>> {
        self.collect()
    }

    /// Take at most `n` items, then stop.
    fn take_items(self, n: usize) -> impl Stream<Item = Self::Item> {
        self.take(n)
    }

    /// Pair each item with its zero-based index.
    fn enumerate_items(self) -> impl Stream<Item = (usize, Self::Item)> {
        self.enumerate()
    }

    /// Fold the sequence down to a single accumulated value.
    fn fold_items<B, F, Fut>(self, init: B, f: F) -> impl std::future::Future<Output = B>
    where
        F: FnMut(B, Self::Item) -> Fut,
        Fut: std::future::Future<Output = B>,
    {
        self.fold(init, f)
    }
}

impl<S: Stream> SequenceExt for S {}
