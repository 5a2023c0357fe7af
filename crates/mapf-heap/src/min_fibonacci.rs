//! `f64`-keyed Fibonacci min-heap with textbook decrease-key semantics.
//!
//! Where [`FibonacciHeap`] accepts key changes in either direction, this
//! variant only allows keys to shrink and reports an attempted increase as
//! an error, which is what Dijkstra-style searches expect.

use crate::fibonacci::{FibonacciHeap, HeapDirection, HeapHandle, MergedHandles};
use crate::{HeapError, HeapResult};

pub struct MinFibonacciHeap<T> {
    inner: FibonacciHeap<f64, T>,
}

impl<T> MinFibonacciHeap<T> {
    pub fn new() -> Self {
        Self { inner: FibonacciHeap::new(HeapDirection::Increasing) }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn enqueue(&mut self, priority: f64, value: T) -> HeapHandle {
        debug_assert!(!priority.is_nan(), "NaN priority");
        self.inner.enqueue(priority, value)
    }

    pub fn top(&self) -> Option<(f64, &T)> {
        self.inner.top().map(|(p, v)| (*p, v))
    }

    pub fn dequeue(&mut self) -> Option<(f64, T)> {
        self.inner.dequeue()
    }

    /// Lower the key of an entry.  Raising it is rejected.
    pub fn decrease_key(&mut self, handle: HeapHandle, priority: f64) -> HeapResult<()> {
        let current = *self.inner.priority(handle)?;
        if priority > current {
            return Err(HeapError::KeyIncrease { current, requested: priority });
        }
        self.inner.change_key(handle, priority)
    }

    pub fn delete(&mut self, handle: HeapHandle) -> HeapResult<(f64, T)> {
        self.inner.delete(handle)
    }

    /// Absorb every entry of `other`.
    pub fn union(&mut self, other: MinFibonacciHeap<T>) -> MergedHandles {
        match self.inner.merge(other.inner) {
            Ok(map) => map,
            // Both sides are always `Increasing`.
            Err(_) => unreachable!("min heaps share a direction"),
        }
    }

    pub fn priority(&self, handle: HeapHandle) -> HeapResult<f64> {
        self.inner.priority(handle).copied()
    }

    #[inline]
    pub fn contains(&self, handle: HeapHandle) -> bool {
        self.inner.contains(handle)
    }
}

impl<T> Default for MinFibonacciHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}
