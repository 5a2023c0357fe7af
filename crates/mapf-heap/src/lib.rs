//! `mapf-heap` — priority queues for path and conflict searches.
//!
//! | Type                 | Use                                                        |
//! |----------------------|------------------------------------------------------------|
//! | [`BinaryHeap`]       | Compact `f64`-keyed open list, min or max                  |
//! | [`FibonacciHeap`]    | Generic keys, either direction, O(1) amortized change-key  |
//! | [`MinFibonacciHeap`] | `f64` min-heap with strict decrease-key and union          |
//!
//! Unlike `std::collections::BinaryHeap`, the Fibonacci heaps hand out a
//! [`HeapHandle`] per entry so a search can re-prioritize an entry in place
//! instead of pushing duplicates.  Handles are generation-checked: using one
//! after its entry left the heap yields [`HeapError::StaleHandle`] rather than
//! touching an unrelated entry.

pub mod binary;
pub mod error;
pub mod fibonacci;
pub mod min_fibonacci;


pub use binary::{BinaryHeap, HeapKind};
pub use error::{HeapError, HeapResult};
pub use fibonacci::{FibonacciHeap, HeapDirection, HeapHandle, MergedHandles};
pub use min_fibonacci::MinFibonacciHeap;
