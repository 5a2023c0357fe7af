//! Array-backed binary heap over `f64` priorities.

/// Which end of the priority range sits at the root.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HeapKind {
    Min,
    Max,
}

/// Binary heap with parallel priority and item arrays.
///
/// Priorities must not be NaN.
pub struct BinaryHeap<T> {
    kind:       HeapKind,
    priorities: Vec<f64>,
    items:      Vec<T>,
}

impl<T> BinaryHeap<T> {
    pub fn new(kind: HeapKind) -> Self {
        Self { kind, priorities: Vec::new(), items: Vec::new() }
    }

    pub fn with_capacity(kind: HeapKind, capacity: usize) -> Self {
        Self {
            kind,
            priorities: Vec::with_capacity(capacity),
            items:      Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn kind(&self) -> HeapKind {
        self.kind
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.priorities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.priorities.is_empty()
    }

    pub fn clear(&mut self) {
        self.priorities.clear();
        self.items.clear();
    }

    /// `true` if priority `a` belongs above `b`.
    #[inline]
    fn above(&self, a: f64, b: f64) -> bool {
        match self.kind {
            HeapKind::Min => a < b,
            HeapKind::Max => a > b,
        }
    }

    pub fn insert(&mut self, priority: f64, item: T) {
        debug_assert!(!priority.is_nan(), "NaN priority");
        self.priorities.push(priority);
        self.items.push(item);

        let mut i = self.priorities.len() - 1;
        while i > 0 {
            let parent = (i - 1) / 2;
            if !self.above(self.priorities[i], self.priorities[parent]) {
                break;
            }
            self.swap(i, parent);
            i = parent;
        }
    }

    /// The root entry without removing it.
    pub fn peek(&self) -> Option<(f64, &T)> {
        Some((*self.priorities.first()?, self.items.first()?))
    }

    /// The root item without its priority.
    #[inline]
    pub fn root(&self) -> Option<&T> {
        self.items.first()
    }

    /// Remove and return the root entry.
    pub fn pop(&mut self) -> Option<(f64, T)> {
        if self.priorities.is_empty() {
            return None;
        }
        let priority = self.priorities.swap_remove(0);
        let item = self.items.swap_remove(0);
        self.sift_down(0);
        Some((priority, item))
    }

    /// Remove the root entry, discarding it.
    pub fn delete_root(&mut self) {
        self.pop();
    }

    fn sift_down(&mut self, mut i: usize) {
        let n = self.priorities.len();
        loop {
            let left = 2 * i + 1;
            let right = left + 1;
            let mut best = i;
            if left < n && self.above(self.priorities[left], self.priorities[best]) {
                best = left;
            }
            if right < n && self.above(self.priorities[right], self.priorities[best]) {
                best = right;
            }
            if best == i {
                return;
            }
            self.swap(i, best);
            i = best;
        }
    }

    #[inline]
    fn swap(&mut self, a: usize, b: usize) {
        self.priorities.swap(a, b);
        self.items.swap(a, b);
    }
}
