//! Fibonacci heap over an index arena.
//!
//! # Layout
//!
//! Every entry lives in a slot of `cells`.  Sibling lists are circular and
//! doubly linked through `left`/`right` slot indices; `parent` and `child`
//! are slot indices as well, so the structure has no owning pointers and no
//! reference cycles.  Vacated slots are recycled through `free`, with a
//! per-slot generation counter that invalidates old handles.
//!
//! # Amortized costs
//!
//! | Operation    | Cost            |
//! |--------------|-----------------|
//! | `enqueue`    | O(1)            |
//! | `top`        | O(1)            |
//! | `change_key` | O(1) toward the top, O(degree) away from it |
//! | `dequeue`    | O(log n)        |
//! | `delete`     | O(log n)        |
//! | `merge`      | O(m) slot copy  |

use std::cmp::Ordering;

use crate::{HeapError, HeapResult};

/// Which priority ends up on top.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HeapDirection {
    /// Smallest priority first (min-heap).
    Increasing,
    /// Largest priority first (max-heap).
    Decreasing,
}

/// Stable reference to an enqueued entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct HeapHandle {
    index:      u32,
    generation: u32,
}

/// Translates handles of a heap consumed by [`FibonacciHeap::merge`] into
/// handles of the receiving heap.
#[derive(Copy, Clone, Debug)]
pub struct MergedHandles {
    offset: u32,
}

impl MergedHandles {
    #[inline]
    pub fn translate(&self, handle: HeapHandle) -> HeapHandle {
        HeapHandle { index: handle.index + self.offset, generation: handle.generation }
    }
}

struct Cell<P, V> {
    priority: P,
    value:    V,
    parent:   Option<usize>,
    child:    Option<usize>,
    left:     usize,
    right:    usize,
    degree:   usize,
    /// Lost a child since it last became a child itself.
    marked:   bool,
}

pub struct FibonacciHeap<P, V> {
    direction:   HeapDirection,
    cells:       Vec<Option<Cell<P, V>>>,
    generations: Vec<u32>,
    free:        Vec<usize>,
    top:         Option<usize>,
    len:         usize,
}

impl<P: PartialOrd, V> FibonacciHeap<P, V> {
    pub fn new(direction: HeapDirection) -> Self {
        Self {
            direction,
            cells:       Vec::new(),
            generations: Vec::new(),
            free:        Vec::new(),
            top:         None,
            len:         0,
        }
    }

    #[inline]
    pub fn direction(&self) -> HeapDirection {
        self.direction
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // ── Public operations ─────────────────────────────────────────────────

    pub fn enqueue(&mut self, priority: P, value: V) -> HeapHandle {
        let cell = Cell {
            priority,
            value,
            parent: None,
            child:  None,
            left:   0,
            right:  0,
            degree: 0,
            marked: false,
        };
        let x = match self.free.pop() {
            Some(slot) => {
                self.cells[slot] = Some(cell);
                slot
            }
            None => {
                self.cells.push(Some(cell));
                self.generations.push(0);
                self.cells.len() - 1
            }
        };
        self.make_singleton(x);
        self.add_root(x);
        if self.top.is_none_or(|t| self.before(x, t)) {
            self.top = Some(x);
        }
        self.len += 1;
        HeapHandle { index: x as u32, generation: self.generations[x] }
    }

    /// The top entry without removing it.
    pub fn top(&self) -> Option<(&P, &V)> {
        let cell = self.node(self.top?);
        Some((&cell.priority, &cell.value))
    }

    /// Handle of the top entry.
    pub fn top_handle(&self) -> Option<HeapHandle> {
        self.top.map(|t| self.handle_of(t))
    }

    /// Remove and return the top entry.
    pub fn dequeue(&mut self) -> Option<(P, V)> {
        let z = self.top?;

        // Promote all children of z to roots.
        while let Some(c) = self.node(z).child {
            let next = self.node(c).right;
            self.node_mut(z).child = if next == c { None } else { Some(next) };
            self.unlink(c);
            let child = self.node_mut(c);
            child.parent = None;
            child.marked = false;
            self.insert_after(z, c);
        }
        self.node_mut(z).degree = 0;

        let right = self.node(z).right;
        self.unlink(z);
        if right == z {
            self.top = None;
        } else {
            self.top = Some(right);
            self.consolidate();
        }

        self.len -= 1;
        let cell = self.release(z);
        Some((cell.priority, cell.value))
    }

    /// Give an entry a new priority.
    ///
    /// Moving toward the top cuts the entry from its parent if it now beats
    /// it; moving away from the top cuts every child that now beats it.
    pub fn change_key(&mut self, handle: HeapHandle, priority: P) -> HeapResult<()> {
        let x = self.index_of(handle)?;
        let improves = self.precedes(&priority, &self.node(x).priority);
        let worsens = self.precedes(&self.node(x).priority, &priority);
        self.node_mut(x).priority = priority;

        if improves {
            if let Some(p) = self.node(x).parent {
                if self.before(x, p) {
                    self.cut(x, p);
                    self.cascading_cut(p);
                }
            }
            if self.top.is_none_or(|t| self.before(x, t)) {
                self.top = Some(x);
            }
        } else if worsens {
            let mut lost_child = false;
            for c in self.children_of(x) {
                if self.before(c, x) {
                    self.cut(c, x);
                    lost_child = true;
                }
            }
            if lost_child {
                self.cascading_cut(x);
            }
            if self.top == Some(x) {
                self.top = self.best_root();
            }
        }
        Ok(())
    }

    /// Remove an arbitrary entry.
    pub fn delete(&mut self, handle: HeapHandle) -> HeapResult<(P, V)> {
        let x = self.index_of(handle)?;
        if let Some(p) = self.node(x).parent {
            self.cut(x, p);
            self.cascading_cut(p);
        }
        // x is now a root; forcing it to the top lets `dequeue` remove it
        // without needing a sentinel priority.
        self.top = Some(x);
        self.dequeue().ok_or(HeapError::StaleHandle)
    }

    /// Move every entry of `other` into `self`.
    ///
    /// Handles issued by `other` stay usable after passing them through the
    /// returned [`MergedHandles`].
    pub fn merge(&mut self, other: FibonacciHeap<P, V>) -> HeapResult<MergedHandles> {
        if other.direction != self.direction {
            return Err(HeapError::DirectionMismatch);
        }
        let offset = self.cells.len();
        let shift = |i: usize| i + offset;

        self.cells.extend(other.cells.into_iter().map(|slot| {
            slot.map(|mut c| {
                c.parent = c.parent.map(shift);
                c.child = c.child.map(shift);
                c.left = shift(c.left);
                c.right = shift(c.right);
                c
            })
        }));
        self.generations.extend(other.generations);
        self.free.extend(other.free.into_iter().map(shift));
        self.len += other.len;

        if let Some(ot) = other.top.map(shift) {
            match self.top {
                None => self.top = Some(ot),
                Some(t) => {
                    self.splice_lists(t, ot);
                    if self.before(ot, t) {
                        self.top = Some(ot);
                    }
                }
            }
        }
        Ok(MergedHandles { offset: offset as u32 })
    }

    #[inline]
    pub fn contains(&self, handle: HeapHandle) -> bool {
        self.index_of(handle).is_ok()
    }

    pub fn priority(&self, handle: HeapHandle) -> HeapResult<&P> {
        Ok(&self.node(self.index_of(handle)?).priority)
    }

    pub fn value(&self, handle: HeapHandle) -> HeapResult<&V> {
        Ok(&self.node(self.index_of(handle)?).value)
    }

    pub fn value_mut(&mut self, handle: HeapHandle) -> HeapResult<&mut V> {
        let x = self.index_of(handle)?;
        Ok(&mut self.node_mut(x).value)
    }

    /// All entries in dequeue order, without modifying the heap.
    pub fn sorted(&self) -> Vec<(&P, &V)> {
        let mut all: Vec<(&P, &V)> = self
            .cells
            .iter()
            .flatten()
            .map(|c| (&c.priority, &c.value))
            .collect();
        let direction = self.direction;
        all.sort_by(|a, b| {
            let ord = a.0.partial_cmp(b.0).unwrap_or(Ordering::Equal);
            match direction {
                HeapDirection::Increasing => ord,
                HeapDirection::Decreasing => ord.reverse(),
            }
        });
        all
    }

    /// Dequeue entries one by one until the heap is empty.
    pub fn drain_sorted(&mut self) -> impl Iterator<Item = (P, V)> + '_ {
        std::iter::from_fn(move || self.dequeue())
    }

    // ── Ordering ──────────────────────────────────────────────────────────

    #[inline]
    fn precedes(&self, a: &P, b: &P) -> bool {
        match self.direction {
            HeapDirection::Increasing => a < b,
            HeapDirection::Decreasing => a > b,
        }
    }

    #[inline]
    fn before(&self, a: usize, b: usize) -> bool {
        self.precedes(&self.node(a).priority, &self.node(b).priority)
    }

    // ── Slot access ───────────────────────────────────────────────────────

    #[inline]
    fn node(&self, i: usize) -> &Cell<P, V> {
        match &self.cells[i] {
            Some(cell) => cell,
            None => unreachable!("fibonacci heap link to vacant slot {i}"),
        }
    }

    #[inline]
    fn node_mut(&mut self, i: usize) -> &mut Cell<P, V> {
        match &mut self.cells[i] {
            Some(cell) => cell,
            None => unreachable!("fibonacci heap link to vacant slot {i}"),
        }
    }

    fn index_of(&self, handle: HeapHandle) -> HeapResult<usize> {
        let i = handle.index as usize;
        match self.cells.get(i) {
            Some(Some(_)) if self.generations[i] == handle.generation => Ok(i),
            _ => Err(HeapError::StaleHandle),
        }
    }

    #[inline]
    fn handle_of(&self, i: usize) -> HeapHandle {
        HeapHandle { index: i as u32, generation: self.generations[i] }
    }

    fn release(&mut self, i: usize) -> Cell<P, V> {
        let cell = match self.cells[i].take() {
            Some(cell) => cell,
            None => unreachable!("fibonacci heap released vacant slot {i}"),
        };
        self.generations[i] = self.generations[i].wrapping_add(1);
        self.free.push(i);
        cell
    }

    // ── Circular list primitives ──────────────────────────────────────────

    fn make_singleton(&mut self, x: usize) {
        let cell = self.node_mut(x);
        cell.left = x;
        cell.right = x;
    }

    /// Insert singleton `x` to the right of `anchor`.
    fn insert_after(&mut self, anchor: usize, x: usize) {
        let right = self.node(anchor).right;
        {
            let cell = self.node_mut(x);
            cell.left = anchor;
            cell.right = right;
        }
        self.node_mut(anchor).right = x;
        self.node_mut(right).left = x;
    }

    /// Detach `x` from its sibling list, leaving it a singleton.
    fn unlink(&mut self, x: usize) {
        let (left, right) = (self.node(x).left, self.node(x).right);
        self.node_mut(left).right = right;
        self.node_mut(right).left = left;
        self.make_singleton(x);
    }

    /// Join two disjoint circular lists.
    fn splice_lists(&mut self, a: usize, b: usize) {
        let a_right = self.node(a).right;
        let b_left = self.node(b).left;
        self.node_mut(a).right = b;
        self.node_mut(b).left = a;
        self.node_mut(b_left).right = a_right;
        self.node_mut(a_right).left = b_left;
    }

    fn add_root(&mut self, x: usize) {
        self.node_mut(x).parent = None;
        match self.top {
            None => self.make_singleton(x),
            Some(t) => self.insert_after(t, x),
        }
    }

    fn siblings_from(&self, start: usize) -> Vec<usize> {
        let mut out = vec![start];
        let mut cur = self.node(start).right;
        while cur != start {
            out.push(cur);
            cur = self.node(cur).right;
        }
        out
    }

    fn children_of(&self, x: usize) -> Vec<usize> {
        self.node(x).child.map(|c| self.siblings_from(c)).unwrap_or_default()
    }

    fn best_root(&self) -> Option<usize> {
        let roots = self.siblings_from(self.top?);
        roots.into_iter().reduce(|best, r| if self.before(r, best) { r } else { best })
    }

    // ── Structural operations ─────────────────────────────────────────────

    /// Make root `y` a child of root `x`.
    fn link(&mut self, y: usize, x: usize) {
        self.unlink(y);
        match self.node(x).child {
            None => self.node_mut(x).child = Some(y),
            Some(c) => self.insert_after(c, y),
        }
        let child = self.node_mut(y);
        child.parent = Some(x);
        child.marked = false;
        self.node_mut(x).degree += 1;
    }

    /// Move `x` from the child list of `parent` to the root list.
    fn cut(&mut self, x: usize, parent: usize) {
        let next = self.node(x).right;
        if self.node(parent).child == Some(x) {
            self.node_mut(parent).child = if next == x { None } else { Some(next) };
        }
        self.unlink(x);
        self.node_mut(parent).degree -= 1;
        self.add_root(x);
        self.node_mut(x).marked = false;
    }

    fn cascading_cut(&mut self, mut y: usize) {
        while let Some(z) = self.node(y).parent {
            if !self.node(y).marked {
                self.node_mut(y).marked = true;
                return;
            }
            self.cut(y, z);
            y = z;
        }
    }

    /// Link roots of equal degree until every root degree is unique, then
    /// pick the new top.
    fn consolidate(&mut self) {
        let Some(start) = self.top else { return };
        let roots = self.siblings_from(start);
        let mut by_degree: Vec<Option<usize>> = Vec::new();

        for w in roots {
            let mut x = w;
            let mut d = self.node(x).degree;
            loop {
                if d >= by_degree.len() {
                    by_degree.resize(d + 1, None);
                }
                match by_degree[d].take() {
                    None => {
                        by_degree[d] = Some(x);
                        break;
                    }
                    Some(mut y) => {
                        if self.before(y, x) {
                            std::mem::swap(&mut x, &mut y);
                        }
                        self.link(y, x);
                        d += 1;
                    }
                }
            }
        }

        self.top = by_degree
            .into_iter()
            .flatten()
            .reduce(|best, r| if self.before(r, best) { r } else { best });
    }
}

impl<P: PartialOrd, V> Default for FibonacciHeap<P, V> {
    fn default() -> Self {
        Self::new(HeapDirection::Increasing)
    }
}
