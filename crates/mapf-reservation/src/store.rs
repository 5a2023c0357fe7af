//! Sorted, disjoint time windows for a single node.
//!
//! # Layout
//!
//! Parallel columns indexed by position, sorted by `start`:
//!
//! ```text
//! starts:     [ 0.0,  12.5,  30.0 ]
//! ends:       [ 4.0,  20.0,   inf ]
//! agents:     [ a3,   a1,    a7   ]   (only with agent tagging)
//! priorities: [ 2,    0,     1    ]   (only with priority tagging)
//! ```
//!
//! Because windows never overlap, `ends` is sorted too, so every lookup is a
//! binary search over `starts` followed by a neighbour check.
//!
//! Two windows that touch within [`TOLERANCE`] do not conflict.  A query that
//! starts exactly where a stored window starts always conflicts, even if the
//! query itself is degenerate.

use mapf_core::{AgentId, NodeId, Tagging, TOLERANCE};
use tracing::warn;

use crate::{ReservationError, ReservationResult};

// ── Records ───────────────────────────────────────────────────────────────────

/// One stored window with its owner tags.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReservedInterval {
    pub start:    f64,
    pub end:      f64,
    pub agent:    Option<AgentId>,
    pub priority: Option<i32>,
}

/// A stored reservation overlapping a query.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Collision {
    pub node:     NodeId,
    pub agent:    Option<AgentId>,
    pub priority: Option<i32>,
    /// Bounds of the colliding reservation.
    pub start:    f64,
    pub end:      f64,
}

/// The reservation that makes a query fail: the one containing the query
/// start if there is one, otherwise the next one after it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Blocker {
    pub node:  NodeId,
    /// `None` if the store does not tag owners or the window was anonymous.
    pub agent: Option<AgentId>,
}

/// Result of the binary search: where `[start, end)` would be inserted and
/// whether it fits there.
#[derive(Copy, Clone, Debug)]
struct Slot {
    index: usize,
    free:  bool,
}

// ── DisjointIntervalStore ─────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct DisjointIntervalStore {
    node:       NodeId,
    tagging:    Tagging,
    starts:     Vec<f64>,
    ends:       Vec<f64>,
    agents:     Vec<Option<AgentId>>,
    priorities: Vec<Option<i32>>,
}

impl DisjointIntervalStore {
    pub fn new(node: NodeId, tagging: Tagging) -> Self {
        Self {
            node,
            tagging,
            starts:     Vec::new(),
            ends:       Vec::new(),
            agents:     Vec::new(),
            priorities: Vec::new(),
        }
    }

    #[inline]
    pub fn node(&self) -> NodeId {
        self.node
    }

    #[inline]
    pub fn tagging(&self) -> Tagging {
        self.tagging
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.starts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<ReservedInterval> {
        Some(ReservedInterval {
            start:    *self.starts.get(index)?,
            end:      self.ends[index],
            agent:    self.agent_at(index),
            priority: self.priority_at(index),
        })
    }

    /// Stored windows in start order.
    pub fn iter(&self) -> impl Iterator<Item = ReservedInterval> + '_ {
        (0..self.len()).filter_map(|i| self.get(i))
    }

    // ── Mutation ──────────────────────────────────────────────────────────

    /// Reserve `[start, end)`.
    ///
    /// Windows shorter than [`TOLERANCE`] are ignored.  Overlapping an
    /// existing window is an error carrying the store's content.
    pub fn add(
        &mut self,
        start: f64,
        end: f64,
        agent: Option<AgentId>,
        priority: Option<i32>,
    ) -> ReservationResult<()> {
        if end - start < TOLERANCE {
            return Ok(());
        }

        let slot = self.locate(start, end);
        if !slot.free {
            warn!(node = %self.node, start, end, stored = self.len(), "reservation overlaps an existing interval");
            return Err(ReservationError::IntervalIntersection {
                node: self.node,
                start,
                end,
                existing: self.iter().collect(),
            });
        }

        let i = slot.index;
        self.starts.insert(i, start);
        self.ends.insert(i, end);
        if self.tagging.stores_agent_ids() {
            self.agents.insert(i, agent);
        }
        if self.tagging.stores_priorities() {
            self.priorities.insert(i, priority);
        }
        debug_assert!(self.is_well_formed(), "store for {} lost its ordering", self.node);
        Ok(())
    }

    /// Remove the window at `index`, returning it.
    pub fn remove(&mut self, index: usize) -> Option<ReservedInterval> {
        let removed = self.get(index)?;
        self.starts.remove(index);
        self.ends.remove(index);
        if self.tagging.stores_agent_ids() {
            self.agents.remove(index);
        }
        if self.tagging.stores_priorities() {
            self.priorities.remove(index);
        }
        Some(removed)
    }

    /// Remove the window covering instant `time`, if any.
    pub fn remove_intersection_with_time(&mut self, time: f64) -> bool {
        let slot = self.locate(time, time);
        if slot.free {
            return false;
        }
        match slot.index.checked_sub(1) {
            Some(i) => self.remove(i).is_some(),
            None => false,
        }
    }

    /// Drop every window that ended before `current_time`.
    pub fn reorganize(&mut self, current_time: f64) -> usize {
        let expired = self.ends.partition_point(|&e| e < current_time);
        if expired == 0 {
            return 0;
        }
        self.starts.drain(..expired);
        self.ends.drain(..expired);
        if self.tagging.stores_agent_ids() {
            self.agents.drain(..expired);
        }
        if self.tagging.stores_priorities() {
            self.priorities.drain(..expired);
        }
        expired
    }

    pub fn clear(&mut self) {
        self.starts.clear();
        self.ends.clear();
        self.agents.clear();
        self.priorities.clear();
    }

    // ── Queries ───────────────────────────────────────────────────────────

    #[inline]
    pub fn intersection_free(&self, start: f64, end: f64) -> bool {
        self.locate(start, end).free
    }

    /// The reservation blocking `[start, end)`, or `None` if it is free.
    pub fn blocker(&self, start: f64, end: f64) -> Option<Blocker> {
        let slot = self.locate(start, end);
        if slot.free {
            return None;
        }
        let index = match self.containing_predecessor(slot.index, start) {
            Some(prev) => prev,
            None => slot.index,
        };
        Some(Blocker { node: self.node, agent: self.agent_at(index) })
    }

    /// Every reservation overlapping `[start, end)`, or `None` if it is free.
    pub fn collisions(&self, start: f64, end: f64) -> Option<Vec<Collision>> {
        let slot = self.locate(start, end);
        if slot.free {
            return None;
        }

        // The predecessor may reach into the query.
        let mut i = slot.index.saturating_sub(1);
        let mut first = true;
        let mut found = Vec::new();
        while i < self.len() {
            let (s, e) = (self.starts[i], self.ends[i]);
            if (s < end && start < e) || s == start {
                found.push(Collision {
                    node:     self.node,
                    agent:    self.agent_at(i),
                    priority: self.priority_at(i),
                    start:    s,
                    end:      e,
                });
            } else if !first {
                break;
            }
            first = false;
            i += 1;
        }
        Some(found)
    }

    /// The part of `[start, end)` covered by the blocking reservation, or
    /// `None` if the query is free.
    pub fn overlapping_interval(&self, start: f64, end: f64) -> Option<(f64, f64)> {
        let r = self.overlapping_reservation(start, end)?;
        Some((r.start.max(start), r.end.min(end)))
    }

    /// The full stored window blocking `[start, end)`.
    pub fn overlapping_reservation(&self, start: f64, end: f64) -> Option<ReservedInterval> {
        let slot = self.locate(start, end);
        if slot.free {
            return None;
        }
        let index = self.containing_predecessor(slot.index, start).unwrap_or(slot.index);
        self.get(index)
    }

    /// `true` if windows are start-sorted, non-degenerate, and pairwise
    /// disjoint within [`TOLERANCE`].
    pub fn is_well_formed(&self) -> bool {
        let columns_match = self.starts.len() == self.ends.len()
            && (!self.tagging.stores_agent_ids() || self.agents.len() == self.starts.len())
            && (!self.tagging.stores_priorities() || self.priorities.len() == self.starts.len());
        columns_match
            && (0..self.len()).all(|i| self.ends[i] - self.starts[i] >= TOLERANCE)
            && (1..self.len()).all(|i| {
                self.starts[i - 1] < self.starts[i] && self.ends[i - 1] <= self.starts[i] + TOLERANCE
            })
    }

    // ── Internals ─────────────────────────────────────────────────────────

    /// Binary search over `starts`.  An exact start match reports the slot
    /// just after the matching window, so `index - 1` names it.
    fn locate(&self, start: f64, end: f64) -> Slot {
        let index = self.starts.partition_point(|&s| s < start);
        if self.starts.get(index) == Some(&start) {
            return Slot { index: index + 1, free: false };
        }
        let after_predecessor = index == 0 || self.ends[index - 1] <= start + TOLERANCE;
        let before_successor = index == self.len() || end <= self.starts[index] + TOLERANCE;
        Slot { index, free: after_predecessor && before_successor }
    }

    /// `index - 1` if that window contains `start`.
    fn containing_predecessor(&self, index: usize, start: f64) -> Option<usize> {
        let prev = index.checked_sub(1)?;
        (self.starts[prev] <= start && start < self.ends[prev]).then_some(prev)
    }

    #[inline]
    fn agent_at(&self, index: usize) -> Option<AgentId> {
        self.agents.get(index).copied().flatten()
    }

    #[inline]
    fn priority_at(&self, index: usize) -> Option<i32> {
        self.priorities.get(index).copied().flatten()
    }
}
