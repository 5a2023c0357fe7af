//! Time windows on graph nodes.
//!
//! An [`Interval`] is the unit of occupancy: node `node` is held from `start`
//! until `end`.  `end` may be `f64::INFINITY` for a robot parked
//! indefinitely.  Windows shorter than [`TOLERANCE`] carry no occupancy and
//! are dropped by the reservation stores.

use std::fmt;

use crate::NodeId;

/// Two instants closer than this are considered equal by every interval
/// comparison in the planner.
pub const TOLERANCE: f64 = 1e-12;

/// A time window `[start, end)` during which `node` is occupied.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Interval {
    pub node:  NodeId,
    pub start: f64,
    pub end:   f64,
}

impl Interval {
    #[inline]
    pub fn new(node: NodeId, start: f64, end: f64) -> Self {
        debug_assert!(end >= start, "interval end {end} precedes start {start}");
        Self { node, start, end }
    }

    /// Occupy `node` from `start` onwards with no end.
    #[inline]
    pub fn open_ended(node: NodeId, start: f64) -> Self {
        Self { node, start, end: f64::INFINITY }
    }

    /// Length of the window.  Infinite for open-ended intervals.
    #[inline]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// `true` if the window is too short to count as an occupancy.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.end - self.start < TOLERANCE
    }

    #[inline]
    pub fn is_open_ended(&self) -> bool {
        self.end == f64::INFINITY
    }

    /// `true` if `time` lies in `[start, end)`.
    #[inline]
    pub fn contains_time(&self, time: f64) -> bool {
        self.start <= time && time < self.end
    }

    /// `true` if both windows are on the same node and share a positive span.
    #[inline]
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.node == other.node && self.start < other.end && other.start < self.end
    }

    /// The shared part of two overlapping windows, or `None`.
    pub fn overlap_with(&self, other: &Interval) -> Option<Interval> {
        if !self.overlaps(other) {
            return None;
        }
        Some(Interval {
            node:  self.node,
            start: self.start.max(other.start),
            end:   self.end.min(other.end),
        })
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node {} - [{} - {}]", self.node.0, self.start, self.end)
    }
}
