//! Robot snapshots and their planned paths.
//!
//! The floor controller owns the robots; the planner only sees an [`Agent`]
//! snapshot per tick.  The one thing it writes back is the [`Path`], e.g. an
//! escape hop chosen by the deadlock handler.

use std::collections::VecDeque;
use std::fmt;

use mapf_core::{AgentId, Interval, NodeId};

// ── Path ──────────────────────────────────────────────────────────────────────

/// One instruction of a path: drive to `node`, stop there if `is_final`,
/// then wait `wait` seconds.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathStep {
    pub node:     NodeId,
    pub is_final: bool,
    pub wait:     f64,
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Goto {}", self.node.0)?;
        if self.is_final {
            f.write_str(" and Stop")?;
        }
        if self.wait > 0.0 {
            write!(f, " and Wait {}", self.wait)?;
        }
        Ok(())
    }
}

/// Instructions still ahead of a robot, next one first.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Path {
    steps: VecDeque<PathStep>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn push_back(&mut self, node: NodeId, is_final: bool, wait: f64) {
        self.steps.push_back(PathStep { node, is_final, wait });
    }

    pub fn push_front(&mut self, node: NodeId, is_final: bool, wait: f64) {
        self.steps.push_front(PathStep { node, is_final, wait });
    }

    pub fn pop_front(&mut self) -> Option<PathStep> {
        self.steps.pop_front()
    }

    pub fn next_step(&self) -> Option<&PathStep> {
        self.steps.front()
    }

    pub fn last_step(&self) -> Option<&PathStep> {
        self.steps.back()
    }

    pub fn clear(&mut self) {
        self.steps.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathStep> {
        self.steps.iter()
    }

    /// `true` if the robot comes to a stop at the end of the path.
    pub fn is_consistent(&self) -> bool {
        self.steps.back().is_none_or(|s| s.is_final)
    }
}

// ── Agent ─────────────────────────────────────────────────────────────────────

/// What the planner knows about one robot at the current tick.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Agent {
    pub id: AgentId,

    /// Parked on purpose (e.g. at a station) rather than waiting.
    pub fixed_position: bool,

    /// The node the robot is at, or is about to reach.
    pub next_node: NodeId,

    /// Windows the robot still needs to reach `next_node` and stop there.
    pub reservations_to_next_node: Vec<Interval>,

    /// Small enough to pass under storage racks.
    pub can_go_through_obstacles: bool,

    pub path: Path,
}

impl Agent {
    /// A moving robot heading for `next_node` with no pending reservations.
    pub fn new(id: AgentId, next_node: NodeId) -> Self {
        Self {
            id,
            fixed_position: false,
            next_node,
            reservations_to_next_node: Vec::new(),
            can_go_through_obstacles: false,
            path: Path::new(),
        }
    }

    /// A robot parked at `node` that is not waiting for anything.
    pub fn parked(id: AgentId, node: NodeId) -> Self {
        Self { fixed_position: true, ..Self::new(id, node) }
    }

    pub fn with_reservations(mut self, reservations: Vec<Interval>) -> Self {
        self.reservations_to_next_node = reservations;
        self
    }

    pub fn through_obstacles(mut self, allowed: bool) -> Self {
        self.can_go_through_obstacles = allowed;
        self
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Agent{}", self.id.0)
    }
}
