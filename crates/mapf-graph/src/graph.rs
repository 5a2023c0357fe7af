//! The graph contract consumed by the planner.

use mapf_core::{ElevatorId, NodeId};

// ── Edge types ────────────────────────────────────────────────────────────────

/// A directed connection between two waypoints.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Edge {
    pub from:     NodeId,
    pub to:       NodeId,
    /// Euclidean length in metres.
    pub distance: f64,
    /// Heading in whole degrees, `0..360`, measured from the positive x axis.
    pub angle:    i16,
}

/// A ride between tiers.  Traversal takes `travel_time` seconds on top of
/// any horizontal distance.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElevatorEdge {
    pub from:        NodeId,
    pub to:          NodeId,
    pub distance:    f64,
    pub travel_time: f64,
    pub elevator:    ElevatorId,
}

/// Static properties of a waypoint.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeInfo {
    /// Temporarily closed (e.g. under maintenance).  Never a hop target.
    pub is_locked:   bool,
    /// Occupied by a storage rack.  Only agents that can pass under racks
    /// may enter.
    pub is_obstacle: bool,
    /// Part of a station queue.
    pub is_queue:    bool,
}

// ── Graph trait ───────────────────────────────────────────────────────────────

/// Read-only view of the warehouse layout.
///
/// Implementations must be cheap to query; the reservation table calls
/// [`intermediate_nodes`](Graph::intermediate_nodes) and
/// [`distance`](Graph::distance) for every hop it converts into intervals.
pub trait Graph {
    fn node_count(&self) -> usize;

    /// Straight-line distance between two waypoints.
    fn distance(&self, a: NodeId, b: NodeId) -> f64;

    /// Waypoints strictly between `from` and `to` along a straight run of
    /// edges, in travel order.  `None` if no straight connection exists.
    fn intermediate_nodes(&self, from: NodeId, to: NodeId) -> Option<Vec<NodeId>>;

    /// Outgoing edges of `node`.
    fn out_edges(&self, node: NodeId) -> &[Edge];

    fn node_info(&self, node: NodeId) -> NodeInfo;

    /// Outgoing elevator rides of `node`.  Single-tier layouts have none.
    fn elevator_edges(&self, _node: NodeId) -> &[ElevatorEdge] {
        &[]
    }
}
