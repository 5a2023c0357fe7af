//! Planned routes as (node, arrival time) sequences.
//!
//! This is the only place the reservation layer talks to [`Physics`]: a
//! straight hop is expanded into every waypoint it passes, and the physics
//! model assigns each one an arrival time.

use mapf_core::NodeId;
use mapf_graph::{Graph, Physics};

/// Nodes visited along a route with their arrival times.  `times` is
/// non-decreasing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Checkpoints {
    pub nodes: Vec<NodeId>,
    pub times: Vec<f64>,
}

impl Checkpoints {
    pub fn new(nodes: Vec<NodeId>, times: Vec<f64>) -> Self {
        debug_assert_eq!(nodes.len(), times.len(), "one arrival time per checkpoint");
        Self { nodes, times }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Arrival time at the final checkpoint.
    pub fn arrival(&self) -> Option<f64> {
        self.times.last().copied()
    }

    /// Checkpoints of a single straight hop from `from` to `to`, leaving at
    /// `start_time` with `current_speed` and stopping at `to`.
    ///
    /// `None` if the graph has no straight connection between the two.
    pub fn for_hop<G, Ph>(
        graph: &G,
        physics: &Ph,
        start_time: f64,
        current_speed: f64,
        from: NodeId,
        to: NodeId,
    ) -> Option<Self>
    where
        G: Graph + ?Sized,
        Ph: Physics + ?Sized,
    {
        let mut nodes = graph.intermediate_nodes(from, to)?;
        nodes.insert(0, from);
        nodes.push(to);

        let distances: Vec<f64> = nodes.iter().map(|&n| graph.distance(from, n)).collect();
        let total = distances.last().copied().unwrap_or(0.0);
        let times = physics.checkpoint_times(current_speed, start_time, total, &distances);
        Some(Self::new(nodes, times))
    }

    /// Checkpoints of a route made of straight hops between consecutive
    /// `route` nodes.  Every hop starts and ends at standstill, the next one
    /// leaving as soon as the previous one arrives.
    ///
    /// `None` if any hop is not a straight connection.
    pub fn for_route<G, Ph>(graph: &G, physics: &Ph, depart_at: f64, route: &[NodeId]) -> Option<Self>
    where
        G: Graph + ?Sized,
        Ph: Physics + ?Sized,
    {
        let (&first, rest) = route.split_first()?;
        let mut merged = Self::new(vec![first], vec![depart_at]);
        let mut from = first;
        let mut clock = depart_at;

        for &to in rest {
            if to == from {
                continue;
            }
            let hop = Self::for_hop(graph, physics, clock, 0.0, from, to)?;
            // The hop repeats its start node; skip it.
            merged.nodes.extend_from_slice(&hop.nodes[1..]);
            merged.times.extend_from_slice(&hop.times[1..]);
            clock = hop.arrival().unwrap_or(clock);
            from = to;
        }
        Some(merged)
    }
}
