//! Low-level planner trait and a delay-only default implementation.
//!
//! # Pluggability
//!
//! [`ConflictSearch`](crate::ConflictSearch) never searches the graph
//! itself; it asks a [`LowLevelPlanner`] for one agent's plan under a set of
//! forbidden windows.  Applications plug in their own time-aware A*.
//! [`FixedRoutePlanner`] is enough when routes are fixed and only their
//! timing may change.

use std::collections::BTreeMap;

use tracing::warn;

use mapf_core::{AgentId, Interval, NodeId, PlannerConfig, Tagging};
use mapf_graph::{Graph, Physics};
use mapf_reservation::ReservationTable;

use crate::Solution;

// ── LowLevelPlanner trait ─────────────────────────────────────────────────────

/// Plans a single agent under constraints.
///
/// # Thread safety
///
/// Implementations must be `Send + Sync` so the children of one expansion
/// can be re-planned on Rayon workers (`parallel` feature).
pub trait LowLevelPlanner: Send + Sync {
    type Route: Clone + Send + Sync;

    /// A plan for `agent` whose reservations overlap none of `constraints`,
    /// or `None` if no such plan exists.
    fn plan(&self, agent: AgentId, constraints: &[Interval]) -> Option<Solution<Self::Route>>;
}

// ── FixedRoutePlanner ─────────────────────────────────────────────────────────

/// A route released at `release`, driven hop by hop.
#[derive(Clone, Debug, PartialEq)]
pub struct FixedRoute {
    pub nodes:   Vec<NodeId>,
    pub release: f64,
}

/// The route chosen by [`FixedRoutePlanner`]: the fixed node sequence and
/// the moment the agent leaves its first node.
#[derive(Clone, Debug, PartialEq)]
pub struct DelayedRoute {
    pub nodes:     Vec<NodeId>,
    pub depart_at: f64,
}

/// Keeps every agent's node sequence and only picks when to leave.
///
/// Candidate departures are `release + k * wait_step` for
/// `k = 0, 1, …` up to `max_delay`.  The agent holds its first node from
/// `release` until it departs.
pub struct FixedRoutePlanner<G, Ph> {
    graph:        G,
    physics:      Ph,
    routes:       BTreeMap<AgentId, FixedRoute>,
    wait_step:    f64,
    max_delay:    f64,
    park_at_goal: bool,
}

impl<G, Ph> FixedRoutePlanner<G, Ph>
where
    G: Graph + Send + Sync,
    Ph: Physics,
{
    pub fn new(graph: G, physics: Ph, wait_step: f64, max_delay: f64) -> Self {
        Self {
            graph,
            physics,
            routes: BTreeMap::new(),
            wait_step,
            max_delay,
            park_at_goal: false,
        }
    }

    /// Wait steps of `wait_step_length`, delays up to `maximum_wait_time`.
    pub fn from_config(graph: G, physics: Ph, config: &PlannerConfig) -> Self {
        Self::new(graph, physics, config.wait_step_length, config.maximum_wait_time)
    }

    /// Keep the goal reserved forever after arrival.
    pub fn park_at_goal(mut self, park: bool) -> Self {
        self.park_at_goal = park;
        self
    }

    pub fn add_route(&mut self, agent: AgentId, nodes: Vec<NodeId>, release: f64) {
        self.routes.insert(agent, FixedRoute { nodes, release });
    }

    pub fn route(&self, agent: AgentId) -> Option<&FixedRoute> {
        self.routes.get(&agent)
    }

    pub fn agents(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.routes.keys().copied()
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    /// Candidate delays in ascending order.
    fn delays(&self) -> impl Iterator<Item = f64> + '_ {
        let steps = if self.wait_step > 0.0 && self.max_delay > 0.0 {
            (self.max_delay / self.wait_step).floor() as usize
        } else {
            0
        };
        (0..=steps).map(move |k| k as f64 * self.wait_step)
    }
}

impl<G, Ph> LowLevelPlanner for FixedRoutePlanner<G, Ph>
where
    G: Graph + Send + Sync,
    Ph: Physics,
{
    type Route = DelayedRoute;

    fn plan(&self, agent: AgentId, constraints: &[Interval]) -> Option<Solution<DelayedRoute>> {
        let route = self.routes.get(&agent)?;

        let mut forbidden = ReservationTable::new(self.graph.node_count(), Tagging::None, true);
        if let Err(e) = forbidden.add_all(constraints, None, None) {
            warn!(%agent, error = %e, "overlapping constraints");
            return None;
        }

        self.delays().find_map(|delay| {
            let depart_at = route.release + delay;
            let reservations = ReservationTable::create_route_intervals(
                &self.graph,
                &self.physics,
                route.release,
                depart_at,
                &route.nodes,
                self.park_at_goal,
            )?;
            forbidden.all_intersection_free(&reservations).then(|| {
                Solution::new(DelayedRoute { nodes: route.nodes.clone(), depart_at }, reservations)
            })
        })
    }
}
