//! Stall detection and randomized escape hops.
//!
//! The handler keeps a logical clock per robot: the last time it was seen
//! making progress.  The caller drives it with [`DeadlockHandler::update`]
//! once per tick and asks [`DeadlockHandler::is_in_deadlock`] whether a robot
//! has been stuck longer than `maximum_wait_time`.  A stuck robot can be sent
//! one hop to a random free neighbour with [`DeadlockHandler::random_hop`].

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use mapf_core::{AgentId, NodeId, PlannerConfig, PlannerRng};
use mapf_graph::{Edge, Graph, Physics};
use mapf_reservation::{ReservationResult, ReservationTable};

use crate::Agent;

/// Last observed progress of one robot.
#[derive(Copy, Clone, Debug, PartialEq)]
struct WaitState {
    since: f64,
    node:  NodeId,
}

pub struct DeadlockHandler {
    /// Seconds without progress after which a moving robot is deadlocked.
    pub maximum_wait_time: f64,
    /// Escape hops end with a pause drawn from `[0, wait_step_length)`.
    pub wait_step_length:  f64,
    waiting:               FxHashMap<AgentId, WaitState>,
    rng:                   PlannerRng,
}

impl DeadlockHandler {
    pub fn new(config: &PlannerConfig) -> Self {
        Self::with_seed(config.maximum_wait_time, config.wait_step_length, config.seed)
    }

    pub fn with_seed(maximum_wait_time: f64, wait_step_length: f64, seed: u64) -> Self {
        Self {
            maximum_wait_time,
            wait_step_length,
            waiting: FxHashMap::default(),
            rng: PlannerRng::new(seed),
        }
    }

    /// Advance the per-robot clocks to `now`.
    ///
    /// Fixed robots are reset every tick.  A moving robot's clock starts on
    /// first sight and is reset whenever it holds reservations ahead or its
    /// next node changed since the last tick.
    pub fn update(&mut self, agents: &[Agent], now: f64) {
        for agent in agents {
            let seen = WaitState { since: now, node: agent.next_node };
            match self.waiting.get_mut(&agent.id) {
                None => {
                    self.waiting.insert(agent.id, seen);
                }
                Some(state) => {
                    let progressed = agent.fixed_position
                        || !agent.reservations_to_next_node.is_empty()
                        || agent.next_node != state.node;
                    if progressed {
                        *state = seen;
                    }
                }
            }
        }
    }

    /// `true` if a moving robot has made no progress for longer than
    /// `maximum_wait_time`.  Robots never passed to `update` are not
    /// deadlocked.
    pub fn is_in_deadlock(&self, agent: &Agent, now: f64) -> bool {
        !agent.fixed_position
            && self
                .waiting
                .get(&agent.id)
                .is_some_and(|s| now - s.since > self.maximum_wait_time)
    }

    /// When `agent` was last seen making progress.
    pub fn waiting_since(&self, agent: AgentId) -> Option<f64> {
        self.waiting.get(&agent).map(|s| s.since)
    }

    /// Drop the bookkeeping of a robot that left the system.
    pub fn forget(&mut self, agent: AgentId) {
        self.waiting.remove(&agent);
    }

    /// Send `agent` one hop to a random neighbour.
    ///
    /// Outgoing edges are tried in shuffled order.  Locked targets are
    /// skipped, and so are rack positions unless the robot fits under racks.
    /// With a `table`, the first edge whose hop intervals (leaving at `now`
    /// from standstill) are free is taken and, with `insert_reservation`,
    /// committed; `final_reservation` keeps the target reserved after
    /// arrival.  Without a table the first eligible edge is taken.
    ///
    /// On success the robot's path is replaced by the single hop followed by
    /// a random pause.  Returns `Ok(false)` if no edge qualifies.
    #[allow(clippy::too_many_arguments)]
    pub fn random_hop<G, Ph>(
        &mut self,
        agent: &mut Agent,
        graph: &G,
        physics: &Ph,
        mut table: Option<&mut ReservationTable>,
        now: f64,
        final_reservation: bool,
        insert_reservation: bool,
    ) -> ReservationResult<bool>
    where
        G: Graph + ?Sized,
        Ph: Physics + ?Sized,
    {
        let mut edges: Vec<Edge> = graph.out_edges(agent.next_node).to_vec();
        self.rng.shuffle(&mut edges);

        for edge in edges {
            let info = graph.node_info(edge.to);
            if info.is_locked || (info.is_obstacle && !agent.can_go_through_obstacles) {
                continue;
            }

            if let Some(table) = table.as_deref_mut() {
                let Some(intervals) = ReservationTable::create_hop_intervals(
                    graph,
                    physics,
                    now,
                    now,
                    0.0,
                    agent.next_node,
                    edge.to,
                    final_reservation,
                ) else {
                    continue;
                };
                if !table.all_intersection_free(&intervals) {
                    continue;
                }
                if insert_reservation {
                    table.add_all(&intervals, Some(agent.id), None)?;
                }
            }

            let pause = self.rng.unit() * self.wait_step_length;
            agent.path.clear();
            agent.path.push_back(edge.to, true, pause);
            debug!(agent = %agent.id, from = %agent.next_node, to = %edge.to, pause, "escape hop");
            return Ok(true);
        }

        trace!(agent = %agent.id, node = %agent.next_node, "no escape hop available");
        Ok(false)
    }
}
