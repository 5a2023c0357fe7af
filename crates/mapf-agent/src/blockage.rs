//! Occupancy every robot already commits to at planning time.

use std::collections::BTreeMap;

use mapf_core::{AgentId, Interval};

use crate::Agent;

/// Windows each robot blocks before any new plan is made, keyed by agent.
///
/// Fixed robots block their node from `now` on for good.  Moving robots
/// keep the reservations they still need to reach and stop at their next
/// node; windows that ended before `now` are dropped.
pub fn start_blockage(agents: &[Agent], now: f64) -> BTreeMap<AgentId, Vec<Interval>> {
    agents
        .iter()
        .map(|agent| {
            let blocked = if agent.fixed_position {
                vec![Interval::open_ended(agent.next_node, now)]
            } else {
                agent
                    .reservations_to_next_node
                    .iter()
                    .filter(|r| r.end >= now)
                    .copied()
                    .collect()
            };
            (agent.id, blocked)
        })
        .collect()
}
