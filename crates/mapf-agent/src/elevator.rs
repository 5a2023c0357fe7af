//! Which elevators a robot must ride to get from one tier to another.
//!
//! A best-first search over aisle edges and elevator rides.  The cost of an
//! edge is the time to drive it from standstill, plus the ride time for
//! elevators; the straight-line drive time to the goal guides the search.

use rustc_hash::FxHashMap;

use mapf_core::{ElevatorId, NodeId};
use mapf_graph::{Graph, Physics};
use mapf_heap::{BinaryHeap, HeapKind};

/// One elevator ride on the way.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElevatorHop {
    pub elevator: ElevatorId,
    pub from:     NodeId,
    pub to:       NodeId,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElevatorSequence {
    /// Rides in travel order.  Empty if the goal is on the start tier.
    pub hops:        Vec<ElevatorHop>,
    /// Metres covered, rides included.
    pub distance:    f64,
    /// Estimated seconds from start to goal.
    pub travel_time: f64,
}

/// How a node was first reached with its best cost.
#[derive(Copy, Clone, Debug)]
struct Step {
    from:     NodeId,
    distance: f64,
    ride:     Option<ElevatorId>,
}

/// The elevator rides on the quickest way from `start` to `goal`, or `None`
/// if the goal is unreachable.
pub fn find_elevator_sequence<G, Ph>(graph: &G, physics: &Ph, start: NodeId, goal: NodeId) -> Option<ElevatorSequence>
where
    G: Graph + ?Sized,
    Ph: Physics + ?Sized,
{
    let heuristic = |node: NodeId| physics.time_to_move(0.0, graph.distance(node, goal));

    let mut best: FxHashMap<NodeId, f64> = FxHashMap::default();
    let mut came_from: FxHashMap<NodeId, Step> = FxHashMap::default();
    let mut open = BinaryHeap::new(HeapKind::Min);

    best.insert(start, 0.0);
    open.insert(heuristic(start), start);

    while let Some((f, node)) = open.pop() {
        let g = best.get(&node).copied().unwrap_or(f64::INFINITY);
        // Stale entry superseded by a cheaper one.
        if f > g + heuristic(node) {
            continue;
        }
        if node == goal {
            return Some(unwind(&came_from, start, goal, g));
        }

        let drives = graph
            .out_edges(node)
            .iter()
            .map(|e| (e.to, e.distance, physics.time_to_move(0.0, e.distance), None));
        let rides = graph.elevator_edges(node).iter().map(|e| {
            (e.to, e.distance, physics.time_to_move(0.0, e.distance) + e.travel_time, Some(e.elevator))
        });

        for (next, distance, cost, ride) in drives.chain(rides) {
            let candidate = g + cost;
            if best.get(&next).is_some_and(|&known| known <= candidate) {
                continue;
            }
            best.insert(next, candidate);
            came_from.insert(next, Step { from: node, distance, ride });
            open.insert(candidate + heuristic(next), next);
        }
    }
    None
}

fn unwind(came_from: &FxHashMap<NodeId, Step>, start: NodeId, goal: NodeId, travel_time: f64) -> ElevatorSequence {
    let mut hops = Vec::new();
    let mut distance = 0.0;
    let mut node = goal;
    while node != start {
        let Some(step) = came_from.get(&node) else {
            break;
        };
        distance += step.distance;
        if let Some(elevator) = step.ride {
            hops.push(ElevatorHop { elevator, from: step.from, to: node });
        }
        node = step.from;
    }
    hops.reverse();
    ElevatorSequence { hops, distance, travel_time }
}
