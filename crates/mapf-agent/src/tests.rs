//! Tests for agent snapshots, deadlock handling, blockages and elevators.

use mapf_core::{AgentId, ElevatorId, Interval, NodeId, PlannerConfig, Tagging};
use mapf_graph::{ConstantSpeed, NodeInfo, WaypointGraph, WaypointGraphBuilder};
use mapf_reservation::ReservationTable;

use crate::{Agent, DeadlockHandler};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn walker() -> ConstantSpeed {
    ConstantSpeed::new(1.0).unwrap()
}

/// 3 × 3 grid; node 4 is the centre with four neighbours.
fn grid() -> WaypointGraph {
    WaypointGraphBuilder::grid(3, 3, 1.0).build().unwrap()
}

/// `0 ↔ 1 ↔ 2` with the given info on the two ends.
fn line(left: NodeInfo, right: NodeInfo) -> WaypointGraph {
    let mut b = WaypointGraphBuilder::grid(3, 1, 1.0);
    b.set_info(NodeId(0), left);
    b.set_info(NodeId(2), right);
    b.build().unwrap()
}

fn handler(seed: u64) -> DeadlockHandler {
    DeadlockHandler::new(&PlannerConfig { seed, ..PlannerConfig::default() })
}

const LOCKED: NodeInfo = NodeInfo { is_locked: true, is_obstacle: false, is_queue: false };
const RACK: NodeInfo = NodeInfo { is_locked: false, is_obstacle: true, is_queue: false };

// ── Path ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod path {
    use crate::Path;
    use mapf_core::NodeId;

    #[test]
    fn steps_in_order() {
        let mut p = Path::new();
        p.push_back(NodeId(2), false, 0.0);
        p.push_back(NodeId(3), true, 2.5);
        p.push_front(NodeId(1), false, 0.0);
        assert_eq!(p.len(), 3);
        assert_eq!(p.next_step().map(|s| s.node), Some(NodeId(1)));
        assert_eq!(p.last_step().map(|s| s.node), Some(NodeId(3)));
        assert_eq!(p.pop_front().map(|s| s.node), Some(NodeId(1)));
        assert_eq!(p.iter().map(|s| s.node).collect::<Vec<_>>(), vec![NodeId(2), NodeId(3)]);
    }

    #[test]
    fn consistent_only_when_ending_in_a_stop() {
        let mut p = Path::new();
        assert!(p.is_consistent());
        p.push_back(NodeId(1), false, 0.0);
        assert!(!p.is_consistent());
        p.push_back(NodeId(2), true, 0.0);
        assert!(p.is_consistent());
        p.clear();
        assert!(p.is_empty());
    }

    #[test]
    fn step_display() {
        let mut p = Path::new();
        p.push_back(NodeId(3), true, 2.5);
        p.push_back(NodeId(4), false, 0.0);
        let shown: Vec<String> = p.iter().map(ToString::to_string).collect();
        assert_eq!(shown, vec!["Goto 3 and Stop and Wait 2.5", "Goto 4"]);
    }
}

// ── Deadlock detection ────────────────────────────────────────────────────────

#[cfg(test)]
mod detection {
    use super::*;

    #[test]
    fn stalled_robot_deadlocks_after_threshold() {
        let mut h = handler(1);
        let stuck = Agent::new(AgentId(0), NodeId(4));
        h.update(std::slice::from_ref(&stuck), 0.0);
        h.update(std::slice::from_ref(&stuck), 20.0);
        assert_eq!(h.waiting_since(AgentId(0)), Some(0.0));
        assert!(!h.is_in_deadlock(&stuck, 30.0));
        assert!(h.is_in_deadlock(&stuck, 30.5));
    }

    #[test]
    fn progress_resets_the_clock() {
        let mut h = handler(1);
        let a = Agent::new(AgentId(0), NodeId(4));
        h.update(std::slice::from_ref(&a), 0.0);

        let moved = Agent::new(AgentId(0), NodeId(5));
        h.update(std::slice::from_ref(&moved), 10.0);
        assert_eq!(h.waiting_since(AgentId(0)), Some(10.0));

        let driving = moved.clone().with_reservations(vec![Interval::new(NodeId(5), 20.0, 21.0)]);
        h.update(std::slice::from_ref(&driving), 20.0);
        assert_eq!(h.waiting_since(AgentId(0)), Some(20.0));
        assert!(!h.is_in_deadlock(&moved, 45.0));
    }

    #[test]
    fn fixed_and_unknown_robots_never_deadlock() {
        let mut h = handler(1);
        let parked = Agent::parked(AgentId(1), NodeId(0));
        h.update(std::slice::from_ref(&parked), 0.0);
        h.update(std::slice::from_ref(&parked), 100.0);
        assert_eq!(h.waiting_since(AgentId(1)), Some(100.0));
        assert!(!h.is_in_deadlock(&parked, 1_000.0));
        assert!(!h.is_in_deadlock(&Agent::new(AgentId(9), NodeId(0)), 1_000.0));
    }

    #[test]
    fn forget_drops_the_clock() {
        let mut h = handler(1);
        let a = Agent::new(AgentId(3), NodeId(4));
        h.update(std::slice::from_ref(&a), 0.0);
        h.forget(AgentId(3));
        assert_eq!(h.waiting_since(AgentId(3)), None);
        assert!(!h.is_in_deadlock(&a, 100.0));
    }
}

// ── Escape hops ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod escape {
    use super::*;

    #[test]
    fn deadlocked_robot_escapes_on_empty_table() {
        let g = grid();
        let mut h = handler(7);
        let mut a = Agent::new(AgentId(0), NodeId(4));
        a.path.push_back(NodeId(1), true, 0.0);
        h.update(std::slice::from_ref(&a), 0.0);
        assert!(h.is_in_deadlock(&a, 31.0));

        let mut table = ReservationTable::new(9, Tagging::AgentIds, true);
        assert!(h.random_hop(&mut a, &g, &walker(), Some(&mut table), 31.0, false, false).unwrap());

        assert_eq!(a.path.len(), 1);
        let step = *a.path.next_step().unwrap();
        assert!([NodeId(1), NodeId(3), NodeId(5), NodeId(7)].contains(&step.node));
        assert!(step.is_final);
        assert!((0.0..5.0).contains(&step.wait));
        assert_eq!(table.reservation_count(), 0);
    }

    #[test]
    fn escape_always_succeeds_without_table() {
        let g = grid();
        for seed in 0..20 {
            let mut h = handler(seed);
            let mut a = Agent::new(AgentId(0), NodeId(0));
            assert!(h.random_hop(&mut a, &g, &walker(), None, 0.0, false, false).unwrap());
            assert!([NodeId(1), NodeId(3)].contains(&a.path.next_step().unwrap().node));
        }
    }

    #[test]
    fn committed_hop_is_reserved() {
        let g = grid();
        let mut h = handler(3);
        let mut a = Agent::new(AgentId(5), NodeId(4));
        let mut table = ReservationTable::new(9, Tagging::AgentIds, true);
        assert!(h.random_hop(&mut a, &g, &walker(), Some(&mut table), 10.0, true, true).unwrap());

        let target = a.path.next_step().unwrap().node;
        assert_eq!(table.reservation_count(), 3);
        assert!(!table.intersection_free(target, 500.0, 501.0));
        assert_eq!(table.blocker(NodeId(4), 10.0, 10.5).and_then(|b| b.agent), Some(AgentId(5)));
    }

    #[test]
    fn locked_and_rack_targets_are_skipped() {
        let g = line(LOCKED, NodeInfo::default());
        for seed in 0..10 {
            let mut a = Agent::new(AgentId(0), NodeId(1));
            assert!(handler(seed).random_hop(&mut a, &g, &walker(), None, 0.0, false, false).unwrap());
            assert_eq!(a.path.next_step().unwrap().node, NodeId(2));
        }

        let g = line(LOCKED, RACK);
        let mut a = Agent::new(AgentId(0), NodeId(1));
        a.path.push_back(NodeId(0), true, 0.0);
        assert!(!handler(0).random_hop(&mut a, &g, &walker(), None, 0.0, false, false).unwrap());
        assert_eq!(a.path.len(), 1, "a failed escape leaves the path alone");

        let mut small = Agent::new(AgentId(1), NodeId(1)).through_obstacles(true);
        assert!(handler(0).random_hop(&mut small, &g, &walker(), None, 0.0, false, false).unwrap());
        assert_eq!(small.path.next_step().unwrap().node, NodeId(2));
    }

    #[test]
    fn occupied_neighbours_block_the_escape() {
        let g = line(NodeInfo::default(), NodeInfo::default());
        let mut table = ReservationTable::new(3, Tagging::AgentIds, true);
        table.add(NodeId(0), 0.0, 100.0, Some(AgentId(8)), None).unwrap();
        table.add(NodeId(2), 0.0, 100.0, Some(AgentId(9)), None).unwrap();

        let mut a = Agent::new(AgentId(0), NodeId(1));
        assert!(!handler(0).random_hop(&mut a, &g, &walker(), Some(&mut table), 5.0, false, true).unwrap());
        assert!(a.path.is_empty());
        assert_eq!(table.reservation_count(), 2);
    }

    #[test]
    fn same_seed_same_escape() {
        let g = grid();
        let run = |seed| {
            let mut h = handler(seed);
            let mut a = Agent::new(AgentId(0), NodeId(4));
            (0..5)
                .map(|_| {
                    h.random_hop(&mut a, &g, &walker(), None, 0.0, false, false).unwrap();
                    *a.path.next_step().unwrap()
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(run(42), run(42));
    }
}

// ── Start blockage ────────────────────────────────────────────────────────────

#[cfg(test)]
mod blockage {
    use super::*;
    use crate::start_blockage;

    #[test]
    fn fixed_block_forever_moving_keep_live_windows() {
        let parked = Agent::parked(AgentId(2), NodeId(6));
        let moving = Agent::new(AgentId(1), NodeId(3)).with_reservations(vec![
            Interval::new(NodeId(2), 0.0, 4.0),
            Interval::new(NodeId(3), 4.0, 12.0),
            Interval::new(NodeId(3), 9.0, 10.0),
        ]);
        let blocked = start_blockage(&[parked, moving], 10.0);

        assert_eq!(blocked.keys().copied().collect::<Vec<_>>(), vec![AgentId(1), AgentId(2)]);
        assert_eq!(blocked[&AgentId(2)], vec![Interval::open_ended(NodeId(6), 10.0)]);
        assert_eq!(
            blocked[&AgentId(1)],
            vec![Interval::new(NodeId(3), 4.0, 12.0), Interval::new(NodeId(3), 9.0, 10.0)]
        );
    }

    #[test]
    fn idle_moving_robot_blocks_nothing() {
        let blocked = start_blockage(&[Agent::new(AgentId(0), NodeId(0))], 0.0);
        assert!(blocked[&AgentId(0)].is_empty());
    }
}

// ── Elevator sequences ────────────────────────────────────────────────────────

#[cfg(test)]
mod elevator {
    use super::*;
    use crate::{find_elevator_sequence, ElevatorHop};

    /// Three tiers joined by two quick elevators, plus a slow express lift
    /// from the ground floor straight to the middle tier's far end.
    ///
    /// ```text
    /// tier 2:            4 ─ 5
    ///                    ↑ E2
    /// tier 1:        2 ─ 3
    ///                ↑ E1
    /// tier 0:    0 ─ 1            6 (isolated)
    /// ```
    fn tiers() -> WaypointGraph {
        let mut b = WaypointGraphBuilder::new();
        let n: Vec<NodeId> = [(0.0, 0.0), (1.0, 0.0), (1.0, 5.0), (2.0, 5.0), (2.0, 10.0), (3.0, 10.0), (10.0, 10.0)]
            .into_iter()
            .map(|(x, y)| b.add_waypoint(x, y))
            .collect();
        b.add_aisle(n[0], n[1]);
        b.add_aisle(n[2], n[3]);
        b.add_aisle(n[4], n[5]);
        b.add_elevator_ride(n[1], n[2], 10.0, ElevatorId(1));
        b.add_elevator_ride(n[3], n[4], 10.0, ElevatorId(2));
        b.add_elevator_ride(n[0], n[3], 100.0, ElevatorId(3));
        b.build().unwrap()
    }

    #[test]
    fn rides_listed_in_travel_order() {
        let seq = find_elevator_sequence(&tiers(), &walker(), NodeId(0), NodeId(5)).unwrap();
        assert_eq!(
            seq.hops,
            vec![
                ElevatorHop { elevator: ElevatorId(1), from: NodeId(1), to: NodeId(2) },
                ElevatorHop { elevator: ElevatorId(2), from: NodeId(3), to: NodeId(4) },
            ]
        );
        assert!((seq.distance - 13.0).abs() < 1e-9);
        assert!((seq.travel_time - 33.0).abs() < 1e-9);
    }

    #[test]
    fn same_tier_needs_no_elevator() {
        let seq = find_elevator_sequence(&tiers(), &walker(), NodeId(2), NodeId(3)).unwrap();
        assert!(seq.hops.is_empty());
        assert_eq!(seq.distance, 1.0);

        let here = find_elevator_sequence(&tiers(), &walker(), NodeId(4), NodeId(4)).unwrap();
        assert!(here.hops.is_empty());
        assert_eq!(here.travel_time, 0.0);
    }

    #[test]
    fn unreachable_goal() {
        assert!(find_elevator_sequence(&tiers(), &walker(), NodeId(0), NodeId(6)).is_none());
        // Rides are one-way.
        assert!(find_elevator_sequence(&tiers(), &walker(), NodeId(4), NodeId(0)).is_none());
    }
}
