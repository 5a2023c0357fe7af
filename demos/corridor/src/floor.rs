//! The demo floor: a 5 × 3 aisle grid with a mezzanine reached by elevator.
//!
//! ```text
//!                                   16 ── 15      mezzanine
//!                                          ⇅ lift 1
//!  10 ── 11 ── 12 ── 13 ── 14
//!   │     │     │     │     │
//!   5 ──  6 ──  7 ──  8 ──  9
//!   │     │     │     │     │
//!   0 ──  1 ──  2 ──  3 ──  4
//! ```

use mapf_core::{ElevatorId, NodeId};
use mapf_graph::{GraphResult, NodeInfo, WaypointGraph, WaypointGraphBuilder};

/// Metres between neighbouring waypoints.
const SPACING: f64 = 2.0;

/// Seconds one lift ride takes, doors included.
const LIFT_RIDE_SECS: f64 = 12.0;

pub struct Floor {
    pub graph:     WaypointGraph,
    /// Ground-floor end of the lift.
    pub lift_foot: NodeId,
    /// Mezzanine pick station.
    pub mezzanine: NodeId,
}

pub fn build_floor() -> GraphResult<Floor> {
    let mut b = WaypointGraphBuilder::grid(5, 3, SPACING);

    // Node 1 is closed for maintenance, node 3 stands under a rack, and the
    // left column doubles as a station queue.
    b.set_info(NodeId(1), NodeInfo { is_locked: true, ..NodeInfo::default() });
    b.set_info(NodeId(3), NodeInfo { is_obstacle: true, ..NodeInfo::default() });
    for queue in [NodeId(0), NodeId(5), NodeId(10)] {
        b.set_info(queue, NodeInfo { is_queue: true, ..NodeInfo::default() });
    }

    let lift_foot = NodeId(14);
    let lift_head = b.add_waypoint(4.0 * SPACING, 3.0 * SPACING);
    let mezzanine = b.add_waypoint(3.0 * SPACING, 3.0 * SPACING);
    b.add_aisle(lift_head, mezzanine);
    b.add_elevator_ride(lift_foot, lift_head, LIFT_RIDE_SECS, ElevatorId(1));
    b.add_elevator_ride(lift_head, lift_foot, LIFT_RIDE_SECS, ElevatorId(1));

    Ok(Floor { graph: b.build()?, lift_foot, mezzanine })
}
