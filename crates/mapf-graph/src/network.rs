//! Warehouse waypoint graph and builder.
//!
//! # Data layout
//!
//! Outgoing edges are stored in **Compressed Sparse Row (CSR)** format.
//! Given a `NodeId n`, its outgoing edges occupy the slice:
//!
//! ```text
//! edges[ node_out_start[n] .. node_out_start[n+1] ]
//! ```
//!
//! Elevator rides use a second CSR table with the same layout.  Edge slices
//! are handed out directly by [`Graph::out_edges`], so the deadlock handler
//! and the elevator search iterate contiguous memory.
//!
//! # Spatial index
//!
//! An R-tree (via `rstar`) maps `(x, y)` to the nearest waypoint.  Used to
//! snap robot positions reported by the floor controller onto the graph.

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use mapf_core::{ElevatorId, NodeId};

use crate::graph::{Edge, ElevatorEdge, Graph, NodeInfo};
use crate::{GraphError, GraphResult};

/// Edges whose heading differs from the straight line by less than this many
/// degrees continue a straight run.
const STRAIGHT_RUN_TOLERANCE_DEG: i16 = 10;

// ── R-tree entry ──────────────────────────────────────────────────────────────

#[derive(Clone)]
struct WaypointEntry {
    point: [f64; 2],
    id:    NodeId,
}

impl RTreeObject for WaypointEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for WaypointEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

// ── Angle helpers ─────────────────────────────────────────────────────────────

/// Heading from `a` to `b` in whole degrees, normalized to `0..360`.
pub(crate) fn heading_deg(a: [f64; 2], b: [f64; 2]) -> i16 {
    let rad = (b[1] - a[1]).atan2(b[0] - a[0]);
    let deg = rad.to_degrees().round() as i32;
    ((deg + 360) % 360) as i16
}

/// Smallest absolute difference between two headings, in degrees.
#[inline]
fn heading_gap(a: i16, b: i16) -> i16 {
    let d = (a - b).rem_euclid(360);
    d.min(360 - d)
}

// ── WaypointGraph ─────────────────────────────────────────────────────────────

/// Directed waypoint graph in CSR format plus a spatial index for snapping.
///
/// Do not construct directly; use [`WaypointGraphBuilder`].
pub struct WaypointGraph {
    // ── Node data ─────────────────────────────────────────────────────────
    /// `[x, y]` position of each waypoint in metres.  Indexed by `NodeId`.
    pub positions: Vec<[f64; 2]>,
    pub node_info: Vec<NodeInfo>,

    // ── CSR adjacency ─────────────────────────────────────────────────────
    /// Length = `node_count + 1`.
    node_out_start:      Vec<u32>,
    edges:               Vec<Edge>,
    elevator_out_start:  Vec<u32>,
    elevators:           Vec<ElevatorEdge>,

    // ── Spatial index ─────────────────────────────────────────────────────
    spatial_idx: RTree<WaypointEntry>,
}

impl WaypointGraph {
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[inline]
    pub fn position(&self, node: NodeId) -> [f64; 2] {
        self.positions[node.index()]
    }

    /// Return the waypoint nearest to `(x, y)`, or `None` for an empty graph.
    pub fn nearest_waypoint(&self, x: f64, y: f64) -> Option<NodeId> {
        self.spatial_idx.nearest_neighbor(&[x, y]).map(|e| e.id)
    }

    /// Mark a waypoint locked or unlocked after construction.
    pub fn set_locked(&mut self, node: NodeId, locked: bool) {
        self.node_info[node.index()].is_locked = locked;
    }
}

impl Graph for WaypointGraph {
    #[inline]
    fn node_count(&self) -> usize {
        self.positions.len()
    }

    fn distance(&self, a: NodeId, b: NodeId) -> f64 {
        let pa = self.positions[a.index()];
        let pb = self.positions[b.index()];
        ((pa[0] - pb[0]).powi(2) + (pa[1] - pb[1]).powi(2)).sqrt()
    }

    fn intermediate_nodes(&self, from: NodeId, to: NodeId) -> Option<Vec<NodeId>> {
        let heading = heading_deg(self.position(from), self.position(to));
        let mut between = Vec::new();
        let mut node = from;

        // A straight run visits each waypoint at most once.
        for _ in 0..self.node_count() {
            if node == to {
                return Some(between);
            }
            node = self
                .out_edges(node)
                .iter()
                .find(|e| heading_gap(e.angle, heading) < STRAIGHT_RUN_TOLERANCE_DEG)?
                .to;
            if node != to {
                between.push(node);
            }
        }
        (node == to).then_some(between)
    }

    #[inline]
    fn out_edges(&self, node: NodeId) -> &[Edge] {
        let start = self.node_out_start[node.index()] as usize;
        let end   = self.node_out_start[node.index() + 1] as usize;
        &self.edges[start..end]
    }

    #[inline]
    fn node_info(&self, node: NodeId) -> NodeInfo {
        self.node_info[node.index()]
    }

    #[inline]
    fn elevator_edges(&self, node: NodeId) -> &[ElevatorEdge] {
        let start = self.elevator_out_start[node.index()] as usize;
        let end   = self.elevator_out_start[node.index() + 1] as usize;
        &self.elevators[start..end]
    }
}

// ── WaypointGraphBuilder ──────────────────────────────────────────────────────

/// Construct a [`WaypointGraph`] incrementally, then call [`build`](Self::build).
///
/// # Example
///
/// ```
/// use mapf_graph::{Graph, WaypointGraphBuilder};
///
/// let mut b = WaypointGraphBuilder::new();
/// let a = b.add_waypoint(0.0, 0.0);
/// let c = b.add_waypoint(2.0, 0.0);
/// b.add_aisle(a, c);
/// let g = b.build().unwrap();
/// assert_eq!(g.node_count(), 2);
/// assert_eq!(g.edge_count(), 2); // bidirectional
/// ```
pub struct WaypointGraphBuilder {
    positions: Vec<[f64; 2]>,
    info:      Vec<NodeInfo>,
    raw_edges: Vec<(NodeId, NodeId)>,
    raw_lifts: Vec<RawElevator>,
}

struct RawElevator {
    from:        NodeId,
    to:          NodeId,
    travel_time: f64,
    elevator:    ElevatorId,
}

impl WaypointGraphBuilder {
    pub fn new() -> Self {
        Self {
            positions: Vec::new(),
            info:      Vec::new(),
            raw_edges: Vec::new(),
            raw_lifts: Vec::new(),
        }
    }

    /// A `cols × rows` grid with 4-connected bidirectional aisles and
    /// `spacing` metres between neighbours.  Node ids run row-major from the
    /// origin.
    pub fn grid(cols: u32, rows: u32, spacing: f64) -> Self {
        let mut b = Self::new();
        for r in 0..rows {
            for c in 0..cols {
                b.add_waypoint(c as f64 * spacing, r as f64 * spacing);
            }
        }
        for r in 0..rows {
            for c in 0..cols {
                let n = NodeId(r * cols + c);
                if c + 1 < cols {
                    b.add_aisle(n, NodeId(n.0 + 1));
                }
                if r + 1 < rows {
                    b.add_aisle(n, NodeId(n.0 + cols));
                }
            }
        }
        b
    }

    /// Add a waypoint and return its `NodeId` (sequential from 0).
    pub fn add_waypoint(&mut self, x: f64, y: f64) -> NodeId {
        let id = NodeId(self.positions.len() as u32);
        self.positions.push([x, y]);
        self.info.push(NodeInfo::default());
        id
    }

    pub fn set_info(&mut self, node: NodeId, info: NodeInfo) {
        if let Some(slot) = self.info.get_mut(node.index()) {
            *slot = info;
        }
    }

    /// Add a **directed** edge.  Length and heading come from the positions.
    pub fn add_directed_edge(&mut self, from: NodeId, to: NodeId) {
        self.raw_edges.push((from, to));
    }

    /// Add edges in both directions.
    pub fn add_aisle(&mut self, a: NodeId, b: NodeId) {
        self.add_directed_edge(a, b);
        self.add_directed_edge(b, a);
    }

    /// Add a one-way elevator ride.
    pub fn add_elevator_ride(&mut self, from: NodeId, to: NodeId, travel_time: f64, elevator: ElevatorId) {
        self.raw_lifts.push(RawElevator { from, to, travel_time, elevator });
    }

    pub fn node_count(&self) -> usize { self.positions.len() }
    pub fn edge_count(&self) -> usize { self.raw_edges.len() }

    fn check(&self, node: NodeId) -> GraphResult<()> {
        if node.index() < self.positions.len() {
            Ok(())
        } else {
            Err(GraphError::UnknownNode(node))
        }
    }

    /// Consume the builder and produce a [`WaypointGraph`].
    ///
    /// Fails if an edge references an unknown node or loops back onto its
    /// source.
    pub fn build(self) -> GraphResult<WaypointGraph> {
        for &(from, to) in &self.raw_edges {
            self.check(from)?;
            self.check(to)?;
            if from == to {
                return Err(GraphError::SelfLoop(from));
            }
        }
        for lift in &self.raw_lifts {
            self.check(lift.from)?;
            self.check(lift.to)?;
        }

        let node_count = self.positions.len();
        let positions  = &self.positions;
        let span = |from: NodeId, to: NodeId| {
            let (a, b) = (positions[from.index()], positions[to.index()]);
            ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
        };

        let mut edges: Vec<Edge> = self
            .raw_edges
            .iter()
            .map(|&(from, to)| Edge {
                from,
                to,
                distance: span(from, to),
                angle:    heading_deg(positions[from.index()], positions[to.index()]),
            })
            .collect();
        edges.sort_by_key(|e| e.from.0);

        let mut elevators: Vec<ElevatorEdge> = self
            .raw_lifts
            .iter()
            .map(|l| ElevatorEdge {
                from:        l.from,
                to:          l.to,
                distance:    span(l.from, l.to),
                travel_time: l.travel_time,
                elevator:    l.elevator,
            })
            .collect();
        elevators.sort_by_key(|e| e.from.0);

        let node_out_start     = row_pointer(node_count, edges.iter().map(|e| e.from));
        let elevator_out_start = row_pointer(node_count, elevators.iter().map(|e| e.from));

        let entries: Vec<WaypointEntry> = self
            .positions
            .iter()
            .enumerate()
            .map(|(i, &point)| WaypointEntry { point, id: NodeId(i as u32) })
            .collect();
        let spatial_idx = RTree::bulk_load(entries);

        Ok(WaypointGraph {
            positions: self.positions,
            node_info: self.info,
            node_out_start,
            edges,
            elevator_out_start,
            elevators,
            spatial_idx,
        })
    }
}

impl Default for WaypointGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// CSR row pointer from source nodes sorted ascending.
fn row_pointer(node_count: usize, sources: impl Iterator<Item = NodeId>) -> Vec<u32> {
    let mut start = vec![0u32; node_count + 1];
    for from in sources {
        start[from.index() + 1] += 1;
    }
    for i in 1..=node_count {
        start[i] += start[i - 1];
    }
    start
}
