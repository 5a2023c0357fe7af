//! The reservation table: one interval store per graph node.
//!
//! # Checkpoint windows
//!
//! A robot occupies a waypoint from the moment it starts approaching it until
//! it starts leaving towards the next one.  For checkpoints `(n_i, t_i)`,
//! `i = 0..k`, the windows are:
//!
//! ```text
//! first node      [t_0,     t_1)
//! interior node   [t_{i-1}, t_{i+1})
//! last node       [t_{k-1}, t_k)      or [t_{k-1}, inf) when it must stay free
//! ```
//!
//! [`ReservationTable::create_intervals`] builds the same windows for
//! insertion, except that the first one opens at a caller-chosen time (the
//! robot was already standing there) and the last one may be extended to
//! infinity with a separate parked window.
//!
//! # Touched-node tracking
//!
//! With `fast_clear`, the table remembers which nodes hold reservations so
//! `clear` and `reorganize` visit only those.

use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use mapf_core::{AgentId, Interval, NodeId, PlannerConfig, Tagging};
use mapf_graph::{Graph, Physics};

use crate::{Blocker, Checkpoints, Collision, DisjointIntervalStore, ReservationResult};

pub struct ReservationTable {
    stores:  Vec<Option<DisjointIntervalStore>>,
    touched: Option<FxHashSet<NodeId>>,
    tagging: Tagging,
}

impl ReservationTable {
    /// An empty table for a graph of `node_count` nodes.  Stores are created
    /// on first use.
    pub fn new(node_count: usize, tagging: Tagging, fast_clear: bool) -> Self {
        Self {
            stores:  vec![None; node_count],
            touched: fast_clear.then(FxHashSet::default),
            tagging,
        }
    }

    pub fn for_graph<G: Graph + ?Sized>(graph: &G, config: &PlannerConfig) -> Self {
        Self::new(graph.node_count(), config.tagging, config.fast_clear)
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.stores.len()
    }

    #[inline]
    pub fn tagging(&self) -> Tagging {
        self.tagging
    }

    /// The store of `node`, if anything was ever reserved there.
    #[inline]
    pub fn store(&self, node: NodeId) -> Option<&DisjointIntervalStore> {
        self.stores[node.index()].as_ref()
    }

    /// Nodes currently holding at least one reservation, ascending.
    pub fn occupied_nodes(&self) -> Vec<NodeId> {
        self.stores
            .iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .map(|s| s.node())
            .collect()
    }

    /// Total number of stored windows.
    pub fn reservation_count(&self) -> usize {
        self.stores.iter().flatten().map(|s| s.len()).sum()
    }

    // ── Insertion and removal ─────────────────────────────────────────────

    pub fn add(
        &mut self,
        node: NodeId,
        start: f64,
        end: f64,
        agent: Option<AgentId>,
        priority: Option<i32>,
    ) -> ReservationResult<()> {
        let tagging = self.tagging;
        let store = self.stores[node.index()].get_or_insert_with(|| DisjointIntervalStore::new(node, tagging));
        if let Some(touched) = &mut self.touched {
            touched.insert(node);
        }
        store.add(start, end, agent, priority)
    }

    #[inline]
    pub fn add_interval(&mut self, interval: &Interval, agent: Option<AgentId>, priority: Option<i32>) -> ReservationResult<()> {
        self.add(interval.node, interval.start, interval.end, agent, priority)
    }

    /// Reserve every interval, stopping at the first intersection.  Intervals
    /// added before the failure stay reserved.
    pub fn add_all(&mut self, intervals: &[Interval], agent: Option<AgentId>, priority: Option<i32>) -> ReservationResult<()> {
        intervals.iter().try_for_each(|iv| self.add_interval(iv, agent, priority))
    }

    /// Remove the stored window that `interval` was reserved as.
    ///
    /// Probes the window's midpoint, or one second after its start if it is
    /// open-ended.
    pub fn remove(&mut self, interval: &Interval) -> bool {
        let probe = if interval.is_open_ended() {
            interval.start + 1.0
        } else {
            interval.start / 2.0 + interval.end / 2.0
        };
        self.remove_intersection_with_time(interval.node, probe)
    }

    pub fn remove_all(&mut self, intervals: &[Interval]) {
        for iv in intervals {
            self.remove(iv);
        }
    }

    pub fn remove_intersection_with_time(&mut self, node: NodeId, time: f64) -> bool {
        let Some(store) = self.stores[node.index()].as_mut() else {
            return false;
        };
        let removed = store.remove_intersection_with_time(time);
        if store.is_empty() {
            if let Some(touched) = &mut self.touched {
                touched.remove(&node);
            }
        }
        removed
    }

    // ── Single-window queries ─────────────────────────────────────────────

    pub fn intersection_free(&self, node: NodeId, start: f64, end: f64) -> bool {
        self.store(node).is_none_or(|s| s.intersection_free(start, end))
    }

    pub fn blocker(&self, node: NodeId, start: f64, end: f64) -> Option<Blocker> {
        self.store(node)?.blocker(start, end)
    }

    pub fn collisions(&self, node: NodeId, start: f64, end: f64) -> Option<Vec<Collision>> {
        self.store(node)?.collisions(start, end)
    }

    /// The part of `interval` covered by the reservation blocking it.
    pub fn overlapping_interval(&self, interval: &Interval) -> Option<Interval> {
        let (start, end) = self.store(interval.node)?.overlapping_interval(interval.start, interval.end)?;
        Some(Interval::new(interval.node, start, end))
    }

    // ── Interval-list queries ─────────────────────────────────────────────

    pub fn all_intersection_free(&self, intervals: &[Interval]) -> bool {
        intervals.iter().all(|iv| self.intersection_free(iv.node, iv.start, iv.end))
    }

    /// The first blocked interval's blocker, in list order.
    pub fn first_blocker(&self, intervals: &[Interval]) -> Option<Blocker> {
        intervals.iter().find_map(|iv| self.blocker(iv.node, iv.start, iv.end))
    }

    /// Collisions of every interval in the list, or `None` if all are free.
    pub fn all_collisions(&self, intervals: &[Interval]) -> Option<Vec<Collision>> {
        gather(intervals.iter().map(|iv| self.collisions(iv.node, iv.start, iv.end)))
    }

    // ── Checkpoint queries ────────────────────────────────────────────────

    /// `true` if every checkpoint window is free.  With `free_after_last`,
    /// the final node must also stay free forever after arrival.
    pub fn checkpoints_free(&self, checkpoints: &Checkpoints, free_after_last: bool) -> bool {
        query_windows(checkpoints, free_after_last).all(|w| self.intersection_free(w.node, w.start, w.end))
    }

    pub fn checkpoints_blocker(&self, checkpoints: &Checkpoints, free_after_last: bool) -> Option<Blocker> {
        query_windows(checkpoints, free_after_last).find_map(|w| self.blocker(w.node, w.start, w.end))
    }

    pub fn checkpoints_collisions(&self, checkpoints: &Checkpoints, free_after_last: bool) -> Option<Vec<Collision>> {
        gather(query_windows(checkpoints, free_after_last).map(|w| self.collisions(w.node, w.start, w.end)))
    }

    // ── Interval construction ─────────────────────────────────────────────

    /// Occupancy windows for a checkpoint sequence.
    ///
    /// The first window opens at `start_interval_at`.  With
    /// `add_to_infinity`, the final node additionally gets an open-ended
    /// window from its arrival time.
    pub fn create_intervals(start_interval_at: f64, checkpoints: &Checkpoints, add_to_infinity: bool) -> Vec<Interval> {
        let (nodes, times) = (&checkpoints.nodes, &checkpoints.times);
        let n = nodes.len();
        let mut intervals = Vec::with_capacity(n + 1);

        for i in 0..n {
            let open = if i == 0 { start_interval_at } else { times[i - 1] };
            let close = if i + 1 < n { times[i + 1] } else { times[i] };
            intervals.push(Interval { node: nodes[i], start: open, end: close });
        }
        if add_to_infinity {
            if let (Some(&node), Some(&arrival)) = (nodes.last(), times.last()) {
                intervals.push(Interval::open_ended(node, arrival));
            }
        }
        intervals
    }

    /// Windows for one straight hop, or `None` if the graph has no straight
    /// connection from `from` to `to`.
    ///
    /// `start_interval_at` is when the robot began holding `from`;
    /// `start_driving_at` is when it leaves.  A robot that is already moving
    /// holds `from` only from before it started driving.
    #[allow(clippy::too_many_arguments)]
    pub fn create_hop_intervals<G, Ph>(
        graph: &G,
        physics: &Ph,
        start_interval_at: f64,
        start_driving_at: f64,
        current_speed: f64,
        from: NodeId,
        to: NodeId,
        add_to_infinity: bool,
    ) -> Option<Vec<Interval>>
    where
        G: Graph + ?Sized,
        Ph: Physics + ?Sized,
    {
        debug_assert!(
            current_speed <= 0.0 || start_interval_at < start_driving_at,
            "a moving robot must have held its start node before driving"
        );
        let checkpoints = Checkpoints::for_hop(graph, physics, start_driving_at, current_speed, from, to)?;
        Some(Self::create_intervals(start_interval_at, &checkpoints, add_to_infinity))
    }

    /// Windows for a multi-hop route leaving `route[0]` at `depart_at`,
    /// holding it from `hold_from`.
    pub fn create_route_intervals<G, Ph>(
        graph: &G,
        physics: &Ph,
        hold_from: f64,
        depart_at: f64,
        route: &[NodeId],
        add_to_infinity: bool,
    ) -> Option<Vec<Interval>>
    where
        G: Graph + ?Sized,
        Ph: Physics + ?Sized,
    {
        let checkpoints = Checkpoints::for_route(graph, physics, depart_at, route)?;
        Some(Self::create_intervals(hold_from, &checkpoints, add_to_infinity))
    }

    // ── Housekeeping ──────────────────────────────────────────────────────

    /// Drop every window that ended before `current_time`.
    pub fn reorganize(&mut self, current_time: f64) {
        let mut dropped = 0usize;
        match &mut self.touched {
            Some(touched) => {
                let stores = &mut self.stores;
                touched.retain(|node| match stores[node.index()].as_mut() {
                    Some(store) => {
                        dropped += store.reorganize(current_time);
                        !store.is_empty()
                    }
                    None => false,
                });
            }
            None => {
                for store in self.stores.iter_mut().flatten() {
                    dropped += store.reorganize(current_time);
                }
            }
        }
        trace!(current_time, dropped, "reservation table reorganized");
    }

    /// Remove every reservation.
    pub fn clear(&mut self) {
        match &mut self.touched {
            Some(touched) => {
                for node in touched.drain() {
                    if let Some(store) = self.stores[node.index()].as_mut() {
                        store.clear();
                    }
                }
            }
            None => {
                for store in self.stores.iter_mut().flatten() {
                    store.clear();
                }
            }
        }
        debug!("reservation table cleared");
    }

    pub fn clear_node(&mut self, node: NodeId) {
        if let Some(store) = self.stores[node.index()].as_mut() {
            store.clear();
        }
        if let Some(touched) = &mut self.touched {
            touched.remove(&node);
        }
    }
}

/// Query windows of a checkpoint sequence, per the table in the module docs.
/// A single checkpoint is queried as `[t_0, inf)` with `free_after_last`, or
/// as the instant `t_0` otherwise.
fn query_windows(checkpoints: &Checkpoints, free_after_last: bool) -> impl Iterator<Item = Interval> + '_ {
    let (nodes, times) = (&checkpoints.nodes, &checkpoints.times);
    let n = nodes.len();
    (0..n).map(move |i| {
        let open = if i == 0 { times[0] } else { times[i - 1] };
        let close = if i + 1 < n {
            times[i + 1]
        } else if free_after_last {
            f64::INFINITY
        } else {
            times[i]
        };
        Interval { node: nodes[i], start: open, end: close }
    })
}

/// Concatenate per-window collision lists; `None` if every window was free.
fn gather(results: impl Iterator<Item = Option<Vec<Collision>>>) -> Option<Vec<Collision>> {
    let mut all: Option<Vec<Collision>> = None;
    for found in results.flatten() {
        all.get_or_insert_with(Vec::new).extend(found);
    }
    all
}
