//! The conflict-based search loop.
//!
//! ```text
//! root ← plan every agent without constraints
//! open ← { root }
//! loop:
//!   node ← cheapest open node (cost, then depth, then insertion order)
//!   conflict ← first overlap in node's joint plan
//!   none?   → accept node
//!   budget? → give up, reporting node as the best plan so far
//!   for each agent of the conflict:
//!     child ← node + "agent stays off conflict.node during conflict.window"
//!     re-plan agent under child's constraints (parallel with `parallel`)
//!     failed? → prune child, else push child
//! open empty → infeasible
//! ```

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use mapf_core::{AgentId, Interval, NodeId, PlannerConfig, Tagging, TreeNodeId, TOLERANCE};
use mapf_heap::{FibonacciHeap, HeapDirection};
use mapf_reservation::ReservationTable;

use crate::{ConflictTree, LowLevelPlanner, SearchError, SearchObserver, SearchResult, Solution};

// ── Conflict ──────────────────────────────────────────────────────────────────

/// Two agents holding the same node at overlapping times.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Conflict {
    pub node:   NodeId,
    /// The shared part of the two reservations.
    pub window: Interval,
    /// The agent whose reservation was already in place.
    pub first:  AgentId,
    /// The agent whose reservation ran into it.
    pub second: AgentId,
}

/// The first conflict in a joint plan, scanning agents in the given order
/// and each agent's windows in time order.
///
/// Degenerate windows hold nothing and are skipped.  An agent's own windows
/// on one node are merged before the scan, so they never conflict with each
/// other but are still checked against every other agent.  Two windows
/// sharing less than [`TOLERANCE`] merely touch.
pub fn find_conflict<R>(joint: &[(AgentId, &Solution<R>)]) -> Option<Conflict> {
    let node_count = joint
        .iter()
        .flat_map(|(_, s)| s.reservations.iter())
        .map(|w| w.node.index() + 1)
        .max()
        .unwrap_or(0);
    let mut table = ReservationTable::new(node_count, Tagging::AgentIds, true);

    for &(agent, solution) in joint {
        for window in merge_own_windows(&solution.reservations) {
            if let Some(conflict) = first_foreign_overlap(&table, agent, &window) {
                return Some(conflict);
            }
            let inserted = table.add_interval(&window, Some(agent), None);
            debug_assert!(inserted.is_ok(), "{window} of {agent} clears every other agent but was refused");
        }
    }
    None
}

/// The first stored reservation of another agent sharing at least
/// [`TOLERANCE`] with `window`.
fn first_foreign_overlap(table: &ReservationTable, agent: AgentId, window: &Interval) -> Option<Conflict> {
    table.collisions(window.node, window.start, window.end)?.into_iter().find_map(|c| {
        let first = c.agent.filter(|&other| other != agent)?;
        let (start, end) = (c.start.max(window.start), c.end.min(window.end));
        (end - start >= TOLERANCE).then(|| Conflict {
            node: window.node,
            window: Interval::new(window.node, start, end),
            first,
            second: agent,
        })
    })
}

/// Non-degenerate windows, overlapping ones on the same node joined, sorted
/// by start.
fn merge_own_windows(windows: &[Interval]) -> Vec<Interval> {
    let mut sorted: Vec<Interval> = windows.iter().filter(|w| !w.is_degenerate()).copied().collect();
    sorted.sort_by(|a, b| a.node.cmp(&b.node).then(a.start.total_cmp(&b.start)));

    let mut merged: Vec<Interval> = Vec::with_capacity(sorted.len());
    for w in sorted {
        match merged.last_mut() {
            Some(last) if last.node == w.node && w.start < last.end => last.end = last.end.max(w.end),
            _ => merged.push(w),
        }
    }
    merged.sort_by(|a, b| a.start.total_cmp(&b.start));
    merged
}

// ── Outcome ───────────────────────────────────────────────────────────────────

/// A joint plan read from one tree node.
#[derive(Clone, Debug)]
pub struct JointPlan<R> {
    pub node:       TreeNodeId,
    pub cost:       f64,
    pub solutions:  BTreeMap<AgentId, Solution<R>>,
    /// Nodes taken from the open list and branched.
    pub expansions: usize,
    pub tree_size:  usize,
}

#[derive(Clone, Debug)]
pub enum SearchOutcome<R> {
    /// A conflict-free joint plan of minimum cost among the explored nodes.
    Solved(JointPlan<R>),
    /// The expansion or time budget ran out.  `best` is the cheapest node
    /// still waiting to be branched; its plan has conflicts.
    BudgetExhausted { best: Option<JointPlan<R>> },
    /// Every branch was pruned.
    Infeasible,
}

impl<R> SearchOutcome<R> {
    pub fn solved(&self) -> Option<&JointPlan<R>> {
        match self {
            SearchOutcome::Solved(plan) => Some(plan),
            _ => None,
        }
    }
}

// ── Open list key ─────────────────────────────────────────────────────────────

/// Compared field by field: cheaper first, then shallower, then older.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
struct OpenKey {
    cost:  f64,
    depth: usize,
    seq:   u64,
}

// ── ConflictSearch ────────────────────────────────────────────────────────────

/// Conflict-based search over a [`ConflictTree`].
///
/// Each call to [`run`](Self::run) builds its own tree and tables, so one
/// `ConflictSearch` may serve many planning episodes.
pub struct ConflictSearch<P: LowLevelPlanner> {
    planner:          P,
    branching_factor: usize,
    max_expansions:   usize,
    time_budget:      Option<Duration>,
}

impl<P: LowLevelPlanner> ConflictSearch<P> {
    /// Fails if `config` does not validate.
    pub fn new(planner: P, config: &PlannerConfig) -> SearchResult<Self> {
        config.validate()?;
        Ok(Self {
            planner,
            branching_factor: config.branching_factor,
            max_expansions:   config.max_expansions,
            time_budget:      config.time_budget_ms.map(Duration::from_millis),
        })
    }

    pub fn planner(&self) -> &P {
        &self.planner
    }

    /// Search a conflict-free joint plan for `agents`.
    ///
    /// Duplicate ids are planned once.  Errors only if there are no agents or
    /// an agent has no route even without constraints.
    pub fn run<O: SearchObserver>(
        &self,
        agents: &[AgentId],
        observer: &mut O,
    ) -> SearchResult<SearchOutcome<P::Route>> {
        let mut agents = agents.to_vec();
        agents.sort_unstable();
        agents.dedup();
        if agents.is_empty() {
            return Err(SearchError::NoAgents);
        }

        let started = Instant::now();
        let mut tree = ConflictTree::new(self.branching_factor);
        let root = tree.root();
        for &agent in &agents {
            let solution = self.planner.plan(agent, &[]).ok_or(SearchError::RootUnplannable(agent))?;
            tree.set_solution(root, agent, solution.route, solution.reservations);
        }
        debug!(agents = agents.len(), cost = tree.solution_cost(root), "root planned");

        let mut open = FibonacciHeap::new(HeapDirection::Increasing);
        let mut seq = 0u64;
        open.enqueue(OpenKey { cost: tree.solution_cost(root), depth: 0, seq }, root);
        let mut expansions = 0usize;

        while let Some((key, node)) = open.dequeue() {
            let conflict = find_conflict(&tree.joint_solution(node));
            let Some(conflict) = conflict else {
                debug!(%node, cost = key.cost, expansions, tree_size = tree.size(), "conflict-free plan accepted");
                observer.on_solution(node, key.cost);
                return Ok(SearchOutcome::Solved(self.joint_plan(&tree, node, expansions)));
            };

            let out_of_time = self.time_budget.is_some_and(|b| started.elapsed() >= b);
            if expansions >= self.max_expansions || out_of_time {
                warn!(expansions, elapsed_ms = started.elapsed().as_millis() as u64, "search budget exhausted");
                return Ok(SearchOutcome::BudgetExhausted {
                    best: Some(self.joint_plan(&tree, node, expansions)),
                });
            }

            expansions += 1;
            observer.on_expand(node, key.cost, key.depth);
            observer.on_conflict(node, &conflict);
            trace!(
                %node,
                cost = key.cost,
                first = %conflict.first,
                second = %conflict.second,
                window = %conflict.window,
                "branching on conflict"
            );

            // Tree mutation stays here; only the re-plans may run in parallel.
            let requests: Vec<(TreeNodeId, AgentId, Vec<Interval>)> = [conflict.first, conflict.second]
                .into_iter()
                .map(|agent| {
                    let child = tree.add_child(node, agent, conflict.window);
                    (child, agent, tree.constraint_intervals(child, agent))
                })
                .collect();

            for ((child, agent, _), plan) in requests.iter().zip(self.replan(&requests)) {
                match plan {
                    Some(solution) => {
                        tree.set_solution(*child, *agent, solution.route, solution.reservations);
                        seq += 1;
                        let key = OpenKey { cost: tree.solution_cost(*child), depth: tree.depth(*child), seq };
                        open.enqueue(key, *child);
                    }
                    None => {
                        trace!(node = %child, %agent, "branch pruned");
                        observer.on_prune(*child, *agent);
                    }
                }
            }
        }

        debug!(expansions, tree_size = tree.size(), "open list exhausted");
        Ok(SearchOutcome::Infeasible)
    }

    fn replan(&self, requests: &[(TreeNodeId, AgentId, Vec<Interval>)]) -> Vec<Option<Solution<P::Route>>> {
        #[cfg(not(feature = "parallel"))]
        {
            requests
                .iter()
                .map(|(_, agent, constraints)| self.planner.plan(*agent, constraints))
                .collect()
        }

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;

            requests
                .par_iter()
                .map(|(_, agent, constraints)| self.planner.plan(*agent, constraints))
                .collect()
        }
    }

    fn joint_plan(&self, tree: &ConflictTree<P::Route>, node: TreeNodeId, expansions: usize) -> JointPlan<P::Route> {
        JointPlan {
            node,
            cost: tree.solution_cost(node),
            solutions: tree
                .joint_solution(node)
                .into_iter()
                .map(|(agent, s)| (agent, s.clone()))
                .collect(),
            expansions,
            tree_size: tree.size(),
        }
    }
}
