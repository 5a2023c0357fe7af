//! The conflict tree: an arena of branch nodes, each adding one constraint.
//!
//! # Layout
//!
//! ```text
//! nodes[0]  root       agent: None      solutions: every agent
//! nodes[1]  ├─ child   agent: Some(a1)  constraint: (n, [5, 10))  solutions: a1 only
//! nodes[2]  └─ child   agent: Some(a2)  constraint: (n, [5, 10))  solutions: a2 only
//! ```
//!
//! Parents and children refer to each other by [`TreeNodeId`], so the tree
//! owns every node and there are no reference cycles.  A non-root node only
//! stores the solution of the agent it constrains; every other agent's
//! solution is found by walking towards the root.  Children never touch
//! their ancestors, so an abandoned branch can simply be left behind.

use std::fmt::Write as _;

use rustc_hash::FxHashMap;

use mapf_core::{AgentId, Interval, Tagging, TreeNodeId};
use mapf_reservation::ReservationTable;

// ── Solution ──────────────────────────────────────────────────────────────────

/// One agent's route together with the reservation windows it needs.
#[derive(Clone, Debug, PartialEq)]
pub struct Solution<R> {
    pub route:        R,
    pub reservations: Vec<Interval>,
}

impl<R> Solution<R> {
    pub fn new(route: R, reservations: Vec<Interval>) -> Self {
        Self { route, reservations }
    }

    /// See [`reservation_cost`]: an open-ended parking window adds nothing.
    #[inline]
    pub fn cost(&self) -> f64 {
        reservation_cost(&self.reservations)
    }
}

/// Time from the first window's start to the last finite window end, or `0`
/// for an empty list.  A trailing open-ended parking window does not count,
/// so costs stay finite and can be subtracted from one another.
pub fn reservation_cost(reservations: &[Interval]) -> f64 {
    let Some(first) = reservations.first() else {
        return 0.0;
    };
    reservations
        .iter()
        .rev()
        .map(|w| w.end)
        .find(|end| end.is_finite())
        .map_or(0.0, |end| end - first.start)
}

// ── Node ──────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct Node<R> {
    parent:        Option<TreeNodeId>,
    children:      Vec<Option<TreeNodeId>>,
    agent:         Option<AgentId>,
    constraint:    Option<Interval>,
    solutions:     FxHashMap<AgentId, Solution<R>>,
    solution_cost: f64,
    depth:         usize,
}

impl<R> Node<R> {
    fn new(
        parent: Option<TreeNodeId>,
        agent: Option<AgentId>,
        constraint: Option<Interval>,
        branching_factor: usize,
        solution_cost: f64,
        depth: usize,
    ) -> Self {
        Self {
            parent,
            children: vec![None; branching_factor],
            agent,
            constraint,
            solutions: FxHashMap::default(),
            solution_cost,
            depth,
        }
    }
}

// ── ConflictTree ──────────────────────────────────────────────────────────────

/// Arena-backed conflict tree.  `R` is the route type produced by the
/// low-level planner.
#[derive(Clone, Debug)]
pub struct ConflictTree<R> {
    nodes:            Vec<Node<R>>,
    branching_factor: usize,
}

impl<R> ConflictTree<R> {
    /// A tree holding only the root.
    ///
    /// # Panics
    ///
    /// If `branching_factor` is zero.
    pub fn new(branching_factor: usize) -> Self {
        assert!(branching_factor > 0, "a conflict tree needs at least one child slot per node");
        Self {
            nodes: vec![Node::new(None, None, None, branching_factor, 0.0, 0)],
            branching_factor,
        }
    }

    #[inline]
    pub fn root(&self) -> TreeNodeId {
        TreeNodeId::ROOT
    }

    #[inline]
    pub fn branching_factor(&self) -> usize {
        self.branching_factor
    }

    /// Number of nodes, the root included.
    #[inline]
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    // ── Structure ─────────────────────────────────────────────────────────

    /// Attach a child to `parent` in its first free slot, constraining
    /// `agent` off `constraint.node` during `constraint`.
    ///
    /// The child starts with the parent's solution cost until
    /// [`set_solution`](Self::set_solution) records the agent's new plan.
    ///
    /// # Panics
    ///
    /// If every child slot of `parent` is taken.
    pub fn add_child(&mut self, parent: TreeNodeId, agent: AgentId, constraint: Interval) -> TreeNodeId {
        debug_assert!(!constraint.is_degenerate(), "degenerate constraint {constraint} for {agent} under {parent}");
        let id = TreeNodeId(self.nodes.len() as u32);
        let (depth, cost) = {
            let p = &self.nodes[parent.index()];
            (p.depth + 1, p.solution_cost)
        };

        let branching_factor = self.branching_factor;
        match self.nodes[parent.index()].children.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => *slot = Some(id),
            None => panic!("{parent} already has {branching_factor} children"),
        }

        self.nodes.push(Node::new(Some(parent), Some(agent), Some(constraint), branching_factor, cost, depth));
        debug_assert!(self.validate(id), "constraints of {agent} overlap at {id}:\n{}", self.constraint_trail(id));
        id
    }

    #[inline]
    pub fn parent(&self, node: TreeNodeId) -> Option<TreeNodeId> {
        self.nodes[node.index()].parent
    }

    /// Occupied child slots of `node`, in slot order.
    pub fn children(&self, node: TreeNodeId) -> impl Iterator<Item = TreeNodeId> + '_ {
        self.nodes[node.index()].children.iter().flatten().copied()
    }

    #[inline]
    pub fn depth(&self, node: TreeNodeId) -> usize {
        self.nodes[node.index()].depth
    }

    /// The agent constrained by `node`; `None` for the root.
    #[inline]
    pub fn agent(&self, node: TreeNodeId) -> Option<AgentId> {
        self.nodes[node.index()].agent
    }

    #[inline]
    pub fn constraint(&self, node: TreeNodeId) -> Option<Interval> {
        self.nodes[node.index()].constraint
    }

    // ── Solutions ─────────────────────────────────────────────────────────

    /// Record `agent`'s plan at `node` and update the node's cost.
    ///
    /// At the root the cost is the sum over all agents.  Elsewhere it is the
    /// parent's cost with `agent`'s share replaced by the new plan's.
    pub fn set_solution(&mut self, node: TreeNodeId, agent: AgentId, route: R, reservations: Vec<Interval>) {
        let new_cost = reservation_cost(&reservations);
        let parent = self.nodes[node.index()].parent;
        debug_assert!(
            parent.is_none() || self.nodes[node.index()].agent == Some(agent),
            "{node} may only store a solution for the agent it constrains"
        );

        let cost = match parent {
            Some(p) => self.nodes[p.index()].solution_cost - self.cost_of(p, agent) + new_cost,
            None => 0.0,
        };

        let entry = &mut self.nodes[node.index()];
        entry.solutions.insert(agent, Solution::new(route, reservations));
        entry.solution_cost = match parent {
            Some(_) => cost,
            None => entry.solutions.values().map(Solution::cost).sum(),
        };
    }

    /// The plan of `agent` in effect at `node`: the one stored by the
    /// nearest ancestor, `node` included.  `None` before the root has a plan
    /// for `agent`.
    pub fn entry(&self, node: TreeNodeId, agent: AgentId) -> Option<&Solution<R>> {
        let mut current = Some(node);
        while let Some(id) = current {
            let n = &self.nodes[id.index()];
            if let Some(solution) = n.solutions.get(&agent) {
                return Some(solution);
            }
            debug_assert!(n.agent != Some(agent), "{id} constrains {agent} but stores no solution for it");
            current = n.parent;
        }
        None
    }

    /// The route of `agent` in effect at `node`.
    pub fn solution(&self, node: TreeNodeId, agent: AgentId) -> Option<&R> {
        self.entry(node, agent).map(|s| &s.route)
    }

    /// The reservation windows of `agent` in effect at `node`.
    pub fn reservation(&self, node: TreeNodeId, agent: AgentId) -> Option<&[Interval]> {
        self.entry(node, agent).map(|s| s.reservations.as_slice())
    }

    #[inline]
    pub fn solution_cost(&self, node: TreeNodeId) -> f64 {
        self.nodes[node.index()].solution_cost
    }

    /// `agent`'s share of the cost at `node`.
    pub fn cost_of(&self, node: TreeNodeId, agent: AgentId) -> f64 {
        self.reservation(node, agent).map_or(0.0, reservation_cost)
    }

    /// Every agent planned at the root, in ascending id order.
    pub fn agents(&self) -> Vec<AgentId> {
        let mut agents: Vec<AgentId> = self.nodes[0].solutions.keys().copied().collect();
        agents.sort_unstable();
        agents
    }

    /// The joint plan in effect at `node`, in ascending agent order.
    pub fn joint_solution(&self, node: TreeNodeId) -> Vec<(AgentId, &Solution<R>)> {
        self.agents()
            .into_iter()
            .filter_map(|agent| self.entry(node, agent).map(|s| (agent, s)))
            .collect()
    }

    // ── Constraints ───────────────────────────────────────────────────────

    /// Nodes from `node` up to the root whose constraint applies to `agent`,
    /// nearest first.
    pub fn constraints(&self, node: TreeNodeId, agent: AgentId) -> Constraints<'_, R> {
        Constraints { tree: self, next: Some(node), agent }
    }

    /// The windows `agent` must stay out of at `node`.
    pub fn constraint_intervals(&self, node: TreeNodeId, agent: AgentId) -> Vec<Interval> {
        self.constraints(node, agent).filter_map(|id| self.constraint(id)).collect()
    }

    /// `true` if the constraints accumulated for `node`'s agent are pairwise
    /// disjoint.  The root is always valid.
    pub fn validate(&self, node: TreeNodeId) -> bool {
        let Some(agent) = self.agent(node) else {
            return true;
        };
        let windows = self.constraint_intervals(node, agent);
        let node_count = windows.iter().map(|w| w.node.index() + 1).max().unwrap_or(0);

        let mut table = ReservationTable::new(node_count, Tagging::None, false);
        windows.iter().all(|w| table.add_interval(w, None, None).is_ok())
    }

    /// One line per constraint from `node` up to the root, e.g.
    /// `Agent 2: (14) 5 - 10`.
    pub fn constraint_trail(&self, node: TreeNodeId) -> String {
        let mut out = String::new();
        let mut current = Some(node);
        while let Some(id) = current {
            let n = &self.nodes[id.index()];
            if let (Some(agent), Some(c)) = (n.agent, n.constraint) {
                let _ = writeln!(out, "Agent {}: ({}) {} - {}", agent.0, c.node.0, c.start, c.end);
            }
            current = n.parent;
        }
        out
    }
}

impl<R> Default for ConflictTree<R> {
    fn default() -> Self {
        Self::new(2)
    }
}

// ── Constraints iterator ──────────────────────────────────────────────────────

/// Lazy walk returned by [`ConflictTree::constraints`].
pub struct Constraints<'a, R> {
    tree:  &'a ConflictTree<R>,
    next:  Option<TreeNodeId>,
    agent: AgentId,
}

impl<R> Iterator for Constraints<'_, R> {
    type Item = TreeNodeId;

    fn next(&mut self) -> Option<TreeNodeId> {
        while let Some(id) = self.next {
            let node = &self.tree.nodes[id.index()];
            self.next = node.parent;
            if node.agent == Some(self.agent) {
                return Some(id);
            }
        }
        None
    }
}
