//! Tests for the conflict tree and the search driver.

use mapf_core::{AgentId, Interval, NodeId, PlannerConfig, TreeNodeId};
use mapf_graph::{ConstantSpeed, WaypointGraph, WaypointGraphBuilder};

use crate::{ConflictTree, FixedRoutePlanner};

// ── Helpers ───────────────────────────────────────────────────────────────────

const N: NodeId = NodeId(4);

fn iv(node: u32, start: f64, end: f64) -> Interval {
    Interval::new(NodeId(node), start, end)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter("trace").with_test_writer().try_init();
}

/// 3 × 3 grid, 1 m spacing:
///
/// ```text
/// 6 7 8
/// 3 4 5
/// 0 1 2
/// ```
fn grid() -> WaypointGraph {
    WaypointGraphBuilder::grid(3, 3, 1.0).build().unwrap()
}

/// Agent 0 drives 3 → 4 → 5, agent 1 drives 1 → 4 → 7; both cross node 4
/// during `[0, 2]` if they leave at once.
fn crossing_planner(max_delay: f64) -> FixedRoutePlanner<WaypointGraph, ConstantSpeed> {
    let mut p = FixedRoutePlanner::new(grid(), ConstantSpeed::new(1.0).unwrap(), 1.0, max_delay);
    p.add_route(AgentId(0), vec![NodeId(3), NodeId(4), NodeId(5)], 0.0);
    p.add_route(AgentId(1), vec![NodeId(1), NodeId(4), NodeId(7)], 0.0);
    p
}

/// Root with two agents whose plans cost 10 and 4.
fn two_agent_tree() -> ConflictTree<Vec<NodeId>> {
    let mut t = ConflictTree::default();
    t.set_solution(TreeNodeId::ROOT, AgentId(1), vec![N], vec![iv(4, 0.0, 10.0)]);
    t.set_solution(TreeNodeId::ROOT, AgentId(2), vec![NodeId(2), N], vec![iv(2, 2.0, 4.0), iv(4, 4.0, 6.0)]);
    t
}

// ── ConflictTree ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tree {
    use super::*;
    use crate::reservation_cost;

    #[test]
    fn fresh_tree_has_only_the_root() {
        let t: ConflictTree<()> = ConflictTree::new(3);
        assert_eq!(t.size(), 1);
        assert_eq!(t.depth(t.root()), 0);
        assert_eq!(t.agent(t.root()), None);
        assert_eq!(t.constraint(t.root()), None);
        assert_eq!(t.parent(t.root()), None);
        assert_eq!(t.solution_cost(t.root()), 0.0);
        assert!(t.validate(t.root()));
        assert_eq!(t.branching_factor(), 3);
    }

    #[test]
    fn root_cost_sums_agents() {
        let t = two_agent_tree();
        assert_eq!(t.solution_cost(t.root()), 14.0);
        assert_eq!(t.cost_of(t.root(), AgentId(1)), 10.0);
        assert_eq!(t.cost_of(t.root(), AgentId(9)), 0.0);
        assert_eq!(t.agents(), vec![AgentId(1), AgentId(2)]);
    }

    #[test]
    fn child_cost_replaces_one_share() {
        let mut t = two_agent_tree();
        let root = t.root();
        let child = t.add_child(root, AgentId(2), iv(4, 4.0, 6.0));
        assert_eq!(t.depth(child), 1);
        assert_eq!(t.parent(child), Some(root));

        t.set_solution(child, AgentId(2), vec![NodeId(2), N], vec![iv(2, 2.0, 10.0), iv(4, 10.0, 12.0)]);
        let expected = t.solution_cost(root) - t.cost_of(root, AgentId(2)) + 10.0;
        assert_eq!(t.solution_cost(child), expected);
        assert_eq!(t.solution_cost(child), 20.0);
    }

    #[test]
    fn other_agents_are_inherited() {
        let mut t = two_agent_tree();
        let root = t.root();
        let child = t.add_child(root, AgentId(2), iv(4, 4.0, 6.0));
        t.set_solution(child, AgentId(2), vec![], vec![iv(2, 2.0, 10.0)]);

        assert_eq!(t.solution(child, AgentId(1)), t.solution(root, AgentId(1)));
        assert_eq!(t.reservation(child, AgentId(1)), t.reservation(root, AgentId(1)));
        assert_ne!(t.reservation(child, AgentId(2)), t.reservation(root, AgentId(2)));
        assert_eq!(t.solution(child, AgentId(7)), None);
    }

    #[test]
    fn grandchild_inherits_through_sibling_branches() {
        let mut t = two_agent_tree();
        let root = t.root();
        let a = t.add_child(root, AgentId(1), iv(4, 0.0, 1.0));
        t.set_solution(a, AgentId(1), vec![N], vec![iv(4, 1.0, 11.0)]);
        let b = t.add_child(a, AgentId(2), iv(2, 2.0, 3.0));
        t.set_solution(b, AgentId(2), vec![], vec![iv(2, 3.0, 5.0)]);

        assert_eq!(t.reservation(b, AgentId(1)), Some(&[iv(4, 1.0, 11.0)][..]));
        assert_eq!(t.solution_cost(b), 10.0 + 2.0);
        assert_eq!(t.joint_solution(b).len(), 2);
    }

    #[test]
    fn constraints_are_nearest_first_and_per_agent() {
        let mut t: ConflictTree<()> = ConflictTree::default();
        let root = t.root();
        let a = t.add_child(root, AgentId(1), iv(4, 0.0, 1.0));
        let b = t.add_child(a, AgentId(2), iv(5, 0.0, 1.0));
        let c = t.add_child(b, AgentId(1), iv(4, 2.0, 3.0));

        assert_eq!(t.constraints(c, AgentId(1)).collect::<Vec<_>>(), vec![c, a]);
        assert_eq!(t.constraints(c, AgentId(2)).collect::<Vec<_>>(), vec![b]);
        assert_eq!(t.constraint_intervals(c, AgentId(1)), vec![iv(4, 2.0, 3.0), iv(4, 0.0, 1.0)]);
        assert_eq!(t.constraints(root, AgentId(1)).count(), 0);
        assert!(t.validate(c));
        assert_eq!(t.size(), 4);
    }

    #[test]
    fn children_fill_slots_in_order() {
        let mut t: ConflictTree<()> = ConflictTree::new(3);
        let root = t.root();
        let kids: Vec<_> = (0..3).map(|i| t.add_child(root, AgentId(i), iv(0, 0.0, 1.0))).collect();
        assert_eq!(t.children(root).collect::<Vec<_>>(), kids);
        assert_eq!(t.children(kids[0]).count(), 0);
    }

    #[test]
    #[should_panic]
    fn full_parent_panics() {
        let mut t: ConflictTree<()> = ConflictTree::default();
        let root = t.root();
        for i in 0..3 {
            t.add_child(root, AgentId(i), iv(0, 0.0, 1.0));
        }
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic]
    fn overlapping_constraints_are_a_bug() {
        let mut t: ConflictTree<()> = ConflictTree::default();
        let root = t.root();
        let a = t.add_child(root, AgentId(1), iv(4, 0.0, 5.0));
        t.add_child(a, AgentId(1), iv(4, 3.0, 8.0));
    }

    #[test]
    fn constraint_trail_lists_ancestors() {
        let mut t: ConflictTree<()> = ConflictTree::default();
        let root = t.root();
        let a = t.add_child(root, AgentId(1), iv(4, 0.0, 1.0));
        let b = t.add_child(a, AgentId(2), iv(14, 5.0, 10.0));
        assert_eq!(t.constraint_trail(b), "Agent 2: (14) 5 - 10\nAgent 1: (4) 0 - 1\n");
        assert_eq!(t.constraint_trail(root), "");
    }

    #[test]
    fn parking_does_not_count_toward_cost() {
        assert_eq!(reservation_cost(&[]), 0.0);
        assert_eq!(reservation_cost(&[iv(1, 2.0, 5.0), Interval::open_ended(NodeId(1), 5.0)]), 3.0);
        assert_eq!(reservation_cost(&[Interval::open_ended(NodeId(1), 5.0)]), 0.0);
    }
}

// ── Two agents, one shared node ───────────────────────────────────────────────

#[cfg(test)]
mod shared_node {
    use super::*;
    use crate::find_conflict;
    use mapf_core::Tagging;
    use mapf_reservation::{ReservationError, ReservationTable};

    #[test]
    fn conflict_branches_into_single_constraints() {
        init_tracing();
        let mut table = ReservationTable::new(8, Tagging::AgentIds, true);
        table.add(N, 0.0, 10.0, Some(AgentId(1)), None).unwrap();
        assert!(!table.intersection_free(N, 5.0, 15.0));
        assert!(matches!(
            table.add(N, 5.0, 15.0, Some(AgentId(2)), None),
            Err(ReservationError::IntervalIntersection { node: N, .. })
        ));

        let mut t = ConflictTree::default();
        let root = t.root();
        t.set_solution(root, AgentId(1), (), vec![iv(4, 0.0, 10.0)]);
        t.set_solution(root, AgentId(2), (), vec![iv(4, 5.0, 15.0)]);

        let conflict = find_conflict(&t.joint_solution(root)).unwrap();
        assert_eq!(conflict.node, N);
        assert_eq!((conflict.first, conflict.second), (AgentId(1), AgentId(2)));
        assert_eq!(conflict.window, iv(4, 5.0, 10.0));

        for agent in [conflict.first, conflict.second] {
            let child = t.add_child(root, agent, conflict.window);
            let constraints = t.constraint_intervals(child, agent);
            assert_eq!(constraints.len(), 1);
            assert!(constraints[0].overlaps(&iv(4, 0.0, 10.0)));
            assert!(t.validate(child));
        }
        assert_eq!(t.children(root).count(), 2);
    }

    #[test]
    fn touching_windows_do_not_conflict() {
        let mut t = ConflictTree::default();
        let root = t.root();
        t.set_solution(root, AgentId(1), (), vec![iv(4, 0.0, 10.0)]);
        t.set_solution(root, AgentId(2), (), vec![iv(4, 10.0, 15.0), iv(4, 3.0, 3.0)]);
        assert_eq!(find_conflict(&t.joint_solution(root)), None);
    }

    #[test]
    fn own_windows_never_conflict() {
        let mut t = ConflictTree::default();
        t.set_solution(TreeNodeId::ROOT, AgentId(1), (), vec![iv(4, 0.0, 10.0), iv(4, 5.0, 12.0)]);
        t.set_solution(TreeNodeId::ROOT, AgentId(2), (), vec![iv(4, 12.0, 14.0)]);
        assert_eq!(find_conflict(&t.joint_solution(TreeNodeId::ROOT)), None);
    }

    #[test]
    fn own_overlap_does_not_hide_other_agents() {
        let mut t = ConflictTree::default();
        t.set_solution(TreeNodeId::ROOT, AgentId(1), (), vec![iv(4, 0.0, 10.0), iv(4, 5.0, 15.0)]);
        t.set_solution(TreeNodeId::ROOT, AgentId(2), (), vec![iv(4, 12.0, 14.0)]);

        let conflict = find_conflict(&t.joint_solution(TreeNodeId::ROOT)).unwrap();
        assert_eq!((conflict.first, conflict.second), (AgentId(1), AgentId(2)));
        assert_eq!(conflict.window, iv(4, 12.0, 14.0));
    }

    #[test]
    fn repeated_own_window_still_meets_other_agents() {
        // Agent 2 comes first here, so agent 1's second window is the one
        // that runs into it.
        let mut t = ConflictTree::default();
        t.set_solution(TreeNodeId::ROOT, AgentId(1), (), vec![iv(4, 12.0, 14.0)]);
        t.set_solution(TreeNodeId::ROOT, AgentId(2), (), vec![iv(4, 0.0, 10.0), iv(4, 5.0, 15.0)]);

        let conflict = find_conflict(&t.joint_solution(TreeNodeId::ROOT)).unwrap();
        assert_eq!((conflict.first, conflict.second), (AgentId(1), AgentId(2)));
        assert_eq!(conflict.window, iv(4, 12.0, 14.0));
    }

    #[test]
    fn sub_tolerance_touch_blames_the_real_overlap() {
        // Agent 0 ends a rounding error after agent 2 arrives; agent 1 is
        // the one actually in the way.
        let mut t = ConflictTree::default();
        t.set_solution(TreeNodeId::ROOT, AgentId(0), (), vec![iv(4, 0.0, 10.0 + 5e-13)]);
        t.set_solution(TreeNodeId::ROOT, AgentId(1), (), vec![iv(4, 15.0, 25.0)]);
        t.set_solution(TreeNodeId::ROOT, AgentId(2), (), vec![iv(4, 10.0, 20.0)]);

        let conflict = find_conflict(&t.joint_solution(TreeNodeId::ROOT)).unwrap();
        assert_eq!((conflict.first, conflict.second), (AgentId(1), AgentId(2)));
        assert_eq!(conflict.window, iv(4, 15.0, 20.0));
        assert!(!conflict.window.is_degenerate());
    }

    #[test]
    fn sub_tolerance_touch_alone_is_no_conflict() {
        let mut t = ConflictTree::default();
        t.set_solution(TreeNodeId::ROOT, AgentId(0), (), vec![iv(4, 0.0, 10.0 + 5e-13)]);
        t.set_solution(TreeNodeId::ROOT, AgentId(2), (), vec![iv(4, 10.0, 20.0)]);
        assert_eq!(find_conflict(&t.joint_solution(TreeNodeId::ROOT)), None);
    }
}

// ── FixedRoutePlanner ─────────────────────────────────────────────────────────

#[cfg(test)]
mod planner {
    use super::*;
    use crate::LowLevelPlanner;

    #[test]
    fn unconstrained_plan_leaves_on_release() {
        let p = crossing_planner(10.0);
        let s = p.plan(AgentId(0), &[]).unwrap();
        assert_eq!(s.route.depart_at, 0.0);
        assert_eq!(s.reservations, vec![iv(3, 0.0, 1.0), iv(4, 0.0, 2.0), iv(5, 1.0, 2.0)]);
        assert_eq!(s.cost(), 2.0);
    }

    #[test]
    fn constraint_delays_departure() {
        let p = crossing_planner(10.0);
        let s = p.plan(AgentId(0), &[iv(4, 0.0, 2.0)]).unwrap();
        assert_eq!(s.route.depart_at, 2.0);
        assert_eq!(s.reservations, vec![iv(3, 0.0, 3.0), iv(4, 2.0, 4.0), iv(5, 3.0, 4.0)]);
    }

    #[test]
    fn no_delay_fits() {
        let p = crossing_planner(1.0);
        assert!(p.plan(AgentId(0), &[iv(4, 0.0, 100.0)]).is_none());
    }

    #[test]
    fn unknown_agent_or_bent_route() {
        let mut p = crossing_planner(10.0);
        assert!(p.plan(AgentId(9), &[]).is_none());
        p.add_route(AgentId(2), vec![NodeId(0), NodeId(4)], 0.0);
        assert!(p.plan(AgentId(2), &[]).is_none());
    }

    #[test]
    fn parking_reserves_the_goal() {
        let p = crossing_planner(10.0).park_at_goal(true);
        let s = p.plan(AgentId(1), &[]).unwrap();
        assert_eq!(s.reservations.last(), Some(&Interval::open_ended(NodeId(7), 2.0)));
        assert_eq!(s.cost(), 2.0);
    }
}

// ── ConflictSearch ────────────────────────────────────────────────────────────

#[cfg(test)]
mod search {
    use super::*;
    use std::collections::BTreeMap;

    use crate::{Conflict, ConflictSearch, LowLevelPlanner, NoopObserver, SearchError, SearchObserver, SearchOutcome, Solution};

    #[derive(Default)]
    struct Recorder {
        expanded:  Vec<TreeNodeId>,
        conflicts: Vec<Conflict>,
        pruned:    Vec<AgentId>,
        solved:    Option<f64>,
    }

    impl SearchObserver for Recorder {
        fn on_expand(&mut self, node: TreeNodeId, _cost: f64, _depth: usize) {
            self.expanded.push(node);
        }
        fn on_conflict(&mut self, _node: TreeNodeId, conflict: &Conflict) {
            self.conflicts.push(*conflict);
        }
        fn on_prune(&mut self, _node: TreeNodeId, agent: AgentId) {
            self.pruned.push(agent);
        }
        fn on_solution(&mut self, _node: TreeNodeId, cost: f64) {
            self.solved = Some(cost);
        }
    }

    #[test]
    fn crossing_agents_are_resolved() {
        init_tracing();
        let search = ConflictSearch::new(crossing_planner(10.0), &PlannerConfig::default()).unwrap();
        let mut rec = Recorder::default();
        let outcome = search.run(&[AgentId(1), AgentId(0)], &mut rec).unwrap();

        let plan = outcome.solved().unwrap();
        assert_eq!(plan.cost, 6.0);
        assert_eq!(plan.expansions, 1);
        assert_eq!(plan.tree_size, 3);
        // Equal-cost children: the one created first wins.
        assert_eq!(plan.node, TreeNodeId(1));
        assert_eq!(plan.solutions[&AgentId(0)].route.depart_at, 2.0);
        assert_eq!(plan.solutions[&AgentId(1)].route.depart_at, 0.0);

        assert_eq!(rec.expanded, vec![TreeNodeId::ROOT]);
        assert_eq!(rec.conflicts[0].node, N);
        assert_eq!(rec.conflicts[0].window, iv(4, 0.0, 2.0));
        assert!(rec.pruned.is_empty());
        assert_eq!(rec.solved, Some(6.0));
    }

    #[test]
    fn conflict_free_root_is_accepted_immediately() {
        let mut p = crossing_planner(10.0);
        p.add_route(AgentId(2), vec![NodeId(6), NodeId(8)], 0.0);
        let search = ConflictSearch::new(p, &PlannerConfig::default()).unwrap();
        let outcome = search.run(&[AgentId(0), AgentId(2)], &mut NoopObserver).unwrap();
        let plan = outcome.solved().unwrap();
        assert_eq!(plan.expansions, 0);
        assert_eq!(plan.node, TreeNodeId::ROOT);
        assert_eq!(plan.cost, 4.0);
    }

    #[test]
    fn unfixable_conflict_is_infeasible() {
        let search = ConflictSearch::new(crossing_planner(0.0), &PlannerConfig::default()).unwrap();
        let mut rec = Recorder::default();
        let outcome = search.run(&[AgentId(0), AgentId(1)], &mut rec).unwrap();
        assert!(matches!(outcome, SearchOutcome::Infeasible));
        assert_eq!(rec.pruned, vec![AgentId(0), AgentId(1)]);
        assert_eq!(rec.solved, None);
    }

    #[test]
    fn expansion_budget_reports_best_node() {
        let mut p = crossing_planner(10.0);
        // Same route as agent 0, same release: clashes on every node.
        p.add_route(AgentId(2), vec![NodeId(3), NodeId(4), NodeId(5)], 0.0);
        let config = PlannerConfig { max_expansions: 1, ..PlannerConfig::default() };
        let search = ConflictSearch::new(p, &config).unwrap();
        let outcome = search.run(&[AgentId(0), AgentId(1), AgentId(2)], &mut NoopObserver).unwrap();

        match outcome {
            SearchOutcome::BudgetExhausted { best: Some(best) } => {
                assert_eq!(best.expansions, 1);
                assert_eq!(best.node, TreeNodeId(1));
                assert_eq!(best.solutions.len(), 3);
            }
            other => panic!("expected an exhausted budget, got {other:?}"),
        }
    }

    /// Hands out the first of a fixed list of plans that clears the
    /// constraints; the route is the index of that plan.
    struct ScriptedPlanner {
        options: BTreeMap<AgentId, Vec<Vec<Interval>>>,
    }

    impl LowLevelPlanner for ScriptedPlanner {
        type Route = usize;

        fn plan(&self, agent: AgentId, constraints: &[Interval]) -> Option<Solution<usize>> {
            self.options.get(&agent)?.iter().enumerate().find_map(|(i, windows)| {
                let clear = windows.iter().all(|w| constraints.iter().all(|c| !c.overlaps(w)));
                clear.then(|| Solution::new(i, windows.clone()))
            })
        }
    }

    #[test]
    fn rounding_touch_does_not_stall_the_search() {
        init_tracing();
        let planner = ScriptedPlanner {
            options: BTreeMap::from([
                (AgentId(0), vec![vec![iv(4, 0.0, 10.0 + 5e-13)]]),
                (AgentId(1), vec![vec![iv(4, 15.0, 25.0)]]),
                (AgentId(2), vec![vec![iv(4, 10.0, 20.0)], vec![iv(4, 25.0, 35.0)]]),
            ]),
        };
        let config = PlannerConfig { max_expansions: 20, ..PlannerConfig::default() };
        let search = ConflictSearch::new(planner, &config).unwrap();
        let mut rec = Recorder::default();
        let outcome = search.run(&[AgentId(0), AgentId(1), AgentId(2)], &mut rec).unwrap();

        let plan = match outcome {
            SearchOutcome::Solved(plan) => plan,
            other => panic!("expected a solution, got {other:?}"),
        };
        assert_eq!(plan.expansions, 1);
        assert_eq!(plan.tree_size, 3);
        assert_eq!(plan.node, TreeNodeId(2));
        assert_eq!(plan.solutions[&AgentId(0)].route, 0);
        assert_eq!(plan.solutions[&AgentId(2)].route, 1);

        assert_eq!(rec.conflicts.len(), 1);
        assert_eq!((rec.conflicts[0].first, rec.conflicts[0].second), (AgentId(1), AgentId(2)));
        assert!(rec.conflicts.iter().all(|c| !c.window.is_degenerate()));
        assert_eq!(rec.pruned, vec![AgentId(1)]);
    }

    #[test]
    fn input_errors() {
        let search = ConflictSearch::new(crossing_planner(10.0), &PlannerConfig::default()).unwrap();
        assert!(matches!(search.run(&[], &mut NoopObserver), Err(SearchError::NoAgents)));
        assert!(matches!(
            search.run(&[AgentId(5)], &mut NoopObserver),
            Err(SearchError::RootUnplannable(AgentId(5)))
        ));

        let bad = PlannerConfig { branching_factor: 1, ..PlannerConfig::default() };
        assert!(matches!(ConflictSearch::new(crossing_planner(1.0), &bad), Err(SearchError::Config(_))));
    }
}
