//! corridor — one planning episode on a small warehouse floor.
//!
//! Four robots are released onto crossing routes at the same time.  The
//! conflict search staggers their departures until no two hold a waypoint at
//! once, the joint plan is committed to a reservation table, and a fifth robot
//! that has been stuck at the grid corner is sent on an escape hop.  Finally
//! the lift rides to the mezzanine are looked up.
//!
//! Set `RUST_LOG=debug` (or `trace`) to follow the search.

mod floor;

use std::time::Instant;

use anyhow::{Result, bail};
use tracing::info;
use tracing_subscriber::EnvFilter;

use mapf_agent::{Agent, DeadlockHandler, find_elevator_sequence, start_blockage};
use mapf_cbs::{ConflictSearch, FixedRoutePlanner, NoopObserver, SearchOutcome};
use mapf_core::{AgentId, NodeId, PlannerConfig};
use mapf_graph::{Graph, KinematicPhysics};
use mapf_reservation::ReservationTable;

use floor::build_floor;

// ── Constants ─────────────────────────────────────────────────────────────────

const SEED:         u64 = 42;
/// When the stuck robot is checked for a deadlock.
const ESCAPE_AT:    f64 = 40.0;
const STUCK_ROBOT:  AgentId = AgentId(4);
const PARKED_ROBOT: AgentId = AgentId(5);

/// Released routes, all at t = 0.
const ROUTES: [(AgentId, &[u32]); 4] = [
    (AgentId(0), &[5, 6, 7, 8, 9]),
    (AgentId(1), &[2, 7, 12]),
    (AgentId(2), &[11, 12, 13, 14]),
    (AgentId(3), &[0, 5, 6]),
];

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = PlannerConfig { seed: SEED, ..PlannerConfig::default() };
    config.validate()?;

    // 1. Floor and robot kinematics.
    let floor = build_floor()?;
    let physics = KinematicPhysics::new(0.8, 1.0, 1.5, 8.0)?;
    info!(nodes = floor.graph.node_count(), edges = floor.graph.edge_count(), "floor built");

    // 2. Robots already on the floor block their nodes before anything is planned.
    let bystanders = [Agent::new(STUCK_ROBOT, NodeId(4)), Agent::parked(PARKED_ROBOT, NodeId(10))];
    let mut table = ReservationTable::for_graph(&floor.graph, &config);
    for (agent, windows) in start_blockage(&bystanders, 0.0) {
        table.add_all(&windows, Some(agent), None)?;
    }

    // 3. Conflict search over the released routes.
    let mut planner = FixedRoutePlanner::from_config(floor.graph, physics, &config);
    for (agent, route) in ROUTES {
        planner.add_route(agent, route.iter().copied().map(NodeId).collect(), 0.0);
    }
    let search = ConflictSearch::new(planner, &config)?;
    let graph = search.planner().graph();
    let agents: Vec<AgentId> = ROUTES.iter().map(|(a, _)| *a).collect();

    let t0 = Instant::now();
    let outcome = search.run(&agents, &mut NoopObserver)?;
    let plan = match outcome {
        SearchOutcome::Solved(plan) => plan,
        SearchOutcome::BudgetExhausted { .. } => bail!("search budget exhausted"),
        SearchOutcome::Infeasible => bail!("no conflict-free schedule exists"),
    };
    info!(
        cost = plan.cost,
        expansions = plan.expansions,
        tree_size = plan.tree_size,
        elapsed_ms = t0.elapsed().as_secs_f64() * 1e3,
        "joint plan found"
    );

    // 4. Commit the joint plan.
    println!("{:<8} {:<10} {:<10} Route", "Agent", "Departs", "Arrives");
    println!("{}", "-".repeat(44));
    for (agent, solution) in &plan.solutions {
        if let Some(blocker) = table.first_blocker(&solution.reservations) {
            bail!("{agent} collides with {:?} at node {}", blocker.agent, blocker.node.0);
        }
        table.add_all(&solution.reservations, Some(*agent), None)?;

        let arrives = solution.reservations.last().map_or(0.0, |r| r.end);
        let route: Vec<String> = solution.route.nodes.iter().map(|n| n.0.to_string()).collect();
        println!(
            "{:<8} {:<10.2} {:<10.2} {}",
            agent.0,
            solution.route.depart_at,
            arrives,
            route.join(" → ")
        );
    }
    println!();
    info!(reservations = table.reservation_count(), "joint plan committed");

    // 5. The robot at node 4 never moved; send it on an escape hop.
    let mut handler = DeadlockHandler::new(&config);
    let [mut stuck, parked] = bystanders;
    handler.update(&[stuck.clone(), parked.clone()], 0.0);
    handler.update(&[stuck.clone(), parked], ESCAPE_AT);
    if handler.is_in_deadlock(&stuck, ESCAPE_AT) {
        let escaped = handler.random_hop(
            &mut stuck,
            graph,
            &physics,
            Some(&mut table),
            ESCAPE_AT,
            true,
            true,
        )?;
        match stuck.path.next_step() {
            Some(step) if escaped => println!("{stuck} escapes: {step}"),
            _ => println!("{stuck} is boxed in"),
        }
    }

    // 6. Lift rides from the work aisle to the mezzanine.
    match find_elevator_sequence(graph, &physics, NodeId(7), floor.mezzanine) {
        Some(seq) => {
            println!(
                "Aisle 7 → mezzanine: {} ride(s), {:.1} m, ~{:.1} s",
                seq.hops.len(),
                seq.distance,
                seq.travel_time
            );
            for hop in &seq.hops {
                println!("  lift {} : {} → {}", hop.elevator.0, hop.from.0, hop.to.0);
            }
        }
        None => println!("Mezzanine unreachable from node {}", floor.lift_foot.0),
    }

    Ok(())
}
