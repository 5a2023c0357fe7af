//! `mapf-cbs` — conflict-based search over time-windowed reservations.
//!
//! Independently planned routes are merged into one joint plan; wherever two
//! agents hold the same node at overlapping times, the search branches into
//! two sub-problems, each forbidding one of the agents from that node during
//! the shared window, and re-plans that agent.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                      |
//! |--------------|---------------------------------------------------------------|
//! | [`tree`]     | `ConflictTree`, `Solution`, `Constraints` iterator            |
//! | [`search`]   | `ConflictSearch`, `Conflict`, `SearchOutcome`, `JointPlan`    |
//! | [`planner`]  | `LowLevelPlanner` trait, `FixedRoutePlanner`                  |
//! | [`observer`] | `SearchObserver`, `NoopObserver`                              |
//! | [`error`]    | `SearchError`, `SearchResult<T>`                              |
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                       |
//! |------------|--------------------------------------------------------------|
//! | `parallel` | Re-plans the children of one expansion on Rayon's pool.      |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use mapf_cbs::{ConflictSearch, FixedRoutePlanner, NoopObserver};
//!
//! let mut planner = FixedRoutePlanner::from_config(graph, physics, &config);
//! planner.add_route(AgentId(0), vec![NodeId(3), NodeId(4), NodeId(5)], 0.0);
//! planner.add_route(AgentId(1), vec![NodeId(1), NodeId(4), NodeId(7)], 0.0);
//! let search = ConflictSearch::new(planner, &config)?;
//! let outcome = search.run(&[AgentId(0), AgentId(1)], &mut NoopObserver)?;
//! ```

pub mod error;
pub mod observer;
pub mod planner;
pub mod search;
pub mod tree;

#[cfg(test)]
mod tests;

pub use error::{SearchError, SearchResult};
pub use observer::{NoopObserver, SearchObserver};
pub use planner::{DelayedRoute, FixedRoute, FixedRoutePlanner, LowLevelPlanner};
pub use search::{find_conflict, Conflict, ConflictSearch, JointPlan, SearchOutcome};
pub use tree::{reservation_cost, ConflictTree, Constraints, Solution};
