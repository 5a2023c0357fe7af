//! `mapf-core` — foundational types for the warehouse collision-avoidance
//! planner.
//!
//! Every other `mapf-*` crate depends on this one.  It has no `mapf-*`
//! dependencies and minimal external ones (only `rand` and `thiserror`, plus
//! optional `serde`).
//!
//! # What lives here
//!
//! | Module          | Contents                                              |
//! |-----------------|-------------------------------------------------------|
//! | [`ids`]         | `AgentId`, `NodeId`, `ElevatorId`, `TreeNodeId`       |
//! | [`interval`]    | `Interval`, `TOLERANCE`                               |
//! | [`config`]      | `PlannerConfig`, `Tagging`                            |
//! | [`rng`]         | `PlannerRng`                                          |
//! | [`error`]       | `CoreError`, `CoreResult`                             |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod config;
pub mod error;
pub mod ids;
pub mod interval;
pub mod rng;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{PlannerConfig, Tagging};
pub use error::{CoreError, CoreResult};
pub use ids::{AgentId, ElevatorId, NodeId, TreeNodeId};
pub use interval::{Interval, TOLERANCE};
pub use rng::PlannerRng;
