//! `mapf-graph` — the warehouse waypoint graph and motion physics the
//! planner consumes.
//!
//! The reservation and conflict crates only ever talk to the [`Graph`] and
//! [`Physics`] traits, so applications can plug in their own layout model or
//! drive-train model.  [`WaypointGraph`] and [`KinematicPhysics`] are the
//! default implementations.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                       |
//! |-------------|----------------------------------------------------------------|
//! | [`graph`]   | `Graph` trait, `Edge`, `ElevatorEdge`, `NodeInfo`               |
//! | [`network`] | `WaypointGraph` (CSR + R-tree), `WaypointGraphBuilder`          |
//! | [`physics`] | `Physics` trait, `KinematicPhysics`, `ConstantSpeed`            |
//! | [`error`]   | `GraphError`, `GraphResult<T>`                                  |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on public value types.     |

pub mod error;
pub mod graph;
pub mod network;
pub mod physics;


pub use error::{GraphError, GraphResult};
pub use graph::{Edge, ElevatorEdge, Graph, NodeInfo};
pub use network::{WaypointGraph, WaypointGraphBuilder};
pub use physics::{ConstantSpeed, KinematicPhysics, MotionProfile, Physics};
