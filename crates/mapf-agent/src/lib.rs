//! `mapf-agent` — the planner's view of individual robots.
//!
//! | Module         | Contents                                                  |
//! |----------------|-----------------------------------------------------------|
//! | [`agent`]      | `Agent` snapshot, `Path`, `PathStep`                      |
//! | [`deadlock`]   | `DeadlockHandler` (stall clock, random escape hop)        |
//! | [`blockage`]   | `start_blockage` (windows robots already commit to)       |
//! | [`elevator`]   | `find_elevator_sequence`, `ElevatorSequence`              |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to snapshots and sequences. |

pub mod agent;
pub mod blockage;
pub mod deadlock;
pub mod elevator;

#[cfg(test)]
mod tests;

pub use agent::{Agent, Path, PathStep};
pub use blockage::start_blockage;
pub use deadlock::DeadlockHandler;
pub use elevator::{find_elevator_sequence, ElevatorHop, ElevatorSequence};
