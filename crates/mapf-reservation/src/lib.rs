//! `mapf-reservation` — who occupies which waypoint, and when.
//!
//! Every conflict question in the planner is answered from a
//! [`ReservationTable`]: one [`DisjointIntervalStore`] per graph node holding
//! start-sorted, pairwise disjoint time windows.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                   |
//! |-----------------|------------------------------------------------------------|
//! | [`store`]       | `DisjointIntervalStore`, `ReservedInterval`, `Collision`, `Blocker` |
//! | [`table`]       | `ReservationTable`                                         |
//! | [`checkpoints`] | `Checkpoints` (route → arrival times via `Physics`)        |
//! | [`error`]       | `ReservationError`, `ReservationResult<T>`                 |
//!
//! # Conflicts versus errors
//!
//! Overlap *queries* never fail: they return `bool`, a [`Blocker`], or a list
//! of [`Collision`]s.  Only *inserting* an overlapping window is an error,
//! because it means the caller skipped or ignored a query.

pub mod checkpoints;
pub mod error;
pub mod store;
pub mod table;


pub use checkpoints::Checkpoints;
pub use error::{ReservationError, ReservationResult};
pub use store::{Blocker, Collision, DisjointIntervalStore, ReservedInterval};
pub use table::ReservationTable;
