use mapf_core::NodeId;
use thiserror::Error;

use crate::ReservedInterval;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReservationError {
    /// An insertion would overlap an existing reservation.  Carries the
    /// store's full content at the time of the attempt.
    #[error("interval intersection on {node}: insert {start} - {end}{}", render_entries(.existing))]
    IntervalIntersection {
        node:     NodeId,
        start:    f64,
        end:      f64,
        existing: Vec<ReservedInterval>,
    },
}

pub type ReservationResult<T> = Result<T, ReservationError>;

fn render_entries(entries: &[ReservedInterval]) -> String {
    let mut out = String::new();
    for e in entries {
        out.push_str(&format!("\nentry: {} - {}", e.start, e.end));
        if let Some(agent) = e.agent {
            out.push_str(&format!(" ({agent})"));
        }
    }
    out
}
