//! Planner configuration.
//!
//! Typically built by the application (or deserialized with the `serde`
//! feature) and handed to the reservation table, conflict search, and
//! deadlock handler.

use crate::{CoreError, CoreResult};

// ── Tagging ───────────────────────────────────────────────────────────────────

/// Which owner information a reservation store keeps next to each interval.
///
/// Priorities are only meaningful together with an owner, so there is no
/// "priorities only" mode.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Tagging {
    /// Bare intervals.  Cheapest; conflict queries cannot name the owner.
    #[default]
    None,
    /// Store the reserving agent with each interval.
    AgentIds,
    /// Store the reserving agent and its priority with each interval.
    AgentIdsAndPriorities,
}

impl Tagging {
    #[inline]
    pub fn stores_agent_ids(self) -> bool {
        !matches!(self, Tagging::None)
    }

    #[inline]
    pub fn stores_priorities(self) -> bool {
        matches!(self, Tagging::AgentIdsAndPriorities)
    }
}

// ── PlannerConfig ─────────────────────────────────────────────────────────────

/// Tunables shared by the planning components.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlannerConfig {
    /// Seconds a moving agent may make no progress before it counts as
    /// deadlocked.
    pub maximum_wait_time: f64,

    /// Upper bound (exclusive) of the random pause appended after an escape
    /// hop, in seconds.  Default: 5.
    pub wait_step_length: f64,

    /// Children per conflict tree node.  Default: 2 (binary CBS split).
    pub branching_factor: usize,

    /// Track touched nodes in reservation tables so `clear` costs
    /// O(touched) instead of O(nodes).
    pub fast_clear: bool,

    /// Owner information kept by reservation tables built from this config.
    pub tagging: Tagging,

    /// Master RNG seed.  The same seed always yields identical escape hops.
    pub seed: u64,

    /// Conflict tree expansions before the search gives up.
    pub max_expansions: usize,

    /// Wall-clock budget for one conflict search, in milliseconds.  `None`
    /// means unbounded.
    pub time_budget_ms: Option<u64>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            maximum_wait_time: 30.0,
            wait_step_length:  5.0,
            branching_factor:  2,
            fast_clear:        true,
            tagging:           Tagging::AgentIds,
            seed:              0,
            max_expansions:    10_000,
            time_budget_ms:    None,
        }
    }
}

impl PlannerConfig {
    /// Reject values the planner cannot work with.
    pub fn validate(&self) -> CoreResult<()> {
        if !self.maximum_wait_time.is_finite() || self.maximum_wait_time < 0.0 {
            return Err(CoreError::Config(format!(
                "maximum_wait_time must be finite and non-negative, got {}",
                self.maximum_wait_time
            )));
        }
        if !self.wait_step_length.is_finite() || self.wait_step_length < 0.0 {
            return Err(CoreError::Config(format!(
                "wait_step_length must be finite and non-negative, got {}",
                self.wait_step_length
            )));
        }
        if self.branching_factor < 2 {
            return Err(CoreError::Config(format!(
                "branching_factor must be at least 2, got {}",
                self.branching_factor
            )));
        }
        if self.max_expansions == 0 {
            return Err(CoreError::Config("max_expansions must be positive".into()));
        }
        Ok(())
    }
}
