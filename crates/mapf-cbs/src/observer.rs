//! Search observer trait for progress reporting and instrumentation.

use mapf_core::{AgentId, TreeNodeId};

use crate::Conflict;

/// Callbacks invoked by [`ConflictSearch::run`][crate::ConflictSearch::run]
/// at key points of the search loop.
///
/// All methods have default no-op implementations so implementors only need to
/// override what they care about.
///
/// # Example — expansion counter
///
/// ```rust,ignore
/// struct Counter { expanded: usize }
///
/// impl SearchObserver for Counter {
///     fn on_expand(&mut self, _node: TreeNodeId, _cost: f64, _depth: usize) {
///         self.expanded += 1;
///     }
/// }
/// ```
pub trait SearchObserver {
    /// Called when a tree node is taken from the open list and branched.
    fn on_expand(&mut self, _node: TreeNodeId, _cost: f64, _depth: usize) {}

    /// Called with the conflict a node is branched on.
    fn on_conflict(&mut self, _node: TreeNodeId, _conflict: &Conflict) {}

    /// Called when a child is dropped because its agent cannot be re-planned.
    fn on_prune(&mut self, _node: TreeNodeId, _agent: AgentId) {}

    /// Called once with the accepted conflict-free node.
    fn on_solution(&mut self, _node: TreeNodeId, _cost: f64) {}
}

/// A [`SearchObserver`] that does nothing.
pub struct NoopObserver;

impl SearchObserver for NoopObserver {}
