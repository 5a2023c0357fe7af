use mapf_core::{AgentId, CoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search configuration error: {0}")]
    Config(#[from] CoreError),

    #[error("conflict search needs at least one agent")]
    NoAgents,

    /// The low-level planner found no route for an agent even without
    /// constraints, so no joint plan can exist.
    #[error("no unconstrained route for {0}")]
    RootUnplannable(AgentId),
}

pub type SearchResult<T> = Result<T, SearchError>;
