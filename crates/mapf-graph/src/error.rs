use mapf_core::NodeId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("node {0} is not part of the graph")]
    UnknownNode(NodeId),

    #[error("edge from {0} to itself")]
    SelfLoop(NodeId),

    #[error("invalid physics parameters: {0}")]
    InvalidPhysics(String),
}

pub type GraphResult<T> = Result<T, GraphError>;
