//! Error taxonomy for the query engine.
//!
//! Infrastructure failures (unfrozen graph, internal invariants) propagate
//! up as errors; user-facing conditions (symbol not found, empty result)
//! are reported as successful results with explanatory text so the consumer
//! can distinguish "the system failed" from "the answer is no".

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    /// Query invoked on a graph that has not been frozen, or a mutation
    /// attempted after freeze.
    #[error("graph is not frozen: {0}")]
    NotFrozen(&'static str),

    /// The start node for a primitive query does not exist.
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// The caller's cancellation handle fired.
    #[error("operation cancelled")]
    Cancelled,

    /// Missing required parameter, empty name, rejected generic word, or a
    /// kind outside the recognized enumeration.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Snapshot could not be read or decoded.
    #[error("snapshot error: {0}")]
    Snapshot(String),

    /// Unexpected internal condition.
    #[error("internal error: {0}")]
    Internal(String),
}

impl QueryError {
    /// Whether this error reflects a caller mistake rather than an
    /// engine failure.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;
