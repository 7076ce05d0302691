//! Errors surfaced by a journey query.

use crate::domain::LocationId;
use crate::graph::GraphError;
use crate::search::{JourneyStateError, TraversalError};

/// Why a query failed.
///
/// Search outcomes such as "no route" are never errors; they produce an
/// empty response.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The origin or destination is not in the network
    #[error("unknown location: {0}")]
    UnknownLocation(LocationId),

    /// The request cannot be searched as given
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The traversal reached a state its transitions do not allow
    #[error("traversal failed: {0}")]
    Traversal(TraversalError),

    /// A journey state invariant was broken
    #[error("journey state: {0}")]
    JourneyState(#[from] JourneyStateError),

    /// The graph store failed
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A parallel path request worker panicked or was cancelled
    #[error("path request worker failed: {0}")]
    Worker(String),
}

impl SearchError {
    /// True for failures that indicate a bug rather than bad input or a
    /// failing backend.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            SearchError::Traversal(_) | SearchError::JourneyState(_) | SearchError::Worker(_)
        )
    }

    pub fn is_backend(&self) -> bool {
        matches!(self, SearchError::Graph(_))
    }
}

impl From<TraversalError> for SearchError {
    fn from(err: TraversalError) -> Self {
        match err {
            TraversalError::Graph(e) => SearchError::Graph(e),
            TraversalError::JourneyState(e) => SearchError::JourneyState(e),
            other => SearchError::Traversal(other),
        }
    }
}
