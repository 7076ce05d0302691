//! Graph backend errors.

/// Failures reported by a graph store.
///
/// The search never retries these; they surface to the caller as backend
/// errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GraphError {
    /// A handle that does not name a live node in this transaction
    #[error("node {0} not found")]
    NodeNotFound(u64),

    /// Only scratch nodes created in this transaction may be deleted
    #[error("node {0} is not a scratch node")]
    NotScratch(u64),

    /// Any other failure from the underlying store
    #[error("graph backend error: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(GraphError::NodeNotFound(7).to_string(), "node 7 not found");
        assert_eq!(GraphError::NotScratch(1).to_string(), "node 1 is not a scratch node");
        assert_eq!(
            GraphError::Backend("disk full".into()).to_string(),
            "graph backend error: disk full"
        );
    }
}
