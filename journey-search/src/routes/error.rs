//! Error types for route-level costs.

/// Errors that can occur while persisting or loading the interchange matrix.
#[derive(Debug, thiserror::Error)]
pub enum MatrixError {
    /// The on-disk matrix cache could not be written.
    #[error("matrix cache error: {message}")]
    Cache { message: String },

    /// A saved matrix does not match the network it is being loaded for.
    #[error("matrix cache is stale: {0}")]
    Stale(&'static str),
}
