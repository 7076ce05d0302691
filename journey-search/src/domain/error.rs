//! Domain error types.
//!
//! These errors represent validation failures in the domain layer. They are
//! distinct from graph backend and search errors.

/// Domain-level errors for validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    /// A transport mode name that is not recognised
    #[error("unknown transport mode: {0}")]
    UnknownMode(String),

    /// A date range whose end precedes its start
    #[error("invalid date range: {0}")]
    InvalidDateRange(&'static str),

    /// A coordinate outside the valid latitude/longitude bounds
    #[error("invalid position: {0}")]
    InvalidPosition(&'static str),
}
