//! Heuristic-guided traversal of the timetable graph.
//!
//! One [`NetworkTraverser`] runs one [`PathRequest`]: a start node, a start
//! time and a change limit. Per branch it keeps a [`JourneyState`] and a
//! [`TraversalState`]; per request it keeps the [`RouteEvaluator`] with its
//! previous-visit cache and best arrival so far.

mod constraints;
mod diagnostics;
mod evaluator;
mod heuristics;
mod journey_state;
mod lowest_cost;
mod previous_visits;
mod reason;
mod selector;
mod traversal;
mod traverser;

pub use constraints::JourneyConstraints;
pub use diagnostics::{
    DiagnosticsReport, DiagnosticsSink, NoDiagnostics, NodeVisits, RecordingDiagnostics, Rejection,
};
pub use evaluator::{Candidate, RouteEvaluator};
pub use heuristics::ServiceHeuristics;
pub use journey_state::{JourneyState, JourneyStateError};
pub use lowest_cost::LowestCostSeen;
pub use previous_visits::PreviousVisits;
pub use reason::{Evaluation, HowIGotHere, ReasonCode, ServiceReason};
pub use selector::{BranchOrdering, BranchSelector, ProximityRanks, SelectorKey};
pub use traversal::{StateKind, TraversalError, TraversalOps, TraversalState};
pub use traverser::{FoundPath, NetworkTraverser, PathRequest, Running};
