//! Optional record of why branches were pruned.
//!
//! The traverser is generic over a [`DiagnosticsSink`]. With
//! [`NoDiagnostics`] every call compiles away; [`RecordingDiagnostics`]
//! keeps the full rejection trail for a [`DiagnosticsReport`].

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::reason::{ReasonCode, ServiceReason};
use super::traversal::StateKind;

/// Receives evaluator decisions.
pub trait DiagnosticsSink {
    /// False for sinks that ignore everything, letting callers skip the
    /// work of building records.
    const ENABLED: bool;

    /// A node was evaluated and given `code`.
    fn visited(&mut self, node: u64, code: ReasonCode);

    /// A branch was pruned at the end of `path`.
    fn rejected(&mut self, reason: ServiceReason, path: Vec<u64>);
}

/// Records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDiagnostics;

impl DiagnosticsSink for NoDiagnostics {
    const ENABLED: bool = false;

    fn visited(&mut self, _node: u64, _code: ReasonCode) {}

    fn rejected(&mut self, _reason: ServiceReason, _path: Vec<u64>) {}
}

/// One pruned branch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub reason: ServiceReason,
    /// Raw node indexes from the start node to the rejected node.
    pub path: Vec<u64>,
}

/// Keeps every rejection, per-node visit counts and counts of the codes
/// that let branches through.
#[derive(Debug, Clone, Default)]
pub struct RecordingDiagnostics {
    rejections: Vec<Rejection>,
    visits: HashMap<u64, u64>,
    accepted: BTreeMap<ReasonCode, u64>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejections(&self) -> &[Rejection] {
        &self.rejections
    }

    /// Fold another sink's records into this one.
    pub fn merge(&mut self, other: RecordingDiagnostics) {
        self.rejections.extend(other.rejections);
        for (node, count) in other.visits {
            *self.visits.entry(node).or_default() += count;
        }
        for (code, count) in other.accepted {
            *self.accepted.entry(code).or_default() += count;
        }
    }

    /// Summarise, keeping the `top` most visited rejected nodes.
    pub fn report(&self, top: usize) -> DiagnosticsReport {
        let mut by_code: BTreeMap<ReasonCode, u64> = BTreeMap::new();
        let mut by_state: BTreeMap<StateKind, u64> = BTreeMap::new();
        let mut rejected_nodes: HashMap<u64, u64> = HashMap::new();
        for rejection in &self.rejections {
            *by_code.entry(rejection.reason.code).or_default() += 1;
            *by_state.entry(rejection.reason.how.state).or_default() += 1;
            let node = rejection.reason.how.node;
            rejected_nodes.insert(node, self.visits.get(&node).copied().unwrap_or(0));
        }

        let mut most_visited: Vec<NodeVisits> = rejected_nodes
            .into_iter()
            .map(|(node, visits)| NodeVisits { node, visits })
            .collect();
        most_visited.sort_by(|a, b| b.visits.cmp(&a.visits).then(a.node.cmp(&b.node)));
        most_visited.truncate(top);

        DiagnosticsReport {
            by_code,
            accepted: self.accepted.clone(),
            by_state,
            most_visited,
            trail: self.rejections.clone(),
        }
    }
}

impl DiagnosticsSink for RecordingDiagnostics {
    const ENABLED: bool = true;

    fn visited(&mut self, node: u64, code: ReasonCode) {
        *self.visits.entry(node).or_default() += 1;
        if code.is_valid() {
            *self.accepted.entry(code).or_default() += 1;
        }
    }

    fn rejected(&mut self, reason: ServiceReason, path: Vec<u64>) {
        self.rejections.push(Rejection { reason, path });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NodeVisits {
    pub node: u64,
    pub visits: u64,
}

/// Where and why a query's branches were pruned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticsReport {
    /// Rejections per reason.
    pub by_code: BTreeMap<ReasonCode, u64>,
    /// Evaluations that let the branch continue, per reason.
    pub accepted: BTreeMap<ReasonCode, u64>,
    pub by_state: BTreeMap<StateKind, u64>,
    pub most_visited: Vec<NodeVisits>,
    pub trail: Vec<Rejection>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TramTime;
    use crate::search::reason::HowIGotHere;

    fn reason(code: ReasonCode, node: u64, state: StateKind) -> ServiceReason {
        ServiceReason::new(
            code,
            HowIGotHere {
                node,
                previous: None,
                approx_station: None,
                clock: TramTime::of(9, 0).unwrap(),
                state,
            },
        )
    }

    #[test]
    fn report_counts_and_ranks() {
        let mut sink = RecordingDiagnostics::new();
        for _ in 0..3 {
            sink.visited(7, ReasonCode::NotAtHour);
        }
        sink.visited(9, ReasonCode::NotAtHour);
        sink.visited(8, ReasonCode::HourOk);
        sink.rejected(reason(ReasonCode::NotAtHour, 7, StateKind::Service), vec![1, 7]);
        sink.rejected(reason(ReasonCode::NotAtHour, 9, StateKind::Service), vec![1, 9]);
        sink.rejected(reason(ReasonCode::SameTrip, 7, StateKind::Hour), vec![1, 2, 7]);

        let report = sink.report(1);
        assert_eq!(report.by_code[&ReasonCode::NotAtHour], 2);
        assert_eq!(report.by_code[&ReasonCode::SameTrip], 1);
        assert_eq!(report.by_state[&StateKind::Service], 2);
        assert_eq!(report.accepted[&ReasonCode::HourOk], 1);
        assert!(!report.accepted.contains_key(&ReasonCode::NotAtHour));
        assert_eq!(report.most_visited, vec![NodeVisits { node: 7, visits: 3 }]);
        assert_eq!(report.trail.len(), 3);
        assert_eq!(report.trail[2].path, vec![1, 2, 7]);
    }

    #[test]
    fn merge_adds_visits() {
        let mut first = RecordingDiagnostics::new();
        first.visited(4, ReasonCode::TimeOk);
        let mut second = RecordingDiagnostics::new();
        second.visited(4, ReasonCode::TookTooLong);
        second.rejected(reason(ReasonCode::TookTooLong, 4, StateKind::Minute), vec![4]);
        first.merge(second);

        assert_eq!(first.rejections().len(), 1);
        let report = first.report(5);
        assert_eq!(report.most_visited, vec![NodeVisits { node: 4, visits: 2 }]);
        assert_eq!(report.accepted[&ReasonCode::TimeOk], 1);
    }

    #[test]
    fn report_serializes() {
        let mut sink = RecordingDiagnostics::new();
        sink.rejected(reason(ReasonCode::StationClosed, 3, StateKind::Minute), vec![3]);
        let json = serde_json::to_value(sink.report(3)).unwrap();
        assert_eq!(json["by_code"]["StationClosed"], 1);
        assert_eq!(json["trail"][0]["reason"]["how"]["clock"], "09:00");
    }
}
