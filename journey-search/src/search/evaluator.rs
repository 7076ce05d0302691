//! Decides, for each candidate child, whether its branch goes on.
//!
//! Checks run in a fixed order and the first rejection wins. Cheap,
//! request-wide checks (cancellation, timeout, cached rejections) come
//! first; node-kind specific checks come last.

use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use tracing::{debug, trace};

use super::diagnostics::DiagnosticsSink;
use super::heuristics::ServiceHeuristics;
use super::journey_state::JourneyState;
use super::lowest_cost::LowestCostSeen;
use super::previous_visits::PreviousVisits;
use super::reason::{Evaluation, HowIGotHere, ReasonCode, ServiceReason};
use super::traversal::{StateKind, departure_for};
use super::traverser::Running;
use crate::graph::{EdgeType, GraphLabel, GraphNode, GraphRelationship, NodeId};

/// One child of a branch, about to be evaluated.
pub struct Candidate<'a, 't> {
    pub node: &'a GraphNode<'t>,
    pub via: &'a GraphRelationship<'t>,
    /// The branch's state after the edge cost, before the node's
    /// transition.
    pub journey: &'a JourneyState,
    /// Nodes on the path including this one.
    pub path_length: usize,
    /// The parent branch's state kind.
    pub state: StateKind,
    pub is_destination: bool,
}

impl Candidate<'_, '_> {
    fn how(&self) -> HowIGotHere {
        HowIGotHere {
            node: self.node.id().index(),
            previous: Some(self.via.start().index()),
            approx_station: self.journey.approx_station().cloned(),
            clock: self.journey.clock(),
            state: self.state,
        }
    }
}

/// Per path request evaluator state.
pub struct RouteEvaluator {
    heuristics: ServiceHeuristics,
    previous: PreviousVisits,
    lowest: LowestCostSeen,
    running: Running,
    start_node: u64,
    started: Instant,
    timeout: std::time::Duration,
    seen_times: HashSet<u64>,
    counts: BTreeMap<ReasonCode, u64>,
}

impl RouteEvaluator {
    pub fn new(
        heuristics: ServiceHeuristics,
        previous: PreviousVisits,
        running: Running,
        start_node: NodeId<'_>,
        timeout: std::time::Duration,
    ) -> Self {
        Self {
            heuristics,
            previous,
            lowest: LowestCostSeen::new(),
            running,
            start_node: start_node.index(),
            started: Instant::now(),
            timeout,
            seen_times: HashSet::new(),
            counts: BTreeMap::new(),
        }
    }

    pub fn heuristics(&self) -> &ServiceHeuristics {
        &self.heuristics
    }

    pub fn lowest(&self) -> &LowestCostSeen {
        &self.lowest
    }

    /// How often each reason code was decided.
    pub fn counts(&self) -> &BTreeMap<ReasonCode, u64> {
        &self.counts
    }

    pub fn previous_visits(&self) -> &PreviousVisits {
        &self.previous
    }

    /// Evaluate `candidate`. `path` is only called when a recording sink
    /// needs the rejected path.
    pub fn evaluate<D: DiagnosticsSink>(
        &mut self,
        candidate: &Candidate<'_, '_>,
        sink: &mut D,
        path: impl FnOnce() -> Vec<u64>,
    ) -> Evaluation {
        let code = self.decide(candidate);
        *self.counts.entry(code).or_default() += 1;

        if !code.is_valid() && !code.is_cached() {
            self.previous.record(candidate.node, candidate.journey, code);
        }

        let evaluation = code.evaluation();
        if D::ENABLED {
            sink.visited(candidate.node.id().index(), code);
            if evaluation == Evaluation::Prune {
                sink.rejected(ServiceReason::new(code, candidate.how()), path());
            }
        }
        if evaluation == Evaluation::Prune {
            trace!(
                node = %candidate.node.id(),
                reason = ?code,
                clock = %candidate.journey.clock(),
                "pruned"
            );
        }
        evaluation
    }

    fn decide(&mut self, candidate: &Candidate<'_, '_>) -> ReasonCode {
        let journey = candidate.journey;
        let node = candidate.node;
        let h = &self.heuristics;

        if !self.running.is_running() {
            return ReasonCode::SearchStopped;
        }
        if !self.lowest.any_arrived() && self.started.elapsed() > self.timeout {
            return ReasonCode::TimedOut;
        }
        if let Some(cached) = self.previous.cached(node, journey) {
            return cached;
        }

        if candidate.is_destination {
            return if self.lowest.is_lower(journey) {
                self.lowest.set_lowest(journey);
                ReasonCode::Arrived
            } else {
                match self.lowest.lowest_changes() {
                    Some(changes) if journey.number_of_changes() == changes => {
                        ReasonCode::ArrivedLater
                    }
                    Some(changes) if journey.number_of_changes() < changes => ReasonCode::Arrived,
                    _ => ReasonCode::ArrivedMoreChanges,
                }
            };
        }

        if let Some(lowest) = self.lowest.lowest_cost()
            && journey.elapsed() > lowest
        {
            return ReasonCode::HigherCost;
        }

        let general = [
            h.path_length_ok(candidate.path_length),
            h.changes_ok(journey),
            h.walking_connections_ok(journey),
            h.neighbour_connections_ok(journey),
            h.duration_ok(journey),
        ];
        if let Some(rejected) = general.into_iter().find(|code| !code.is_valid()) {
            return rejected;
        }

        if node.id().index() == self.start_node && candidate.path_length > 1 {
            return ReasonCode::ReturnedToStart;
        }

        let code = if node.has_label(GraphLabel::Station) {
            match node.station() {
                Some(station) if journey.has_visited(station) => ReasonCode::AlreadySeenStation,
                _ => ReasonCode::Continue,
            }
        } else if node.has_label(GraphLabel::Minute) {
            self.minute(candidate)
        } else if node.has_label(GraphLabel::Hour) {
            match node.hour() {
                Some(hour) => h.interested_in_hour(hour, journey),
                None => ReasonCode::NotAtHour,
            }
        } else if node.has_label(GraphLabel::Service) {
            match node.service() {
                Some(service) => {
                    let date = h.service_date_ok(service, journey);
                    if date.is_valid() {
                        h.service_time_ok(service, journey)
                    } else {
                        date
                    }
                }
                None => ReasonCode::NotOnQueryDate,
            }
        } else if node.has_label(GraphLabel::RouteStation) {
            self.route_station(candidate)
        } else {
            ReasonCode::Continue
        };
        if code == ReasonCode::Continue && candidate.via.kind() == EdgeType::WalksToStation {
            ReasonCode::WalkOk
        } else {
            code
        }
    }

    fn minute(&mut self, candidate: &Candidate<'_, '_>) -> ReasonCode {
        let journey = candidate.journey;
        let node = candidate.node;
        let id = node.id().index();

        if !self.heuristics.depth_first() && self.seen_times.contains(&id) {
            return ReasonCode::AlreadySeenTime;
        }
        if let Some(trip) = node.trip()
            && journey.already_departed(trip)
        {
            return ReasonCode::SameTrip;
        }
        let Some(time) = node.time() else {
            return ReasonCode::DoesNotOperateOnTime;
        };
        let code = self
            .heuristics
            .check_time(departure_for(time, journey.clock()), journey);
        if code.is_valid() && !self.heuristics.depth_first() {
            self.seen_times.insert(id);
        }
        code
    }

    fn route_station(&self, candidate: &Candidate<'_, '_>) -> ReasonCode {
        let h = &self.heuristics;
        let journey = candidate.journey;
        let node = candidate.node;

        let modes = h.modes_ok(node.labels());
        if !modes.is_valid() {
            return modes;
        }
        if let Some(station) = node.station() {
            let open = h.station_open(station, journey);
            if !open.is_valid() {
                return open;
            }
        }
        let final_change = h.final_change_modes_ok(node.labels(), journey);
        if !final_change.is_valid() {
            return final_change;
        }
        if h.depth_first() {
            return match node.route() {
                Some(route) => h.can_reach_destination(route, journey),
                None => ReasonCode::ReachableNoCheck,
            };
        }
        ReasonCode::ReachableNoCheck
    }

    /// Log the per-request summary.
    pub fn report(&self) {
        let pruned: u64 = self
            .counts
            .iter()
            .filter(|(code, _)| !code.is_valid())
            .map(|(_, n)| n)
            .sum();
        debug!(
            pruned,
            arrived = self.counts.get(&ReasonCode::Arrived).copied().unwrap_or(0),
            timed_out = self.counts.get(&ReasonCode::TimedOut).copied().unwrap_or(0),
            lowest = ?self.lowest.lowest_cost().map(|d| d.num_minutes()),
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "path request evaluated"
        );
        for (code, count) in &self.counts {
            trace!(reason = %code, count, "reason count");
        }
        self.previous.report_stats();
    }
}
