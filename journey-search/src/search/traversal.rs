//! The traversal state machine.
//!
//! Each branch carries a [`TraversalState`] saying what kind of node it is
//! at. Moving to the next node picks the next kind from that node's labels,
//! applies the transition's side effects to the branch's
//! [`JourneyState`], and collects the relationships worth following from
//! there. Transitions not listed in [`TraversalState::next_state`] are
//! invariant violations.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;

use super::constraints::JourneyConstraints;
use super::journey_state::{JourneyState, JourneyStateError};
use crate::domain::{ServiceId, StationId, TramTime, TripId};
use crate::graph::{
    Direction, EdgeType, GraphError, GraphLabel, GraphNode, GraphRelationship, GraphTransaction,
    Labels, NodeId,
};

/// Where a branch is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum StateKind {
    NotStarted,
    Walking,
    NoPlatformStation,
    PlatformStation,
    Platform,
    GroupedStation,
    JustBoarded,
    RouteStationOnTrip,
    RouteStationEndTrip,
    Service,
    Hour,
    Minute,
    Destination,
}

impl StateKind {
    fn at_station(&self) -> bool {
        matches!(self, StateKind::NoPlatformStation | StateKind::PlatformStation)
    }

    fn riding(&self) -> bool {
        matches!(
            self,
            StateKind::RouteStationOnTrip | StateKind::RouteStationEndTrip
        )
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Fatal traversal failures. Any of these aborts the query.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TraversalError {
    /// No transition leads from the state to a node with these labels
    #[error("unexpected node n{node} {labels:?} from state {kind}")]
    UnexpectedNode {
        kind: StateKind,
        node: u64,
        labels: Labels,
    },

    /// A node lacks a property its labels promise
    #[error("node n{node} has no {property}")]
    MissingProperty { node: u64, property: &'static str },

    /// The graph store failed while reading outbound relationships
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A transition broke a journey state invariant
    #[error(transparent)]
    JourneyState(#[from] JourneyStateError),
}

/// The departure time of a minute node as seen from `clock`.
///
/// Once the journey has passed midnight every departure is on the
/// following day.
pub(crate) fn departure_for(time: TramTime, clock: TramTime) -> TramTime {
    if clock.is_next_day() && !time.is_next_day() {
        time.to_next_day().unwrap_or(time)
    } else {
        time
    }
}

/// What kind of node the next node is, by label priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Query,
    Grouped,
    Platform,
    RouteStation,
    Service,
    Hour,
    Minute,
    Station { platforms: bool },
}

impl Target {
    fn of(labels: Labels) -> Option<Target> {
        let target = if labels.contains(GraphLabel::QueryNode) {
            Target::Query
        } else if labels.contains(GraphLabel::Grouped) {
            Target::Grouped
        } else if labels.contains(GraphLabel::Platform) {
            Target::Platform
        } else if labels.contains(GraphLabel::RouteStation) {
            Target::RouteStation
        } else if labels.contains(GraphLabel::Service) {
            Target::Service
        } else if labels.contains(GraphLabel::Hour) {
            Target::Hour
        } else if labels.contains(GraphLabel::Minute) {
            Target::Minute
        } else if labels.contains(GraphLabel::Station) {
            Target::Station {
                platforms: labels.contains(GraphLabel::HasPlatforms),
            }
        } else {
            return None;
        };
        Some(target)
    }

    fn station_kind(platforms: bool) -> StateKind {
        if platforms {
            StateKind::PlatformStation
        } else {
            StateKind::NoPlatformStation
        }
    }
}

/// Graph access and query facts the transitions need.
pub struct TraversalOps<'t, T: GraphTransaction + ?Sized> {
    txn: &'t T,
    constraints: Arc<JourneyConstraints>,
    destination_nodes: HashSet<NodeId<'t>>,
}

impl<'t, T: GraphTransaction + ?Sized> TraversalOps<'t, T> {
    pub fn new(
        txn: &'t T,
        constraints: Arc<JourneyConstraints>,
        destination_nodes: impl IntoIterator<Item = NodeId<'t>>,
    ) -> Self {
        Self {
            txn,
            constraints,
            destination_nodes: destination_nodes.into_iter().collect(),
        }
    }

    pub fn txn(&self) -> &'t T {
        self.txn
    }

    pub fn constraints(&self) -> &JourneyConstraints {
        &self.constraints
    }

    pub fn is_destination(&self, node: NodeId<'t>) -> bool {
        self.destination_nodes.contains(&node)
    }

    pub fn destination_nodes(&self) -> &HashSet<NodeId<'t>> {
        &self.destination_nodes
    }

    fn outgoing(
        &self,
        node: NodeId<'t>,
        types: &[EdgeType],
    ) -> Result<Vec<GraphRelationship<'t>>, GraphError> {
        self.txn.relationships(node, Direction::Outgoing, types)
    }

    /// Boarding (or platform entry) from a station or platform, routes
    /// nearest the destination first.
    fn boarding(
        &self,
        node: NodeId<'t>,
        exclude: Option<NodeId<'t>>,
    ) -> Result<Vec<GraphRelationship<'t>>, GraphError> {
        let mut rels = self.outgoing(
            node,
            &[EdgeType::Board, EdgeType::InterchangeBoard, EdgeType::EnterPlatform],
        )?;
        rels.retain(|r| Some(r.end()) != exclude);
        self.constraints
            .lowest_costs()
            .sort_by_destinations(&mut rels, |r| r.props().route.as_ref());
        Ok(rels)
    }

    /// Everything leaving a station once the branch has arrived there.
    fn station_exits(
        &self,
        node: NodeId<'t>,
        exclude: Option<NodeId<'t>>,
        journey: &JourneyState,
    ) -> Result<Vec<GraphRelationship<'t>>, GraphError> {
        let mut rels: Vec<GraphRelationship<'t>> = self
            .outgoing(node, &[EdgeType::WalksFromStation])?
            .into_iter()
            .filter(|r| self.is_destination(r.end()))
            .collect();
        rels.extend(self.outgoing(node, &[EdgeType::Neighbour, EdgeType::GroupedToParent])?);
        rels.extend(self.boarding(node, None)?);
        rels.extend(self.diversions(node, journey)?);
        rels.retain(|r| Some(r.end()) != exclude);
        Ok(rels)
    }

    fn diversions(
        &self,
        node: NodeId<'t>,
        journey: &JourneyState,
    ) -> Result<Vec<GraphRelationship<'t>>, GraphError> {
        if journey.on_diversion() {
            return Ok(Vec::new());
        }
        let date = self.constraints.date();
        let mut rels = self.outgoing(node, &[EdgeType::Diversion])?;
        rels.retain(|r| r.props().diversion.is_some_and(|dates| dates.contains(date)));
        Ok(rels)
    }

    fn towards_destination(&self, rel: &GraphRelationship<'t>) -> bool {
        rel.props()
            .station
            .as_ref()
            .is_some_and(|s| self.constraints.is_destination(s))
            || self.is_destination(rel.end())
    }
}

/// The state of one branch after consuming its last node.
#[derive(Debug, Clone)]
pub struct TraversalState<'t> {
    kind: StateKind,
    node: Option<NodeId<'t>>,
    total_cost: Duration,
    trip: Option<TripId>,
    service: Option<ServiceId>,
    outbound: Vec<GraphRelationship<'t>>,
}

impl<'t> TraversalState<'t> {
    /// Before the start node is consumed.
    pub fn not_started() -> Self {
        Self {
            kind: StateKind::NotStarted,
            node: None,
            total_cost: Duration::zero(),
            trip: None,
            service: None,
            outbound: Vec::new(),
        }
    }

    pub fn kind(&self) -> StateKind {
        self.kind
    }

    pub fn node(&self) -> Option<NodeId<'t>> {
        self.node
    }

    pub fn total_cost(&self) -> Duration {
        self.total_cost
    }

    pub fn trip(&self) -> Option<&TripId> {
        self.trip.as_ref()
    }

    /// Relationships to expand from here, in preferred order.
    pub fn outbound(&self) -> &[GraphRelationship<'t>] {
        &self.outbound
    }

    pub fn take_outbound(&mut self) -> Vec<GraphRelationship<'t>> {
        std::mem::take(&mut self.outbound)
    }

    /// Move to `node`, reached over `via` (absent for the start node) at
    /// `total_cost`.
    ///
    /// A destination node still applies its transition's side effects so
    /// the final journey state is complete, but has nothing to expand.
    pub fn next_state<T: GraphTransaction + ?Sized>(
        &self,
        ops: &TraversalOps<'t, T>,
        via: Option<&GraphRelationship<'t>>,
        node: &GraphNode<'t>,
        journey: &mut JourneyState,
        total_cost: Duration,
    ) -> Result<TraversalState<'t>, TraversalError> {
        let id = node.id();
        let unexpected = || TraversalError::UnexpectedNode {
            kind: self.kind,
            node: id.index(),
            labels: node.labels(),
        };
        let target = Target::of(node.labels()).ok_or_else(unexpected)?;

        let mut service = self.service.clone();
        let (kind, outbound) = match (self.kind, target) {
            (StateKind::NotStarted, Target::Station { platforms }) => {
                journey.seen_station(station_of(node)?);
                (
                    Target::station_kind(platforms),
                    ops.station_exits(id, None, journey)?,
                )
            }
            (StateKind::NotStarted, Target::Query) => {
                journey.begin_walk();
                (
                    StateKind::Walking,
                    ops.outgoing(id, &[EdgeType::WalksToStation])?,
                )
            }
            (StateKind::NotStarted, Target::Grouped) => (
                StateKind::GroupedStation,
                ops.outgoing(id, &[EdgeType::GroupedToChild])?,
            ),

            (StateKind::Walking, Target::Station { platforms }) => {
                journey.end_walk();
                journey.seen_station(station_of(node)?);
                let mut rels = ops.boarding(id, None)?;
                rels.extend(ops.outgoing(id, &[EdgeType::Neighbour, EdgeType::GroupedToParent])?);
                (Target::station_kind(platforms), rels)
            }

            (kind, Target::Station { platforms }) if kind.at_station() => {
                if via.is_some_and(|r| r.kind() == EdgeType::Neighbour) {
                    journey.to_neighbour();
                }
                journey.seen_station(station_of(node)?);
                let mut rels = ops.boarding(id, None)?;
                rels.extend(ops.outgoing(id, &[EdgeType::GroupedToParent])?);
                (Target::station_kind(platforms), rels)
            }
            (kind, Target::Query) if kind.at_station() => {
                journey.begin_walk();
                (StateKind::Walking, Vec::new())
            }
            (kind, Target::Grouped) if kind.at_station() => {
                let mut rels = ops.outgoing(id, &[EdgeType::GroupedToChild])?;
                rels.retain(|r| Some(r.end()) != self.node);
                (StateKind::GroupedStation, rels)
            }
            (kind, Target::Platform) if kind.at_station() => {
                (StateKind::Platform, ops.boarding(id, None)?)
            }

            (
                StateKind::NoPlatformStation | StateKind::PlatformStation | StateKind::Platform,
                Target::RouteStation,
            ) => {
                let mode = node.mode().ok_or(TraversalError::MissingProperty {
                    node: id.index(),
                    property: "mode",
                })?;
                journey.board(mode)?;
                (
                    StateKind::JustBoarded,
                    ops.outgoing(id, &[EdgeType::ToService])?,
                )
            }

            (StateKind::JustBoarded | StateKind::RouteStationOnTrip, Target::Service) => {
                service = node.service().cloned();
                let mut rels = ops.outgoing(id, &[EdgeType::ToHour])?;
                let from = journey.clock().hour();
                rels.sort_by_key(|r| r.hour().map_or(u32::MAX, |h| (u32::from(h) + 24 - from) % 24));
                (StateKind::Service, rels)
            }

            (StateKind::Service, Target::Hour) => {
                let mut rels = ops.outgoing(id, &[EdgeType::ToMinute])?;
                if let Some(trip) = journey.current_trip() {
                    rels.retain(|r| r.trip() == Some(trip));
                }
                rels.sort_by_key(|r| r.time());
                (StateKind::Hour, rels)
            }

            (StateKind::Hour, Target::Minute) => {
                let time = node.time().ok_or(TraversalError::MissingProperty {
                    node: id.index(),
                    property: "time",
                })?;
                let departure = departure_for(time, journey.clock());
                if journey.current_trip().is_none() {
                    let trip = node.trip().cloned().ok_or(TraversalError::MissingProperty {
                        node: id.index(),
                        property: "trip",
                    })?;
                    journey.begin_trip(trip)?;
                }
                journey.record_time(departure, total_cost)?;

                let mut rels = ops.outgoing(id, &[EdgeType::GoesTo])?;
                if let Some(trip) = journey.current_trip() {
                    rels.retain(|r| r.trip() == Some(trip));
                }
                (StateKind::Minute, rels)
            }

            (StateKind::Minute, Target::RouteStation) => {
                let departs = ops.outgoing(id, &EdgeType::DEPARTING)?;
                let (towards, others): (Vec<_>, Vec<_>) =
                    departs.into_iter().partition(|r| ops.towards_destination(r));

                let mut continuing = ops.outgoing(id, &[EdgeType::ToService])?;
                continuing.retain(|r| r.service().is_some() && r.service() == service.as_ref());

                if continuing.is_empty() {
                    let mut rels = towards;
                    rels.extend(others);
                    (StateKind::RouteStationEndTrip, rels)
                } else if !towards.is_empty() {
                    (StateKind::RouteStationOnTrip, towards)
                } else {
                    let mut rels = others;
                    rels.extend(continuing);
                    (StateKind::RouteStationOnTrip, rels)
                }
            }

            (kind, Target::Station { platforms }) if kind.riding() => {
                let mode = journey.mode().ok_or(JourneyStateError::NotOnBoard)?;
                journey.leave(mode, total_cost)?;
                journey.seen_station(station_of(node)?);
                service = None;
                (
                    Target::station_kind(platforms),
                    ops.station_exits(id, self.node, journey)?,
                )
            }
            (kind, Target::Platform) if kind.riding() => {
                let mode = journey.mode().ok_or(JourneyStateError::NotOnBoard)?;
                journey.leave(mode, total_cost)?;
                service = None;
                let mut rels = ops.outgoing(id, &[EdgeType::LeavePlatform])?;
                rels.extend(ops.boarding(id, self.node)?);
                (StateKind::Platform, rels)
            }

            (StateKind::Platform, Target::Station { .. }) => {
                journey.seen_station(station_of(node)?);
                (
                    StateKind::PlatformStation,
                    ops.station_exits(id, self.node, journey)?,
                )
            }

            (StateKind::GroupedStation, Target::Station { platforms }) => {
                journey.seen_station(station_of(node)?);
                (
                    Target::station_kind(platforms),
                    ops.station_exits(id, self.node, journey)?,
                )
            }

            _ => return Err(unexpected()),
        };

        let (kind, outbound) = if ops.is_destination(id) {
            (StateKind::Destination, Vec::new())
        } else {
            (kind, outbound)
        };

        Ok(TraversalState {
            kind,
            node: Some(id),
            total_cost,
            trip: journey.current_trip().cloned(),
            service,
            outbound,
        })
    }
}

fn station_of(node: &GraphNode<'_>) -> Result<StationId, TraversalError> {
    node.station()
        .cloned()
        .ok_or(TraversalError::MissingProperty {
            node: node.id().index(),
            property: "station",
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::domain::{
        DateRange, LocationId, ServiceCalendar, TimeRange, TransportMode,
    };
    use crate::graph::memory::{InMemoryGraph, TimetableGraphBuilder};
    use crate::graph::GraphDatabase;
    use crate::network::{TimetableBuilder, TransitData};
    use crate::routes::RouteToRouteCosts;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn time(s: &str) -> TramTime {
        TramTime::parse_hhmm(s).unwrap()
    }

    fn sid(s: &str) -> StationId {
        StationId::parse(s).unwrap()
    }

    fn loc(s: &str) -> LocationId {
        LocationId::Station(sid(s))
    }

    fn network() -> Arc<TransitData> {
        let mut builder = TimetableBuilder::new();
        builder
            .station("A", "Alpha")
            .station("B", "Bravo")
            .station("C", "Charlie")
            .route("R1", "Red", TransportMode::Tram)
            .service("S1", "R1", ServiceCalendar::daily(DateRange::single(day())))
            .trip("T1", "S1", &[("A", "08:00"), ("B", "08:05"), ("C", "08:12")])
            .trip("T0", "S1", &[("A", "06:00"), ("B", "06:05")])
            .trip("T9", "S1", &[("A", "23:00"), ("B", "23:05")]);
        Arc::new(builder.build().unwrap())
    }

    fn constraints(data: &Arc<TransitData>, destination: &str) -> Arc<JourneyConstraints> {
        let modes = BTreeSet::from([TransportMode::Tram]);
        let costs = RouteToRouteCosts::new(Arc::clone(data), 3, None);
        let dest = [sid(destination)];
        let lowest = costs.lowest_costs_for(&dest, day(), TimeRange::all_day(), &modes);
        Arc::new(JourneyConstraints::new(
            &SearchConfig::default(),
            data,
            day(),
            &modes,
            &dest,
            lowest,
        ))
    }

    struct Walker<'t, T: GraphTransaction> {
        ops: TraversalOps<'t, T>,
        state: TraversalState<'t>,
        journey: JourneyState,
    }

    impl<'t, T: GraphTransaction> Walker<'t, T> {
        fn start(txn: &'t T, constraints: Arc<JourneyConstraints>, from: &str, to: &str, at: &str) -> Self {
            let dest = txn.find_node(&loc(to)).unwrap().unwrap();
            let ops = TraversalOps::new(txn, constraints, [dest]);
            let start = txn.find_node(&loc(from)).unwrap().unwrap();
            let node = txn.node(start).unwrap();
            let mut journey = JourneyState::new(time(at));
            let state = TraversalState::not_started()
                .next_state(&ops, None, &node, &mut journey, Duration::zero())
                .unwrap();
            Self { ops, state, journey }
        }

        /// Follow the outbound relationship at `index`.
        fn follow(&mut self, index: usize) -> Result<(), TraversalError> {
            let rel = self.state.outbound()[index].clone();
            let total = self.state.total_cost() + rel.cost();
            if rel.cost() > Duration::zero() {
                self.journey.update_total_cost(total)?;
            }
            let node = self.ops.txn().node(rel.end())?;
            self.state = self
                .state
                .next_state(&self.ops, Some(&rel), &node, &mut self.journey, total)?;
            Ok(())
        }

        fn kinds_out(&self) -> Vec<EdgeType> {
            self.state.outbound().iter().map(|r| r.kind()).collect()
        }
    }

    fn graph(data: &TransitData) -> InMemoryGraph {
        TimetableGraphBuilder::new(data).build()
    }

    #[test]
    fn ride_to_destination() {
        let data = network();
        let g = graph(&data);
        let txn = g.begin_tx().unwrap();
        let mut w = Walker::start(&txn, constraints(&data, "C"), "A", "C", "07:55");

        assert_eq!(w.state.kind(), StateKind::NoPlatformStation);
        assert_eq!(w.journey.visited(), &[sid("A")]);
        assert_eq!(w.kinds_out(), vec![EdgeType::Board]);

        w.follow(0).unwrap();
        assert_eq!(w.state.kind(), StateKind::JustBoarded);
        assert!(w.journey.on_board());
        w.follow(0).unwrap();
        assert_eq!(w.state.kind(), StateKind::Service);
        // hours from the clock's hour onwards, wrapping
        let hours: Vec<u8> = w.state.outbound().iter().filter_map(|r| r.hour()).collect();
        assert_eq!(hours, vec![8, 23, 6]);

        w.follow(0).unwrap();
        assert_eq!(w.state.kind(), StateKind::Hour);
        w.follow(0).unwrap();
        assert_eq!(w.state.kind(), StateKind::Minute);
        assert_eq!(w.journey.clock(), time("08:00"));
        assert_eq!(w.journey.current_trip().unwrap().as_str(), "T1");
        assert_eq!(w.state.trip().unwrap().as_str(), "T1");

        // ride to B, still on the trip
        w.follow(0).unwrap();
        assert_eq!(w.state.kind(), StateKind::RouteStationOnTrip);
        assert_eq!(w.journey.clock(), time("08:05"));
        assert_eq!(w.kinds_out(), vec![EdgeType::Depart, EdgeType::ToService]);

        // stay on board through B
        w.follow(1).unwrap();
        assert_eq!(w.state.kind(), StateKind::Service);
        w.follow(0).unwrap();
        assert_eq!(w.state.outbound().len(), 1);
        w.follow(0).unwrap();
        assert_eq!(w.state.kind(), StateKind::Minute);
        w.follow(0).unwrap();
        assert_eq!(w.state.kind(), StateKind::RouteStationEndTrip);
        assert_eq!(w.journey.clock(), time("08:12"));

        w.follow(0).unwrap();
        assert_eq!(w.state.kind(), StateKind::Destination);
        assert!(w.state.outbound().is_empty());
        assert!(!w.journey.on_board());
        assert_eq!(w.journey.clock(), time("08:12"));
        assert_eq!(w.journey.number_of_changes(), 0);
        assert_eq!(w.journey.visited(), &[sid("A"), sid("C")]);
    }

    #[test]
    fn departs_towards_destination_only() {
        let data = network();
        let g = graph(&data);
        let txn = g.begin_tx().unwrap();
        let mut w = Walker::start(&txn, constraints(&data, "B"), "A", "B", "07:55");
        for _ in 0..5 {
            w.follow(0).unwrap();
        }
        assert_eq!(w.state.kind(), StateKind::RouteStationOnTrip);
        // the trip continues to C, but B is where the journey ends
        assert_eq!(w.kinds_out(), vec![EdgeType::Depart]);
    }

    #[test]
    fn unexpected_transition_is_an_error() {
        let data = network();
        let g = graph(&data);
        let txn = g.begin_tx().unwrap();
        let mut w = Walker::start(&txn, constraints(&data, "C"), "A", "C", "07:55");
        w.follow(0).unwrap();
        let route_station = w.state.node().unwrap();

        // a station cannot be entered straight from the service state
        w.follow(0).unwrap();
        let node = txn.node(route_station).unwrap();
        let err = w
            .state
            .next_state(&w.ops, None, &node, &mut w.journey, Duration::zero())
            .unwrap_err();
        assert!(matches!(
            err,
            TraversalError::UnexpectedNode {
                kind: StateKind::Service,
                ..
            }
        ));
    }

    #[test]
    fn next_day_departures() {
        assert_eq!(departure_for(time("00:10"), time("23:50")), time("00:10"));
        assert_eq!(departure_for(time("00:10"), time("00:05+24")), time("00:10+24"));
        assert_eq!(departure_for(time("00:10+24"), time("00:05+24")), time("00:10+24"));
    }

    #[test]
    fn error_display() {
        let err = TraversalError::MissingProperty {
            node: 4,
            property: "station",
        };
        assert_eq!(err.to_string(), "node n4 has no station");
        let err = TraversalError::UnexpectedNode {
            kind: StateKind::Hour,
            node: 9,
            labels: Labels::of(&[GraphLabel::Station]),
        };
        assert_eq!(err.to_string(), "unexpected node n9 {Station} from state Hour");
    }
}
