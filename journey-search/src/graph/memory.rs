//! In-memory graph store.
//!
//! [`TimetableGraphBuilder`] lays out a [`TransitData`] as the time-expanded
//! topology the search walks:
//!
//! ```text
//! Station -BOARD-> RouteStation -TO_SERVICE-> Service -TO_HOUR-> Hour -TO_MINUTE-> Minute
//!    ^                                                                               |
//!    +-------DEPART------ RouteStation <----------------GOES_TO---------------------+
//! ```
//!
//! Stations with platforms board through `Platform` nodes. Station groups,
//! neighbours and diversions add station-level links. The store is immutable
//! once built; transactions keep their scratch nodes privately and discard
//! them when they end.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, trace};

use super::{
    Direction, EdgeType, GraphDatabase, GraphError, GraphLabel, GraphNode, GraphRelationship,
    GraphTransaction, Labels, NodeId, NodeProps, RelProps, RelationshipId,
};
use crate::domain::{LatLong, LocationId, PlatformId, RouteId, ServiceId, StationId};
use crate::network::TransitData;

#[derive(Debug, Clone)]
struct StoredNode {
    labels: Labels,
    props: Arc<NodeProps>,
}

#[derive(Debug, Clone)]
struct StoredRel {
    kind: EdgeType,
    start: u64,
    end: u64,
    props: Arc<RelProps>,
}

/// An immutable graph held in memory.
#[derive(Debug, Default)]
pub struct InMemoryGraph {
    nodes: Vec<StoredNode>,
    rels: Vec<StoredRel>,
    outgoing: Vec<Vec<u64>>,
    incoming: Vec<Vec<u64>>,
    locations: HashMap<LocationId, u64>,
}

impl InMemoryGraph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.rels.len()
    }

    /// Number of nodes carrying `label`.
    pub fn count_labelled(&self, label: GraphLabel) -> usize {
        self.nodes.iter().filter(|n| n.labels.contains(label)).count()
    }

    fn add_node(&mut self, labels: Labels, props: NodeProps) -> u64 {
        let id = self.nodes.len() as u64;
        self.nodes.push(StoredNode {
            labels,
            props: Arc::new(props),
        });
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        id
    }

    fn add_rel(&mut self, kind: EdgeType, start: u64, end: u64, props: RelProps) -> u64 {
        let id = self.rels.len() as u64;
        self.rels.push(StoredRel {
            kind,
            start,
            end,
            props: Arc::new(props),
        });
        self.outgoing[start as usize].push(id);
        self.incoming[end as usize].push(id);
        id
    }
}

impl GraphDatabase for InMemoryGraph {
    type Txn<'db>
        = MemoryTxn<'db>
    where
        Self: 'db;

    fn begin_tx(&self) -> Result<MemoryTxn<'_>, GraphError> {
        Ok(MemoryTxn {
            graph: self,
            scratch: RefCell::new(Scratch {
                next_node: self.nodes.len() as u64,
                next_rel: self.rels.len() as u64,
                ..Scratch::default()
            }),
        })
    }
}

#[derive(Debug, Default)]
struct Scratch {
    nodes: HashMap<u64, StoredNode>,
    rels: HashMap<u64, StoredRel>,
    outgoing: HashMap<u64, Vec<u64>>,
    incoming: HashMap<u64, Vec<u64>>,
    next_node: u64,
    next_rel: u64,
}

/// A transaction over an [`InMemoryGraph`].
pub struct MemoryTxn<'db> {
    graph: &'db InMemoryGraph,
    scratch: RefCell<Scratch>,
}

impl MemoryTxn<'_> {
    fn is_base(&self, raw: u64) -> bool {
        (raw as usize) < self.graph.nodes.len()
    }

    /// Number of scratch nodes currently alive in this transaction.
    pub fn scratch_nodes(&self) -> usize {
        self.scratch.borrow().nodes.len()
    }

    /// Number of scratch relationships currently alive in this transaction.
    pub fn scratch_relationships(&self) -> usize {
        self.scratch.borrow().rels.len()
    }
}

impl GraphTransaction for MemoryTxn<'_> {
    fn find_node(&self, location: &LocationId) -> Result<Option<NodeId<'_>>, GraphError> {
        Ok(self
            .graph
            .locations
            .get(location)
            .map(|raw| NodeId::from_raw(*raw)))
    }

    fn node<'a>(&'a self, id: NodeId<'a>) -> Result<GraphNode<'a>, GraphError> {
        let raw = id.index();
        if self.is_base(raw) {
            let stored = &self.graph.nodes[raw as usize];
            return Ok(GraphNode::new(id, stored.labels, stored.props.clone()));
        }
        let scratch = self.scratch.borrow();
        let stored = scratch
            .nodes
            .get(&raw)
            .ok_or(GraphError::NodeNotFound(raw))?;
        Ok(GraphNode::new(id, stored.labels, stored.props.clone()))
    }

    fn relationships<'a>(
        &'a self,
        node: NodeId<'a>,
        direction: Direction,
        types: &[EdgeType],
    ) -> Result<Vec<GraphRelationship<'a>>, GraphError> {
        let raw = node.index();
        let scratch = self.scratch.borrow();

        let base: &[u64] = if self.is_base(raw) {
            match direction {
                Direction::Outgoing => &self.graph.outgoing[raw as usize],
                Direction::Incoming => &self.graph.incoming[raw as usize],
            }
        } else if scratch.nodes.contains_key(&raw) {
            &[]
        } else {
            return Err(GraphError::NodeNotFound(raw));
        };
        let extra = match direction {
            Direction::Outgoing => scratch.outgoing.get(&raw),
            Direction::Incoming => scratch.incoming.get(&raw),
        };

        let mut result = Vec::new();
        for rel_id in base.iter().chain(extra.into_iter().flatten()) {
            let stored = match self.graph.rels.get(*rel_id as usize) {
                Some(stored) => stored,
                None => match scratch.rels.get(rel_id) {
                    Some(stored) => stored,
                    None => continue,
                },
            };
            if !types.is_empty() && !types.contains(&stored.kind) {
                continue;
            }
            result.push(GraphRelationship::new(
                RelationshipId::from_raw(*rel_id),
                stored.kind,
                NodeId::from_raw(stored.start),
                NodeId::from_raw(stored.end),
                stored.props.clone(),
            ));
        }
        Ok(result)
    }

    fn create_query_node(&self, position: LatLong) -> Result<NodeId<'_>, GraphError> {
        let mut scratch = self.scratch.borrow_mut();
        let raw = scratch.next_node;
        scratch.next_node += 1;
        scratch.nodes.insert(
            raw,
            StoredNode {
                labels: Labels::of(&[GraphLabel::QueryNode]),
                props: Arc::new(NodeProps {
                    position: Some(position),
                    ..NodeProps::default()
                }),
            },
        );
        trace!(node = raw, "created query node");
        Ok(NodeId::from_raw(raw))
    }

    fn create_walk<'a>(
        &'a self,
        from: NodeId<'a>,
        to: NodeId<'a>,
        kind: EdgeType,
        cost: Duration,
    ) -> Result<RelationshipId<'a>, GraphError> {
        let mut scratch = self.scratch.borrow_mut();
        for end in [from.index(), to.index()] {
            if !self.is_base(end) && !scratch.nodes.contains_key(&end) {
                return Err(GraphError::NodeNotFound(end));
            }
        }
        let raw = scratch.next_rel;
        scratch.next_rel += 1;
        let station = self.station_of(&scratch, to.index());
        scratch.rels.insert(
            raw,
            StoredRel {
                kind,
                start: from.index(),
                end: to.index(),
                props: Arc::new(RelProps {
                    cost,
                    station,
                    ..RelProps::default()
                }),
            },
        );
        scratch.outgoing.entry(from.index()).or_default().push(raw);
        scratch.incoming.entry(to.index()).or_default().push(raw);
        Ok(RelationshipId::from_raw(raw))
    }

    fn delete_node<'a>(&'a self, node: NodeId<'a>) -> Result<(), GraphError> {
        let raw = node.index();
        let mut scratch = self.scratch.borrow_mut();
        if scratch.nodes.remove(&raw).is_none() {
            return Err(GraphError::NotScratch(raw));
        }
        let attached: Vec<u64> = scratch
            .outgoing
            .remove(&raw)
            .into_iter()
            .chain(scratch.incoming.remove(&raw))
            .flatten()
            .collect();
        for rel_id in attached {
            if let Some(rel) = scratch.rels.remove(&rel_id) {
                if let Some(list) = scratch.outgoing.get_mut(&rel.start) {
                    list.retain(|r| *r != rel_id);
                }
                if let Some(list) = scratch.incoming.get_mut(&rel.end) {
                    list.retain(|r| *r != rel_id);
                }
            }
        }
        trace!(node = raw, "deleted query node");
        Ok(())
    }

    fn commit(self) -> Result<(), GraphError> {
        // the store is read-only; scratch state never outlives the transaction
        Ok(())
    }

    fn close(self) {}
}

impl MemoryTxn<'_> {
    fn station_of(&self, scratch: &Scratch, raw: u64) -> Option<StationId> {
        if self.is_base(raw) {
            self.graph.nodes[raw as usize].props.station.clone()
        } else {
            scratch.nodes.get(&raw).and_then(|n| n.props.station.clone())
        }
    }
}

/// Builds an [`InMemoryGraph`] from a [`TransitData`].
pub struct TimetableGraphBuilder<'a> {
    data: &'a TransitData,
    graph: InMemoryGraph,
    stations: BTreeMap<StationId, u64>,
    platforms: BTreeMap<(StationId, PlatformId), u64>,
    route_stations: BTreeMap<(RouteId, StationId), u64>,
    services: BTreeMap<(RouteId, StationId, ServiceId), u64>,
    hours: BTreeMap<(u64, u8), u64>,
}

impl<'a> TimetableGraphBuilder<'a> {
    pub fn new(data: &'a TransitData) -> Self {
        Self {
            data,
            graph: InMemoryGraph::default(),
            stations: BTreeMap::new(),
            platforms: BTreeMap::new(),
            route_stations: BTreeMap::new(),
            services: BTreeMap::new(),
            hours: BTreeMap::new(),
        }
    }

    pub fn build(mut self) -> InMemoryGraph {
        self.add_stations();
        self.add_groups();
        self.add_trips();
        self.add_station_links();

        debug!(
            nodes = self.graph.node_count(),
            relationships = self.graph.relationship_count(),
            "built timetable graph"
        );
        self.graph
    }

    fn add_stations(&mut self) {
        let mut stations: Vec<_> = self.data.stations().collect();
        stations.sort_by(|a, b| a.id.cmp(&b.id));

        for station in stations {
            let mut labels = Labels::for_modes(&station.modes).with(GraphLabel::Station);
            if station.has_platforms {
                labels.insert(GraphLabel::HasPlatforms);
            }
            if self.data.is_interchange(&station.id) {
                labels.insert(GraphLabel::Interchange);
            }
            let props = NodeProps {
                station: Some(station.id.clone()),
                group: station.group.clone(),
                position: station.position,
                ..NodeProps::default()
            };
            let node = self.graph.add_node(labels, props);
            self.stations.insert(station.id.clone(), node);
            self.graph
                .locations
                .insert(LocationId::Station(station.id.clone()), node);
        }
    }

    fn add_groups(&mut self) {
        let mut groups: Vec<_> = self.data.groups().collect();
        groups.sort_by(|a, b| a.id.cmp(&b.id));

        for group in groups {
            let props = NodeProps {
                group: Some(group.id.clone()),
                ..NodeProps::default()
            };
            let node = self.graph.add_node(Labels::of(&[GraphLabel::Grouped]), props);
            self.graph
                .locations
                .insert(LocationId::Group(group.id.clone()), node);

            for member in &group.stations {
                let Some(&station) = self.stations.get(member) else {
                    continue;
                };
                self.graph
                    .add_rel(EdgeType::GroupedToParent, station, node, RelProps::default());
                let to_child = RelProps {
                    station: Some(member.clone()),
                    ..RelProps::default()
                };
                self.graph
                    .add_rel(EdgeType::GroupedToChild, node, station, to_child);
            }
        }
    }

    fn platform_node(&mut self, station: &StationId, platform: &PlatformId) -> Option<u64> {
        let key = (station.clone(), platform.clone());
        if let Some(&node) = self.platforms.get(&key) {
            return Some(node);
        }
        let station_node = *self.stations.get(station)?;
        let position = self.data.station(station).and_then(|s| s.position);
        let modes = self
            .data
            .station(station)
            .map(|s| Labels::for_modes(&s.modes))
            .unwrap_or_default();
        let props = NodeProps {
            station: Some(station.clone()),
            platform: Some(platform.clone()),
            position,
            ..NodeProps::default()
        };
        let node = self.graph.add_node(modes.with(GraphLabel::Platform), props);
        self.graph
            .add_rel(EdgeType::EnterPlatform, station_node, node, RelProps::default());
        self.graph
            .add_rel(EdgeType::LeavePlatform, node, station_node, RelProps::default());
        self.platforms.insert(key, node);
        Some(node)
    }

    fn route_station_node(&mut self, route: &RouteId, station: &StationId) -> Option<u64> {
        let key = (route.clone(), station.clone());
        if let Some(&node) = self.route_stations.get(&key) {
            return Some(node);
        }
        let mode = self.data.route(route)?.mode;
        let mut labels = Labels::for_modes(&[mode]).with(GraphLabel::RouteStation);
        if self.data.is_interchange(station) {
            labels.insert(GraphLabel::Interchange);
        }
        let props = NodeProps {
            station: Some(station.clone()),
            route: Some(route.clone()),
            mode: Some(mode),
            position: self.data.station(station).and_then(|s| s.position),
            ..NodeProps::default()
        };
        let node = self.graph.add_node(labels, props);
        self.route_stations.insert(key, node);
        Some(node)
    }

    /// The node passengers board from or alight to for a call.
    fn access_node(&mut self, station: &StationId, platform: Option<&PlatformId>) -> Option<u64> {
        match platform {
            Some(platform) => self.platform_node(station, platform),
            None => self.stations.get(station).copied(),
        }
    }

    fn add_trips(&mut self) {
        let data = self.data;
        let mut boards: BTreeSet<(u64, u64)> = BTreeSet::new();
        let mut departs: BTreeSet<(u64, u64)> = BTreeSet::new();

        for trip in data.trips() {
            let last = trip.calls.len() - 1;
            let mut previous_minute: Option<(u64, Duration)> = None;

            for (i, call) in trip.calls.iter().enumerate() {
                let Some(route_station) = self.route_station_node(&trip.route, &call.station) else {
                    continue;
                };
                let Some(access) = self.access_node(&call.station, call.platform.as_ref()) else {
                    continue;
                };
                let interchange = data.is_interchange(&call.station);

                if let Some((minute, depart_minutes)) = previous_minute.take() {
                    let arrive_minutes = Duration::minutes(call.arrive.total_minutes() as i64);
                    let goes_to = RelProps {
                        cost: arrive_minutes - depart_minutes,
                        trip: Some(trip.id.clone()),
                        service: Some(trip.service.clone()),
                        route: Some(trip.route.clone()),
                        station: Some(call.station.clone()),
                        ..RelProps::default()
                    };
                    self.graph
                        .add_rel(EdgeType::GoesTo, minute, route_station, goes_to);
                }

                if i > 0 && departs.insert((route_station, access)) {
                    let kind = if interchange {
                        EdgeType::InterchangeDepart
                    } else {
                        EdgeType::Depart
                    };
                    let props = RelProps {
                        route: Some(trip.route.clone()),
                        station: Some(call.station.clone()),
                        ..RelProps::default()
                    };
                    self.graph.add_rel(kind, route_station, access, props);
                }

                if i == last {
                    continue;
                }

                if boards.insert((access, route_station)) {
                    let kind = if interchange {
                        EdgeType::InterchangeBoard
                    } else {
                        EdgeType::Board
                    };
                    let props = RelProps {
                        route: Some(trip.route.clone()),
                        station: Some(call.station.clone()),
                        ..RelProps::default()
                    };
                    self.graph.add_rel(kind, access, route_station, props);
                }

                let service = self.service_node(route_station, &trip.route, &call.station, &trip.service);
                let hour = (call.depart.hour()) as u8;
                let hour_node = self.hour_node(service, hour, &trip.service, &call.station);

                let minute_props = NodeProps {
                    station: Some(call.station.clone()),
                    route: Some(trip.route.clone()),
                    service: Some(trip.service.clone()),
                    trip: Some(trip.id.clone()),
                    time: Some(call.depart),
                    ..NodeProps::default()
                };
                let minute = self
                    .graph
                    .add_node(Labels::of(&[GraphLabel::Minute]), minute_props);
                let to_minute = RelProps {
                    trip: Some(trip.id.clone()),
                    time: Some(call.depart),
                    ..RelProps::default()
                };
                self.graph
                    .add_rel(EdgeType::ToMinute, hour_node, minute, to_minute);

                previous_minute = Some((minute, Duration::minutes(call.depart.total_minutes() as i64)));
            }
        }
    }

    fn service_node(
        &mut self,
        route_station: u64,
        route: &RouteId,
        station: &StationId,
        service: &ServiceId,
    ) -> u64 {
        let key = (route.clone(), station.clone(), service.clone());
        if let Some(&node) = self.services.get(&key) {
            return node;
        }
        let props = NodeProps {
            station: Some(station.clone()),
            route: Some(route.clone()),
            service: Some(service.clone()),
            ..NodeProps::default()
        };
        let node = self.graph.add_node(Labels::of(&[GraphLabel::Service]), props);
        let to_service = RelProps {
            service: Some(service.clone()),
            route: Some(route.clone()),
            ..RelProps::default()
        };
        self.graph
            .add_rel(EdgeType::ToService, route_station, node, to_service);
        self.services.insert(key, node);
        node
    }

    fn hour_node(&mut self, service_node: u64, hour: u8, service: &ServiceId, station: &StationId) -> u64 {
        if let Some(&node) = self.hours.get(&(service_node, hour)) {
            return node;
        }
        let props = NodeProps {
            station: Some(station.clone()),
            service: Some(service.clone()),
            hour: Some(hour),
            ..NodeProps::default()
        };
        let node = self.graph.add_node(Labels::of(&[GraphLabel::Hour]), props);
        let to_hour = RelProps {
            hour: Some(hour),
            ..RelProps::default()
        };
        self.graph.add_rel(EdgeType::ToHour, service_node, node, to_hour);
        self.hours.insert((service_node, hour), node);
        node
    }

    fn add_station_links(&mut self) {
        let mut stations: Vec<&StationId> = self.stations.keys().collect();
        stations.sort();
        let mut links = Vec::new();
        for from in stations {
            for neighbour in self.data.neighbours(from) {
                links.push((EdgeType::Neighbour, from.clone(), neighbour.station.clone(), neighbour.cost, None));
            }
        }
        for diversion in self.data.diversions() {
            links.push((
                EdgeType::Diversion,
                diversion.from.clone(),
                diversion.to.clone(),
                diversion.cost,
                Some(diversion.dates),
            ));
        }

        for (kind, from, to, cost, dates) in links {
            let (Some(&start), Some(&end)) = (self.stations.get(&from), self.stations.get(&to)) else {
                continue;
            };
            let props = RelProps {
                cost,
                station: Some(to),
                diversion: dates,
                ..RelProps::default()
            };
            self.graph.add_rel(kind, start, end, props);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DateRange, ServiceCalendar, StationGroupId, TransportMode};
    use crate::graph::CachedNodes;
    use crate::network::{CallSpec, TimetableBuilder};
    use chrono::NaiveDate;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn data() -> TransitData {
        let mut builder = TimetableBuilder::new();
        builder
            .station_at("A", "Alpha", LatLong::new(53.40, -2.30).unwrap())
            .station("B", "Bravo")
            .station("C", "Charlie")
            .group("AB", "Alpha and Bravo", &["A", "B"])
            .route("R1", "Red", TransportMode::Tram)
            .service("S1", "R1", ServiceCalendar::daily(DateRange::single(day())))
            .trip("T1", "S1", &[("A", "08:00"), ("B", "08:05"), ("C", "08:12")])
            .trip("T2", "S1", &[("A", "08:30"), ("B", "08:35"), ("C", "08:42")])
            .neighbours("A", "C", Duration::minutes(9));
        builder.build().unwrap()
    }

    fn graph() -> InMemoryGraph {
        TimetableGraphBuilder::new(&data()).build()
    }

    fn sid(s: &str) -> LocationId {
        LocationId::Station(StationId::parse(s).unwrap())
    }

    #[test]
    fn topology_counts() {
        let g = graph();
        assert_eq!(g.count_labelled(GraphLabel::Station), 3);
        assert_eq!(g.count_labelled(GraphLabel::RouteStation), 3);
        // service nodes at A and B only: nothing departs from C
        assert_eq!(g.count_labelled(GraphLabel::Service), 2);
        assert_eq!(g.count_labelled(GraphLabel::Hour), 2);
        assert_eq!(g.count_labelled(GraphLabel::Minute), 4);
        assert_eq!(g.count_labelled(GraphLabel::Grouped), 1);
    }

    #[test]
    fn find_and_read_station() {
        let g = graph();
        let txn = g.begin_tx().unwrap();
        let node = txn.find_node(&sid("A")).unwrap().unwrap();
        let contents = txn.node(node).unwrap();
        assert!(contents.has_label(GraphLabel::Station));
        assert!(contents.has_label(GraphLabel::Tram));
        assert_eq!(contents.station().unwrap().as_str(), "A");
        assert!(contents.position().is_some());

        assert!(txn.find_node(&sid("Z")).unwrap().is_none());
        let group = LocationId::Group(StationGroupId::parse("AB").unwrap());
        assert!(txn.find_node(&group).unwrap().is_some());
    }

    #[test]
    fn boarding_leads_to_minutes() {
        let g = graph();
        let txn = g.begin_tx().unwrap();
        let a = txn.find_node(&sid("A")).unwrap().unwrap();

        let boards = txn
            .relationships(a, Direction::Outgoing, &EdgeType::BOARDING)
            .unwrap();
        assert_eq!(boards.len(), 1);
        let route_station = boards[0].end();

        let services = txn
            .relationships(route_station, Direction::Outgoing, &[EdgeType::ToService])
            .unwrap();
        assert_eq!(services.len(), 1);
        let hours = txn
            .relationships(services[0].end(), Direction::Outgoing, &[EdgeType::ToHour])
            .unwrap();
        assert_eq!(hours.len(), 1);
        assert_eq!(hours[0].hour(), Some(8));

        let minutes = txn
            .relationships(hours[0].end(), Direction::Outgoing, &[EdgeType::ToMinute])
            .unwrap();
        let times: Vec<String> = minutes.iter().map(|m| m.time().unwrap().to_string()).collect();
        assert_eq!(times, vec!["08:00", "08:30"]);

        let goes_to = txn
            .relationships(minutes[0].end(), Direction::Outgoing, &[EdgeType::GoesTo])
            .unwrap();
        assert_eq!(goes_to.len(), 1);
        assert_eq!(goes_to[0].cost(), Duration::minutes(5));
        assert_eq!(goes_to[0].trip().unwrap().as_str(), "T1");
    }

    #[test]
    fn neighbours_are_bidirectional() {
        let g = graph();
        let txn = g.begin_tx().unwrap();
        let a = txn.find_node(&sid("A")).unwrap().unwrap();
        let c = txn.find_node(&sid("C")).unwrap().unwrap();
        let out = txn
            .relationships(a, Direction::Outgoing, &[EdgeType::Neighbour])
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].end(), c);
        let back = txn
            .relationships(c, Direction::Outgoing, &[EdgeType::Neighbour])
            .unwrap();
        assert_eq!(back[0].end(), a);
    }

    #[test]
    fn platforms_sit_between_station_and_route_station() {
        let mut builder = TimetableBuilder::new();
        builder
            .station("P", "Piccadilly")
            .station("Q", "Queens")
            .route("R1", "Red", TransportMode::Tram)
            .service("S1", "R1", ServiceCalendar::daily(DateRange::single(day())))
            .trip_calls(
                "T1",
                "S1",
                vec![CallSpec::at("P", "10:00").platform("1"), CallSpec::at("Q", "10:04")],
            );
        let g = TimetableGraphBuilder::new(&builder.build().unwrap()).build();
        let txn = g.begin_tx().unwrap();

        let p = txn.find_node(&sid("P")).unwrap().unwrap();
        assert!(txn.node(p).unwrap().has_label(GraphLabel::HasPlatforms));
        assert!(txn
            .relationships(p, Direction::Outgoing, &EdgeType::BOARDING)
            .unwrap()
            .is_empty());
        let enter = txn
            .relationships(p, Direction::Outgoing, &[EdgeType::EnterPlatform])
            .unwrap();
        assert_eq!(enter.len(), 1);
        let platform = enter[0].end();
        assert!(txn.node(platform).unwrap().has_label(GraphLabel::Platform));
        assert_eq!(
            txn.relationships(platform, Direction::Outgoing, &EdgeType::BOARDING)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn scratch_nodes_are_private_and_removable() {
        let g = graph();
        let base_rels = g.relationship_count();
        let txn = g.begin_tx().unwrap();
        let a = txn.find_node(&sid("A")).unwrap().unwrap();

        let query = txn
            .create_query_node(LatLong::new(53.41, -2.30).unwrap())
            .unwrap();
        txn.create_walk(query, a, EdgeType::WalksToStation, Duration::minutes(4))
            .unwrap();
        assert!(txn.node(query).unwrap().has_label(GraphLabel::QueryNode));
        let walks = txn
            .relationships(query, Direction::Outgoing, &[EdgeType::WalksToStation])
            .unwrap();
        assert_eq!(walks.len(), 1);
        assert_eq!(walks[0].cost(), Duration::minutes(4));
        assert_eq!(
            txn.relationships(a, Direction::Incoming, &[EdgeType::WalksToStation])
                .unwrap()
                .len(),
            1
        );

        txn.delete_node(query).unwrap();
        assert_eq!(txn.scratch_nodes(), 0);
        assert_eq!(txn.scratch_relationships(), 0);
        assert!(txn.node(query).is_err());
        assert!(txn
            .relationships(a, Direction::Incoming, &[EdgeType::WalksToStation])
            .unwrap()
            .is_empty());
        assert_eq!(g.relationship_count(), base_rels);
    }

    #[test]
    fn cannot_delete_base_nodes() {
        let g = graph();
        let txn = g.begin_tx().unwrap();
        let a = txn.find_node(&sid("A")).unwrap().unwrap();
        assert!(matches!(txn.delete_node(a), Err(GraphError::NotScratch(_))));
    }

    #[test]
    fn transactions_do_not_share_scratch() {
        let g = graph();
        let first = g.begin_tx().unwrap();
        let second = g.begin_tx().unwrap();
        let query = first
            .create_query_node(LatLong::new(53.41, -2.30).unwrap())
            .unwrap();
        let raw = query.index();
        assert_eq!(first.scratch_nodes(), 1);
        assert_eq!(second.scratch_nodes(), 0);
        assert!(second.node(NodeId::from_raw(raw)).is_err());
        first.close();
        second.commit().unwrap();
    }

    #[test]
    fn cached_nodes_hit_after_first_read() {
        let g = graph();
        let txn = g.begin_tx().unwrap();
        let cache = CachedNodes::new(&txn);
        let a = txn.find_node(&sid("A")).unwrap().unwrap();

        cache.get(a).unwrap();
        cache.get(a).unwrap();
        assert_eq!(cache.stats(), (1, 1));

        cache.invalidate(a);
        cache.get(a).unwrap();
        assert_eq!(cache.stats(), (1, 2));
    }
}
