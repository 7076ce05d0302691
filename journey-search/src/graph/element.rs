//! Node and relationship contents.

use std::sync::Arc;

use chrono::Duration;

use super::{EdgeType, GraphLabel, Labels, NodeId, RelationshipId};
use crate::domain::{
    DateRange, LatLong, PlatformId, RouteId, ServiceId, StationGroupId, StationId, TramTime,
    TransportMode, TripId,
};

/// Typed node properties. Which fields are set depends on the node's labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeProps {
    pub station: Option<StationId>,
    pub platform: Option<PlatformId>,
    pub route: Option<RouteId>,
    pub service: Option<ServiceId>,
    pub trip: Option<TripId>,
    pub group: Option<StationGroupId>,
    /// Departure time, on minute nodes.
    pub time: Option<TramTime>,
    /// Hour of day, on hour nodes.
    pub hour: Option<u8>,
    /// Mode of the route, on route-station nodes.
    pub mode: Option<TransportMode>,
    pub position: Option<LatLong>,
}

/// A node as read within a transaction.
#[derive(Debug, Clone)]
pub struct GraphNode<'txn> {
    id: NodeId<'txn>,
    labels: Labels,
    props: Arc<NodeProps>,
}

impl<'txn> GraphNode<'txn> {
    pub fn new(id: NodeId<'txn>, labels: Labels, props: Arc<NodeProps>) -> Self {
        Self { id, labels, props }
    }

    pub fn id(&self) -> NodeId<'txn> {
        self.id
    }

    pub fn labels(&self) -> Labels {
        self.labels
    }

    pub fn has_label(&self, label: GraphLabel) -> bool {
        self.labels.contains(label)
    }

    pub fn props(&self) -> &NodeProps {
        &self.props
    }

    pub fn station(&self) -> Option<&StationId> {
        self.props.station.as_ref()
    }

    pub fn route(&self) -> Option<&RouteId> {
        self.props.route.as_ref()
    }

    pub fn service(&self) -> Option<&ServiceId> {
        self.props.service.as_ref()
    }

    pub fn trip(&self) -> Option<&TripId> {
        self.props.trip.as_ref()
    }

    pub fn time(&self) -> Option<TramTime> {
        self.props.time
    }

    pub fn hour(&self) -> Option<u8> {
        self.props.hour
    }

    pub fn mode(&self) -> Option<TransportMode> {
        self.props.mode
    }

    pub fn position(&self) -> Option<LatLong> {
        self.props.position
    }
}

/// Typed relationship properties.
#[derive(Debug, Clone, PartialEq)]
pub struct RelProps {
    pub cost: Duration,
    pub trip: Option<TripId>,
    pub service: Option<ServiceId>,
    pub route: Option<RouteId>,
    pub station: Option<StationId>,
    pub hour: Option<u8>,
    pub time: Option<TramTime>,
    /// Dates a diversion is in effect.
    pub diversion: Option<DateRange>,
}

impl RelProps {
    pub fn with_cost(cost: Duration) -> Self {
        Self {
            cost,
            ..Self::default()
        }
    }
}

impl Default for RelProps {
    fn default() -> Self {
        Self {
            cost: Duration::zero(),
            trip: None,
            service: None,
            route: None,
            station: None,
            hour: None,
            time: None,
            diversion: None,
        }
    }
}

/// A relationship as read within a transaction.
#[derive(Debug, Clone)]
pub struct GraphRelationship<'txn> {
    id: RelationshipId<'txn>,
    kind: EdgeType,
    start: NodeId<'txn>,
    end: NodeId<'txn>,
    props: Arc<RelProps>,
}

impl<'txn> GraphRelationship<'txn> {
    pub fn new(
        id: RelationshipId<'txn>,
        kind: EdgeType,
        start: NodeId<'txn>,
        end: NodeId<'txn>,
        props: Arc<RelProps>,
    ) -> Self {
        Self {
            id,
            kind,
            start,
            end,
            props,
        }
    }

    pub fn id(&self) -> RelationshipId<'txn> {
        self.id
    }

    pub fn kind(&self) -> EdgeType {
        self.kind
    }

    pub fn start(&self) -> NodeId<'txn> {
        self.start
    }

    pub fn end(&self) -> NodeId<'txn> {
        self.end
    }

    pub fn cost(&self) -> Duration {
        self.props.cost
    }

    pub fn props(&self) -> &RelProps {
        &self.props
    }

    pub fn trip(&self) -> Option<&TripId> {
        self.props.trip.as_ref()
    }

    pub fn service(&self) -> Option<&ServiceId> {
        self.props.service.as_ref()
    }

    pub fn hour(&self) -> Option<u8> {
        self.props.hour
    }

    pub fn time(&self) -> Option<TramTime> {
        self.props.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_accessors() {
        let props = NodeProps {
            station: Some(StationId::parse("ALT").unwrap()),
            mode: Some(TransportMode::Tram),
            ..NodeProps::default()
        };
        let node = GraphNode::new(
            NodeId::from_raw(1),
            Labels::of(&[GraphLabel::RouteStation, GraphLabel::Tram]),
            Arc::new(props),
        );
        assert!(node.has_label(GraphLabel::RouteStation));
        assert_eq!(node.station().unwrap().as_str(), "ALT");
        assert_eq!(node.mode(), Some(TransportMode::Tram));
        assert!(node.trip().is_none());
    }

    #[test]
    fn relationship_accessors() {
        let rel = GraphRelationship::new(
            RelationshipId::from_raw(9),
            EdgeType::GoesTo,
            NodeId::from_raw(1),
            NodeId::from_raw(2),
            Arc::new(RelProps::with_cost(Duration::minutes(4))),
        );
        assert_eq!(rel.kind(), EdgeType::GoesTo);
        assert_eq!(rel.cost(), Duration::minutes(4));
        assert_eq!(rel.end(), NodeId::from_raw(2));
    }
}
