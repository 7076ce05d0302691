//! Node labels, relationship types and traversal direction.

use std::fmt;

use crate::domain::TransportMode;

/// A single node label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum GraphLabel {
    Station,
    HasPlatforms,
    Platform,
    RouteStation,
    Interchange,
    Service,
    Hour,
    Minute,
    QueryNode,
    Grouped,
    Tram,
    Bus,
    Train,
    Subway,
    Ferry,
    RailReplacementBus,
}

impl GraphLabel {
    const ALL: [GraphLabel; 16] = [
        GraphLabel::Station,
        GraphLabel::HasPlatforms,
        GraphLabel::Platform,
        GraphLabel::RouteStation,
        GraphLabel::Interchange,
        GraphLabel::Service,
        GraphLabel::Hour,
        GraphLabel::Minute,
        GraphLabel::QueryNode,
        GraphLabel::Grouped,
        GraphLabel::Tram,
        GraphLabel::Bus,
        GraphLabel::Train,
        GraphLabel::Subway,
        GraphLabel::Ferry,
        GraphLabel::RailReplacementBus,
    ];

    /// The label marking nodes served by a mode. Walking has none.
    pub fn for_mode(mode: TransportMode) -> Option<GraphLabel> {
        match mode {
            TransportMode::Tram => Some(GraphLabel::Tram),
            TransportMode::Bus => Some(GraphLabel::Bus),
            TransportMode::Train => Some(GraphLabel::Train),
            TransportMode::Subway => Some(GraphLabel::Subway),
            TransportMode::Ferry => Some(GraphLabel::Ferry),
            TransportMode::RailReplacementBus => Some(GraphLabel::RailReplacementBus),
            TransportMode::Walk | TransportMode::Connect => None,
        }
    }

    fn mode(self) -> Option<TransportMode> {
        match self {
            GraphLabel::Tram => Some(TransportMode::Tram),
            GraphLabel::Bus => Some(TransportMode::Bus),
            GraphLabel::Train => Some(TransportMode::Train),
            GraphLabel::Subway => Some(TransportMode::Subway),
            GraphLabel::Ferry => Some(TransportMode::Ferry),
            GraphLabel::RailReplacementBus => Some(TransportMode::RailReplacementBus),
            _ => None,
        }
    }

    const fn bit(self) -> u32 {
        1 << (self as u8)
    }
}

/// A set of [`GraphLabel`]s.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Labels(u32);

impl Labels {
    pub const EMPTY: Labels = Labels(0);

    pub fn of(labels: &[GraphLabel]) -> Self {
        Self(labels.iter().fold(0, |bits, l| bits | l.bit()))
    }

    /// Mode labels for each vehicle mode in `modes`.
    pub fn for_modes<'a>(modes: impl IntoIterator<Item = &'a TransportMode>) -> Self {
        let mut labels = Self::EMPTY;
        for label in modes.into_iter().filter_map(|m| GraphLabel::for_mode(*m)) {
            labels.insert(label);
        }
        labels
    }

    pub fn with(mut self, label: GraphLabel) -> Self {
        self.insert(label);
        self
    }

    pub fn insert(&mut self, label: GraphLabel) {
        self.0 |= label.bit();
    }

    pub fn contains(&self, label: GraphLabel) -> bool {
        self.0 & label.bit() != 0
    }

    pub fn intersects(&self, other: Labels) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = GraphLabel> + '_ {
        GraphLabel::ALL.into_iter().filter(|l| self.contains(*l))
    }

    /// The transport modes named by mode labels in this set.
    pub fn modes(&self) -> impl Iterator<Item = TransportMode> + '_ {
        self.iter().filter_map(GraphLabel::mode)
    }

    /// Only the mode labels of this set.
    pub fn mode_labels(&self) -> Labels {
        let mut result = Labels::EMPTY;
        for label in self.iter().filter(|l| l.mode().is_some()) {
            result.insert(label);
        }
        result
    }
}

impl fmt::Debug for Labels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Relationship types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeType {
    /// Station or platform to route station.
    Board,
    /// As `Board`, at an interchange station.
    InterchangeBoard,
    /// Route station to station or platform.
    Depart,
    /// As `Depart`, at an interchange station.
    InterchangeDepart,
    ToService,
    ToHour,
    ToMinute,
    /// Minute node to the next route station of the trip.
    GoesTo,
    EnterPlatform,
    LeavePlatform,
    /// Query node to a nearby station.
    WalksToStation,
    /// Station to a destination query node.
    WalksFromStation,
    Neighbour,
    GroupedToParent,
    GroupedToChild,
    Diversion,
}

impl EdgeType {
    pub const BOARDING: [EdgeType; 2] = [EdgeType::Board, EdgeType::InterchangeBoard];
    pub const DEPARTING: [EdgeType; 2] = [EdgeType::Depart, EdgeType::InterchangeDepart];

    pub fn is_boarding(&self) -> bool {
        matches!(self, EdgeType::Board | EdgeType::InterchangeBoard)
    }

    pub fn is_departing(&self) -> bool {
        matches!(self, EdgeType::Depart | EdgeType::InterchangeDepart)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Outgoing,
    Incoming,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_operations() {
        let labels = Labels::of(&[GraphLabel::Station, GraphLabel::Tram]);
        assert!(labels.contains(GraphLabel::Station));
        assert!(!labels.contains(GraphLabel::Platform));
        assert!(labels.intersects(Labels::of(&[GraphLabel::Tram, GraphLabel::Bus])));
        assert!(!labels.intersects(Labels::of(&[GraphLabel::Bus])));
        assert!(Labels::EMPTY.is_empty());
    }

    #[test]
    fn mode_labels() {
        let labels = Labels::of(&[GraphLabel::RouteStation, GraphLabel::Bus, GraphLabel::Tram]);
        let modes: Vec<TransportMode> = labels.modes().collect();
        assert_eq!(modes, vec![TransportMode::Tram, TransportMode::Bus]);
        assert_eq!(labels.mode_labels(), Labels::of(&[GraphLabel::Bus, GraphLabel::Tram]));

        let from_modes = Labels::for_modes(&[TransportMode::Ferry, TransportMode::Walk]);
        assert_eq!(from_modes, Labels::of(&[GraphLabel::Ferry]));
    }

    #[test]
    fn debug_lists_labels() {
        let labels = Labels::of(&[GraphLabel::Hour]).with(GraphLabel::Grouped);
        assert_eq!(format!("{labels:?}"), "{Hour, Grouped}");
    }

    #[test]
    fn edge_kinds() {
        assert!(EdgeType::InterchangeBoard.is_boarding());
        assert!(EdgeType::Depart.is_departing());
        assert!(!EdgeType::GoesTo.is_boarding());
    }
}
