//! Memoised rejections from earlier visits to the same node.
//!
//! Only rejections that depend on nothing but the key are stored, so a hit
//! replays exactly what evaluating the node again would decide.

use std::time::Duration;

use moka::sync::Cache;
use tracing::debug;

use super::journey_state::JourneyState;
use super::reason::ReasonCode;
use crate::domain::TramTime;
use crate::graph::{GraphLabel, GraphNode};

const TIME_TO_LIVE: Duration = Duration::from_secs(5 * 60);

/// (node, clock, journey begun) for minute and hour nodes.
type TimedKey = (u64, TramTime, bool);

/// (node, clock, changes so far) for route-station nodes.
type RouteStationKey = (u64, TramTime, u32);

/// (node, clock on the following day) for service nodes.
type ServiceKey = (u64, bool);

/// Per path request cache of rejections, one store per node kind.
pub struct PreviousVisits {
    enabled: bool,
    minutes: Cache<TimedKey, ReasonCode>,
    hours: Cache<TimedKey, ReasonCode>,
    route_stations: Cache<RouteStationKey, ReasonCode>,
    services: Cache<ServiceKey, ReasonCode>,
    hits: u64,
    misses: u64,
}

impl PreviousVisits {
    /// A cache holding up to `capacity` entries per node kind.
    pub fn new(capacity: u64) -> Self {
        Self::with_enabled(capacity, true)
    }

    /// A cache that never stores anything and always misses.
    pub fn disabled() -> Self {
        Self::with_enabled(0, false)
    }

    fn with_enabled(capacity: u64, enabled: bool) -> Self {
        fn store<K, V>(capacity: u64) -> Cache<K, V>
        where
            K: std::hash::Hash + Eq + Send + Sync + 'static,
            V: Clone + Send + Sync + 'static,
        {
            Cache::builder()
                .max_capacity(capacity)
                .time_to_live(TIME_TO_LIVE)
                .build()
        }
        Self {
            enabled,
            minutes: store(capacity),
            hours: store(capacity),
            route_stations: store(capacity),
            services: store(capacity),
            hits: 0,
            misses: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The rejection recorded for an equivalent earlier visit, as its
    /// cached code.
    pub fn cached(&mut self, node: &GraphNode<'_>, journey: &JourneyState) -> Option<ReasonCode> {
        if !self.enabled {
            return None;
        }
        let found = match Slot::of(node, journey) {
            Some(Slot::Minute(key)) => self.minutes.get(&key),
            Some(Slot::Hour(key)) => self.hours.get(&key),
            Some(Slot::RouteStation(key)) => self.route_stations.get(&key),
            Some(Slot::Service(key)) => self.services.get(&key),
            None => return None,
        };
        match found {
            Some(code) => {
                self.hits += 1;
                Some(code.as_cached())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Offer the outcome of evaluating `node`. Only key-determined
    /// rejections are kept.
    pub fn record(&self, node: &GraphNode<'_>, journey: &JourneyState, code: ReasonCode) {
        if !self.enabled {
            return;
        }
        match Slot::of(node, journey) {
            Some(Slot::Minute(key)) if code == ReasonCode::DoesNotOperateOnTime => {
                self.minutes.insert(key, code);
            }
            Some(Slot::Hour(key)) if code == ReasonCode::NotAtHour => {
                self.hours.insert(key, code);
            }
            Some(Slot::RouteStation(key))
                if matches!(
                    code,
                    ReasonCode::TransportModeWrong
                        | ReasonCode::StationClosed
                        | ReasonCode::RouteNotOnQueryDate
                        | ReasonCode::TooManyRouteChangesRequired
                        | ReasonCode::TooManyInterchangesRequired
                ) =>
            {
                self.route_stations.insert(key, code);
            }
            Some(Slot::Service(key)) if code == ReasonCode::NotOnQueryDate => {
                self.services.insert(key, code);
            }
            _ => {}
        }
    }

    /// (hits, misses) since creation.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    pub fn report_stats(&self) {
        if self.enabled {
            debug!(
                hits = self.hits,
                misses = self.misses,
                minutes = self.minutes.entry_count(),
                hours = self.hours.entry_count(),
                route_stations = self.route_stations.entry_count(),
                services = self.services.entry_count(),
                "previous visits"
            );
        }
    }
}

enum Slot {
    Minute(TimedKey),
    Hour(TimedKey),
    RouteStation(RouteStationKey),
    Service(ServiceKey),
}

impl Slot {
    fn of(node: &GraphNode<'_>, journey: &JourneyState) -> Option<Slot> {
        let id = node.id().index();
        let clock = journey.clock();
        let slot = if node.has_label(GraphLabel::Minute) {
            Slot::Minute((id, clock, journey.has_begun()))
        } else if node.has_label(GraphLabel::Hour) {
            Slot::Hour((id, clock, journey.has_begun()))
        } else if node.has_label(GraphLabel::RouteStation) {
            Slot::RouteStation((id, clock, journey.number_of_changes()))
        } else if node.has_label(GraphLabel::Service) {
            Slot::Service((id, clock.is_next_day()))
        } else {
            return None;
        };
        Some(slot)
    }
}
