//! Search configuration for the journey planner.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Duration;

use crate::domain::TransportMode;

/// Configuration parameters for journey search.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Longest wait for a vehicle once the journey has begun (minutes).
    pub max_wait_mins: i64,

    /// Longest wait for the first vehicle after the query time (minutes).
    pub max_initial_wait_mins: i64,

    /// Per-mode overrides of the initial wait. When a query's modes have
    /// overrides, the largest applies.
    pub initial_wait_by_mode: BTreeMap<TransportMode, i64>,

    /// Maximum total journey time (minutes).
    /// Branches longer than this are pruned during search.
    pub max_journey_mins: i64,

    /// Walks between a position and a station allowed per journey.
    pub max_walking_connections: u32,

    /// Walks between neighbouring stations allowed per journey.
    pub max_neighbour_connections: u32,

    /// Wall-clock budget for one path request before its first arrival.
    pub calc_timeout_millis: u64,

    /// Expand branches depth first instead of in cost order.
    pub depth_first: bool,

    /// Modes searched when a request does not name any.
    pub transport_modes: BTreeSet<TransportMode>,

    /// Number of start times tried per query.
    pub number_queries: usize,

    /// Spacing between successive start times (minutes).
    pub query_interval_mins: i64,

    /// Maximum number of journeys to return.
    pub max_results: usize,

    /// Degrees built into the route interchange matrix. Journeys needing
    /// more changes than this are never found.
    pub max_route_depth: usize,

    /// Radius searched for stations around a position (kilometres).
    pub nearest_stops_range_km: f64,

    /// Stations walked to or from a position, nearest first.
    pub max_walk_stations: usize,

    /// Walking speed used for walk costs.
    pub walking_mph: f64,

    /// Entries kept per node kind in the previous-visit cache.
    pub previous_visits_capacity: u64,
}

impl SearchConfig {
    /// Create a configuration for the given modes with the given waits and
    /// journey limit; everything else takes its default.
    pub fn new(
        transport_modes: impl IntoIterator<Item = TransportMode>,
        max_wait_mins: i64,
        max_initial_wait_mins: i64,
        max_journey_mins: i64,
    ) -> Self {
        Self {
            transport_modes: transport_modes.into_iter().collect(),
            max_wait_mins,
            max_initial_wait_mins,
            max_journey_mins,
            ..Self::default()
        }
    }

    /// Returns the maximum wait as a Duration.
    pub fn max_wait(&self) -> Duration {
        Duration::minutes(self.max_wait_mins)
    }

    /// Returns the initial wait for a query over `modes` as a Duration.
    pub fn max_initial_wait(&self, modes: &BTreeSet<TransportMode>) -> Duration {
        let minutes = modes
            .iter()
            .filter_map(|m| self.initial_wait_by_mode.get(m).copied())
            .max()
            .unwrap_or(self.max_initial_wait_mins);
        Duration::minutes(minutes)
    }

    /// Returns the maximum journey time as a Duration.
    pub fn max_journey(&self) -> Duration {
        Duration::minutes(self.max_journey_mins)
    }

    /// Returns the spacing between start times as a Duration.
    pub fn query_interval(&self) -> Duration {
        Duration::minutes(self.query_interval_mins)
    }

    /// Returns the path request time budget.
    pub fn calc_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.calc_timeout_millis)
    }

    /// Walking time for a straight-line distance, rounded up to whole minutes.
    pub fn walking_time(&self, distance_km: f64) -> Duration {
        let miles = distance_km / 1.609_344;
        let minutes = (miles / self.walking_mph * 60.0).ceil().max(0.0);
        Duration::minutes(minutes as i64)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_wait_mins: 25,
            max_initial_wait_mins: 13,
            initial_wait_by_mode: BTreeMap::new(),
            max_journey_mins: 124,
            max_walking_connections: 3,
            max_neighbour_connections: 2,
            calc_timeout_millis: 3500,
            depth_first: false,
            transport_modes: BTreeSet::from([TransportMode::Tram]),
            number_queries: 3,
            query_interval_mins: 12,
            max_results: 5,
            max_route_depth: 5,
            nearest_stops_range_km: 1.6,
            max_walk_stations: 5,
            walking_mph: 3.0,
            previous_visits_capacity: 10_000,
        }
    }
}
