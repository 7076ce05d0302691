//! Per-query limits shared by every path request of one journey query.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};

use crate::config::SearchConfig;
use crate::domain::{
    RouteId, ServiceId, StationClosure, StationId, TimeRange, TramTime, TransportMode,
};
use crate::graph::Labels;
use crate::network::{RunningRoutesAndServices, TransitData};
use crate::routes::LowestCostsForDestRoutes;

/// Immutable limits and lookups for one query date.
///
/// Built once per query and shared between its path requests.
#[derive(Debug, Clone)]
pub struct JourneyConstraints {
    date: NaiveDate,
    max_path_length: usize,
    max_journey: Duration,
    max_walking_connections: u32,
    max_neighbour_connections: u32,
    closures: Vec<StationClosure>,
    destinations: BTreeSet<StationId>,
    destination_modes: Labels,
    destinations_available: TimeRange,
    running: RunningRoutesAndServices,
    lowest_costs: LowestCostsForDestRoutes,
}

impl JourneyConstraints {
    /// Limits for a query over `modes` on `date`, arriving at `destinations`.
    ///
    /// Destination modes are the requested modes serving the destination
    /// stations. The availability window is the span of drop-offs at the
    /// destinations; with none it is the whole day.
    pub fn new(
        config: &SearchConfig,
        data: &TransitData,
        date: NaiveDate,
        modes: &BTreeSet<TransportMode>,
        destinations: &[StationId],
        lowest_costs: LowestCostsForDestRoutes,
    ) -> Self {
        let max_path_length = modes
            .iter()
            .filter_map(TransportMode::max_path_length)
            .max()
            .unwrap_or(0);

        let next_date = date.succ_opt().unwrap_or(date);
        let closures = data
            .closures()
            .iter()
            .filter(|c| c.active_on(date) || c.active_on(next_date))
            .cloned()
            .collect();

        let destination_modes: BTreeSet<TransportMode> = destinations
            .iter()
            .filter_map(|s| data.station(s))
            .flat_map(|s| s.modes.iter().copied())
            .filter(|m| modes.contains(m))
            .collect();

        let destinations_available = data
            .dropoff_window(destinations, date)
            .unwrap_or_else(TimeRange::all_day);

        Self {
            date,
            max_path_length,
            max_journey: config.max_journey(),
            max_walking_connections: config.max_walking_connections,
            max_neighbour_connections: config.max_neighbour_connections,
            closures,
            destinations: destinations.iter().cloned().collect(),
            destination_modes: Labels::for_modes(&destination_modes),
            destinations_available,
            running: RunningRoutesAndServices::for_date(data, date, modes),
            lowest_costs,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn max_path_length(&self) -> usize {
        self.max_path_length
    }

    pub fn max_journey(&self) -> Duration {
        self.max_journey
    }

    pub fn max_walking_connections(&self) -> u32 {
        self.max_walking_connections
    }

    pub fn max_neighbour_connections(&self) -> u32 {
        self.max_neighbour_connections
    }

    pub fn destinations(&self) -> &BTreeSet<StationId> {
        &self.destinations
    }

    pub fn is_destination(&self, station: &StationId) -> bool {
        self.destinations.contains(station)
    }

    /// Mode labels of the vehicles serving the destinations.
    pub fn destination_modes(&self) -> Labels {
        self.destination_modes
    }

    pub fn closures(&self) -> &[StationClosure] {
        &self.closures
    }

    pub fn running(&self) -> &RunningRoutesAndServices {
        &self.running
    }

    pub fn lowest_costs(&self) -> &LowestCostsForDestRoutes {
        &self.lowest_costs
    }

    /// True if the station is closed at `clock` on the query date.
    pub fn is_closed(&self, station: &StationId, clock: TramTime) -> bool {
        self.closures
            .iter()
            .any(|c| c.station() == station && c.closed_at(self.date, clock))
    }

    /// True if a vehicle departing at `time` could still reach a destination
    /// while it is served.
    ///
    /// Only the last drop-off bounds this. A window ending after midnight
    /// admits every time on the query date.
    pub fn destinations_available(&self, time: TramTime) -> bool {
        time <= self.destinations_available.end()
    }

    /// True if the route does not run on the day of `visit_time`.
    pub fn is_unavailable(&self, route: &RouteId, visit_time: TramTime) -> bool {
        !self.running.is_route_running(route, visit_time.is_next_day())
    }

    pub fn is_running_on_date(&self, service: &ServiceId, clock: TramTime) -> bool {
        self.running
            .is_service_running_by_date(service, clock.is_next_day())
    }

    pub fn is_running_at_time(&self, service: &ServiceId, clock: TramTime, wait: Duration) -> bool {
        self.running.is_service_running_by_time(service, clock, wait)
    }
}
