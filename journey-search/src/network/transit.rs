//! In-memory transit repository.
//!
//! Lookups used by route-level heuristics: which routes pick up and drop off
//! at a station (optionally limited to a date and time range), route calendar
//! overlap, interchanges, neighbours and closures.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;

use super::model::{Diversion, Neighbour, Route, Service, Station, StationGroup, Trip};
use crate::domain::{
    LatLong, RouteId, ServiceId, StationClosure, StationGroupId, StationId, TimeRange, TramTime,
    TripId,
};

/// A route calling at a station on a given service at a given time.
#[derive(Debug, Clone)]
pub(crate) struct RouteCall {
    pub route: RouteId,
    pub service: ServiceId,
    pub time: TramTime,
}

/// Stations, routes, services and trips of one network.
///
/// Built with [`TimetableBuilder`](super::TimetableBuilder); immutable
/// afterwards and safe to share between searches.
#[derive(Debug, Default)]
pub struct TransitData {
    pub(crate) stations: HashMap<StationId, Station>,
    pub(crate) groups: HashMap<StationGroupId, StationGroup>,
    pub(crate) routes: BTreeMap<RouteId, Route>,
    pub(crate) services: BTreeMap<ServiceId, Service>,
    pub(crate) trips: BTreeMap<TripId, Trip>,
    pub(crate) neighbours: HashMap<StationId, Vec<Neighbour>>,
    pub(crate) diversions: Vec<Diversion>,
    pub(crate) closures: Vec<StationClosure>,
    pub(crate) route_services: HashMap<RouteId, Vec<ServiceId>>,
    pub(crate) pickups: HashMap<StationId, Vec<RouteCall>>,
    pub(crate) dropoffs: HashMap<StationId, Vec<RouteCall>>,
}

impl TransitData {
    pub fn station(&self, id: &StationId) -> Option<&Station> {
        self.stations.get(id)
    }

    pub fn stations(&self) -> impl Iterator<Item = &Station> {
        self.stations.values()
    }

    pub fn group(&self, id: &StationGroupId) -> Option<&StationGroup> {
        self.groups.get(id)
    }

    pub fn groups(&self) -> impl Iterator<Item = &StationGroup> {
        self.groups.values()
    }

    pub fn route(&self, id: &RouteId) -> Option<&Route> {
        self.routes.get(id)
    }

    /// All routes, ordered by id.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    pub fn number_of_routes(&self) -> usize {
        self.routes.len()
    }

    pub fn service(&self, id: &ServiceId) -> Option<&Service> {
        self.services.get(id)
    }

    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.services.values()
    }

    pub fn services_for_route(&self, route: &RouteId) -> impl Iterator<Item = &Service> {
        self.route_services
            .get(route)
            .into_iter()
            .flatten()
            .filter_map(|id| self.services.get(id))
    }

    pub fn trip(&self, id: &TripId) -> Option<&Trip> {
        self.trips.get(id)
    }

    /// All trips, ordered by id.
    pub fn trips(&self) -> impl Iterator<Item = &Trip> {
        self.trips.values()
    }

    pub fn neighbours(&self, station: &StationId) -> &[Neighbour] {
        self.neighbours.get(station).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True if any station in `a` is a neighbour of any station in `b`.
    pub fn are_neighbours(&self, a: &[StationId], b: &[StationId]) -> bool {
        a.iter()
            .any(|s| self.neighbours(s).iter().any(|n| b.contains(&n.station)))
    }

    pub fn diversions(&self) -> &[Diversion] {
        &self.diversions
    }

    /// Diversions open on `date`.
    pub fn diversions_on(&self, date: NaiveDate) -> impl Iterator<Item = &Diversion> {
        self.diversions.iter().filter(move |d| d.dates.contains(date))
    }

    pub fn closures(&self) -> &[StationClosure] {
        &self.closures
    }

    /// Closures with any effect on `date`.
    pub fn closures_on(&self, date: NaiveDate) -> impl Iterator<Item = &StationClosure> {
        self.closures.iter().filter(move |c| c.active_on(date))
    }

    /// True if any service of the route operates on `date`.
    pub fn route_operates_on(&self, route: &RouteId, date: NaiveDate) -> bool {
        self.services_for_route(route)
            .any(|s| s.calendar.operates_on(date))
    }

    /// True if the two routes share at least one possible operating date.
    pub fn routes_overlap(&self, a: &RouteId, b: &RouteId) -> bool {
        self.services_for_route(a).any(|sa| {
            self.services_for_route(b)
                .any(|sb| sa.calendar.overlaps(&sb.calendar))
        })
    }

    /// Every route that picks up at the station.
    pub fn pickup_routes(&self, station: &StationId) -> BTreeSet<RouteId> {
        collect_routes(self.pickups.get(station))
    }

    /// Every route that drops off at the station.
    pub fn dropoff_routes(&self, station: &StationId) -> BTreeSet<RouteId> {
        collect_routes(self.dropoffs.get(station))
    }

    /// Routes picking up at the station within `range` on `date`.
    ///
    /// When the range runs past midnight, services of the following date are
    /// matched against the part of the range on that date.
    pub fn pickup_routes_for(
        &self,
        station: &StationId,
        date: NaiveDate,
        range: TimeRange,
    ) -> BTreeSet<RouteId> {
        self.calls_within(self.pickups.get(station), date, range)
    }

    /// Routes dropping off at the station within `range` on `date`.
    pub fn dropoff_routes_for(
        &self,
        station: &StationId,
        date: NaiveDate,
        range: TimeRange,
    ) -> BTreeSet<RouteId> {
        self.calls_within(self.dropoffs.get(station), date, range)
    }

    fn calls_within(
        &self,
        calls: Option<&Vec<RouteCall>>,
        date: NaiveDate,
        range: TimeRange,
    ) -> BTreeSet<RouteId> {
        let following = range.for_following_day();
        let next_date = date.succ_opt();

        calls
            .into_iter()
            .flatten()
            .filter(|call| {
                let Some(service) = self.services.get(&call.service) else {
                    return false;
                };
                if range.contains(call.time) && service.calendar.operates_on(date) {
                    return true;
                }
                match (following, next_date) {
                    (Some(following), Some(next)) => {
                        !call.time.is_next_day()
                            && following.contains(call.time)
                            && service.calendar.operates_on(next)
                    }
                    _ => false,
                }
            })
            .map(|call| call.route.clone())
            .collect()
    }

    /// Earliest and latest drop-off at any of `stations` for a journey on
    /// `date`. Calls of services running the following date count as
    /// next-day times.
    pub fn dropoff_window(&self, stations: &[StationId], date: NaiveDate) -> Option<TimeRange> {
        let next_date = date.succ_opt();
        let mut times = Vec::new();
        for call in stations.iter().filter_map(|s| self.dropoffs.get(s)).flatten() {
            let Some(service) = self.services.get(&call.service) else {
                continue;
            };
            if service.calendar.operates_on(date) {
                times.push(call.time);
            }
            if let Some(next) = next_date
                && service.calendar.operates_on(next)
                && let Some(lifted) = call.time.to_next_day()
            {
                times.push(lifted);
            }
        }
        let start = times.iter().min()?;
        let end = times.iter().max()?;
        TimeRange::of(*start, *end).ok()
    }

    /// A station where passengers can change between routes: more than one
    /// route calls, or a neighbour is within walking distance.
    pub fn is_interchange(&self, station: &StationId) -> bool {
        let routes: BTreeSet<&RouteId> = self
            .pickups
            .get(station)
            .into_iter()
            .chain(self.dropoffs.get(station))
            .flatten()
            .map(|call| &call.route)
            .collect();
        routes.len() > 1 || !self.neighbours(station).is_empty()
    }

    /// Interchange stations, ordered by id.
    pub fn interchanges(&self) -> Vec<&StationId> {
        let mut result: Vec<&StationId> = self
            .stations
            .keys()
            .filter(|id| self.is_interchange(id))
            .collect();
        result.sort();
        result
    }

    /// Stations within `range_km` of `position`, nearest first, at most `max`.
    pub fn nearest_stations(
        &self,
        position: &LatLong,
        range_km: f64,
        max: usize,
    ) -> Vec<(StationId, f64)> {
        let mut found: Vec<(StationId, f64)> = self
            .stations
            .values()
            .filter_map(|s| {
                let distance = s.position?.distance_km(position);
                (distance <= range_km).then(|| (s.id.clone(), distance))
            })
            .collect();
        found.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        found.truncate(max);
        found
    }
}

fn collect_routes(calls: Option<&Vec<RouteCall>>) -> BTreeSet<RouteId> {
    calls
        .into_iter()
        .flatten()
        .map(|call| call.route.clone())
        .collect()
}
