//! Assembles [`TransitData`] from a simple timetable description.

use std::collections::HashMap;

use chrono::Duration;
use tracing::debug;

use super::model::{Diversion, Neighbour, Route, Service, Station, StationGroup, StopCall, Trip};
use super::transit::{RouteCall, TransitData};
use super::NetworkError;
use crate::domain::{
    DateRange, LatLong, PlatformId, RouteId, ServiceCalendar, ServiceId, StationClosure,
    StationGroupId, StationId, TimeRange, TramTime, TransportMode, TripId,
};

/// One call of a trip, as written in a timetable.
#[derive(Debug, Clone)]
pub struct CallSpec {
    station: String,
    platform: Option<String>,
    arrive: String,
    depart: String,
}

impl CallSpec {
    /// A call that arrives and departs at the same minute.
    pub fn at(station: &str, time: &str) -> Self {
        Self::dwell(station, time, time)
    }

    /// A call with distinct arrival and departure times.
    pub fn dwell(station: &str, arrive: &str, depart: &str) -> Self {
        Self {
            station: station.to_string(),
            platform: None,
            arrive: arrive.to_string(),
            depart: depart.to_string(),
        }
    }

    pub fn platform(mut self, platform: &str) -> Self {
        self.platform = Some(platform.to_string());
        self
    }
}

#[derive(Debug, Default)]
struct StationSpec {
    id: String,
    name: String,
    position: Option<LatLong>,
}

#[derive(Debug)]
struct TripSpec {
    id: String,
    service: String,
    calls: Vec<CallSpec>,
}

/// Collects stations, routes, services and trips, then validates them into a
/// [`TransitData`].
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use journey_search::domain::{DateRange, ServiceCalendar, TransportMode};
/// use journey_search::network::TimetableBuilder;
///
/// let day = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
/// let mut builder = TimetableBuilder::new();
/// builder
///     .station("ALT", "Altrincham")
///     .station("NAV", "Navigation Road")
///     .route("GREEN", "Altrincham - Bury", TransportMode::Tram)
///     .service("WEEKDAY", "GREEN", ServiceCalendar::daily(DateRange::single(day)))
///     .trip("T1", "WEEKDAY", &[("ALT", "08:00"), ("NAV", "08:03")]);
/// let data = builder.build().unwrap();
/// assert_eq!(data.number_of_routes(), 1);
/// ```
#[derive(Debug, Default)]
pub struct TimetableBuilder {
    stations: Vec<StationSpec>,
    groups: Vec<(String, String, Vec<String>)>,
    routes: Vec<(String, String, TransportMode)>,
    services: Vec<(String, String, ServiceCalendar)>,
    trips: Vec<TripSpec>,
    neighbours: Vec<(String, String, Duration)>,
    diversions: Vec<(String, String, Duration, DateRange)>,
    closures: Vec<StationClosure>,
}

impl TimetableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn station(&mut self, id: &str, name: &str) -> &mut Self {
        self.stations.push(StationSpec {
            id: id.to_string(),
            name: name.to_string(),
            position: None,
        });
        self
    }

    pub fn station_at(&mut self, id: &str, name: &str, position: LatLong) -> &mut Self {
        self.stations.push(StationSpec {
            id: id.to_string(),
            name: name.to_string(),
            position: Some(position),
        });
        self
    }

    pub fn group(&mut self, id: &str, name: &str, stations: &[&str]) -> &mut Self {
        self.groups.push((
            id.to_string(),
            name.to_string(),
            stations.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    pub fn route(&mut self, id: &str, name: &str, mode: TransportMode) -> &mut Self {
        self.routes.push((id.to_string(), name.to_string(), mode));
        self
    }

    pub fn service(&mut self, id: &str, route: &str, calendar: ServiceCalendar) -> &mut Self {
        self.services
            .push((id.to_string(), route.to_string(), calendar));
        self
    }

    /// A trip whose calls arrive and depart at the same minute.
    pub fn trip(&mut self, id: &str, service: &str, calls: &[(&str, &str)]) -> &mut Self {
        let calls = calls
            .iter()
            .map(|(station, time)| CallSpec::at(station, time))
            .collect();
        self.trip_calls(id, service, calls)
    }

    pub fn trip_calls(&mut self, id: &str, service: &str, calls: Vec<CallSpec>) -> &mut Self {
        self.trips.push(TripSpec {
            id: id.to_string(),
            service: service.to_string(),
            calls,
        });
        self
    }

    /// A walkable link, added in both directions.
    pub fn neighbours(&mut self, a: &str, b: &str, cost: Duration) -> &mut Self {
        self.neighbours.push((a.to_string(), b.to_string(), cost));
        self
    }

    /// A one-way temporary link valid on `dates`.
    pub fn diversion(&mut self, from: &str, to: &str, cost: Duration, dates: DateRange) -> &mut Self {
        self.diversions
            .push((from.to_string(), to.to_string(), cost, dates));
        self
    }

    pub fn closure(&mut self, closure: StationClosure) -> &mut Self {
        self.closures.push(closure);
        self
    }

    /// Validate references and derive the pick-up/drop-off indexes.
    pub fn build(&self) -> Result<TransitData, NetworkError> {
        let mut data = TransitData::default();

        for spec in &self.stations {
            let id = StationId::parse(&spec.id)?;
            let station = Station {
                id: id.clone(),
                name: spec.name.clone(),
                position: spec.position,
                group: None,
                modes: Default::default(),
                has_platforms: false,
            };
            if data.stations.insert(id, station).is_some() {
                return Err(NetworkError::Duplicate(spec.id.clone()));
            }
        }

        for (id, name, members) in &self.groups {
            let group_id = StationGroupId::parse(id)?;
            let mut stations = Vec::with_capacity(members.len());
            for member in members {
                let station_id = StationId::parse(member)?;
                let station = data
                    .stations
                    .get_mut(&station_id)
                    .ok_or_else(|| NetworkError::UnknownStation(station_id.clone()))?;
                station.group = Some(group_id.clone());
                stations.push(station_id);
            }
            if stations.is_empty() {
                return Err(NetworkError::EmptyGroup(group_id));
            }
            let group = StationGroup {
                id: group_id.clone(),
                name: name.clone(),
                stations,
            };
            if data.groups.insert(group_id, group).is_some() {
                return Err(NetworkError::Duplicate(id.clone()));
            }
        }

        for (id, name, mode) in &self.routes {
            let route_id = RouteId::parse(id)?;
            let route = Route {
                id: route_id.clone(),
                name: name.clone(),
                mode: *mode,
            };
            if data.routes.insert(route_id, route).is_some() {
                return Err(NetworkError::Duplicate(id.clone()));
            }
        }

        for (id, route, calendar) in &self.services {
            let service_id = ServiceId::parse(id)?;
            let route_id = RouteId::parse(route)?;
            if !data.routes.contains_key(&route_id) {
                return Err(NetworkError::UnknownRoute(route_id));
            }
            data.route_services
                .entry(route_id.clone())
                .or_default()
                .push(service_id.clone());
            let service = Service {
                id: service_id.clone(),
                route: route_id,
                calendar: calendar.clone(),
                window: None,
            };
            if data.services.insert(service_id, service).is_some() {
                return Err(NetworkError::Duplicate(id.clone()));
            }
        }

        for spec in &self.trips {
            let trip = build_trip(spec, &data)?;
            index_trip(&mut data, &trip)?;
            if data.trips.insert(trip.id.clone(), trip).is_some() {
                return Err(NetworkError::Duplicate(spec.id.clone()));
            }
        }

        for (a, b, cost) in &self.neighbours {
            let a = known_station(&data, a)?;
            let b = known_station(&data, b)?;
            add_neighbour(&mut data.neighbours, &a, &b, *cost);
            add_neighbour(&mut data.neighbours, &b, &a, *cost);
        }

        for (from, to, cost, dates) in &self.diversions {
            data.diversions.push(Diversion {
                from: known_station(&data, from)?,
                to: known_station(&data, to)?,
                cost: *cost,
                dates: *dates,
            });
        }

        for closure in &self.closures {
            if !data.stations.contains_key(closure.station()) {
                return Err(NetworkError::UnknownStation(closure.station().clone()));
            }
            data.closures.push(closure.clone());
        }

        check_platforms(&data)?;

        debug!(
            stations = data.stations.len(),
            routes = data.routes.len(),
            services = data.services.len(),
            trips = data.trips.len(),
            "built transit data"
        );
        Ok(data)
    }
}

fn known_station(data: &TransitData, id: &str) -> Result<StationId, NetworkError> {
    let id = StationId::parse(id)?;
    if data.stations.contains_key(&id) {
        Ok(id)
    } else {
        Err(NetworkError::UnknownStation(id))
    }
}

fn add_neighbour(
    neighbours: &mut HashMap<StationId, Vec<Neighbour>>,
    from: &StationId,
    to: &StationId,
    cost: Duration,
) {
    let entry = neighbours.entry(from.clone()).or_default();
    if !entry.iter().any(|n| &n.station == to) {
        entry.push(Neighbour {
            station: to.clone(),
            cost,
        });
    }
}

fn build_trip(spec: &TripSpec, data: &TransitData) -> Result<Trip, NetworkError> {
    let id = TripId::parse(&spec.id)?;
    let service_id = ServiceId::parse(&spec.service)?;
    let service = data
        .services
        .get(&service_id)
        .ok_or_else(|| NetworkError::UnknownService(service_id.clone()))?;

    if spec.calls.len() < 2 {
        return Err(NetworkError::TripTooShort(id));
    }

    let mut calls = Vec::with_capacity(spec.calls.len());
    let mut previous: Option<TramTime> = None;
    for call in &spec.calls {
        let station = known_station(data, &call.station)?;
        let arrive = TramTime::parse_hhmm(&call.arrive)?;
        let depart = TramTime::parse_hhmm(&call.depart)?;
        if depart < arrive || previous.is_some_and(|p| arrive < p) {
            return Err(NetworkError::TimesNotIncreasing(id));
        }
        previous = Some(depart);
        let platform = call
            .platform
            .as_deref()
            .map(PlatformId::parse)
            .transpose()?;
        calls.push(StopCall {
            station,
            platform,
            arrive,
            depart,
        });
    }

    Ok(Trip {
        id,
        service: service_id,
        route: service.route.clone(),
        calls,
    })
}

/// Record the trip's calls in the pick-up/drop-off indexes, derive station
/// modes and platforms, and widen the service window.
fn index_trip(data: &mut TransitData, trip: &Trip) -> Result<(), NetworkError> {
    let mode = data
        .routes
        .get(&trip.route)
        .map(|r| r.mode)
        .ok_or_else(|| NetworkError::UnknownRoute(trip.route.clone()))?;
    let last = trip.calls.len() - 1;

    for (i, call) in trip.calls.iter().enumerate() {
        if let Some(station) = data.stations.get_mut(&call.station) {
            station.modes.insert(mode);
            if call.platform.is_some() {
                station.has_platforms = true;
            }
        }
        if i < last {
            data.pickups
                .entry(call.station.clone())
                .or_default()
                .push(RouteCall {
                    route: trip.route.clone(),
                    service: trip.service.clone(),
                    time: call.depart,
                });
        }
        if i > 0 {
            data.dropoffs
                .entry(call.station.clone())
                .or_default()
                .push(RouteCall {
                    route: trip.route.clone(),
                    service: trip.service.clone(),
                    time: call.arrive,
                });
        }
    }

    let (Some(first), Some(final_call)) = (trip.calls.first(), trip.calls.last()) else {
        return Ok(());
    };
    if let Some(service) = data.services.get_mut(&trip.service) {
        let start = service
            .window
            .map_or(first.depart, |w| w.start().min(first.depart));
        let end = service
            .window
            .map_or(final_call.arrive, |w| w.end().max(final_call.arrive));
        service.window = Some(TimeRange::of(start, end)?);
    }
    Ok(())
}

/// Calls at platform stations must name a platform once any call there does.
fn check_platforms(data: &TransitData) -> Result<(), NetworkError> {
    for trip in data.trips.values() {
        for call in &trip.calls {
            let has_platforms = data
                .stations
                .get(&call.station)
                .is_some_and(|s| s.has_platforms);
            if has_platforms && call.platform.is_none() {
                return Err(NetworkError::MissingPlatform {
                    trip: trip.id.clone(),
                    station: call.station.clone(),
                });
            }
        }
    }
    Ok(())
}
