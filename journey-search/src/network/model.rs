//! Timetable entities held by [`TransitData`](super::TransitData).

use std::collections::BTreeSet;

use chrono::Duration;

use crate::domain::{
    DateRange, LatLong, PlatformId, RouteId, ServiceCalendar, ServiceId, StationGroupId, StationId,
    TimeRange, TramTime, TransportMode, TripId,
};

/// A station (stop).
#[derive(Debug, Clone)]
pub struct Station {
    pub id: StationId,
    pub name: String,
    pub position: Option<LatLong>,
    pub group: Option<StationGroupId>,
    /// Modes of the routes calling here.
    pub modes: BTreeSet<TransportMode>,
    /// True if boarding happens via platform nodes.
    pub has_platforms: bool,
}

/// A set of stations treated as one location.
#[derive(Debug, Clone)]
pub struct StationGroup {
    pub id: StationGroupId,
    pub name: String,
    pub stations: Vec<StationId>,
}

#[derive(Debug, Clone)]
pub struct Route {
    pub id: RouteId,
    pub name: String,
    pub mode: TransportMode,
}

/// A calendar plus the trips running on it.
#[derive(Debug, Clone)]
pub struct Service {
    pub id: ServiceId,
    pub route: RouteId,
    pub calendar: ServiceCalendar,
    /// First departure and last arrival over all trips of the service.
    ///
    /// Unset until the first trip is added.
    pub window: Option<TimeRange>,
}

impl Service {
    /// True if the service's trips could be boarded at `time`, allowing a
    /// wait of up to `max_wait` before the first departure.
    pub fn operating_within(&self, time: TramTime, max_wait: Duration) -> bool {
        let Some(window) = self.window else {
            return false;
        };
        if window.contains(time) {
            return true;
        }
        let waiting = TimeRange::around(window.start(), max_wait, Duration::zero());
        waiting.contains(time)
    }

    /// True if the last arrival is on the day after the service day.
    pub fn into_next_day(&self) -> bool {
        self.window.is_some_and(|w| w.into_next_day())
    }
}

/// One scheduled call of a trip at a station.
#[derive(Debug, Clone)]
pub struct StopCall {
    pub station: StationId,
    pub platform: Option<PlatformId>,
    pub arrive: TramTime,
    pub depart: TramTime,
}

#[derive(Debug, Clone)]
pub struct Trip {
    pub id: TripId,
    pub service: ServiceId,
    pub route: RouteId,
    pub calls: Vec<StopCall>,
}

/// A walkable link between two nearby stations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighbour {
    pub station: StationId,
    pub cost: Duration,
}

/// A temporary station-to-station link, typically around a closure.
#[derive(Debug, Clone)]
pub struct Diversion {
    pub from: StationId,
    pub to: StationId,
    pub cost: Duration,
    pub dates: DateRange,
}
