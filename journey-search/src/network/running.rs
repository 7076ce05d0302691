//! Routes and services running on a query date and the day after.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{Duration, NaiveDate};
use tracing::{debug, warn};

use super::model::Service;
use super::TransitData;
use crate::domain::{RouteId, ServiceId, TramTime, TransportMode};

/// Snapshot of which routes and services run on a date and the following
/// date, filtered to a set of modes.
///
/// Lookups take a "next day" flag derived from the journey clock, so a
/// journey that crosses midnight sees the following day's timetable.
#[derive(Debug, Clone)]
pub struct RunningRoutesAndServices {
    date: NaiveDate,
    routes_today: HashSet<RouteId>,
    routes_next_day: HashSet<RouteId>,
    services_today: HashMap<ServiceId, Service>,
    services_next_day: HashMap<ServiceId, Service>,
}

impl RunningRoutesAndServices {
    pub fn for_date(data: &TransitData, date: NaiveDate, modes: &BTreeSet<TransportMode>) -> Self {
        let next = date.succ_opt().unwrap_or(date);
        let (routes_today, services_today) = running_on(data, date, modes);
        let (routes_next_day, services_next_day) = running_on(data, next, modes);

        if services_today.is_empty() {
            warn!(%date, "no running services found");
        } else {
            debug!(
                %date,
                routes = routes_today.len(),
                services = services_today.len(),
                "running routes and services"
            );
        }

        Self {
            date,
            routes_today,
            routes_next_day,
            services_today,
            services_next_day,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn is_route_running(&self, route: &RouteId, next_day: bool) -> bool {
        self.routes_today.contains(route) || (next_day && self.routes_next_day.contains(route))
    }

    pub fn is_service_running_by_date(&self, service: &ServiceId, next_day: bool) -> bool {
        self.services_today.contains_key(service)
            || (next_day && self.services_next_day.contains_key(service))
    }

    /// True if the service's trips could be boarded at `time`, allowing up
    /// to `max_wait` before its first departure.
    pub fn is_service_running_by_time(
        &self,
        service: &ServiceId,
        time: TramTime,
        max_wait: Duration,
    ) -> bool {
        let today = self
            .services_today
            .get(service)
            .is_some_and(|s| s.operating_within(time, max_wait));
        if today {
            return true;
        }
        if time.is_next_day() {
            if let Some(next) = self.services_next_day.get(service) {
                return next.operating_within(time.same_day(), max_wait);
            }
        }
        false
    }
}

fn running_on(
    data: &TransitData,
    date: NaiveDate,
    modes: &BTreeSet<TransportMode>,
) -> (HashSet<RouteId>, HashMap<ServiceId, Service>) {
    let mut routes = HashSet::new();
    let mut services = HashMap::new();
    for service in data.services() {
        let mode_ok = data
            .route(&service.route)
            .is_some_and(|r| modes.contains(&r.mode));
        if mode_ok && service.calendar.operates_on(date) {
            routes.insert(service.route.clone());
            services.insert(service.id.clone(), service.clone());
        }
    }
    (routes, services)
}
