//! Heuristic checks for one path request.
//!
//! Each check returns a [`ReasonCode`]: a valid code to carry on, or the
//! rejection that prunes the branch.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Duration;

use super::constraints::JourneyConstraints;
use super::journey_state::JourneyState;
use super::reason::ReasonCode;
use crate::domain::{RouteId, ServiceId, StationId, TramTime, TransportMode};
use crate::graph::Labels;
use crate::routes::UNREACHABLE;

/// Checks bound to one path request's change limit, waits and modes.
#[derive(Debug, Clone)]
pub struct ServiceHeuristics {
    constraints: Arc<JourneyConstraints>,
    modes: Labels,
    max_changes: u32,
    max_wait: Duration,
    max_initial_wait: Duration,
    depth_first: bool,
}

impl ServiceHeuristics {
    pub fn new(
        constraints: Arc<JourneyConstraints>,
        modes: &BTreeSet<TransportMode>,
        max_changes: u32,
        max_wait: Duration,
        max_initial_wait: Duration,
        depth_first: bool,
    ) -> Self {
        Self {
            constraints,
            modes: Labels::for_modes(modes),
            max_changes,
            max_wait,
            max_initial_wait,
            depth_first,
        }
    }

    pub fn constraints(&self) -> &JourneyConstraints {
        &self.constraints
    }

    pub fn max_changes(&self) -> u32 {
        self.max_changes
    }

    pub fn depth_first(&self) -> bool {
        self.depth_first
    }

    /// How long the branch may wait for its next vehicle.
    pub fn wait_for(&self, journey: &JourneyState) -> Duration {
        if journey.has_begun() {
            self.max_wait
        } else {
            self.max_initial_wait
        }
    }

    pub fn path_length_ok(&self, length: usize) -> ReasonCode {
        if length > self.constraints.max_path_length() {
            ReasonCode::PathTooLong
        } else {
            ReasonCode::Continue
        }
    }

    pub fn changes_ok(&self, journey: &JourneyState) -> ReasonCode {
        if journey.number_of_changes() > self.max_changes {
            ReasonCode::TooManyChanges
        } else {
            ReasonCode::NumChangesOk
        }
    }

    pub fn walking_connections_ok(&self, journey: &JourneyState) -> ReasonCode {
        if journey.walking_connections() > self.constraints.max_walking_connections() {
            ReasonCode::TooManyWalkingConnections
        } else {
            ReasonCode::NumWalkingConnectionsOk
        }
    }

    pub fn neighbour_connections_ok(&self, journey: &JourneyState) -> ReasonCode {
        if journey.neighbour_connections() > self.constraints.max_neighbour_connections() {
            ReasonCode::TooManyNeighbourConnections
        } else {
            ReasonCode::NeighbourConnectionsOk
        }
    }

    pub fn duration_ok(&self, journey: &JourneyState) -> ReasonCode {
        if journey.elapsed() > self.constraints.max_journey() {
            ReasonCode::TookTooLong
        } else {
            ReasonCode::DurationOk
        }
    }

    pub fn service_date_ok(&self, service: &ServiceId, journey: &JourneyState) -> ReasonCode {
        if self.constraints.is_running_on_date(service, journey.clock()) {
            ReasonCode::ServiceDateOk
        } else {
            ReasonCode::NotOnQueryDate
        }
    }

    pub fn service_time_ok(&self, service: &ServiceId, journey: &JourneyState) -> ReasonCode {
        let wait = self.wait_for(journey);
        if self.constraints.is_running_at_time(service, journey.clock(), wait) {
            ReasonCode::ServiceTimeOk
        } else {
            ReasonCode::ServiceNotRunningAtTime
        }
    }

    /// The wait window from the clock must touch the hour, today or on the
    /// following day.
    pub fn interested_in_hour(&self, hour: u8, journey: &JourneyState) -> ReasonCode {
        let clock = journey.clock();
        let latest = clock
            .checked_add(self.wait_for(journey))
            .unwrap_or(clock);

        let hour = u32::from(hour);
        let today = TramTime::of(hour, 0)
            .ok()
            .zip(TramTime::of(hour, 59).ok());
        let tomorrow = TramTime::next_day(hour, 0)
            .ok()
            .zip(TramTime::next_day(hour, 59).ok());
        let touches = |(start, end): (TramTime, TramTime)| start <= latest && clock <= end;

        if today.is_some_and(touches) || tomorrow.is_some_and(touches) {
            ReasonCode::HourOk
        } else {
            ReasonCode::NotAtHour
        }
    }

    /// Could the branch catch a departure at `departure`?
    pub fn check_time(&self, departure: TramTime, journey: &JourneyState) -> ReasonCode {
        let clock = journey.clock();
        if clock > departure {
            return ReasonCode::AlreadyDeparted;
        }
        if !self.constraints.destinations_available(departure) {
            return ReasonCode::DestinationUnavailableAtTime;
        }
        let earliest = departure.saturating_sub(self.wait_for(journey));
        if clock >= earliest {
            ReasonCode::TimeOk
        } else {
            ReasonCode::DoesNotOperateOnTime
        }
    }

    pub fn modes_ok(&self, labels: Labels) -> ReasonCode {
        if labels.mode_labels().intersects(self.modes) {
            ReasonCode::TransportModeOk
        } else {
            ReasonCode::TransportModeWrong
        }
    }

    pub fn station_open(&self, station: &StationId, journey: &JourneyState) -> ReasonCode {
        if self.constraints.is_closed(station, journey.clock()) {
            ReasonCode::StationClosed
        } else {
            ReasonCode::StationOpen
        }
    }

    /// On the last permitted leg, only vehicles serving the destination are
    /// worth boarding.
    pub fn final_change_modes_ok(&self, labels: Labels, journey: &JourneyState) -> ReasonCode {
        let penultimate = if self.max_changes > 1 {
            self.max_changes - 1
        } else {
            self.max_changes
        };
        let wanted = self.constraints.destination_modes();
        if journey.number_of_changes() == penultimate
            && !wanted.is_empty()
            && !labels.mode_labels().intersects(wanted)
        {
            ReasonCode::TransportModeWrong
        } else {
            ReasonCode::TransportModeOk
        }
    }

    /// Whether the route can still reach a destination route within the
    /// change limit.
    pub fn can_reach_destination(&self, route: &RouteId, journey: &JourneyState) -> ReasonCode {
        if self.constraints.is_unavailable(route, journey.clock()) {
            return ReasonCode::RouteNotOnQueryDate;
        }
        let fewest = self.constraints.lowest_costs().fewest_changes(route);
        if fewest == UNREACHABLE || u32::from(fewest) > self.max_changes {
            return ReasonCode::TooManyRouteChangesRequired;
        }
        if u32::from(fewest) + journey.number_of_changes() > self.max_changes {
            return ReasonCode::TooManyInterchangesRequired;
        }
        if fewest == 0 {
            ReasonCode::ReachableSameRoute
        } else {
            ReasonCode::Reachable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::domain::{DateRange, ServiceCalendar, StationClosure, TimeRange, TripId};
    use crate::graph::GraphLabel;
    use crate::network::{TimetableBuilder, TransitData};
    use crate::routes::RouteToRouteCosts;
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn time(s: &str) -> TramTime {
        TramTime::parse_hhmm(s).unwrap()
    }

    fn sid(s: &str) -> StationId {
        StationId::parse(s).unwrap()
    }

    fn rid(s: &str) -> RouteId {
        RouteId::parse(s).unwrap()
    }

    /// Tram A-B, tram B-C, bus C-D. D is the destination.
    fn data() -> Arc<TransitData> {
        let march = DateRange::of(date(1), date(31)).unwrap();
        let mut builder = TimetableBuilder::new();
        builder
            .station("A", "Alpha")
            .station("B", "Bravo")
            .station("C", "Charlie")
            .station("D", "Delta")
            .route("R1", "One", TransportMode::Tram)
            .route("R2", "Two", TransportMode::Tram)
            .route("BUS", "Bus", TransportMode::Bus)
            .route("LATE", "Late", TransportMode::Tram)
            .service("S1", "R1", ServiceCalendar::daily(march))
            .service("S2", "R2", ServiceCalendar::daily(march))
            .service("S3", "BUS", ServiceCalendar::daily(march))
            .service("S4", "LATE", ServiceCalendar::daily(DateRange::single(date(20))))
            .trip("T1", "S1", &[("A", "08:00"), ("B", "08:10")])
            .trip("T2", "S2", &[("B", "08:20"), ("C", "08:30")])
            .trip("T3", "S3", &[("C", "08:40"), ("D", "09:00")])
            .trip("T4", "S4", &[("A", "09:00"), ("B", "09:10")])
            .closure(StationClosure::all_day(sid("B"), DateRange::single(date(15))));
        Arc::new(builder.build().unwrap())
    }

    fn heuristics(max_changes: u32, modes: &[TransportMode]) -> ServiceHeuristics {
        let data = data();
        let modes: BTreeSet<TransportMode> = modes.iter().copied().collect();
        let costs = RouteToRouteCosts::new(Arc::clone(&data), 5, None);
        let dest = [sid("D")];
        let lowest = costs.lowest_costs_for(&dest, date(15), TimeRange::all_day(), &modes);
        let config = SearchConfig::default();
        let constraints =
            JourneyConstraints::new(&config, &data, date(15), &modes, &dest, lowest);
        ServiceHeuristics::new(
            Arc::new(constraints),
            &modes,
            max_changes,
            config.max_wait(),
            config.max_initial_wait(&modes),
            true,
        )
    }

    fn all_modes() -> Vec<TransportMode> {
        vec![TransportMode::Tram, TransportMode::Bus]
    }

    fn at(s: &str) -> JourneyState {
        JourneyState::new(time(s))
    }

    fn boarded(s: &str, boardings: u32) -> JourneyState {
        let mut state = at(s);
        for i in 0..boardings {
            state.board(TransportMode::Tram).unwrap();
            state.begin_trip(TripId::parse(&format!("X{i}")).unwrap()).unwrap();
            state.leave(TransportMode::Tram, Duration::zero()).unwrap();
        }
        state
    }

    #[test]
    fn wait_depends_on_journey_begun() {
        let h = heuristics(3, &all_modes());
        assert_eq!(h.wait_for(&at("08:00")), Duration::minutes(13));
        assert_eq!(h.wait_for(&boarded("08:00", 1)), Duration::minutes(25));
    }

    #[test]
    fn hours_today_and_tomorrow() {
        let h = heuristics(3, &all_modes());
        assert_eq!(h.interested_in_hour(8, &at("07:50")), ReasonCode::HourOk);
        assert_eq!(h.interested_in_hour(8, &at("08:59")), ReasonCode::HourOk);
        assert_eq!(h.interested_in_hour(9, &at("08:30")), ReasonCode::NotAtHour);
        assert_eq!(h.interested_in_hour(7, &at("08:00")), ReasonCode::NotAtHour);
        assert_eq!(h.interested_in_hour(0, &at("23:55")), ReasonCode::HourOk);
    }

    #[test]
    fn time_checks() {
        let h = heuristics(3, &all_modes());
        let state = at("08:00");
        assert_eq!(h.check_time(time("07:59"), &state), ReasonCode::AlreadyDeparted);
        assert_eq!(h.check_time(time("08:00"), &state), ReasonCode::TimeOk);
        assert_eq!(h.check_time(time("08:13"), &state), ReasonCode::TimeOk);
        assert_eq!(h.check_time(time("08:14"), &state), ReasonCode::DoesNotOperateOnTime);
        // D is last served at 09:00 tomorrow
        assert_eq!(
            h.check_time(time("10:00+24"), &at("09:55+24")),
            ReasonCode::DestinationUnavailableAtTime
        );
    }

    #[test]
    fn mode_checks() {
        let trams = heuristics(3, &[TransportMode::Tram]);
        let tram = Labels::of(&[GraphLabel::RouteStation, GraphLabel::Tram]);
        let bus = Labels::of(&[GraphLabel::RouteStation, GraphLabel::Bus]);
        assert_eq!(trams.modes_ok(tram), ReasonCode::TransportModeOk);
        assert_eq!(trams.modes_ok(bus), ReasonCode::TransportModeWrong);

        // two changes allowed: the leg after the first change must be a bus
        let both = heuristics(2, &all_modes());
        assert_eq!(both.final_change_modes_ok(tram, &boarded("08:00", 1)), ReasonCode::TransportModeOk);
        assert_eq!(
            both.final_change_modes_ok(tram, &boarded("08:00", 2)),
            ReasonCode::TransportModeWrong
        );
        assert_eq!(both.final_change_modes_ok(bus, &boarded("08:00", 2)), ReasonCode::TransportModeOk);
    }

    #[test]
    fn closed_station() {
        let h = heuristics(3, &all_modes());
        assert_eq!(h.station_open(&sid("B"), &at("08:00")), ReasonCode::StationClosed);
        assert_eq!(h.station_open(&sid("B"), &at("08:00+24")), ReasonCode::StationOpen);
        assert_eq!(h.station_open(&sid("A"), &at("08:00")), ReasonCode::StationOpen);
    }

    #[test]
    fn reachability() {
        let h = heuristics(2, &all_modes());
        assert_eq!(h.can_reach_destination(&rid("BUS"), &at("08:00")), ReasonCode::ReachableSameRoute);
        assert_eq!(h.can_reach_destination(&rid("R2"), &at("08:00")), ReasonCode::Reachable);
        assert_eq!(h.can_reach_destination(&rid("R1"), &at("08:00")), ReasonCode::Reachable);
        assert_eq!(
            h.can_reach_destination(&rid("R1"), &boarded("08:00", 2)),
            ReasonCode::TooManyInterchangesRequired
        );
        assert_eq!(
            h.can_reach_destination(&rid("LATE"), &at("08:00")),
            ReasonCode::RouteNotOnQueryDate
        );

        let strict = heuristics(1, &all_modes());
        assert_eq!(
            strict.can_reach_destination(&rid("R1"), &at("08:00")),
            ReasonCode::TooManyRouteChangesRequired
        );
    }

    #[test]
    fn limits() {
        let h = heuristics(1, &all_modes());
        assert_eq!(h.changes_ok(&boarded("08:00", 2)), ReasonCode::NumChangesOk);
        assert_eq!(h.changes_ok(&boarded("08:00", 3)), ReasonCode::TooManyChanges);
        assert_eq!(h.path_length_ok(400), ReasonCode::Continue);
        assert_eq!(h.path_length_ok(1001), ReasonCode::PathTooLong);

        let mut state = at("08:00");
        state.update_total_cost(Duration::minutes(125)).unwrap();
        assert_eq!(h.duration_ok(&state), ReasonCode::TookTooLong);
        assert_eq!(h.duration_ok(&at("08:00")), ReasonCode::DurationOk);

        for _ in 0..4 {
            state.begin_walk();
        }
        assert_eq!(h.walking_connections_ok(&state), ReasonCode::TooManyWalkingConnections);
        state.to_neighbour();
        assert_eq!(h.neighbour_connections_ok(&state), ReasonCode::NeighbourConnectionsOk);
    }
}
