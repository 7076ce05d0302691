//! Branch-local facts about a journey in progress.
//!
//! A `JourneyState` is cloned for each child before it is changed, so sibling
//! branches never observe each other's updates. The collections inside are
//! small (stations visited, trips ridden) and ids are reference counted, which
//! keeps the clone cheap.

use chrono::Duration;
use serde::Serialize;

use crate::domain::{StationId, TramTime, TransportMode, TripId};

/// Invariant violations while updating a [`JourneyState`].
///
/// These indicate a broken traversal, never a search outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JourneyStateError {
    /// Boarding while already on a vehicle.
    #[error("already on board a {0}")]
    AlreadyOnBoard(TransportMode),

    /// Recording a departure or leaving while not on a vehicle.
    #[error("not on board a vehicle")]
    NotOnBoard,

    /// Leaving with a different mode from the one boarded.
    #[error("leaving {requested} but on board {current}")]
    WrongMode {
        requested: TransportMode,
        current: TransportMode,
    },

    /// Starting a trip while another is in progress.
    #[error("already on trip {current}, cannot begin {requested}")]
    AlreadyOnTrip { current: TripId, requested: TripId },

    /// Leaving a vehicle with no trip in progress.
    #[error("not on a trip")]
    NotOnTrip,

    /// A diversion begun while already diverting.
    #[error("already on a diversion, at {0}")]
    AlreadyOnDiversion(StationId),

    /// Total cost moved backwards.
    #[error("total cost {new} is less than {current}")]
    NegativeCost { current: i64, new: i64 },

    /// The clock left the representable two-day window.
    #[error("journey clock out of range")]
    ClockOutOfRange,
}

/// Accumulated metrics of one branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JourneyState {
    #[serde(serialize_with = "serialize_minutes")]
    total_cost: Duration,
    clock: TramTime,
    query_time: TramTime,
    mode: Option<TransportMode>,
    boardings: u32,
    walking_connections: u32,
    neighbour_connections: u32,
    visited: Vec<StationId>,
    trips_done: Vec<TripId>,
    current_trip: Option<TripId>,
    on_diversion: bool,
    diversions_taken: u32,
    boarding_time: Option<TramTime>,
    #[serde(serialize_with = "serialize_minutes")]
    boarding_offset: Duration,
    first_departure: Option<TramTime>,
    has_begun: bool,
}

fn serialize_minutes<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_i64(d.num_minutes())
}

impl JourneyState {
    /// A journey that has not yet moved, at `query_time`.
    pub fn new(query_time: TramTime) -> Self {
        Self {
            total_cost: Duration::zero(),
            clock: query_time,
            query_time,
            mode: None,
            boardings: 0,
            walking_connections: 0,
            neighbour_connections: 0,
            visited: Vec::new(),
            trips_done: Vec::new(),
            current_trip: None,
            on_diversion: false,
            diversions_taken: 0,
            boarding_time: None,
            boarding_offset: Duration::zero(),
            first_departure: None,
            has_begun: false,
        }
    }

    /// Sum of edge costs along the branch.
    pub fn total_cost(&self) -> Duration {
        self.total_cost
    }

    /// Wall time of the last definite event.
    pub fn clock(&self) -> TramTime {
        self.clock
    }

    pub fn query_time(&self) -> TramTime {
        self.query_time
    }

    /// Time since the query time; the cost used for comparisons.
    pub fn elapsed(&self) -> Duration {
        self.clock
            .signed_duration_since(self.query_time)
            .max(Duration::zero())
    }

    pub fn mode(&self) -> Option<TransportMode> {
        self.mode
    }

    pub fn on_board(&self) -> bool {
        self.mode.is_some()
    }

    pub fn boardings(&self) -> u32 {
        self.boardings
    }

    /// Vehicle-to-vehicle changes; boarding after a diversion does not count.
    pub fn number_of_changes(&self) -> u32 {
        self.boardings
            .saturating_sub(1)
            .saturating_sub(self.diversions_taken)
    }

    pub fn walking_connections(&self) -> u32 {
        self.walking_connections
    }

    pub fn neighbour_connections(&self) -> u32 {
        self.neighbour_connections
    }

    pub fn diversions_taken(&self) -> u32 {
        self.diversions_taken
    }

    pub fn on_diversion(&self) -> bool {
        self.on_diversion
    }

    pub fn has_begun(&self) -> bool {
        self.has_begun
    }

    pub fn first_departure(&self) -> Option<TramTime> {
        self.first_departure
    }

    pub fn current_trip(&self) -> Option<&TripId> {
        self.current_trip.as_ref()
    }

    pub fn visited(&self) -> &[StationId] {
        &self.visited
    }

    pub fn has_visited(&self, station: &StationId) -> bool {
        self.visited.contains(station)
    }

    /// Last station the branch passed through.
    pub fn approx_station(&self) -> Option<&StationId> {
        self.visited.last()
    }

    pub fn trips_done(&self) -> &[TripId] {
        &self.trips_done
    }

    /// True if the trip was already ridden and left.
    pub fn already_departed(&self, trip: &TripId) -> bool {
        self.trips_done.contains(trip)
    }

    /// Advance the total cost and move the clock with it.
    ///
    /// On board after a recorded departure the clock is the departure time
    /// plus the cost since; otherwise the clock moves by the cost added.
    pub fn update_total_cost(&mut self, total: Duration) -> Result<(), JourneyStateError> {
        if total < self.total_cost {
            return Err(JourneyStateError::NegativeCost {
                current: self.total_cost.num_minutes(),
                new: total.num_minutes(),
            });
        }
        let delta = total - self.total_cost;
        self.total_cost = total;

        self.clock = match (self.on_board(), self.boarding_time) {
            (true, Some(boarded)) => boarded
                .checked_add(total - self.boarding_offset)
                .ok_or(JourneyStateError::ClockOutOfRange)?,
            _ => self
                .clock
                .checked_add(delta)
                .ok_or(JourneyStateError::ClockOutOfRange)?,
        };
        Ok(())
    }

    /// Record a scheduled departure of the current vehicle.
    pub fn record_time(&mut self, departure: TramTime, total: Duration) -> Result<(), JourneyStateError> {
        if !self.on_board() {
            return Err(JourneyStateError::NotOnBoard);
        }
        self.clock = departure;
        self.boarding_time = Some(departure);
        self.boarding_offset = total;
        if self.first_departure.is_none() {
            self.first_departure = Some(departure);
        }
        Ok(())
    }

    pub fn board(&mut self, mode: TransportMode) -> Result<(), JourneyStateError> {
        if let Some(current) = self.mode {
            return Err(JourneyStateError::AlreadyOnBoard(current));
        }
        self.on_diversion = false;
        self.boardings += 1;
        self.mode = Some(mode);
        self.has_begun = true;
        Ok(())
    }

    pub fn begin_trip(&mut self, trip: TripId) -> Result<(), JourneyStateError> {
        if let Some(current) = &self.current_trip {
            return Err(JourneyStateError::AlreadyOnTrip {
                current: current.clone(),
                requested: trip,
            });
        }
        self.current_trip = Some(trip);
        Ok(())
    }

    /// Alight from the current vehicle.
    pub fn leave(&mut self, mode: TransportMode, total: Duration) -> Result<(), JourneyStateError> {
        let Some(current) = self.mode else {
            return Err(JourneyStateError::NotOnBoard);
        };
        if current != mode {
            return Err(JourneyStateError::WrongMode {
                requested: mode,
                current,
            });
        }
        let trip = self.current_trip.take().ok_or(JourneyStateError::NotOnTrip)?;
        if total < self.boarding_offset {
            return Err(JourneyStateError::NegativeCost {
                current: self.boarding_offset.num_minutes(),
                new: total.num_minutes(),
            });
        }

        if let Some(boarded) = self.boarding_time {
            self.clock = boarded
                .checked_add(total - self.boarding_offset)
                .ok_or(JourneyStateError::ClockOutOfRange)?;
        }
        self.total_cost = self.total_cost.max(total);
        self.boarding_offset = total;
        self.boarding_time = None;
        self.trips_done.push(trip);
        self.mode = None;
        Ok(())
    }

    pub fn begin_walk(&mut self) {
        self.walking_connections += 1;
    }

    pub fn end_walk(&mut self) {}

    pub fn to_neighbour(&mut self) {
        self.neighbour_connections += 1;
    }

    pub fn seen_station(&mut self, station: StationId) {
        self.visited.push(station);
    }

    pub fn begin_diversion(&mut self, at: &StationId) -> Result<(), JourneyStateError> {
        if self.on_diversion {
            return Err(JourneyStateError::AlreadyOnDiversion(at.clone()));
        }
        self.on_diversion = true;
        self.diversions_taken += 1;
        Ok(())
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Step {
        Ride(i64),
        Walk(i64),
        Neighbour,
        Divert,
    }

    fn step_strategy() -> impl Strategy<Value = Step> {
        prop_oneof![
            (1i64..30).prop_map(Step::Ride),
            (1i64..10).prop_map(Step::Walk),
            Just(Step::Neighbour),
            Just(Step::Divert),
        ]
    }

    proptest! {
        #[test]
        fn changes_invariant_holds(steps in proptest::collection::vec(step_strategy(), 0..12)) {
            let mut state = JourneyState::new(TramTime::of(6, 0).unwrap());
            let station = StationId::parse("S").unwrap();
            for (i, step) in steps.iter().enumerate() {
                match step {
                    Step::Ride(mins) => {
                        let total = state.total_cost();
                        state.board(TransportMode::Tram).unwrap();
                        state.begin_trip(TripId::parse(&format!("T{i}")).unwrap()).unwrap();
                        state.record_time(state.clock(), total).unwrap();
                        let end = total + Duration::minutes(*mins);
                        state.update_total_cost(end).unwrap();
                        state.leave(TransportMode::Tram, end).unwrap();
                    }
                    Step::Walk(mins) => {
                        state.begin_walk();
                        let end = state.total_cost() + Duration::minutes(*mins);
                        state.update_total_cost(end).unwrap();
                    }
                    Step::Neighbour => state.to_neighbour(),
                    Step::Divert => {
                        if !state.on_diversion() {
                            state.begin_diversion(&station).unwrap();
                        }
                    }
                }
                let expected = (state.boardings() as i64 - 1 - state.diversions_taken() as i64).max(0);
                prop_assert_eq!(state.number_of_changes() as i64, expected);
                prop_assert!(state.elapsed() >= Duration::zero());
            }
        }
    }
}
