//! Errors raised while assembling a transit network.

use crate::domain::{
    InvalidId, RouteId, ServiceId, StationGroupId, StationId, TimeError, TripId,
};

/// A timetable description that references missing or inconsistent data.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NetworkError {
    /// An identifier in the description failed validation
    #[error(transparent)]
    InvalidId(#[from] InvalidId),

    /// A call time in the description failed to parse
    #[error(transparent)]
    InvalidTime(#[from] TimeError),

    /// A trip, neighbour or closure names a station that was never added
    #[error("unknown station: {0}")]
    UnknownStation(StationId),

    /// A service names a route that was never added
    #[error("unknown route: {0}")]
    UnknownRoute(RouteId),

    /// A trip names a service that was never added
    #[error("unknown service: {0}")]
    UnknownService(ServiceId),

    /// The same identifier was added twice
    #[error("duplicate id: {0}")]
    Duplicate(String),

    /// A trip must call at two or more stations
    #[error("trip {0} has fewer than two calls")]
    TripTooShort(TripId),

    /// Call times along a trip must never go backwards
    #[error("trip {0} has times that go backwards")]
    TimesNotIncreasing(TripId),

    /// Stations with platforms need a platform on every call
    #[error("trip {trip} calls at {station} without a platform")]
    MissingPlatform { trip: TripId, station: StationId },

    /// A group must contain at least one known station
    #[error("station group {0} is empty")]
    EmptyGroup(StationGroupId),
}
