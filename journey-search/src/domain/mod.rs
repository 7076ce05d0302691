//! Domain types for the journey search engine.
//!
//! This module contains the validated value types shared by the network,
//! graph and search layers. All types enforce their invariants at
//! construction time, so code that receives these types can trust their
//! validity.

mod calendar;
mod closure;
mod error;
mod ids;
mod mode;
mod position;
mod time;

pub use calendar::{DateRange, DaysOfWeek, ServiceCalendar};
pub use closure::StationClosure;
pub use error::DomainError;
pub use ids::{InvalidId, LocationId, PlatformId, RouteId, ServiceId, StationGroupId, StationId, TripId};
pub use mode::TransportMode;
pub use position::LatLong;
pub use time::{TimeError, TimeRange, TramTime};
