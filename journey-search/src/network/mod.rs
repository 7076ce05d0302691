//! Transit repository: the timetable entities behind the graph.
//!
//! The search reads the graph for topology and times, but route-level
//! reasoning (calendars, pick-up/drop-off sets, interchanges, closures)
//! comes from [`TransitData`].

mod builder;
mod error;
mod model;
mod running;
mod transit;

pub use builder::{CallSpec, TimetableBuilder};
pub use error::NetworkError;
pub use model::{Diversion, Neighbour, Route, Service, Station, StationGroup, StopCall, Trip};
pub use running::RunningRoutesAndServices;
pub use transit::TransitData;
