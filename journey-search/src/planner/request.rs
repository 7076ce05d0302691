//! What a caller asks the planner for.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;

use crate::domain::{LatLong, StationGroupId, StationId, TramTime, TransportMode};
use crate::error::SearchError;

/// Where a journey starts or finishes.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    Station(StationId),
    /// Any station of a group.
    Group(StationGroupId),
    /// A point reached by walking to or from nearby stations.
    Position(LatLong),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Station(id) => write!(f, "station {id}"),
            Location::Group(id) => write!(f, "group {id}"),
            Location::Position(p) => write!(f, "{:.5},{:.5}", p.lat(), p.lon()),
        }
    }
}

/// A journey query.
#[derive(Debug, Clone)]
pub struct JourneyRequest {
    pub from: Location,
    pub to: Location,
    pub date: NaiveDate,
    /// Earliest departure.
    pub time: TramTime,
    /// Upper bound on changes; the search may settle for fewer.
    pub max_changes: u32,
    /// Modes to search. `None` uses the configured modes.
    pub modes: Option<BTreeSet<TransportMode>>,
    /// Record why branches were pruned and return the report.
    pub diagnostics: bool,
}

impl JourneyRequest {
    pub fn new(from: Location, to: Location, date: NaiveDate, time: TramTime) -> Self {
        Self {
            from,
            to,
            date,
            time,
            max_changes: 3,
            modes: None,
            diagnostics: false,
        }
    }

    pub fn with_max_changes(mut self, max_changes: u32) -> Self {
        self.max_changes = max_changes;
        self
    }

    pub fn with_modes(mut self, modes: impl IntoIterator<Item = TransportMode>) -> Self {
        self.modes = Some(modes.into_iter().collect());
        self
    }

    pub fn with_diagnostics(mut self) -> Self {
        self.diagnostics = true;
        self
    }

    /// The modes this request searches, given the configured default.
    pub fn modes_or(&self, default: &BTreeSet<TransportMode>) -> BTreeSet<TransportMode> {
        self.modes.clone().unwrap_or_else(|| default.clone())
    }

    /// Reject requests no search could satisfy.
    pub fn validate(&self, modes: &BTreeSet<TransportMode>) -> Result<(), SearchError> {
        if modes.is_empty() {
            return Err(SearchError::InvalidRequest("no transport modes".to_string()));
        }
        if !modes.iter().any(TransportMode::is_vehicle) {
            return Err(SearchError::InvalidRequest(
                "no vehicle transport modes".to_string(),
            ));
        }
        if self.time.is_next_day() {
            return Err(SearchError::InvalidRequest(format!(
                "query time {} must be on the query date",
                self.time
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> JourneyRequest {
        JourneyRequest::new(
            Location::Station(StationId::parse("A").unwrap()),
            Location::Group(StationGroupId::parse("G").unwrap()),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            TramTime::of(9, 0).unwrap(),
        )
    }

    #[test]
    fn builder_methods() {
        let req = request()
            .with_max_changes(1)
            .with_modes([TransportMode::Bus])
            .with_diagnostics();
        assert_eq!(req.max_changes, 1);
        assert!(req.diagnostics);
        let default = BTreeSet::from([TransportMode::Tram]);
        assert_eq!(req.modes_or(&default), BTreeSet::from([TransportMode::Bus]));
        assert_eq!(request().modes_or(&default), default);
    }

    #[test]
    fn validation() {
        let req = request();
        assert!(req.validate(&BTreeSet::from([TransportMode::Tram])).is_ok());
        assert!(matches!(
            req.validate(&BTreeSet::new()),
            Err(SearchError::InvalidRequest(_))
        ));
        assert!(matches!(
            req.validate(&BTreeSet::from([TransportMode::Walk])),
            Err(SearchError::InvalidRequest(_))
        ));

        let mut late = request();
        late.time = TramTime::next_day(0, 30).unwrap();
        assert!(late.validate(&BTreeSet::from([TransportMode::Tram])).is_err());
    }

    #[test]
    fn location_display() {
        let at = Location::Position(LatLong::new(53.4, -2.25).unwrap());
        assert_eq!(at.to_string(), "53.40000,-2.25000");
        assert_eq!(request().to.to_string(), "group G");
    }
}
