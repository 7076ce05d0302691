//! Owned summaries of accepted paths.

use chrono::Duration;
use serde::{Serialize, Serializer};

use crate::domain::{RouteId, StationId, TramTime, TripId};
use crate::search::{DiagnosticsReport, FoundPath};

/// One journey found by a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Journey {
    /// Start time of the path request that found this journey.
    pub query_time: TramTime,
    /// First vehicle departure.
    pub departure: TramTime,
    pub arrival: TramTime,
    #[serde(serialize_with = "minutes")]
    pub duration: Duration,
    pub changes: u32,
    pub walking_connections: u32,
    /// Stations in the order the journey reached them.
    pub call_points: Vec<StationId>,
    /// Routes boarded, in order.
    pub routes: Vec<RouteId>,
    pub trips: Vec<TripId>,
    /// Change limit of the path request that found this journey.
    pub max_changes: u32,
}

impl Journey {
    pub fn from_path(path: &FoundPath<'_>) -> Self {
        let state = &path.state;
        let departure = state.first_departure().unwrap_or(path.query_time);
        let arrival = state.clock();
        let routes = path
            .relationships
            .iter()
            .filter(|r| r.kind().is_boarding())
            .filter_map(|r| r.props().route.clone())
            .collect();
        Self {
            query_time: path.query_time,
            departure,
            arrival,
            duration: arrival.signed_duration_since(departure),
            changes: state.number_of_changes(),
            walking_connections: state.walking_connections(),
            call_points: state.visited().to_vec(),
            routes,
            trips: state.trips_done().to_vec(),
            max_changes: path.max_changes,
        }
    }
}

fn minutes<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i64(duration.num_minutes())
}

/// The answer to a query: ranked journeys, best first.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JourneyResponse {
    pub journeys: Vec<Journey>,
    /// Present when the request asked for diagnostics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<DiagnosticsReport>,
}

impl JourneyResponse {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.journeys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> TramTime {
        TramTime::parse_hhmm(s).unwrap()
    }

    #[test]
    fn serializes_times_and_minutes() {
        let journey = Journey {
            query_time: t("07:55"),
            departure: t("08:00"),
            arrival: t("08:12"),
            duration: Duration::minutes(12),
            changes: 0,
            walking_connections: 0,
            call_points: vec![StationId::parse("A").unwrap(), StationId::parse("C").unwrap()],
            routes: vec![RouteId::parse("R1").unwrap()],
            trips: vec![TripId::parse("T1").unwrap()],
            max_changes: 1,
        };
        let json = serde_json::to_value(&journey).unwrap();
        assert_eq!(json["departure"], "08:00");
        assert_eq!(json["duration"], 12);
        assert_eq!(json["call_points"][1], "C");

        let response = JourneyResponse {
            journeys: vec![journey],
            diagnostics: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("diagnostics").is_none());
        assert!(JourneyResponse::empty().is_empty());
    }
}
