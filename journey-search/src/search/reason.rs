//! Outcomes of heuristic checks.
//!
//! Every check the evaluator runs yields a [`ReasonCode`]. Valid codes let a
//! branch continue; rejection codes prune it. The code together with where
//! the branch was ([`HowIGotHere`]) forms a [`ServiceReason`], which feeds
//! the diagnostics trail.

use std::fmt;

use serde::Serialize;

use super::traversal::StateKind;
use crate::domain::{StationId, TramTime};

/// What the evaluator should do with a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Evaluation {
    /// Keep the branch and expand its children.
    Continue,
    /// Drop the branch.
    Prune,
    /// The branch reached a destination: emit it, do not expand.
    Arrived,
}

/// Tagged result of one heuristic check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ReasonCode {
    // valid
    ServiceDateOk,
    ServiceTimeOk,
    NumChangesOk,
    TimeOk,
    HourOk,
    Reachable,
    ReachableNoCheck,
    ReachableSameRoute,
    DurationOk,
    WalkOk,
    StationOpen,
    Continue,
    NumWalkingConnectionsOk,
    NeighbourConnectionsOk,
    TransportModeOk,
    Arrived,
    PreviousCacheMiss,

    // rejections
    NotOnQueryDate,
    RouteNotOnQueryDate,
    ServiceNotRunningAtTime,
    TookTooLong,
    NotAtHour,
    AlreadyDeparted,
    DoesNotOperateOnTime,
    DestinationUnavailableAtTime,
    PathTooLong,
    TooManyChanges,
    TooManyWalkingConnections,
    TooManyNeighbourConnections,
    TooManyRouteChangesRequired,
    TooManyInterchangesRequired,
    StationClosed,
    TransportModeWrong,
    ReturnedToStart,
    AlreadySeenStation,
    AlreadySeenTime,
    SameTrip,
    HigherCost,
    ArrivedLater,
    ArrivedMoreChanges,
    TimedOut,
    SearchStopped,

    // replayed from the previous-visit cache
    CachedNotOnQueryDate,
    CachedRouteNotOnQueryDate,
    CachedNotAtHour,
    CachedDoesNotOperateOnTime,
    CachedTooManyRouteChangesRequired,
    CachedTooManyInterchangesRequired,
    CachedStationClosed,
    CachedTransportModeWrong,
    CachedUnknown,
}

impl ReasonCode {
    pub fn is_valid(&self) -> bool {
        matches!(
            self,
            ReasonCode::ServiceDateOk
                | ReasonCode::ServiceTimeOk
                | ReasonCode::NumChangesOk
                | ReasonCode::TimeOk
                | ReasonCode::HourOk
                | ReasonCode::Reachable
                | ReasonCode::ReachableNoCheck
                | ReasonCode::ReachableSameRoute
                | ReasonCode::DurationOk
                | ReasonCode::WalkOk
                | ReasonCode::StationOpen
                | ReasonCode::Continue
                | ReasonCode::NumWalkingConnectionsOk
                | ReasonCode::NeighbourConnectionsOk
                | ReasonCode::TransportModeOk
                | ReasonCode::Arrived
                | ReasonCode::PreviousCacheMiss
        )
    }

    pub fn is_cached(&self) -> bool {
        matches!(
            self,
            ReasonCode::CachedNotOnQueryDate
                | ReasonCode::CachedRouteNotOnQueryDate
                | ReasonCode::CachedNotAtHour
                | ReasonCode::CachedDoesNotOperateOnTime
                | ReasonCode::CachedTooManyRouteChangesRequired
                | ReasonCode::CachedTooManyInterchangesRequired
                | ReasonCode::CachedStationClosed
                | ReasonCode::CachedTransportModeWrong
                | ReasonCode::CachedUnknown
        )
    }

    /// The code reported when this rejection is replayed from the cache.
    pub fn as_cached(self) -> ReasonCode {
        match self {
            ReasonCode::NotOnQueryDate => ReasonCode::CachedNotOnQueryDate,
            ReasonCode::RouteNotOnQueryDate => ReasonCode::CachedRouteNotOnQueryDate,
            ReasonCode::NotAtHour => ReasonCode::CachedNotAtHour,
            ReasonCode::DoesNotOperateOnTime => ReasonCode::CachedDoesNotOperateOnTime,
            ReasonCode::TooManyRouteChangesRequired => {
                ReasonCode::CachedTooManyRouteChangesRequired
            }
            ReasonCode::TooManyInterchangesRequired => {
                ReasonCode::CachedTooManyInterchangesRequired
            }
            ReasonCode::StationClosed => ReasonCode::CachedStationClosed,
            ReasonCode::TransportModeWrong => ReasonCode::CachedTransportModeWrong,
            code if code.is_cached() => code,
            _ => ReasonCode::CachedUnknown,
        }
    }

    pub fn evaluation(&self) -> Evaluation {
        match self {
            ReasonCode::Arrived => Evaluation::Arrived,
            code if code.is_valid() => Evaluation::Continue,
            _ => Evaluation::Prune,
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Where a branch was when a check ran.
///
/// Node ids are raw indexes so the record can outlive the transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HowIGotHere {
    pub node: u64,
    pub previous: Option<u64>,
    /// Last station the branch passed through, if any.
    pub approx_station: Option<StationId>,
    pub clock: TramTime,
    pub state: StateKind,
}

/// A reason code and the branch it was decided for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceReason {
    pub code: ReasonCode,
    pub how: HowIGotHere,
}

impl ServiceReason {
    pub fn new(code: ReasonCode, how: HowIGotHere) -> Self {
        Self { code, how }
    }

    pub fn is_valid(&self) -> bool {
        self.code.is_valid()
    }
}

impl fmt::Display for ServiceReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at n{} ({}) {}",
            self.code, self.how.node, self.how.state, self.how.clock
        )?;
        if let Some(station) = &self.how.approx_station {
            write!(f, " near {station}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_codes_continue() {
        assert!(ReasonCode::TimeOk.is_valid());
        assert_eq!(ReasonCode::TimeOk.evaluation(), Evaluation::Continue);
        assert_eq!(ReasonCode::WalkOk.evaluation(), Evaluation::Continue);
        assert_eq!(ReasonCode::Arrived.evaluation(), Evaluation::Arrived);
    }

    #[test]
    fn rejections_prune() {
        for code in [
            ReasonCode::NotAtHour,
            ReasonCode::ArrivedLater,
            ReasonCode::TimedOut,
            ReasonCode::CachedStationClosed,
        ] {
            assert!(!code.is_valid());
            assert_eq!(code.evaluation(), Evaluation::Prune);
        }
    }

    #[test]
    fn cached_variants() {
        assert_eq!(ReasonCode::NotAtHour.as_cached(), ReasonCode::CachedNotAtHour);
        assert_eq!(
            ReasonCode::TooManyInterchangesRequired.as_cached(),
            ReasonCode::CachedTooManyInterchangesRequired
        );
        assert_eq!(
            ReasonCode::CachedNotAtHour.as_cached(),
            ReasonCode::CachedNotAtHour
        );
        assert_eq!(ReasonCode::HigherCost.as_cached(), ReasonCode::CachedUnknown);
        assert!(ReasonCode::CachedUnknown.is_cached());
        assert!(!ReasonCode::NotAtHour.is_cached());
    }

    #[test]
    fn reason_display() {
        let reason = ServiceReason::new(
            ReasonCode::StationClosed,
            HowIGotHere {
                node: 12,
                previous: Some(3),
                approx_station: Some(StationId::parse("ALT").unwrap()),
                clock: TramTime::of(8, 5).unwrap(),
                state: StateKind::Minute,
            },
        );
        assert!(!reason.is_valid());
        assert_eq!(reason.to_string(), "StationClosed at n12 (Minute) 08:05 near ALT");
    }
}
