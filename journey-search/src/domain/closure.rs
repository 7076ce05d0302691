//! Temporary station closures.

use chrono::NaiveDate;

use super::{DateRange, StationId, TimeRange, TramTime};

/// A station closed for a range of dates, optionally only within a time
/// window on each of those dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationClosure {
    station: StationId,
    dates: DateRange,
    times: Option<TimeRange>,
}

impl StationClosure {
    /// Closed all day on every date in the range.
    pub fn all_day(station: StationId, dates: DateRange) -> Self {
        Self {
            station,
            dates,
            times: None,
        }
    }

    /// Closed within `times` on every date in the range.
    pub fn partial(station: StationId, dates: DateRange, times: TimeRange) -> Self {
        Self {
            station,
            dates,
            times: Some(times),
        }
    }

    pub fn station(&self) -> &StationId {
        &self.station
    }

    pub fn dates(&self) -> DateRange {
        self.dates
    }

    pub fn times(&self) -> Option<TimeRange> {
        self.times
    }

    /// True if the closure has any effect on the given date.
    pub fn active_on(&self, date: NaiveDate) -> bool {
        self.dates.contains(date)
    }

    /// True if the station is closed at `time` on a journey queried for `date`.
    ///
    /// Times on the following day are checked against the following date.
    pub fn closed_at(&self, date: NaiveDate, time: TramTime) -> bool {
        let (date, time) = if time.is_next_day() {
            (date.succ_opt().unwrap_or(date), time.same_day())
        } else {
            (date, time)
        };
        if !self.dates.contains(date) {
            return false;
        }
        match self.times {
            None => true,
            Some(window) => window.contains(time),
        }
    }
}
