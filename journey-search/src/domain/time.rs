//! Day-relative times for timetable data.
//!
//! Timetables describe departures as "HH:MM" on a service day. A journey that
//! starts late in the evening can run past midnight, so a `TramTime` is a
//! minute offset from midnight of the query date that may extend into the
//! following day. Only one following day is representable, which is enough
//! for any journey bounded by the maximum journey duration.

use std::fmt;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Serialize, Serializer};

const MINUTES_PER_DAY: u16 = 24 * 60;
const MAX_MINUTES: u16 = 2 * MINUTES_PER_DAY - 1;

/// Error returned when constructing or parsing an invalid time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// A time of day relative to the query date, possibly on the next day.
///
/// Ordering follows elapsed minutes, so `00:10` on the next day is later
/// than `23:50` on the query date.
///
/// # Examples
///
/// ```
/// use journey_search::domain::TramTime;
/// use chrono::Duration;
///
/// let late = TramTime::parse_hhmm("23:50").unwrap();
/// let after = late.checked_add(Duration::minutes(20)).unwrap();
/// assert!(after.is_next_day());
/// assert_eq!(after.to_string(), "00:10+24");
/// assert!(after > late);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TramTime {
    minutes: u16,
}

impl TramTime {
    /// Midnight at the start of the query date.
    pub const MIDNIGHT: TramTime = TramTime { minutes: 0 };

    /// A time on the query date.
    pub fn of(hour: u32, minute: u32) -> Result<Self, TimeError> {
        if hour > 23 {
            return Err(TimeError::new("hour must be 0-23"));
        }
        if minute > 59 {
            return Err(TimeError::new("minute must be 0-59"));
        }
        Ok(Self {
            minutes: (hour * 60 + minute) as u16,
        })
    }

    /// A time on the day after the query date.
    pub fn next_day(hour: u32, minute: u32) -> Result<Self, TimeError> {
        let same_day = Self::of(hour, minute)?;
        Ok(Self {
            minutes: same_day.minutes + MINUTES_PER_DAY,
        })
    }

    /// Build from minutes elapsed since midnight of the query date.
    pub fn from_minutes(minutes: u32) -> Result<Self, TimeError> {
        if minutes > MAX_MINUTES as u32 {
            return Err(TimeError::new("beyond the following day"));
        }
        Ok(Self {
            minutes: minutes as u16,
        })
    }

    /// Parse "HH:MM". Hours 24-47 (timetable style) and a "+24" suffix both
    /// denote the following day.
    ///
    /// # Examples
    ///
    /// ```
    /// use journey_search::domain::TramTime;
    ///
    /// assert!(TramTime::parse_hhmm("08:15").is_ok());
    /// assert!(TramTime::parse_hhmm("25:10").unwrap().is_next_day());
    /// assert!(TramTime::parse_hhmm("01:10+24").unwrap().is_next_day());
    /// assert!(TramTime::parse_hhmm("8:15").is_err());
    /// assert!(TramTime::parse_hhmm("48:00").is_err());
    /// ```
    pub fn parse_hhmm(s: &str) -> Result<Self, TimeError> {
        let (body, next_day) = match s.strip_suffix("+24") {
            Some(body) => (body, true),
            None => (s, false),
        };

        if body.len() != 5 {
            return Err(TimeError::new("expected HH:MM format"));
        }
        let bytes = body.as_bytes();
        if bytes[2] != b':' {
            return Err(TimeError::new("expected colon at position 2"));
        }

        let hour =
            parse_two_digits(&bytes[0..2]).ok_or_else(|| TimeError::new("invalid hour digits"))?;
        let minute = parse_two_digits(&bytes[3..5])
            .ok_or_else(|| TimeError::new("invalid minute digits"))?;

        match (hour, next_day) {
            (0..=23, false) => Self::of(hour, minute),
            (0..=23, true) => Self::next_day(hour, minute),
            (24..=47, false) => Self::next_day(hour - 24, minute),
            _ => Err(TimeError::new("hour out of range")),
        }
    }

    /// Hour of the day (0-23), ignoring the day offset.
    pub fn hour(&self) -> u32 {
        (self.minutes_of_day() / 60) as u32
    }

    /// Minute of the hour (0-59).
    pub fn minute(&self) -> u32 {
        (self.minutes % 60) as u32
    }

    /// Minutes since midnight of whichever day this time falls on.
    pub fn minutes_of_day(&self) -> u16 {
        self.minutes % MINUTES_PER_DAY
    }

    /// Minutes since midnight of the query date.
    pub fn total_minutes(&self) -> u32 {
        self.minutes as u32
    }

    pub fn is_next_day(&self) -> bool {
        self.minutes >= MINUTES_PER_DAY
    }

    /// The same time of day moved onto the following day.
    ///
    /// Returns `None` if already on the following day.
    pub fn to_next_day(&self) -> Option<Self> {
        if self.is_next_day() {
            None
        } else {
            Some(Self {
                minutes: self.minutes + MINUTES_PER_DAY,
            })
        }
    }

    /// The same time of day on the query date.
    pub fn same_day(&self) -> Self {
        Self {
            minutes: self.minutes_of_day(),
        }
    }

    /// Add a duration, returning `None` when the result leaves the two-day
    /// window.
    pub fn checked_add(&self, duration: Duration) -> Option<Self> {
        let result = self.minutes as i64 + duration.num_minutes();
        if (0..=MAX_MINUTES as i64).contains(&result) {
            Some(Self {
                minutes: result as u16,
            })
        } else {
            None
        }
    }

    /// Subtract a duration, returning `None` before midnight of the query date.
    pub fn checked_sub(&self, duration: Duration) -> Option<Self> {
        self.checked_add(-duration)
    }

    /// Subtract a duration, clamping at midnight of the query date.
    pub fn saturating_sub(&self, duration: Duration) -> Self {
        self.checked_sub(duration).unwrap_or(Self::MIDNIGHT)
    }

    /// Returns the duration between two times.
    ///
    /// Returns a negative duration if `other` is after `self`.
    pub fn signed_duration_since(&self, other: Self) -> Duration {
        Duration::minutes(self.minutes as i64 - other.minutes as i64)
    }

    /// Inclusive range check.
    pub fn is_between(&self, start: Self, end: Self) -> bool {
        start <= *self && *self <= end
    }

    /// Convert to a wall-clock instant, given the query date.
    pub fn to_datetime(&self, query_date: NaiveDate) -> NaiveDateTime {
        let time = NaiveTime::from_hms_opt(self.hour(), self.minute(), 0).unwrap_or(NaiveTime::MIN);
        let date = if self.is_next_day() {
            query_date.succ_opt().unwrap_or(query_date)
        } else {
            query_date
        };
        date.and_time(time)
    }
}

impl fmt::Debug for TramTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TramTime({self})")
    }
}

impl fmt::Display for TramTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())?;
        if self.is_next_day() {
            f.write_str("+24")?;
        }
        Ok(())
    }
}

impl Serialize for TramTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// An inclusive range of times.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeRange {
    start: TramTime,
    end: TramTime,
}

impl TimeRange {
    /// Create a range; `end` must not be before `start`.
    pub fn of(start: TramTime, end: TramTime) -> Result<Self, TimeError> {
        if end < start {
            return Err(TimeError::new("range end before start"));
        }
        Ok(Self { start, end })
    }

    /// A range centred on `time`, clamped to the representable window.
    pub fn around(time: TramTime, before: Duration, after: Duration) -> Self {
        let start = time.saturating_sub(before);
        let end = time
            .checked_add(after)
            .unwrap_or(TramTime { minutes: MAX_MINUTES });
        Self { start, end }
    }

    /// The whole of the query date.
    pub fn all_day() -> Self {
        Self {
            start: TramTime::MIDNIGHT,
            end: TramTime {
                minutes: MINUTES_PER_DAY - 1,
            },
        }
    }

    pub fn start(&self) -> TramTime {
        self.start
    }

    pub fn end(&self) -> TramTime {
        self.end
    }

    pub fn contains(&self, time: TramTime) -> bool {
        time.is_between(self.start, self.end)
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// True if the range crosses into the following day.
    pub fn into_next_day(&self) -> bool {
        self.end.is_next_day()
    }

    /// The part of this range that falls on the following day, expressed as
    /// times on that day.
    pub fn for_following_day(&self) -> Option<TimeRange> {
        if !self.end.is_next_day() {
            return None;
        }
        let start = if self.start.is_next_day() {
            self.start.same_day()
        } else {
            TramTime::MIDNIGHT
        };
        Some(TimeRange {
            start,
            end: self.end.same_day(),
        })
    }
}

impl fmt::Debug for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimeRange({}-{})", self.start, self.end)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Parse two ASCII digit bytes into a u32.
fn parse_two_digits(bytes: &[u8]) -> Option<u32> {
    if bytes.len() != 2 {
        return None;
    }
    let d1 = (bytes[0] as char).to_digit(10)?;
    let d2 = (bytes[1] as char).to_digit(10)?;
    Some(d1 * 10 + d2)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn time_strategy() -> impl Strategy<Value = TramTime> {
        (0u32..=(MAX_MINUTES as u32)).prop_map(|m| TramTime::from_minutes(m).unwrap())
    }

    proptest! {
        #[test]
        fn add_then_duration_since_round_trips(t in time_strategy(), mins in 0i64..600) {
            if let Some(later) = t.checked_add(Duration::minutes(mins)) {
                prop_assert_eq!(later.signed_duration_since(t), Duration::minutes(mins));
                prop_assert!(later >= t);
            } else {
                prop_assert!(t.total_minutes() as i64 + mins > MAX_MINUTES as i64);
            }
        }

        #[test]
        fn display_parses_back(t in time_strategy()) {
            let parsed = TramTime::parse_hhmm(&t.to_string()).unwrap();
            prop_assert_eq!(parsed, t);
        }

        #[test]
        fn hour_and_minute_in_range(t in time_strategy()) {
            prop_assert!(t.hour() < 24);
            prop_assert!(t.minute() < 60);
        }
    }
}
