//! Date ranges and service calendars.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, Weekday};

use super::DomainError;

/// An inclusive range of dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn of(start: NaiveDate, end: NaiveDate) -> Result<Self, DomainError> {
        if end < start {
            return Err(DomainError::InvalidDateRange("end before start"));
        }
        Ok(Self { start, end })
    }

    /// A range covering a single date.
    pub fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Set of weekdays a calendar operates on, as a 7-bit mask (Monday = bit 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DaysOfWeek(u8);

impl DaysOfWeek {
    pub const ALL: DaysOfWeek = DaysOfWeek(0b111_1111);
    pub const WEEKDAYS: DaysOfWeek = DaysOfWeek(0b001_1111);
    pub const WEEKEND: DaysOfWeek = DaysOfWeek(0b110_0000);

    pub fn of(days: &[Weekday]) -> Self {
        Self(days.iter().fold(0, |mask, d| mask | bit(*d)))
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & bit(day) != 0
    }

    pub fn intersects(&self, other: DaysOfWeek) -> bool {
        self.0 & other.0 != 0
    }
}

fn bit(day: Weekday) -> u8 {
    1 << day.num_days_from_monday()
}

/// When a service (or route) operates.
///
/// A calendar operates on a date if the date is inside its range and on one of
/// its weekdays, or is an explicitly added date, and is not explicitly removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCalendar {
    range: DateRange,
    days: DaysOfWeek,
    additional: BTreeSet<NaiveDate>,
    removed: BTreeSet<NaiveDate>,
}

impl ServiceCalendar {
    pub fn new(range: DateRange, days: DaysOfWeek) -> Self {
        Self {
            range,
            days,
            additional: BTreeSet::new(),
            removed: BTreeSet::new(),
        }
    }

    /// Every day within the range.
    pub fn daily(range: DateRange) -> Self {
        Self::new(range, DaysOfWeek::ALL)
    }

    pub fn with_additional(mut self, date: NaiveDate) -> Self {
        self.removed.remove(&date);
        self.additional.insert(date);
        self
    }

    pub fn with_removed(mut self, date: NaiveDate) -> Self {
        self.additional.remove(&date);
        self.removed.insert(date);
        self
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn operates_on(&self, date: NaiveDate) -> bool {
        if self.removed.contains(&date) {
            return false;
        }
        if self.additional.contains(&date) {
            return true;
        }
        self.range.contains(date) && self.days.contains(date.weekday())
    }

    /// True when both calendars could operate on a common date.
    ///
    /// Range and weekday intersection is checked; additional dates of either
    /// calendar are checked against the other exactly.
    pub fn overlaps(&self, other: &ServiceCalendar) -> bool {
        if self.range.overlaps(&other.range) && self.days.intersects(other.days) {
            return true;
        }
        self.additional.iter().any(|d| other.operates_on(*d))
            || other.additional.iter().any(|d| self.operates_on(*d))
    }
}
