//! Source-neutral event record.
//!
//! Calendar imports and spreadsheet extractions both produce [`Event`]s, which
//! is what makes them comparable once they land in the same table.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta};
use serde::Serialize;

use crate::error::{AgendaError, AgendaResult};

/// Where an event was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Read from a calendar-exchange (.ics) file
    Imported,
    /// Extracted from a timetable spreadsheet
    Extracted,
}

/// A calendar event with a validated, timezone-aware time range.
///
/// `dtstart < dtend` holds for every value of this type. Fields are private
/// so an event cannot be changed once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    summary: String,
    dtstart: DateTime<FixedOffset>,
    dtend: DateTime<FixedOffset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    /// Date-only event (VALUE=DATE in ics terms)
    all_day: bool,
    origin: Origin,
}

impl Event {
    /// Build a timed event. Fails with `InvalidRange` unless `dtstart < dtend`.
    pub fn new(
        summary: impl Into<String>,
        dtstart: DateTime<FixedOffset>,
        dtend: DateTime<FixedOffset>,
        origin: Origin,
    ) -> AgendaResult<Self> {
        let summary = summary.into();
        if dtstart >= dtend {
            return Err(AgendaError::InvalidRange {
                summary,
                dtstart: dtstart.to_rfc3339(),
                dtend: dtend.to_rfc3339(),
            });
        }

        Ok(Event {
            summary,
            dtstart,
            dtend,
            location: None,
            description: None,
            all_day: false,
            origin,
        })
    }

    /// Build a date-only event covering `first` 00:00:00 through `last`
    /// 23:59:59.999999, both in UTC.
    pub fn all_day(
        summary: impl Into<String>,
        first: NaiveDate,
        last: NaiveDate,
        origin: Origin,
    ) -> AgendaResult<Self> {
        let mut event = Event::new(summary, start_of_day(first), end_of_day(last), origin)?;
        event.all_day = true;
        Ok(event)
    }

    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location.filter(|l| !l.is_empty());
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|d| !d.is_empty());
        self
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn dtstart(&self) -> DateTime<FixedOffset> {
        self.dtstart
    }

    pub fn dtend(&self) -> DateTime<FixedOffset> {
        self.dtend
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_all_day(&self) -> bool {
        self.all_day
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Half-open overlap test: touching boundaries do not overlap.
    pub fn overlaps(&self, other: &Event) -> bool {
        self.dtstart < other.dtend && other.dtstart < self.dtend
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.all_day {
            write!(
                f,
                "{} ({} -> {}, all day)",
                self.summary,
                self.dtstart.format("%Y-%m-%d"),
                self.dtend.format("%Y-%m-%d")
            )
        } else {
            write!(
                f,
                "{} ({} -> {})",
                self.summary,
                self.dtstart.format("%Y-%m-%d %H:%M%:z"),
                self.dtend.format("%Y-%m-%d %H:%M%:z")
            )
        }
    }
}

/// Midnight UTC at the start of `date`.
pub fn start_of_day(date: NaiveDate) -> DateTime<FixedOffset> {
    date.and_time(NaiveTime::MIN).and_utc().fixed_offset()
}

/// Last representable microsecond of `date` in UTC.
pub fn end_of_day(date: NaiveDate) -> DateTime<FixedOffset> {
    start_of_day(date) + TimeDelta::days(1) - TimeDelta::microseconds(1)
}
