//! ICS import using the icalendar crate's parser.

use std::path::Path;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use icalendar::{
    CalendarDateTime, DatePerhapsTime,
    parser::{Component, read_calendar, unfold},
};
use tracing::{debug, info, warn};

use super::parse_offset_tzid;
use crate::error::{AgendaError, AgendaResult};
use crate::event::{Event, Origin, end_of_day, start_of_day};


/// Filters applied while importing.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Drop events starting before this instant
    pub since: Option<DateTime<Utc>>,
}

/// Read every VEVENT stored in an .ics file.
///
/// Recurring masters are read as the single component they are; no
/// instances are generated.
pub fn import_calendar(path: &Path) -> AgendaResult<Vec<Event>> {
    import_calendar_with(path, &ImportOptions::default())
}

pub fn import_calendar_with(path: &Path, options: &ImportOptions) -> AgendaResult<Vec<Event>> {
    let content = std::fs::read_to_string(path).map_err(|source| AgendaError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let events = parse_calendar(&content, path, options)?;
    info!(path = %path.display(), count = events.len(), "imported calendar");
    Ok(events)
}

/// Parse calendar text. `source` is only used to label errors.
pub fn parse_calendar(
    content: &str,
    source: &Path,
    options: &ImportOptions,
) -> AgendaResult<Vec<Event>> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded)
        .map_err(|e| AgendaError::IcsParse(format!("{}: {e}", source.display())))?;

    let mut vevents = Vec::new();
    for component in &calendar.components {
        collect_vevents(component, &mut vevents);
    }

    let mut events = Vec::with_capacity(vevents.len());
    for vevent in vevents {
        let event = parse_vevent(vevent, source)?;
        if let Some(since) = options.since {
            if event.dtstart() < since {
                debug!(summary = event.summary(), "skipping event before cut-off");
                continue;
            }
        }
        events.push(event);
    }

    Ok(events)
}

/// Depth-first walk so VEVENTs nested in a VCALENDAR wrapper are found too.
fn collect_vevents<'a, 'c>(component: &'c Component<'a>, out: &mut Vec<&'c Component<'a>>) {
    if component.name == "VEVENT" {
        out.push(component);
        return;
    }
    for child in &component.components {
        collect_vevents(child, out);
    }
}

fn parse_vevent(vevent: &Component<'_>, source: &Path) -> AgendaResult<Event> {
    let summary = vevent
        .find_prop("SUMMARY")
        .map(|p| unescape_text(p.val.as_ref()))
        .unwrap_or_else(|| "(No title)".to_string());

    let malformed = |reason: String| AgendaError::MalformedEvent {
        path: source.to_path_buf(),
        reason: format!("'{summary}': {reason}"),
    };

    let start = vevent
        .find_prop("DTSTART")
        .ok_or_else(|| malformed("missing DTSTART".into()))?;
    let start = DatePerhapsTime::try_from(start)
        .map_err(|_| malformed(format!("unreadable DTSTART '{}'", start.val.as_ref())))?;

    let end = vevent
        .find_prop("DTEND")
        .ok_or_else(|| malformed("missing DTEND".into()))?;
    let end = DatePerhapsTime::try_from(end)
        .map_err(|_| malformed(format!("unreadable DTEND '{}'", end.val.as_ref())))?;

    let location = vevent
        .find_prop("LOCATION")
        .map(|p| unescape_text(p.val.as_ref()));
    let description = vevent
        .find_prop("DESCRIPTION")
        .map(|p| unescape_text(p.val.as_ref()));

    let event = match (start, end) {
        (DatePerhapsTime::Date(first), DatePerhapsTime::Date(last)) => {
            Event::all_day(summary.clone(), first, last, Origin::Imported)
        }
        (start, end) => Event::new(
            summary.clone(),
            to_instant(start, Boundary::Start),
            to_instant(end, Boundary::End),
            Origin::Imported,
        ),
    }
    .map_err(|e| malformed(e.to_string()))?;

    Ok(event.with_location(location).with_description(description))
}

#[derive(Clone, Copy)]
enum Boundary {
    Start,
    End,
}

/// Resolve an ics time to an instant, keeping the offset the file used.
/// Floating times and unknown zones are read as UTC; `UTC+0200` style TZIDs
/// are fixed offsets.
fn to_instant(value: DatePerhapsTime, boundary: Boundary) -> DateTime<FixedOffset> {
    match value {
        DatePerhapsTime::Date(date) => date_boundary(date, boundary),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => dt.fixed_offset(),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => {
            naive.and_utc().fixed_offset()
        }
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            zoned_instant(date_time, &tzid)
        }
    }
}

fn date_boundary(date: NaiveDate, boundary: Boundary) -> DateTime<FixedOffset> {
    match boundary {
        Boundary::Start => start_of_day(date),
        Boundary::End => end_of_day(date),
    }
}

fn zoned_instant(naive: NaiveDateTime, tzid: &str) -> DateTime<FixedOffset> {
    let name = tzid.trim_matches('"');
    if let Some(offset) = parse_offset_tzid(name) {
        if let Some(dt) = offset.from_local_datetime(&naive).single() {
            return dt;
        }
    }
    match name.parse::<Tz>() {
        Ok(tz) => tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.fixed_offset())
            .unwrap_or_else(|| naive.and_utc().fixed_offset()),
        Err(_) => {
            warn!(tzid = name, "unknown TZID, reading time as UTC");
            naive.and_utc().fixed_offset()
        }
    }
}

/// Undo RFC 5545 TEXT escaping (`\n`, `\,`, `\;`, `\\`).
fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
