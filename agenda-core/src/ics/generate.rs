//! ICS export.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, FixedOffset};
use icalendar::{Calendar, Component, EventLike, Property, ValueType};
use tracing::info;
use uuid::Uuid;

use super::offset_tzid;
use crate::error::{AgendaError, AgendaResult};
use crate::event::Event;

const PRODID: &str = "-//agenda//timetable export//EN";

/// Render events as one VCALENDAR document.
///
/// Every VEVENT gets a fresh UID. Timed events keep their UTC offset: `Z`
/// for UTC, otherwise a `UTC+0200` style TZID with a matching VTIMEZONE.
/// All-day events are written as VALUE=DATE.
pub fn generate_calendar<'a>(events: impl IntoIterator<Item = &'a Event>) -> String {
    let mut cal = Calendar::new();
    let dtstamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
    // VTIMEZONE names keyed by offset seconds
    let mut timezones: BTreeMap<i32, String> = BTreeMap::new();

    for event in events {
        if !event.is_all_day() {
            for offset in [*event.dtstart().offset(), *event.dtend().offset()] {
                if offset.local_minus_utc() != 0 {
                    timezones.insert(offset.local_minus_utc(), offset_tzid(offset));
                }
            }
        }

        let mut ics_event = icalendar::Event::new();
        ics_event.uid(&format!("{}@agenda", Uuid::new_v4()));
        ics_event.summary(event.summary());
        ics_event.add_property("DTSTAMP", &dtstamp);

        add_time_property(&mut ics_event, "DTSTART", event, event.dtstart());
        add_time_property(&mut ics_event, "DTEND", event, event.dtend());

        if let Some(location) = event.location() {
            ics_event.location(location);
        }
        if let Some(description) = event.description() {
            ics_event.description(description);
        }

        cal.push(ics_event.done());
    }

    let ics = strip_ics_bloat(&cal.done().to_string());
    insert_timezones(&ics, &timezones)
}

/// Write events to `path` atomically: the content goes to a temporary file in
/// the same directory which then replaces the target.
///
/// Returns the number of events written.
pub fn export_calendar<'a>(
    events: impl IntoIterator<Item = &'a Event>,
    path: &Path,
) -> AgendaResult<usize> {
    let events: Vec<&Event> = events.into_iter().collect();
    let content = generate_calendar(events.iter().copied());
    write_atomically(path, &content)?;

    info!(path = %path.display(), count = events.len(), "exported calendar");
    Ok(events.len())
}

fn write_atomically(path: &Path, content: &str) -> AgendaResult<()> {
    let write_error = |source: std::io::Error| AgendaError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_error)?;
    tmp.write_all(content.as_bytes()).map_err(write_error)?;
    tmp.as_file().sync_all().map_err(write_error)?;
    tmp.persist(path).map_err(|e| write_error(e.error))?;
    Ok(())
}

fn add_time_property(
    ics_event: &mut icalendar::Event,
    name: &str,
    event: &Event,
    time: DateTime<FixedOffset>,
) {
    if event.is_all_day() {
        let mut prop = Property::new(name, time.date_naive().format("%Y%m%d").to_string());
        prop.append_parameter(ValueType::Date);
        ics_event.append_property(prop);
    } else if time.offset().local_minus_utc() == 0 {
        ics_event.add_property(name, time.format("%Y%m%dT%H%M%SZ").to_string());
    } else {
        let mut prop = Property::new(name, time.format("%Y%m%dT%H%M%S").to_string());
        prop.add_parameter("TZID", &offset_tzid(*time.offset()));
        ics_event.append_property(prop);
    }
}

/// Add one VTIMEZONE per fixed offset, ahead of the first VEVENT.
fn insert_timezones(ics: &str, tzids: &BTreeMap<i32, String>) -> String {
    if tzids.is_empty() {
        return ics.to_string();
    }

    let mut timezones = String::new();
    for utc_offset in tzids.values() {
        let tzoffset = &utc_offset["UTC".len()..];
        timezones.push_str(&format!(
            "BEGIN:VTIMEZONE\r\n\
TZID:{utc_offset}\r\n\
BEGIN:STANDARD\r\n\
DTSTART:19700101T000000\r\n\
TZOFFSETFROM:{tzoffset}\r\n\
TZOFFSETTO:{tzoffset}\r\n\
END:STANDARD\r\n\
END:VTIMEZONE\r\n"
        ));
    }

    match ics.find("BEGIN:VEVENT") {
        Some(at) => format!("{}{}{}", &ics[..at], timezones, &ics[at..]),
        None => ics.to_string(),
    }
}

/// Clean up ICS output from the icalendar crate
/// - Use our own PRODID
/// - Remove CALSCALE:GREGORIAN (it's the default)
fn strip_ics_bloat(ics: &str) -> String {
    let mut result = String::with_capacity(ics.len());

    for line in ics.lines() {
        if line.starts_with("PRODID:") {
            result.push_str("PRODID:");
            result.push_str(PRODID);
            result.push_str("\r\n");
            continue;
        }

        if line == "CALSCALE:GREGORIAN" {
            continue;
        }

        result.push_str(line);
        result.push_str("\r\n");
    }

    result
}
