//! Overlap detection over a normalized event table.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::event::Event;
use crate::table::EventTable;

/// Two events whose time ranges overlap. `event1` never starts after
/// `event2`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "ConflictRecord")]
pub struct Conflict {
    pub event1: Event,
    pub event2: Event,
}

/// Flat reporting shape of a [`Conflict`].
#[derive(Debug, Clone, Serialize)]
struct ConflictRecord {
    event1_summary: String,
    event1_dtstart: DateTime<FixedOffset>,
    event1_dtend: DateTime<FixedOffset>,
    event2_summary: String,
    event2_dtstart: DateTime<FixedOffset>,
    event2_dtend: DateTime<FixedOffset>,
}

impl From<Conflict> for ConflictRecord {
    fn from(conflict: Conflict) -> Self {
        ConflictRecord {
            event1_summary: conflict.event1.summary().to_string(),
            event1_dtstart: conflict.event1.dtstart(),
            event1_dtend: conflict.event1.dtend(),
            event2_summary: conflict.event2.summary().to_string(),
            event2_dtstart: conflict.event2.dtstart(),
            event2_dtend: conflict.event2.dtend(),
        }
    }
}

impl Conflict {
    fn ordered(a: &Event, b: &Event) -> Self {
        let (event1, event2) = if b.dtstart() < a.dtstart() { (b, a) } else { (a, b) };
        Conflict {
            event1: event1.clone(),
            event2: event2.clone(),
        }
    }
}

/// Every overlapping pair in `table`, found with a left-to-right sweep.
///
/// Conflicts come out in the order their later event is reached. An event
/// and an exact duplicate of it are reported as a conflict.
pub fn find_conflicts(table: &EventTable) -> Vec<Conflict> {
    let events = table.events();
    let mut conflicts = Vec::new();
    let mut active: Vec<usize> = Vec::new();

    for (idx, event) in events.iter().enumerate() {
        active.retain(|&a| events[a].dtend() > event.dtstart());

        // active events started no later than `event` and end after it
        // starts, so each one overlaps it
        for &a in &active {
            conflicts.push(Conflict::ordered(&events[a], event));
        }
        active.push(idx);
    }

    conflicts
}

/// All-pairs reference scan. Works on unsorted input.
pub fn find_conflicts_naive(events: &[Event]) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    for (i, a) in events.iter().enumerate() {
        for b in &events[i + 1..] {
            if a.overlaps(b) {
                conflicts.push(Conflict::ordered(a, b));
            }
        }
    }
    conflicts
}
