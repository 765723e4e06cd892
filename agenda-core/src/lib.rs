//! Core library for agenda.
//!
//! Reads personal calendars (.ics) and course timetables (.xlsx), merges
//! them into one event table and reports overlapping events:
//! - `ics` imports and exports calendar files
//! - `sheet` resolves merged cells and extracts courses from timetable grids
//! - `table` and `conflict` normalize events and find overlaps
//! - `pipeline` runs all of it from a `config`

pub mod config;
pub mod conflict;
pub mod error;
pub mod event;
pub mod ics;
pub mod pipeline;
pub mod sheet;
pub mod slots;
pub mod table;

pub use conflict::{Conflict, find_conflicts, find_conflicts_naive};
pub use error::{AgendaError, AgendaResult};
pub use event::{Event, Origin};
pub use slots::{Institution, LocalClock, SlotDef, SlotGrid};
pub use table::EventTable;
