//! Single-sheet semester timetables.
//!
//! One row per week, a column holding the week's Monday, and the same (day,
//! slot) columns as the weekly grids but no group dimension. The day-name row
//! sits right above the slot-code row.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::header::{DateCell, classify_date_cell, slot_columns};
use super::{CourseMatcher, MatchMode, ResolvedSheet, Workbook, cell_name, column_index};
use crate::error::{AgendaError, AgendaResult};
use crate::event::{Event, Origin};
use crate::slots::Institution;

/// Where things are on a semester sheet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SemesterLayout {
    /// Column holding each week's start date, e.g. `A`
    pub date_column: String,
    /// 1-based row holding the slot codes
    pub slot_row: u32,
    /// Sheet to read; the first one when unset
    pub sheet: Option<String>,
}

impl Default for SemesterLayout {
    fn default() -> Self {
        SemesterLayout {
            date_column: "A".into(),
            slot_row: 2,
            sheet: None,
        }
    }
}

/// Which course to pull out of a semester sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemesterQuery {
    pub course: String,
    pub types: Vec<String>,
    pub match_mode: MatchMode,
    pub display: bool,
}

impl SemesterQuery {
    pub fn new(course: impl Into<String>) -> Self {
        SemesterQuery {
            course: course.into(),
            types: Vec::new(),
            match_mode: MatchMode::default(),
            display: false,
        }
    }
}

pub fn extract_semester_schedule(
    path: &Path,
    query: &SemesterQuery,
    layout: &SemesterLayout,
    institution: &Institution,
) -> AgendaResult<Vec<Event>> {
    let workbook = Workbook::open(path)?;
    let events = extract_semester_from_workbook(&workbook, query, layout, institution)?;
    info!(
        path = %path.display(),
        course = %query.course,
        count = events.len(),
        "extracted semester schedule"
    );
    Ok(events)
}

pub fn extract_semester_from_workbook(
    workbook: &Workbook,
    query: &SemesterQuery,
    layout: &SemesterLayout,
    institution: &Institution,
) -> AgendaResult<Vec<Event>> {
    let date_col = column_index(&layout.date_column).ok_or_else(|| {
        AgendaError::Config(format!("invalid date column '{}'", layout.date_column))
    })?;
    if layout.slot_row < 2 {
        return Err(AgendaError::Config(
            "semester slot row must leave room for the day row above it".into(),
        ));
    }

    let sheet = pick_sheet(workbook, layout)?;
    let slot_row = layout.slot_row - 1;
    let columns = slot_columns(sheet, slot_row - 1, slot_row, &institution.grid);
    if columns.is_empty() {
        return Err(AgendaError::sheet_structure(
            workbook.path(),
            sheet.name(),
            format!("no day/slot header in rows {} and {}", layout.slot_row - 1, layout.slot_row),
        ));
    }

    let matcher = CourseMatcher::new(&query.course, query.match_mode).with_types(&query.types);
    let last_row = sheet.last_row().unwrap_or(slot_row);
    let mut events = Vec::new();

    for row in (slot_row + 1)..=last_row {
        let hits: Vec<_> = columns
            .iter()
            .filter_map(|column| {
                let text = sheet.text(row, column.col)?;
                matcher.matches(&text).then_some((column, text))
            })
            .collect();
        if hits.is_empty() {
            continue;
        }

        let cell = cell_name(row, date_col);
        let week_start = match sheet.get(row, date_col).map(classify_date_cell) {
            Some(DateCell::Date(date)) => date,
            None | Some(DateCell::NotADate) => {
                debug!(sheet = sheet.name(), %cell, "no week date, skipping row");
                continue;
            }
            Some(DateCell::Unreadable) => {
                return Err(AgendaError::DateParse {
                    path: workbook.path().to_path_buf(),
                    sheet: sheet.name().to_string(),
                    value: sheet.get(row, date_col).map(|v| v.to_string()).unwrap_or_default(),
                    cell,
                });
            }
        };

        for (column, text) in hits {
            let Some(date) = column.date_in_week(week_start) else {
                return Err(AgendaError::DateParse {
                    path: workbook.path().to_path_buf(),
                    sheet: sheet.name().to_string(),
                    value: week_start.to_string(),
                    cell,
                });
            };
            let Some((start, end)) = institution.slot_range(date, &column.slot) else {
                warn!(sheet = sheet.name(), %date, slot = %column.slot.code, "slot falls in a clock change, skipped");
                continue;
            };

            if query.display {
                println!("{} {} {}", date.format("%a %d/%m/%y"), column.slot.code, text);
            }

            events.push(Event::new(text, start, end, Origin::Extracted)?);
        }
    }

    Ok(events)
}

fn pick_sheet<'a>(workbook: &'a Workbook, layout: &SemesterLayout) -> AgendaResult<&'a ResolvedSheet> {
    match &layout.sheet {
        Some(name) => workbook.sheet(name).ok_or_else(|| {
            AgendaError::sheet_structure(workbook.path(), name, "sheet not found in workbook")
        }),
        None => workbook.sheets().first().ok_or_else(|| AgendaError::Spreadsheet {
            path: workbook.path().to_path_buf(),
            reason: "workbook has no sheets".into(),
        }),
    }
}
