//! Weekly per-group timetable grids.
//!
//! One sheet per week, one row per group, one column per (day, slot). A class
//! spanning two slots is a single merged cell; after merge resolution it shows
//! up in both columns and becomes two events, one per slot.

use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::header::{SlotColumn, find_week_start, slot_columns};
use super::{CourseMatcher, MatchMode, ResolvedSheet, Workbook, cell_name, column_index};
use crate::error::{AgendaError, AgendaResult};
use crate::event::{Event, Origin};
use crate::slots::Institution;

/// Where things are on a weekly grid sheet. Rows are 1-based, as shown by
/// spreadsheet applications.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GridLayout {
    /// Column holding the group labels
    pub group_column: String,
    /// Row holding the day names (optionally with dates)
    pub day_row: u32,
    /// Row holding the slot codes
    pub slot_row: u32,
    pub first_group_row: u32,
    /// Last row to search for groups; the end of the sheet when unset
    pub last_group_row: Option<u32>,
    /// Sheets that are not weeks (legend, notes...)
    pub skip_sheets: Vec<String>,
}

impl Default for GridLayout {
    fn default() -> Self {
        GridLayout {
            group_column: "B".into(),
            day_row: 3,
            slot_row: 4,
            first_group_row: 5,
            last_group_row: None,
            skip_sheets: Vec::new(),
        }
    }
}

impl GridLayout {
    fn validate(&self) -> AgendaResult<u32> {
        let group_col = column_index(&self.group_column).ok_or_else(|| {
            AgendaError::Config(format!("invalid group column '{}'", self.group_column))
        })?;
        if self.day_row == 0 || self.slot_row == 0 || self.first_group_row == 0 {
            return Err(AgendaError::Config("grid layout rows are 1-based".into()));
        }
        Ok(group_col)
    }
}

/// Which course and group to pull out of a grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridQuery {
    pub course: String,
    pub group: String,
    /// Accepted course types (`TD`, `TP`, `CM`); empty accepts all
    pub types: Vec<String>,
    pub match_mode: MatchMode,
    /// Print one line per extracted event
    pub display: bool,
}

impl GridQuery {
    pub fn new(course: impl Into<String>, group: impl Into<String>) -> Self {
        GridQuery {
            course: course.into(),
            group: group.into(),
            types: Vec::new(),
            match_mode: MatchMode::default(),
            display: false,
        }
    }

    fn matcher(&self) -> CourseMatcher {
        CourseMatcher::new(&self.course, self.match_mode).with_types(&self.types)
    }
}

/// Extract a group's sessions of one course from a weekly grid workbook.
pub fn extract_grid_schedule(
    path: &Path,
    query: &GridQuery,
    layout: &GridLayout,
    institution: &Institution,
) -> AgendaResult<Vec<Event>> {
    let workbook = Workbook::open(path)?;
    let events = extract_grid_from_workbook(&workbook, query, layout, institution)?;
    info!(
        path = %path.display(),
        course = %query.course,
        group = %query.group,
        count = events.len(),
        "extracted grid schedule"
    );
    Ok(events)
}

/// Same as [`extract_grid_schedule`] on a workbook already in memory.
pub fn extract_grid_from_workbook(
    workbook: &Workbook,
    query: &GridQuery,
    layout: &GridLayout,
    institution: &Institution,
) -> AgendaResult<Vec<Event>> {
    let group_col = layout.validate()?;
    let matcher = query.matcher();
    let mut events = Vec::new();

    for sheet in workbook.sheets() {
        if layout.skip_sheets.iter().any(|s| s == sheet.name()) {
            debug!(sheet = sheet.name(), "skipping listed sheet");
            continue;
        }

        let Some(group_row) = find_group_row(workbook.path(), sheet, group_col, layout, &query.group)?
        else {
            debug!(sheet = sheet.name(), "no group labels, not a teaching week");
            continue;
        };

        let columns = slot_columns(sheet, layout.day_row - 1, layout.slot_row - 1, &institution.grid);
        if columns.is_empty() {
            return Err(AgendaError::sheet_structure(
                workbook.path(),
                sheet.name(),
                format!("no day/slot header in rows {} and {}", layout.day_row, layout.slot_row),
            ));
        }

        let week_start = find_week_start(sheet.name());

        for column in &columns {
            let Some(text) = sheet.text(group_row, column.col) else {
                continue;
            };
            if !matcher.matches(&text) {
                continue;
            }

            let date = column_date(column, week_start).ok_or_else(|| {
                AgendaError::sheet_structure(
                    workbook.path(),
                    sheet.name(),
                    format!(
                        "no date for column {}: neither the day header nor the sheet name carries one",
                        cell_name(layout.day_row - 1, column.col)
                    ),
                )
            })?;

            let Some((start, end)) = institution.slot_range(date, &column.slot) else {
                warn!(sheet = sheet.name(), %date, slot = %column.slot.code, "slot falls in a clock change, skipped");
                continue;
            };

            if query.display {
                println!(
                    "{:<9} {} {} {}\tGrp {}",
                    date.format("%A").to_string(),
                    date.format("%d/%m/%y"),
                    column.slot.code,
                    text,
                    query.group
                );
            }

            let summary = format!("{} Grp {}", text, query.group);
            events.push(Event::new(summary, start, end, Origin::Extracted)?);
        }
    }

    Ok(events)
}

fn column_date(column: &SlotColumn, week_start: Option<NaiveDate>) -> Option<NaiveDate> {
    column.date.or_else(|| week_start.and_then(|start| column.date_in_week(start)))
}

/// Row of `group` in the group column. `Ok(None)` when the sheet lists no
/// groups at all.
fn find_group_row(
    path: &Path,
    sheet: &ResolvedSheet,
    group_col: u32,
    layout: &GridLayout,
    group: &str,
) -> AgendaResult<Option<u32>> {
    let first = layout.first_group_row - 1;
    let last = match layout.last_group_row {
        Some(row) => row.saturating_sub(1),
        None => sheet.last_row().unwrap_or(0),
    };

    let mut saw_label = false;
    for row in first..=last {
        let Some(label) = sheet.text(row, group_col) else {
            continue;
        };
        saw_label = true;
        if group_label_matches(&label, group) {
            return Ok(Some(row));
        }
    }

    if !saw_label {
        return Ok(None);
    }

    Err(AgendaError::GroupNotFound {
        path: path.to_path_buf(),
        sheet: sheet.name().to_string(),
        group: group.to_string(),
    })
}

/// `Grp 3` and `3` both label group `3`; `G13` does not.
fn group_label_matches(label: &str, group: &str) -> bool {
    let group = group.trim();
    !group.is_empty()
        && (label == group
            || label
                .split(|c: char| !c.is_alphanumeric())
                .any(|word| word == group))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::testutil::{Fixture, FixtureSheet, write_xlsx};
    use crate::sheet::{CellValue, MergedRange, RawSheet};
    use chrono::{FixedOffset, Timelike};

    fn institution() -> Institution {
        Institution::fixed(FixedOffset::east_opt(2 * 3600).unwrap())
    }

    /// Week of 2024-07-22: Monday and Tuesday, slots M1 M2 S1 S2, groups 1-3.
    fn week_sheet(name: &str) -> RawSheet {
        let mut raw = RawSheet::new(name);
        raw.insert(2, 2, CellValue::text("Lundi 22/07/24"));
        raw.merge(MergedRange::parse("C3:F3").unwrap());
        raw.insert(2, 6, CellValue::text("Mardi 23/07/24"));
        raw.merge(MergedRange::parse("G3:J3").unwrap());
        for (i, code) in ["M1", "M2", "S1", "S2", "M1", "M2", "S1", "S2"].iter().enumerate() {
            raw.insert(3, 2 + i as u32, CellValue::text(*code));
        }
        for (row, label) in [(4, "Grp 1"), (5, "Grp 2"), (6, "Grp 3")] {
            raw.insert(row, 1, CellValue::text(label));
        }
        raw
    }

    fn query(course: &str, group: &str) -> GridQuery {
        GridQuery::new(course, group)
    }

    #[test]
    fn test_merged_two_slot_class_yields_two_events() {
        let mut raw = week_sheet("S30");
        raw.insert(6, 2, CellValue::text("ALGO TP1"));
        raw.merge(MergedRange::parse("C7:D7").unwrap());
        let workbook = Workbook::from_sheets("grid.xlsx", vec![raw]);

        let events = extract_grid_from_workbook(
            &workbook,
            &query("ALGO ", "3"),
            &GridLayout::default(),
            &institution(),
        )
        .unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].summary(), "ALGO TP1 Grp 3");
        assert_eq!(events[1].summary(), "ALGO TP1 Grp 3");
        assert_eq!((events[0].dtstart().hour(), events[0].dtstart().minute()), (8, 0));
        assert_eq!((events[0].dtend().hour(), events[0].dtend().minute()), (10, 0));
        assert_eq!((events[1].dtstart().hour(), events[1].dtstart().minute()), (10, 15));
        assert_eq!((events[1].dtend().hour(), events[1].dtend().minute()), (12, 15));
        assert_eq!(events[0].dtstart().date_naive(), events[1].dtstart().date_naive());
        assert_eq!(events[0].dtstart().offset().local_minus_utc(), 7200);
        assert_eq!(events[0].origin(), Origin::Extracted);
    }

    #[test]
    fn test_trailing_space_course_code_disambiguates() {
        let mut raw = week_sheet("S30");
        raw.insert(4, 4, CellValue::text("INFO V - CM LL"));
        raw.insert(4, 8, CellValue::text("INFO VI - CM LL"));
        let workbook = Workbook::from_sheets("grid.xlsx", vec![raw]);

        let events = extract_grid_from_workbook(
            &workbook,
            &query("INFO V ", "1"),
            &GridLayout::default(),
            &institution(),
        )
        .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary(), "INFO V - CM LL Grp 1");
        assert_eq!(events[0].dtstart().date_naive(), NaiveDate::from_ymd_opt(2024, 7, 22).unwrap());
        assert_eq!(events[0].dtstart().hour(), 13);
    }

    #[test]
    fn test_course_type_filter_and_other_groups() {
        let mut raw = week_sheet("S30");
        raw.insert(5, 2, CellValue::text("PHYS TD"));
        raw.insert(5, 3, CellValue::text("PHYS CM"));
        // same course for another group is ignored
        raw.insert(4, 6, CellValue::text("PHYS TD"));
        let workbook = Workbook::from_sheets("grid.xlsx", vec![raw]);

        let mut q = query("PHYS ", "2");
        q.types = vec!["TD".into()];
        let events =
            extract_grid_from_workbook(&workbook, &q, &GridLayout::default(), &institution()).unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary(), "PHYS TD Grp 2");
    }

    #[test]
    fn test_missing_group_is_an_error() {
        let workbook = Workbook::from_sheets("grid.xlsx", vec![week_sheet("S30")]);
        let err = extract_grid_from_workbook(
            &workbook,
            &query("ALGO ", "7"),
            &GridLayout::default(),
            &institution(),
        )
        .unwrap_err();

        match err {
            AgendaError::GroupNotFound { sheet, group, .. } => {
                assert_eq!(sheet, "S30");
                assert_eq!(group, "7");
            }
            other => panic!("Expected GroupNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_sheet_without_groups_contributes_nothing() {
        let mut holidays = RawSheet::new("S31 Vacances");
        holidays.insert(0, 0, CellValue::text("Pas de cours"));
        let mut raw = week_sheet("S30");
        raw.insert(6, 9, CellValue::text("ALGO TD"));
        let workbook = Workbook::from_sheets("grid.xlsx", vec![raw, holidays]);

        let events = extract_grid_from_workbook(
            &workbook,
            &query("ALGO ", "3"),
            &GridLayout::default(),
            &institution(),
        )
        .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].dtstart().hour(), 16);
    }

    #[test]
    fn test_missing_slot_header_is_sheet_structure_error() {
        let mut raw = RawSheet::new("S30");
        raw.insert(4, 1, CellValue::text("Grp 1"));
        raw.insert(4, 2, CellValue::text("ALGO TD"));
        let workbook = Workbook::from_sheets("grid.xlsx", vec![raw]);

        let err = extract_grid_from_workbook(
            &workbook,
            &query("ALGO ", "1"),
            &GridLayout::default(),
            &institution(),
        )
        .unwrap_err();
        assert!(matches!(err, AgendaError::SheetStructure { ref sheet, .. } if sheet == "S30"));
    }

    #[test]
    fn test_date_from_sheet_name_when_header_has_none() {
        let mut raw = RawSheet::new("S36 02-09-24");
        raw.insert(2, 2, CellValue::text("Mercredi"));
        raw.insert(3, 2, CellValue::text("S1"));
        raw.insert(4, 1, CellValue::text("1"));
        raw.insert(4, 2, CellValue::text("ALGO\nTD"));
        let workbook = Workbook::from_sheets("grid.xlsx", vec![raw]);

        let events = extract_grid_from_workbook(
            &workbook,
            &query("ALGO ", "1"),
            &GridLayout::default(),
            &institution(),
        )
        .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary(), "ALGO TD Grp 1");
        assert_eq!(events[0].dtstart().date_naive(), NaiveDate::from_ymd_opt(2024, 9, 4).unwrap());
    }

    #[test]
    fn test_no_date_anywhere_is_sheet_structure_error() {
        let mut raw = RawSheet::new("S36");
        raw.insert(2, 2, CellValue::text("Mercredi"));
        raw.insert(3, 2, CellValue::text("S1"));
        raw.insert(4, 1, CellValue::text("1"));
        raw.insert(4, 2, CellValue::text("ALGO TD"));
        let workbook = Workbook::from_sheets("grid.xlsx", vec![raw]);

        let err = extract_grid_from_workbook(
            &workbook,
            &query("ALGO ", "1"),
            &GridLayout::default(),
            &institution(),
        )
        .unwrap_err();
        assert!(matches!(err, AgendaError::SheetStructure { .. }));
    }

    #[test]
    fn test_group_label_matching() {
        assert!(group_label_matches("Grp 3", "3"));
        assert!(group_label_matches("3", "3"));
        assert!(group_label_matches("TD-A", "A"));
        assert!(!group_label_matches("G13", "3"));
        assert!(!group_label_matches("Grp 3", ""));
    }

    #[test]
    fn test_extract_from_xlsx_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ei1.xlsx");
        write_xlsx(
            &path,
            &[
                FixtureSheet {
                    name: "S30",
                    cells: vec![
                        ("C3", Fixture::Text("Lundi 22/07/24")),
                        ("C4", Fixture::Text("M1")),
                        ("D4", Fixture::Text("M2")),
                        ("B5", Fixture::Text("Grp 1")),
                        ("B6", Fixture::Text("Grp 2")),
                        ("C6", Fixture::Text("FLUID TP")),
                    ],
                    merges: vec!["C3:D3", "C6:D6"],
                },
                FixtureSheet {
                    name: "Legende",
                    cells: vec![("A1", Fixture::Text("TP: travaux pratiques"))],
                    merges: vec![],
                },
            ],
        );

        let layout = GridLayout {
            skip_sheets: vec!["Legende".into()],
            ..GridLayout::default()
        };
        let mut q = query("FLUID", "2");
        q.types = vec!["TP".into()];
        let events = extract_grid_schedule(&path, &q, &layout, &institution()).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[1].dtend().hour(), 12);
    }

    #[test]
    fn test_layout_defaults_from_toml() {
        let layout: GridLayout = toml::from_str("group_column = \"A\"\nlast_group_row = 20").unwrap();
        assert_eq!(layout.group_column, "A");
        assert_eq!(layout.day_row, 3);
        assert_eq!(layout.last_group_row, Some(20));
    }
}
