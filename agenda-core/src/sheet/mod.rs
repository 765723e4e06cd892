//! Spreadsheet access for timetable extraction.
//!
//! Workbooks are read with calamine, fully loaded and closed before any
//! matching happens. Merged ranges are resolved up front: every cell a merge
//! covers reports the value of the merge's top-left anchor. Extractors only
//! ever see the resolved grid.
//!
//! Coordinates are 0-based `(row, col)` internally, as in calamine; public
//! configuration uses 1-based row numbers and column letters.

pub mod grid;
pub mod header;
pub mod matcher;
pub mod semester;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use calamine::{Data, Reader, Xlsx, open_workbook};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::Serialize;
use tracing::debug;

use crate::error::{AgendaError, AgendaResult};

pub use grid::{GridLayout, GridQuery, extract_grid_schedule, extract_grid_from_workbook};
pub use matcher::{CourseMatcher, MatchMode, clean_text};
pub use semester::{
    SemesterLayout, SemesterQuery, extract_semester_schedule, extract_semester_from_workbook,
};

/// A non-empty cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    pub fn date(date: NaiveDate) -> Self {
        CellValue::DateTime(date.and_time(NaiveTime::MIN))
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// Inclusive rectangle of merged cells, 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergedRange {
    pub first_row: u32,
    pub first_col: u32,
    pub last_row: u32,
    pub last_col: u32,
}

impl MergedRange {
    /// Parse an A1 range such as `C5:D5`.
    pub fn parse(range: &str) -> Option<Self> {
        let (from, to) = range.split_once(':')?;
        let (first_row, first_col) = parse_cell_ref(from)?;
        let (last_row, last_col) = parse_cell_ref(to)?;
        Some(MergedRange {
            first_row: first_row.min(last_row),
            first_col: first_col.min(last_col),
            last_row: first_row.max(last_row),
            last_col: first_col.max(last_col),
        })
    }
}

/// A sheet as stored: anchor values only, plus its merged ranges.
#[derive(Debug, Clone, Default)]
pub struct RawSheet {
    name: String,
    cells: BTreeMap<(u32, u32), CellValue>,
    merges: Vec<MergedRange>,
}

impl RawSheet {
    pub fn new(name: impl Into<String>) -> Self {
        RawSheet {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn insert(&mut self, row: u32, col: u32, value: CellValue) {
        self.cells.insert((row, col), value);
    }

    pub fn merge(&mut self, range: MergedRange) {
        self.merges.push(range);
    }

    /// Copy each merge anchor's value into every cell the merge covers.
    pub fn resolve(self) -> ResolvedSheet {
        let mut cells = self.cells;

        for range in &self.merges {
            let anchor = cells.get(&(range.first_row, range.first_col)).cloned();
            for row in range.first_row..=range.last_row {
                for col in range.first_col..=range.last_col {
                    match &anchor {
                        Some(value) => {
                            cells.insert((row, col), value.clone());
                        }
                        None => {
                            cells.remove(&(row, col));
                        }
                    }
                }
            }
        }

        ResolvedSheet {
            name: self.name,
            cells,
        }
    }
}

/// A sheet after merge resolution.
#[derive(Debug, Clone)]
pub struct ResolvedSheet {
    name: String,
    cells: BTreeMap<(u32, u32), CellValue>,
}

impl ResolvedSheet {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, row: u32, col: u32) -> Option<&CellValue> {
        self.cells.get(&(row, col))
    }

    /// Cleaned text of a cell, `None` when the cell is blank.
    pub fn text(&self, row: u32, col: u32) -> Option<String> {
        let text = clean_text(&self.get(row, col)?.to_string());
        (!text.is_empty()).then_some(text)
    }

    /// Non-empty cells of one row, left to right.
    pub fn row(&self, row: u32) -> impl Iterator<Item = (u32, &CellValue)> + '_ {
        self.cells
            .range((row, 0)..=(row, u32::MAX))
            .map(|(&(_, col), value)| (col, value))
    }

    /// Index of the last row holding a value.
    pub fn last_row(&self) -> Option<u32> {
        self.cells.keys().next_back().map(|&(row, _)| row)
    }

    pub fn cells(&self) -> impl Iterator<Item = ((u32, u32), &CellValue)> + '_ {
        self.cells.iter().map(|(&pos, value)| (pos, value))
    }
}

/// All sheets of one workbook, resolved and in workbook order.
#[derive(Debug, Clone)]
pub struct Workbook {
    path: PathBuf,
    sheets: Vec<ResolvedSheet>,
}

impl Workbook {
    /// Read an .xlsx file: cell values and merged ranges of every sheet.
    pub fn open(path: &Path) -> AgendaResult<Self> {
        let spreadsheet_error = |reason: String| AgendaError::Spreadsheet {
            path: path.to_path_buf(),
            reason,
        };

        let mut workbook: Xlsx<_> =
            open_workbook(path).map_err(|e: calamine::XlsxError| spreadsheet_error(e.to_string()))?;

        workbook
            .load_merged_regions()
            .map_err(|e| spreadsheet_error(format!("merged regions: {e}")))?;

        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| spreadsheet_error(format!("sheet '{name}': {e}")))?;

            let merges = workbook
                .worksheet_merge_cells(&name)
                .unwrap_or(Ok(Vec::new()))
                .map_err(|e| spreadsheet_error(format!("merged cells of '{name}': {e}")))?;

            let mut raw = RawSheet::new(&name);
            if let Some((row0, col0)) = range.start() {
                for (row, col, data) in range.used_cells() {
                    if let Some(value) = cell_value(data) {
                        raw.insert(row0 + row as u32, col0 + col as u32, value);
                    }
                }
            }
            for dim in &merges {
                raw.merge(MergedRange {
                    first_row: dim.start.0,
                    first_col: dim.start.1,
                    last_row: dim.end.0,
                    last_col: dim.end.1,
                });
            }

            debug!(sheet = %name, merges = merges.len(), "loaded sheet");
            sheets.push(raw.resolve());
        }

        Ok(Workbook {
            path: path.to_path_buf(),
            sheets,
        })
    }

    /// Build a workbook from sheets already in memory.
    pub fn from_sheets(path: impl Into<PathBuf>, sheets: Vec<RawSheet>) -> Self {
        Workbook {
            path: path.into(),
            sheets: sheets.into_iter().map(RawSheet::resolve).collect(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sheets(&self) -> &[ResolvedSheet] {
        &self.sheets
    }

    pub fn sheet(&self, name: &str) -> Option<&ResolvedSheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

fn cell_value(data: &Data) -> Option<CellValue> {
    match data {
        Data::String(s) if s.trim().is_empty() => None,
        Data::String(s) => Some(CellValue::Text(s.clone())),
        Data::Float(f) => Some(CellValue::Number(*f)),
        Data::Int(i) => Some(CellValue::Number(*i as f64)),
        Data::Bool(b) => Some(CellValue::Bool(*b)),
        Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64()).map(CellValue::DateTime),
        Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .map(|d| d.and_time(NaiveTime::MIN))
            })
            .map(CellValue::DateTime)
            .or_else(|| Some(CellValue::Text(s.clone()))),
        Data::DurationIso(s) => Some(CellValue::Text(s.clone())),
        _ => None,
    }
}

/// Convert an Excel 1900-system serial number to a date-time.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_time(NaiveTime::MIN);
    let days = TimeDelta::try_days(serial.trunc() as i64)?;
    let seconds = TimeDelta::try_seconds((serial.fract() * 86_400.0).round() as i64)?;
    epoch.checked_add_signed(days.checked_add(&seconds)?)
}

/// 0-based column index for letters such as `A` or `AB`.
pub fn column_index(letters: &str) -> Option<u32> {
    let letters = letters.trim();
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    letters
        .chars()
        .try_fold(0u32, |acc, c| {
            let digit = (c.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
            acc.checked_mul(26)?.checked_add(digit)
        })
        .map(|n| n - 1)
}

/// Column letters for a 0-based index.
pub fn column_name(mut col: u32) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (col % 26) as u8) as char);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    letters.iter().rev().collect()
}

/// A1 name of a 0-based cell.
pub fn cell_name(row: u32, col: u32) -> String {
    format!("{}{}", column_name(col), row + 1)
}

/// Parse `B12` into 0-based `(row, col)`.
pub fn parse_cell_ref(cell: &str) -> Option<(u32, u32)> {
    let cell = cell.trim().trim_start_matches('$');
    let split = cell.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = cell.split_at(split);
    let col = column_index(letters.trim_end_matches('$'))?;
    let row: u32 = digits.parse().ok()?;
    Some((row.checked_sub(1)?, col))
}

/// One occurrence of a search string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub sheet: String,
    pub cell: String,
    pub text: String,
}

impl Workbook {
    /// Every text cell containing `needle`, after merge resolution.
    pub fn search(&self, needle: &str) -> Vec<SearchHit> {
        self.sheets
            .iter()
            .flat_map(|sheet| {
                sheet.cells().filter_map(move |((row, col), value)| match value {
                    CellValue::Text(text) if text.contains(needle) => Some(SearchHit {
                        sheet: sheet.name().to_string(),
                        cell: cell_name(row, col),
                        text: clean_text(text),
                    }),
                    _ => None,
                })
            })
            .collect()
    }
}

/// Open a workbook and list every cell whose text contains `needle`.
pub fn search_workbook(path: &Path, needle: &str) -> AgendaResult<Vec<SearchHit>> {
    let hits = Workbook::open(path)?.search(needle);
    debug!(path = %path.display(), needle, hits = hits.len(), "searched workbook");
    Ok(hits)
}


#[cfg(test)]
mod tests {
    use super::testutil::{Fixture, FixtureSheet, write_xlsx};
    use super::*;

    #[test]
    fn test_column_letters_roundtrip() {
        assert_eq!(column_index("A"), Some(0));
        assert_eq!(column_index("b"), Some(1));
        assert_eq!(column_index("Z"), Some(25));
        assert_eq!(column_index("AA"), Some(26));
        assert_eq!(column_index("AZ"), Some(51));
        assert_eq!(column_index(""), None);
        assert_eq!(column_index("A1"), None);

        for col in [0, 1, 25, 26, 51, 52, 701, 702] {
            assert_eq!(column_index(&column_name(col)), Some(col));
        }
        assert_eq!(cell_name(4, 2), "C5");
    }

    #[test]
    fn test_parse_cell_ref() {
        assert_eq!(parse_cell_ref("C5"), Some((4, 2)));
        assert_eq!(parse_cell_ref("$AA$10"), Some((9, 26)));
        assert_eq!(parse_cell_ref("C0"), None);
        assert_eq!(parse_cell_ref("12"), None);
        assert_eq!(
            MergedRange::parse("D5:C4"),
            Some(MergedRange { first_row: 3, first_col: 2, last_row: 4, last_col: 3 })
        );
    }

    #[test]
    fn test_resolve_copies_anchor_into_merged_cells() {
        let mut raw = RawSheet::new("S36");
        raw.insert(4, 2, CellValue::text("ALGO TP1"));
        // stale value under the merge is overwritten
        raw.insert(4, 3, CellValue::text("ignored"));
        raw.merge(MergedRange::parse("C5:D5").unwrap());
        // merge whose anchor is blank clears the covered cells
        raw.insert(6, 5, CellValue::text("ghost"));
        raw.merge(MergedRange::parse("E7:F7").unwrap());

        let sheet = raw.resolve();
        assert_eq!(sheet.text(4, 2).as_deref(), Some("ALGO TP1"));
        assert_eq!(sheet.text(4, 3).as_deref(), Some("ALGO TP1"));
        assert_eq!(sheet.get(6, 5), None);
        assert_eq!(sheet.row(4).count(), 2);
        assert_eq!(sheet.last_row(), Some(4));
    }

    #[test]
    fn test_excel_serial_dates() {
        let dt = excel_serial_to_datetime(45495.0).unwrap();
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2024, 7, 22).unwrap());

        let noon = excel_serial_to_datetime(45495.5).unwrap();
        assert_eq!(noon.format("%H:%M").to_string(), "12:00");
        assert_eq!(excel_serial_to_datetime(-1.0), None);
        assert_eq!(excel_serial_to_datetime(1e15), None);
        assert_eq!(excel_serial_to_datetime(f64::MAX), None);
    }

    #[test]
    fn test_open_reads_values_and_merges_from_xlsx() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.xlsx");
        write_xlsx(
            &path,
            &[FixtureSheet {
                name: "Planning",
                cells: vec![
                    ("A1", Fixture::Text("Lundi")),
                    ("A3", Fixture::Number(45495.0)),
                    ("C3", Fixture::Text("ALGO\nTP1")),
                ],
                merges: vec!["A1:D1", "C3:D3"],
            }],
        );

        let workbook = Workbook::open(&path).unwrap();
        assert_eq!(workbook.sheets().len(), 1);

        let sheet = workbook.sheet("Planning").unwrap();
        assert_eq!(sheet.text(0, 3).as_deref(), Some("Lundi"));
        assert_eq!(sheet.text(2, 3).as_deref(), Some("ALGO TP1"));
        assert_eq!(sheet.get(2, 0), Some(&CellValue::Number(45495.0)));
    }

    #[test]
    fn test_search_workbook_opens_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.xlsx");
        write_xlsx(
            &path,
            &[FixtureSheet {
                name: "S36",
                cells: vec![("B2", Fixture::Text("INFO V - CM LL")), ("B3", Fixture::Number(3.0))],
                merges: vec![],
            }],
        );

        let hits = search_workbook(&path, "INFO").unwrap();
        assert_eq!(
            hits,
            vec![SearchHit {
                sheet: "S36".into(),
                cell: "B2".into(),
                text: "INFO V - CM LL".into(),
            }]
        );
    }

    #[test]
    fn test_open_missing_file_is_spreadsheet_error() {
        let err = Workbook::open(Path::new("/nonexistent/book.xlsx")).unwrap_err();
        assert!(matches!(err, AgendaError::Spreadsheet { .. }));
    }

    #[test]
    fn test_search_reports_resolved_cells() {
        let mut raw = RawSheet::new("S36");
        raw.insert(4, 2, CellValue::text("ALGO TP1"));
        raw.insert(5, 2, CellValue::text("PHYS TD"));
        raw.merge(MergedRange::parse("C5:D5").unwrap());
        let workbook = Workbook::from_sheets("book.xlsx", vec![raw]);

        let hits = workbook.search("ALGO");
        let cells: Vec<&str> = hits.iter().map(|h| h.cell.as_str()).collect();
        assert_eq!(cells, vec!["C5", "D5"]);
        assert!(hits.iter().all(|h| h.sheet == "S36" && h.text == "ALGO TP1"));
    }
}
