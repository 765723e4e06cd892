//! Header rows and date cells shared by the timetable extractors.
//!
//! A timetable locates its (day, slot) columns through two header rows: one
//! naming the day (`Lundi`, `Monday 22/07/24`, or a date cell) and one naming
//! the slot (`M1`, `S2`...). Day headers usually span several slot columns as
//! one merged cell; merge resolution has already copied them into each column.

use chrono::{Datelike, NaiveDate, TimeDelta, Weekday};
use tracing::debug;

use super::{CellValue, ResolvedSheet, cell_name, excel_serial_to_datetime};
use crate::slots::{SlotDef, SlotGrid};

/// Accepted date layouts, tried in order. Two-digit years come first so that
/// `22/07/24` is not read as year 24.
const DATE_FORMATS: &[&str] = &[
    "%d/%m/%y", "%d/%m/%Y", "%d-%m-%y", "%d-%m-%Y", "%d.%m.%y", "%d.%m.%Y", "%Y-%m-%d",
];

/// French or English day name, full or abbreviated.
pub fn parse_weekday(word: &str) -> Option<Weekday> {
    let word = word
        .trim()
        .trim_end_matches(['.', ','])
        .to_lowercase();
    let day = match word.as_str() {
        "lundi" | "lun" | "monday" | "mon" => Weekday::Mon,
        "mardi" | "mar" | "tuesday" | "tue" | "tues" => Weekday::Tue,
        "mercredi" | "mer" | "wednesday" | "wed" => Weekday::Wed,
        "jeudi" | "jeu" | "thursday" | "thu" | "thurs" => Weekday::Thu,
        "vendredi" | "ven" | "friday" | "fri" => Weekday::Fri,
        "samedi" | "sam" | "saturday" | "sat" => Weekday::Sat,
        "dimanche" | "dim" | "sunday" | "sun" => Weekday::Sun,
        _ => return None,
    };
    Some(day)
}

/// Parse a date written as text. A trailing time (`2024-09-02 00:00:00`)
/// is ignored.
pub fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let first = text.split_whitespace().next()?;
    let first = first.split('T').next().unwrap_or(first);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(first, fmt).ok())
}

/// Day named by a header cell, plus the date when the header carries one.
pub fn parse_day_header(value: &CellValue) -> Option<(Weekday, Option<NaiveDate>)> {
    match value {
        CellValue::DateTime(dt) => Some((dt.weekday(), Some(dt.date()))),
        CellValue::Text(text) => {
            let mut words = text.split_whitespace();
            let day = parse_weekday(words.next()?)?;
            let date = words.find_map(parse_date_text);
            if let Some(date) = date {
                if date.weekday() != day {
                    debug!(header = %text, "day name and date disagree, using the date");
                    return Some((date.weekday(), Some(date)));
                }
            }
            Some((day, date))
        }
        _ => None,
    }
}

/// What a week-start cell holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateCell {
    Date(NaiveDate),
    /// Text without any digit, e.g. `Vacances`
    NotADate,
    /// Something date-like that could not be read
    Unreadable,
}

pub fn classify_date_cell(value: &CellValue) -> DateCell {
    match value {
        CellValue::DateTime(dt) => DateCell::Date(dt.date()),
        CellValue::Number(serial) => match excel_serial_to_datetime(*serial) {
            Some(dt) => DateCell::Date(dt.date()),
            None => DateCell::Unreadable,
        },
        CellValue::Text(text) => match parse_date_text(text) {
            Some(date) => DateCell::Date(date),
            None if text.chars().any(|c| c.is_ascii_digit()) => DateCell::Unreadable,
            None => DateCell::NotADate,
        },
        CellValue::Bool(_) => DateCell::NotADate,
    }
}

/// Monday of the week a sheet name refers to, e.g. `S36 02-09-24` or
/// `Semaine du 02/09/2024`.
pub fn find_week_start(sheet_name: &str) -> Option<NaiveDate> {
    let date = sheet_name
        .split(|c: char| c.is_whitespace() || c == '_')
        .find_map(parse_date_text)?;
    date.checked_sub_signed(TimeDelta::days(i64::from(date.weekday().num_days_from_monday())))
}

/// One timetable column: a slot on a given day.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotColumn {
    pub col: u32,
    pub day: Weekday,
    /// Date from the day header, when it has one
    pub date: Option<NaiveDate>,
    pub slot: SlotDef,
}

impl SlotColumn {
    /// Date of this column in the week starting on `week_start`, or `None`
    /// past the end of the calendar.
    pub fn date_in_week(&self, week_start: NaiveDate) -> Option<NaiveDate> {
        week_start.checked_add_signed(TimeDelta::days(i64::from(self.day.num_days_from_monday())))
    }
}

/// Columns whose slot header names a known slot and whose day header names a
/// teaching day. Rows are 0-based.
pub fn slot_columns(
    sheet: &ResolvedSheet,
    day_row: u32,
    slot_row: u32,
    grid: &SlotGrid,
) -> Vec<SlotColumn> {
    let mut columns = Vec::new();

    for (col, value) in sheet.row(slot_row) {
        let CellValue::Text(code) = value else {
            continue;
        };
        let Some(slot) = grid.slot(code) else {
            continue;
        };
        let Some((day, date)) = sheet.get(day_row, col).and_then(parse_day_header) else {
            debug!(
                sheet = sheet.name(),
                cell = %cell_name(day_row, col),
                "slot column without a day header"
            );
            continue;
        };
        if !grid.has_day(day) {
            debug!(sheet = sheet.name(), ?day, "skipping non-teaching day");
            continue;
        }

        columns.push(SlotColumn {
            col,
            day,
            date,
            slot: slot.clone(),
        });
    }

    columns
}
