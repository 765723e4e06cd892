//! End-to-end run over a configuration: import, extract, normalize, detect
//! conflicts and optionally export.

use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use crate::config::AgendaConfig;
use crate::conflict::{Conflict, find_conflicts};
use crate::error::AgendaResult;
use crate::event::{Event, Origin};
use crate::ics::{export_calendar, import_calendar_with};
use crate::sheet::{extract_grid_schedule, extract_semester_schedule};
use crate::table::EventTable;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Print the extractors' per-event trace
    pub display: bool,
    /// Skip writing the export file
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub events: EventTable,
    pub conflicts: Vec<Conflict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exported: Option<ExportSummary>,
}

/// Read every configured source into one normalized table. Any failing file
/// aborts the run.
pub fn collect_events(config: &AgendaConfig, display: bool) -> AgendaResult<EventTable> {
    let institution = config.institution.build()?;
    let mut sources: Vec<Vec<Event>> = Vec::new();

    for calendar in &config.calendars {
        sources.push(import_calendar_with(&calendar.path(), &calendar.import_options()?)?);
    }
    for grid in &config.grids {
        sources.push(extract_grid_schedule(
            &grid.path(),
            &grid.query(display),
            &grid.layout,
            &institution,
        )?);
    }
    for semester in &config.semesters {
        sources.push(extract_semester_schedule(
            &semester.path(),
            &semester.query(display),
            &semester.layout,
            &institution,
        )?);
    }

    Ok(EventTable::normalize(sources))
}

pub fn run(config: &AgendaConfig, options: RunOptions) -> AgendaResult<Report> {
    let events = collect_events(config, options.display)?;
    let conflicts = find_conflicts(&events);
    info!(events = events.len(), conflicts = conflicts.len(), "checked schedule");

    let exported = match config.export_path() {
        Some(path) if !options.dry_run => {
            let count = if config.export_imported {
                export_calendar(&events, &path)?
            } else {
                export_calendar(events.with_origin(Origin::Extracted), &path)?
            };
            Some(ExportSummary { path, count })
        }
        _ => None,
    };

    Ok(Report {
        events,
        conflicts,
        exported,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ics::import_calendar;
    use crate::sheet::testutil::{Fixture, FixtureSheet, write_xlsx};

    const PERSONAL: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//test//EN\r\n\
BEGIN:VEVENT\r\n\
UID:dentist@test\r\n\
SUMMARY:Dentist\r\n\
DTSTART:20240722T070000Z\r\n\
DTEND:20240722T073000Z\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    fn write_sources(dir: &std::path::Path) {
        std::fs::write(dir.join("personal.ics"), PERSONAL).unwrap();
        write_xlsx(
            &dir.join("ei1.xlsx"),
            &[FixtureSheet {
                name: "S30",
                cells: vec![
                    ("C3", Fixture::Text("Lundi 22/07/24")),
                    ("C4", Fixture::Text("M1")),
                    ("D4", Fixture::Text("M2")),
                    ("B5", Fixture::Text("Grp 3")),
                    ("C5", Fixture::Text("ALGO TP1")),
                ],
                merges: vec!["C3:D3", "C5:D5"],
            }],
        );
    }

    fn config_for(dir: &std::path::Path, export_imported: bool) -> AgendaConfig {
        AgendaConfig::from_toml_str(&format!(
            r#"
export = "{dir}/out.ics"
export_imported = {export_imported}

[institution]
utc_offset = "+02:00"

[[calendars]]
path = "{dir}/personal.ics"

[[grids]]
path = "{dir}/ei1.xlsx"
course = "ALGO "
group = "3"
"#,
            dir = dir.display()
        ))
        .unwrap()
    }

    #[test]
    fn test_run_merges_sources_and_exports_extracted_only() {
        let dir = tempfile::tempdir().unwrap();
        write_sources(dir.path());

        let report = run(&config_for(dir.path(), false), RunOptions::default()).unwrap();

        let summaries: Vec<&str> = report.events.iter().map(|e| e.summary()).collect();
        assert_eq!(summaries, vec!["ALGO TP1 Grp 3", "Dentist", "ALGO TP1 Grp 3"]);

        // dentist 07:00Z-07:30Z sits inside M1 08:00+02:00-10:00+02:00
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.conflicts[0].event1.summary(), "ALGO TP1 Grp 3");
        assert_eq!(report.conflicts[0].event2.summary(), "Dentist");

        let exported = report.exported.unwrap();
        assert_eq!(exported.count, 2);
        let back = import_calendar(&exported.path).unwrap();
        assert!(back.iter().all(|e| e.summary() == "ALGO TP1 Grp 3"));
    }

    #[test]
    fn test_run_can_export_everything_or_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write_sources(dir.path());

        let report = run(&config_for(dir.path(), true), RunOptions::default()).unwrap();
        assert_eq!(report.exported.unwrap().count, 3);

        std::fs::remove_file(dir.path().join("out.ics")).unwrap();
        let dry = RunOptions {
            dry_run: true,
            ..RunOptions::default()
        };
        let report = run(&config_for(dir.path(), true), dry).unwrap();
        assert!(report.exported.is_none());
        assert!(!dir.path().join("out.ics").exists());
    }

    #[test]
    fn test_empty_config_gives_empty_report() {
        let report = run(&AgendaConfig::default(), RunOptions::default()).unwrap();
        assert!(report.events.is_empty());
        assert!(report.conflicts.is_empty());
        assert!(report.exported.is_none());
    }

    #[test]
    fn test_failing_source_aborts_the_run() {
        let dir = tempfile::tempdir().unwrap();
        write_sources(dir.path());
        let mut config = config_for(dir.path(), false);
        config.grids[0].group = "9".into();

        let err = run(&config, RunOptions::default()).unwrap_err();
        assert!(matches!(err, crate::error::AgendaError::GroupNotFound { .. }));
        assert!(!dir.path().join("out.ics").exists());
    }

    #[test]
    fn test_missing_calendar_is_reported_with_its_path() {
        let dir = tempfile::tempdir().unwrap();
        write_sources(dir.path());
        std::fs::remove_file(dir.path().join("personal.ics")).unwrap();

        let err = run(&config_for(dir.path(), false), RunOptions::default()).unwrap_err();
        assert!(err.to_string().contains("personal.ics"), "error was: {err}");
    }
}
