use std::path::PathBuf;

use agenda_core::config::{AgendaConfig, expand_path};
use agenda_core::ics::export_calendar;
use agenda_core::sheet::{MatchMode, SemesterLayout, SemesterQuery, extract_semester_schedule};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use super::print_json;
use crate::render::print_events;

pub struct SemesterArgs {
    pub path: PathBuf,
    pub course: String,
    pub date_column: String,
    pub slot_row: u32,
    pub sheet: Option<String>,
    pub types: Vec<String>,
    pub match_mode: MatchMode,
    pub display: bool,
    pub export: Option<PathBuf>,
}

pub fn run(config: &AgendaConfig, args: SemesterArgs, json: bool) -> Result<()> {
    let institution = config.institution.build()?;
    let path = expand_path(&args.path);

    let layout = SemesterLayout {
        date_column: args.date_column,
        slot_row: args.slot_row,
        sheet: args.sheet,
    };
    let query = SemesterQuery {
        course: args.course,
        types: args.types,
        match_mode: args.match_mode,
        display: args.display && !json,
    };

    let events = extract_semester_schedule(&path, &query, &layout, &institution)
        .with_context(|| format!("Could not extract {}", path.display()))?;

    if let Some(export) = &args.export {
        let export = expand_path(export);
        let count = export_calendar(&events, &export)?;
        if !json {
            println!("{}", format!("Exported {} events to {}", count, export.display()).dimmed());
        }
    }

    if json {
        return print_json(&events);
    }
    if !query.display {
        print_events(&events);
    }
    Ok(())
}
