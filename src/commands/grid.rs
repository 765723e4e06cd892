use std::path::PathBuf;

use agenda_core::config::{AgendaConfig, expand_path};
use agenda_core::ics::export_calendar;
use agenda_core::sheet::{GridLayout, GridQuery, MatchMode, extract_grid_schedule};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use super::print_json;
use crate::render::print_events;

pub struct GridArgs {
    pub path: PathBuf,
    pub course: String,
    pub group: String,
    pub types: Vec<String>,
    pub match_mode: MatchMode,
    pub display: bool,
    pub export: Option<PathBuf>,
}

pub fn run(config: &AgendaConfig, args: GridArgs, json: bool) -> Result<()> {
    let institution = config.institution.build()?;
    let path = expand_path(&args.path);

    // Reuse the layout of a configured grid for the same workbook
    let layout = config
        .grids
        .iter()
        .find(|g| g.path() == path)
        .map(|g| g.layout.clone())
        .unwrap_or_else(GridLayout::default);

    let query = GridQuery {
        course: args.course,
        group: args.group,
        types: args.types,
        match_mode: args.match_mode,
        display: args.display && !json,
    };

    let events = extract_grid_schedule(&path, &query, &layout, &institution)
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
