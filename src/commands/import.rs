use std::path::PathBuf;

use agenda_core::config::CalendarSource;
use agenda_core::ics::import_calendar_with;
use anyhow::{Context, Result};

use super::print_json;
use crate::render::print_events;

pub fn run(path: PathBuf, since: Option<String>, json: bool) -> Result<()> {
    let source = CalendarSource { path, since };
    let options = source.import_options()?;
    let path = source.path();

    let events = import_calendar_with(&path, &options)
        .with_context(|| format!("Could not import {}", path.display()))?;

    if json {
        return print_json(&events);
    }
    print_events(&events);
    Ok(())
}
