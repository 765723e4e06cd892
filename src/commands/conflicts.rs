use std::path::PathBuf;

use agenda_core::config::expand_path;
use agenda_core::ics::import_calendar;
use agenda_core::{EventTable, find_conflicts};
use anyhow::{Context, Result};

use super::print_json;
use crate::render::print_conflicts;

pub fn run(paths: &[PathBuf], json: bool) -> Result<()> {
    let mut sources = Vec::new();
    for path in paths {
        let path = expand_path(path);
        let events = import_calendar(&path)
            .with_context(|| format!("Could not import {}", path.display()))?;
        sources.push(events);
    }

    let table = EventTable::normalize(sources);
    let conflicts = find_conflicts(&table);

    if json {
        return print_json(&conflicts);
    }
    print_conflicts(&conflicts);
    Ok(())
}
