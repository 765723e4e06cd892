use std::path::Path;

use agenda_core::config::expand_path;
use agenda_core::sheet::search_workbook;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use super::print_json;
use crate::render::Render;

pub fn run(path: &Path, needle: &str, json: bool) -> Result<()> {
    let path = expand_path(path);
    let hits = search_workbook(&path, needle)
        .with_context(|| format!("Could not search {}", path.display()))?;

    if json {
        return print_json(&hits);
    }

    if hits.is_empty() {
        println!("{}", format!("No cell contains '{needle}'").dimmed());
        return Ok(());
    }
    for hit in &hits {
        println!("{}", hit.render());
    }
    Ok(())
}
