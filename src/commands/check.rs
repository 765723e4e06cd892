use agenda_core::config::AgendaConfig;
use agenda_core::pipeline::{self, RunOptions};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use super::print_json;
use crate::render::{print_conflicts, print_events};

pub fn run(config: &AgendaConfig, display: bool, dry_run: bool, json: bool) -> Result<()> {
    let options = RunOptions {
        // the per-event trace would corrupt JSON output
        display: display && !json,
        dry_run,
    };
    let report = pipeline::run(config, options).context("Could not check schedule")?;

    if json {
        return print_json(&report);
    }

    print_events(report.events.events());
    println!();
    print_conflicts(&report.conflicts);

    if let Some(exported) = &report.exported {
        println!(
            "{}",
            format!(
                "Exported {} {} to {}",
                exported.count,
                if exported.count == 1 { "event" } else { "events" },
                exported.path.display()
            )
            .dimmed()
        );
    }

    Ok(())
}
