//! Terminal rendering for agenda-core types.
//!
//! Extension traits that add colored output using owo_colors.

use agenda_core::sheet::SearchHit;
use agenda_core::{Conflict, Event, Origin};
use chrono::NaiveDate;
use owo_colors::OwoColorize;

/// Extension trait for colored terminal rendering.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for Origin {
    fn render(&self) -> String {
        match self {
            Origin::Imported => "[ics]".dimmed().to_string(),
            Origin::Extracted => "[sheet]".cyan().to_string(),
        }
    }
}

impl Render for Event {
    fn render(&self) -> String {
        format!("{} {} {}", format_time(self), self.summary(), self.origin().render())
    }
}

impl Render for Conflict {
    fn render(&self) -> String {
        format!(
            "{} {} {}\n  {} {} {}",
            "!".red(),
            self.event1.summary().bold(),
            format_range(&self.event1).dimmed(),
            "overlaps".dimmed(),
            self.event2.summary().bold(),
            format_range(&self.event2).dimmed(),
        )
    }
}

impl Render for SearchHit {
    fn render(&self) -> String {
        format!("{:>12} {:>6}  {}", self.sheet.dimmed(), self.cell.bold(), self.text)
    }
}

/// Print events grouped by day (e.g. "Mon Jul 22 2024").
pub fn print_events(events: &[Event]) {
    if events.is_empty() {
        println!("{}", "No events found".dimmed());
        return;
    }

    let mut current_date: Option<NaiveDate> = None;
    for event in events {
        let date = event.dtstart().date_naive();
        if current_date != Some(date) {
            if current_date.is_some() {
                println!();
            }
            println!("{}", date.format("%a %b %-d %Y").to_string().bold());
            current_date = Some(date);
        }
        println!("  {}", event.render());
    }
}

pub fn print_conflicts(conflicts: &[Conflict]) {
    if conflicts.is_empty() {
        println!("{}", "No conflicts".green());
        return;
    }

    let label = if conflicts.len() == 1 { "conflict" } else { "conflicts" };
    println!("{}", format!("{} {}", conflicts.len(), label).red().bold());
    for conflict in conflicts {
        println!("{}", conflict.render());
    }
}

/// Start-end clock times (e.g. "08:00-10:00" or "all-day")
fn format_time(event: &Event) -> String {
    if event.is_all_day() {
        format!("{:>11}", "all-day")
    } else {
        format!(
            "{}-{}",
            event.dtstart().format("%H:%M"),
            event.dtend().format("%H:%M")
        )
    }
}

fn format_range(event: &Event) -> String {
    if event.is_all_day() {
        format!(
            "({} to {}, all-day)",
            event.dtstart().format("%Y-%m-%d"),
            event.dtend().format("%Y-%m-%d")
        )
    } else {
        format!(
            "({} to {})",
            event.dtstart().format("%Y-%m-%d %H:%M%:z"),
            event.dtend().format("%Y-%m-%d %H:%M%:z")
        )
    }
}
