mod commands;
mod render;

use std::path::PathBuf;

use agenda_core::config::AgendaConfig;
use agenda_core::sheet::MatchMode;
use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "agenda")]
#[command(about = "Merge course timetables with your calendar and spot conflicts")]
struct Cli {
    /// Config file (default: ~/.config/agenda/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Show debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read every configured source, report conflicts and export new events
    Check {
        /// Print one line per extracted event
        #[arg(long)]
        display: bool,

        /// Do not write the export file
        #[arg(long)]
        dry_run: bool,
    },
    /// Read an .ics file
    Import {
        path: PathBuf,

        /// Drop events before this point ("now", YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        since: Option<String>,
    },
    /// Extract one group's course from a weekly grid workbook
    Grid {
        path: PathBuf,

        /// Course code; end it with a space to exclude longer codes ("ALGO ")
        #[arg(long)]
        course: String,

        #[arg(short, long)]
        group: String,

        /// Accepted course type, repeatable (TD, TP, CM)
        #[arg(short = 't', long = "type")]
        types: Vec<String>,

        /// prefix or exact-token
        #[arg(long, default_value = "prefix")]
        match_mode: MatchMode,

        /// Print one line per extracted event
        #[arg(long)]
        display: bool,

        /// Write the extracted events to this .ics file
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Extract a course from a single-sheet semester workbook
    Semester {
        path: PathBuf,

        #[arg(long)]
        course: String,

        /// Column holding each week's start date
        #[arg(long, default_value = "A")]
        date_column: String,

        /// Row holding the slot codes (the day names sit just above)
        #[arg(long, default_value_t = 2)]
        slot_row: u32,

        /// Sheet to read (default: the first one)
        #[arg(long)]
        sheet: Option<String>,

        #[arg(short = 't', long = "type")]
        types: Vec<String>,

        #[arg(long, default_value = "prefix")]
        match_mode: MatchMode,

        #[arg(long)]
        display: bool,

        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// List every cell of a workbook containing some text
    Search { path: PathBuf, needle: String },
    /// Report overlapping events across .ics files
    Conflicts {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let json = cli.json;
    let config_path = cli.config;
    let load_config = || AgendaConfig::load(config_path.as_deref());

    match cli.command {
        Commands::Check { display, dry_run } => {
            commands::check::run(&load_config()?, display, dry_run, json)
        }
        Commands::Import { path, since } => commands::import::run(path, since, json),
        Commands::Grid {
            path,
            course,
            group,
            types,
            match_mode,
            display,
            export,
        } => {
            let args = commands::grid::GridArgs {
                path,
                course,
                group,
                types,
                match_mode,
                display,
                export,
            };
            commands::grid::run(&load_config()?, args, json)
        }
        Commands::Semester {
            path,
            course,
            date_column,
            slot_row,
            sheet,
            types,
            match_mode,
            display,
            export,
        } => {
            let args = commands::semester::SemesterArgs {
                path,
                course,
                date_column,
                slot_row,
                sheet,
                types,
                match_mode,
                display,
                export,
            };
            commands::semester::run(&load_config()?, args, json)
        }
        Commands::Search { path, needle } => commands::search::run(&path, &needle, json),
        Commands::Conflicts { paths } => commands::conflicts::run(&paths, json),
    }
}

/// Logs go to stderr so `--json` output stays clean. RUST_LOG overrides.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
