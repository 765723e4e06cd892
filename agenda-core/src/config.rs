//! Configuration at ~/.config/agenda/config.toml
//!
//! Describes the institution (clock and slot grid) and the sources to merge:
//!
//! ```toml
//! export = "~/calendar/courses.ics"
//!
//! [institution]
//! timezone = "Europe/Paris"
//!
//! [[calendars]]
//! path = "~/calendar/personal.ics"
//! since = "now"
//!
//! [[grids]]
//! path = "~/Downloads/EI1.xlsx"
//! course = "ALGO "
//! group = "3"
//! types = ["TD", "TP"]
//!
//! [[semesters]]
//! path = "~/Downloads/EI2.xlsx"
//! course = "INFO V "
//! date_column = "A"
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use config::{Config, File};
use serde::Deserialize;

use crate::error::{AgendaError, AgendaResult};
use crate::event::start_of_day;
use crate::ics::ImportOptions;
use crate::sheet::header::parse_weekday;
use crate::sheet::{GridLayout, GridQuery, MatchMode, SemesterLayout, SemesterQuery};
use crate::slots::{Institution, LocalClock, SlotDef, SlotGrid};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AgendaConfig {
    pub institution: InstitutionConfig,
    pub calendars: Vec<CalendarSource>,
    pub grids: Vec<GridSource>,
    pub semesters: Vec<SemesterSource>,
    /// Where extracted events are written as .ics
    pub export: Option<PathBuf>,
    /// Also write imported events to the export file
    pub export_imported: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InstitutionConfig {
    /// IANA zone name, e.g. `Europe/Paris`
    pub timezone: Option<String>,
    /// Fixed offset such as `+01:00`, used for every date
    pub utc_offset: Option<String>,
    /// Replaces the canonical M1/M2/S1/S2 grid when non-empty
    pub slots: Vec<SlotConfig>,
    /// Teaching days, Monday to Friday when empty
    pub days: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotConfig {
    pub code: String,
    /// `HH:MM`
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarSource {
    pub path: PathBuf,
    /// `now`, a date (`2024-09-01`) or an RFC 3339 instant
    pub since: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GridSource {
    pub path: PathBuf,
    pub course: String,
    pub group: String,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub match_mode: MatchMode,
    #[serde(default)]
    pub layout: GridLayout,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SemesterSource {
    pub path: PathBuf,
    pub course: String,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub match_mode: MatchMode,
    #[serde(flatten)]
    pub layout: SemesterLayout,
}

impl AgendaConfig {
    pub fn config_path() -> AgendaResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| AgendaError::Config("Could not determine config directory".into()))?
            .join("agenda");

        Ok(config_dir.join("config.toml"))
    }

    /// Load `path`, or the default location when `None`. A missing default
    /// file gives an empty configuration; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> AgendaResult<Self> {
        let (config_path, required) = match path {
            Some(path) => (expand_path(path), true),
            None => (Self::config_path()?, false),
        };

        Config::builder()
            .add_source(File::from(config_path).required(required))
            .build()
            .map_err(|e| AgendaError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| AgendaError::Config(e.to_string()))
    }

    pub fn from_toml_str(content: &str) -> AgendaResult<Self> {
        toml::from_str(content).map_err(|e| AgendaError::Config(e.to_string()))
    }

    pub fn export_path(&self) -> Option<PathBuf> {
        self.export.as_deref().map(expand_path)
    }
}

impl InstitutionConfig {
    pub fn build(&self) -> AgendaResult<Institution> {
        let clock = match (&self.timezone, &self.utc_offset) {
            (Some(_), Some(_)) => {
                return Err(AgendaError::Config(
                    "set either institution.timezone or institution.utc_offset, not both".into(),
                ));
            }
            (Some(zone), None) => LocalClock::parse_zone(zone)?,
            (None, Some(offset)) => LocalClock::parse_offset(offset)?,
            (None, None) => Institution::default().clock,
        };

        if self.slots.is_empty() && self.days.is_empty() {
            return Ok(Institution::new(clock, SlotGrid::canonical()));
        }

        let canonical = SlotGrid::canonical();
        let days = if self.days.is_empty() {
            canonical.days().to_vec()
        } else {
            self.days
                .iter()
                .map(|d| {
                    parse_weekday(d)
                        .ok_or_else(|| AgendaError::Config(format!("unknown weekday '{d}'")))
                })
                .collect::<AgendaResult<Vec<_>>>()?
        };
        let slots = if self.slots.is_empty() {
            canonical.slots().to_vec()
        } else {
            self.slots
                .iter()
                .map(SlotConfig::to_slot)
                .collect::<AgendaResult<Vec<_>>>()?
        };

        Ok(Institution::new(clock, SlotGrid::new(days, slots)?))
    }
}

impl SlotConfig {
    fn to_slot(&self) -> AgendaResult<SlotDef> {
        let time = |value: &str| {
            NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| {
                AgendaError::Config(format!("slot {}: invalid time '{value}'", self.code))
            })
        };
        Ok(SlotDef {
            code: self.code.trim().to_string(),
            start: time(&self.start)?,
            end: time(&self.end)?,
        })
    }
}

impl CalendarSource {
    pub fn path(&self) -> PathBuf {
        expand_path(&self.path)
    }

    pub fn import_options(&self) -> AgendaResult<ImportOptions> {
        let since = self.since.as_deref().map(parse_since).transpose()?;
        Ok(ImportOptions { since })
    }
}

impl GridSource {
    pub fn path(&self) -> PathBuf {
        expand_path(&self.path)
    }

    pub fn query(&self, display: bool) -> GridQuery {
        GridQuery {
            course: self.course.clone(),
            group: self.group.clone(),
            types: self.types.clone(),
            match_mode: self.match_mode,
            display,
        }
    }
}

impl SemesterSource {
    pub fn path(&self) -> PathBuf {
        expand_path(&self.path)
    }

    pub fn query(&self, display: bool) -> SemesterQuery {
        SemesterQuery {
            course: self.course.clone(),
            types: self.types.clone(),
            match_mode: self.match_mode,
            display,
        }
    }
}

fn parse_since(value: &str) -> AgendaResult<DateTime<Utc>> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("now") {
        return Ok(Utc::now());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(start_of_day(date).to_utc());
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.to_utc())
        .map_err(|_| AgendaError::Config(format!("invalid 'since' value '{value}'")))
}

/// Expand a leading `~` to the home directory.
pub fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}
