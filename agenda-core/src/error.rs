//! Error types for agenda operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while importing, extracting or exporting events.
#[derive(Error, Debug)]
pub enum AgendaError {
    #[error("Malformed event in {}: {reason}", path.display())]
    MalformedEvent { path: PathBuf, reason: String },

    #[error("Unexpected sheet layout in {} [{sheet}]: {reason}", path.display())]
    SheetStructure {
        path: PathBuf,
        sheet: String,
        reason: String,
    },

    #[error("Group '{group}' not found in {} [{sheet}]", path.display())]
    GroupNotFound {
        path: PathBuf,
        sheet: String,
        group: String,
    },

    #[error("Could not parse date '{value}' at {cell} in {} [{sheet}]", path.display())]
    DateParse {
        path: PathBuf,
        sheet: String,
        cell: String,
        value: String,
    },

    #[error("Could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Event '{summary}' must start before it ends ({dtstart} >= {dtend})")]
    InvalidRange {
        summary: String,
        dtstart: String,
        dtend: String,
    },

    #[error("Spreadsheet error in {}: {reason}", path.display())]
    Spreadsheet { path: PathBuf, reason: String },

    #[error("ICS parse error: {0}")]
    IcsParse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AgendaError {
    pub(crate) fn sheet_structure(
        path: impl Into<PathBuf>,
        sheet: &str,
        reason: impl Into<String>,
    ) -> Self {
        AgendaError::SheetStructure {
            path: path.into(),
            sheet: sheet.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for agenda operations.
pub type AgendaResult<T> = Result<T, AgendaError>;
