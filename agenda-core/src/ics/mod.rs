//! ICS import and export.
//!
//! This module handles reading and writing .ics files according to RFC 5545.

mod generate;
mod parse;

pub use generate::{export_calendar, generate_calendar};
pub use parse::{ImportOptions, import_calendar, import_calendar_with, parse_calendar};

use chrono::FixedOffset;

/// TZID naming a fixed UTC offset, e.g. `UTC+0200`.
pub(crate) fn offset_tzid(offset: FixedOffset) -> String {
    let seconds = offset.local_minus_utc();
    let sign = if seconds < 0 { '-' } else { '+' };
    let minutes = seconds.unsigned_abs() / 60;
    format!("UTC{sign}{:02}{:02}", minutes / 60, minutes % 60)
}

/// Inverse of [`offset_tzid`].
pub(crate) fn parse_offset_tzid(tzid: &str) -> Option<FixedOffset> {
    let rest = tzid.strip_prefix("UTC")?;
    let (sign, digits) = match rest.split_at_checked(1)? {
        ("+", digits) => (1, digits),
        ("-", digits) => (-1, digits),
        _ => return None,
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_tzid_names() {
        let paris = FixedOffset::east_opt(2 * 3600).unwrap();
        let newfoundland = FixedOffset::west_opt(3 * 3600 + 30 * 60).unwrap();

        assert_eq!(offset_tzid(paris), "UTC+0200");
        assert_eq!(offset_tzid(newfoundland), "UTC-0330");
        assert_eq!(parse_offset_tzid("UTC+0200"), Some(paris));
        assert_eq!(parse_offset_tzid("UTC-0330"), Some(newfoundland));
        assert_eq!(parse_offset_tzid("UTC+02:00"), None);
        assert_eq!(parse_offset_tzid("UTC+0275"), None);
        assert_eq!(parse_offset_tzid("Europe/Paris"), None);
    }
}
