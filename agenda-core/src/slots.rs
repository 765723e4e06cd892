//! Institution time model: the teaching-slot grid and the local clock.
//!
//! Both are plain values handed to the extractors, so several institutions'
//! grids can live side by side.

use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Weekday,
};
use chrono_tz::Tz;

use crate::error::{AgendaError, AgendaResult};

/// One teaching slot, e.g. `M1` 08:00-10:00.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotDef {
    pub code: String,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// Mapping from (day, slot code) to a wall-clock range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotGrid {
    days: Vec<Weekday>,
    slots: Vec<SlotDef>,
}

fn hm(hours: i64, minutes: i64) -> NaiveTime {
    NaiveTime::MIN + TimeDelta::minutes(hours * 60 + minutes)
}

impl SlotGrid {
    /// M1 08:00-10:00, M2 10:15-12:15, S1 13:45-15:45, S2 16:00-18:00,
    /// Monday to Friday.
    pub fn canonical() -> Self {
        let slot = |code: &str, start: NaiveTime, end: NaiveTime| SlotDef {
            code: code.to_string(),
            start,
            end,
        };

        SlotGrid {
            days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            slots: vec![
                slot("M1", hm(8, 0), hm(10, 0)),
                slot("M2", hm(10, 15), hm(12, 15)),
                slot("S1", hm(13, 45), hm(15, 45)),
                slot("S2", hm(16, 0), hm(18, 0)),
            ],
        }
    }

    /// Build a custom grid. Slot codes must be unique and every slot must end
    /// after it starts.
    pub fn new(days: Vec<Weekday>, slots: Vec<SlotDef>) -> AgendaResult<Self> {
        if days.is_empty() || slots.is_empty() {
            return Err(AgendaError::Config(
                "slot grid needs at least one day and one slot".into(),
            ));
        }

        for (i, slot) in slots.iter().enumerate() {
            if slot.start >= slot.end {
                return Err(AgendaError::Config(format!(
                    "slot {} ends before it starts",
                    slot.code
                )));
            }
            if slots[..i]
                .iter()
                .any(|s| s.code.eq_ignore_ascii_case(&slot.code))
            {
                return Err(AgendaError::Config(format!(
                    "slot code {} is defined twice",
                    slot.code
                )));
            }
        }

        Ok(SlotGrid { days, slots })
    }

    pub fn days(&self) -> &[Weekday] {
        &self.days
    }

    pub fn slots(&self) -> &[SlotDef] {
        &self.slots
    }

    pub fn has_day(&self, day: Weekday) -> bool {
        self.days.contains(&day)
    }

    /// Look up a slot by its header code (case-insensitive, surrounding
    /// whitespace ignored).
    pub fn slot(&self, code: &str) -> Option<&SlotDef> {
        let code = code.trim();
        self.slots.iter().find(|s| s.code.eq_ignore_ascii_case(code))
    }
}

impl Default for SlotGrid {
    fn default() -> Self {
        SlotGrid::canonical()
    }
}

/// How an institution's wall-clock times map to instants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocalClock {
    /// One offset for every date
    Fixed(FixedOffset),
    /// IANA zone, resolved to the offset in force on each date
    Zone(Tz),
}

impl LocalClock {
    /// Parse `+01:00` / `-05:30` / `Z` style offsets.
    pub fn parse_offset(value: &str) -> AgendaResult<Self> {
        let value = value.trim();
        let invalid = || AgendaError::Config(format!("invalid UTC offset '{value}'"));

        let seconds = if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
            0
        } else {
            let (sign, rest) = if let Some(rest) = value.strip_prefix('+') {
                (1, rest)
            } else if let Some(rest) = value.strip_prefix('-') {
                (-1, rest)
            } else {
                return Err(invalid());
            };
            let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
            // no second sign
            let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
            if !digits(hours) || !digits(minutes) {
                return Err(invalid());
            }
            let hours: i32 = hours.parse().map_err(|_| invalid())?;
            let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
            if hours >= 24 || minutes >= 60 {
                return Err(invalid());
            }
            sign * (hours * 3600 + minutes * 60)
        };

        FixedOffset::east_opt(seconds)
            .map(LocalClock::Fixed)
            .ok_or_else(invalid)
    }

    pub fn parse_zone(name: &str) -> AgendaResult<Self> {
        name.trim()
            .parse::<Tz>()
            .map(LocalClock::Zone)
            .map_err(|_| AgendaError::Config(format!("unknown time zone '{name}'")))
    }

    /// Attach this clock's offset to a wall-clock time. Returns `None` for
    /// times skipped by a DST transition.
    pub fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            LocalClock::Fixed(offset) => offset.from_local_datetime(&naive).single(),
            LocalClock::Zone(tz) => tz
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.fixed_offset()),
        }
    }
}

/// Everything the extractors need to know about where a timetable comes from.
#[derive(Debug, Clone, PartialEq)]
pub struct Institution {
    pub clock: LocalClock,
    pub grid: SlotGrid,
}

impl Institution {
    pub fn new(clock: LocalClock, grid: SlotGrid) -> Self {
        Institution { clock, grid }
    }

    /// Canonical grid with a single fixed offset.
    pub fn fixed(offset: FixedOffset) -> Self {
        Institution::new(LocalClock::Fixed(offset), SlotGrid::canonical())
    }

    /// Instants at which `slot` starts and ends on `date`.
    pub fn slot_range(
        &self,
        date: NaiveDate,
        slot: &SlotDef,
    ) -> Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
        let start = self.clock.localize(date.and_time(slot.start))?;
        let end = self.clock.localize(date.and_time(slot.end))?;
        Some((start, end))
    }
}

impl Default for Institution {
    fn default() -> Self {
        Institution::new(LocalClock::Zone(chrono_tz::Europe::Paris), SlotGrid::canonical())
    }
}
