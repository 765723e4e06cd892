//! Normalized event table: every source's events in one list, by start time.

use serde::Serialize;

use crate::event::{Event, Origin};

/// Events ordered by `dtstart`. Duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EventTable {
    events: Vec<Event>,
}

impl EventTable {
    /// Concatenate event collections and sort them by start instant. Events
    /// starting at the same instant keep their input order.
    pub fn normalize<I, C>(sources: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: IntoIterator<Item = Event>,
    {
        let mut events: Vec<Event> = sources.into_iter().flatten().collect();
        events.sort_by_key(|e| e.dtstart());
        EventTable { events }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events from one origin, in table order.
    pub fn with_origin(&self, origin: Origin) -> impl Iterator<Item = &Event> + '_ {
        self.events.iter().filter(move |e| e.origin() == origin)
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}

impl FromIterator<Event> for EventTable {
    fn from_iter<T: IntoIterator<Item = Event>>(iter: T) -> Self {
        EventTable::normalize([iter.into_iter().collect::<Vec<_>>()])
    }
}

impl<'a> IntoIterator for &'a EventTable {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone, Utc};

    fn at(offset_hours: i32, hour: u32, summary: &str, origin: Origin) -> Event {
        let tz = FixedOffset::east_opt(offset_hours * 3600).unwrap();
        Event::new(
            summary,
            tz.with_ymd_and_hms(2024, 9, 2, hour, 0, 0).unwrap(),
            tz.with_ymd_and_hms(2024, 9, 2, hour + 1, 0, 0).unwrap(),
            origin,
        )
        .unwrap()
    }

    #[test]
    fn test_empty_inputs_give_empty_table() {
        let table = EventTable::normalize(Vec::<Vec<Event>>::new());
        assert!(table.is_empty());

        let table = EventTable::normalize([Vec::new(), Vec::new()]);
        assert_eq!(table.len(), 0);
        assert_eq!(serde_json::to_string(&table).unwrap(), "[]");
    }

    #[test]
    fn test_sorts_by_instant_across_offsets() {
        // 09:00+02:00 is 07:00Z, before 08:00Z
        let imported = vec![at(0, 8, "Dentist", Origin::Imported)];
        let extracted = vec![
            at(2, 11, "PHYS TD", Origin::Extracted),
            at(2, 9, "ALGO TP1", Origin::Extracted),
        ];

        let table = EventTable::normalize([imported, extracted]);
        let order: Vec<&str> = table.iter().map(|e| e.summary()).collect();
        assert_eq!(order, vec!["ALGO TP1", "Dentist", "PHYS TD"]);
    }

    #[test]
    fn test_ties_keep_input_order_and_duplicates() {
        let a = at(2, 8, "A", Origin::Imported);
        let table = EventTable::normalize([
            vec![a.clone(), at(2, 10, "C", Origin::Imported)],
            vec![at(2, 8, "B", Origin::Extracted), a],
        ]);

        let order: Vec<&str> = table.iter().map(|e| e.summary()).collect();
        assert_eq!(order, vec!["A", "B", "A", "C"]);
        assert!(table.events().windows(2).all(|w| w[0].dtstart() <= w[1].dtstart()));
    }

    #[test]
    fn test_with_origin_filters() {
        let table: EventTable = vec![
            at(2, 8, "ALGO", Origin::Extracted),
            at(2, 9, "Dentist", Origin::Imported),
        ]
        .into_iter()
        .collect();

        let extracted: Vec<&str> = table.with_origin(Origin::Extracted).map(|e| e.summary()).collect();
        assert_eq!(extracted, vec!["ALGO"]);
    }

    #[test]
    fn test_serialized_schema() {
        let table = EventTable::normalize([vec![at(0, 8, "ALGO", Origin::Extracted)]]);
        let json = serde_json::to_value(&table).unwrap();
        let first = &json[0];
        assert_eq!(first["summary"], "ALGO");
        assert_eq!(first["origin"], "extracted");
        let dtstart: chrono::DateTime<FixedOffset> =
            serde_json::from_value(first["dtstart"].clone()).unwrap();
        assert_eq!(dtstart, Utc.with_ymd_and_hms(2024, 9, 2, 8, 0, 0).unwrap());
    }
}
