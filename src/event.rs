//! Events are the unit of analysis: a named occasion in one city over an
//! inclusive date range.
use crate::city::CityID;
use crate::id::{define_id_getter, define_id_type};
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

define_id_type! {EventID}

/// A map of [`Event`]s, keyed by event name
pub type EventMap = IndexMap<EventID, Event>;

/// The category of an event
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EventType {
    /// Sporting events (tournaments, marathons, etc.)
    Sports,
    /// Concerts and music festivals
    Music,
    /// Cultural events (exhibitions, biennales, etc.)
    Culture,
    /// Business events and summits
    Business,
    /// Trade fairs
    Fair,
    /// General festivals
    Festival,
    /// Conferences and congresses
    Conference,
    /// Anything else
    Other,
}

/// A major urban event
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Event {
    /// Unique event name (e.g. "Web Summit 2024")
    pub name: EventID,
    /// Name of the host city. Must match an entry in the city catalog.
    pub city: CityID,
    /// The category of the event
    pub event_type: EventType,
    /// First day of the event
    pub start_date: NaiveDate,
    /// Last day of the event (inclusive)
    pub end_date: NaiveDate,
    /// Attendance forecast made before the event
    pub expected_attendance: Option<u64>,
    /// Attendance observed after the event
    pub actual_attendance: Option<u64>,
    /// Cost of staging the event, where known
    pub event_cost_usd: Option<f64>,
}
define_id_getter! {Event, EventID, name}

impl Event {
    /// Event duration in days, counting both the first and last day
    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    /// The best available attendance figure (actual preferred over expected)
    pub fn attendance(&self) -> Option<u64> {
        self.actual_attendance.or(self.expected_attendance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn event(start: &str, end: &str) -> Event {
        Event {
            name: "event1".into(),
            city: "Lisbon".into(),
            event_type: EventType::Music,
            start_date: start.parse().unwrap(),
            end_date: end.parse().unwrap(),
            expected_attendance: Some(10000),
            actual_attendance: None,
            event_cost_usd: None,
        }
    }

    #[test]
    fn test_duration_days_inclusive() {
        assert_eq!(event("2024-06-01", "2024-06-01").duration_days(), 1);
        assert_eq!(event("2024-06-01", "2024-06-14").duration_days(), 14);
    }

    #[test]
    fn test_attendance_prefers_actual() {
        let mut event = event("2024-06-01", "2024-06-03");
        assert_eq!(event.attendance(), Some(10000));
        event.actual_attendance = Some(12000);
        assert_eq!(event.attendance(), Some(12000));
    }

    #[test]
    fn test_event_type_from_str() {
        assert_eq!(EventType::from_str("sports").unwrap(), EventType::Sports);
        assert!(EventType::from_str("circus").is_err());
    }
}
