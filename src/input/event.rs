//! Code for reading the event catalog from CSV.
use super::*;
use crate::city::CityMap;
use crate::event::{Event, EventMap};
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use std::path::Path;

const EVENTS_FILE_NAME: &str = "events.csv";

/// Read the event catalog from the specified dataset directory.
///
/// Every event must reference a known city and have a well-ordered date
/// range.
///
/// # Arguments
///
/// * `data_dir` - Folder containing the dataset CSV files
/// * `cities` - The city catalog to validate event references against
///
/// # Returns
///
/// An [`EventMap`] keyed by event name, or an error
pub fn read_events(data_dir: &Path, cities: &CityMap) -> Result<EventMap> {
    let file_path = data_dir.join(EVENTS_FILE_NAME);
    let events: EventMap = read_csv_id_file(&file_path)?;

    for event in events.values() {
        validate_event(event, cities)
            .with_context(|| format!("Error reading {}", file_path.display()))?;
    }

    Ok(events)
}

fn validate_event(event: &Event, cities: &CityMap) -> Result<()> {
    ensure!(
        event.start_date <= event.end_date,
        "Event {} ends before it starts ({} > {})",
        event.name,
        event.start_date,
        event.end_date
    );
    ensure!(
        cities.contains_key(&event.city),
        "Event {} references unknown city '{}'. Known cities: {}",
        event.name,
        event.city,
        cities.keys().join(", ")
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, cities};
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn create_events_file(dir_path: &Path, rows: &str) {
        let file_path = dir_path.join(EVENTS_FILE_NAME);
        let mut file = File::create(file_path).unwrap();
        writeln!(
            file,
            "name,city,event_type,start_date,end_date,expected_attendance,actual_attendance,event_cost_usd
{rows}"
        )
        .unwrap();
    }

    #[rstest]
    fn test_read_events(cities: CityMap) {
        let dir = tempdir().unwrap();
        create_events_file(
            dir.path(),
            "Atlantic Song Festival,Lisbon,music,2024-06-01,2024-06-03,120000,,\n\
             Harbour Marathon,Osaka,sports,2024-10-12,2024-10-12,30000,34000,5000000",
        );

        let events = read_events(dir.path(), &cities).unwrap();
        assert_eq!(events.len(), 2);
        let marathon = events.get("Harbour Marathon").unwrap();
        assert_eq!(marathon.duration_days(), 1);
        assert_eq!(marathon.attendance(), Some(34000));
        assert_eq!(marathon.event_cost_usd, Some(5_000_000.0));
    }

    #[rstest]
    fn test_read_events_unknown_city(cities: CityMap) {
        let dir = tempdir().unwrap();
        create_events_file(
            dir.path(),
            "Lost Festival,Atlantis,music,2024-06-01,2024-06-03,120000,,",
        );

        assert!(read_events(dir.path(), &cities).is_err());
    }

    #[rstest]
    fn test_read_events_bad_dates(cities: CityMap) {
        let dir = tempdir().unwrap();
        create_events_file(
            dir.path(),
            "Backwards Days,Lisbon,culture,2024-06-03,2024-06-01,1000,,",
        );

        let events: EventMap =
            read_csv_id_file(&dir.path().join(EVENTS_FILE_NAME)).unwrap();
        assert_error!(
            validate_event(events.get("Backwards Days").unwrap(), &cities),
            "Event Backwards Days ends before it starts (2024-06-03 > 2024-06-01)"
        );
    }
}
