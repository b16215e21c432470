//! Code for reading historical event-impact records from CSV.
//!
//! These rows are the training labels. Rows referencing unknown cities are
//! skipped with a recorded reason; an absent file yields an empty map (the
//! dataset can still serve the deterministic analyzer).
use super::*;
use crate::city::CityMap;
use crate::event::EventMap;
use crate::impact::{EventImpact, ImpactMap};
use anyhow::Result;
use log::warn;
use std::path::Path;

const IMPACTS_FILE_NAME: &str = "event_impacts.csv";

/// Read historical impact records from the specified dataset directory.
///
/// Missing attendance, duration and event type are backfilled from the event
/// catalog where the event is known; `roi_ratio` is rederived from the total
/// impact and cost so the invariant holds regardless of what the file says.
///
/// # Arguments
///
/// * `data_dir` - Folder containing the dataset CSV files
/// * `events` - The event catalog, for backfilling missing fields
/// * `cities` - The city catalog used to validate row references
///
/// # Returns
///
/// An [`ImpactMap`] keyed by event name and an [`ImportReport`]
pub fn read_impacts(
    data_dir: &Path,
    events: &EventMap,
    cities: &CityMap,
) -> Result<(ImpactMap, Option<ImportReport>)> {
    let file_path = data_dir.join(IMPACTS_FILE_NAME);
    if !file_path.is_file() {
        warn!("No {IMPACTS_FILE_NAME} file provided; training and historical lookups need it");
        return Ok((ImpactMap::new(), None));
    }

    let mut report = ImportReport::new(file_path.clone());
    let mut impacts = ImpactMap::new();
    for (row, mut impact) in read_csv::<EventImpact>(&file_path)?.into_iter().enumerate() {
        if !cities.contains_key(&impact.city) {
            report.record(
                row + 1,
                RowOutcome::Skipped(format!("unknown city '{}'", impact.city)),
            );
            continue;
        }

        backfill_from_catalog(&mut impact, events);
        impact.derive_roi();

        let outcome = if impacts.insert(impact.event.clone(), impact).is_some() {
            RowOutcome::Replaced
        } else {
            RowOutcome::Loaded
        };
        report.record(row + 1, outcome);
    }
    report.log_summary();

    Ok((impacts, Some(report)))
}

/// Fill attendance, duration, type and cost from the event catalog when the
/// impact row leaves them blank
fn backfill_from_catalog(impact: &mut EventImpact, events: &EventMap) {
    let Some(event) = events.get(&impact.event) else {
        return;
    };

    if impact.event_type.is_none() {
        impact.event_type = Some(event.event_type);
    }
    if impact.duration_days.is_none() {
        impact.duration_days = Some(event.duration_days() as f64);
    }
    if impact.attendance.is_none() {
        impact.attendance = event.attendance().map(|a| a as f64);
    }
    if impact.event_cost_usd.is_none() {
        impact.event_cost_usd = event.event_cost_usd;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{cities, events};
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn create_impacts_file(dir_path: &Path, rows: &str) {
        let file_path = dir_path.join(IMPACTS_FILE_NAME);
        let mut file = File::create(file_path).unwrap();
        writeln!(
            file,
            "event,city,event_type,attendance,duration_days,baseline_daily_visitors,\
             event_daily_visitors,visitor_increase_pct,additional_visitors,\
             baseline_occupancy_pct,event_occupancy_pct,occupancy_boost_pts,\
             baseline_hotel_price_usd,event_hotel_price_usd,hotel_price_increase_pct,\
             total_economic_impact_usd,direct_spending_usd,indirect_spending_usd,\
             induced_spending_usd,jobs_created,tax_revenue_usd,\
             airport_arrivals_increase_pct,public_transport_increase_pct,\
             traffic_congestion_increase_pct,event_cost_usd,roi_ratio
{rows}"
        )
        .unwrap();
    }

    #[rstest]
    fn test_read_impacts_backfills_and_derives_roi(cities: CityMap, events: EventMap) {
        let dir = tempdir().unwrap();
        create_impacts_file(
            dir.path(),
            "Atlantic Song Festival,Lisbon,,,,,,50,,,,,,,,80000000,,,,,,,,,20000000,",
        );

        let (impacts, report) = read_impacts(dir.path(), &events, &cities).unwrap();
        assert_eq!(report.unwrap().loaded, 1);

        let impact = impacts.get("Atlantic Song Festival").unwrap();
        // Backfilled from the event catalog
        assert_eq!(impact.event_type, Some(crate::event::EventType::Music));
        assert_eq!(impact.duration_days, Some(3.0));
        // Rederived, ignoring the blank column
        assert_eq!(impact.roi_ratio, Some(4.0));
    }

    #[rstest]
    fn test_read_impacts_missing_file(cities: CityMap, events: EventMap) {
        let dir = tempdir().unwrap();
        let (impacts, report) = read_impacts(dir.path(), &events, &cities).unwrap();
        assert!(impacts.is_empty());
        assert!(report.is_none());
    }

    #[rstest]
    fn test_read_impacts_skips_unknown_city(cities: CityMap, events: EventMap) {
        let dir = tempdir().unwrap();
        create_impacts_file(
            dir.path(),
            "Ghost Gala,Atlantis,,,,,,,,,,,,,,1000000,,,,,,,,,,",
        );

        let (impacts, report) = read_impacts(dir.path(), &events, &cities).unwrap();
        assert!(impacts.is_empty());
        assert_eq!(report.unwrap().skipped.len(), 1);
    }
}
