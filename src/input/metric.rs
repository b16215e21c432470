//! Code for reading the four metric-domain time-series from CSV.
//!
//! The metric files are optional: a dataset without, say, mobility data
//! simply yields fewer derived features downstream. Within a file, rows
//! referencing unknown cities are skipped with a recorded reason, and a
//! second row for the same (city, date) replaces the first.
use super::*;
use crate::city::CityMap;
use crate::metric::{EconomicMetric, HotelMetric, MetricStore, MobilityMetric, TourismMetric};
use anyhow::Result;
use log::warn;
use std::path::Path;

const TOURISM_FILE_NAME: &str = "tourism_metrics.csv";
const HOTEL_FILE_NAME: &str = "hotel_metrics.csv";
const ECONOMIC_FILE_NAME: &str = "economic_metrics.csv";
const MOBILITY_FILE_NAME: &str = "mobility_metrics.csv";

/// Read all available metric files from the specified dataset directory.
///
/// # Arguments
///
/// * `data_dir` - Folder containing the dataset CSV files
/// * `cities` - The city catalog used to validate row references
///
/// # Returns
///
/// A populated [`MetricStore`] and one [`ImportReport`] per file read
pub fn read_metrics(
    data_dir: &Path,
    cities: &CityMap,
) -> Result<(MetricStore, Vec<ImportReport>)> {
    let mut store = MetricStore::new();
    let mut reports = Vec::new();

    macro_rules! read_domain {
        ($file_name:expr, $record:ty, $insert:ident) => {
            let file_path = data_dir.join($file_name);
            if file_path.is_file() {
                let mut report = ImportReport::new(file_path.clone());
                for (row, record) in read_csv::<$record>(&file_path)?.into_iter().enumerate() {
                    let outcome = if cities.contains_key(&record.city) {
                        if store.$insert(record) {
                            RowOutcome::Replaced
                        } else {
                            RowOutcome::Loaded
                        }
                    } else {
                        RowOutcome::Skipped(format!("unknown city '{}'", record.city))
                    };
                    report.record(row + 1, outcome);
                }
                report.log_summary();
                reports.push(report);
            } else {
                warn!(
                    "No {} file provided; {} metrics will be unavailable",
                    $file_name,
                    $file_name.strip_suffix("_metrics.csv").unwrap_or($file_name)
                );
            }
        };
    }

    read_domain!(TOURISM_FILE_NAME, TourismMetric, insert_tourism);
    read_domain!(HOTEL_FILE_NAME, HotelMetric, insert_hotel);
    read_domain!(ECONOMIC_FILE_NAME, EconomicMetric, insert_economic);
    read_domain!(MOBILITY_FILE_NAME, MobilityMetric, insert_mobility);

    Ok((store, reports))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::cities;
    use crate::metric::DateWindow;
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn create_tourism_file(dir_path: &Path, rows: &str) {
        let file_path = dir_path.join(TOURISM_FILE_NAME);
        let mut file = File::create(file_path).unwrap();
        writeln!(
            file,
            "city,date,total_visitors,avg_spending_per_visitor_usd,avg_stay_duration_days
{rows}"
        )
        .unwrap();
    }

    #[rstest]
    fn test_read_metrics_no_files(cities: CityMap) {
        let dir = tempdir().unwrap();
        let (store, reports) = read_metrics(dir.path(), &cities).unwrap();
        assert!(store.is_empty());
        assert!(reports.is_empty());
    }

    #[rstest]
    fn test_read_metrics_skips_unknown_city(cities: CityMap) {
        let dir = tempdir().unwrap();
        create_tourism_file(
            dir.path(),
            "Lisbon,2024-06-01,1000,150,3.5\n\
             Atlantis,2024-06-01,99,10,1.0",
        );

        let (store, reports) = read_metrics(dir.path(), &cities).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(reports[0].loaded, 1);
        assert_eq!(
            reports[0].skipped,
            vec![(2, "unknown city 'Atlantis'".to_string())]
        );
    }

    #[rstest]
    fn test_read_metrics_stamping_replaces(cities: CityMap) {
        let dir = tempdir().unwrap();
        // The second row stamps event-period figures over the same date
        create_tourism_file(
            dir.path(),
            "Lisbon,2024-06-01,1000,150,3.5\n\
             Lisbon,2024-06-01,1500,180,3.5",
        );

        let (store, reports) = read_metrics(dir.path(), &cities).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(reports[0].replaced, 1);

        let window = DateWindow {
            start: "2024-06-01".parse().unwrap(),
            end: "2024-06-01".parse().unwrap(),
        };
        let records = store.tourism_in_window(&"Lisbon".into(), &window);
        assert_eq!(records[0].total_visitors, Some(1500.0));
    }

    #[rstest]
    fn test_read_metrics_missing_values(cities: CityMap) {
        let dir = tempdir().unwrap();
        // Absent cells parse to None, not zero
        create_tourism_file(dir.path(), "Lisbon,2024-06-01,1000,,");

        let (store, _) = read_metrics(dir.path(), &cities).unwrap();
        let window = DateWindow {
            start: "2024-06-01".parse().unwrap(),
            end: "2024-06-01".parse().unwrap(),
        };
        let records = store.tourism_in_window(&"Lisbon".into(), &window);
        assert_eq!(records[0].total_visitors, Some(1000.0));
        assert_eq!(records[0].avg_spending_per_visitor_usd, None);
    }
}
