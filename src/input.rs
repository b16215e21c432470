//! Common routines for loading input data from a dataset directory.
//!
//! A dataset is a directory of CSV files sharing the city name as join key.
//! Reading is strict about structure (a malformed file aborts the load) but
//! per-row problems in the optional metric tables are recorded as typed
//! outcomes in an [`ImportReport`] rather than silently swallowed.
use crate::id::{HasID, IDLike};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use log::{info, warn};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

pub mod city;
pub mod event;
pub mod impact;
pub mod metric;

/// Read a series of type `T`s from a CSV file into a `Vec<T>`
pub fn read_csv<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(file_path)
        .with_context(|| format!("Could not open {}", file_path.display()))?;

    let mut vec = Vec::new();
    for result in reader.deserialize() {
        let record: T =
            result.with_context(|| format!("Error reading {}", file_path.display()))?;
        vec.push(record);
    }

    Ok(vec)
}

/// Read a CSV file of records carrying an ID into a map keyed by that ID.
///
/// Duplicate IDs are an error: the catalogs are reference data, so two rows
/// claiming the same name indicate a broken input file rather than an update.
pub fn read_csv_id_file<ID: IDLike, T>(file_path: &Path) -> Result<IndexMap<ID, T>>
where
    T: HasID<ID> + DeserializeOwned,
{
    let mut map = IndexMap::new();
    for record in read_csv::<T>(file_path)? {
        let id = record.get_id().clone();
        ensure!(
            map.insert(id.clone(), record).is_none(),
            "Duplicate ID {} in {}",
            id,
            file_path.display()
        );
    }
    ensure!(
        !map.is_empty(),
        "CSV file {} cannot be empty",
        file_path.display()
    );

    Ok(map)
}

/// Parse a TOML file into the specified type
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let contents = fs::read_to_string(file_path)
        .with_context(|| format!("Could not read {}", file_path.display()))?;
    toml::from_str(&contents).with_context(|| format!("Error parsing {}", file_path.display()))
}

/// The outcome of importing a single row
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    /// The row was stored
    Loaded,
    /// The row replaced an earlier record for the same key
    Replaced,
    /// The row was dropped, with the reason why
    Skipped(String),
}

/// Aggregated outcomes for one imported file
#[derive(Debug, PartialEq)]
pub struct ImportReport {
    /// The file the report covers
    pub file: PathBuf,
    /// Rows stored
    pub loaded: usize,
    /// Rows that replaced an earlier record for the same key
    pub replaced: usize,
    /// Dropped rows, as (1-based row number, reason) pairs
    pub skipped: Vec<(usize, String)>,
}

impl ImportReport {
    /// Create an empty report for the given file
    pub fn new(file: PathBuf) -> Self {
        Self {
            file,
            loaded: 0,
            replaced: 0,
            skipped: Vec::new(),
        }
    }

    /// Record the outcome of one row
    pub fn record(&mut self, row: usize, outcome: RowOutcome) {
        match outcome {
            RowOutcome::Loaded => self.loaded += 1,
            RowOutcome::Replaced => {
                self.loaded += 1;
                self.replaced += 1;
            }
            RowOutcome::Skipped(reason) => self.skipped.push((row, reason)),
        }
    }

    /// Log a summary of the import, warning about any skipped rows
    pub fn log_summary(&self) {
        info!(
            "{}: {} rows loaded ({} replaced earlier records)",
            self.file.display(),
            self.loaded,
            self.replaced
        );
        for (row, reason) in &self.skipped {
            warn!("{}: row {row} skipped: {reason}", self.file.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::city::{City, CityID, CityMap};
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_read_csv_id_file_duplicate() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("cities.csv");
        let mut file = File::create(&file_path).unwrap();
        writeln!(
            file,
            "name,country,continent,population,annual_tourists,hotel_rooms,avg_hotel_price_usd,gdp_usd
Lisbon,Portugal,Europe,545000,6100000,22000,140,96000000000
Lisbon,Portugal,Europe,545000,6100000,22000,140,96000000000"
        )
        .unwrap();

        assert!(read_csv_id_file::<CityID, City>(&file_path).is_err());
    }

    #[test]
    fn test_read_csv_id_file_empty() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("cities.csv");
        let mut file = File::create(&file_path).unwrap();
        writeln!(
            file,
            "name,country,continent,population,annual_tourists,hotel_rooms,avg_hotel_price_usd,gdp_usd"
        )
        .unwrap();

        assert!(read_csv_id_file::<CityID, City>(&file_path).is_err());
    }

    #[test]
    fn test_import_report_record() {
        let mut report = ImportReport::new(PathBuf::from("tourism_metrics.csv"));
        report.record(1, RowOutcome::Loaded);
        report.record(2, RowOutcome::Replaced);
        report.record(3, RowOutcome::Skipped("unknown city 'Atlantis'".into()));

        assert_eq!(report.loaded, 2);
        assert_eq!(report.replaced, 1);
        assert_eq!(report.skipped.len(), 1);
    }

    #[test]
    fn test_read_csv_map_is_ordered() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("cities.csv");
        let mut file = File::create(&file_path).unwrap();
        writeln!(
            file,
            "name,country,continent,population,annual_tourists,hotel_rooms,avg_hotel_price_usd,gdp_usd
Osaka,Japan,Asia,2750000,12000000,90000,120,180000000000
Lisbon,Portugal,Europe,545000,6100000,22000,140,96000000000"
        )
        .unwrap();

        let cities: CityMap = read_csv_id_file(&file_path).unwrap();
        let names: Vec<_> = cities.keys().map(ToString::to_string).collect();
        assert_eq!(names, vec!["Osaka", "Lisbon"]); // file order preserved
    }
}
