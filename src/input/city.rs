//! Code for reading the city catalog from CSV.
use super::*;
use crate::city::CityMap;
use anyhow::Result;
use std::path::Path;

const CITIES_FILE_NAME: &str = "cities.csv";

/// Read the city catalog from the specified dataset directory.
///
/// # Arguments
///
/// * `data_dir` - Folder containing the dataset CSV files
///
/// # Returns
///
/// A [`CityMap`] keyed by city name, or an error
pub fn read_cities(data_dir: &Path) -> Result<CityMap> {
    read_csv_id_file(&data_dir.join(CITIES_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::city::City;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    /// Create an example cities file in dir_path
    fn create_cities_file(dir_path: &Path) {
        let file_path = dir_path.join(CITIES_FILE_NAME);
        let mut file = File::create(file_path).unwrap();
        writeln!(
            file,
            "name,country,continent,population,annual_tourists,hotel_rooms,avg_hotel_price_usd,gdp_usd
Lisbon,Portugal,Europe,545000,6100000,22000,140,96000000000
Osaka,Japan,Asia,2750000,12000000,90000,120,180000000000"
        )
        .unwrap();
    }

    #[test]
    fn test_read_cities() {
        let dir = tempdir().unwrap();
        create_cities_file(dir.path());
        let cities = read_cities(dir.path()).unwrap();
        assert_eq!(cities.len(), 2);
        assert_eq!(
            cities.get("Lisbon").unwrap(),
            &City {
                name: "Lisbon".into(),
                country: "Portugal".to_string(),
                continent: "Europe".to_string(),
                population: 545_000,
                annual_tourists: 6_100_000,
                hotel_rooms: 22_000,
                avg_hotel_price_usd: 140.0,
                gdp_usd: 96_000_000_000.0,
            }
        );
    }

    #[test]
    fn test_read_cities_missing_file() {
        let dir = tempdir().unwrap();
        assert!(read_cities(dir.path()).is_err());
    }
}
