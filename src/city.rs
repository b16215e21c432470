//! Cities are the geographical units hosting events.
//!
//! A city's descriptors are immutable reference data for a prediction window:
//! they are only changed by reloading the catalog, never by the pipeline.
use crate::id::{define_id_getter, define_id_type};
use indexmap::IndexMap;
use serde::Deserialize;

define_id_type! {CityID}

/// A map of [`City`]s, keyed by city name
pub type CityMap = IndexMap<CityID, City>;

/// Days per year used when converting annual tourist counts to daily baselines
pub const DAYS_PER_YEAR: f64 = 365.0;

/// A city hosting events, with its tourism baseline descriptors
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct City {
    /// Unique city name (e.g. "Lisbon"). The exact join key across all tables.
    pub name: CityID,
    /// Country the city belongs to
    pub country: String,
    /// Continent the city belongs to (e.g. "Europe")
    pub continent: String,
    /// Resident population
    pub population: u64,
    /// Tourists visiting per year
    pub annual_tourists: u64,
    /// Total hotel room inventory
    pub hotel_rooms: u64,
    /// Average nightly hotel price outside event periods
    pub avg_hotel_price_usd: f64,
    /// Gross domestic product in USD
    pub gdp_usd: f64,
}
define_id_getter! {City, CityID, name}

impl City {
    /// The average number of daily visitors outside event periods
    pub fn baseline_daily_visitors(&self) -> f64 {
        self.annual_tourists as f64 / DAYS_PER_YEAR
    }

    /// Annual tourists relative to population, a measure of tourism dependence
    pub fn tourism_intensity(&self) -> f64 {
        self.annual_tourists as f64 / (self.population as f64).max(1.0)
    }
}

#[cfg(test)]
mod tests {
    use crate::fixture::cities;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_baseline_daily_visitors(cities: CityMap) {
        let city = cities.get("Lisbon").unwrap();
        assert_approx_eq!(
            f64,
            city.baseline_daily_visitors(),
            city.annual_tourists as f64 / 365.0
        );
    }

    #[rstest]
    fn test_tourism_intensity(cities: CityMap) {
        let city = cities.get("Lisbon").unwrap();
        assert_approx_eq!(
            f64,
            city.tourism_intensity(),
            city.annual_tourists as f64 / city.population as f64
        );
    }
}
