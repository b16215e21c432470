//! Daily metric records across the four tracked domains, and the in-memory
//! store used to query them by city and date window.
use crate::city::CityID;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Deserialize;
use strum::{Display, EnumIter};

/// The metric domains tracked per city and day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum MetricDomain {
    /// Visitor counts and spending-per-visitor
    Tourism,
    /// Hotel occupancy and pricing
    Hotel,
    /// Daily spending by sector, jobs and tax revenue
    Economic,
    /// Air, public transport and road traffic
    Mobility,
}

/// An inclusive date range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateWindow {
    /// First day of the window
    pub start: NaiveDate,
    /// Last day of the window (inclusive)
    pub end: NaiveDate,
}

impl DateWindow {
    /// Whether `date` falls inside the window
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Daily visitor statistics for one city.
///
/// Value fields are optional: a source may report only a subset of columns
/// for a given day, and absent values must stay distinct from zeros.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TourismMetric {
    /// Name of the city the record belongs to
    pub city: CityID,
    /// Day the record covers
    pub date: NaiveDate,
    /// Total visitors present that day
    pub total_visitors: Option<f64>,
    /// Average spending per visitor that day
    pub avg_spending_per_visitor_usd: Option<f64>,
    /// Average length of stay of visitors present that day
    pub avg_stay_duration_days: Option<f64>,
}

/// Daily hotel statistics for one city
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HotelMetric {
    /// Name of the city the record belongs to
    pub city: CityID,
    /// Day the record covers
    pub date: NaiveDate,
    /// Share of rooms occupied, in percent
    pub occupancy_rate_pct: Option<f64>,
    /// Average nightly price across the city's rooms
    pub avg_price_usd: Option<f64>,
}

/// Daily visitor-economy spending for one city
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EconomicMetric {
    /// Name of the city the record belongs to
    pub city: CityID,
    /// Day the record covers
    pub date: NaiveDate,
    /// Total visitor spending that day
    pub total_spending_usd: Option<f64>,
    /// Spending on accommodation
    pub accommodation_spending_usd: Option<f64>,
    /// Spending on food and beverages
    pub food_beverage_spending_usd: Option<f64>,
    /// Spending in retail
    pub retail_spending_usd: Option<f64>,
    /// Temporary jobs attributed to visitor activity that day
    pub temporary_jobs_created: Option<f64>,
    /// Estimated tax revenue from visitor activity that day
    pub estimated_tax_revenue_usd: Option<f64>,
}

/// Daily transport and mobility figures for one city
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MobilityMetric {
    /// Name of the city the record belongs to
    pub city: CityID,
    /// Day the record covers
    pub date: NaiveDate,
    /// Passengers arriving at the city's airports
    pub airport_arrivals: Option<f64>,
    /// Number of international flights landing
    pub international_flights: Option<f64>,
    /// Public transport journeys taken
    pub public_transport_usage: Option<f64>,
    /// Road congestion index (higher is more congested)
    pub traffic_congestion_index: Option<f64>,
}

/// Key identifying one daily record: there is at most one record per
/// (city, date) per domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MetricKey {
    city: CityID,
    date: NaiveDate,
}

/// In-memory store of daily metric records for all cities and domains.
///
/// Inserting a record for an already-present (city, date) key replaces the
/// earlier record: event-period values stamped over the same dates supersede
/// baseline-generated values. Window queries are linear scans, which is
/// adequate for the corpus sizes this tool targets.
#[derive(Debug, Default, PartialEq)]
pub struct MetricStore {
    tourism: IndexMap<MetricKey, TourismMetric>,
    hotel: IndexMap<MetricKey, HotelMetric>,
    economic: IndexMap<MetricKey, EconomicMetric>,
    mobility: IndexMap<MetricKey, MobilityMetric>,
}

macro_rules! define_domain_methods {
    ($insert:ident, $window:ident, $record:ty, $field:ident) => {
        /// Insert a record, replacing any earlier record for the same
        /// (city, date). Returns true if a record was replaced.
        pub fn $insert(&mut self, record: $record) -> bool {
            let key = MetricKey {
                city: record.city.clone(),
                date: record.date,
            };
            self.$field.insert(key, record).is_some()
        }

        /// All records for `city` whose date falls inside `window`
        pub fn $window(&self, city: &CityID, window: &DateWindow) -> Vec<&$record> {
            self.$field
                .values()
                .filter(|r| &r.city == city && window.contains(r.date))
                .collect()
        }
    };
}

impl MetricStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    define_domain_methods! {insert_tourism, tourism_in_window, TourismMetric, tourism}
    define_domain_methods! {insert_hotel, hotel_in_window, HotelMetric, hotel}
    define_domain_methods! {insert_economic, economic_in_window, EconomicMetric, economic}
    define_domain_methods! {insert_mobility, mobility_in_window, MobilityMetric, mobility}

    /// Total number of records across all domains
    pub fn len(&self) -> usize {
        self.tourism.len() + self.hotel.len() + self.economic.len() + self.mobility.len()
    }

    /// Whether the store holds no records at all
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tourism_record(city: &str, date: &str, visitors: f64) -> TourismMetric {
        TourismMetric {
            city: city.into(),
            date: date.parse().unwrap(),
            total_visitors: Some(visitors),
            avg_spending_per_visitor_usd: None,
            avg_stay_duration_days: None,
        }
    }

    #[test]
    fn test_insert_replaces_same_key() {
        let mut store = MetricStore::new();
        assert!(!store.insert_tourism(tourism_record("Lisbon", "2024-06-01", 1000.0)));
        // Stamping event-period data over the same date replaces the record
        assert!(store.insert_tourism(tourism_record("Lisbon", "2024-06-01", 1500.0)));
        assert_eq!(store.len(), 1);

        let window = DateWindow {
            start: "2024-06-01".parse().unwrap(),
            end: "2024-06-01".parse().unwrap(),
        };
        let records = store.tourism_in_window(&"Lisbon".into(), &window);
        assert_eq!(records[0].total_visitors, Some(1500.0));
    }

    #[test]
    fn test_window_query_filters_city_and_dates() {
        let mut store = MetricStore::new();
        store.insert_tourism(tourism_record("Lisbon", "2024-06-01", 1000.0));
        store.insert_tourism(tourism_record("Lisbon", "2024-06-05", 1100.0));
        store.insert_tourism(tourism_record("Osaka", "2024-06-01", 9000.0));

        let window = DateWindow {
            start: "2024-06-01".parse().unwrap(),
            end: "2024-06-03".parse().unwrap(),
        };
        let records = store.tourism_in_window(&"Lisbon".into(), &window);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].total_visitors, Some(1000.0));
    }
}
