//! Baseline-vs-event-window comparison: the shared statistical primitive
//! beneath the deterministic analyzer and the feature assembler.
//!
//! For one (city, event date range) pair, each metric domain is aggregated
//! over a pre-event baseline window and over the event period, and the paired
//! aggregates are turned into named derived metrics. A domain with no records
//! in either window is omitted entirely: "absent" and "zero" are distinct.
use crate::city::CityID;
use crate::event::Event;
use crate::metric::{DateWindow, MetricStore};
use chrono::Days;
use indexmap::IndexMap;
use serde::Deserialize;

/// Parameters for constructing the baseline window
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct ComparatorOptions {
    /// Length of the baseline window in days
    pub baseline_before_days: u64,
    /// Days to leave between the baseline window and the event start
    pub baseline_gap_days: u64,
}

impl Default for ComparatorOptions {
    fn default() -> Self {
        Self {
            baseline_before_days: 30,
            baseline_gap_days: 0,
        }
    }
}

/// The paired windows a comparison runs over
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonWindows {
    /// The pre-event reference window
    pub baseline: DateWindow,
    /// The event period, start through end date inclusive
    pub event: DateWindow,
}

impl ComparisonWindows {
    /// Build the windows for an event. With the default options the baseline
    /// window is the 30 days immediately before the event start.
    pub fn for_event(event: &Event, options: &ComparatorOptions) -> Self {
        let baseline_end = event.start_date - Days::new(options.baseline_gap_days + 1);
        let baseline_start =
            baseline_end - Days::new(options.baseline_before_days.saturating_sub(1));
        Self {
            baseline: DateWindow {
                start: baseline_start,
                end: baseline_end,
            },
            event: DateWindow {
                start: event.start_date,
                end: event.end_date,
            },
        }
    }
}

/// Names of the derived metrics a comparison can produce. This is the shared
/// vocabulary between the comparator, the analyzer and the feature assembler.
pub mod keys {
    #![allow(missing_docs)]
    pub const EVENT_AVG_TOTAL_VISITORS: &str = "event_avg_total_visitors";
    pub const BASELINE_AVG_TOTAL_VISITORS: &str = "baseline_avg_total_visitors";
    pub const VISITOR_INCREASE_PCT: &str = "visitor_increase_pct";
    pub const EVENT_AVG_SPENDING_PER_VISITOR: &str = "event_avg_spending_per_visitor";
    pub const BASELINE_AVG_SPENDING_PER_VISITOR: &str = "baseline_avg_spending_per_visitor";
    pub const SPENDING_PER_VISITOR_INCREASE_PCT: &str = "spending_per_visitor_increase_pct";
    pub const EVENT_AVG_STAY_DURATION: &str = "event_avg_stay_duration";
    pub const EVENT_AVG_OCCUPANCY_PCT: &str = "event_avg_occupancy_pct";
    pub const BASELINE_AVG_OCCUPANCY_PCT: &str = "baseline_avg_occupancy_pct";
    pub const OCCUPANCY_BOOST_PTS: &str = "occupancy_boost_pts";
    pub const EVENT_AVG_HOTEL_PRICE: &str = "event_avg_hotel_price";
    pub const BASELINE_AVG_HOTEL_PRICE: &str = "baseline_avg_hotel_price";
    pub const EVENT_MAX_HOTEL_PRICE: &str = "event_max_hotel_price";
    pub const HOTEL_PRICE_INCREASE_PCT: &str = "hotel_price_increase_pct";
    pub const EVENT_AVG_DAILY_SPENDING: &str = "event_avg_daily_spending";
    pub const BASELINE_AVG_DAILY_SPENDING: &str = "baseline_avg_daily_spending";
    pub const DAILY_SPENDING_INCREASE_PCT: &str = "daily_spending_increase_pct";
    pub const EVENT_AVG_ACCOMMODATION_SPENDING: &str = "event_avg_accommodation_spending";
    pub const EVENT_AVG_FOOD_SPENDING: &str = "event_avg_food_spending";
    pub const EVENT_AVG_RETAIL_SPENDING: &str = "event_avg_retail_spending";
    pub const EVENT_AVG_AIRPORT_ARRIVALS: &str = "event_avg_airport_arrivals";
    pub const BASELINE_AVG_AIRPORT_ARRIVALS: &str = "baseline_avg_airport_arrivals";
    pub const AIRPORT_ARRIVALS_INCREASE_PCT: &str = "airport_arrivals_increase_pct";
    pub const EVENT_AVG_PUBLIC_TRANSPORT: &str = "event_avg_public_transport";
    pub const PUBLIC_TRANSPORT_INCREASE_PCT: &str = "public_transport_increase_pct";
    pub const EVENT_AVG_TRAFFIC_CONGESTION: &str = "event_avg_traffic_congestion";
    pub const TRAFFIC_CONGESTION_INCREASE_PCT: &str = "traffic_congestion_increase_pct";
}

/// A flat mapping of derived metric name to value. Only metrics that could
/// actually be derived are present.
pub type MetricComparison = IndexMap<&'static str, f64>;

/// Relative change between an event-period mean and a baseline mean, in
/// percent.
///
/// A non-positive baseline mean yields 0.0: this is the single, documented
/// degenerate-denominator policy used everywhere the ratio pattern appears.
pub fn relative_change_pct(event_mean: f64, baseline_mean: f64) -> f64 {
    if baseline_mean > 0.0 {
        (event_mean - baseline_mean) / baseline_mean * 100.0
    } else {
        0.0
    }
}

/// Mean over the values `f` extracts from `records`, ignoring absent ones.
/// Returns `None` when no record carries the field.
fn mean_of<T>(records: &[&T], f: impl Fn(&T) -> Option<f64>) -> Option<f64> {
    let values: Vec<f64> = records.iter().filter_map(|r| f(r)).collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Maximum over the values `f` extracts from `records`
fn max_of<T>(records: &[&T], f: impl Fn(&T) -> Option<f64>) -> Option<f64> {
    records
        .iter()
        .filter_map(|r| f(r))
        .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.max(v))))
}

/// Insert a value into the comparison if it is present
fn insert_opt(comparison: &mut MetricComparison, key: &'static str, value: Option<f64>) {
    if let Some(value) = value {
        comparison.insert(key, value);
    }
}

/// Insert the relative change between two optional means, when both exist
fn insert_change(
    comparison: &mut MetricComparison,
    key: &'static str,
    event_mean: Option<f64>,
    baseline_mean: Option<f64>,
) {
    if let (Some(event_mean), Some(baseline_mean)) = (event_mean, baseline_mean) {
        comparison.insert(key, relative_change_pct(event_mean, baseline_mean));
    }
}

/// Compute the full baseline-vs-event comparison for one city and window
/// pair.
///
/// # Arguments
///
/// * `store` - The daily metric records
/// * `city` - Name of the city to compare
/// * `windows` - The baseline and event-period windows
///
/// # Returns
///
/// The derived metrics that could be computed from the available data
pub fn compare_city_windows(
    store: &MetricStore,
    city: &CityID,
    windows: &ComparisonWindows,
) -> MetricComparison {
    let mut cmp = MetricComparison::new();

    // Tourism
    let baseline = store.tourism_in_window(city, &windows.baseline);
    let event = store.tourism_in_window(city, &windows.event);
    if !baseline.is_empty() && !event.is_empty() {
        let event_visitors = mean_of(&event, |r| r.total_visitors);
        let baseline_visitors = mean_of(&baseline, |r| r.total_visitors);
        insert_opt(&mut cmp, keys::EVENT_AVG_TOTAL_VISITORS, event_visitors);
        insert_opt(&mut cmp, keys::BASELINE_AVG_TOTAL_VISITORS, baseline_visitors);
        insert_change(&mut cmp, keys::VISITOR_INCREASE_PCT, event_visitors, baseline_visitors);

        let event_spending = mean_of(&event, |r| r.avg_spending_per_visitor_usd);
        let baseline_spending = mean_of(&baseline, |r| r.avg_spending_per_visitor_usd);
        insert_opt(&mut cmp, keys::EVENT_AVG_SPENDING_PER_VISITOR, event_spending);
        insert_opt(
            &mut cmp,
            keys::BASELINE_AVG_SPENDING_PER_VISITOR,
            baseline_spending,
        );
        insert_change(
            &mut cmp,
            keys::SPENDING_PER_VISITOR_INCREASE_PCT,
            event_spending,
            baseline_spending,
        );

        insert_opt(
            &mut cmp,
            keys::EVENT_AVG_STAY_DURATION,
            mean_of(&event, |r| r.avg_stay_duration_days),
        );
    }

    // Hotel
    let baseline = store.hotel_in_window(city, &windows.baseline);
    let event = store.hotel_in_window(city, &windows.event);
    if !baseline.is_empty() && !event.is_empty() {
        let event_occupancy = mean_of(&event, |r| r.occupancy_rate_pct);
        let baseline_occupancy = mean_of(&baseline, |r| r.occupancy_rate_pct);
        insert_opt(&mut cmp, keys::EVENT_AVG_OCCUPANCY_PCT, event_occupancy);
        insert_opt(&mut cmp, keys::BASELINE_AVG_OCCUPANCY_PCT, baseline_occupancy);
        // A percentage-point difference, not a ratio
        if let (Some(event_occupancy), Some(baseline_occupancy)) =
            (event_occupancy, baseline_occupancy)
        {
            cmp.insert(keys::OCCUPANCY_BOOST_PTS, event_occupancy - baseline_occupancy);
        }

        let event_price = mean_of(&event, |r| r.avg_price_usd);
        let baseline_price = mean_of(&baseline, |r| r.avg_price_usd);
        insert_opt(&mut cmp, keys::EVENT_AVG_HOTEL_PRICE, event_price);
        insert_opt(&mut cmp, keys::BASELINE_AVG_HOTEL_PRICE, baseline_price);
        insert_opt(
            &mut cmp,
            keys::EVENT_MAX_HOTEL_PRICE,
            max_of(&event, |r| r.avg_price_usd),
        );
        insert_change(
            &mut cmp,
            keys::HOTEL_PRICE_INCREASE_PCT,
            event_price,
            baseline_price,
        );
    }

    // Economic
    let baseline = store.economic_in_window(city, &windows.baseline);
    let event = store.economic_in_window(city, &windows.event);
    if !baseline.is_empty() && !event.is_empty() {
        let event_spending = mean_of(&event, |r| r.total_spending_usd);
        let baseline_spending = mean_of(&baseline, |r| r.total_spending_usd);
        insert_opt(&mut cmp, keys::EVENT_AVG_DAILY_SPENDING, event_spending);
        insert_opt(&mut cmp, keys::BASELINE_AVG_DAILY_SPENDING, baseline_spending);
        insert_change(
            &mut cmp,
            keys::DAILY_SPENDING_INCREASE_PCT,
            event_spending,
            baseline_spending,
        );

        insert_opt(
            &mut cmp,
            keys::EVENT_AVG_ACCOMMODATION_SPENDING,
            mean_of(&event, |r| r.accommodation_spending_usd),
        );
        insert_opt(
            &mut cmp,
            keys::EVENT_AVG_FOOD_SPENDING,
            mean_of(&event, |r| r.food_beverage_spending_usd),
        );
        insert_opt(
            &mut cmp,
            keys::EVENT_AVG_RETAIL_SPENDING,
            mean_of(&event, |r| r.retail_spending_usd),
        );
    }

    // Mobility
    let baseline = store.mobility_in_window(city, &windows.baseline);
    let event = store.mobility_in_window(city, &windows.event);
    if !baseline.is_empty() && !event.is_empty() {
        let event_arrivals = mean_of(&event, |r| r.airport_arrivals);
        let baseline_arrivals = mean_of(&baseline, |r| r.airport_arrivals);
        insert_opt(&mut cmp, keys::EVENT_AVG_AIRPORT_ARRIVALS, event_arrivals);
        insert_opt(&mut cmp, keys::BASELINE_AVG_AIRPORT_ARRIVALS, baseline_arrivals);
        insert_change(
            &mut cmp,
            keys::AIRPORT_ARRIVALS_INCREASE_PCT,
            event_arrivals,
            baseline_arrivals,
        );

        let event_transport = mean_of(&event, |r| r.public_transport_usage);
        let baseline_transport = mean_of(&baseline, |r| r.public_transport_usage);
        insert_opt(&mut cmp, keys::EVENT_AVG_PUBLIC_TRANSPORT, event_transport);
        insert_change(
            &mut cmp,
            keys::PUBLIC_TRANSPORT_INCREASE_PCT,
            event_transport,
            baseline_transport,
        );

        let event_congestion = mean_of(&event, |r| r.traffic_congestion_index);
        let baseline_congestion = mean_of(&baseline, |r| r.traffic_congestion_index);
        insert_opt(&mut cmp, keys::EVENT_AVG_TRAFFIC_CONGESTION, event_congestion);
        insert_change(
            &mut cmp,
            keys::TRAFFIC_CONGESTION_INCREASE_PCT,
            event_congestion,
            baseline_congestion,
        );
    }

    cmp
}

/// Compute the comparison for one event using its own city and dates
pub fn compare_event(
    store: &MetricStore,
    event: &Event,
    options: &ComparatorOptions,
) -> MetricComparison {
    let windows = ComparisonWindows::for_event(event, options);
    compare_city_windows(store, &event.city, &windows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{dataset, event_windows};
    use crate::dataset::Dataset;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[test]
    fn test_relative_change_pct() {
        assert_approx_eq!(f64, relative_change_pct(1500.0, 1000.0), 50.0);
        assert_approx_eq!(f64, relative_change_pct(800.0, 1000.0), -20.0); // declines preserved
        assert_approx_eq!(f64, relative_change_pct(1500.0, 0.0), 0.0); // degenerate denominator
        assert_approx_eq!(f64, relative_change_pct(1500.0, -5.0), 0.0);
    }

    #[test]
    fn test_windows_for_event() {
        let event = Event {
            name: "event1".into(),
            city: "Lisbon".into(),
            event_type: crate::event::EventType::Music,
            start_date: "2024-06-01".parse().unwrap(),
            end_date: "2024-06-03".parse().unwrap(),
            expected_attendance: None,
            actual_attendance: None,
            event_cost_usd: None,
        };

        let windows = ComparisonWindows::for_event(&event, &ComparatorOptions::default());
        assert_eq!(windows.baseline.start, "2024-05-02".parse().unwrap());
        assert_eq!(windows.baseline.end, "2024-05-31".parse().unwrap());
        assert_eq!(windows.event.start, event.start_date);
        assert_eq!(windows.event.end, event.end_date);

        let options = ComparatorOptions {
            baseline_before_days: 14,
            baseline_gap_days: 7,
        };
        let windows = ComparisonWindows::for_event(&event, &options);
        assert_eq!(windows.baseline.end, "2024-05-24".parse().unwrap());
        assert_eq!(windows.baseline.start, "2024-05-11".parse().unwrap());
    }

    #[rstest]
    fn test_compare_event_visitor_increase(dataset: Dataset) {
        // Fixture data: baseline 1000 visitors/day, event period 1500/day
        let event = dataset.event("Atlantic Song Festival").unwrap();
        let cmp = compare_event(&dataset.metrics, event, &ComparatorOptions::default());
        assert_approx_eq!(f64, cmp[keys::VISITOR_INCREASE_PCT], 50.0);
        assert_approx_eq!(f64, cmp[keys::BASELINE_AVG_TOTAL_VISITORS], 1000.0);
        assert_approx_eq!(f64, cmp[keys::EVENT_AVG_TOTAL_VISITORS], 1500.0);
    }

    #[rstest]
    fn test_compare_event_absent_domain_omitted(dataset: Dataset) {
        // The Osaka event has no mobility records at all: mobility-derived
        // metrics must be absent, not zero
        let event = dataset.event("Harbour Marathon").unwrap();
        let cmp = compare_event(&dataset.metrics, event, &ComparatorOptions::default());
        assert!(!cmp.contains_key(keys::AIRPORT_ARRIVALS_INCREASE_PCT));
        assert!(!cmp.contains_key(keys::EVENT_AVG_AIRPORT_ARRIVALS));
    }

    #[rstest]
    fn test_compare_recomputable_from_means(dataset: Dataset) {
        let event = dataset.event("Atlantic Song Festival").unwrap();
        let cmp = compare_event(&dataset.metrics, event, &ComparatorOptions::default());
        let recomputed = relative_change_pct(
            cmp[keys::EVENT_AVG_HOTEL_PRICE],
            cmp[keys::BASELINE_AVG_HOTEL_PRICE],
        );
        assert_approx_eq!(f64, cmp[keys::HOTEL_PRICE_INCREASE_PCT], recomputed);
    }

    #[rstest]
    fn test_occupancy_boost_is_point_difference(dataset: Dataset) {
        let event = dataset.event("Atlantic Song Festival").unwrap();
        let cmp = compare_event(&dataset.metrics, event, &ComparatorOptions::default());
        assert_approx_eq!(
            f64,
            cmp[keys::OCCUPANCY_BOOST_PTS],
            cmp[keys::EVENT_AVG_OCCUPANCY_PCT] - cmp[keys::BASELINE_AVG_OCCUPANCY_PCT]
        );
    }

    #[rstest]
    fn test_event_windows_fixture_consistency(event_windows: ComparisonWindows) {
        assert!(event_windows.baseline.end < event_windows.event.start);
    }
}
