//! The per-event impact record: the analyzer's output and, where a measured
//! total impact is present, a training label for the regression models.
use crate::city::CityID;
use crate::event::{EventID, EventType};
use crate::id::define_id_getter;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A map of [`EventImpact`]s, keyed by event name
pub type ImpactMap = IndexMap<EventID, EventImpact>;

/// Aggregated impact figures for one event.
///
/// Every measured field is optional: a domain whose metrics were absent for
/// the analysis window contributes nothing, and absence is distinct from a
/// measured zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventImpact {
    /// Name of the event the record describes
    pub event: EventID,
    /// Name of the host city
    pub city: CityID,
    /// Category of the event
    pub event_type: Option<EventType>,
    /// Attendance over the whole event
    pub attendance: Option<f64>,
    /// Event duration in days
    pub duration_days: Option<f64>,

    // Tourism
    /// Mean daily visitors over the baseline window
    pub baseline_daily_visitors: Option<f64>,
    /// Mean daily visitors over the event period
    pub event_daily_visitors: Option<f64>,
    /// Relative change in daily visitors, in percent
    pub visitor_increase_pct: Option<f64>,
    /// Visitors above baseline summed over the event period
    pub additional_visitors: Option<f64>,

    // Hotel
    /// Mean occupancy over the baseline window, in percent
    pub baseline_occupancy_pct: Option<f64>,
    /// Mean occupancy over the event period, in percent
    pub event_occupancy_pct: Option<f64>,
    /// Occupancy change in percentage points (not a ratio)
    pub occupancy_boost_pts: Option<f64>,
    /// Mean nightly price over the baseline window
    pub baseline_hotel_price_usd: Option<f64>,
    /// Mean nightly price over the event period
    pub event_hotel_price_usd: Option<f64>,
    /// Relative change in nightly price, in percent
    pub hotel_price_increase_pct: Option<f64>,

    // Economic
    /// Total economic impact (direct + indirect + induced). The training
    /// target for the regression models.
    pub total_economic_impact_usd: Option<f64>,
    /// Spending observed during the event period
    pub direct_spending_usd: Option<f64>,
    /// Estimated supply-chain spending
    pub indirect_spending_usd: Option<f64>,
    /// Estimated employee re-spending
    pub induced_spending_usd: Option<f64>,
    /// Temporary jobs over the event period
    pub jobs_created: Option<f64>,
    /// Tax revenue over the event period
    pub tax_revenue_usd: Option<f64>,

    // Mobility
    /// Relative change in airport arrivals, in percent
    pub airport_arrivals_increase_pct: Option<f64>,
    /// Relative change in public transport journeys, in percent
    pub public_transport_increase_pct: Option<f64>,
    /// Relative change in the congestion index, in percent
    pub traffic_congestion_increase_pct: Option<f64>,

    // ROI
    /// Cost of staging the event, where known
    pub event_cost_usd: Option<f64>,
    /// `total_economic_impact_usd / event_cost_usd`, absent when cost unknown
    pub roi_ratio: Option<f64>,
}
define_id_getter! {EventImpact, EventID, event}

impl EventImpact {
    /// Create an empty impact record for the given event and city
    pub fn new(event: EventID, city: CityID) -> Self {
        Self {
            event,
            city,
            event_type: None,
            attendance: None,
            duration_days: None,
            baseline_daily_visitors: None,
            event_daily_visitors: None,
            visitor_increase_pct: None,
            additional_visitors: None,
            baseline_occupancy_pct: None,
            event_occupancy_pct: None,
            occupancy_boost_pts: None,
            baseline_hotel_price_usd: None,
            event_hotel_price_usd: None,
            hotel_price_increase_pct: None,
            total_economic_impact_usd: None,
            direct_spending_usd: None,
            indirect_spending_usd: None,
            induced_spending_usd: None,
            jobs_created: None,
            tax_revenue_usd: None,
            airport_arrivals_increase_pct: None,
            public_transport_increase_pct: None,
            traffic_congestion_increase_pct: None,
            event_cost_usd: None,
            roi_ratio: None,
        }
    }

    /// Fill in `roi_ratio` from the total impact and the event cost.
    ///
    /// The ratio stays absent when either side is missing or the cost is not
    /// positive.
    pub fn derive_roi(&mut self) {
        self.roi_ratio = match (self.total_economic_impact_usd, self.event_cost_usd) {
            (Some(impact), Some(cost)) if cost > 0.0 => Some(impact / cost),
            _ => None,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_roi() {
        let mut impact = EventImpact::new("event1".into(), "Lisbon".into());
        impact.total_economic_impact_usd = Some(40_000_000.0);
        impact.event_cost_usd = Some(10_000_000.0);
        impact.derive_roi();
        assert_eq!(impact.roi_ratio, Some(4.0));

        impact.event_cost_usd = None;
        impact.derive_roi();
        assert_eq!(impact.roi_ratio, None);

        impact.event_cost_usd = Some(0.0);
        impact.derive_roi();
        assert_eq!(impact.roi_ratio, None);
    }
}
