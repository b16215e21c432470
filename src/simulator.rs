//! What-if scenario simulation: rescaling an already-computed impact under
//! hypothetical attendance and elasticity changes.
//!
//! This is a thin derived-multiplier layer over the analyzer's output; it
//! performs no new statistical estimation.
use crate::analyzer::ImpactAnalyzer;
use crate::dataset::Dataset;
use crate::impact::EventImpact;
use crate::predictor::ImpactConstants;
use anyhow::Result;
use indexmap::IndexMap;
use serde::Serialize;

/// Parameters of an attendance-change scenario
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct ScenarioParams {
    /// Change in attendance, in percent (negative shrinks the event)
    pub attendance_change_pct: f64,
    /// How strongly prices respond to demand, 0 to 1
    pub price_elasticity: f64,
    /// Multiplier on per-visitor spending
    pub spending_multiplier: f64,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            attendance_change_pct: 0.0,
            price_elasticity: 0.3,
            spending_multiplier: 1.0,
        }
    }
}

/// One side of a scenario comparison
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScenarioOutcome {
    /// Label for the scenario
    pub scenario_name: String,
    /// Attendance under the scenario
    pub attendance: Option<f64>,
    /// Visitors above baseline
    pub additional_visitors: Option<f64>,
    /// Visitor increase over baseline, in percent
    pub visitor_increase_pct: Option<f64>,
    /// Event-period nightly hotel price
    pub avg_price_usd: Option<f64>,
    /// Price increase over baseline, in percent
    pub price_increase_pct: Option<f64>,
    /// Event-period occupancy, in percent
    pub occupancy_pct: Option<f64>,
    /// Occupancy boost over baseline, in points
    pub occupancy_boost_pts: Option<f64>,
    /// Total economic impact
    pub total_economic_impact_usd: Option<f64>,
    /// Jobs created
    pub jobs_created: Option<f64>,
    /// Impact over cost
    pub roi_ratio: Option<f64>,
}

/// The base scenario, the projected scenario and the per-figure changes
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScenarioComparison {
    /// The simulated event
    pub event: String,
    /// The parameters that produced the projection
    pub params: ScenarioParams,
    /// The observed (or analyzed) scenario
    pub base: ScenarioOutcome,
    /// The projected scenario
    pub projected: ScenarioOutcome,
    /// Relative change per figure, in percent
    pub changes_pct: IndexMap<&'static str, f64>,
}

/// A year in a growth projection
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GrowthYear {
    /// Years from now (1-based)
    pub year: u32,
    /// Cumulative attendance growth at that year, in percent
    pub cumulative_growth_pct: f64,
    /// The projected scenario for that year
    pub outcome: ScenarioOutcome,
}

/// Simulates what-if scenarios over a dataset's events
pub struct ScenarioSimulator<'a> {
    dataset: &'a Dataset,
    constants: ImpactConstants,
}

impl<'a> ScenarioSimulator<'a> {
    /// Create a simulator over the dataset
    pub fn new(dataset: &'a Dataset) -> Self {
        Self {
            dataset,
            constants: ImpactConstants::default(),
        }
    }

    /// The stored impact record for an event, or a freshly analyzed one
    fn base_impact(&self, event_name: &str) -> Result<EventImpact> {
        match self.dataset.impacts.get(event_name) {
            Some(impact) => Ok(impact.clone()),
            None => ImpactAnalyzer::new(self.dataset)
                .with_constants(self.constants)
                .analyze_event(event_name),
        }
    }

    /// Project the impact of changing an event's attendance.
    ///
    /// Prices respond sub-linearly through the elasticity parameter,
    /// occupancy is capped at 100%, and the spending-derived figures scale
    /// with attendance times the spending multiplier.
    pub fn simulate_attendance_change(
        &self,
        event_name: &str,
        params: &ScenarioParams,
    ) -> Result<ScenarioComparison> {
        let event = self.dataset.event(event_name)?;
        let base = self.base_impact(event_name)?;

        let attendance_multiplier = 1.0 + params.attendance_change_pct / 100.0;
        let spending_factor = attendance_multiplier * params.spending_multiplier;

        // Visitors
        let projected_event_visitors = base.event_daily_visitors.map(|v| v * attendance_multiplier);
        let projected_additional =
            base.additional_visitors.map(|v| v * attendance_multiplier);
        let projected_visitor_increase = match (projected_event_visitors, base.baseline_daily_visitors)
        {
            (Some(event_visitors), Some(baseline)) if baseline > 0.0 => {
                Some((event_visitors - baseline) / baseline * 100.0)
            }
            _ => base.visitor_increase_pct,
        };

        // Prices respond to demand, but not linearly
        let price_multiplier = 1.0 + (params.attendance_change_pct / 100.0) * params.price_elasticity;
        let projected_price = base.event_hotel_price_usd.map(|p| p * price_multiplier);
        let projected_price_increase = match (projected_price, base.baseline_hotel_price_usd) {
            (Some(price), Some(baseline)) if baseline > 0.0 => {
                Some((price - baseline) / baseline * 100.0)
            }
            _ => base.hotel_price_increase_pct,
        };

        // Occupancy, capped at full
        let projected_occupancy = match (base.event_occupancy_pct, base.baseline_occupancy_pct) {
            (Some(event_occupancy), Some(baseline)) => {
                let boost_change =
                    (params.attendance_change_pct / 100.0) * (event_occupancy - baseline);
                Some((event_occupancy + boost_change).min(100.0))
            }
            _ => base.event_occupancy_pct,
        };
        let projected_boost = match (projected_occupancy, base.baseline_occupancy_pct) {
            (Some(occupancy), Some(baseline)) => Some(occupancy - baseline),
            _ => base.occupancy_boost_pts,
        };

        // Spending-derived figures all scale together
        let projected_direct = base.direct_spending_usd.map(|d| d * spending_factor);
        let projected_total = projected_direct.map(|direct| {
            direct
                * (1.0
                    + self.constants.analyzer_indirect_share
                    + self.constants.analyzer_induced_share)
        });
        let projected_total =
            projected_total.or_else(|| base.total_economic_impact_usd.map(|t| t * spending_factor));
        let projected_jobs = base.jobs_created.map(|j| j * spending_factor);
        let projected_roi = match (projected_total, base.event_cost_usd) {
            (Some(total), Some(cost)) if cost > 0.0 => Some(total / cost),
            _ => base.roi_ratio,
        };

        let base_outcome = ScenarioOutcome {
            scenario_name: "Current/Historical".to_string(),
            attendance: base.attendance,
            additional_visitors: base.additional_visitors,
            visitor_increase_pct: base.visitor_increase_pct,
            avg_price_usd: base.event_hotel_price_usd,
            price_increase_pct: base.hotel_price_increase_pct,
            occupancy_pct: base.event_occupancy_pct,
            occupancy_boost_pts: base.occupancy_boost_pts,
            total_economic_impact_usd: base.total_economic_impact_usd,
            jobs_created: base.jobs_created,
            roi_ratio: base.roi_ratio,
        };
        let projected_outcome = ScenarioOutcome {
            scenario_name: format!("Attendance {:+.0}%", params.attendance_change_pct),
            attendance: base.attendance.map(|a| a * attendance_multiplier),
            additional_visitors: projected_additional,
            visitor_increase_pct: projected_visitor_increase,
            avg_price_usd: projected_price,
            price_increase_pct: projected_price_increase,
            occupancy_pct: projected_occupancy,
            occupancy_boost_pts: projected_boost,
            total_economic_impact_usd: projected_total,
            jobs_created: projected_jobs,
            roi_ratio: projected_roi,
        };
        let changes_pct = outcome_changes(&base_outcome, &projected_outcome);

        Ok(ScenarioComparison {
            event: event.name.to_string(),
            params: *params,
            base: base_outcome,
            projected: projected_outcome,
            changes_pct,
        })
    }

    /// Project an event's impact over several years of compounding-free
    /// annual attendance growth
    pub fn simulate_growth(
        &self,
        event_name: &str,
        years: u32,
        annual_growth_pct: f64,
    ) -> Result<Vec<GrowthYear>> {
        (1..=years)
            .map(|year| {
                let cumulative_growth_pct = annual_growth_pct * year as f64;
                let comparison = self.simulate_attendance_change(
                    event_name,
                    &ScenarioParams {
                        attendance_change_pct: cumulative_growth_pct,
                        ..ScenarioParams::default()
                    },
                )?;

                Ok(GrowthYear {
                    year,
                    cumulative_growth_pct,
                    outcome: comparison.projected,
                })
            })
            .collect()
    }

    /// Estimate a brand-new event by scaling a reference event's impact by
    /// the attendance and duration ratios, or by industry defaults when no
    /// reference is given
    pub fn simulate_new_event(
        &self,
        expected_attendance: f64,
        duration_days: f64,
        reference_event: Option<&str>,
    ) -> Result<ScenarioOutcome> {
        if let Some(reference_name) = reference_event {
            let reference = self.dataset.event(reference_name)?;
            let impact = self.base_impact(reference_name)?;

            let attendance_ratio = match reference.attendance() {
                Some(reference_attendance) if reference_attendance > 0 => {
                    expected_attendance / reference_attendance as f64
                }
                _ => 1.0,
            };
            let duration_ratio = duration_days / reference.duration_days() as f64;
            let combined = attendance_ratio * duration_ratio;

            return Ok(ScenarioOutcome {
                scenario_name: format!("Scaled from {reference_name}"),
                attendance: Some(expected_attendance),
                additional_visitors: impact.additional_visitors.map(|v| v * combined),
                visitor_increase_pct: impact.visitor_increase_pct.map(|v| v * attendance_ratio),
                avg_price_usd: impact.event_hotel_price_usd,
                price_increase_pct: impact
                    .hotel_price_increase_pct
                    .map(|p| p * attendance_ratio),
                occupancy_pct: impact.event_occupancy_pct,
                occupancy_boost_pts: impact
                    .occupancy_boost_pts
                    .map(|b| (b * attendance_ratio).min(100.0)),
                total_economic_impact_usd: impact
                    .total_economic_impact_usd
                    .map(|t| t * combined),
                jobs_created: impact.jobs_created.map(|j| j * combined),
                roi_ratio: impact.roi_ratio,
            });
        }

        // No reference: industry rules of thumb
        Ok(ScenarioOutcome {
            scenario_name: "Industry averages".to_string(),
            attendance: Some(expected_attendance),
            additional_visitors: Some(expected_attendance * 0.7),
            visitor_increase_pct: None,
            avg_price_usd: None,
            price_increase_pct: Some(15.0),
            occupancy_pct: None,
            occupancy_boost_pts: Some(20.0),
            total_economic_impact_usd: Some(expected_attendance * 300.0),
            jobs_created: Some(expected_attendance / 100.0),
            roi_ratio: None,
        })
    }
}

/// Relative change per figure between two outcomes, in percent
fn outcome_changes(
    base: &ScenarioOutcome,
    projected: &ScenarioOutcome,
) -> IndexMap<&'static str, f64> {
    let pairs: [(&'static str, Option<f64>, Option<f64>); 7] = [
        ("attendance", base.attendance, projected.attendance),
        (
            "additional_visitors",
            base.additional_visitors,
            projected.additional_visitors,
        ),
        ("avg_price_usd", base.avg_price_usd, projected.avg_price_usd),
        ("occupancy_pct", base.occupancy_pct, projected.occupancy_pct),
        (
            "total_economic_impact_usd",
            base.total_economic_impact_usd,
            projected.total_economic_impact_usd,
        ),
        ("jobs_created", base.jobs_created, projected.jobs_created),
        ("roi_ratio", base.roi_ratio, projected.roi_ratio),
    ];

    pairs
        .into_iter()
        .filter_map(|(name, base, projected)| {
            let base = base?;
            let projected = projected?;
            (base != 0.0).then(|| (name, (projected - base) / base * 100.0))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::dataset;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_attendance_change_scales_spending(dataset: Dataset) {
        let simulator = ScenarioSimulator::new(&dataset);
        let comparison = simulator
            .simulate_attendance_change(
                "Atlantic Song Festival",
                &ScenarioParams {
                    attendance_change_pct: 50.0,
                    ..ScenarioParams::default()
                },
            )
            .unwrap();

        let base_total = comparison.base.total_economic_impact_usd.unwrap();
        let projected_total = comparison.projected.total_economic_impact_usd.unwrap();
        assert!(projected_total > base_total);
        assert_approx_eq!(
            f64,
            comparison.changes_pct["total_economic_impact_usd"],
            50.0,
            epsilon = 1e-6
        );
    }

    #[rstest]
    fn test_occupancy_capped_at_100(dataset: Dataset) {
        let simulator = ScenarioSimulator::new(&dataset);
        let comparison = simulator
            .simulate_attendance_change(
                "Atlantic Song Festival",
                &ScenarioParams {
                    attendance_change_pct: 500.0,
                    ..ScenarioParams::default()
                },
            )
            .unwrap();
        assert!(comparison.projected.occupancy_pct.unwrap() <= 100.0);
    }

    #[rstest]
    fn test_price_elasticity_dampens_price(dataset: Dataset) {
        let simulator = ScenarioSimulator::new(&dataset);
        let comparison = simulator
            .simulate_attendance_change(
                "Atlantic Song Festival",
                &ScenarioParams {
                    attendance_change_pct: 100.0,
                    price_elasticity: 0.3,
                    spending_multiplier: 1.0,
                },
            )
            .unwrap();
        // A 100% attendance rise lifts prices by only 30%
        assert_approx_eq!(
            f64,
            comparison.projected.avg_price_usd.unwrap(),
            comparison.base.avg_price_usd.unwrap() * 1.3,
            epsilon = 1e-6
        );
    }

    #[rstest]
    fn test_growth_projection_years(dataset: Dataset) {
        let simulator = ScenarioSimulator::new(&dataset);
        let years = simulator
            .simulate_growth("Atlantic Song Festival", 3, 10.0)
            .unwrap();
        assert_eq!(years.len(), 3);
        assert_approx_eq!(f64, years[2].cumulative_growth_pct, 30.0);
    }

    #[rstest]
    fn test_new_event_without_reference_uses_defaults(dataset: Dataset) {
        let simulator = ScenarioSimulator::new(&dataset);
        let outcome = simulator.simulate_new_event(10_000.0, 2.0, None).unwrap();
        assert_approx_eq!(
            f64,
            outcome.total_economic_impact_usd.unwrap(),
            3_000_000.0
        );
        assert_approx_eq!(f64, outcome.jobs_created.unwrap(), 100.0);
    }

    #[rstest]
    fn test_new_event_scales_reference(dataset: Dataset) {
        let simulator = ScenarioSimulator::new(&dataset);
        let outcome = simulator
            .simulate_new_event(60_000.0, 3.0, Some("Atlantic Song Festival"))
            .unwrap();
        assert!(outcome.total_economic_impact_usd.is_some());
        assert_eq!(outcome.attendance, Some(60_000.0));
    }
}
