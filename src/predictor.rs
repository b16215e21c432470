//! Online prediction against a trained artifact: full-feature requests,
//! minimal-input requests backed by analogous historical events, and the
//! derived jobs/ROI/breakdown figures.
use crate::artifact::TrainedArtifact;
use crate::comparator::{self, ComparatorOptions, MetricComparison, keys};
use crate::dataset::Dataset;
use crate::event::{Event, EventType};
use crate::features::{EventFeatures, to_model_row};
use crate::impact::EventImpact;
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use log::debug;
use serde::Serialize;

/// The empirical constants behind the derived figures.
///
/// The spending shares, the 1.7x baseline multiplier and the assumed 4:1
/// ROI are observed industry figures without a derivation shown; they still
/// need calibration against real data. Override them by constructing the
/// struct.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactConstants {
    /// Share of the total impact attributed to direct spending
    pub direct_share: f64,
    /// Share attributed to supply-chain (indirect) spending
    pub indirect_share: f64,
    /// Share attributed to induced (re-spent wage) spending
    pub induced_share: f64,
    /// Multiplier from observed spending to total impact in the analyzer
    /// (indirect spending as a share of direct)
    pub analyzer_indirect_share: f64,
    /// Induced spending as a share of direct, in the analyzer
    pub analyzer_induced_share: f64,
    /// Multiplier applied to baseline visitor spending when estimating a
    /// "normal week" impact
    pub baseline_impact_multiplier: f64,
    /// ROI assumed when no real event cost is known
    pub assumed_roi_ratio: f64,
    /// Working days per year, for duration-adjusting the jobs ratio
    pub working_days_per_year: f64,
    /// Dollars of impact per job when no city or event-type ratio applies
    pub default_jobs_ratio_usd: f64,
    /// Width factor of the confidence band, in training-MAPE units
    pub confidence_mape_factor: f64,
    /// Spending per visitor per day assumed for ordinary (non-event) tourism
    pub baseline_spending_per_visitor_usd: f64,
    /// Visitor increase assumed when no historical reference yields one
    pub default_visitor_increase_pct: f64,
    /// Price increase assumed when no historical reference yields one
    pub default_price_increase_pct: f64,
    /// Occupancy boost (percentage points) assumed when no historical
    /// reference yields one
    pub default_occupancy_boost_pts: f64,
    /// Attendance per day assumed when no historical reference yields one
    pub default_attendance_per_day: f64,
    /// Impact per day assumed when no historical reference yields one
    pub default_impact_per_day_usd: f64,
    /// Attendance assumed when a full-feature request omits it
    pub default_attendance: f64,
}

impl Default for ImpactConstants {
    fn default() -> Self {
        Self {
            direct_share: 0.64,
            indirect_share: 0.25,
            induced_share: 0.11,
            analyzer_indirect_share: 0.40,
            analyzer_induced_share: 0.30,
            baseline_impact_multiplier: 1.7,
            assumed_roi_ratio: 4.0,
            working_days_per_year: 250.0,
            default_jobs_ratio_usd: 40_000.0,
            confidence_mape_factor: 1.5,
            baseline_spending_per_visitor_usd: 150.0,
            default_visitor_increase_pct: 50.0,
            default_price_increase_pct: 60.0,
            default_occupancy_boost_pts: 15.0,
            default_attendance_per_day: 50_000.0,
            default_impact_per_day_usd: 50_000_000.0,
            default_attendance: 50_000.0,
        }
    }
}

/// Dollars of impact per job for cities with an analysed history. Cities
/// with a higher cost of living create jobs at a higher cost per job.
fn city_jobs_ratio_usd(city: &str) -> Option<f64> {
    let ratio = match city {
        "Paris" => 47_475.0,
        "New York" => 43_102.0,
        "Berlin" => 42_426.0,
        "London" => 41_727.0,
        "Madrid" => 40_383.0,
        "Tokyo" => 40_315.0,
        "Rio de Janeiro" => 40_027.0,
        "Barcelona" | "Amsterdam" => 40_009.0,
        "Dubai" | "São Paulo" => 40_007.0,
        "Sydney" => 40_006.0,
        "Singapore" | "Miami" => 40_005.0,
        "Los Angeles" => 40_002.0,
        "Chicago" => 40_001.0,
        _ => return None,
    };

    Some(ratio)
}

/// Dollars of impact per job by event type, for cities without their own
/// ratio
fn event_type_jobs_ratio_usd(event_type: EventType) -> Option<f64> {
    let ratio = match event_type {
        EventType::Sports => 43_398.0,
        EventType::Music => 40_243.0,
        EventType::Culture => 41_085.0,
        EventType::Festival => 40_966.0,
        EventType::Conference => 40_005.0,
        EventType::Fair => 40_007.0,
        EventType::Business | EventType::Other => return None,
    };

    Some(ratio)
}

/// A full-feature prediction request. Only `event_type`, `city` and
/// `duration_days` are mandatory; anything else the predictor fills from
/// per-field defaults.
#[derive(Debug, Clone, Default)]
pub struct PredictionRequest {
    /// The planned event's type
    pub event_type: Option<EventType>,
    /// The host city (must exist in the catalog)
    pub city: String,
    /// Planned duration in days
    pub duration_days: f64,
    /// Expected attendance, if known
    pub attendance: Option<f64>,
    /// Raw metric overrides; any field left `None` is defaulted
    pub overrides: EventFeatures,
}

/// The point estimate and its heuristic confidence band.
///
/// The band is `prediction * (1 +/- factor * trainingMAPE)`: an error-scaled
/// heuristic, not a statistical prediction interval.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PredictionBand {
    /// The point estimate
    pub total_economic_impact_usd: f64,
    /// Lower edge of the band (clamped at zero)
    pub lower_bound_usd: f64,
    /// Upper edge of the band
    pub upper_bound_usd: f64,
    /// Nominal confidence label for the band
    pub confidence_level: String,
}

/// Fixed-ratio split of the total impact
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SpendingBreakdown {
    /// Direct spending share
    pub direct_spending_usd: f64,
    /// Indirect (supply chain) share
    pub indirect_spending_usd: f64,
    /// Induced (re-spent wages) share
    pub induced_spending_usd: f64,
}

/// Jobs, cost and ROI figures derived from the point estimate
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DerivedEstimates {
    /// Jobs supported by the impact over the event's duration
    pub jobs_created: u64,
    /// The duration-adjusted dollars-per-job ratio used
    pub jobs_ratio_usd: f64,
    /// The annual dollars-per-job ratio before duration adjustment
    pub jobs_ratio_base_usd: f64,
    /// Impact over cost
    pub roi_ratio: f64,
    /// The event cost implied by the assumed ROI
    pub estimated_event_cost_usd: f64,
}

/// Which model produced the estimate, and how good it was in training
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModelInfo {
    /// The canonical algorithm
    pub model_used: String,
    /// Held-out R² of that model
    pub model_r2: f64,
    /// Held-out MAPE of that model, in percent
    pub model_mape: f64,
}

/// Echo of the request, plus how much of it was synthesized
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InputSummary {
    /// The requested event type
    pub event_type: String,
    /// The requested city
    pub city: String,
    /// The attendance used (supplied or estimated)
    pub attendance: f64,
    /// The requested duration
    pub duration_days: f64,
    /// Whether attendance was estimated from historical events
    pub estimated_from_historical: bool,
    /// The continent used to scope the historical reference, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_continent: Option<String>,
}

/// The historical population a minimal-input prediction was synthesized from
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HistoricalReference {
    /// Human-readable scope, e.g. "Europe (4 events)" or "Global (9 events)"
    pub reference_scope: String,
    /// Number of reference events averaged
    pub events_analyzed: usize,
    /// Mean visitor increase across the reference events
    pub avg_visitor_increase_pct: f64,
    /// Mean hotel price increase across the reference events
    pub avg_price_increase_pct: f64,
    /// Mean occupancy boost across the reference events, in points
    pub avg_occupancy_boost_pts: f64,
    /// Mean attendance per day across the reference events
    pub avg_attendance_per_day: f64,
    /// Mean impact per day across the reference events
    pub avg_impact_per_day_usd: f64,
    /// Up to five example reference events
    pub similar_events: Vec<String>,
}

/// The predicted event-period impact against an estimated "normal week" for
/// the same city and duration
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BaselineComparison {
    /// Estimated impact of an ordinary period of the same length
    pub baseline_period_impact_usd: f64,
    /// The predicted event impact
    pub event_impact_usd: f64,
    /// Event impact minus baseline impact
    pub additional_impact_usd: f64,
    /// Event impact over baseline impact
    pub impact_multiplier: f64,
    /// Event impact relative to baseline, in percent
    pub impact_increase_pct: f64,
    /// The city's ordinary daily visitor count
    pub baseline_daily_visitors: f64,
    /// The city's ordinary daily visitor spending
    pub baseline_daily_spending_usd: f64,
    /// The duration both figures cover
    pub duration_days: f64,
}

/// A complete prediction report: the stable output shape of the predictor
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PredictionReport {
    /// Point estimate and confidence band
    pub prediction: PredictionBand,
    /// Fixed-ratio spending breakdown
    pub breakdown: SpendingBreakdown,
    /// Jobs, cost and ROI derivations
    pub estimates: DerivedEstimates,
    /// Model identity and training quality
    pub model_info: ModelInfo,
    /// Echo of the inputs used
    pub input_summary: InputSummary,
    /// Present for minimal-input predictions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub historical_reference: Option<HistoricalReference>,
    /// Present for minimal-input predictions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_comparison: Option<BaselineComparison>,
}

/// One historical event usable as an analogue: its catalog entry, its
/// impact record and its city's continent
struct Reference<'a> {
    event: &'a Event,
    impact: &'a EventImpact,
    continent: &'a str,
}

/// The online predictor.
///
/// Holds the loaded artifact and dataset as an explicit, read-only handle:
/// a predictor cannot exist without a trained model, so "predict before
/// train" is unrepresentable, and concurrent requests share the state
/// immutably.
pub struct Predictor {
    artifact: TrainedArtifact,
    dataset: Dataset,
    constants: ImpactConstants,
    comparator_options: ComparatorOptions,
}

impl Predictor {
    /// Create a predictor over a loaded artifact and dataset
    pub fn new(artifact: TrainedArtifact, dataset: Dataset) -> Self {
        Self {
            artifact,
            dataset,
            constants: ImpactConstants::default(),
            comparator_options: ComparatorOptions::default(),
        }
    }

    /// Replace the derived-figure constants
    pub fn with_constants(mut self, constants: ImpactConstants) -> Self {
        self.constants = constants;
        self
    }

    /// Replace the comparison-window options used for historical lookups
    pub fn with_comparator_options(mut self, options: ComparatorOptions) -> Self {
        self.comparator_options = options;
        self
    }

    /// The loaded artifact
    pub fn artifact(&self) -> &TrainedArtifact {
        &self.artifact
    }

    /// Full-feature prediction.
    ///
    /// Builds the feature vector in the artifact's training-time column
    /// order, scales it with the persisted scaler, predicts in log-space and
    /// inverts. Fields the request leaves unset are filled from per-field
    /// defaults, not refit.
    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionReport> {
        ensure!(
            request.duration_days >= 1.0,
            "duration_days must be at least 1, got {}",
            request.duration_days
        );
        let city = self.dataset.city(&request.city)?;
        let constants = &self.constants;

        let event_type = request.event_type.unwrap_or(EventType::Other);
        let attendance = request.attendance.unwrap_or(constants.default_attendance);
        let duration_days = request.duration_days;

        // Estimate the demand-shift features not supplied by the caller
        let visitor_increase_pct = request.overrides.visitor_increase_pct.unwrap_or_else(|| {
            (attendance / city.baseline_daily_visitors().max(1.0) * 100.0).min(100.0)
        });
        let hotel_price_increase_pct = request
            .overrides
            .hotel_price_increase_pct
            .unwrap_or_else(|| (visitor_increase_pct * 0.8).min(150.0));
        let occupancy_boost_pts = request
            .overrides
            .occupancy_boost_pts
            .unwrap_or_else(|| (visitor_increase_pct * 0.3).min(25.0));

        let mut features = EventFeatures::default();
        features.set_core(attendance, duration_days, city);
        features.event_type_code = Some(
            self.artifact
                .event_type_encoder
                .encode(&event_type.to_string()),
        );
        features.visitor_increase_pct = Some(visitor_increase_pct);
        features.hotel_price_increase_pct = Some(hotel_price_increase_pct);
        features.occupancy_boost_pts = Some(occupancy_boost_pts);
        features.daily_spending_increase_pct =
            Some(request.overrides.daily_spending_increase_pct.unwrap_or(0.0));
        features.airport_arrivals_increase_pct = Some(
            request
                .overrides
                .airport_arrivals_increase_pct
                .unwrap_or(0.0),
        );
        features.event_avg_hotel_price = Some(
            request
                .overrides
                .event_avg_hotel_price
                .unwrap_or(city.avg_hotel_price_usd),
        );
        features.event_max_hotel_price = Some(
            request
                .overrides
                .event_max_hotel_price
                .unwrap_or(city.avg_hotel_price_usd * 1.5),
        );
        features.baseline_avg_spending_per_visitor = Some(
            request
                .overrides
                .baseline_avg_spending_per_visitor
                .unwrap_or(constants.baseline_spending_per_visitor_usd),
        );
        features.event_avg_accommodation_spending = Some(
            request
                .overrides
                .event_avg_accommodation_spending
                .unwrap_or(0.0),
        );
        features.event_avg_public_transport =
            Some(request.overrides.event_avg_public_transport.unwrap_or(0.0));

        // The artifact's column list and order are authoritative here
        let row = to_model_row(&features, &self.artifact.feature_columns);
        let scaled = self.artifact.scaler.transform_row(&row);
        let prediction = self.artifact.best_model().predict(&scaled).exp_m1().max(0.0);
        debug!(
            "Predicted ${prediction:.0} for a {duration_days}-day {event_type} event in {}",
            city.name
        );

        // Error-scaled heuristic band, not a statistical interval
        let mape_fraction = self.artifact.best_metrics().mape / 100.0;
        let margin = mape_fraction * constants.confidence_mape_factor;
        let band = PredictionBand {
            total_economic_impact_usd: prediction,
            lower_bound_usd: (prediction * (1.0 - margin)).max(0.0),
            upper_bound_usd: prediction * (1.0 + margin),
            confidence_level: "90%".to_string(),
        };

        let breakdown = SpendingBreakdown {
            direct_spending_usd: prediction * constants.direct_share,
            indirect_spending_usd: prediction * constants.indirect_share,
            induced_spending_usd: prediction * constants.induced_share,
        };

        // The annual per-job ratio is scaled to the event's duration: a
        // 1-day event supports a job for 1 of the ~250 working days a year
        let jobs_ratio_base_usd = city_jobs_ratio_usd(&request.city)
            .or_else(|| event_type_jobs_ratio_usd(event_type))
            .unwrap_or(constants.default_jobs_ratio_usd);
        let jobs_ratio_usd =
            jobs_ratio_base_usd / constants.working_days_per_year * duration_days;
        let jobs_created = (prediction / jobs_ratio_usd) as u64;

        let estimated_event_cost_usd = prediction / constants.assumed_roi_ratio;
        let estimates = DerivedEstimates {
            jobs_created,
            jobs_ratio_usd,
            jobs_ratio_base_usd,
            roi_ratio: constants.assumed_roi_ratio,
            estimated_event_cost_usd,
        };

        let best_metrics = self.artifact.best_metrics();
        Ok(PredictionReport {
            prediction: band,
            breakdown,
            estimates,
            model_info: ModelInfo {
                model_used: self.artifact.best.to_string(),
                model_r2: best_metrics.r2,
                model_mape: best_metrics.mape,
            },
            input_summary: InputSummary {
                event_type: event_type.to_string(),
                city: request.city.clone(),
                attendance,
                duration_days,
                estimated_from_historical: false,
                reference_continent: None,
            },
            historical_reference: None,
            baseline_comparison: None,
        })
    }

    /// Minimal-input prediction: only event type, city and duration are
    /// required.
    ///
    /// Unknown inputs are synthesized by averaging historical events of the
    /// same type, preferring the city's continent when at least two such
    /// events exist there and falling back to the global population of the
    /// type otherwise.
    pub fn predict_simple(
        &self,
        event_type: EventType,
        city_name: &str,
        duration_days: f64,
        attendance: Option<f64>,
    ) -> Result<PredictionReport> {
        let city = self.dataset.city(city_name)?;
        self.dataset.ensure_event_type_known(event_type)?;
        let constants = &self.constants;
        let continent = city.continent.clone();

        // Historical events of this type with impact records
        let all_references: Vec<Reference> = self
            .dataset
            .events_of_type(event_type)
            .into_iter()
            .filter_map(|event| {
                let impact = self.dataset.impacts.get(&event.name)?;
                let continent = self
                    .dataset
                    .cities
                    .get(&event.city)
                    .map(|c| c.continent.as_str())?;
                Some(Reference {
                    event,
                    impact,
                    continent,
                })
            })
            .collect();

        // Same-continent analogues need at least two members to count as a
        // reference population
        let same_continent: Vec<&Reference> = all_references
            .iter()
            .filter(|r| r.continent == continent)
            .collect();
        let (references, reference_scope) = if same_continent.len() >= 2 {
            let scope = format!("{continent} ({} events)", same_continent.len());
            (same_continent, scope)
        } else {
            let scope = format!("Global ({} events)", all_references.len());
            (all_references.iter().collect::<Vec<_>>(), scope)
        };

        // Plain averages over the reference population
        let avg_attendance_per_day = average(references.iter().filter_map(|r| {
            let att = r.impact.attendance.or(r.event.attendance().map(|a| a as f64))?;
            let dur = r
                .impact
                .duration_days
                .unwrap_or(r.event.duration_days() as f64);
            Some(att / dur.max(1.0))
        }))
        .unwrap_or(constants.default_attendance_per_day);
        let avg_impact_per_day = average(references.iter().filter_map(|r| {
            let total = r.impact.total_economic_impact_usd?;
            let dur = r
                .impact
                .duration_days
                .unwrap_or(r.event.duration_days() as f64);
            Some(total / dur.max(1.0))
        }))
        .unwrap_or(constants.default_impact_per_day_usd);

        // Averaged window comparisons across the reference events
        let avg_comparison = self.average_reference_comparisons(&references);

        let avg_visitor_increase = derived_or(
            &avg_comparison,
            keys::EVENT_AVG_TOTAL_VISITORS,
            keys::BASELINE_AVG_TOTAL_VISITORS,
            average(references.iter().filter_map(|r| r.impact.visitor_increase_pct)),
        )
        .unwrap_or(constants.default_visitor_increase_pct);
        let avg_price_increase = derived_or(
            &avg_comparison,
            keys::EVENT_AVG_HOTEL_PRICE,
            keys::BASELINE_AVG_HOTEL_PRICE,
            average(
                references
                    .iter()
                    .filter_map(|r| r.impact.hotel_price_increase_pct),
            ),
        )
        .unwrap_or(constants.default_price_increase_pct);
        let avg_occupancy_boost = avg_comparison
            .get(keys::OCCUPANCY_BOOST_PTS)
            .copied()
            .or_else(|| {
                average(references.iter().filter_map(|r| {
                    r.impact.occupancy_boost_pts.or_else(|| {
                        Some(r.impact.event_occupancy_pct? - r.impact.baseline_occupancy_pct?)
                    })
                }))
            })
            .unwrap_or(constants.default_occupancy_boost_pts);

        let estimated_from_historical = attendance.is_none();
        let attendance =
            attendance.unwrap_or_else(|| avg_attendance_per_day * duration_days.max(1.0));

        // Synthesize the full request from the historical averages. The
        // window means come first; the change figures derived above then
        // take precedence over per-event averaged changes.
        let mut overrides = EventFeatures::default();
        overrides.apply_comparison(&avg_comparison);
        overrides.visitor_increase_pct = Some(avg_visitor_increase);
        overrides.hotel_price_increase_pct = Some(avg_price_increase);
        overrides.occupancy_boost_pts = Some(avg_occupancy_boost);
        overrides.daily_spending_increase_pct = Some(
            derived_or(
                &avg_comparison,
                keys::EVENT_AVG_DAILY_SPENDING,
                keys::BASELINE_AVG_DAILY_SPENDING,
                None,
            )
            .unwrap_or(0.0),
        );
        overrides.airport_arrivals_increase_pct = Some(
            derived_or(
                &avg_comparison,
                keys::EVENT_AVG_AIRPORT_ARRIVALS,
                keys::BASELINE_AVG_AIRPORT_ARRIVALS,
                None,
            )
            .unwrap_or(0.0),
        );

        let request = PredictionRequest {
            event_type: Some(event_type),
            city: city_name.to_string(),
            duration_days,
            attendance: Some(attendance),
            overrides,
        };
        let mut report = self.predict(&request)?;

        // Contrast against an ordinary period of the same length
        let baseline_daily_visitors = city.baseline_daily_visitors();
        let baseline_daily_spending_usd =
            baseline_daily_visitors * constants.baseline_spending_per_visitor_usd;
        let baseline_period_impact_usd = baseline_daily_spending_usd
            * duration_days
            * constants.baseline_impact_multiplier;
        let event_impact_usd = report.prediction.total_economic_impact_usd;
        let (impact_multiplier, impact_increase_pct) = if baseline_period_impact_usd > 0.0 {
            (
                event_impact_usd / baseline_period_impact_usd,
                (event_impact_usd / baseline_period_impact_usd - 1.0) * 100.0,
            )
        } else {
            (0.0, 0.0)
        };
        report.baseline_comparison = Some(BaselineComparison {
            baseline_period_impact_usd,
            event_impact_usd,
            additional_impact_usd: event_impact_usd - baseline_period_impact_usd,
            impact_multiplier,
            impact_increase_pct,
            baseline_daily_visitors,
            baseline_daily_spending_usd,
            duration_days,
        });

        report.historical_reference = Some(HistoricalReference {
            reference_scope,
            events_analyzed: references.len(),
            avg_visitor_increase_pct: avg_visitor_increase,
            avg_price_increase_pct: avg_price_increase,
            avg_occupancy_boost_pts: avg_occupancy_boost,
            avg_attendance_per_day,
            avg_impact_per_day_usd: avg_impact_per_day,
            similar_events: references
                .iter()
                .take(5)
                .map(|r| r.event.name.to_string())
                .collect(),
        });
        report.input_summary.estimated_from_historical = estimated_from_historical;
        report.input_summary.reference_continent = Some(continent);

        Ok(report)
    }

    /// Average each derived metric over the reference events' window
    /// comparisons
    fn average_reference_comparisons(&self, references: &[&Reference]) -> MetricComparison {
        let mut sums: IndexMap<&'static str, (f64, usize)> = IndexMap::new();
        for reference in references {
            let cmp = comparator::compare_event(
                &self.dataset.metrics,
                reference.event,
                &self.comparator_options,
            );
            for (key, value) in cmp {
                let entry = sums.entry(key).or_insert((0.0, 0));
                entry.0 += value;
                entry.1 += 1;
            }
        }

        sums.into_iter()
            .map(|(key, (sum, count))| (key, sum / count as f64))
            .collect()
    }
}

/// Mean of an iterator of values, `None` when empty or non-finite
fn average(values: impl Iterator<Item = f64>) -> Option<f64> {
    let values: Vec<f64> = values.filter(|v| v.is_finite()).collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Relative change recomputed from two averaged window means, falling back
/// to `fallback` when the means are unavailable or degenerate
fn derived_or(
    comparison: &MetricComparison,
    event_key: &'static str,
    baseline_key: &'static str,
    fallback: Option<f64>,
) -> Option<f64> {
    match (comparison.get(event_key), comparison.get(baseline_key)) {
        (Some(&event_mean), Some(&baseline_mean)) if baseline_mean > 0.0 => {
            Some(comparator::relative_change_pct(event_mean, baseline_mean))
        }
        _ => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{predictor, trained};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_unknown_city_is_hard_failure(predictor: Predictor) {
        let request = PredictionRequest {
            event_type: Some(EventType::Music),
            city: "Atlantis".to_string(),
            duration_days: 3.0,
            ..Default::default()
        };
        let error = predictor.predict(&request).unwrap_err().to_string();
        assert!(error.contains("Available: Lisbon, Porto, Osaka"));
    }

    #[rstest]
    fn test_unseen_event_type_still_predicts(predictor: Predictor) {
        // "fair" was never in the training data; the fallback encoding must
        // produce a valid numeric prediction, not an error
        let request = PredictionRequest {
            event_type: Some(EventType::Fair),
            city: "Lisbon".to_string(),
            duration_days: 2.0,
            attendance: Some(30_000.0),
            ..Default::default()
        };
        let report = predictor.predict(&request).unwrap();
        assert!(report.prediction.total_economic_impact_usd.is_finite());
        assert!(report.prediction.total_economic_impact_usd >= 0.0);
    }

    #[rstest]
    fn test_prediction_is_idempotent(predictor: Predictor) {
        let request = PredictionRequest {
            event_type: Some(EventType::Music),
            city: "Lisbon".to_string(),
            duration_days: 3.0,
            attendance: Some(120_000.0),
            ..Default::default()
        };
        let a = predictor.predict(&request).unwrap();
        let b = predictor.predict(&request).unwrap();
        assert_eq!(a, b); // bit-identical: no hidden randomness at inference
    }

    #[rstest]
    fn test_confidence_band_brackets_prediction(predictor: Predictor) {
        let request = PredictionRequest {
            event_type: Some(EventType::Music),
            city: "Lisbon".to_string(),
            duration_days: 3.0,
            attendance: Some(120_000.0),
            ..Default::default()
        };
        let report = predictor.predict(&request).unwrap();
        let band = &report.prediction;
        assert!(band.lower_bound_usd <= band.total_economic_impact_usd);
        assert!(band.total_economic_impact_usd <= band.upper_bound_usd);
        assert!(band.lower_bound_usd >= 0.0);
    }

    #[rstest]
    fn test_breakdown_uses_documented_shares(predictor: Predictor) {
        let request = PredictionRequest {
            event_type: Some(EventType::Music),
            city: "Lisbon".to_string(),
            duration_days: 3.0,
            attendance: Some(120_000.0),
            ..Default::default()
        };
        let report = predictor.predict(&request).unwrap();
        let total = report.prediction.total_economic_impact_usd;
        assert_approx_eq!(f64, report.breakdown.direct_spending_usd, total * 0.64);
        assert_approx_eq!(f64, report.breakdown.indirect_spending_usd, total * 0.25);
        assert_approx_eq!(f64, report.breakdown.induced_spending_usd, total * 0.11);
    }

    #[test]
    fn test_jobs_ratio_duration_adjustment() {
        // $40M impact, $40k/job annual ratio, 1-day event:
        // 40_000_000 / ((40_000 / 250) * 1) = 250_000 jobs
        let constants = ImpactConstants::default();
        let ratio = constants.default_jobs_ratio_usd / constants.working_days_per_year * 1.0;
        assert_approx_eq!(f64, 40_000_000.0 / ratio, 250_000.0);
    }

    #[rstest]
    fn test_simple_prediction_attaches_reference(predictor: Predictor) {
        let report = predictor
            .predict_simple(EventType::Music, "Lisbon", 3.0, None)
            .unwrap();
        let reference = report.historical_reference.unwrap();
        assert!(reference.events_analyzed >= 2);
        assert!(reference.reference_scope.starts_with("Europe"));
        assert!(reference.similar_events.len() <= 5);
        assert!(report.input_summary.estimated_from_historical);
        assert!(report.baseline_comparison.is_some());
    }

    #[rstest]
    fn test_simple_prediction_falls_back_to_global(predictor: Predictor) {
        // Only one sports event exists in Asia, so an Asian request must
        // fall back to the global population of that type
        let report = predictor
            .predict_simple(EventType::Sports, "Osaka", 1.0, Some(30_000.0))
            .unwrap();
        let reference = report.historical_reference.unwrap();
        assert!(reference.reference_scope.starts_with("Global"));
        assert!(!report.input_summary.estimated_from_historical);
    }

    #[rstest]
    fn test_simple_prediction_zero_references_uses_defaults(predictor: Predictor) {
        // A conference exists in the catalog but has no impact record in
        // any continent: the synthesis falls back to the documented numeric
        // defaults instead of failing or propagating NaN
        let report = predictor
            .predict_simple(EventType::Conference, "Lisbon", 2.0, None)
            .unwrap();
        let reference = report.historical_reference.unwrap();
        assert_eq!(reference.events_analyzed, 0);
        assert!(reference.reference_scope.starts_with("Global"));
        assert_approx_eq!(f64, reference.avg_visitor_increase_pct, 50.0);
        assert_approx_eq!(f64, reference.avg_price_increase_pct, 60.0);
        assert_approx_eq!(f64, reference.avg_occupancy_boost_pts, 15.0);
        assert_approx_eq!(f64, report.input_summary.attendance, 100_000.0);
        assert!(report.prediction.total_economic_impact_usd.is_finite());
    }

    #[rstest]
    fn test_simple_prediction_unknown_type_names_valid_set(predictor: Predictor) {
        let error = predictor
            .predict_simple(EventType::Fair, "Lisbon", 2.0, None)
            .unwrap_err()
            .to_string();
        assert!(error.contains("No historical events of type 'fair'"));
        assert!(error.contains("music"));
    }

    #[rstest]
    fn test_baseline_comparison_uses_multiplier(predictor: Predictor) {
        let report = predictor
            .predict_simple(EventType::Music, "Lisbon", 3.0, None)
            .unwrap();
        let comparison = report.baseline_comparison.unwrap();
        assert_approx_eq!(
            f64,
            comparison.baseline_period_impact_usd,
            comparison.baseline_daily_spending_usd * 3.0 * 1.7,
            epsilon = 1e-6
        );
    }

    #[rstest]
    fn test_full_prediction_with_defaults(trained: (crate::artifact::TrainedArtifact, crate::dataset::Dataset)) {
        let (artifact, dataset) = trained;
        let predictor = Predictor::new(artifact, dataset);
        // No attendance, no overrides: per-field defaults carry the request
        let request = PredictionRequest {
            event_type: Some(EventType::Music),
            city: "Porto".to_string(),
            duration_days: 2.0,
            ..Default::default()
        };
        let report = predictor.predict(&request).unwrap();
        assert_approx_eq!(f64, report.input_summary.attendance, 50_000.0);
        assert!(report.prediction.total_economic_impact_usd >= 0.0);
    }
}
