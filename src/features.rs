//! Feature assembly: turning catalog attributes and window comparisons into
//! the ordered numeric vectors the regression models consume.
//!
//! This module owns the canonical feature-column list. The list is produced
//! once at training time, serialized with the trained artifact, and reused
//! unmodified at inference time: every inference vector must fill every
//! training-time column, in the training-time order. Models consume raw
//! arrays, so violating this corrupts predictions without any error.
use crate::city::City;
use crate::comparator::{self, ComparatorOptions, MetricComparison, keys};
use crate::dataset::Dataset;
use crate::event::EventID;
use anyhow::{Result, ensure};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Encoder code assigned to event types never seen during training.
///
/// NB: this aliases the first trained class.
pub const FALLBACK_EVENT_TYPE_CODE: f64 = 0.0;

/// How a missing value is filled when assembling the training matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImputePolicy {
    /// Fill with 0.0: the feature is a measured change, and "no measured
    /// change" is the neutral value
    ZeroChange,
    /// Fill with the column's median over the current training set, or 0.0
    /// when the whole column is empty
    ColumnMedian,
    /// Fill with [`FALLBACK_EVENT_TYPE_CODE`], warning out loud
    FallbackCode,
}

/// One entry of the per-feature metadata table: the feature's canonical name
/// and its imputation policy. Consulted everywhere a missing value needs
/// filling, instead of rederiving the policy from the name at each use site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSpec {
    /// Canonical column name
    pub name: &'static str,
    /// How missing values are filled at training time
    pub policy: ImputePolicy,
}

/// The canonical, ordered feature table. The order here is the order of
/// every feature vector produced at training time.
pub const FEATURE_SPECS: &[FeatureSpec] = &[
    FeatureSpec { name: "attendance", policy: ImputePolicy::ColumnMedian },
    FeatureSpec { name: "event_type_code", policy: ImputePolicy::FallbackCode },
    FeatureSpec { name: "duration_days", policy: ImputePolicy::ColumnMedian },
    FeatureSpec { name: "attendance_per_day", policy: ImputePolicy::ColumnMedian },
    FeatureSpec { name: "visitors_per_hotel_room", policy: ImputePolicy::ColumnMedian },
    FeatureSpec { name: "hotel_rooms", policy: ImputePolicy::ColumnMedian },
    FeatureSpec { name: "population", policy: ImputePolicy::ColumnMedian },
    FeatureSpec { name: "annual_tourists", policy: ImputePolicy::ColumnMedian },
    FeatureSpec { name: "avg_hotel_price_usd", policy: ImputePolicy::ColumnMedian },
    FeatureSpec { name: "city_tourism_intensity", policy: ImputePolicy::ColumnMedian },
    FeatureSpec { name: "visitor_increase_pct", policy: ImputePolicy::ZeroChange },
    FeatureSpec { name: "hotel_price_increase_pct", policy: ImputePolicy::ZeroChange },
    FeatureSpec { name: "occupancy_boost_pts", policy: ImputePolicy::ZeroChange },
    FeatureSpec { name: "daily_spending_increase_pct", policy: ImputePolicy::ZeroChange },
    FeatureSpec { name: "airport_arrivals_increase_pct", policy: ImputePolicy::ZeroChange },
    FeatureSpec { name: "event_avg_hotel_price", policy: ImputePolicy::ColumnMedian },
    FeatureSpec { name: "event_max_hotel_price", policy: ImputePolicy::ColumnMedian },
    FeatureSpec { name: "baseline_avg_spending_per_visitor", policy: ImputePolicy::ColumnMedian },
    FeatureSpec { name: "event_avg_accommodation_spending", policy: ImputePolicy::ColumnMedian },
    FeatureSpec { name: "event_avg_public_transport", policy: ImputePolicy::ColumnMedian },
];

/// The canonical column names, in canonical order
pub fn feature_columns() -> Vec<String> {
    FEATURE_SPECS.iter().map(|s| s.name.to_string()).collect()
}

/// The raw (pre-imputation) feature values for one event.
///
/// Fields map 1:1 to the entries of [`FEATURE_SPECS`]; the struct is the
/// typed face of the feature vector and is only flattened to an array at the
/// model boundary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFeatures {
    /// Attendance over the whole event
    pub attendance: Option<f64>,
    /// Encoded event type (see [`LabelEncoder`])
    pub event_type_code: Option<f64>,
    /// Event duration in days
    pub duration_days: Option<f64>,
    /// Attendance divided by duration
    pub attendance_per_day: Option<f64>,
    /// Attendance relative to the city's hotel inventory
    pub visitors_per_hotel_room: Option<f64>,
    /// The city's hotel room inventory
    pub hotel_rooms: Option<f64>,
    /// The city's resident population
    pub population: Option<f64>,
    /// The city's annual tourist count
    pub annual_tourists: Option<f64>,
    /// The city's baseline nightly hotel price
    pub avg_hotel_price_usd: Option<f64>,
    /// Annual tourists relative to population
    pub city_tourism_intensity: Option<f64>,
    /// Relative change in daily visitors over the event, in percent
    pub visitor_increase_pct: Option<f64>,
    /// Relative change in nightly hotel price, in percent
    pub hotel_price_increase_pct: Option<f64>,
    /// Occupancy change in percentage points
    pub occupancy_boost_pts: Option<f64>,
    /// Relative change in daily visitor spending, in percent
    pub daily_spending_increase_pct: Option<f64>,
    /// Relative change in airport arrivals, in percent
    pub airport_arrivals_increase_pct: Option<f64>,
    /// Mean nightly hotel price over the event period
    pub event_avg_hotel_price: Option<f64>,
    /// Peak nightly hotel price over the event period
    pub event_max_hotel_price: Option<f64>,
    /// Mean spending per visitor over the baseline window
    pub baseline_avg_spending_per_visitor: Option<f64>,
    /// Mean daily accommodation spending over the event period
    pub event_avg_accommodation_spending: Option<f64>,
    /// Mean daily public transport journeys over the event period
    pub event_avg_public_transport: Option<f64>,
}

impl EventFeatures {
    /// Look a raw value up by its canonical column name
    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            "attendance" => self.attendance,
            "event_type_code" => self.event_type_code,
            "duration_days" => self.duration_days,
            "attendance_per_day" => self.attendance_per_day,
            "visitors_per_hotel_room" => self.visitors_per_hotel_room,
            "hotel_rooms" => self.hotel_rooms,
            "population" => self.population,
            "annual_tourists" => self.annual_tourists,
            "avg_hotel_price_usd" => self.avg_hotel_price_usd,
            "city_tourism_intensity" => self.city_tourism_intensity,
            "visitor_increase_pct" => self.visitor_increase_pct,
            "hotel_price_increase_pct" => self.hotel_price_increase_pct,
            "occupancy_boost_pts" => self.occupancy_boost_pts,
            "daily_spending_increase_pct" => self.daily_spending_increase_pct,
            "airport_arrivals_increase_pct" => self.airport_arrivals_increase_pct,
            "event_avg_hotel_price" => self.event_avg_hotel_price,
            "event_max_hotel_price" => self.event_max_hotel_price,
            "baseline_avg_spending_per_visitor" => self.baseline_avg_spending_per_visitor,
            "event_avg_accommodation_spending" => self.event_avg_accommodation_spending,
            "event_avg_public_transport" => self.event_avg_public_transport,
            _ => None,
        }
    }

    /// Fill the core event/city fields and the ratios derived from them
    pub fn set_core(&mut self, attendance: f64, duration_days: f64, city: &City) {
        self.attendance = Some(attendance);
        self.duration_days = Some(duration_days);
        self.attendance_per_day = Some(attendance / duration_days.max(1.0));
        self.visitors_per_hotel_room = Some(attendance / (city.hotel_rooms as f64).max(1.0));
        self.hotel_rooms = Some(city.hotel_rooms as f64);
        self.population = Some(city.population as f64);
        self.annual_tourists = Some(city.annual_tourists as f64);
        self.avg_hotel_price_usd = Some(city.avg_hotel_price_usd);
        self.city_tourism_intensity = Some(city.tourism_intensity());
    }

    /// Fill the window-derived fields from a comparator output. Only fields
    /// the comparison actually produced are set.
    pub fn apply_comparison(&mut self, cmp: &MetricComparison) {
        let mut fill = |field: &mut Option<f64>, key: &'static str| {
            if let Some(value) = cmp.get(key) {
                *field = Some(*value);
            }
        };
        fill(&mut self.visitor_increase_pct, keys::VISITOR_INCREASE_PCT);
        fill(
            &mut self.hotel_price_increase_pct,
            keys::HOTEL_PRICE_INCREASE_PCT,
        );
        fill(&mut self.occupancy_boost_pts, keys::OCCUPANCY_BOOST_PTS);
        fill(
            &mut self.daily_spending_increase_pct,
            keys::DAILY_SPENDING_INCREASE_PCT,
        );
        fill(
            &mut self.airport_arrivals_increase_pct,
            keys::AIRPORT_ARRIVALS_INCREASE_PCT,
        );
        fill(&mut self.event_avg_hotel_price, keys::EVENT_AVG_HOTEL_PRICE);
        fill(&mut self.event_max_hotel_price, keys::EVENT_MAX_HOTEL_PRICE);
        fill(
            &mut self.baseline_avg_spending_per_visitor,
            keys::BASELINE_AVG_SPENDING_PER_VISITOR,
        );
        fill(
            &mut self.event_avg_accommodation_spending,
            keys::EVENT_AVG_ACCOMMODATION_SPENDING,
        );
        fill(
            &mut self.event_avg_public_transport,
            keys::EVENT_AVG_PUBLIC_TRANSPORT,
        );
    }
}

/// Encodes event-type labels as numeric codes.
///
/// Classes are the sorted distinct labels seen at training time; the fitted
/// encoder is serialized with the artifact and reused verbatim at inference.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit the encoder on the given labels
    pub fn fit<I: IntoIterator<Item = String>>(labels: I) -> Self {
        let mut classes: Vec<String> = labels.into_iter().collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    /// Encode a label. Unknown labels map to the fallback code with a
    /// warning; they never fail the request.
    pub fn encode(&self, label: &str) -> f64 {
        match self.classes.iter().position(|c| c == label) {
            Some(position) => position as f64,
            None => {
                warn!(
                    "Event type '{label}' was not seen during training; using fallback code {FALLBACK_EVENT_TYPE_CODE}"
                );
                FALLBACK_EVENT_TYPE_CODE
            }
        }
    }

    /// The fitted classes, in code order
    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

/// A row that could not join the training set, and why. Surfaced in the
/// training summary as a data-quality signal, not a pipeline failure.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    /// The event the row described
    pub event: EventID,
    /// Why the row was excluded
    pub reason: String,
}

/// The assembled training matrix, with its canonical column list
#[derive(Debug, PartialEq)]
pub struct TrainingTable {
    /// Canonical column names, in the order of each row
    pub columns: Vec<String>,
    /// One imputed feature vector per usable event
    pub rows: Vec<Vec<f64>>,
    /// The target (total economic impact in USD) per row, untransformed
    pub targets: Vec<f64>,
    /// The event each row came from
    pub events: Vec<EventID>,
    /// Rows excluded for missing prerequisites
    pub skipped: Vec<SkippedRow>,
}

/// Assemble the training table and fit the event-type encoder from a
/// dataset's historical impact records.
///
/// Rows need a measured total impact plus attendance, duration and event
/// type (hard prerequisites); everything else is imputed per the policy
/// table.
pub fn assemble_training(
    dataset: &Dataset,
    options: &ComparatorOptions,
) -> Result<(TrainingTable, LabelEncoder)> {
    let labelled: Vec<_> = dataset
        .impacts
        .values()
        .filter(|impact| impact.total_economic_impact_usd.is_some())
        .collect();
    ensure!(
        !labelled.is_empty(),
        "No impact records with a measured total_economic_impact_usd; cannot train"
    );

    let encoder = LabelEncoder::fit(
        labelled
            .iter()
            .filter_map(|impact| impact.event_type)
            .map(|t| t.to_string()),
    );

    let mut skipped = Vec::new();
    let mut events = Vec::new();
    let mut raw_rows: Vec<EventFeatures> = Vec::new();
    let mut targets = Vec::new();

    for impact in labelled {
        let mut skip = |reason: &str| {
            skipped.push(SkippedRow {
                event: impact.event.clone(),
                reason: reason.to_string(),
            });
        };

        let Some(event_type) = impact.event_type else {
            skip("missing event_type");
            continue;
        };
        let Some(duration_days) = impact.duration_days else {
            skip("missing duration_days");
            continue;
        };
        let Some(attendance) = impact.attendance else {
            skip("missing attendance");
            continue;
        };
        let Some(city) = dataset.cities.get(&impact.city) else {
            skip("city not in catalog");
            continue;
        };

        let mut features = EventFeatures::default();
        features.set_core(attendance, duration_days, city);
        features.event_type_code = Some(encoder.encode(&event_type.to_string()));

        // Window-derived metrics, where the event's dates and daily records
        // allow them
        if let Some(event) = dataset.events.get(&impact.event) {
            let cmp = comparator::compare_event(&dataset.metrics, event, options);
            features.apply_comparison(&cmp);
        }

        // The impact row's own recorded deltas take precedence over the
        // recomputed ones
        features.visitor_increase_pct =
            impact.visitor_increase_pct.or(features.visitor_increase_pct);
        features.hotel_price_increase_pct = impact
            .hotel_price_increase_pct
            .or(features.hotel_price_increase_pct);
        features.occupancy_boost_pts = impact.occupancy_boost_pts.or(features.occupancy_boost_pts);
        features.airport_arrivals_increase_pct = impact
            .airport_arrivals_increase_pct
            .or(features.airport_arrivals_increase_pct);

        events.push(impact.event.clone());
        targets.push(impact.total_economic_impact_usd.unwrap());
        raw_rows.push(features);
    }

    ensure!(
        !raw_rows.is_empty(),
        "All {} labelled impact records were excluded for missing prerequisites",
        skipped.len()
    );

    let rows = impute(&raw_rows);
    info!(
        "Assembled training table: {} rows x {} features ({} rows skipped)",
        rows.len(),
        FEATURE_SPECS.len(),
        skipped.len()
    );

    Ok((
        TrainingTable {
            columns: feature_columns(),
            rows,
            targets,
            events,
            skipped,
        },
        encoder,
    ))
}

/// Fill missing values column by column, per the policy table
fn impute(raw_rows: &[EventFeatures]) -> Vec<Vec<f64>> {
    let mut rows = vec![Vec::with_capacity(FEATURE_SPECS.len()); raw_rows.len()];
    for spec in FEATURE_SPECS {
        let column: Vec<Option<f64>> = raw_rows.iter().map(|r| r.get(spec.name)).collect();
        let fill = match spec.policy {
            ImputePolicy::ZeroChange => 0.0,
            ImputePolicy::ColumnMedian => median(column.iter().flatten().copied()).unwrap_or(0.0),
            ImputePolicy::FallbackCode => {
                if column.iter().all(Option::is_none) {
                    warn!(
                        "Feature '{}' is absent for every training row; using fallback code",
                        spec.name
                    );
                }
                FALLBACK_EVENT_TYPE_CODE
            }
        };
        for (row, value) in rows.iter_mut().zip(&column) {
            row.push(value.unwrap_or(fill));
        }
    }

    rows
}

/// Median of the values, or `None` when there are none
fn median(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut values: Vec<f64> = values.collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Flatten raw features to a model-ready row, following the artifact's
/// column list in the artifact's order.
///
/// Columns the features cannot supply are filled with 0.0 and warned about;
/// the vector length always equals the column-list length.
pub fn to_model_row(features: &EventFeatures, columns: &[String]) -> Vec<f64> {
    columns
        .iter()
        .map(|column| {
            features.get(column).unwrap_or_else(|| {
                warn!("No value available for feature '{column}'; using 0.0");
                0.0
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::fixture::dataset;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[test]
    fn test_median() {
        assert_eq!(median([].into_iter()), None);
        assert_approx_eq!(f64, median([3.0, 1.0, 2.0].into_iter()).unwrap(), 2.0);
        assert_approx_eq!(f64, median([4.0, 1.0, 2.0, 3.0].into_iter()).unwrap(), 2.5);
    }

    #[test]
    fn test_label_encoder_sorted_and_fallback() {
        let encoder = LabelEncoder::fit(["music", "sports", "music"].map(String::from));
        assert_eq!(encoder.classes(), ["music", "sports"]);
        assert_approx_eq!(f64, encoder.encode("music"), 0.0);
        assert_approx_eq!(f64, encoder.encode("sports"), 1.0);
        // Unknown category falls back, never fails
        assert_approx_eq!(f64, encoder.encode("circus"), FALLBACK_EVENT_TYPE_CODE);
    }

    #[test]
    fn test_feature_specs_match_record_fields() {
        // With every field populated, every canonical column must resolve
        // to a value: a spec entry without a matching record field would
        // silently read as missing
        let features = EventFeatures {
            attendance: Some(1.0),
            event_type_code: Some(1.0),
            duration_days: Some(1.0),
            attendance_per_day: Some(1.0),
            visitors_per_hotel_room: Some(1.0),
            hotel_rooms: Some(1.0),
            population: Some(1.0),
            annual_tourists: Some(1.0),
            avg_hotel_price_usd: Some(1.0),
            city_tourism_intensity: Some(1.0),
            visitor_increase_pct: Some(1.0),
            hotel_price_increase_pct: Some(1.0),
            occupancy_boost_pts: Some(1.0),
            daily_spending_increase_pct: Some(1.0),
            airport_arrivals_increase_pct: Some(1.0),
            event_avg_hotel_price: Some(1.0),
            event_max_hotel_price: Some(1.0),
            baseline_avg_spending_per_visitor: Some(1.0),
            event_avg_accommodation_spending: Some(1.0),
            event_avg_public_transport: Some(1.0),
        };
        for spec in FEATURE_SPECS {
            assert!(
                features.get(spec.name).is_some(),
                "column '{}' does not resolve to a record field",
                spec.name
            );
        }
        assert_eq!(feature_columns().len(), FEATURE_SPECS.len());
    }

    #[rstest]
    fn test_assemble_training_shapes(dataset: Dataset) {
        let (table, _) = assemble_training(&dataset, &ComparatorOptions::default()).unwrap();
        assert_eq!(table.columns, feature_columns());
        for row in &table.rows {
            assert_eq!(row.len(), table.columns.len());
        }
        assert_eq!(table.rows.len(), table.targets.len());
        assert_eq!(table.rows.len(), table.events.len());
    }

    #[rstest]
    fn test_assemble_training_skips_missing_prerequisites(dataset: Dataset) {
        let (table, _) = assemble_training(&dataset, &ComparatorOptions::default()).unwrap();
        // The fixture contains one labelled impact without attendance
        assert!(
            table
                .skipped
                .iter()
                .any(|s| s.reason == "missing attendance")
        );
        assert!(
            !table
                .events
                .iter()
                .any(|e| e == &EventID::from("Phantom Expo"))
        );
    }

    #[rstest]
    fn test_zero_change_imputation(dataset: Dataset) {
        let (table, _) = assemble_training(&dataset, &ComparatorOptions::default()).unwrap();
        // The Osaka marathon has no mobility metrics: its airport increase
        // column imputes to exactly 0.0 (treated as "no measured change")
        let row_index = table
            .events
            .iter()
            .position(|e| e == &EventID::from("Harbour Marathon"))
            .unwrap();
        let column_index = table
            .columns
            .iter()
            .position(|c| c == "airport_arrivals_increase_pct")
            .unwrap();
        assert_approx_eq!(f64, table.rows[row_index][column_index], 0.0);
    }

    #[rstest]
    fn test_to_model_row_follows_artifact_order(dataset: Dataset) {
        let (table, encoder) = assemble_training(&dataset, &ComparatorOptions::default()).unwrap();
        let mut features = EventFeatures::default();
        features.set_core(50_000.0, 2.0, dataset.city("Lisbon").unwrap());
        features.event_type_code = Some(encoder.encode("music"));

        // Reversed column order must yield the reversed vector: the artifact
        // order wins, not the compiled-in order
        let forward = to_model_row(&features, &table.columns);
        let reversed_columns: Vec<String> = table.columns.iter().rev().cloned().collect();
        let mut reversed = to_model_row(&features, &reversed_columns);
        reversed.reverse();
        assert_eq!(forward, reversed);
        assert_eq!(forward.len(), table.columns.len());
    }
}
