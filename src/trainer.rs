//! Training pipeline: splits the assembled table, fits the algorithm roster
//! in log-space, evaluates every model and selects a canonical one.
use crate::artifact::TrainedArtifact;
use crate::features::{LabelEncoder, SkippedRow, TrainingTable};
use crate::regression::{Algorithm, Regressor, StandardScaler};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

/// Fewest usable rows training will accept
const MIN_TRAINING_SAMPLES: usize = 10;

/// How a tie on held-out R² between two algorithms is resolved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TieBreak {
    /// Keep the algorithm fitted earlier in roster order
    #[default]
    FirstSeen,
    /// Prefer the algorithm fitted later in roster order
    LastSeen,
}

/// Options controlling the training run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainerOptions {
    /// Fraction of rows held out for evaluation
    pub test_fraction: f64,
    /// Seed for the shuffled split and the ensemble bootstraps
    pub seed: u64,
    /// Number of cross-validation folds on the training split
    pub cv_folds: usize,
    /// Tie-break policy for model selection
    pub tie_break: TieBreak,
}

impl Default for TrainerOptions {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            cv_folds: 5,
            tie_break: TieBreak::FirstSeen,
        }
    }
}

/// Evaluation results for one fitted algorithm.
///
/// R², MAE, RMSE and MAPE are computed on the held-out split after
/// back-transforming predictions to dollars; the cross-validated R² is
/// computed in log-space on the training split.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelMetrics {
    /// Coefficient of determination on the held-out split
    pub r2: f64,
    /// Mean absolute error in dollars
    pub mae: f64,
    /// Root-mean-squared error in dollars
    pub rmse: f64,
    /// Mean absolute percentage error, denominator-guarded
    pub mape: f64,
    /// Mean R² across the cross-validation folds
    pub cv_r2_mean: f64,
    /// Standard deviation of R² across the folds
    pub cv_r2_std: f64,
}

/// A report of what the training run did, for logging and inspection
#[derive(Debug)]
pub struct TrainingSummary {
    /// Rows in the assembled table
    pub samples: usize,
    /// Rows used for fitting
    pub train_count: usize,
    /// Rows held out for evaluation
    pub test_count: usize,
    /// Rows excluded during assembly, with reasons
    pub skipped: Vec<SkippedRow>,
    /// Per-algorithm evaluation results
    pub metrics: IndexMap<Algorithm, ModelMetrics>,
    /// The selected canonical algorithm
    pub best: Algorithm,
}

impl TrainingSummary {
    /// Log the summary at info level, with skipped rows as warnings
    pub fn log(&self) {
        info!(
            "Trained on {} samples ({} train / {} test)",
            self.samples, self.train_count, self.test_count
        );
        for (algorithm, metrics) in &self.metrics {
            info!(
                "{algorithm}: R2={:.4} MAE=${:.0} RMSE=${:.0} MAPE={:.2}% CV R2={:.4}+/-{:.4}",
                metrics.r2,
                metrics.mae,
                metrics.rmse,
                metrics.mape,
                metrics.cv_r2_mean,
                metrics.cv_r2_std
            );
        }
        info!("Best model: {}", self.best);
        for row in &self.skipped {
            warn!("Training row for '{}' excluded: {}", row.event, row.reason);
        }
    }
}

/// Train the full roster and build the artifact.
///
/// Any fit failure aborts the whole run: no partial artifact is produced.
pub fn train(
    table: &TrainingTable,
    encoder: LabelEncoder,
    options: &TrainerOptions,
) -> Result<(TrainedArtifact, TrainingSummary)> {
    ensure!(
        table.rows.len() >= MIN_TRAINING_SAMPLES,
        "Need at least {MIN_TRAINING_SAMPLES} usable rows to train, got {}",
        table.rows.len()
    );

    // Fit in log-space: the training set spans orders of magnitude
    let log_targets: Vec<f64> = table.targets.iter().map(|t| t.ln_1p()).collect();

    // Shuffled, seeded split
    let mut indices: Vec<usize> = (0..table.rows.len()).collect();
    let mut rng = StdRng::seed_from_u64(options.seed);
    indices.shuffle(&mut rng);
    let test_count = ((table.rows.len() as f64 * options.test_fraction).round() as usize)
        .clamp(1, table.rows.len() - 1);
    let (test_indices, train_indices) = indices.split_at(test_count);

    let gather = |idx: &[usize]| -> (Vec<Vec<f64>>, Vec<f64>) {
        (
            idx.iter().map(|&i| table.rows[i].clone()).collect(),
            idx.iter().map(|&i| log_targets[i]).collect(),
        )
    };
    let (train_x_raw, train_y) = gather(train_indices);
    let (test_x_raw, test_y) = gather(test_indices);

    // The scaler is fit on the training split only and persisted for
    // inference; it is never refit
    let scaler = StandardScaler::fit(&train_x_raw);
    let train_x = scaler.transform(&train_x_raw);
    let test_x = scaler.transform(&test_x_raw);

    let mut models = IndexMap::new();
    let mut metrics = IndexMap::new();
    let mut best: Option<(Algorithm, f64)> = None;

    for algorithm in Algorithm::iter() {
        info!("Training {algorithm}...");
        let model = Regressor::fit(algorithm, &train_x, &train_y, options.seed)
            .with_context(|| format!("Failed to fit {algorithm}"))?;

        let model_metrics = evaluate(
            algorithm,
            &model,
            &train_x,
            &train_y,
            &test_x,
            &test_y,
            options,
        )?;

        let replace = match best {
            None => true,
            Some((_, best_r2)) => match options.tie_break {
                TieBreak::FirstSeen => model_metrics.r2 > best_r2,
                TieBreak::LastSeen => model_metrics.r2 >= best_r2,
            },
        };
        if replace {
            best = Some((algorithm, model_metrics.r2));
        }

        models.insert(algorithm, model);
        metrics.insert(algorithm, model_metrics);
    }

    let (best, _) = best.unwrap();
    let summary = TrainingSummary {
        samples: table.rows.len(),
        train_count: train_indices.len(),
        test_count: test_indices.len(),
        skipped: table.skipped.clone(),
        metrics: metrics.clone(),
        best,
    };

    let artifact = TrainedArtifact::new(best, models, scaler, encoder, table.columns.clone(), metrics);

    Ok((artifact, summary))
}

/// Held-out metrics in original units plus cross-validated R² on the
/// training split
#[allow(clippy::too_many_arguments)]
fn evaluate(
    algorithm: Algorithm,
    model: &Regressor,
    train_x: &[Vec<f64>],
    train_y: &[f64],
    test_x: &[Vec<f64>],
    test_y: &[f64],
    options: &TrainerOptions,
) -> Result<ModelMetrics> {
    // Back-transform to dollars before computing the headline metrics
    let predictions: Vec<f64> = test_x.iter().map(|row| model.predict(row).exp_m1()).collect();
    let actuals: Vec<f64> = test_y.iter().map(|v| v.exp_m1()).collect();

    let cv_scores = cross_validate(algorithm, train_x, train_y, options)?;
    let cv_r2_mean = cv_scores.iter().sum::<f64>() / cv_scores.len() as f64;
    let cv_r2_std = (cv_scores
        .iter()
        .map(|s| (s - cv_r2_mean).powi(2))
        .sum::<f64>()
        / cv_scores.len() as f64)
        .sqrt();

    Ok(ModelMetrics {
        r2: r_squared(&actuals, &predictions),
        mae: mean_absolute_error(&actuals, &predictions),
        rmse: root_mean_squared_error(&actuals, &predictions),
        mape: mean_absolute_percentage_error(&actuals, &predictions),
        cv_r2_mean,
        cv_r2_std,
    })
}

/// K-fold cross-validated R² on the (already shuffled) training split, in
/// log-space
fn cross_validate(
    algorithm: Algorithm,
    x: &[Vec<f64>],
    y: &[f64],
    options: &TrainerOptions,
) -> Result<Vec<f64>> {
    let folds = options.cv_folds.clamp(2, x.len());
    let mut scores = Vec::with_capacity(folds);

    for fold in 0..folds {
        let held_out = |i: usize| i % folds == fold;
        let mut fit_x = Vec::new();
        let mut fit_y = Vec::new();
        let mut val_x = Vec::new();
        let mut val_y = Vec::new();
        for i in 0..x.len() {
            if held_out(i) {
                val_x.push(x[i].clone());
                val_y.push(y[i]);
            } else {
                fit_x.push(x[i].clone());
                fit_y.push(y[i]);
            }
        }

        let model = Regressor::fit(algorithm, &fit_x, &fit_y, options.seed)
            .with_context(|| format!("Cross-validation fold {fold} failed for {algorithm}"))?;
        let predictions: Vec<f64> = val_x.iter().map(|row| model.predict(row)).collect();
        scores.push(r_squared(&val_y, &predictions));
    }

    Ok(scores)
}

/// Coefficient of determination
pub fn r_squared(actuals: &[f64], predictions: &[f64]) -> f64 {
    let mean = actuals.iter().sum::<f64>() / actuals.len() as f64;
    let ss_total: f64 = actuals.iter().map(|a| (a - mean).powi(2)).sum();
    let ss_residual: f64 = actuals
        .iter()
        .zip(predictions)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    if ss_total == 0.0 {
        // A constant target is either matched exactly or not at all
        return if ss_residual == 0.0 { 1.0 } else { 0.0 };
    }

    1.0 - ss_residual / ss_total
}

/// Mean absolute error
pub fn mean_absolute_error(actuals: &[f64], predictions: &[f64]) -> f64 {
    actuals
        .iter()
        .zip(predictions)
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / actuals.len() as f64
}

/// Root-mean-squared error
pub fn root_mean_squared_error(actuals: &[f64], predictions: &[f64]) -> f64 {
    (actuals
        .iter()
        .zip(predictions)
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / actuals.len() as f64)
        .sqrt()
}

/// Mean absolute percentage error, with the denominator clamped to at least
/// one to keep zero/near-zero actuals from exploding the figure
pub fn mean_absolute_percentage_error(actuals: &[f64], predictions: &[f64]) -> f64 {
    actuals
        .iter()
        .zip(predictions)
        .map(|(a, p)| ((a - p) / a.max(1.0)).abs())
        .sum::<f64>()
        / actuals.len() as f64
        * 100.0
}
