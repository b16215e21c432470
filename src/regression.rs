//! Regression models with hand-fit, serializable parameters.
//!
//! Fitted parameters are plain numeric structs that serialize into the
//! trained artifact and reload bit-for-bit; inference is deterministic.
use anyhow::Result;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

pub mod linear;
pub mod tree;

use linear::LinearModel;
use tree::{ForestOptions, GradientBoosting, GradientBoostingOptions, RandomForest};

/// Regularisation strength for the ridge model
pub const RIDGE_ALPHA: f64 = 1.0;
/// Regularisation strength for the lasso model
pub const LASSO_ALPHA: f64 = 0.1;
/// Iteration cap for lasso coordinate descent
const LASSO_MAX_ITER: usize = 1000;
/// Convergence tolerance for lasso coordinate descent
const LASSO_TOL: f64 = 1e-6;

/// The fixed algorithm roster
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Algorithm {
    /// Ordinary least squares
    LinearRegression,
    /// L2-regularised least squares
    RidgeRegression,
    /// L1-regularised least squares (coordinate descent)
    LassoRegression,
    /// Bootstrap ensemble of regression trees
    RandomForest,
    /// Boosted regression trees fit on residuals
    GradientBoosting,
}

/// A fitted model from the roster
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum Regressor {
    /// Fitted ordinary least squares model
    LinearRegression(LinearModel),
    /// Fitted ridge model
    RidgeRegression(LinearModel),
    /// Fitted lasso model
    LassoRegression(LinearModel),
    /// Fitted random forest
    RandomForest(RandomForest),
    /// Fitted gradient boosting ensemble
    GradientBoosting(GradientBoosting),
}

impl Regressor {
    /// Fit the given algorithm on the feature matrix `x` and target `y`.
    ///
    /// `seed` drives the bootstrap sampling of the ensemble models; the
    /// linear fits are deterministic regardless.
    pub fn fit(algorithm: Algorithm, x: &[Vec<f64>], y: &[f64], seed: u64) -> Result<Self> {
        Ok(match algorithm {
            Algorithm::LinearRegression => Self::LinearRegression(linear::fit_ols(x, y)?),
            Algorithm::RidgeRegression => {
                Self::RidgeRegression(linear::fit_ridge(x, y, RIDGE_ALPHA)?)
            }
            Algorithm::LassoRegression => Self::LassoRegression(linear::fit_lasso(
                x,
                y,
                LASSO_ALPHA,
                LASSO_MAX_ITER,
                LASSO_TOL,
            )?),
            Algorithm::RandomForest => Self::RandomForest(RandomForest::fit(
                x,
                y,
                &ForestOptions {
                    seed,
                    ..ForestOptions::default()
                },
            )?),
            Algorithm::GradientBoosting => Self::GradientBoosting(GradientBoosting::fit(
                x,
                y,
                &GradientBoostingOptions::default(),
            )?),
        })
    }

    /// Predict a single value for one feature row
    pub fn predict(&self, row: &[f64]) -> f64 {
        match self {
            Self::LinearRegression(m) | Self::RidgeRegression(m) | Self::LassoRegression(m) => {
                m.predict(row)
            }
            Self::RandomForest(m) => m.predict(row),
            Self::GradientBoosting(m) => m.predict(row),
        }
    }
}

/// Standardises features to zero mean and unit variance.
///
/// Fit on the training split only; the fitted statistics are serialized with
/// the artifact and never refit at inference time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StandardScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl StandardScaler {
    /// Fit the scaler on the given rows
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let n_features = rows.first().map_or(0, Vec::len);
        let n = rows.len() as f64;
        let mut means = vec![0.0; n_features];
        for row in rows {
            for (mean, value) in means.iter_mut().zip(row) {
                *mean += value;
            }
        }
        for mean in &mut means {
            *mean /= n.max(1.0);
        }

        let mut stds = vec![0.0; n_features];
        for row in rows {
            for ((std, value), mean) in stds.iter_mut().zip(row).zip(&means) {
                *std += (value - mean).powi(2);
            }
        }
        for std in &mut stds {
            *std = (*std / n.max(1.0)).sqrt();
            // Constant columns pass through unscaled rather than dividing by
            // zero
            if *std == 0.0 {
                *std = 1.0;
            }
        }

        Self { means, stds }
    }

    /// Standardise one row
    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(&self.means)
            .zip(&self.stds)
            .map(|((value, mean), std)| (value - mean) / std)
            .collect()
    }

    /// Standardise a whole matrix
    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }
}
