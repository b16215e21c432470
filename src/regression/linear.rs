//! Linear models: ordinary least squares and its L1/L2-regularised
//! variants, fit on centred data via the normal equations or coordinate
//! descent.
use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

/// A fitted linear model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinearModel {
    /// One coefficient per feature
    pub coefficients: Vec<f64>,
    /// The intercept term
    pub intercept: f64,
}

impl LinearModel {
    /// Predict a single value for one feature row
    pub fn predict(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }
}

/// Check the shape of a training matrix and target vector
fn check_shape(x: &[Vec<f64>], y: &[f64]) -> Result<usize> {
    ensure!(!x.is_empty(), "Cannot fit a linear model on no samples");
    ensure!(
        x.len() == y.len(),
        "Feature matrix has {} rows but target has {} values",
        x.len(),
        y.len()
    );
    let n_features = x[0].len();
    ensure!(
        x.iter().all(|row| row.len() == n_features),
        "Feature matrix rows have inconsistent lengths"
    );

    Ok(n_features)
}

/// Column means of the matrix
fn column_means(x: &[Vec<f64>], n_features: usize) -> Vec<f64> {
    let mut means = vec![0.0; n_features];
    for row in x {
        for (mean, value) in means.iter_mut().zip(row) {
            *mean += value;
        }
    }
    for mean in &mut means {
        *mean /= x.len() as f64;
    }

    means
}

/// Fit by ordinary least squares
pub fn fit_ols(x: &[Vec<f64>], y: &[f64]) -> Result<LinearModel> {
    fit_ridge(x, y, 0.0)
}

/// Fit with an L2 penalty of strength `alpha` (`alpha == 0` is plain OLS).
///
/// The intercept is left unpenalised by centring the data before solving the
/// normal equations.
pub fn fit_ridge(x: &[Vec<f64>], y: &[f64], alpha: f64) -> Result<LinearModel> {
    let n_features = check_shape(x, y)?;
    let x_means = column_means(x, n_features);
    let y_mean = y.iter().sum::<f64>() / y.len() as f64;

    // Gram matrix of the centred features, plus the ridge penalty on the
    // diagonal
    let mut gram = vec![vec![0.0; n_features]; n_features];
    let mut rhs = vec![0.0; n_features];
    for (row, &target) in x.iter().zip(y) {
        let centred: Vec<f64> = row.iter().zip(&x_means).map(|(v, m)| v - m).collect();
        for (i, &ci) in centred.iter().enumerate() {
            rhs[i] += ci * (target - y_mean);
            for (j, &cj) in centred.iter().enumerate() {
                gram[i][j] += ci * cj;
            }
        }
    }
    for (i, row) in gram.iter_mut().enumerate() {
        row[i] += alpha;
    }

    let coefficients = solve(gram, rhs);
    let intercept = y_mean
        - coefficients
            .iter()
            .zip(&x_means)
            .map(|(c, m)| c * m)
            .sum::<f64>();

    Ok(LinearModel {
        coefficients,
        intercept,
    })
}

/// Fit with an L1 penalty of strength `alpha` via cyclic coordinate descent.
///
/// Minimises `1/(2n) * ||y - Xb||^2 + alpha * ||b||_1` on centred data.
pub fn fit_lasso(
    x: &[Vec<f64>],
    y: &[f64],
    alpha: f64,
    max_iter: usize,
    tol: f64,
) -> Result<LinearModel> {
    let n_features = check_shape(x, y)?;
    let n = x.len() as f64;
    let x_means = column_means(x, n_features);
    let y_mean = y.iter().sum::<f64>() / n;

    let centred: Vec<Vec<f64>> = x
        .iter()
        .map(|row| row.iter().zip(&x_means).map(|(v, m)| v - m).collect())
        .collect();

    // Per-feature mean squared column norms
    let col_norms: Vec<f64> = (0..n_features)
        .map(|j| centred.iter().map(|row| row[j] * row[j]).sum::<f64>() / n)
        .collect();

    let mut coefficients = vec![0.0; n_features];
    let mut residuals: Vec<f64> = y.iter().map(|v| v - y_mean).collect();

    for _ in 0..max_iter {
        let mut max_step: f64 = 0.0;
        for j in 0..n_features {
            if col_norms[j] == 0.0 {
                continue;
            }
            // Partial residual correlation with feature j
            let rho = centred
                .iter()
                .zip(&residuals)
                .map(|(row, r)| row[j] * (r + row[j] * coefficients[j]))
                .sum::<f64>()
                / n;
            let updated = soft_threshold(rho, alpha) / col_norms[j];
            let step = updated - coefficients[j];
            if step != 0.0 {
                for (row, r) in centred.iter().zip(&mut residuals) {
                    *r -= row[j] * step;
                }
                coefficients[j] = updated;
            }
            max_step = max_step.max(step.abs());
        }
        if max_step < tol {
            break;
        }
    }

    let intercept = y_mean
        - coefficients
            .iter()
            .zip(&x_means)
            .map(|(c, m)| c * m)
            .sum::<f64>();

    Ok(LinearModel {
        coefficients,
        intercept,
    })
}

/// The lasso soft-thresholding operator
fn soft_threshold(value: f64, threshold: f64) -> f64 {
    if value > threshold {
        value - threshold
    } else if value < -threshold {
        value + threshold
    } else {
        0.0
    }
}

/// Solve the symmetric system `a * x = b` by Gaussian elimination with
/// partial pivoting.
///
/// A near-zero pivot (a constant or perfectly collinear feature) zeroes that
/// coefficient instead of failing: the feature simply drops out of the fit.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Vec<f64> {
    let n = b.len();
    let mut dropped = vec![false; n];

    for col in 0..n {
        // Find the pivot row
        let pivot_row = (col..n)
            .max_by(|&r1, &r2| a[r1][col].abs().partial_cmp(&a[r2][col].abs()).unwrap())
            .unwrap();
        if a[pivot_row][col].abs() < 1e-10 {
            dropped[col] = true;
            continue;
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        let pivot = a[col][col];
        for row in (col + 1)..n {
            let factor = a[row][col] / pivot;
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    // Back substitution
    let mut x = vec![0.0; n];
    for col in (0..n).rev() {
        if dropped[col] || a[col][col].abs() < 1e-10 {
            x[col] = 0.0;
            continue;
        }
        let mut sum = b[col];
        for k in (col + 1)..n {
            sum -= a[col][k] * x[k];
        }
        x[col] = sum / a[col][col];
    }

    x
}
