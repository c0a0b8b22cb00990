//! Joint least-squares attribution of a target on several factors.
//!
//! The fit runs on mean-centered data so the intercept drops out of the normal
//! equations; it is recovered afterwards from the means.

use crate::application::analysis::correlation::{has_variance, mean_and_sum_sq};
use crate::domain::aligned::AlignedDataset;
use crate::domain::analysis::{FactorEffect, RegressionAttribution};
use crate::domain::errors::AnalysisError;
use ndarray::{Array1, Array2};
use tracing::{debug, info};

/// Remaining Cholesky pivot, relative to the original diagonal entry, below
/// which a column counts as a linear combination of earlier columns
const SINGULAR_PIVOT_RATIO: f64 = 1e-10;

pub fn regress(
    dataset: &AlignedDataset,
    target: &str,
    factors: &[&str],
) -> Result<RegressionAttribution, AnalysisError> {
    // Complete cases only
    let rows: Vec<(f64, Vec<f64>)> = dataset
        .rows()
        .iter()
        .filter_map(|r| {
            let y = r.get(target)?;
            let xs = factors
                .iter()
                .map(|f| r.get(f))
                .collect::<Option<Vec<f64>>>()?;
            Some((y, xs))
        })
        .collect();

    let n = rows.len();
    let required = factors.len() + 1;
    if n < required {
        return Err(AnalysisError::insufficient("joint regression", n, required));
    }

    let ys: Vec<f64> = rows.iter().map(|(y, _)| *y).collect();
    let (y_mean, ss_tot) = mean_and_sum_sq(&ys);
    let y = Array1::from(ys);

    // Only factors with variance enter the solve
    let mut x_means = vec![0.0; factors.len()];
    let mut active = Vec::new();
    for (j, factor) in factors.iter().enumerate() {
        let column: Vec<f64> = rows.iter().map(|(_, xs)| xs[j]).collect();
        let (mean, ss) = mean_and_sum_sq(&column);
        x_means[j] = mean;
        if has_variance(mean, ss, n) {
            active.push(j);
        } else {
            debug!(
                "Regression: factor '{}' has zero variance over {} rows, coefficient fixed at 0",
                factor, n
            );
        }
    }

    let mut coefficients = vec![0.0; factors.len()];
    if !active.is_empty() {
        let mut x = Array2::<f64>::zeros((n, active.len()));
        for (i, (_, xs)) in rows.iter().enumerate() {
            for (k, &j) in active.iter().enumerate() {
                x[[i, k]] = xs[j] - x_means[j];
            }
        }
        let y_centered = y.mapv(|v| v - y_mean);

        let xtx = x.t().dot(&x);
        let xty = x.t().dot(&y_centered);
        let beta = cholesky_solve(&xtx, &xty)?;

        for (k, &j) in active.iter().enumerate() {
            coefficients[j] = beta[k];
        }
    }

    let intercept = y_mean
        - coefficients
            .iter()
            .zip(&x_means)
            .map(|(b, m)| b * m)
            .sum::<f64>();

    let ss_res: f64 = rows
        .iter()
        .map(|(y, xs)| {
            let fitted = intercept + coefficients.iter().zip(xs).map(|(b, x)| b * x).sum::<f64>();
            (y - fitted).powi(2)
        })
        .sum();

    let r_squared = r_squared(ss_res, ss_tot, y_mean, n);

    info!(
        "Regression: '{}' on {:?} over {} rows, R² = {:.4}",
        target, factors, n, r_squared
    );

    Ok(RegressionAttribution {
        target: target.to_string(),
        effects: factors
            .iter()
            .zip(coefficients)
            .map(|(f, coefficient)| FactorEffect {
                factor: f.to_string(),
                coefficient,
            })
            .collect(),
        intercept,
        r_squared,
        observations: n,
    })
}

fn r_squared(ss_res: f64, ss_tot: f64, y_mean: f64, n: usize) -> f64 {
    if !has_variance(y_mean, ss_tot, n) {
        // Constant target: perfect only if the fit reproduces it
        return if has_variance(y_mean, ss_res, n) { 0.0 } else { 1.0 };
    }
    (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
}

/// Solve `A x = b` for symmetric positive definite `A` via `A = L Lᵀ`
pub(crate) fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>, AnalysisError> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }

            if i == j {
                let pivot = a[[i, i]] - sum;
                if pivot <= SINGULAR_PIVOT_RATIO * a[[i, i]].abs() || pivot <= 0.0 {
                    return Err(AnalysisError::SingularDesign);
                }
                l[[i, j]] = pivot.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L z = b
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * z[j];
        }
        z[i] = (b[i] - sum) / l[[i, i]];
    }

    // Lᵀ x = z
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (z[i] - sum) / l[[i, i]];
    }

    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aligned::AlignedRow;
    use chrono::{Duration, NaiveDate};
    use ndarray::array;
    use std::collections::BTreeMap;

    fn dataset(columns: &[(&str, Vec<Option<f64>>)]) -> AlignedDataset {
        let n = columns[0].1.len();
        let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let rows = (0..n)
            .map(|i| {
                let values: BTreeMap<String, Option<f64>> = columns
                    .iter()
                    .map(|(name, col)| (name.to_string(), col[i]))
                    .collect();
                AlignedRow::new(start + Duration::days(i as i64), values)
            })
            .collect();
        AlignedDataset::new(
            columns.iter().map(|(n, _)| n.to_string()).collect(),
            rows,
        )
    }

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_recovers_exact_linear_model() {
        // close = 5 + 2a - 3b
        let a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let b = [0.5, 0.1, 0.9, 0.3, 0.7, 0.2];
        let close: Vec<f64> = a.iter().zip(&b).map(|(a, b)| 5.0 + 2.0 * a - 3.0 * b).collect();

        let ds = dataset(&[("close", some(&close)), ("a", some(&a)), ("b", some(&b))]);
        let fit = regress(&ds, "close", &["a", "b"]).unwrap();

        assert!((fit.coefficient("a").unwrap() - 2.0).abs() < 1e-8);
        assert!((fit.coefficient("b").unwrap() + 3.0).abs() < 1e-8);
        assert!((fit.intercept - 5.0).abs() < 1e-8);
        assert!((fit.r_squared - 1.0).abs() < 1e-9);
        assert_eq!(fit.observations, 6);
    }

    #[test]
    fn test_r_squared_bounded_on_noise() {
        let ds = dataset(&[
            ("close", some(&[3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0])),
            ("a", some(&[2.0, 7.0, 1.0, 8.0, 2.0, 8.0, 1.0, 8.0])),
        ]);
        let fit = regress(&ds, "close", &["a"]).unwrap();
        assert!((0.0..=1.0).contains(&fit.r_squared));
    }

    #[test]
    fn test_too_few_rows_is_insufficient() {
        let ds = dataset(&[
            ("close", some(&[1.0, 2.0, 3.0])),
            ("a", some(&[1.0, 0.0, 2.0])),
            ("b", some(&[0.5, 1.0, 0.0])),
            ("c", some(&[3.0, 1.0, 2.0])),
        ]);
        let err = regress(&ds, "close", &["a", "b", "c"]).unwrap_err();
        assert_eq!(err, AnalysisError::insufficient("joint regression", 3, 4));
    }

    #[test]
    fn test_incomplete_rows_are_excluded() {
        let ds = dataset(&[
            ("close", vec![Some(1.0), Some(2.0), None, Some(4.0), Some(5.0)]),
            ("a", vec![Some(1.0), Some(2.0), Some(3.0), None, Some(5.0)]),
        ]);
        let fit = regress(&ds, "close", &["a"]).unwrap();
        assert_eq!(fit.observations, 3);
    }

    #[test]
    fn test_zero_variance_factor_gets_zero_coefficient() {
        let ds = dataset(&[
            ("close", some(&[1.0, 3.0, 5.0, 7.0])),
            ("a", some(&[0.0, 1.0, 2.0, 3.0])),
            ("temperature", some(&[20.0; 4])),
        ]);
        let fit = regress(&ds, "close", &["a", "temperature"]).unwrap();
        assert_eq!(fit.coefficient("temperature"), Some(0.0));
        assert!((fit.coefficient("a").unwrap() - 2.0).abs() < 1e-9);
        assert!((fit.intercept - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_collinear_factors_are_singular() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b: Vec<f64> = a.iter().map(|v| 2.0 * v + 1.0).collect();
        let ds = dataset(&[
            ("close", some(&[2.0, 1.0, 4.0, 3.0, 6.0])),
            ("a", some(&a)),
            ("b", some(&b)),
        ]);
        assert_eq!(
            regress(&ds, "close", &["a", "b"]).unwrap_err(),
            AnalysisError::SingularDesign
        );
    }

    #[test]
    fn test_constant_target_reports_perfect_fit() {
        let ds = dataset(&[("close", some(&[7.0; 5])), ("a", some(&[1.0, 2.0, 3.0, 4.0, 5.0]))]);
        let fit = regress(&ds, "close", &["a"]).unwrap();
        assert_eq!(fit.r_squared, 1.0);
        assert!(fit.coefficient("a").unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_cholesky_solve() {
        let a = array![[4.0, 2.0], [2.0, 3.0]];
        let b = array![2.0, 1.0];
        let x = cholesky_solve(&a, &b).unwrap();
        assert!((x[0] - 0.5).abs() < 1e-12);
        assert!(x[1].abs() < 1e-12);
    }
}
