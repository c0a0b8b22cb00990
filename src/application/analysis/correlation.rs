use crate::application::analysis::regression;
use crate::domain::aligned::AlignedDataset;
use crate::domain::analysis::{CorrelationResult, Outcome, RegressionAttribution};
use crate::domain::errors::AnalysisError;
use crate::domain::series::fields;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use tracing::{debug, info};

/// Field every factor is measured against by default
pub const CANONICAL_TARGET: &str = fields::CLOSE;

/// Factors screened pairwise against the target
pub const CANONICAL_FACTORS: &[&str] = &[
    fields::TEMPERATURE,
    fields::HUMIDITY,
    fields::PRECIPITATION,
    fields::WIND_SPEED,
    fields::SENTIMENT_SCORE,
];

/// Factors attributed jointly by the combined regression
pub const REGRESSION_FACTORS: &[&str] = &[
    fields::TEMPERATURE,
    fields::PRECIPITATION,
    fields::SENTIMENT_SCORE,
];

/// Pairwise correlations plus the joint attribution. The regression can fail
/// on its own without discarding the pairwise results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationReport {
    pub correlations: Vec<CorrelationResult>,
    pub regression: Outcome<RegressionAttribution>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CorrelationAnalyzer;

impl CorrelationAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Pearson correlation of `target` with each factor independently.
    ///
    /// Each pair uses the rows where both values are present. Pairs with fewer
    /// than 2 such rows, or with a constant side, are omitted from the result.
    pub fn correlate(
        &self,
        dataset: &AlignedDataset,
        target: &str,
        factors: &[&str],
    ) -> Result<Vec<CorrelationResult>, AnalysisError> {
        if dataset.len() < 2 {
            return Err(AnalysisError::insufficient("correlation", dataset.len(), 2));
        }

        let mut results = Vec::with_capacity(factors.len());
        for factor in factors {
            let (ys, xs) = dataset.paired(target, factor);
            match pearson(&xs, &ys) {
                Some(r) => {
                    let n = xs.len();
                    results.push(CorrelationResult {
                        target: target.to_string(),
                        factor: factor.to_string(),
                        coefficient: r,
                        p_value: two_sided_p_value(r, n),
                        observations: n,
                    });
                }
                None => debug!(
                    "CorrelationAnalyzer: omitting {} vs {} ({} paired rows, or zero variance)",
                    target,
                    factor,
                    xs.len()
                ),
            }
        }

        info!(
            "CorrelationAnalyzer: {} of {} factors correlated with '{}' over {} rows",
            results.len(),
            factors.len(),
            target,
            dataset.len()
        );
        Ok(results)
    }

    /// Joint least-squares attribution of `target` on `factors`
    pub fn regress(
        &self,
        dataset: &AlignedDataset,
        target: &str,
        factors: &[&str],
    ) -> Result<RegressionAttribution, AnalysisError> {
        regression::regress(dataset, target, factors)
    }

    pub fn analyze(
        &self,
        dataset: &AlignedDataset,
        target: &str,
        correlation_factors: &[&str],
        regression_factors: &[&str],
    ) -> Result<CorrelationReport, AnalysisError> {
        let correlations = self.correlate(dataset, target, correlation_factors)?;
        let regression = self.regress(dataset, target, regression_factors).into();
        Ok(CorrelationReport {
            correlations,
            regression,
        })
    }
}

/// Pearson r, `None` with fewer than 2 pairs or a constant side
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let (mean_x, ss_x) = mean_and_sum_sq(xs);
    let (mean_y, ss_y) = mean_and_sum_sq(ys);
    if !has_variance(mean_x, ss_x, xs.len()) || !has_variance(mean_y, ss_y, ys.len()) {
        return None;
    }

    let cov: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();
    Some((cov / (ss_x.sqrt() * ss_y.sqrt())).clamp(-1.0, 1.0))
}

/// Two-sided p-value of `t = r * sqrt((n - 2) / (1 - r^2))` on `n - 2` degrees of freedom
pub fn two_sided_p_value(r: f64, n: usize) -> f64 {
    if n <= 2 {
        return 1.0;
    }
    let r2 = r * r;
    if r2 >= 1.0 {
        return 0.0;
    }

    let df = (n - 2) as f64;
    let t = r * (df / (1.0 - r2)).sqrt();
    let dist = StudentsT::new(0.0, 1.0, df).expect("degrees of freedom must be > 0");
    (2.0 * dist.sf(t.abs())).clamp(0.0, 1.0)
}

pub(crate) fn mean_and_sum_sq(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let ss = values.iter().map(|v| (v - mean).powi(2)).sum();
    (mean, ss)
}

/// Relative test so that summation rounding on a constant column reads as zero variance
pub(crate) fn has_variance(mean: f64, sum_sq: f64, n: usize) -> bool {
    sum_sq > 1e-12 * n as f64 * mean.powi(2).max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aligned::AlignedRow;
    use chrono::{Duration, NaiveDate};
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
    fn test_perfect_linear_relation() {
        let ds = dataset(&[
            ("close", some(&[1.0, 2.0, 3.0, 4.0, 5.0])),
            ("up", some(&[10.0, 20.0, 30.0, 40.0, 50.0])),
            ("down", some(&[5.0, 4.0, 3.0, 2.0, 1.0])),
        ]);

        let results = CorrelationAnalyzer::new()
            .correlate(&ds, "close", &["up", "down"])
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!((results[0].coefficient - 1.0).abs() < 1e-12);
        assert_eq!(results[0].p_value, 0.0);
        assert!((results[1].coefficient + 1.0).abs() < 1e-12);
        assert_eq!(results[1].p_value, 0.0);
    }

    #[test]
    fn test_correlation_is_symmetric_and_bounded() {
        let a = [1.0, 3.0, 2.0, 5.0, 4.0, 6.0];
        let b = [2.0, 1.0, 4.0, 3.0, 6.0, 5.0];
        let r_ab = pearson(&a, &b).unwrap();
        let r_ba = pearson(&b, &a).unwrap();
        assert!((r_ab - r_ba).abs() < 1e-12);
        assert!((-1.0..=1.0).contains(&r_ab));

        let p = two_sided_p_value(r_ab, a.len());
        assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn test_known_p_value() {
        // r = 0.5, n = 10 -> t = 1.633 on 8 df, two-sided p ~= 0.1411
        let p = two_sided_p_value(0.5, 10);
        assert!((p - 0.1411).abs() < 1e-3, "p = {}", p);
    }

    #[test]
    fn test_strong_correlation_keeps_nonzero_p_value() {
        // t ~= 53.9 on 58 df, far past where 1 - cdf rounds to zero
        let p = two_sided_p_value(0.99, 60);
        assert!(p > 0.0, "p = {}", p);
        assert!(p < 1e-20, "p = {}", p);
    }

    #[test]
    fn test_two_observations_have_unit_p_value() {
        let ds = dataset(&[("close", some(&[1.0, 2.0])), ("x", some(&[3.0, 5.0]))]);
        let results = CorrelationAnalyzer::new()
            .correlate(&ds, "close", &["x"])
            .unwrap();
        assert_eq!(results[0].observations, 2);
        assert_eq!(results[0].p_value, 1.0);
    }

    #[test]
    fn test_zero_variance_factor_is_omitted() {
        let ds = dataset(&[
            ("close", some(&[1.0, 2.0, 3.0, 4.0])),
            ("temperature", some(&[20.0; 4])),
        ]);
        let results = CorrelationAnalyzer::new()
            .correlate(&ds, "close", &["temperature"])
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_missing_values_reduce_observations() {
        let ds = dataset(&[
            ("close", some(&[1.0, 2.0, 3.0, 4.0, 5.0])),
            ("x", vec![Some(2.0), None, Some(6.0), Some(8.0), None]),
        ]);
        let results = CorrelationAnalyzer::new()
            .correlate(&ds, "close", &["x"])
            .unwrap();
        assert_eq!(results[0].observations, 3);
    }

    #[test]
    fn test_factor_with_single_pair_is_omitted() {
        let ds = dataset(&[
            ("close", some(&[1.0, 2.0, 3.0])),
            ("x", vec![Some(2.0), None, None]),
        ]);
        let results = CorrelationAnalyzer::new()
            .correlate(&ds, "close", &["x", "absent"])
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_empty_dataset_is_insufficient() {
        let err = CorrelationAnalyzer::new()
            .correlate(&AlignedDataset::empty(), "close", CANONICAL_FACTORS)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientData { available: 0, .. }));
    }

    #[test]
    fn test_analyze_scopes_regression_failure() {
        let ds = dataset(&[
            ("close", some(&[1.0, 2.0, 3.0])),
            ("a", some(&[1.0, 0.0, 2.0])),
            ("b", some(&[0.5, 1.0, 0.0])),
            ("c", some(&[3.0, 1.0, 2.0])),
        ]);

        let report = CorrelationAnalyzer::new()
            .analyze(&ds, "close", &["a", "b", "c"], &["a", "b", "c"])
            .unwrap();

        assert_eq!(report.correlations.len(), 3);
        assert_eq!(report.regression.failure_kind(), Some("InsufficientDataError"));
    }
}
