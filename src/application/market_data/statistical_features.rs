//! Summary statistics over price and weather series
//!
//! This module provides calculations for:
//! - Daily percent change and its volatility
//! - Skewness of daily returns (distribution asymmetry)
//! - Least-squares trend slope of an evenly spaced series

use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Distribution};

/// Headline statistics of a close-price series, in percent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSummary {
    pub observations: usize,
    pub first_close: f64,
    pub last_close: f64,
    /// Mean day-over-day percent change
    pub mean_daily_change_pct: Option<f64>,
    /// Sample standard deviation of the day-over-day percent change
    pub volatility_pct: Option<f64>,
    pub return_skewness: Option<f64>,
}

/// Summarize a close series. Returns `None` for an empty series.
pub fn summarize_closes(closes: &[f64]) -> Option<MarketSummary> {
    let first_close = *closes.first()?;
    let last_close = *closes.last()?;

    let returns = percent_changes(closes);
    let (mean, volatility) = if returns.is_empty() {
        (None, None)
    } else {
        // f64 boundary for the statistical library
        let data = Data::new(returns.clone());
        let std = if returns.len() >= 2 { data.std_dev() } else { None };
        (data.mean(), std)
    };

    Some(MarketSummary {
        observations: closes.len(),
        first_close,
        last_close,
        mean_daily_change_pct: mean,
        volatility_pct: volatility,
        return_skewness: calculate_skewness(&returns),
    })
}

/// Day-over-day percent changes, skipping steps from a zero close
pub fn percent_changes(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0] * 100.0)
        .collect()
}

/// Slope of the least-squares line through `(i, values[i])`
pub fn trend_slope(values: &[f64]) -> Option<f64> {
    let x: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    linear_regression_slope(&x, values)
}

/// Simple linear regression to find slope
pub fn linear_regression_slope(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }

    let n = x.len() as f64;
    let sum_x: f64 = x.iter().sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xy: f64 = x.iter().zip(y.iter()).map(|(xi, yi)| xi * yi).sum();
    let sum_x2: f64 = x.iter().map(|xi| xi * xi).sum();

    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator.abs() < 1e-10 {
        return None;
    }

    Some((n * sum_xy - sum_x * sum_y) / denominator)
}

/// Calculate skewness of a distribution
///
/// - Skew = 0: Symmetric distribution
/// - Skew > 0: Right tail (positive outliers)
/// - Skew < 0: Left tail (negative outliers)
///
/// Returns `None` with fewer than 3 values or no dispersion.
pub fn calculate_skewness(values: &[f64]) -> Option<f64> {
    if values.len() < 3 {
        return None;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    let std_dev = variance.sqrt();
    if std_dev < 1e-10 {
        return None;
    }

    let skewness = values
        .iter()
        .map(|v| ((v - mean) / std_dev).powi(3))
        .sum::<f64>()
        / n;

    Some(skewness)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_of_rising_series() {
        let closes = vec![100.0, 110.0, 121.0];
        let summary = summarize_closes(&closes).unwrap();

        assert_eq!(summary.observations, 3);
        assert!((summary.mean_daily_change_pct.unwrap() - 10.0).abs() < 1e-9);
        assert!(summary.volatility_pct.unwrap().abs() < 1e-9);
        assert_eq!(summary.last_close, 121.0);
    }

    #[test]
    fn test_summary_single_close_has_no_changes() {
        let summary = summarize_closes(&[50.0]).unwrap();
        assert!(summary.mean_daily_change_pct.is_none());
        assert!(summary.volatility_pct.is_none());
        assert!(summarize_closes(&[]).is_none());
    }

    #[test]
    fn test_trend_slope() {
        let values = vec![1.0, 3.0, 5.0, 7.0];
        assert!((trend_slope(&values).unwrap() - 2.0).abs() < 1e-12);
        assert!(trend_slope(&[4.0]).is_none());
    }

    #[test]
    fn test_skewness_positive() {
        let values = vec![1.0, 1.0, 1.0, 1.0, 10.0];
        assert!(calculate_skewness(&values).unwrap() > 0.0);
    }

    #[test]
    fn test_skewness_negative() {
        let values = vec![1.0, 10.0, 10.0, 10.0, 10.0];
        assert!(calculate_skewness(&values).unwrap() < 0.0);
    }

    #[test]
    fn test_skewness_flat_is_undefined() {
        assert!(calculate_skewness(&[2.0, 2.0, 2.0]).is_none());
    }
}
