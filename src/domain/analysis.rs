//! Typed outputs of the analysis pipeline stages.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Price row enriched with trailing-window indicators. Warm-up rows carry `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub date: NaiveDate,
    pub close: f64,
    pub sma_short: Option<f64>,
    pub sma_long: Option<f64>,
    pub rsi: Option<f64>,
}

/// Pearson correlation between a target and one factor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationResult {
    pub target: String,
    pub factor: String,
    /// In [-1, 1]
    pub coefficient: f64,
    /// Two-sided p-value in [0, 1]
    pub p_value: f64,
    pub observations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorEffect {
    pub factor: String,
    pub coefficient: f64,
}

/// Joint linear attribution of a target on several factors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionAttribution {
    pub target: String,
    pub effects: Vec<FactorEffect>,
    pub intercept: f64,
    /// Fraction of target variance explained, in [0, 1]
    pub r_squared: f64,
    pub observations: usize,
}

impl RegressionAttribution {
    pub fn coefficient(&self, factor: &str) -> Option<f64> {
        self.effects
            .iter()
            .find(|e| e.factor == factor)
            .map(|e| e.coefficient)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePrediction {
    pub date: NaiveDate,
    pub price: f64,
}

/// Result of a sub-computation whose failure must not sink the whole response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome<T> {
    Ok { value: T },
    Failed { kind: String, message: String },
}

impl<T> Outcome<T> {
    pub fn failed(kind: &str, message: impl Into<String>) -> Self {
        Outcome::Failed {
            kind: kind.to_string(),
            message: message.into(),
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Ok { value } => Some(value),
            Outcome::Failed { .. } => None,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok { .. })
    }

    pub fn failure_kind(&self) -> Option<&str> {
        match self {
            Outcome::Ok { .. } => None,
            Outcome::Failed { kind, .. } => Some(kind),
        }
    }
}

impl<T> From<Result<T, crate::domain::errors::AnalysisError>> for Outcome<T> {
    fn from(result: Result<T, crate::domain::errors::AnalysisError>) -> Self {
        match result {
            Ok(value) => Outcome::Ok { value },
            Err(e) => Outcome::failed(e.kind(), e.to_string()),
        }
    }
}

impl<T> From<Result<T, crate::domain::errors::ModelError>> for Outcome<T> {
    fn from(result: Result<T, crate::domain::errors::ModelError>) -> Self {
        match result {
            Ok(value) => Outcome::Ok { value },
            Err(e) => Outcome::failed(e.kind(), e.to_string()),
        }
    }
}
