use chrono::NaiveDate;
use std::fmt;
use thiserror::Error;

/// Identifies which upstream collaborator produced a fetch failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Price,
    Weather,
    News,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Price => write!(f, "price"),
            DataSource::Weather => write!(f, "weather"),
            DataSource::News => write!(f, "news"),
        }
    }
}

/// Errors raised while acquiring the raw series for a request
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Upstream {origin} fetch failed: {cause:#}")]
    UpstreamFetch {
        origin: DataSource,
        cause: anyhow::Error,
    },

    #[error("Location not found: {location}")]
    LocationNotFound { location: String },
}

/// Errors raised by the statistical analysis stages
#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    #[error("Insufficient data for {computation}: {available} usable rows, need at least {required}")]
    InsufficientData {
        computation: String,
        available: usize,
        required: usize,
    },

    #[error("Regression design matrix is singular (factors are collinear)")]
    SingularDesign,
}

/// Errors raised by the prediction models
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("Model '{model}' has not been trained")]
    NotTrained { model: String },

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Insufficient training data: {available} rows, need at least {required}")]
    InsufficientData { available: usize, required: usize },

    #[error("Model training failed: {reason}")]
    Training { reason: String },
}

/// Umbrella error for the operations exposed by the fusion service
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl EngineError {
    /// Stable error kind name surfaced to callers alongside the message
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Fetch(FetchError::InvalidRange { .. }) => "InvalidRangeError",
            EngineError::Fetch(FetchError::UpstreamFetch { .. }) => "UpstreamFetchError",
            EngineError::Fetch(FetchError::LocationNotFound { .. }) => "LocationNotFoundError",
            EngineError::Analysis(e) => e.kind(),
            EngineError::Model(e) => e.kind(),
        }
    }
}

impl AnalysisError {
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::InsufficientData { .. } => "InsufficientDataError",
            AnalysisError::SingularDesign => "SingularDesignError",
        }
    }

    pub fn insufficient(computation: impl Into<String>, available: usize, required: usize) -> Self {
        AnalysisError::InsufficientData {
            computation: computation.into(),
            available,
            required,
        }
    }
}

impl ModelError {
    pub fn kind(&self) -> &'static str {
        match self {
            ModelError::NotTrained { .. } => "ModelNotTrainedError",
            ModelError::ShapeMismatch { .. } => "ShapeMismatchError",
            ModelError::InsufficientData { .. } => "InsufficientDataError",
            ModelError::Training { .. } => "ModelTrainingError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_fetch_formatting() {
        let error = FetchError::UpstreamFetch {
            origin: DataSource::Weather,
            cause: anyhow::anyhow!("connection reset"),
        };

        let msg = error.to_string();
        assert!(msg.contains("weather"));
        assert!(msg.contains("connection reset"));
    }

    #[test]
    fn test_insufficient_data_formatting() {
        let error = AnalysisError::insufficient("joint regression", 2, 4);

        let msg = error.to_string();
        assert!(msg.contains("joint regression"));
        assert!(msg.contains("2 usable rows"));
        assert!(msg.contains("at least 4"));
    }

    #[test]
    fn test_engine_error_kinds() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        let err: EngineError = FetchError::InvalidRange { start, end }.into();
        assert_eq!(err.kind(), "InvalidRangeError");

        let err: EngineError = ModelError::NotTrained {
            model: "tree_ensemble".to_string(),
        }
        .into();
        assert_eq!(err.kind(), "ModelNotTrainedError");

        let err: EngineError = AnalysisError::insufficient("correlation", 0, 2).into();
        assert_eq!(err.kind(), "InsufficientDataError");
    }
}
