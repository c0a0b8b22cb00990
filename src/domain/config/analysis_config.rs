//! Analysis Configuration Domain Value Object
//!
//! This module defines the `AnalysisConfig` value object, which carries the
//! indicator windows and model hyper-parameters used by every request, with
//! validation on construction.

use thiserror::Error;

/// Error type for AnalysisConfig validation
#[derive(Debug, Error, PartialEq)]
pub enum AnalysisConfigError {
    #[error("Invalid window: {field} = {value}. Must be positive")]
    InvalidWindow { field: String, value: usize },

    #[error("Short window ({short}) must be smaller than long window ({long})")]
    WindowOrder { short: usize, long: usize },

    #[error("Invalid model parameter: {field} = {value}. Must be positive")]
    InvalidModelParameter { field: String, value: usize },
}

/// Indicator windows and model hyper-parameters
///
/// # Invariants
///
/// - All windows and sizes are > 0
/// - `short_sma_window < long_sma_window`
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub short_sma_window: usize,
    pub long_sma_window: usize,
    pub rsi_period: usize,

    pub n_trees: usize,
    pub max_depth: u16,
    pub min_split: usize,
    /// `None` draws a fresh seed per training run
    pub model_seed: Option<u64>,

    pub sequence_window: usize,
    pub sequence_hidden_width: usize,
    pub sequence_layers: usize,

    /// Calendar days of history used to train `predict_future`
    pub prediction_lookback_days: u32,
    pub default_location: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            short_sma_window: 20,
            long_sma_window: 50,
            rsi_period: 14,
            n_trees: 100,
            max_depth: 10,
            min_split: 2,
            model_seed: None,
            sequence_window: 10,
            sequence_hidden_width: 16,
            sequence_layers: 1,
            prediction_lookback_days: 120,
            default_location: "New York".to_string(),
        }
    }
}

impl AnalysisConfig {
    /// Validate all invariants
    pub fn validate(&self) -> Result<(), AnalysisConfigError> {
        for (field, value) in [
            ("short_sma_window", self.short_sma_window),
            ("long_sma_window", self.long_sma_window),
            ("rsi_period", self.rsi_period),
            ("sequence_window", self.sequence_window),
        ] {
            if value == 0 {
                return Err(AnalysisConfigError::InvalidWindow {
                    field: field.to_string(),
                    value,
                });
            }
        }

        if self.short_sma_window >= self.long_sma_window {
            return Err(AnalysisConfigError::WindowOrder {
                short: self.short_sma_window,
                long: self.long_sma_window,
            });
        }

        for (field, value) in [
            ("n_trees", self.n_trees),
            ("max_depth", self.max_depth as usize),
            ("min_split", self.min_split),
            ("sequence_hidden_width", self.sequence_hidden_width),
            ("sequence_layers", self.sequence_layers),
            ("prediction_lookback_days", self.prediction_lookback_days as usize),
        ] {
            if value == 0 {
                return Err(AnalysisConfigError::InvalidModelParameter {
                    field: field.to_string(),
                    value,
                });
            }
        }

        Ok(())
    }
}
