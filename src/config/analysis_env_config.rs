//! Analysis configuration parsing from environment variables.
//!
//! Indicator windows, model hyper-parameters and prediction defaults.

use anyhow::{Context, Result};
use std::env;

/// Analysis environment configuration
#[derive(Debug, Clone)]
pub struct AnalysisEnvConfig {
    pub short_sma_window: usize,
    pub long_sma_window: usize,
    pub rsi_period: usize,
    pub n_trees: usize,
    pub max_depth: u16,
    pub min_split: usize,
    pub model_seed: Option<u64>,
    pub sequence_window: usize,
    pub sequence_hidden_width: usize,
    pub sequence_layers: usize,
    pub prediction_lookback_days: u32,
    pub default_location: String,
}

impl AnalysisEnvConfig {
    pub fn from_env() -> Result<Self> {
        let model_seed = match env::var("MODEL_SEED") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse::<u64>()
                    .context("Failed to parse MODEL_SEED")?,
            ),
            _ => None,
        };

        Ok(Self {
            short_sma_window: Self::parse_usize("SMA_SHORT_WINDOW", 20)?,
            long_sma_window: Self::parse_usize("SMA_LONG_WINDOW", 50)?,
            rsi_period: Self::parse_usize("RSI_PERIOD", 14)?,
            n_trees: Self::parse_usize("MODEL_N_TREES", 100)?,
            max_depth: env::var("MODEL_MAX_DEPTH")
                .unwrap_or_else(|_| "10".to_string())
                .parse::<u16>()
                .context("Failed to parse MODEL_MAX_DEPTH")?,
            min_split: Self::parse_usize("MODEL_MIN_SPLIT", 2)?,
            model_seed,
            sequence_window: Self::parse_usize("SEQUENCE_WINDOW", 10)?,
            sequence_hidden_width: Self::parse_usize("SEQUENCE_HIDDEN_WIDTH", 16)?,
            sequence_layers: Self::parse_usize("SEQUENCE_LAYERS", 1)?,
            prediction_lookback_days: env::var("PREDICTION_LOOKBACK_DAYS")
                .unwrap_or_else(|_| "120".to_string())
                .parse::<u32>()
                .context("Failed to parse PREDICTION_LOOKBACK_DAYS")?,
            default_location: env::var("DEFAULT_LOCATION")
                .unwrap_or_else(|_| "New York".to_string()),
        })
    }

    fn parse_usize(key: &str, default: usize) -> Result<usize> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<usize>()
            .context(format!("Failed to parse {}", key))
    }
}
