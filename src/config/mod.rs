//! Configuration module for Weathervane.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: Providers, Analysis, and Observability.

mod analysis_env_config;
mod observability_config;
mod provider_config;

pub use analysis_env_config::AnalysisEnvConfig;
pub use observability_config::ObservabilityEnvConfig;
pub use provider_config::{AlpacaConfig, NewsApiConfig, OpenWeatherConfig, ProviderEnvConfig};

use crate::domain::config::AnalysisConfig;
use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Where the raw series come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Deterministic in-memory sources
    Mock,
    /// Alpaca, OpenWeatherMap and NewsAPI over HTTP
    Live,
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(Mode::Mock),
            "live" => Ok(Mode::Live),
            _ => anyhow::bail!("Invalid MODE: {}. Must be 'mock' or 'live'", s),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    /// Seed of the synthetic mock series
    pub mock_seed: u64,
    pub providers: ProviderEnvConfig,
    pub analysis: AnalysisEnvConfig,
    pub observability: ObservabilityEnvConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let mode_str = env::var("MODE").unwrap_or_else(|_| "mock".to_string());
        let mode = Mode::from_str(&mode_str)?;

        let mock_seed = env::var("MOCK_SEED")
            .unwrap_or_else(|_| "42".to_string())
            .parse::<u64>()
            .context("Failed to parse MOCK_SEED")?;

        let providers = ProviderEnvConfig::from_env();
        let analysis = AnalysisEnvConfig::from_env().context("Failed to load analysis config")?;
        let observability = ObservabilityEnvConfig::from_env();

        Ok(Self {
            mode,
            mock_seed,
            providers,
            analysis,
            observability,
        })
    }

    /// Create an AnalysisConfig domain value object from this Config
    pub fn to_analysis_config(&self) -> Result<AnalysisConfig> {
        let a = &self.analysis;
        let config = AnalysisConfig {
            short_sma_window: a.short_sma_window,
            long_sma_window: a.long_sma_window,
            rsi_period: a.rsi_period,
            n_trees: a.n_trees,
            max_depth: a.max_depth,
            min_split: a.min_split,
            model_seed: a.model_seed,
            sequence_window: a.sequence_window,
            sequence_hidden_width: a.sequence_hidden_width,
            sequence_layers: a.sequence_layers,
            prediction_lookback_days: a.prediction_lookback_days,
            default_location: a.default_location.clone(),
        };
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid analysis config: {}", e))?;
        Ok(config)
    }
}
