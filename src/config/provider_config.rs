//! Data provider configuration parsing from environment variables.
//!
//! This module handles loading credentials and endpoints for the upstream sources:
//! - Alpaca (daily price bars)
//! - OpenWeatherMap (geocoding, historical weather, alerts)
//! - NewsAPI (headlines)

use std::env;

/// Alpaca market data configuration
#[derive(Debug, Clone, Default)]
pub struct AlpacaConfig {
    pub api_key: String,
    pub secret_key: String,
    pub data_url: String,
}

impl AlpacaConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: env::var("ALPACA_API_KEY").unwrap_or_default(),
            secret_key: env::var("ALPACA_SECRET_KEY").unwrap_or_default(),
            data_url: env::var("ALPACA_DATA_URL")
                .unwrap_or_else(|_| "https://data.alpaca.markets".to_string()),
        }
    }
}

/// OpenWeatherMap configuration
#[derive(Debug, Clone, Default)]
pub struct OpenWeatherConfig {
    pub api_key: String,
    pub base_url: String,
    pub geo_url: String,
}

impl OpenWeatherConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: env::var("OPENWEATHER_API_KEY").unwrap_or_default(),
            base_url: env::var("OPENWEATHER_BASE_URL")
                .unwrap_or_else(|_| "https://api.openweathermap.org/data/2.5".to_string()),
            geo_url: env::var("OPENWEATHER_GEO_URL")
                .unwrap_or_else(|_| "https://api.openweathermap.org/geo/1.0/direct".to_string()),
        }
    }
}

/// NewsAPI configuration
#[derive(Debug, Clone, Default)]
pub struct NewsApiConfig {
    pub api_key: String,
    pub base_url: String,
}

impl NewsApiConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: env::var("NEWSAPI_API_KEY").unwrap_or_default(),
            base_url: env::var("NEWSAPI_BASE_URL")
                .unwrap_or_else(|_| "https://newsapi.org".to_string()),
        }
    }
}

/// Aggregated provider configuration
#[derive(Debug, Clone, Default)]
pub struct ProviderEnvConfig {
    pub alpaca: AlpacaConfig,
    pub openweather: OpenWeatherConfig,
    pub newsapi: NewsApiConfig,
}

impl ProviderEnvConfig {
    pub fn from_env() -> Self {
        Self {
            alpaca: AlpacaConfig::from_env(),
            openweather: OpenWeatherConfig::from_env(),
            newsapi: NewsApiConfig::from_env(),
        }
    }

    /// Names of the credentials that are still empty
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.alpaca.api_key.is_empty() {
            missing.push("ALPACA_API_KEY");
        }
        if self.alpaca.secret_key.is_empty() {
            missing.push("ALPACA_SECRET_KEY");
        }
        if self.openweather.api_key.is_empty() {
            missing.push("OPENWEATHER_API_KEY");
        }
        if self.newsapi.api_key.is_empty() {
            missing.push("NEWSAPI_API_KEY");
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credentials_listed() {
        let config = ProviderEnvConfig {
            alpaca: AlpacaConfig {
                api_key: "key".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        let missing = config.missing_credentials();
        assert!(!missing.contains(&"ALPACA_API_KEY"));
        assert!(missing.contains(&"ALPACA_SECRET_KEY"));
        assert!(missing.contains(&"OPENWEATHER_API_KEY"));
        assert!(missing.contains(&"NEWSAPI_API_KEY"));
    }
}
