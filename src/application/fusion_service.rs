//! Request pipeline behind the three public operations.
//!
//! Every request runs the same ordered stages over freshly fetched data:
//! fetch, align, then indicators, correlation and prediction over the
//! immutable aligned dataset. Only the trained models outlive a request.

use crate::application::analysis::correlation::{
    CANONICAL_FACTORS, CANONICAL_TARGET, CorrelationAnalyzer, CorrelationReport,
    REGRESSION_FACTORS,
};
use crate::application::analysis::weather_patterns::{WeatherPatterns, analyze_weather_patterns};
use crate::application::fetch::{FetchOrchestrator, FetchedSeries};
use crate::application::market_data::aligner::align;
use crate::application::market_data::indicators::{IndicatorConfig, TechnicalIndicatorEngine};
use crate::application::market_data::statistical_features::{MarketSummary, summarize_closes};
use crate::application::ml::features::{FeatureMatrix, Target, sequence_windows};
use crate::application::ml::model_store::ModelStore;
use crate::application::ml::scaler::StandardScaler;
use crate::application::ml::sequence_model::SequenceModelConfig;
use crate::application::ml::tree_ensemble::{TreeEnsemble, TreeEnsembleConfig};
use crate::config::{Config, Mode};
use crate::domain::aligned::AlignedDataset;
use crate::domain::analysis::{IndicatorRow, Outcome, PricePrediction};
use crate::domain::config::AnalysisConfig;
use crate::domain::errors::{EngineError, ModelError};
use crate::domain::ml::feature_registry::{FEATURE_NAMES, PRICE_INDEX};
use crate::domain::ports::{NewsDataSource, PriceDataSource, WeatherDataSource};
use crate::domain::sentiment::SentimentItem;
use crate::domain::series::{DateRange, WeatherAlert};
use crate::infrastructure::alpaca::AlpacaPriceSource;
use crate::infrastructure::mock::{MockNewsSource, MockPriceSource, MockWeatherSource};
use crate::infrastructure::news::{NewsApiSource, SentimentAnalyzer};
use crate::infrastructure::observability::Metrics;
use crate::infrastructure::weather::OpenWeatherSource;
use anyhow::Context;
use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Ridge penalty of the sequence readout fit
const SEQUENCE_RIDGE: f64 = 1e-2;

/// Shape of the aligned dataset a response was computed from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub ticker: String,
    pub location: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub rows: usize,
    pub fields: Vec<String>,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

/// Model outputs of a full analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelPredictions {
    /// In-sample ensemble estimates, dated at the close they predict
    pub fitted: Vec<PricePrediction>,
    /// Ensemble estimate of the next trading day's close
    pub ensemble_next: PricePrediction,
    /// Sequence model estimate of the same close
    pub sequence_next: Outcome<PricePrediction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FullAnalysis {
    pub request_id: Uuid,
    pub dataset: DatasetSummary,
    pub indicators: Vec<IndicatorRow>,
    pub correlation: Outcome<CorrelationReport>,
    pub predictions: Outcome<ModelPredictions>,
    pub market_summary: Option<MarketSummary>,
    pub weather_patterns: WeatherPatterns,
    pub sentiment: Vec<SentimentItem>,
    /// Aligned rows, kept for export
    #[serde(skip)]
    pub aligned: AlignedDataset,
}

pub struct FusionService {
    orchestrator: FetchOrchestrator,
    sentiment: Arc<SentimentAnalyzer>,
    indicators: TechnicalIndicatorEngine,
    analyzer: CorrelationAnalyzer,
    models: ModelStore,
    config: AnalysisConfig,
    metrics: Metrics,
}

impl FusionService {
    pub fn new(
        prices: Arc<dyn PriceDataSource>,
        weather: Arc<dyn WeatherDataSource>,
        news: Arc<dyn NewsDataSource>,
        config: AnalysisConfig,
        metrics: Metrics,
    ) -> anyhow::Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid analysis config: {}", e))?;

        let indicators = TechnicalIndicatorEngine::new(IndicatorConfig::from_analysis_config(
            &config,
        )?);
        let models = ModelStore::new(
            TreeEnsembleConfig::from_analysis_config(&config),
            SequenceModelConfig::from_analysis_config(&config, FEATURE_NAMES.len()),
        )
        .context("Failed to initialize models")?;

        let sentiment = Arc::new(SentimentAnalyzer::new());
        let orchestrator =
            FetchOrchestrator::new(prices, weather, news, sentiment.clone(), metrics.clone());

        Ok(Self {
            orchestrator,
            sentiment,
            indicators,
            analyzer: CorrelationAnalyzer::new(),
            models,
            config,
            metrics,
        })
    }

    /// Wire the data sources selected by `config.mode`
    pub fn build(config: &Config, metrics: Metrics) -> anyhow::Result<Self> {
        let analysis = config.to_analysis_config()?;

        let (prices, weather, news): (
            Arc<dyn PriceDataSource>,
            Arc<dyn WeatherDataSource>,
            Arc<dyn NewsDataSource>,
        ) = match config.mode {
            Mode::Mock => {
                info!("Using Mock sources (seed {})", config.mock_seed);
                (
                    Arc::new(MockPriceSource::synthetic(config.mock_seed)),
                    Arc::new(MockWeatherSource::synthetic(config.mock_seed)),
                    Arc::new(MockNewsSource::synthetic(config.mock_seed)),
                )
            }
            Mode::Live => {
                let p = &config.providers;
                let missing = p.missing_credentials();
                if !missing.is_empty() {
                    warn!("Missing provider credentials: {}", missing.join(", "));
                }
                info!(
                    "Using live sources (Alpaca {}, OpenWeather {})",
                    p.alpaca.data_url, p.openweather.base_url
                );
                (
                    Arc::new(AlpacaPriceSource::new(
                        p.alpaca.api_key.clone(),
                        p.alpaca.secret_key.clone(),
                        p.alpaca.data_url.clone(),
                    )),
                    Arc::new(OpenWeatherSource::new(
                        p.openweather.api_key.clone(),
                        p.openweather.base_url.clone(),
                        p.openweather.geo_url.clone(),
                    )),
                    Arc::new(NewsApiSource::new(
                        p.newsapi.api_key.clone(),
                        p.newsapi.base_url.clone(),
                    )),
                )
            }
        };

        Self::new(prices, weather, news, analysis, metrics)
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub async fn run_full_analysis(
        &self,
        ticker: &str,
        location: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FullAnalysis, EngineError> {
        let request_id = Uuid::new_v4();
        info!(
            "FusionService [{}]: full analysis of {} in {} ({} to {})",
            request_id, ticker, location, start, end
        );

        let result = self
            .full_analysis(request_id, ticker, location, start, end)
            .await;
        self.record_operation("full_analysis", &result);
        result
    }

    /// Forecast `horizon_days` trading-day closes from the configured lookback window
    pub async fn predict_future(
        &self,
        ticker: &str,
        horizon_days: usize,
    ) -> Result<Vec<PricePrediction>, EngineError> {
        if horizon_days == 0 {
            return Ok(Vec::new());
        }

        let request_id = Uuid::new_v4();
        info!(
            "FusionService [{}]: predicting {} days of {}",
            request_id, horizon_days, ticker
        );

        let result = self.future_prices(request_id, ticker, horizon_days).await;
        self.record_operation("predict_future", &result);
        result
    }

    pub async fn get_alerts(&self, location: &str) -> Result<Vec<WeatherAlert>, EngineError> {
        let result = self
            .orchestrator
            .fetch_alerts(location)
            .await
            .map_err(EngineError::from);
        self.record_operation("get_alerts", &result);
        if let Ok(alerts) = &result {
            info!("FusionService: {} active alerts for {}", alerts.len(), location);
        }
        result
    }

    /// Score free text the same way fetched headlines are scored
    pub fn classify_headline(&self, text: &str) -> SentimentItem {
        self.sentiment.classify(text, Utc::now().date_naive())
    }

    /// Train the ensemble on next-close targets of `dataset` and roll the
    /// last usable row forward, feeding each estimate back as the price.
    pub fn forecast(
        &self,
        dataset: &AlignedDataset,
        horizon_days: usize,
    ) -> Result<Vec<PricePrediction>, ModelError> {
        if horizon_days == 0 {
            return Ok(Vec::new());
        }

        let matrix = FeatureMatrix::from_dataset(dataset, &Target::NextClose);
        let (last_date, last_row) = matrix.latest.clone().ok_or(ModelError::InsufficientData {
            available: 0,
            required: 2,
        })?;

        let result = self
            .models
            .train_and_then(&matrix.features, &matrix.targets, |model| {
                roll_forward(model, last_date, last_row, horizon_days)
            });
        self.record_training("tree_ensemble", &result);
        result
    }

    async fn full_analysis(
        &self,
        request_id: Uuid,
        ticker: &str,
        location: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FullAnalysis, EngineError> {
        let range = DateRange::new(start, end)?;
        let fetched = self.orchestrator.fetch_all(ticker, location, range).await?;
        let dataset = self.align(request_id, &fetched);

        let indicators = self.indicators.compute_from_dataset(&dataset);

        let correlation: Outcome<CorrelationReport> = self
            .analyzer
            .analyze(
                &dataset,
                CANONICAL_TARGET,
                CANONICAL_FACTORS,
                REGRESSION_FACTORS,
            )
            .into();
        if let Outcome::Failed { message, .. } = &correlation {
            warn!("FusionService [{}]: correlation skipped: {}", request_id, message);
        }

        let predictions: Outcome<ModelPredictions> = self.model_predictions(&dataset).into();
        if let Outcome::Failed { message, .. } = &predictions {
            warn!("FusionService [{}]: predictions skipped: {}", request_id, message);
        }

        let mut bars = fetched.prices.clone();
        bars.sort_by_key(|b| b.date);
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

        info!(
            "FusionService [{}]: analysis complete ({} rows, {} indicator rows)",
            request_id,
            dataset.len(),
            indicators.len()
        );

        Ok(FullAnalysis {
            request_id,
            dataset: DatasetSummary {
                ticker: ticker.to_string(),
                location: location.to_string(),
                start,
                end,
                rows: dataset.len(),
                fields: dataset.fields().to_vec(),
                first_date: dataset.rows().first().map(|r| r.date()),
                last_date: dataset.rows().last().map(|r| r.date()),
            },
            indicators,
            correlation,
            predictions,
            market_summary: summarize_closes(&closes),
            weather_patterns: analyze_weather_patterns(&fetched.weather),
            sentiment: fetched.sentiment_items,
            aligned: dataset,
        })
    }

    async fn future_prices(
        &self,
        request_id: Uuid,
        ticker: &str,
        horizon_days: usize,
    ) -> Result<Vec<PricePrediction>, EngineError> {
        let today = Utc::now().date_naive();
        let range = DateRange::trailing(today, self.config.prediction_lookback_days)?;
        let fetched = self
            .orchestrator
            .fetch_all(ticker, &self.config.default_location, range)
            .await?;
        let dataset = self.align(request_id, &fetched);
        Ok(self.forecast(&dataset, horizon_days)?)
    }

    fn align(&self, request_id: Uuid, fetched: &FetchedSeries) -> AlignedDataset {
        let dataset = align(&fetched.to_time_series());
        self.metrics.aligned_rows.set(dataset.len() as f64);
        debug!(
            "FusionService [{}]: aligned {} rows over {} fields",
            request_id,
            dataset.len(),
            dataset.fields().len()
        );
        dataset
    }

    fn model_predictions(&self, dataset: &AlignedDataset) -> Result<ModelPredictions, ModelError> {
        let matrix = FeatureMatrix::from_dataset(dataset, &Target::NextClose);
        let (latest_date, latest_row) = matrix.latest.clone().ok_or(ModelError::InsufficientData {
            available: 0,
            required: 2,
        })?;

        let result = self
            .models
            .train_and_then(&matrix.features, &matrix.targets, |model| {
                Ok((model.predict(&matrix.features)?, model.predict_one(&latest_row)?))
            });
        self.record_training("tree_ensemble", &result);
        let (fitted, next) = result?;

        // Row i predicts the close of the following usable row
        let target_dates = matrix
            .dates
            .iter()
            .skip(1)
            .copied()
            .chain(std::iter::once(latest_date));
        let fitted = target_dates
            .zip(fitted)
            .map(|(date, price)| PricePrediction { date, price })
            .collect();

        let next_date = next_trading_day(latest_date);
        let sequence = self.sequence_prediction(&matrix, &latest_row);
        self.record_training("sequence", &sequence);

        Ok(ModelPredictions {
            fitted,
            ensemble_next: PricePrediction {
                date: next_date,
                price: next,
            },
            sequence_next: sequence
                .map(|price| PricePrediction {
                    date: next_date,
                    price,
                })
                .into(),
        })
    }

    fn sequence_prediction(
        &self,
        matrix: &FeatureMatrix,
        latest_row: &[f64],
    ) -> Result<f64, ModelError> {
        let window = self.config.sequence_window;

        let scaler = StandardScaler::fit(&matrix.features)?;
        let mut rows = matrix.features.clone();
        rows.push(latest_row.to_vec());
        let scaled = scaler.transform(&rows)?;

        // Window k ends at row k + window - 1; the last one ends at the latest row
        let windows = sequence_windows(&scaled, window);
        let Some((inference, training)) = windows.split_last() else {
            return Err(ModelError::InsufficientData {
                available: rows.len(),
                required: window + 2,
            });
        };
        let targets: Vec<f64> = (0..training.len())
            .map(|k| matrix.targets[k + window - 1])
            .collect();

        self.models
            .fit_sequence_and_forward(training, &targets, SEQUENCE_RIDGE, inference)
    }

    fn record_operation<T>(&self, operation: &str, result: &Result<T, EngineError>) {
        match result {
            Ok(_) => self.metrics.inc_analysis(operation, "success"),
            Err(e) => {
                warn!("FusionService: {} failed ({}): {}", operation, e.kind(), e);
                self.metrics.inc_analysis(operation, "failure");
            }
        }
    }

    fn record_training<T>(&self, model: &str, result: &Result<T, ModelError>) {
        let outcome = if result.is_ok() { "success" } else { "failure" };
        self.metrics.inc_training(model, outcome);
    }
}

fn roll_forward(
    model: &TreeEnsemble,
    mut date: NaiveDate,
    mut row: Vec<f64>,
    horizon_days: usize,
) -> Result<Vec<PricePrediction>, ModelError> {
    let mut predictions = Vec::with_capacity(horizon_days);
    for _ in 0..horizon_days {
        let price = model.predict_one(&row)?;
        date = next_trading_day(date);
        predictions.push(PricePrediction { date, price });
        row[PRICE_INDEX] = price;
    }
    Ok(predictions)
}

/// Next Monday-to-Friday date after `date`
fn next_trading_day(date: NaiveDate) -> NaiveDate {
    let mut next = date + Duration::days(1);
    while matches!(next.weekday(), Weekday::Sat | Weekday::Sun) {
        next += Duration::days(1);
    }
    next
}
