use crate::domain::errors::{DataSource, FetchError};
use crate::domain::ports::{NewsDataSource, PriceDataSource, WeatherDataSource};
use crate::domain::sentiment::{SentimentItem, aggregate_daily};
use crate::domain::series::{
    Coordinates, DailySentiment, DateRange, PriceBar, TimeSeries, WeatherAlert,
    WeatherObservation,
};
use crate::infrastructure::news::SentimentAnalyzer;
use crate::infrastructure::observability::Metrics;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Raw inputs of one request, owned by value
#[derive(Debug, Clone, Default)]
pub struct FetchedSeries {
    pub prices: Vec<PriceBar>,
    pub weather: Vec<WeatherObservation>,
    pub sentiment_items: Vec<SentimentItem>,
    pub daily_sentiment: Vec<DailySentiment>,
}

impl FetchedSeries {
    /// Series in merge order: price, weather, sentiment
    pub fn to_time_series(&self) -> Vec<TimeSeries> {
        vec![
            TimeSeries::from_price_bars(&self.prices),
            TimeSeries::from_weather(&self.weather),
            TimeSeries::from_daily_sentiment(&self.daily_sentiment),
        ]
    }
}

/// Acquires the three raw series for a request.
///
/// The fetches run concurrently and fail fast: the first error drops the
/// remaining futures.
pub struct FetchOrchestrator {
    prices: Arc<dyn PriceDataSource>,
    weather: Arc<dyn WeatherDataSource>,
    news: Arc<dyn NewsDataSource>,
    sentiment: Arc<SentimentAnalyzer>,
    metrics: Metrics,
}

impl FetchOrchestrator {
    pub fn new(
        prices: Arc<dyn PriceDataSource>,
        weather: Arc<dyn WeatherDataSource>,
        news: Arc<dyn NewsDataSource>,
        sentiment: Arc<SentimentAnalyzer>,
        metrics: Metrics,
    ) -> Self {
        Self {
            prices,
            weather,
            news,
            sentiment,
            metrics,
        }
    }

    pub async fn fetch_all(
        &self,
        ticker: &str,
        location: &str,
        range: DateRange,
    ) -> Result<FetchedSeries, FetchError> {
        info!(
            "FetchOrchestrator: fetching {} / {} for {} to {}",
            ticker,
            location,
            range.start(),
            range.end()
        );

        let (prices, weather, sentiment_items) = tokio::try_join!(
            self.fetch_prices(ticker, range),
            self.fetch_weather(location, range),
            self.fetch_sentiment(ticker, range),
        )?;

        let daily_sentiment = aggregate_daily(&sentiment_items);
        info!(
            "FetchOrchestrator: {} bars, {} weather days, {} headlines over {} days",
            prices.len(),
            weather.len(),
            sentiment_items.len(),
            daily_sentiment.len()
        );

        Ok(FetchedSeries {
            prices,
            weather,
            sentiment_items,
            daily_sentiment,
        })
    }

    /// Active alerts for a free-text location
    pub async fn fetch_alerts(&self, location: &str) -> Result<Vec<WeatherAlert>, FetchError> {
        self.timed(DataSource::Weather, async {
            let coords = self.geocode(location).await?;
            self.weather
                .fetch_alerts(coords)
                .await
                .map_err(|cause| upstream(DataSource::Weather, cause))
        })
        .await
    }

    async fn fetch_prices(
        &self,
        ticker: &str,
        range: DateRange,
    ) -> Result<Vec<PriceBar>, FetchError> {
        self.timed(DataSource::Price, async {
            self.prices
                .fetch_daily_bars(ticker, range)
                .await
                .map_err(|cause| upstream(DataSource::Price, cause))
        })
        .await
    }

    async fn fetch_weather(
        &self,
        location: &str,
        range: DateRange,
    ) -> Result<Vec<WeatherObservation>, FetchError> {
        self.timed(DataSource::Weather, async {
            let coords = self.geocode(location).await?;
            debug!(
                "FetchOrchestrator: '{}' resolved to ({:.4}, {:.4})",
                location, coords.lat, coords.lon
            );
            self.weather
                .fetch_daily_weather(coords, range)
                .await
                .map_err(|cause| upstream(DataSource::Weather, cause))
        })
        .await
    }

    async fn fetch_sentiment(
        &self,
        ticker: &str,
        range: DateRange,
    ) -> Result<Vec<SentimentItem>, FetchError> {
        self.timed(DataSource::News, async {
            let headlines = self
                .news
                .fetch_headlines(ticker, range)
                .await
                .map_err(|cause| upstream(DataSource::News, cause))?;

            Ok(headlines
                .iter()
                .map(|h| self.sentiment.classify(&h.title, h.published_at.date_naive()))
                .collect())
        })
        .await
    }

    async fn geocode(&self, location: &str) -> Result<Coordinates, FetchError> {
        self.weather
            .geocode(location)
            .await
            .map_err(|e| match e.downcast::<FetchError>() {
                Ok(not_found @ FetchError::LocationNotFound { .. }) => not_found,
                Ok(other) => upstream(DataSource::Weather, other.into()),
                Err(cause) => upstream(DataSource::Weather, cause),
            })
    }

    async fn timed<T>(
        &self,
        source: DataSource,
        fetch: impl Future<Output = Result<T, FetchError>>,
    ) -> Result<T, FetchError> {
        let label = source.to_string();
        let started = Instant::now();
        let result = fetch.await;
        self.metrics
            .observe_fetch_latency(&label, started.elapsed().as_secs_f64());

        match &result {
            Ok(_) => self.metrics.inc_fetch(&label, "success"),
            Err(e) => {
                warn!("FetchOrchestrator: {} fetch failed: {}", label, e);
                self.metrics.inc_fetch(&label, "failure");
            }
        }
        result
    }
}

fn upstream(origin: DataSource, cause: anyhow::Error) -> FetchError {
    FetchError::UpstreamFetch { origin, cause }
}
