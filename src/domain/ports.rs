use crate::domain::series::{
    Coordinates, DateRange, NewsHeadline, PriceBar, WeatherAlert, WeatherObservation,
};
use anyhow::Result;
use async_trait::async_trait;

// Need async_trait for async functions in traits
#[async_trait]
pub trait PriceDataSource: Send + Sync {
    /// Daily bars for `ticker`, ascending by date
    async fn fetch_daily_bars(&self, ticker: &str, range: DateRange) -> Result<Vec<PriceBar>>;
}

#[async_trait]
pub trait WeatherDataSource: Send + Sync {
    /// Resolve a free-text location. An unknown location must fail with
    /// `FetchError::LocationNotFound` so callers can tell it apart from transport errors.
    async fn geocode(&self, location: &str) -> Result<Coordinates>;

    async fn fetch_daily_weather(
        &self,
        coords: Coordinates,
        range: DateRange,
    ) -> Result<Vec<WeatherObservation>>;

    async fn fetch_alerts(&self, coords: Coordinates) -> Result<Vec<WeatherAlert>>;
}

#[async_trait]
pub trait NewsDataSource: Send + Sync {
    async fn fetch_headlines(&self, query: &str, range: DateRange) -> Result<Vec<NewsHeadline>>;
}
