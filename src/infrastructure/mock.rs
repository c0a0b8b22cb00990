//! In-memory data sources for tests and `MODE=mock`.
//!
//! Each mock serves either fixed records (filtered to the requested range) or
//! a deterministic synthetic series generated from a seed. Failures and
//! artificial latency can be injected per source.

use crate::domain::errors::FetchError;
use crate::domain::ports::{NewsDataSource, PriceDataSource, WeatherDataSource};
use crate::domain::series::{
    Coordinates, DateRange, NewsHeadline, PriceBar, WeatherAlert, WeatherObservation,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{Datelike, NaiveTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// Shared knobs of every mock source
#[derive(Debug, Clone, Default)]
struct Behaviour {
    failure: Option<String>,
    delay: Option<Duration>,
    completed: Arc<AtomicUsize>,
}

impl Behaviour {
    async fn run(&self, name: &str) -> Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = &self.failure {
            info!("{}: injected failure: {}", name, reason);
            anyhow::bail!("{}", reason);
        }
        Ok(())
    }

    fn finish(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

fn seed_for(key: &str, seed: u64) -> u64 {
    key.bytes()
        .fold(seed, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64))
}

// ===== Price =====

#[derive(Debug, Clone)]
enum PriceFixture {
    Fixed(Vec<PriceBar>),
    RandomWalk { seed: u64 },
}

#[derive(Debug, Clone)]
pub struct MockPriceSource {
    fixture: PriceFixture,
    behaviour: Behaviour,
}

impl MockPriceSource {
    pub fn new(bars: Vec<PriceBar>) -> Self {
        Self {
            fixture: PriceFixture::Fixed(bars),
            behaviour: Behaviour::default(),
        }
    }

    /// Weekday-only random walk around 150, deterministic per (seed, ticker)
    pub fn synthetic(seed: u64) -> Self {
        Self {
            fixture: PriceFixture::RandomWalk { seed },
            behaviour: Behaviour::default(),
        }
    }

    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.behaviour.failure = Some(reason.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.behaviour.delay = Some(delay);
        self
    }

    /// Number of fetches that ran to completion
    pub fn completed_fetches(&self) -> usize {
        self.behaviour.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceDataSource for MockPriceSource {
    async fn fetch_daily_bars(&self, ticker: &str, range: DateRange) -> Result<Vec<PriceBar>> {
        self.behaviour.run("MockPriceSource").await?;

        let bars: Vec<PriceBar> = match &self.fixture {
            PriceFixture::Fixed(bars) => bars
                .iter()
                .filter(|b| range.contains(b.date))
                .cloned()
                .collect(),
            PriceFixture::RandomWalk { seed } => {
                let mut rng = StdRng::seed_from_u64(seed_for(ticker, *seed));
                let mut close = 150.0;
                range
                    .days()
                    .filter(|d| d.weekday().number_from_monday() <= 5)
                    .map(|date| {
                        let open = close;
                        close *= 1.0 + rng.random_range(-0.02..0.02);
                        let spread = close * rng.random_range(0.0..0.01);
                        PriceBar {
                            date,
                            open,
                            high: open.max(close) + spread,
                            low: open.min(close) - spread,
                            close,
                            volume: rng.random_range(1_000_000.0..5_000_000.0_f64).round(),
                        }
                    })
                    .collect()
            }
        };

        debug!("MockPriceSource: {} bars for {}", bars.len(), ticker);
        self.behaviour.finish();
        Ok(bars)
    }
}

// ===== Weather =====

#[derive(Debug, Clone)]
enum WeatherFixture {
    Fixed(Vec<WeatherObservation>),
    Seasonal { seed: u64 },
}

#[derive(Debug, Clone)]
pub struct MockWeatherSource {
    locations: HashMap<String, Coordinates>,
    fixture: WeatherFixture,
    alerts: Vec<WeatherAlert>,
    behaviour: Behaviour,
}

impl MockWeatherSource {
    pub fn new(observations: Vec<WeatherObservation>) -> Self {
        Self {
            locations: default_locations(),
            fixture: WeatherFixture::Fixed(observations),
            alerts: Vec::new(),
            behaviour: Behaviour::default(),
        }
    }

    /// Sinusoidal yearly temperature cycle with daily noise
    pub fn synthetic(seed: u64) -> Self {
        Self {
            locations: default_locations(),
            fixture: WeatherFixture::Seasonal { seed },
            alerts: Vec::new(),
            behaviour: Behaviour::default(),
        }
    }

    pub fn with_location(mut self, name: &str, coords: Coordinates) -> Self {
        self.locations.insert(name.to_lowercase(), coords);
        self
    }

    pub fn with_alerts(mut self, alerts: Vec<WeatherAlert>) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.behaviour.failure = Some(reason.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.behaviour.delay = Some(delay);
        self
    }

    pub fn completed_fetches(&self) -> usize {
        self.behaviour.completed.load(Ordering::SeqCst)
    }
}

fn default_locations() -> HashMap<String, Coordinates> {
    HashMap::from([
        (
            "new york".to_string(),
            Coordinates {
                lat: 40.7128,
                lon: -74.006,
            },
        ),
        (
            "london".to_string(),
            Coordinates {
                lat: 51.5074,
                lon: -0.1278,
            },
        ),
    ])
}

#[async_trait]
impl WeatherDataSource for MockWeatherSource {
    async fn geocode(&self, location: &str) -> Result<Coordinates> {
        self.locations
            .get(&location.to_lowercase())
            .copied()
            .ok_or_else(|| {
                FetchError::LocationNotFound {
                    location: location.to_string(),
                }
                .into()
            })
    }

    async fn fetch_daily_weather(
        &self,
        coords: Coordinates,
        range: DateRange,
    ) -> Result<Vec<WeatherObservation>> {
        self.behaviour.run("MockWeatherSource").await?;

        let observations: Vec<WeatherObservation> = match &self.fixture {
            WeatherFixture::Fixed(obs) => obs
                .iter()
                .filter(|o| range.contains(o.date))
                .cloned()
                .collect(),
            WeatherFixture::Seasonal { seed } => {
                let key = format!("{:.3},{:.3}", coords.lat, coords.lon);
                let mut rng = StdRng::seed_from_u64(seed_for(&key, *seed));
                range
                    .days()
                    .map(|date| {
                        let phase = (date.ordinal() as f64 - 200.0) / 365.0 * std::f64::consts::TAU;
                        let temperature = 13.0 + 12.0 * phase.cos() + rng.random_range(-3.0..3.0);
                        let raining = rng.random_bool(0.3);
                        WeatherObservation {
                            date,
                            temperature: Some(temperature),
                            humidity: Some(rng.random_range(35.0..95.0_f64).round()),
                            wind_speed: Some(rng.random_range(0.5..12.0)),
                            precipitation: Some(if raining {
                                rng.random_range(0.2..6.0)
                            } else {
                                0.0
                            }),
                            condition: Some(if raining { "Rain" } else { "Clear" }.to_string()),
                        }
                    })
                    .collect()
            }
        };

        self.behaviour.finish();
        Ok(observations)
    }

    async fn fetch_alerts(&self, _coords: Coordinates) -> Result<Vec<WeatherAlert>> {
        self.behaviour.run("MockWeatherSource").await?;
        Ok(self.alerts.clone())
    }
}

// ===== News =====

const SYNTHETIC_HEADLINES: &[&str] = &[
    "{} shares rally after strong earnings",
    "{} stock slips as analysts downgrade outlook",
    "{} announces quarterly dividend",
    "{} faces lawsuit over product recall",
    "{} trading volume remains steady",
    "{} hits record high on upbeat guidance",
];

#[derive(Debug, Clone)]
enum NewsFixture {
    Fixed(Vec<NewsHeadline>),
    Templates { seed: u64 },
}

#[derive(Debug, Clone)]
pub struct MockNewsSource {
    fixture: NewsFixture,
    behaviour: Behaviour,
}

impl MockNewsSource {
    pub fn new(headlines: Vec<NewsHeadline>) -> Self {
        Self {
            fixture: NewsFixture::Fixed(headlines),
            behaviour: Behaviour::default(),
        }
    }

    /// One to three templated headlines per day
    pub fn synthetic(seed: u64) -> Self {
        Self {
            fixture: NewsFixture::Templates { seed },
            behaviour: Behaviour::default(),
        }
    }

    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.behaviour.failure = Some(reason.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.behaviour.delay = Some(delay);
        self
    }

    pub fn completed_fetches(&self) -> usize {
        self.behaviour.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NewsDataSource for MockNewsSource {
    async fn fetch_headlines(&self, query: &str, range: DateRange) -> Result<Vec<NewsHeadline>> {
        self.behaviour.run("MockNewsSource").await?;

        let headlines: Vec<NewsHeadline> = match &self.fixture {
            NewsFixture::Fixed(headlines) => headlines
                .iter()
                .filter(|h| range.contains(h.published_at.date_naive()))
                .cloned()
                .collect(),
            NewsFixture::Templates { seed } => {
                let mut rng = StdRng::seed_from_u64(seed_for(query, *seed));
                let mut out = Vec::new();
                for date in range.days() {
                    for hour in 0..rng.random_range(1..=3u32) {
                        let template =
                            SYNTHETIC_HEADLINES[rng.random_range(0..SYNTHETIC_HEADLINES.len())];
                        let time = NaiveTime::from_hms_opt(13 + hour, 0, 0).unwrap_or_default();
                        out.push(NewsHeadline {
                            published_at: date.and_time(time).and_utc(),
                            title: template.replace("{}", query),
                            source: Some("Mock Wire".to_string()),
                            url: None,
                        });
                    }
                }
                out
            }
        };

        self.behaviour.finish();
        Ok(headlines)
    }
}
