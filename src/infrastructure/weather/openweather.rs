use crate::domain::errors::FetchError;
use crate::domain::ports::WeatherDataSource;
use crate::domain::series::{Coordinates, DateRange, WeatherAlert, WeatherObservation};
use crate::infrastructure::core::http_client_factory::{HttpClientFactory, build_url_with_query};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

/// OpenWeatherMap geocoding, historical "time machine" and alert lookups.
///
/// History is sampled once per calendar day at 12:00 UTC, one request per day.
pub struct OpenWeatherSource {
    client: ClientWithMiddleware,
    api_key: String,
    base_url: String,
    geo_url: String,
}

#[derive(Debug, Deserialize)]
struct GeoMatch {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct RainVolume {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ConditionEntry {
    main: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WeatherSample {
    temp: Option<f64>,
    humidity: Option<f64>,
    wind_speed: Option<f64>,
    rain: Option<RainVolume>,
    #[serde(default)]
    weather: Vec<ConditionEntry>,
}

/// The 2.5 endpoint answers with `current`, the 3.0 endpoint with `data[]`
#[derive(Debug, Deserialize)]
struct TimeMachineResponse {
    current: Option<WeatherSample>,
    #[serde(default)]
    data: Vec<WeatherSample>,
}

#[derive(Debug, Deserialize)]
struct RawAlert {
    #[serde(default)]
    event: String,
    #[serde(default)]
    description: String,
    start: i64,
    end: i64,
}

#[derive(Debug, Deserialize)]
struct OneCallAlerts {
    #[serde(default)]
    alerts: Vec<RawAlert>,
}

impl OpenWeatherSource {
    pub fn new(api_key: String, base_url: String, geo_url: String) -> Self {
        Self {
            client: HttpClientFactory::create_client(),
            api_key,
            base_url,
            geo_url,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {} from OpenWeatherMap", what))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!(
                "OpenWeatherSource: API error {} for {}: {}",
                status, what, error_text
            );
            anyhow::bail!("OpenWeatherMap API error ({}): {}", status, error_text);
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", what))
    }
}

/// A day without a `rain` block had no rain; a missing temperature stays missing
fn observation_from_sample(date: NaiveDate, sample: Option<&WeatherSample>) -> WeatherObservation {
    match sample {
        Some(s) => WeatherObservation {
            date,
            temperature: s.temp,
            humidity: s.humidity,
            wind_speed: s.wind_speed,
            precipitation: Some(s.rain.as_ref().and_then(|r| r.one_hour).unwrap_or(0.0)),
            condition: s.weather.first().and_then(|w| w.main.clone()),
        },
        None => WeatherObservation {
            date,
            temperature: None,
            humidity: None,
            wind_speed: None,
            precipitation: None,
            condition: None,
        },
    }
}

fn timestamp_to_utc(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).with_context(|| format!("Invalid alert timestamp: {}", secs))
}

#[async_trait]
impl WeatherDataSource for OpenWeatherSource {
    async fn geocode(&self, location: &str) -> Result<Coordinates> {
        let url = build_url_with_query(
            &self.geo_url,
            &[("q", location), ("limit", "1"), ("appid", self.api_key.as_str())],
        )?;
        let matches: Vec<GeoMatch> = self.get_json(&url, "geocoding").await?;

        let Some(first) = matches.first() else {
            warn!("OpenWeatherSource: no geocoding match for '{}'", location);
            return Err(FetchError::LocationNotFound {
                location: location.to_string(),
            }
            .into());
        };

        debug!(
            "OpenWeatherSource: '{}' -> ({}, {})",
            location, first.lat, first.lon
        );
        Ok(Coordinates {
            lat: first.lat,
            lon: first.lon,
        })
    }

    async fn fetch_daily_weather(
        &self,
        coords: Coordinates,
        range: DateRange,
    ) -> Result<Vec<WeatherObservation>> {
        let url = format!("{}/onecall/timemachine", self.base_url);
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default();
        let mut observations = Vec::with_capacity(range.num_days());

        for date in range.days() {
            let dt = date.and_time(noon).and_utc().timestamp().to_string();
            let url_with_query = build_url_with_query(
                &url,
                &[
                    ("lat", coords.lat.to_string()),
                    ("lon", coords.lon.to_string()),
                    ("dt", dt),
                    ("appid", self.api_key.clone()),
                    ("units", "metric".to_string()),
                ],
            )?;

            let body: TimeMachineResponse = self
                .get_json(&url_with_query, "historical weather")
                .await
                .with_context(|| format!("Weather history for {}", date))?;

            let sample = body.current.as_ref().or(body.data.first());
            observations.push(observation_from_sample(date, sample));
        }

        info!(
            "OpenWeatherSource: {} daily observations at ({}, {})",
            observations.len(),
            coords.lat,
            coords.lon
        );
        Ok(observations)
    }

    async fn fetch_alerts(&self, coords: Coordinates) -> Result<Vec<WeatherAlert>> {
        let url = build_url_with_query(
            &format!("{}/onecall", self.base_url),
            &[
                ("lat", coords.lat.to_string()),
                ("lon", coords.lon.to_string()),
                ("appid", self.api_key.clone()),
                ("exclude", "current,minutely,hourly,daily".to_string()),
            ],
        )?;
        let body: OneCallAlerts = self.get_json(&url, "weather alerts").await?;

        body.alerts
            .into_iter()
            .map(|a| {
                Ok(WeatherAlert {
                    event: a.event,
                    description: a.description,
                    start: timestamp_to_utc(a.start)?,
                    end: timestamp_to_utc(a.end)?,
                })
            })
            .collect()
    }
}
