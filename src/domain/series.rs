//! Raw source records and the generic dated series they are converted into.
//!
//! Every collaborator hands back its own record type (`PriceBar`,
//! `WeatherObservation`, `DailySentiment`); the aligner only ever sees
//! `TimeSeries`, a named sequence of dated rows whose values are
//! `Option<f64>` so that an absent measurement never reads as zero.

use crate::domain::errors::FetchError;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Canonical field names shared by the series builders and the analysis stages
pub mod fields {
    pub const OPEN: &str = "open";
    pub const HIGH: &str = "high";
    pub const LOW: &str = "low";
    pub const CLOSE: &str = "close";
    pub const VOLUME: &str = "volume";
    pub const TEMPERATURE: &str = "temperature";
    pub const HUMIDITY: &str = "humidity";
    pub const WIND_SPEED: &str = "wind_speed";
    pub const PRECIPITATION: &str = "precipitation";
    pub const SENTIMENT_SCORE: &str = "sentiment_score";
    pub const HEADLINE_COUNT: &str = "headline_count";
}

/// Inclusive calendar date range, validated so that `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, FetchError> {
        if start > end {
            return Err(FetchError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Range covering the `days` calendar days that end on `end` (inclusive)
    pub fn trailing(end: NaiveDate, days: u32) -> Result<Self, FetchError> {
        let start = end - Duration::days(i64::from(days.saturating_sub(1)));
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of calendar days in the range
    pub fn num_days(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let start = self.start;
        (0..self.num_days()).map(move |offset| start + Duration::days(offset as i64))
    }
}

/// Daily OHLCV bar from the price source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// One day of weather at a resolved location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub date: NaiveDate,
    /// Degrees Celsius
    pub temperature: Option<f64>,
    /// Relative humidity in percent
    pub humidity: Option<f64>,
    /// Metres per second
    pub wind_speed: Option<f64>,
    /// Millimetres over the observation hour
    pub precipitation: Option<f64>,
    pub condition: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Active weather alert for a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherAlert {
    pub event: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Raw headline returned by the news source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsHeadline {
    pub published_at: DateTime<Utc>,
    pub title: String,
    pub source: Option<String>,
    pub url: Option<String>,
}

/// Per-day aggregate of headline sentiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySentiment {
    pub date: NaiveDate,
    /// Mean headline score in [0, 1], 0.5 is neutral
    pub sentiment_score: f64,
    pub headline_count: usize,
}

/// A single dated row of named optional values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesRow {
    pub date: NaiveDate,
    pub values: BTreeMap<String, Option<f64>>,
}

impl SeriesRow {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, field: &str, value: Option<f64>) -> Self {
        self.values.insert(field.to_string(), value);
        self
    }
}

/// Named series with unique, ascending dates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    source: String,
    fields: Vec<String>,
    rows: Vec<SeriesRow>,
}

impl TimeSeries {
    /// Build a series, sorting rows by date. When a date repeats the later
    /// row replaces the earlier one.
    pub fn new(source: impl Into<String>, fields: &[&str], mut rows: Vec<SeriesRow>) -> Self {
        let source = source.into();
        rows.sort_by_key(|r| r.date);

        let mut deduped: Vec<SeriesRow> = Vec::with_capacity(rows.len());
        for row in rows {
            match deduped.last_mut() {
                Some(last) if last.date == row.date => {
                    warn!(
                        "TimeSeries [{}]: duplicate date {}, keeping the later row",
                        source, row.date
                    );
                    *last = row;
                }
                _ => deduped.push(row),
            }
        }

        Self {
            source,
            fields: fields.iter().map(|f| f.to_string()).collect(),
            rows: deduped,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn rows(&self) -> &[SeriesRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn from_price_bars(bars: &[PriceBar]) -> Self {
        let rows = bars
            .iter()
            .map(|b| {
                SeriesRow::new(b.date)
                    .with(fields::OPEN, Some(b.open))
                    .with(fields::HIGH, Some(b.high))
                    .with(fields::LOW, Some(b.low))
                    .with(fields::CLOSE, Some(b.close))
                    .with(fields::VOLUME, Some(b.volume))
            })
            .collect();
        Self::new(
            "price",
            &[
                fields::OPEN,
                fields::HIGH,
                fields::LOW,
                fields::CLOSE,
                fields::VOLUME,
            ],
            rows,
        )
    }

    pub fn from_weather(observations: &[WeatherObservation]) -> Self {
        let rows = observations
            .iter()
            .map(|w| {
                SeriesRow::new(w.date)
                    .with(fields::TEMPERATURE, w.temperature)
                    .with(fields::HUMIDITY, w.humidity)
                    .with(fields::WIND_SPEED, w.wind_speed)
                    .with(fields::PRECIPITATION, w.precipitation)
            })
            .collect();
        Self::new(
            "weather",
            &[
                fields::TEMPERATURE,
                fields::HUMIDITY,
                fields::WIND_SPEED,
                fields::PRECIPITATION,
            ],
            rows,
        )
    }

    pub fn from_daily_sentiment(days: &[DailySentiment]) -> Self {
        let rows = days
            .iter()
            .map(|d| {
                SeriesRow::new(d.date)
                    .with(fields::SENTIMENT_SCORE, Some(d.sentiment_score))
                    .with(fields::HEADLINE_COUNT, Some(d.headline_count as f64))
            })
            .collect();
        Self::new(
            "sentiment",
            &[fields::SENTIMENT_SCORE, fields::HEADLINE_COUNT],
            rows,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_date_range_rejects_inverted_bounds() {
        let err = DateRange::new(day(5), day(4)).unwrap_err();
        assert!(matches!(err, FetchError::InvalidRange { .. }));

        let single = DateRange::new(day(4), day(4)).unwrap();
        assert_eq!(single.num_days(), 1);
    }

    #[test]
    fn test_trailing_range_days() {
        let range = DateRange::trailing(day(10), 5).unwrap();
        assert_eq!(range.start(), day(6));
        let days: Vec<_> = range.days().collect();
        assert_eq!(days.len(), 5);
        assert_eq!(days.last(), Some(&day(10)));
    }

    #[test]
    fn test_series_sorted_and_deduplicated() {
        let rows = vec![
            SeriesRow::new(day(3)).with("x", Some(3.0)),
            SeriesRow::new(day(1)).with("x", Some(1.0)),
            SeriesRow::new(day(3)).with("x", Some(30.0)),
        ];
        let series = TimeSeries::new("test", &["x"], rows);

        assert_eq!(series.len(), 2);
        assert_eq!(series.rows()[0].date, day(1));
        assert_eq!(series.rows()[1].values["x"], Some(30.0));
    }

    #[test]
    fn test_weather_keeps_missing_values_absent() {
        let obs = WeatherObservation {
            date: day(2),
            temperature: Some(0.0),
            humidity: None,
            wind_speed: Some(3.5),
            precipitation: None,
            condition: None,
        };
        let series = TimeSeries::from_weather(&[obs]);
        let row = &series.rows()[0];

        assert_eq!(row.values[fields::TEMPERATURE], Some(0.0));
        assert_eq!(row.values[fields::HUMIDITY], None);
    }
}
