//! Descriptive analysis of a weather history: extreme days, trend, condition
//! mix and summary statistics.

use crate::application::analysis::correlation::pearson;
use crate::application::market_data::statistical_features::trend_slope;
use crate::domain::series::WeatherObservation;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Distribution};
use std::collections::BTreeMap;
use tracing::debug;

/// Degrees Celsius
pub const EXTREME_TEMPERATURE_THRESHOLD: f64 = 35.0;
/// Metres per second
pub const EXTREME_WIND_THRESHOLD: f64 = 20.0;
/// Per-day slope beyond which a temperature series is trending
pub const TREND_SLOPE_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtremeKind {
    ExtremeTemperature,
    ExtremeWind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtremeEvent {
    pub date: NaiveDate,
    pub kind: ExtremeKind,
    pub value: f64,
    pub threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}

impl Trend {
    pub fn from_slope(slope: Option<f64>) -> Self {
        match slope {
            None => Trend::InsufficientData,
            Some(s) if s > TREND_SLOPE_THRESHOLD => Trend::Increasing,
            Some(s) if s < -TREND_SLOPE_THRESHOLD => Trend::Decreasing,
            Some(_) => Trend::Stable,
        }
    }
}

/// Mean, sample std and extremes of one weather field over the present values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldStatistics {
    pub observations: usize,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl FieldStatistics {
    fn of(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                observations: 0,
                mean: None,
                std_dev: None,
                min: None,
                max: None,
            };
        }
        let data = Data::new(values.to_vec());
        Self {
            observations: values.len(),
            mean: data.mean(),
            std_dev: if values.len() >= 2 { data.std_dev() } else { None },
            min: values.iter().copied().reduce(f64::min),
            max: values.iter().copied().reduce(f64::max),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherPatterns {
    pub extreme_events: Vec<ExtremeEvent>,
    pub temperature_trend: Trend,
    /// Days per reported condition (e.g. "Clear", "Rain")
    pub condition_frequency: BTreeMap<String, usize>,
    /// Pearson r of temperature and humidity; `None` when undefined
    pub temperature_humidity_correlation: Option<f64>,
    pub temperature: FieldStatistics,
    pub humidity: FieldStatistics,
    pub wind_speed: FieldStatistics,
}

pub fn analyze_weather_patterns(observations: &[WeatherObservation]) -> WeatherPatterns {
    let mut extreme_events = Vec::new();
    for obs in observations {
        if let Some(t) = obs.temperature
            && t > EXTREME_TEMPERATURE_THRESHOLD
        {
            extreme_events.push(ExtremeEvent {
                date: obs.date,
                kind: ExtremeKind::ExtremeTemperature,
                value: t,
                threshold: EXTREME_TEMPERATURE_THRESHOLD,
            });
        }
    }
    for obs in observations {
        if let Some(w) = obs.wind_speed
            && w > EXTREME_WIND_THRESHOLD
        {
            extreme_events.push(ExtremeEvent {
                date: obs.date,
                kind: ExtremeKind::ExtremeWind,
                value: w,
                threshold: EXTREME_WIND_THRESHOLD,
            });
        }
    }

    let temperatures: Vec<f64> = observations.iter().filter_map(|o| o.temperature).collect();
    let humidities: Vec<f64> = observations.iter().filter_map(|o| o.humidity).collect();
    let winds: Vec<f64> = observations.iter().filter_map(|o| o.wind_speed).collect();

    let mut condition_frequency = BTreeMap::new();
    for condition in observations.iter().filter_map(|o| o.condition.as_ref()) {
        *condition_frequency.entry(condition.clone()).or_insert(0) += 1;
    }

    let (paired_t, paired_h): (Vec<f64>, Vec<f64>) = observations
        .iter()
        .filter_map(|o| Some((o.temperature?, o.humidity?)))
        .unzip();

    let patterns = WeatherPatterns {
        extreme_events,
        temperature_trend: Trend::from_slope(trend_slope(&temperatures)),
        condition_frequency,
        temperature_humidity_correlation: pearson(&paired_t, &paired_h),
        temperature: FieldStatistics::of(&temperatures),
        humidity: FieldStatistics::of(&humidities),
        wind_speed: FieldStatistics::of(&winds),
    };

    debug!(
        "WeatherPatterns: {} days, {} extreme events, trend {:?}",
        observations.len(),
        patterns.extreme_events.len(),
        patterns.temperature_trend
    );
    patterns
}
