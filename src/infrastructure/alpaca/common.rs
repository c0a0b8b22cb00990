use crate::domain::series::PriceBar;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct AlpacaBar {
    #[serde(rename = "t")]
    pub timestamp: String,
    #[serde(rename = "o")]
    pub open: f64,
    #[serde(rename = "h")]
    pub high: f64,
    #[serde(rename = "l")]
    pub low: f64,
    #[serde(rename = "c")]
    pub close: f64,
    #[serde(rename = "v")]
    pub volume: f64,
}

impl AlpacaBar {
    /// Trading day of the bar. Daily bars are stamped with an RFC 3339
    /// timestamp; a bare `YYYY-MM-DD` is accepted as well.
    pub fn trading_day(&self) -> Result<NaiveDate> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(&self.timestamp) {
            return Ok(ts.date_naive());
        }
        NaiveDate::parse_from_str(&self.timestamp, "%Y-%m-%d")
            .with_context(|| format!("Unparseable bar timestamp: {}", self.timestamp))
    }

    pub fn to_price_bar(&self) -> Result<PriceBar> {
        Ok(PriceBar {
            date: self.trading_day()?,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        })
    }
}
