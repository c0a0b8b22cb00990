use crate::domain::aligned::AlignedDataset;
use crate::domain::analysis::IndicatorRow;
use crate::domain::config::{AnalysisConfig, AnalysisConfigError};
use crate::domain::series::fields;
use chrono::NaiveDate;
use ta::Next;
use ta::indicators::SimpleMovingAverage;
use tracing::debug;

/// A dated close price
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorConfig {
    short_window: usize,
    long_window: usize,
    rsi_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            short_window: 20,
            long_window: 50,
            rsi_period: 14,
        }
    }
}

impl IndicatorConfig {
    pub fn new(
        short_window: usize,
        long_window: usize,
        rsi_period: usize,
    ) -> Result<Self, AnalysisConfigError> {
        for (field, value) in [
            ("short_sma_window", short_window),
            ("long_sma_window", long_window),
            ("rsi_period", rsi_period),
        ] {
            if value == 0 {
                return Err(AnalysisConfigError::InvalidWindow {
                    field: field.to_string(),
                    value,
                });
            }
        }
        if short_window >= long_window {
            return Err(AnalysisConfigError::WindowOrder {
                short: short_window,
                long: long_window,
            });
        }
        Ok(Self {
            short_window,
            long_window,
            rsi_period,
        })
    }

    pub fn from_analysis_config(config: &AnalysisConfig) -> Result<Self, AnalysisConfigError> {
        Self::new(
            config.short_sma_window,
            config.long_sma_window,
            config.rsi_period,
        )
    }

    pub fn short_window(&self) -> usize {
        self.short_window
    }

    pub fn long_window(&self) -> usize {
        self.long_window
    }

    pub fn rsi_period(&self) -> usize {
        self.rsi_period
    }
}

/// Moving averages and RSI over an ascending price series.
///
/// Values inside an indicator's warm-up window are `None`. The short SMA is
/// defined from index `W1 - 1`, the long SMA from `W2 - 1`, and the RSI from
/// index `period` (it needs `period` price changes).
#[derive(Debug, Clone)]
pub struct TechnicalIndicatorEngine {
    config: IndicatorConfig,
}

impl TechnicalIndicatorEngine {
    pub fn new(config: IndicatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }

    pub fn compute(&self, prices: &[PricePoint]) -> Vec<IndicatorRow> {
        let mut sma_short = sma(self.config.short_window);
        let mut sma_long = sma(self.config.long_window);
        let mut avg_gain = sma(self.config.rsi_period);
        let mut avg_loss = sma(self.config.rsi_period);

        let mut rows = Vec::with_capacity(prices.len());
        let mut prev_close: Option<f64> = None;

        for (i, point) in prices.iter().enumerate() {
            let short_val = sma_short.next(point.close);
            let long_val = sma_long.next(point.close);

            let rsi = match prev_close {
                Some(prev) => {
                    let change = point.close - prev;
                    let gain = avg_gain.next(change.max(0.0));
                    let loss = avg_loss.next((-change).max(0.0));
                    (i >= self.config.rsi_period).then(|| rsi_from_averages(gain, loss))
                }
                None => None,
            };
            prev_close = Some(point.close);

            rows.push(IndicatorRow {
                date: point.date,
                close: point.close,
                sma_short: (i + 1 >= self.config.short_window).then_some(short_val),
                sma_long: (i + 1 >= self.config.long_window).then_some(long_val),
                rsi,
            });
        }

        debug!(
            "TechnicalIndicatorEngine: computed {} rows (SMA {}/{}, RSI {})",
            rows.len(),
            self.config.short_window,
            self.config.long_window,
            self.config.rsi_period
        );
        rows
    }

    /// Indicators over the rows of `dataset` that carry a close price
    pub fn compute_from_dataset(&self, dataset: &AlignedDataset) -> Vec<IndicatorRow> {
        let prices: Vec<PricePoint> = dataset
            .rows()
            .iter()
            .filter_map(|r| {
                Some(PricePoint {
                    date: r.date(),
                    close: r.get(fields::CLOSE)?,
                })
            })
            .collect();
        self.compute(&prices)
    }
}

fn sma(period: usize) -> SimpleMovingAverage {
    SimpleMovingAverage::new(period).expect("IndicatorConfig windows must be > 0")
}

/// `100 - 100 / (1 + gain / loss)`; no observed downside reads as maximal momentum
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss <= 0.0 {
        return 100.0;
    }
    let ratio = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + ratio)
}
