use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::series::DailySentiment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Negative,
    Neutral,
    Positive,
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Negative => write!(f, "negative"),
            Self::Neutral => write!(f, "neutral"),
            Self::Positive => write!(f, "positive"),
        }
    }
}

impl SentimentLabel {
    /// Classify a [0, 1] score where 0.5 is neutral
    pub fn from_score(score: f64) -> Self {
        if score >= 0.55 {
            Self::Positive
        } else if score <= 0.45 {
            Self::Negative
        } else {
            Self::Neutral
        }
    }
}

/// Sentiment of one headline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentItem {
    pub date: NaiveDate,
    pub headline: String,
    pub label: SentimentLabel,
    /// [0, 1], 0.5 is neutral
    pub score: f64,
}

/// Average the headline scores of each day
pub fn aggregate_daily(items: &[SentimentItem]) -> Vec<DailySentiment> {
    let mut by_day: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for item in items {
        let entry = by_day.entry(item.date).or_insert((0.0, 0));
        entry.0 += item.score;
        entry.1 += 1;
    }

    by_day
        .into_iter()
        .map(|(date, (sum, count))| DailySentiment {
            date,
            sentiment_score: sum / count as f64,
            headline_count: count,
        })
        .collect()
}
