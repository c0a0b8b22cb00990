//! Local headline sentiment using VADER
//!
//! VADER's compound polarity is adjusted with market-specific keyword weights
//! and mapped onto a [0, 1] score where 0.5 is neutral.
//!
//! # Example
//! ```rust,ignore
//! use weathervane::infrastructure::news::SentimentAnalyzer;
//!
//! let analyzer = SentimentAnalyzer::new();
//! let score = analyzer.score("Shares surge to a record high after strong earnings");
//! assert!(score > 0.5);
//! ```

use crate::domain::sentiment::{SentimentItem, SentimentLabel};
use chrono::NaiveDate;
use vader_sentiment::SentimentIntensityAnalyzer;

/// Market vocabulary VADER's general lexicon under-weights. Single words match
/// whole tokens; phrases match as substrings.
const BULLISH_KEYWORDS: &[(&str, f64)] = &[
    ("surge", 0.4),
    ("surges", 0.4),
    ("rally", 0.4),
    ("rallies", 0.4),
    ("soar", 0.5),
    ("soars", 0.5),
    ("jumps", 0.3),
    ("bullish", 0.5),
    ("beat", 0.3),
    ("beats", 0.3),
    ("outperform", 0.4),
    ("upgrade", 0.3),
    ("upgraded", 0.3),
    ("buyback", 0.2),
    ("dividend", 0.1),
    ("breakout", 0.3),
    ("record high", 0.4),
    ("all-time high", 0.5),
    ("strong earnings", 0.4),
    ("raises guidance", 0.4),
];

const BEARISH_KEYWORDS: &[(&str, f64)] = &[
    ("crash", -0.5),
    ("crashes", -0.5),
    ("plunge", -0.5),
    ("plunges", -0.5),
    ("tumbles", -0.4),
    ("slump", -0.4),
    ("bearish", -0.5),
    ("downgrade", -0.3),
    ("downgraded", -0.3),
    ("miss", -0.3),
    ("misses", -0.3),
    ("lawsuit", -0.4),
    ("probe", -0.3),
    ("recall", -0.3),
    ("layoffs", -0.3),
    ("bankruptcy", -0.6),
    ("fraud", -0.5),
    ("sell-off", -0.4),
    ("selloff", -0.4),
    ("cuts guidance", -0.4),
];

/// VADER scorer with market keyword boosting
pub struct SentimentAnalyzer {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }

    fn financial_boost(&self, text: &str) -> f64 {
        let text_lower = text.to_lowercase();
        let tokens: Vec<&str> = text_lower
            .split(|c: char| !c.is_alphanumeric() && c != '-')
            .filter(|t| !t.is_empty())
            .collect();

        BULLISH_KEYWORDS
            .iter()
            .chain(BEARISH_KEYWORDS)
            .filter(|(keyword, _)| {
                if keyword.contains(' ') {
                    text_lower.contains(keyword)
                } else {
                    tokens.contains(keyword)
                }
            })
            .map(|(_, weight)| weight)
            .sum()
    }

    /// Polarity in [-1, 1]; blank text is 0.
    pub fn analyze(&self, text: &str) -> f64 {
        if text.trim().is_empty() {
            return 0.0;
        }

        let scores = self.analyzer.polarity_scores(text);
        let vader_score = scores["compound"];
        let combined = vader_score + self.financial_boost(text) * 0.5;
        combined.clamp(-1.0, 1.0)
    }

    /// Polarity mapped onto [0, 1] with 0.5 neutral
    pub fn score(&self, text: &str) -> f64 {
        (self.analyze(text) + 1.0) / 2.0
    }

    /// Score a headline published on `date`
    pub fn classify(&self, headline: &str, date: NaiveDate) -> SentimentItem {
        let score = self.score(headline);
        SentimentItem {
            date,
            headline: headline.to_string(),
            label: SentimentLabel::from_score(score),
            score,
        }
    }
}

impl Default for SentimentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bullish_headlines() {
        let analyzer = SentimentAnalyzer::new();

        let headlines = [
            "Shares surge to record high after strong earnings",
            "Stock rallies as analysts upgrade outlook",
            "Company beats estimates and raises guidance",
        ];

        for headline in headlines {
            let score = analyzer.score(headline);
            assert!(
                score > 0.5,
                "Expected bullish score for '{}', got {}",
                headline,
                score
            );
        }
    }

    #[test]
    fn test_bearish_headlines() {
        let analyzer = SentimentAnalyzer::new();

        let headlines = [
            "Shares plunge after fraud probe announced",
            "Stock crashes as company misses estimates",
            "Retailer files for bankruptcy amid layoffs",
        ];

        for headline in headlines {
            let score = analyzer.score(headline);
            assert!(
                score < 0.5,
                "Expected bearish score for '{}', got {}",
                headline,
                score
            );
        }
    }

    #[test]
    fn test_blank_text_is_neutral() {
        let analyzer = SentimentAnalyzer::new();
        assert_eq!(analyzer.analyze("   "), 0.0);
        assert_eq!(analyzer.score(""), 0.5);
    }

    #[test]
    fn test_keywords_match_whole_words() {
        let analyzer = SentimentAnalyzer::new();
        // "missionary" must not trigger "miss"
        assert_eq!(analyzer.financial_boost("A missionary visited"), 0.0);
        assert!(analyzer.financial_boost("Revenue misses forecast") < 0.0);
    }

    #[test]
    fn test_classify_labels_and_bounds() {
        let analyzer = SentimentAnalyzer::new();
        let date = NaiveDate::from_ymd_opt(2024, 9, 3).unwrap();
        let item = analyzer.classify("Shares soar in massive rally", date);

        assert_eq!(item.date, date);
        assert_eq!(item.label, SentimentLabel::Positive);
        assert!((0.0..=1.0).contains(&item.score));
    }
}
