pub mod newsapi;
pub mod sentiment_analyzer;

pub use newsapi::NewsApiSource;
pub use sentiment_analyzer::SentimentAnalyzer;
