use crate::domain::ports::NewsDataSource;
use crate::domain::series::{DateRange, NewsHeadline};
use crate::infrastructure::core::http_client_factory::{HttpClientFactory, build_url_with_query};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

/// Headlines from the NewsAPI `everything` endpoint, newest first
pub struct NewsApiSource {
    client: ClientWithMiddleware,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    source: Option<ArticleSource>,
    title: Option<String>,
    url: Option<String>,
    published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EverythingResponse {
    status: String,
    code: Option<String>,
    message: Option<String>,
    #[serde(default)]
    total_results: usize,
    #[serde(default)]
    articles: Vec<Article>,
}

const PAGE_SIZE: usize = 100;
/// Upper bound on requests per range; free plans stop earlier with `maximumResultsReached`
const MAX_PAGES: usize = 10;
const RESULTS_CAPPED: &str = "maximumResultsReached";

/// Whether another page can still hold articles not yet collected
fn has_more_pages(page: usize, page_len: usize, collected: usize, total_results: usize) -> bool {
    page_len == PAGE_SIZE && collected < total_results && page < MAX_PAGES
}

impl NewsApiSource {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: HttpClientFactory::create_client(),
            api_key,
            base_url,
        }
    }
}

/// Articles without a title or publication time carry nothing to score
fn to_headlines(articles: Vec<Article>) -> Vec<NewsHeadline> {
    let total = articles.len();
    let headlines: Vec<NewsHeadline> = articles
        .into_iter()
        .filter_map(|a| {
            let title = a.title.filter(|t| !t.trim().is_empty())?;
            Some(NewsHeadline {
                published_at: a.published_at?,
                title,
                source: a.source.and_then(|s| s.name),
                url: a.url,
            })
        })
        .collect();
    if headlines.len() < total {
        warn!(
            "NewsApiSource: dropped {} articles without title or timestamp",
            total - headlines.len()
        );
    }
    headlines
}

#[async_trait]
impl NewsDataSource for NewsApiSource {
    async fn fetch_headlines(&self, query: &str, range: DateRange) -> Result<Vec<NewsHeadline>> {
        let url = format!("{}/v2/everything", self.base_url);
        let mut articles = Vec::new();
        let mut total_results = 0;
        let mut page = 1;

        loop {
            let url_with_query = build_url_with_query(
                &url,
                &[
                    ("q", query.to_string()),
                    ("from", range.start().to_string()),
                    ("to", range.end().to_string()),
                    ("language", "en".to_string()),
                    ("sortBy", "publishedAt".to_string()),
                    ("pageSize", PAGE_SIZE.to_string()),
                    ("page", page.to_string()),
                    ("apiKey", self.api_key.clone()),
                ],
            )?;
            debug!("NewsApiSource: Fetching page {} for '{}'", page, query);

            let response = self
                .client
                .get(&url_with_query)
                .send()
                .await
                .context("Failed to fetch headlines from NewsAPI")?;

            let status = response.status();
            let body: EverythingResponse = response
                .json()
                .await
                .context("Failed to parse NewsAPI response")?;

            if !status.is_success() || body.status != "ok" {
                // Later pages past the plan's limit are refused, keep what arrived
                if page > 1 && body.code.as_deref() == Some(RESULTS_CAPPED) {
                    warn!(
                        "NewsApiSource: results for '{}' capped by plan after {} of {} articles",
                        query,
                        articles.len(),
                        total_results
                    );
                    break;
                }
                let message = body.message.unwrap_or_default();
                error!("NewsApiSource: API error {} for '{}': {}", status, query, message);
                anyhow::bail!("NewsAPI error ({}): {}", status, message);
            }

            total_results = body.total_results;
            let page_len = body.articles.len();
            articles.extend(body.articles);

            if !has_more_pages(page, page_len, articles.len(), total_results) {
                if articles.len() < total_results && page_len == PAGE_SIZE {
                    warn!(
                        "NewsApiSource: stopped after {} pages, {} of {} articles for '{}'",
                        page,
                        articles.len(),
                        total_results,
                        query
                    );
                }
                break;
            }
            page += 1;
        }

        let headlines = to_headlines(articles);
        info!(
            "NewsApiSource: {} headlines for '{}' ({} -> {})",
            headlines.len(),
            query,
            range.start(),
            range.end()
        );
        Ok(headlines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_articles_parse_and_filter() {
        let json = r#"{
            "status": "ok",
            "totalResults": 3,
            "articles": [
                {"source": {"id": null, "name": "Reuters"}, "title": "Stocks rally", "url": "https://x/1", "publishedAt": "2024-05-02T14:30:00Z"},
                {"source": {"name": "AP"}, "title": null, "url": "https://x/2", "publishedAt": "2024-05-02T15:00:00Z"},
                {"source": null, "title": "No date", "url": null, "publishedAt": null}
            ]
        }"#;
        let body: EverythingResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.status, "ok");
        assert_eq!(body.total_results, 3);

        let headlines = to_headlines(body.articles);
        assert_eq!(headlines.len(), 1);
        assert_eq!(headlines[0].title, "Stocks rally");
        assert_eq!(headlines[0].source.as_deref(), Some("Reuters"));
    }

    #[test]
    fn test_error_body_parses() {
        let json = r#"{"status":"error","code":"apiKeyInvalid","message":"Your API key is invalid"}"#;
        let body: EverythingResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.status, "error");
        assert_eq!(body.code.as_deref(), Some("apiKeyInvalid"));
        assert_eq!(body.total_results, 0);
        assert!(body.articles.is_empty());
    }

    #[test]
    fn test_paging_stops_when_results_are_exhausted() {
        // 250 results arrive as 100 + 100 + 50
        assert!(has_more_pages(1, PAGE_SIZE, 100, 250));
        assert!(has_more_pages(2, PAGE_SIZE, 200, 250));
        assert!(!has_more_pages(3, 50, 250, 250));
        // Exactly one full page
        assert!(!has_more_pages(1, PAGE_SIZE, 100, 100));
        // Short page even if the total claims more
        assert!(!has_more_pages(1, 40, 40, 500));
    }

    #[test]
    fn test_paging_respects_page_limit() {
        assert!(has_more_pages(MAX_PAGES - 1, PAGE_SIZE, 900, 5000));
        assert!(!has_more_pages(MAX_PAGES, PAGE_SIZE, 1000, 5000));
    }

    #[test]
    fn test_capped_results_error_parses() {
        let json = r#"{"status":"error","code":"maximumResultsReached","message":"You have requested too many results."}"#;
        let body: EverythingResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.code.as_deref(), Some(RESULTS_CAPPED));
    }
}
