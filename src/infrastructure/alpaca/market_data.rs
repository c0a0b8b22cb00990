use super::common::AlpacaBar;
use crate::domain::ports::PriceDataSource;
use crate::domain::series::{DateRange, PriceBar};
use crate::infrastructure::core::http_client_factory::{HttpClientFactory, build_url_with_query};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, error, info};

/// Daily bars from the Alpaca market data API (IEX feed)
pub struct AlpacaPriceSource {
    client: ClientWithMiddleware,
    api_key: String,
    api_secret: String,
    data_base_url: String,
}

#[derive(Debug, Deserialize)]
struct AlpacaBarResponse {
    bars: Option<HashMap<String, Vec<AlpacaBar>>>,
    next_page_token: Option<String>,
}

impl AlpacaPriceSource {
    pub fn new(api_key: String, api_secret: String, data_base_url: String) -> Self {
        Self {
            client: HttpClientFactory::create_client(),
            api_key,
            api_secret,
            data_base_url,
        }
    }
}

#[async_trait]
impl PriceDataSource for AlpacaPriceSource {
    async fn fetch_daily_bars(&self, ticker: &str, range: DateRange) -> Result<Vec<PriceBar>> {
        let url = format!("{}/v2/stocks/bars", self.data_base_url);
        let mut all_bars = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query_params = vec![
                ("symbols", ticker.to_string()),
                ("start", range.start().to_string()),
                ("end", range.end().to_string()),
                ("timeframe", "1Day".to_string()),
                ("limit", "10000".to_string()),
                ("feed", "iex".to_string()),
            ];
            if let Some(token) = &page_token {
                query_params.push(("page_token", token.clone()));
            }

            let url_with_query = build_url_with_query(&url, &query_params)?;
            debug!(
                "AlpacaPriceSource: Fetching daily bars for {} ({} -> {})",
                ticker,
                range.start(),
                range.end()
            );

            let response = self
                .client
                .get(&url_with_query)
                .header("APCA-API-KEY-ID", &self.api_key)
                .header("APCA-API-SECRET-KEY", &self.api_secret)
                .send()
                .await
                .context("Failed to fetch bars from Alpaca")?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_default();
                error!(
                    "AlpacaPriceSource: API error {} for {}: {}",
                    status, ticker, error_text
                );
                anyhow::bail!("Alpaca API error ({}): {}", status, error_text);
            }

            let body: AlpacaBarResponse = response
                .json()
                .await
                .context("Failed to parse bars response")?;

            if let Some(bars) = body.bars.as_ref().and_then(|b| b.get(ticker)) {
                for bar in bars {
                    all_bars.push(bar.to_price_bar()?);
                }
            }

            page_token = body.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        info!(
            "AlpacaPriceSource: {} daily bars for {}",
            all_bars.len(),
            ticker
        );
        Ok(all_bars)
    }
}
