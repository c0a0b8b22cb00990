use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use weathervane::application::fetch::FetchOrchestrator;
use weathervane::application::fusion_service::FusionService;
use weathervane::domain::config::AnalysisConfig;
use weathervane::domain::errors::{DataSource, EngineError, FetchError};
use weathervane::domain::series::DateRange;
use weathervane::infrastructure::mock::{MockNewsSource, MockPriceSource, MockWeatherSource};
use weathervane::infrastructure::news::SentimentAnalyzer;
use weathervane::infrastructure::observability::Metrics;

fn range() -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
    )
    .unwrap()
}

fn orchestrator(
    prices: MockPriceSource,
    weather: MockWeatherSource,
    news: MockNewsSource,
) -> FetchOrchestrator {
    FetchOrchestrator::new(
        Arc::new(prices),
        Arc::new(weather),
        Arc::new(news),
        Arc::new(SentimentAnalyzer::new()),
        Metrics::new().unwrap(),
    )
}

fn failed_origin(err: FetchError) -> DataSource {
    match err {
        FetchError::UpstreamFetch { origin, .. } => origin,
        other => panic!("expected an upstream failure, got {other}"),
    }
}

#[tokio::test]
async fn test_each_failing_source_is_named() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let err = orchestrator(
        MockPriceSource::synthetic(1).failing("503 Service Unavailable"),
        MockWeatherSource::synthetic(1),
        MockNewsSource::synthetic(1),
    )
    .fetch_all("AAPL", "London", range())
    .await
    .unwrap_err();
    assert_eq!(failed_origin(err), DataSource::Price);

    let err = orchestrator(
        MockPriceSource::synthetic(1),
        MockWeatherSource::synthetic(1).failing("timeout"),
        MockNewsSource::synthetic(1),
    )
    .fetch_all("AAPL", "London", range())
    .await
    .unwrap_err();
    assert_eq!(failed_origin(err), DataSource::Weather);

    let err = orchestrator(
        MockPriceSource::synthetic(1),
        MockWeatherSource::synthetic(1),
        MockNewsSource::synthetic(1).failing("invalid api key"),
    )
    .fetch_all("AAPL", "London", range())
    .await
    .unwrap_err();
    assert_eq!(failed_origin(err), DataSource::News);
}

#[tokio::test]
async fn test_first_failure_cancels_pending_fetches() {
    let prices = MockPriceSource::synthetic(1).with_delay(Duration::from_millis(300));
    let weather = MockWeatherSource::synthetic(1).with_delay(Duration::from_millis(300));
    let news = MockNewsSource::synthetic(1).failing("boom");

    let err = orchestrator(prices.clone(), weather.clone(), news)
        .fetch_all("AAPL", "London", range())
        .await
        .unwrap_err();
    assert_eq!(failed_origin(err), DataSource::News);

    // Give any leaked task time to finish
    tokio::time::sleep(Duration::from_millis(450)).await;
    assert_eq!(prices.completed_fetches(), 0);
    assert_eq!(weather.completed_fetches(), 0);
}

#[tokio::test]
async fn test_dropping_request_cancels_all_fetches() {
    let prices = MockPriceSource::synthetic(1).with_delay(Duration::from_millis(300));
    let weather = MockWeatherSource::synthetic(1).with_delay(Duration::from_millis(300));
    let news = MockNewsSource::synthetic(1).with_delay(Duration::from_millis(300));
    let orch = orchestrator(prices.clone(), weather.clone(), news.clone());

    let timed_out = tokio::time::timeout(
        Duration::from_millis(20),
        orch.fetch_all("AAPL", "London", range()),
    )
    .await;
    assert!(timed_out.is_err());

    tokio::time::sleep(Duration::from_millis(450)).await;
    assert_eq!(prices.completed_fetches(), 0);
    assert_eq!(weather.completed_fetches(), 0);
    assert_eq!(news.completed_fetches(), 0);
}

#[tokio::test]
async fn test_service_error_kinds() -> anyhow::Result<()> {
    let service = FusionService::new(
        Arc::new(MockPriceSource::synthetic(1)),
        Arc::new(MockWeatherSource::synthetic(1)),
        Arc::new(MockNewsSource::synthetic(1)),
        AnalysisConfig {
            n_trees: 10,
            model_seed: Some(1),
            ..Default::default()
        },
        Metrics::new()?,
    )?;

    let err = service
        .run_full_analysis("AAPL", "Atlantis", range().start(), range().end())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "LocationNotFoundError");

    let err = service
        .run_full_analysis("AAPL", "London", range().end(), range().start())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Fetch(FetchError::InvalidRange { .. })
    ));
    assert_eq!(err.kind(), "InvalidRangeError");

    let err = service.get_alerts("Atlantis").await.unwrap_err();
    assert_eq!(err.kind(), "LocationNotFoundError");
    Ok(())
}

#[tokio::test]
async fn test_upstream_failure_kind_through_service() -> anyhow::Result<()> {
    let service = FusionService::new(
        Arc::new(MockPriceSource::synthetic(1).failing("connection refused")),
        Arc::new(MockWeatherSource::synthetic(1)),
        Arc::new(MockNewsSource::synthetic(1)),
        AnalysisConfig::default(),
        Metrics::new()?,
    )?;

    let err = service
        .run_full_analysis("AAPL", "London", range().start(), range().end())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "UpstreamFetchError");
    assert!(err.to_string().contains("price"));
    assert!(err.to_string().contains("connection refused"));
    Ok(())
}
