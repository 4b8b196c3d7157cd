use bullion_aggregator::config::{ScraperConfig, SellerConfig};
use bullion_aggregator::error::Error;
use bullion_aggregator::listings::{HttpPageFetcher, PageFetcher};
use bullion_aggregator::price_infra::connectors::QuoteSource;
use bullion_aggregator::price_infra::connectors::yahoo::YahooChartSource;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn yahoo(server: &MockServer) -> YahooChartSource {
    YahooChartSource::new(&server.uri(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn yahoo_chart_prefers_market_price() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/GC=F"))
        .and(query_param("interval", "1d"))
        .and(query_param("range", "5d"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "chart": { "result": [{
                "meta": { "regularMarketPrice": 2381.4 },
                "indicators": { "quote": [{ "close": [2370.0, null, 2375.5] }] }
            }]}
        })))
        .mount(&server)
        .await;

    let quote = yahoo(&server).fetch_quote("GC=F").await.unwrap();
    assert_eq!(quote.latest_value(), Some(2381.4));
}

#[tokio::test]
async fn yahoo_chart_falls_back_to_last_close() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/INR=X"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "chart": { "result": [{
                "meta": {},
                "indicators": { "quote": [{ "close": [83.1, 83.4, null] }] }
            }]}
        })))
        .mount(&server)
        .await;

    let quote = yahoo(&server).fetch_quote("INR=X").await.unwrap();
    assert_eq!(quote.latest_value(), Some(83.4));
}

#[tokio::test]
async fn yahoo_non_success_is_instrument_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = yahoo(&server).fetch_quote("XAUUSD=X").await.unwrap_err();
    match err {
        Error::InstrumentFetchFailed { instrument, reason } => {
            assert_eq!(instrument, "XAUUSD=X");
            assert_eq!(reason, "HTTP 429");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(
        yahoo(&server).fetch_quote("XAUUSD=X").await,
        Err(e) if e.is_instrument_level()
    ));
}

#[tokio::test]
async fn yahoo_garbage_body_is_instrument_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>rate limited</html>"))
        .mount(&server)
        .await;

    let err = yahoo(&server).fetch_quote("SI=F").await.unwrap_err();
    assert!(err.is_instrument_level());
}

fn scraper() -> ScraperConfig {
    ScraperConfig {
        user_agent: "Mozilla/5.0 (test)".to_string(),
        request_timeout_ms: 5_000,
    }
}

#[tokio::test]
async fn page_fetcher_sends_browser_signature() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/all"))
        .and(header("user-agent", "Mozilla/5.0 (test)"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<h3>1oz Gold Bar</h3><p>$3,400</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpPageFetcher::new(&scraper()).unwrap();
    let seller = SellerConfig::new("Local", &server.uri(), &["/collections/all"]);
    let body = fetcher.fetch_page(&seller.urls[0]).await.unwrap();
    assert!(body.contains("1oz Gold Bar"));
}

#[tokio::test]
async fn page_fetcher_rejects_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let fetcher = HttpPageFetcher::new(&scraper()).unwrap();
    let url = format!("{}/collections/coins", server.uri());
    let err = fetcher.fetch_page(&url).await.unwrap_err();
    assert!(matches!(err, Error::PageFetchFailed { ref reason, .. } if reason == "HTTP 503"));
}
