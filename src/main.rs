use anyhow::{Context, Result};
use std::sync::Arc;
use bullion_aggregator::api::{create_router, ApiState};
use bullion_aggregator::cache::{Clock, SystemClock};
use bullion_aggregator::config::AppConfig;
use bullion_aggregator::listings::{ComparisonAggregator, HttpPageFetcher};
use bullion_aggregator::observability::metrics::register_metrics;
use bullion_aggregator::observability::tracing::init_tracing;
use bullion_aggregator::price_infra::aggregator::SpotAggregator;
use bullion_aggregator::price_infra::connectors::yahoo::YahooChartSource;
use bullion_aggregator::price_infra::quote_client::QuoteClient;

#[tokio::main]
async fn main() -> Result<()> {
    let env = std::env::var("BULLION_ENV").unwrap_or_else(|_| "development".to_string());
    let config = AppConfig::load(&env).context("Failed to load configuration")?;

    init_tracing(&config.logging).context("Failed to initialise tracing")?;
    register_metrics().context("Failed to register metrics")?;
    tracing::info!(env = %env, sellers = config.sellers.len(), "Configuration loaded");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let source = YahooChartSource::new(&config.quotes.base_url, config.quotes.request_timeout())
        .context("Failed to build quote source")?;
    let quotes = Arc::new(QuoteClient::new(
        Arc::new(source),
        config.cache.ticker_ttl(),
        clock.clone(),
    ));
    let spot = SpotAggregator::new(
        quotes,
        config.quotes.metal_tickers.clone(),
        config.quotes.fx_tickers.clone(),
        config.quotes.source_label.clone(),
        &config.cache,
        clock.clone(),
    );

    let fetcher = HttpPageFetcher::new(&config.scraper).context("Failed to build page fetcher")?;
    let comparisons = ComparisonAggregator::new(
        config.sellers.clone(),
        Arc::new(fetcher),
        config.cache.comparisons_ttl(),
        clock,
    );

    let app = create_router(Arc::new(ApiState {
        spot: Arc::new(spot),
        comparisons: Arc::new(comparisons),
    }));

    let addr = config.server.bind_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
