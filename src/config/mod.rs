use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::price_infra::{default_metal_tickers, FxTickers, MetalTickers};
use crate::price_infra::connectors::yahoo::DEFAULT_BASE_URL;

pub mod loader;
pub mod sellers;

pub use loader::AppConfig;
pub use sellers::{default_sellers, SellerConfig};

/// Independent freshness windows for each cache, in milliseconds.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct CachePolicy {
    pub prices_ms: u64,
    pub comparisons_ms: u64,
    pub ticker_ms: u64,
    pub fx_ms: u64,
}

impl CachePolicy {
    pub fn prices_ttl(&self) -> Duration {
        Duration::from_millis(self.prices_ms)
    }

    pub fn comparisons_ttl(&self) -> Duration {
        Duration::from_millis(self.comparisons_ms)
    }

    pub fn ticker_ttl(&self) -> Duration {
        Duration::from_millis(self.ticker_ms)
    }

    pub fn fx_ttl(&self) -> Duration {
        Duration::from_millis(self.fx_ms)
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        CachePolicy {
            prices_ms: 60_000,
            comparisons_ms: 86_400_000,  // 24 hours
            ticker_ms: 60_000,
            fx_ms: 60_000,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8787,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct QuoteProviderConfig {
    pub base_url: String,
    pub request_timeout_ms: u64,
    pub source_label: String,
    pub metal_tickers: Vec<MetalTickers>,
    pub fx_tickers: FxTickers,
}

impl QuoteProviderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for QuoteProviderConfig {
    fn default() -> Self {
        QuoteProviderConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_ms: 10_000,
            source_label: "Yahoo Finance".to_string(),
            metal_tickers: default_metal_tickers(),
            fx_tickers: FxTickers::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub user_agent: String,
    pub request_timeout_ms: u64,
}

impl ScraperConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        ScraperConfig {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36"
                .to_string(),
            request_timeout_ms: 15_000,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            filter: "info,bullion_aggregator=debug".to_string(),
            json: false,
        }
    }
}
