use crate::config::*;
use crate::error::{Error, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use url::Url;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub cache: CachePolicy,
    pub quotes: QuoteProviderConfig,
    pub scraper: ScraperConfig,
    #[serde(default = "default_sellers")]
    pub sellers: Vec<SellerConfig>,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            server: ServerConfig::default(),
            cache: CachePolicy::default(),
            quotes: QuoteProviderConfig::default(),
            scraper: ScraperConfig::default(),
            sellers: default_sellers(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Layered load: `config/default`, then `config/<env>`, then `BULLION_*`
    /// environment variables (`BULLION_CACHE__PRICES_MS=5000`).
    pub fn load(env: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("BULLION")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Result<Self> {
        let app: AppConfig = config.try_deserialize()
            .map_err(|e| Error::ConfigError(e.to_string()))?;
        app.validate()?;
        Ok(app)
    }

    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.quotes.base_url)
            .map_err(|e| Error::ConfigError(format!("quotes.base_url: {}", e)))?;

        for tickers in &self.quotes.metal_tickers {
            if tickers.instruments.is_empty() {
                return Err(Error::ConfigError(format!(
                    "no instruments configured for {}",
                    tickers.metal
                )));
            }
        }

        for seller in &self.sellers {
            Url::parse(&seller.base_url)
                .map_err(|e| Error::ConfigError(format!("seller {} base_url: {}", seller.name, e)))?;
            if seller.urls.is_empty() {
                return Err(Error::ConfigError(format!("seller {} has no catalog urls", seller.name)));
            }
        }

        Ok(())
    }
}
