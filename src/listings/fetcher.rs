use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use tracing::debug;
use crate::config::ScraperConfig;
use crate::error::{Error, Result};

/// Fetches raw retailer page content.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<String>;
}

/// Plain HTTP GET with a browser-like request signature.
pub struct HttpPageFetcher {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpPageFetcher {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::ConfigError(format!("page client: {}", e)))?;

        Ok(HttpPageFetcher {
            client,
            user_agent: config.user_agent.clone(),
        })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String> {
        let failed = |reason: String| Error::PageFetchFailed {
            url: url.to_string(),
            reason,
        };

        let response = self.client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "text/html,application/xhtml+xml")
            .header(ACCEPT_LANGUAGE, "en-AU,en;q=0.9")
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("HTTP {}", status.as_u16())));
        }

        let body = response.text().await.map_err(|e| failed(e.to_string()))?;
        debug!(url = url, bytes = body.len(), "Page fetched");
        Ok(body)
    }
}
