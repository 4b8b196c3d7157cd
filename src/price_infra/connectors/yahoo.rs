use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;
use url::Url;
use crate::price_infra::connectors::QuoteSource;
use crate::price_infra::QuoteResponse;
use crate::error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Reads the daily chart endpoint of Yahoo Finance.
pub struct YahooChartSource {
    client: reqwest::Client,
    base_url: Url,
}

impl YahooChartSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::ConfigError(format!("invalid quote base url {}: {}", base_url, e)))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::ConfigError(format!("quote client: {}", e)))?;

        Ok(YahooChartSource { client, base_url })
    }

    pub fn chart_url(&self, instrument_id: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut()
                .map_err(|_| Error::ConfigError(format!("quote base url cannot be a base: {}", self.base_url)))?;
            segments
                .pop_if_empty()
                .extend(["v8", "finance", "chart", instrument_id]);
        }
        url.query_pairs_mut()
            .append_pair("interval", "1d")
            .append_pair("range", "5d");
        Ok(url)
    }
}

#[async_trait]
impl QuoteSource for YahooChartSource {
    async fn fetch_quote(&self, instrument_id: &str) -> Result<QuoteResponse> {
        let url = self.chart_url(instrument_id)?;
        let failed = |reason: String| Error::InstrumentFetchFailed {
            instrument: instrument_id.to_string(),
            reason,
        };

        let response = self.client
            .get(url)
            .header(USER_AGENT, "Mozilla/5.0")
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("HTTP {}", status.as_u16())));
        }

        let envelope: ChartEnvelope = response
            .json()
            .await
            .map_err(|e| failed(format!("undecodable chart body: {}", e)))?;

        Ok(envelope.into_quote())
    }
}

#[derive(Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: Option<ChartMeta>,
    #[serde(default)]
    indicators: Option<Indicators>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    regular_market_price: Option<f64>,
}

#[derive(Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Option<Vec<QuoteSeries>>,
}

#[derive(Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    close: Option<Vec<Option<f64>>>,
}

impl ChartEnvelope {
    fn into_quote(self) -> QuoteResponse {
        let Some(first) = self.chart.result.and_then(|results| results.into_iter().next()) else {
            return QuoteResponse::default();
        };

        let current_price = first.meta.and_then(|meta| meta.regular_market_price);
        let closes = first.indicators
            .and_then(|indicators| indicators.quote)
            .and_then(|series| series.into_iter().next())
            .and_then(|series| series.close)
            .unwrap_or_default();

        QuoteResponse { current_price, closes }
    }
}
