pub mod yahoo;

use async_trait::async_trait;
use crate::price_infra::QuoteResponse;
use crate::error::Result;

/// A provider that can report the latest value of an instrument.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_quote(&self, instrument_id: &str) -> Result<QuoteResponse>;
}
