use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use crate::cache::{Clock, TtlCache};
use crate::error::{Error, Result};
use crate::observability::metrics::{QUOTE_CACHE_HITS, QUOTE_FETCHES, QUOTE_STALE_FALLBACKS};
use crate::price_infra::connectors::QuoteSource;
use crate::types::snapshot::TickerQuote;

/// Per-instrument cached access to a quote provider.
///
/// Fresh entries are served without a network call. When a fetch fails, the
/// last value ever seen for the instrument is returned no matter how old it
/// is; only an instrument with no history propagates the failure.
pub struct QuoteClient {
    source: Arc<dyn QuoteSource>,
    cache: TtlCache<String, f64>,
}

impl QuoteClient {
    pub fn new(source: Arc<dyn QuoteSource>, ticker_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        QuoteClient {
            source,
            cache: TtlCache::new(ticker_ttl, clock),
        }
    }

    pub async fn get_quote(&self, instrument_id: &str) -> Result<f64> {
        if let Some(value) = self.cache.get_fresh(instrument_id) {
            QUOTE_CACHE_HITS.inc();
            return Ok(value);
        }

        match self.fetch_latest(instrument_id).await {
            Ok(value) => {
                QUOTE_FETCHES.with_label_values(&["ok"]).inc();
                self.cache.insert(instrument_id.to_string(), value);
                debug!(instrument = instrument_id, value, "Quote refreshed");
                Ok(value)
            }
            Err(e) => {
                QUOTE_FETCHES.with_label_values(&["error"]).inc();
                match self.last_known(instrument_id) {
                    Some(stale) if e.is_instrument_level() => {
                        QUOTE_STALE_FALLBACKS.inc();
                        warn!(
                            instrument = instrument_id,
                            error = %e,
                            observed_at = %stale.observed_at,
                            "Quote fetch failed, serving stale value"
                        );
                        Ok(stale.value)
                    }
                    _ => Err(e),
                }
            }
        }
    }

    /// The cached quote for `instrument_id`, fresh or not.
    pub fn last_known(&self, instrument_id: &str) -> Option<TickerQuote> {
        self.cache.get_stale(instrument_id).map(|cached| TickerQuote {
            instrument_id: instrument_id.to_string(),
            value: cached.value,
            observed_at: cached.stored_at,
        })
    }

    async fn fetch_latest(&self, instrument_id: &str) -> Result<f64> {
        let response = self.source.fetch_quote(instrument_id).await?;
        response
            .latest_value()
            .ok_or_else(|| Error::NoPriceFound(instrument_id.to_string()))
    }
}
