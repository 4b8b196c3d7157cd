use futures::future::try_join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn, Instrument};
use crate::cache::{Clock, TtlCell};
use crate::config::CachePolicy;
use crate::error::{Error, Result};
use crate::observability::metrics::REFRESH_LATENCY;
use crate::observability::tracing::trace_snapshot_refresh;
use crate::price_infra::quote_client::QuoteClient;
use crate::price_infra::{FxTickers, MetalTickers};
use crate::types::metal::{Currency, Metal};
use crate::types::snapshot::{CurrencyRates, FxSnapshot, MetalPriceSnapshot};

/// USD→currency multipliers fetched together.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FxRates {
    pub inr: f64,
    pub aud: f64,
}

/// Composes per-instrument quotes into cached metal price and FX snapshots.
pub struct SpotAggregator {
    quotes: Arc<QuoteClient>,
    metal_tickers: Vec<MetalTickers>,
    fx_tickers: FxTickers,
    source_label: String,
    clock: Arc<dyn Clock>,
    prices: TtlCell<Vec<MetalPriceSnapshot>>,
    fx: TtlCell<FxSnapshot>,
}

impl SpotAggregator {
    pub fn new(
        quotes: Arc<QuoteClient>,
        metal_tickers: Vec<MetalTickers>,
        fx_tickers: FxTickers,
        source_label: impl Into<String>,
        policy: &CachePolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        SpotAggregator {
            quotes,
            metal_tickers,
            fx_tickers,
            source_label: source_label.into(),
            prices: TtlCell::new(policy.prices_ttl(), clock.clone()),
            fx: TtlCell::new(policy.fx_ttl(), clock.clone()),
            clock,
        }
    }

    pub async fn get_metal_prices(&self) -> Result<Vec<MetalPriceSnapshot>> {
        self.prices
            .get_or_refresh(|| self.build_metal_prices().instrument(trace_snapshot_refresh("prices")))
            .await
    }

    pub async fn get_fx_snapshot(&self) -> Result<FxSnapshot> {
        self.fx
            .get_or_refresh(|| self.build_fx_snapshot().instrument(trace_snapshot_refresh("fx")))
            .await
    }

    /// First instrument in `instruments` that yields a quote wins.
    pub async fn resolve_metal_price(&self, instruments: &[String]) -> Result<f64> {
        let mut last_error = None;

        for instrument in instruments {
            match self.quotes.get_quote(instrument).await {
                Ok(price) => return Ok(price),
                Err(e) => {
                    warn!(instrument = %instrument, error = %e, "Instrument failed, trying next");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(last) => Err(Error::FallbackExhausted {
                attempted: instruments.len(),
                last: Box::new(last),
            }),
            None => Err(Error::ConfigError("empty instrument fallback chain".to_string())),
        }
    }

    /// Both FX legs are requested concurrently; either failing fails the pair.
    pub async fn fetch_fx_rates(&self) -> Result<FxRates> {
        let (inr, aud) = tokio::try_join!(
            self.quotes.get_quote(&self.fx_tickers.inr),
            self.quotes.get_quote(&self.fx_tickers.aud),
        )?;

        Ok(FxRates {
            inr: validate_rate("INR", inr)?,
            aud: validate_rate("AUD", aud)?,
        })
    }

    async fn build_metal_prices(&self) -> Result<Vec<MetalPriceSnapshot>> {
        let _timer = REFRESH_LATENCY.start_timer();

        let usd_prices = try_join_all(self.metal_tickers.iter().map(|tickers| async move {
            let usd = self.resolve_metal_price(&tickers.instruments).await?;
            Ok::<(Metal, f64), Error>((tickers.metal, usd))
        }));
        let (fx, usd_prices) = tokio::try_join!(self.fetch_fx_rates(), usd_prices)?;

        let observed_at = self.clock.now();
        let snapshots = usd_prices
            .into_iter()
            .map(|(metal, usd)| {
                Ok(MetalPriceSnapshot {
                    metal,
                    rates: convert_rates(metal, usd, fx)?,
                    observed_at,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(metals = snapshots.len(), inr = fx.inr, aud = fx.aud, "Metal price snapshot rebuilt");
        Ok(snapshots)
    }

    async fn build_fx_snapshot(&self) -> Result<FxSnapshot> {
        let fx = self.fetch_fx_rates().await?;

        let ticker_map = BTreeMap::from([
            (Currency::INR, self.fx_tickers.inr.clone()),
            (Currency::AUD, self.fx_tickers.aud.clone()),
        ]);

        Ok(FxSnapshot {
            inr: fx.inr,
            aud: fx.aud,
            observed_at: self.clock.now(),
            source_label: self.source_label.clone(),
            ticker_map,
        })
    }
}

fn validate_rate(label: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(Error::InvalidRate {
            label: label.to_string(),
            value,
        })
    }
}

/// `rate` is a USD→currency multiplier, so conversion is a straight product.
pub fn convert_usd(usd: f64, rate: f64, currency: Currency) -> Result<f64> {
    validate_rate(&currency.to_string(), rate)?;
    validate_rate(&format!("USD→{}", currency), usd * rate)
}

pub fn convert_rates(metal: Metal, usd: f64, fx: FxRates) -> Result<CurrencyRates> {
    Ok(CurrencyRates {
        usd: validate_rate(&format!("{} USD", metal), usd)?,
        aud: convert_usd(usd, fx.aud, Currency::AUD)?,
        inr: convert_usd(usd, fx.inr, Currency::INR)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::price_infra::connectors::MockQuoteSource;
    use crate::price_infra::{default_metal_tickers, QuoteResponse};
    use crate::types::timestamp::Timestamp;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn quote(value: f64) -> Result<QuoteResponse> {
        Ok(QuoteResponse {
            current_price: Some(value),
            closes: vec![],
        })
    }

    fn unavailable(id: &str) -> Result<QuoteResponse> {
        Err(Error::InstrumentFetchFailed {
            instrument: id.to_string(),
            reason: "HTTP 404".to_string(),
        })
    }

    /// Spot pairs fail, futures answer; FX is INR 83 / AUD 1.5.
    fn market(id: &str) -> Result<QuoteResponse> {
        match id {
            "INR=X" => quote(83.0),
            "AUD=X" => quote(1.5),
            "GC=F" => quote(2000.0),
            "SI=F" => quote(25.0),
            "PL=F" => quote(950.0),
            "PA=F" => quote(1000.0),
            other => unavailable(other),
        }
    }

    fn aggregator(source: MockQuoteSource, clock: Arc<ManualClock>) -> SpotAggregator {
        let policy = CachePolicy::default();
        let quotes = Arc::new(QuoteClient::new(Arc::new(source), policy.ticker_ttl(), clock.clone()));
        SpotAggregator::new(
            quotes,
            default_metal_tickers(),
            FxTickers::default(),
            "Yahoo Finance",
            &policy,
            clock,
        )
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(Timestamp::from_millis(1_700_000_000_000)))
    }

    #[tokio::test]
    async fn fallback_chain_skips_failed_instrument() {
        let mut source = MockQuoteSource::new();
        source.expect_fetch_quote().returning(|id| market(id));
        let spot = aggregator(source, clock());

        let chain = vec!["XAUUSD=X".to_string(), "GC=F".to_string()];
        assert_eq!(spot.resolve_metal_price(&chain).await.unwrap(), 2000.0);
    }

    #[tokio::test]
    async fn exhausted_chain_carries_last_error() {
        let mut source = MockQuoteSource::new();
        source.expect_fetch_quote().returning(|id| unavailable(id));
        let spot = aggregator(source, clock());

        let chain = vec!["A".to_string(), "B".to_string()];
        match spot.resolve_metal_price(&chain).await.unwrap_err() {
            Error::FallbackExhausted { attempted, last } => {
                assert_eq!(attempted, 2);
                assert!(matches!(*last, Error::InstrumentFetchFailed { ref instrument, .. } if instrument == "B"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn converts_with_usd_multipliers() {
        let rates = convert_rates(Metal::Gold, 2000.0, FxRates { inr: 83.0, aud: 1.5 }).unwrap();
        assert_eq!(rates.usd, 2000.0);
        assert!((rates.aud - 3000.0).abs() < 1e-9);
        assert!((rates.inr - 166_000.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_non_positive_or_non_finite_rates() {
        let fx = FxRates { inr: 83.0, aud: 0.0 };
        assert!(matches!(convert_rates(Metal::Gold, 2000.0, fx), Err(Error::InvalidRate { .. })));

        let fx = FxRates { inr: f64::NAN, aud: 1.5 };
        assert!(matches!(convert_rates(Metal::Silver, 25.0, fx), Err(Error::InvalidRate { .. })));

        assert!(convert_usd(f64::MAX, 2.0, Currency::AUD).is_err());
    }

    #[tokio::test]
    async fn builds_and_caches_metal_prices() {
        let clock = clock();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut source = MockQuoteSource::new();
        source.expect_fetch_quote().returning(move |id| {
            counter.fetch_add(1, Ordering::SeqCst);
            market(id)
        });
        let spot = aggregator(source, clock.clone());

        let prices = spot.get_metal_prices().await.unwrap();
        assert_eq!(prices.len(), 4);
        let gold = prices.iter().find(|p| p.metal == Metal::Gold).unwrap();
        assert_eq!(gold.rates.usd, 2000.0);
        assert!((gold.rates.aud - 3000.0).abs() < 1e-9);
        assert!((gold.rates.inr - 166_000.0).abs() < 1e-9);
        assert!(prices.iter().all(|p| p.rates.aud > 0.0));

        let fetched = calls.load(Ordering::SeqCst);
        clock.advance(Duration::from_secs(30));
        assert_eq!(spot.get_metal_prices().await.unwrap(), prices);
        assert_eq!(calls.load(Ordering::SeqCst), fetched);
    }

    #[tokio::test]
    async fn invalid_fx_rate_fails_whole_snapshot() {
        let mut source = MockQuoteSource::new();
        source.expect_fetch_quote().returning(|id| match id {
            "AUD=X" => quote(-1.0),
            other => market(other),
        });
        let spot = aggregator(source, clock());

        assert!(matches!(spot.get_metal_prices().await, Err(Error::InvalidRate { .. })));
    }

    #[tokio::test]
    async fn one_metal_without_any_quote_fails_snapshot() {
        let mut source = MockQuoteSource::new();
        source.expect_fetch_quote().returning(|id| match id {
            "PA=F" => unavailable(id),
            other => market(other),
        });
        let spot = aggregator(source, clock());

        assert!(matches!(spot.get_metal_prices().await, Err(Error::FallbackExhausted { .. })));
    }

    #[tokio::test]
    async fn fx_snapshot_carries_ticker_map_and_label() {
        let mut source = MockQuoteSource::new();
        source.expect_fetch_quote().returning(|id| market(id));
        let spot = aggregator(source, clock());

        let fx = spot.get_fx_snapshot().await.unwrap();
        assert_eq!(fx.inr, 83.0);
        assert_eq!(fx.aud, 1.5);
        assert_eq!(fx.source_label, "Yahoo Finance");
        assert_eq!(fx.ticker_map.get(&Currency::INR).map(String::as_str), Some("INR=X"));

        let json = serde_json::to_value(&fx).unwrap();
        assert_eq!(json["tickers"]["AUD"], "AUD=X");
        assert_eq!(json["source"], "Yahoo Finance");
    }
}
