use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Quote metrics
    pub static ref QUOTE_FETCHES: IntCounterVec = IntCounterVec::new(
        Opts::new("quote_fetches_total", "Quote provider requests by outcome"),
        &["outcome"]
    ).expect("valid quote_fetches_total opts");

    pub static ref QUOTE_CACHE_HITS: IntCounter = IntCounter::new(
        "quote_cache_hits_total",
        "Quotes served from a fresh cache entry"
    ).expect("valid quote_cache_hits_total opts");

    pub static ref QUOTE_STALE_FALLBACKS: IntCounter = IntCounter::new(
        "quote_stale_fallbacks_total",
        "Quotes served from an expired cache entry after a failed fetch"
    ).expect("valid quote_stale_fallbacks_total opts");

    // Listing metrics
    pub static ref SELLER_FETCH_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("seller_fetch_failures_total", "Retailers that yielded no pages"),
        &["seller"]
    ).expect("valid seller_fetch_failures_total opts");

    pub static ref LISTINGS_ACCEPTED: IntCounter = IntCounter::new(
        "listings_accepted_total",
        "Listings that passed normalization"
    ).expect("valid listings_accepted_total opts");

    pub static ref LISTINGS_REJECTED: IntCounterVec = IntCounterVec::new(
        Opts::new("listings_rejected_total", "Listings dropped during normalization"),
        &["reason"]
    ).expect("valid listings_rejected_total opts");

    pub static ref COMPARISON_GROUPS: IntGauge = IntGauge::new(
        "comparison_groups",
        "Product comparisons in the latest aggregation"
    ).expect("valid comparison_groups opts");

    // Latency metrics
    pub static ref REFRESH_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "snapshot_refresh_latency_seconds",
            "Time to rebuild a cached snapshot"
        ).buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0])
    ).expect("valid snapshot_refresh_latency_seconds opts");
}

pub fn register_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(QUOTE_FETCHES.clone()))?;
    REGISTRY.register(Box::new(QUOTE_CACHE_HITS.clone()))?;
    REGISTRY.register(Box::new(QUOTE_STALE_FALLBACKS.clone()))?;
    REGISTRY.register(Box::new(SELLER_FETCH_FAILURES.clone()))?;
    REGISTRY.register(Box::new(LISTINGS_ACCEPTED.clone()))?;
    REGISTRY.register(Box::new(LISTINGS_REJECTED.clone()))?;
    REGISTRY.register(Box::new(COMPARISON_GROUPS.clone()))?;
    REGISTRY.register(Box::new(REFRESH_LATENCY.clone()))?;
    Ok(())
}

/// Render every registered metric in the prometheus text format.
pub fn gather_text() -> prometheus::Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
