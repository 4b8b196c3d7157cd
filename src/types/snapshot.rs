use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use crate::types::metal::{Currency, Metal};
use crate::types::timestamp::Timestamp;

/// Latest numeric value observed for one instrument.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TickerQuote {
    pub instrument_id: String,
    pub value: f64,
    pub observed_at: Timestamp,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurrencyRates {
    #[serde(rename = "USD")]
    pub usd: f64,
    #[serde(rename = "AUD")]
    pub aud: f64,
    #[serde(rename = "INR")]
    pub inr: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetalPriceSnapshot {
    pub metal: Metal,
    pub rates: CurrencyRates,
    #[serde(rename = "timestamp")]
    pub observed_at: Timestamp,
}

/// USD-denominated FX multipliers: `1 USD = rate units of currency`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FxSnapshot {
    #[serde(rename = "INR")]
    pub inr: f64,
    #[serde(rename = "AUD")]
    pub aud: f64,
    #[serde(rename = "timestamp")]
    pub observed_at: Timestamp,
    #[serde(rename = "source")]
    pub source_label: String,
    #[serde(rename = "tickers")]
    pub ticker_map: BTreeMap<Currency, String>,
}
