pub mod connectors;
pub mod quote_client;
pub mod aggregator;

use serde::{Deserialize, Serialize};
use crate::types::metal::Metal;

/// Ordered instrument ids for one metal; earlier entries are preferred.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MetalTickers {
    pub metal: Metal,
    pub instruments: Vec<String>,
}

/// The USD→currency instruments the aggregator converts with.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FxTickers {
    pub inr: String,
    pub aud: String,
}

impl Default for FxTickers {
    fn default() -> Self {
        FxTickers {
            inr: "INR=X".to_string(),  // 1 USD in INR
            aud: "AUD=X".to_string(),  // 1 USD in AUD
        }
    }
}

/// What a quote provider returned for one instrument.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuoteResponse {
    pub current_price: Option<f64>,
    /// Historical closes, oldest first. Gaps are `None`.
    pub closes: Vec<Option<f64>>,
}

impl QuoteResponse {
    /// The provider's current price when finite, else the most recent finite close.
    pub fn latest_value(&self) -> Option<f64> {
        self.current_price
            .filter(|price| price.is_finite())
            .or_else(|| {
                self.closes
                    .iter()
                    .rev()
                    .flatten()
                    .copied()
                    .find(|close| close.is_finite())
            })
    }
}

pub fn default_metal_tickers() -> Vec<MetalTickers> {
    // Spot pair first, futures contract as fallback
    [
        (Metal::Gold, ["XAUUSD=X", "GC=F"]),
        (Metal::Silver, ["XAGUSD=X", "SI=F"]),
        (Metal::Platinum, ["XPTUSD=X", "PL=F"]),
        (Metal::Palladium, ["XPDUSD=X", "PA=F"]),
    ]
    .into_iter()
    .map(|(metal, instruments)| MetalTickers {
        metal,
        instruments: instruments.iter().map(|id| id.to_string()).collect(),
    })
    .collect()
}
