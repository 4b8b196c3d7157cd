//! Free-text classification of retailer listings.
//!
//! Each concern (metal, weight, form, series, price) is a standalone
//! `&str -> Option<T>` function. [`classify`] composes them in a fixed order and
//! reports why a listing was dropped; [`normalize`] is the lossy entry point
//! used by the extraction pipeline.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::trace;
use crate::listings::html::clean_text;
use crate::observability::metrics::{LISTINGS_ACCEPTED, LISTINGS_REJECTED};
use crate::types::listing::RawListing;
use crate::types::metal::{Metal, ProductForm};

pub const GRAMS_PER_TROY_OUNCE: f64 = 31.1035;

/// Product lines recognised as a grouping key, in priority order.
pub const SERIES_KEYWORDS: [&str; 13] = [
    "kangaroo",
    "kookaburra",
    "koala",
    "maple",
    "britannia",
    "eagle",
    "philharmonic",
    "krugerrand",
    "panda",
    "libertad",
    "swan",
    "dragon",
    "lunar",
];

/// Manufacturing process keywords, used when no product line matches.
pub const PROCESS_KEYWORDS: [&str; 3] = ["cast", "minted", "poured"];

const EXCLUDED_PHRASE: &str = "pool allocated";

lazy_static! {
    static ref COMBO_GRAMS: Regex = Regex::new(r"(\d+)\s*x\s*(\d+(?:\.\d+)?)\s*g").expect("valid combo pattern");
    static ref FRACTION_OZ: Regex = Regex::new(r"(\d+)\s*/\s*(\d+)\s*oz").expect("valid fraction pattern");
    static ref OUNCES: Regex = Regex::new(r"(\d+(?:\.\d+)?)\s*oz").expect("valid ounce pattern");
    static ref KILOGRAMS: Regex = Regex::new(r"(\d+(?:\.\d+)?)\s*kg").expect("valid kilogram pattern");
    static ref GRAMS: Regex = Regex::new(r"(\d+(?:\.\d+)?)\s*(?:grams?|g)\b").expect("valid gram pattern");

    static ref COIN_WORDS: Regex = Regex::new(
        r"(?i)(coin|proof|round|sovereign|kangaroo|kookaburra|koala|eagle|maple|britannia|philharmonic|krugerrand|panda)"
    ).expect("valid coin vocabulary");
    static ref BAR_WORDS: Regex = Regex::new(
        r"(?i)(bar|cast|minted|ingot|poured|tablet|combi)"
    ).expect("valid bar vocabulary");
}

/// Price as found in the page, before validation.
#[derive(Clone, Debug, PartialEq)]
pub enum RawPrice {
    Amount(f64),
    Text(String),
    Missing,
}

#[derive(Error, Clone, Debug, PartialEq)]
pub enum RejectReason {
    #[error("empty product name")]
    EmptyName,

    #[error("pool allocated products are excluded")]
    PoolAllocated,

    #[error("not a coin or bar")]
    NotCoinOrBar,

    #[error("no metal keyword")]
    NoMetal,

    #[error("no recognisable weight")]
    NoWeight,

    #[error("price is not a finite non-negative number")]
    InvalidPrice,
}

impl RejectReason {
    pub fn label(&self) -> &'static str {
        match self {
            RejectReason::EmptyName => "empty_name",
            RejectReason::PoolAllocated => "pool_allocated",
            RejectReason::NotCoinOrBar => "not_coin_or_bar",
            RejectReason::NoMetal => "no_metal",
            RejectReason::NoWeight => "no_weight",
            RejectReason::InvalidPrice => "invalid_price",
        }
    }
}

pub fn parse_metal(name: &str) -> Option<Metal> {
    let lowered = name.to_lowercase();
    Metal::ALL
        .into_iter()
        .find(|metal| lowered.contains(metal.keyword()))
}

/// Troy ounces described by `name`. Patterns are tried in priority order:
/// `N x Gg` packs, `a/b oz`, `N oz`, `N kg`, `N g`.
pub fn parse_weight_oz(name: &str) -> Option<f64> {
    let text = name.to_lowercase();

    let weight = if let Some(caps) = COMBO_GRAMS.captures(&text) {
        let count: f64 = caps[1].parse().ok()?;
        let grams_each: f64 = caps[2].parse().ok()?;
        count * grams_each / GRAMS_PER_TROY_OUNCE
    } else if let Some(caps) = FRACTION_OZ.captures(&text) {
        let numerator: f64 = caps[1].parse().ok()?;
        let denominator: f64 = caps[2].parse().ok()?;
        if denominator == 0.0 {
            return None;
        }
        numerator / denominator
    } else if let Some(caps) = OUNCES.captures(&text) {
        caps[1].parse().ok()?
    } else if let Some(caps) = KILOGRAMS.captures(&text) {
        let kg: f64 = caps[1].parse().ok()?;
        kg * 1000.0 / GRAMS_PER_TROY_OUNCE
    } else if let Some(caps) = GRAMS.captures(&text) {
        let grams: f64 = caps[1].parse().ok()?;
        grams / GRAMS_PER_TROY_OUNCE
    } else {
        return None;
    };

    (weight.is_finite() && weight > 0.0).then_some(weight)
}

pub fn detect_form(name: &str) -> ProductForm {
    if COIN_WORDS.is_match(name) {
        ProductForm::Coin
    } else if BAR_WORDS.is_match(name) {
        ProductForm::Bar
    } else {
        ProductForm::Other
    }
}

pub fn is_excluded(name: &str) -> bool {
    name.to_lowercase().contains(EXCLUDED_PHRASE)
}

pub fn extract_series_key(name: &str) -> Option<&'static str> {
    let lowered = name.to_lowercase();
    SERIES_KEYWORDS
        .iter()
        .chain(PROCESS_KEYWORDS.iter())
        .find(|key| lowered.contains(*key))
        .copied()
}

pub fn parse_price(raw: &RawPrice) -> Option<f64> {
    let price = match raw {
        RawPrice::Amount(value) => *value,
        RawPrice::Text(text) => text.trim().replace(',', "").parse().ok()?,
        RawPrice::Missing => return None,
    };
    (price.is_finite() && price >= 0.0).then_some(price)
}

/// Resolve a listing link against the seller's base URL. A missing link
/// points at the seller itself. Relative links are appended to the base path
/// as-is, so a base such as `https://x/shop` keeps its last segment.
pub fn to_absolute_url(base_url: &str, href: Option<&str>) -> String {
    let href = match href.map(str::trim) {
        Some(href) if !href.is_empty() => href,
        _ => return base_url.to_string(),
    };
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }

    let base = base_url.trim_end_matches('/');
    if href.starts_with('/') {
        format!("{}{}", base, href)
    } else {
        format!("{}/{}", base, href)
    }
}

/// Validate and classify one candidate, reporting the first failed check.
pub fn classify(
    raw_name: &str,
    raw_price: &RawPrice,
    raw_url: Option<&str>,
    base_url: &str,
) -> Result<RawListing, RejectReason> {
    let name = clean_text(raw_name);
    if name.is_empty() {
        return Err(RejectReason::EmptyName);
    }
    if is_excluded(&name) {
        return Err(RejectReason::PoolAllocated);
    }

    let form = detect_form(&name);
    if form == ProductForm::Other {
        return Err(RejectReason::NotCoinOrBar);
    }

    let metal = parse_metal(&name).ok_or(RejectReason::NoMetal)?;
    let weight_oz = parse_weight_oz(&name).ok_or(RejectReason::NoWeight)?;
    let price_local = parse_price(raw_price).ok_or(RejectReason::InvalidPrice)?;

    Ok(RawListing {
        series_key: extract_series_key(&name).map(str::to_string),
        product_name: name,
        metal,
        weight_oz,
        price_local,
        url: to_absolute_url(base_url, raw_url),
        seller_name: String::new(),
        form,
    })
}

/// [`classify`], dropping rejected listings. The seller is attached by the caller.
pub fn normalize(
    raw_name: &str,
    raw_price: &RawPrice,
    raw_url: Option<&str>,
    base_url: &str,
) -> Option<RawListing> {
    match classify(raw_name, raw_price, raw_url, base_url) {
        Ok(listing) => {
            LISTINGS_ACCEPTED.inc();
            Some(listing)
        }
        Err(reason) => {
            LISTINGS_REJECTED.with_label_values(&[reason.label()]).inc();
            trace!(name = raw_name, %reason, "Listing rejected");
            None
        }
    }
}
