use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::debug;
use crate::error::{Error, Result};
use crate::listings::comparison::dedupe;
use crate::listings::html::{clean_text, strip_scripts_and_styles};
use crate::listings::normalizer::{normalize, RawPrice};
use crate::types::listing::RawListing;

lazy_static! {
    static ref HEADING: Regex = Regex::new(r"(?is)<h[23](?:\s[^>]*)?>(.*?)</h[23]\s*>").expect("valid heading pattern");
    static ref HREF: Regex = Regex::new(r#"(?i)href\s*=\s*["']([^"']+)["']"#).expect("valid href pattern");
    static ref PRICE: Regex = Regex::new(r"\$\s*([0-9][0-9,]*(?:\.[0-9]+)?)").expect("valid price pattern");
    static ref LD_JSON: Regex = Regex::new(
        r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script\s*>"#
    ).expect("valid ld+json pattern");
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    HeadingBlock,
    StructuredData,
}

/// An unvalidated product found on a page. `name` is the source text as
/// found; markup and entities are cleaned once, during normalization.
#[derive(Clone, Debug, PartialEq)]
pub struct ListingCandidate {
    pub name: String,
    pub price: RawPrice,
    pub href: Option<String>,
    pub strategy: Strategy,
}

/// Candidates from both strategies, heading blocks first.
pub fn extract_candidates(html: &str) -> Vec<ListingCandidate> {
    let mut candidates = extract_from_headings(html);
    candidates.extend(extract_from_structured_data(html));
    candidates
}

/// Normalized, page-level deduplicated listings. Seller name is left empty.
pub fn extract(html: &str, base_url: &str) -> Vec<RawListing> {
    let candidates = extract_candidates(html);
    let from_headings = candidates
        .iter()
        .filter(|candidate| candidate.strategy == Strategy::HeadingBlock)
        .count();
    debug!(
        headings = from_headings,
        structured = candidates.len() - from_headings,
        "Candidates extracted"
    );

    let listings = candidates
        .into_iter()
        .filter_map(|candidate| {
            normalize(&candidate.name, &candidate.price, candidate.href.as_deref(), base_url)
        })
        .collect();
    dedupe(listings)
}

/// Treat every `<h2>`/`<h3>` as a product tile title. The tile body runs to
/// the next heading and must contain a `$` amount.
pub fn extract_from_headings(html: &str) -> Vec<ListingCandidate> {
    let sanitized = strip_scripts_and_styles(html);
    let headings: Vec<_> = HEADING.captures_iter(&sanitized).collect();
    let mut candidates = Vec::new();

    for (i, caps) in headings.iter().enumerate() {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };

        if clean_text(inner.as_str()).is_empty() {
            continue;
        }

        let block_end = headings
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(sanitized.len(), |next| next.start());
        let block = &sanitized[whole.end()..block_end];

        let Some(price) = PRICE.captures(block).and_then(|p| p.get(1)) else {
            continue;
        };

        let href = HREF
            .captures(whole.as_str())
            .and_then(|h| h.get(1))
            .map(|h| h.as_str().to_string());

        candidates.push(ListingCandidate {
            name: inner.as_str().to_string(),
            price: RawPrice::Text(price.as_str().to_string()),
            href,
            strategy: Strategy::HeadingBlock,
        });
    }

    candidates
}

/// Read schema.org `Product` entries out of `application/ld+json` blocks.
/// Blocks that fail to parse are skipped.
pub fn extract_from_structured_data(html: &str) -> Vec<ListingCandidate> {
    let mut candidates = Vec::new();

    for caps in LD_JSON.captures_iter(html) {
        let Some(body) = caps.get(1) else {
            continue;
        };

        let payload = match parse_structured_block(body.as_str()) {
            Ok(payload) => payload,
            Err(e) => {
                debug!(error = %e, "Skipping structured data block");
                continue;
            }
        };

        candidates.extend(
            product_nodes(&payload)
                .into_iter()
                .filter_map(candidate_from_product),
        );
    }

    candidates
}

/// Parse the body of one `application/ld+json` script.
pub fn parse_structured_block(body: &str) -> Result<Value> {
    serde_json::from_str(body.trim()).map_err(|e| Error::MalformedStructuredData(e.to_string()))
}

fn product_nodes(payload: &Value) -> Vec<&Value> {
    let entries: Vec<&Value> = match payload {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    entries
        .into_iter()
        .flat_map(|entry| match entry.get("@graph") {
            Some(Value::Array(graph)) => graph.iter().collect(),
            _ => vec![entry],
        })
        .filter(|node| is_product(node))
        .collect()
}

fn is_product(node: &Value) -> bool {
    match node.get("@type") {
        Some(Value::String(kind)) => kind == "Product",
        Some(Value::Array(kinds)) => kinds.iter().any(|kind| kind.as_str() == Some("Product")),
        _ => false,
    }
}

fn first_of(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.first(),
        Value::Null => None,
        other => Some(other),
    }
}

fn raw_price(value: Option<&Value>) -> RawPrice {
    match value {
        Some(Value::Number(n)) => n.as_f64().map_or(RawPrice::Missing, RawPrice::Amount),
        Some(Value::String(s)) => RawPrice::Text(s.clone()),
        _ => RawPrice::Missing,
    }
}

fn candidate_from_product(node: &Value) -> Option<ListingCandidate> {
    let name = node.get("name")?.as_str()?.to_string();

    let offer = node.get("offers").and_then(first_of);
    let price = offer
        .and_then(|offer| offer.get("price").filter(|p| !p.is_null()))
        .or_else(|| {
            offer
                .and_then(|offer| offer.get("priceSpecification"))
                .and_then(first_of)
                .and_then(|spec| spec.get("price"))
        });

    Some(ListingCandidate {
        name,
        price: raw_price(price),
        href: node.get("url").and_then(Value::as_str).map(str::to_string),
        strategy: Strategy::StructuredData,
    })
}
