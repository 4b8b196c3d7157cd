use futures::future::join_all;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Instrument};
use crate::cache::{Clock, TtlCell};
use crate::config::SellerConfig;
use crate::error::{Error, Result};
use crate::listings::extractor::extract;
use crate::listings::fetcher::PageFetcher;
use crate::observability::metrics::{COMPARISON_GROUPS, REFRESH_LATENCY, SELLER_FETCH_FAILURES};
use crate::observability::tracing::trace_seller_fetch;
use crate::types::listing::{ProductComparison, RawListing};
use crate::types::metal::{Metal, ProductForm};
use crate::utils::helper::format_trimmed;

const GENERIC_SERIES: &str = "generic";

/// Identity of one comparable product across sellers.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComparisonKey {
    pub metal: Metal,
    /// Weight in thousandths of a troy ounce.
    pub weight_milli_oz: i64,
    pub form: ProductForm,
    pub series: String,
}

impl ComparisonKey {
    pub fn of(listing: &RawListing) -> Self {
        ComparisonKey {
            metal: listing.metal,
            weight_milli_oz: (listing.weight_oz * 1000.0).round() as i64,
            form: listing.form,
            series: listing
                .series_key
                .clone()
                .unwrap_or_else(|| GENERIC_SERIES.to_string()),
        }
    }
}

/// Collapse listings with the same `(productName, price, url)`, keeping the first.
pub fn dedupe(listings: Vec<RawListing>) -> Vec<RawListing> {
    let mut seen = HashSet::new();
    listings
        .into_iter()
        .filter(|listing| {
            seen.insert((
                listing.product_name.clone(),
                listing.price_local.to_bits(),
                listing.url.clone(),
            ))
        })
        .collect()
}

fn canonical_order(a: &RawListing, b: &RawListing) -> Ordering {
    ComparisonKey::of(a)
        .cmp(&ComparisonKey::of(b))
        .then_with(|| a.seller_name.cmp(&b.seller_name))
        .then_with(|| a.product_name.cmp(&b.product_name))
        .then_with(|| a.price_local.total_cmp(&b.price_local))
        .then_with(|| a.url.cmp(&b.url))
        .then_with(|| a.weight_oz.total_cmp(&b.weight_oz))
}

/// `1 oz`, `0.1 oz`, `32.151 oz`: three decimals from one ounce up, four below.
pub fn format_weight_label(weight_oz: f64) -> String {
    let decimals = if weight_oz >= 1.0 { 3 } else { 4 };
    format!("{} oz", format_trimmed(weight_oz, decimals))
}

pub fn format_series_label(series_key: Option<&str>, form: ProductForm) -> String {
    match series_key {
        Some(key) if key != GENERIC_SERIES => key
            .split(' ')
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" "),
        _ => form.to_string(),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn comparison_label(listing: &RawListing) -> String {
    format!(
        "{} {} {}",
        format_weight_label(listing.weight_oz),
        listing.metal,
        format_series_label(listing.series_key.as_deref(), listing.form)
    )
}

/// Group listings from every seller into cross-seller comparisons.
///
/// Input is put into a canonical order before deduplication and grouping, so
/// the result depends only on the set of listings and not on arrival order.
/// Offers keep that canonical order; price sorting is left to the caller.
pub fn aggregate(mut listings: Vec<RawListing>) -> Vec<ProductComparison> {
    listings.sort_by(canonical_order);

    let mut groups: BTreeMap<ComparisonKey, Vec<RawListing>> = BTreeMap::new();
    for listing in dedupe(listings) {
        groups.entry(ComparisonKey::of(&listing)).or_default().push(listing);
    }

    groups
        .into_values()
        .filter_map(|entries| {
            let first = entries.first()?;
            Some(ProductComparison {
                product_name: comparison_label(first),
                metal: first.metal,
                weight_oz: first.weight_oz,
                offers: entries.iter().map(RawListing::to_offer).collect(),
            })
        })
        .collect()
}

/// Scrapes every configured seller and caches the grouped comparisons.
pub struct ComparisonAggregator {
    sellers: Vec<SellerConfig>,
    fetcher: Arc<dyn PageFetcher>,
    cache: TtlCell<Vec<ProductComparison>>,
}

impl ComparisonAggregator {
    pub fn new(
        sellers: Vec<SellerConfig>,
        fetcher: Arc<dyn PageFetcher>,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        ComparisonAggregator {
            sellers,
            fetcher,
            cache: TtlCell::new(ttl, clock),
        }
    }

    pub async fn get_comparisons(&self) -> Result<Vec<ProductComparison>> {
        self.cache
            .get_or_refresh(|| async { Ok(self.refresh().await) })
            .await
    }

    /// One full scrape. Sellers that fail contribute nothing.
    pub async fn refresh(&self) -> Vec<ProductComparison> {
        let _timer = REFRESH_LATENCY.start_timer();

        let results = join_all(self.sellers.iter().map(|seller| {
            self.fetch_seller_listings(seller)
                .instrument(trace_seller_fetch(&seller.name))
        }))
        .await;

        let mut listings = Vec::new();
        let mut failed = 0;
        for (seller, result) in self.sellers.iter().zip(results) {
            match result {
                Ok(seller_listings) => listings.extend(seller_listings),
                Err(e) => {
                    failed += 1;
                    SELLER_FETCH_FAILURES.with_label_values(&[seller.name.as_str()]).inc();
                    warn!(seller = %seller.name, error = %e, "Seller contributed no listings");
                }
            }
        }

        let listing_count = listings.len();
        let comparisons = aggregate(listings);
        COMPARISON_GROUPS.set(comparisons.len() as i64);
        info!(
            sellers = self.sellers.len(),
            failed,
            listings = listing_count,
            groups = comparisons.len(),
            "Comparisons rebuilt"
        );

        comparisons
    }

    /// Fetch all catalog pages of one seller concurrently and extract listings
    /// from those that answered. Fails only when no page could be fetched.
    pub async fn fetch_seller_listings(&self, seller: &SellerConfig) -> Result<Vec<RawListing>> {
        let pages = join_all(seller.urls.iter().map(|url| self.fetcher.fetch_page(url))).await;

        let mut listings = Vec::new();
        let mut fetched = 0;
        let mut last_error = None;

        for (url, page) in seller.urls.iter().zip(pages) {
            match page {
                Ok(html) => {
                    fetched += 1;
                    listings.extend(
                        extract(&html, &seller.base_url)
                            .into_iter()
                            .map(|listing| listing.from_seller(&seller.name)),
                    );
                }
                Err(e) => {
                    warn!(seller = %seller.name, url = %url, error = %e, "Catalog page failed");
                    last_error = Some(e);
                }
            }
        }

        if fetched == 0 {
            return Err(Error::SellerFetchFailed {
                seller: seller.name.clone(),
                reason: last_error.map_or_else(|| "no catalog urls".to_string(), |e| e.to_string()),
            });
        }

        Ok(dedupe(listings))
    }
}
