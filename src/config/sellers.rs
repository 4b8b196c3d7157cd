use serde::{Deserialize, Serialize};

/// A retailer and the catalog pages scraped for it.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SellerConfig {
    pub name: String,
    pub base_url: String,
    pub urls: Vec<String>,
}

impl SellerConfig {
    pub fn new(name: &str, base_url: &str, paths: &[&str]) -> Self {
        SellerConfig {
            name: name.to_string(),
            base_url: base_url.to_string(),
            urls: paths.iter().map(|path| format!("{}{}", base_url, path)).collect(),
        }
    }
}

const SHOPIFY_COLLECTIONS: [&str; 4] = [
    "/collections/all",
    "/collections/bullion",
    "/collections/coins",
    "/collections/bars",
];

pub fn default_sellers() -> Vec<SellerConfig> {
    vec![
        SellerConfig::new(
            "ABC Bullion",
            "https://www.abcbullion.com.au",
            &[
                "/store/",
                "/store/Bullion-Coins",
                "/store/abc-bullion-platinum",
                "/store/palladium",
            ],
        ),
        SellerConfig::new(
            "Perth Mint",
            "https://www.perthmint.com",
            &["/shop", "/shop/bullion", "/shop/coins", "/shop/bars"],
        ),
        SellerConfig::new("Bullion Money", "https://bullionmoney.com.au", &SHOPIFY_COLLECTIONS),
        SellerConfig::new("Jaggards", "https://jaggards.com.au", &SHOPIFY_COLLECTIONS),
        SellerConfig::new("As Good As Gold", "https://asgoodasgoldaus.com.au", &SHOPIFY_COLLECTIONS),
        SellerConfig::new("KJC Bullion", "https://kjc-gold-silver-bullion.com.au", &SHOPIFY_COLLECTIONS),
        SellerConfig::new("Swan Bullion", "https://swanbullion.com", &SHOPIFY_COLLECTIONS),
        SellerConfig::new("Bulk Bullion", "https://bulkbullion.com.au", &SHOPIFY_COLLECTIONS),
    ]
}
