use serde::{Deserialize, Serialize};
use crate::types::metal::{Metal, ProductForm};

/// One normalized retailer listing, produced per source fetch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawListing {
    pub product_name: String,
    pub metal: Metal,
    pub weight_oz: f64,
    pub price_local: f64,
    pub url: String,
    pub seller_name: String,
    pub form: ProductForm,
    pub series_key: Option<String>,
}

impl RawListing {
    pub fn from_seller(mut self, seller_name: &str) -> Self {
        self.seller_name = seller_name.to_string();
        self
    }

    pub fn to_offer(&self) -> Offer {
        Offer {
            seller_name: self.seller_name.clone(),
            price: self.price_local,
            url: self.url.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub seller_name: String,
    pub price: f64,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductComparison {
    pub product_name: String,
    pub metal: Metal,
    pub weight_oz: f64,
    pub offers: Vec<Offer>,
}
