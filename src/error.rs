use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Quote Provider Errors
    #[error("Instrument fetch failed for {instrument}: {reason}")]
    InstrumentFetchFailed {
        instrument: String,
        reason: String,
    },

    #[error("No valid price found for {0}")]
    NoPriceFound(String),

    #[error("All {attempted} instruments failed, last error: {last}")]
    FallbackExhausted {
        attempted: usize,
        last: Box<Error>,
    },

    #[error("Invalid {label} rate: {value}")]
    InvalidRate {
        label: String,
        value: f64,
    },

    // Retailer Errors
    #[error("Seller fetch failed for {seller}: {reason}")]
    SellerFetchFailed {
        seller: String,
        reason: String,
    },

    #[error("Page fetch failed for {url}: {reason}")]
    PageFetchFailed {
        url: String,
        reason: String,
    },

    #[error("Malformed structured data: {0}")]
    MalformedStructuredData(String),

    // System Errors
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the failure came from a single instrument and may be papered over
    /// with a previously cached quote.
    pub fn is_instrument_level(&self) -> bool {
        matches!(
            self,
            Error::InstrumentFetchFailed { .. } | Error::NoPriceFound(_)
        )
    }
}
