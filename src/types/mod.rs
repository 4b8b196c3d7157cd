pub mod listing;
pub mod metal;
pub mod snapshot;
pub mod timestamp;

pub use listing::{Offer, ProductComparison, RawListing};
pub use metal::{Currency, Metal, ProductForm};
pub use snapshot::{CurrencyRates, FxSnapshot, MetalPriceSnapshot, TickerQuote};
pub use timestamp::Timestamp;
