pub mod comparison;
pub mod extractor;
pub mod fetcher;
pub mod html;
pub mod normalizer;

pub use comparison::{aggregate, ComparisonAggregator, ComparisonKey};
pub use fetcher::{HttpPageFetcher, PageFetcher};
pub use normalizer::{normalize, RawPrice};
