pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod listings;
pub mod observability;
pub mod price_infra;
pub mod types;
pub mod utils;
