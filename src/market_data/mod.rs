pub mod candle;
pub mod fetcher;
pub mod price_cache;

#[cfg(test)]
pub mod testing;

// Re-export the core types for convenient access (e.g. `use crate::market_data::PriceSeries`).
pub use candle::{Candle, PriceSeries};
pub use fetcher::{MarketDataSource, PriceSeriesFetcher};
pub use price_cache::{Clock, PriceCache};
