use tracing::{debug, instrument};

use super::price_cache::{Clock, PriceCache, PriceKey, SystemClock};
use super::{Candle, PriceSeries};
use crate::error::FetchError;
use crate::types::CandleInterval;

/// Venue operations the screener depends on.
pub trait MarketDataSource {
    /// Tradable tickers quoted in `quote_currency`, in venue order.
    async fn list_tickers(&self, quote_currency: &str) -> Result<Vec<String>, FetchError>;

    /// The most recent `count` candles for `ticker`, oldest first.
    async fn fetch_candles(
        &self,
        ticker: &str,
        interval: CandleInterval,
        count: u32,
    ) -> Result<Vec<Candle>, FetchError>;
}

/// Closing-price fetcher memoized per `(ticker, interval, count)`.
pub struct PriceSeriesFetcher<S, C: Clock = SystemClock> {
    source: S,
    cache: PriceCache<C>,
}

impl<S: MarketDataSource, C: Clock> PriceSeriesFetcher<S, C> {
    pub fn new(source: S, cache: PriceCache<C>) -> Self {
        Self { source, cache }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Closing prices for `ticker`, served from the cache while fresh.
    ///
    /// An empty candle list is reported as [`FetchError::Empty`]. Failures
    /// are not cached.
    #[instrument(skip(self), name = "fetcher::get_price")]
    pub async fn get_price(
        &self,
        ticker: &str,
        interval: CandleInterval,
        count: u32,
    ) -> Result<PriceSeries, FetchError> {
        let key = PriceKey::new(ticker, interval, count);
        if let Some(hit) = self.cache.get(&key) {
            debug!(key = %key, "price cache hit");
            return Ok(hit);
        }

        let candles = self.source.fetch_candles(ticker, interval, count).await?;
        let series = PriceSeries::from_candles(ticker, &candles);
        if series.is_empty() {
            return Err(FetchError::Empty(ticker.to_string()));
        }

        self.cache.insert(key, series.clone());
        Ok(series)
    }
}
