// In-memory market data source for tests.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use parking_lot::Mutex;

use super::{Candle, MarketDataSource};
use crate::error::FetchError;
use crate::types::CandleInterval;

enum Script {
    Closes(Vec<f64>),
    Fail(FetchError),
}

/// Replays canned closes or failures per ticker and counts candle requests.
#[derive(Default)]
pub struct ScriptedSource {
    universe: Vec<String>,
    universe_error: Option<FetchError>,
    scripts: HashMap<String, Script>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `ticker` to the universe with the given daily closes.
    pub fn with_closes(mut self, ticker: &str, closes: &[f64]) -> Self {
        self.universe.push(ticker.to_string());
        self.scripts
            .insert(ticker.to_string(), Script::Closes(closes.to_vec()));
        self
    }

    /// Add `ticker` to the universe; every candle request for it fails.
    pub fn with_failure(mut self, ticker: &str, err: FetchError) -> Self {
        self.universe.push(ticker.to_string());
        self.scripts.insert(ticker.to_string(), Script::Fail(err));
        self
    }

    /// Make the universe listing itself fail.
    pub fn with_universe_error(mut self, err: FetchError) -> Self {
        self.universe_error = Some(err);
        self
    }

    pub fn calls(&self, ticker: &str) -> usize {
        self.calls.lock().get(ticker).copied().unwrap_or(0)
    }
}

impl MarketDataSource for ScriptedSource {
    async fn list_tickers(&self, quote_currency: &str) -> Result<Vec<String>, FetchError> {
        if let Some(err) = &self.universe_error {
            return Err(err.clone());
        }
        let prefix = format!("{quote_currency}-");
        Ok(self
            .universe
            .iter()
            .filter(|t| t.starts_with(&prefix))
            .cloned()
            .collect())
    }

    async fn fetch_candles(
        &self,
        ticker: &str,
        _interval: CandleInterval,
        count: u32,
    ) -> Result<Vec<Candle>, FetchError> {
        *self.calls.lock().entry(ticker.to_string()).or_insert(0) += 1;

        let closes = match self.scripts.get(ticker) {
            Some(Script::Closes(c)) => c,
            Some(Script::Fail(err)) => return Err(err.clone()),
            None => return Ok(Vec::new()),
        };

        let start = closes.len().saturating_sub(count as usize);
        let base = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| FetchError::Decode("bad base date".into()))?;

        Ok(closes[start..]
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                bucket_start: base + Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1.0,
            })
            .collect())
    }
}
