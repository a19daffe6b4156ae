use chrono::NaiveDateTime;

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single OHLCV candle.
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    /// Start of the bucket, UTC.
    pub bucket_start: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Closing prices for one ticker, oldest first.
///
/// Built once from fetched candles and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    ticker: String,
    closes: Vec<f64>,
}

impl PriceSeries {
    pub fn new(ticker: impl Into<String>, closes: Vec<f64>) -> Self {
        Self {
            ticker: ticker.into(),
            closes,
        }
    }

    /// Keep only the close of each candle. `candles` must already be in
    /// ascending chronological order.
    pub fn from_candles(ticker: impl Into<String>, candles: &[Candle]) -> Self {
        Self::new(ticker, candles.iter().map(|c| c.close).collect())
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn closes(&self) -> &[f64] {
        &self.closes
    }

    /// Most recent close.
    pub fn last(&self) -> Option<f64> {
        self.closes.last().copied()
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }
}
