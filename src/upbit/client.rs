// =============================================================================
// Upbit Quotation REST Client — public market data, no signing required
// =============================================================================
//
// Endpoints used:
//   GET /v1/market/all?isDetails=false          — ticker universe
//   GET /v1/candles/{unit}?market=&count=&to=   — OHLCV history
//
// Candle endpoints return at most 200 rows per call, newest first.  Longer
// histories are assembled by paging backwards with `to` set to the oldest
// bucket already received.
// =============================================================================

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::rate_limit::RateLimitTracker;
use crate::error::FetchError;
use crate::market_data::{Candle, MarketDataSource};
use crate::types::CandleInterval;

/// Public Upbit API host.
pub const DEFAULT_BASE_URL: &str = "https://api.upbit.com";

/// Largest `count` a single candle request may ask for.
const MAX_CANDLES_PER_REQUEST: u32 = 200;

/// Format the `to` query parameter expects.
const TO_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format of `candle_date_time_utc` in responses.
const BUCKET_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct MarketEntry {
    market: String,
}

#[derive(Debug, Deserialize)]
struct CandleEntry {
    candle_date_time_utc: String,
    opening_price: f64,
    high_price: f64,
    low_price: f64,
    trade_price: f64,
    candle_acc_trade_volume: f64,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Upbit quotation API client.
pub struct UpbitClient {
    base_url: String,
    client: reqwest::Client,
    rate_limit: RateLimitTracker,
}

impl UpbitClient {
    /// Create a client against `base_url` (normally [`DEFAULT_BASE_URL`]).
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build reqwest client")?;

        debug!(base_url = %base_url, "UpbitClient initialised");

        Ok(Self {
            base_url,
            client,
            rate_limit: RateLimitTracker::new(),
        })
    }

    /// GET `path` with `query`, honouring the rate limit, returning the body.
    async fn get_text(&self, path: &str, query: &[(&str, String)]) -> Result<String, FetchError> {
        self.rate_limit.wait_if_exhausted().await;

        let url = format!("{}{}", self.base_url, path);
        let resp = self.client.get(&url).query(query).send().await?;

        self.rate_limit.update_from_headers(resp.headers());

        let status = resp.status();
        let body = resp.text().await?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!(path, "Upbit returned 429");
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }

    /// GET /v1/market/all — every market whose code starts with `<quote>-`.
    #[instrument(skip(self), name = "upbit::get_tickers")]
    pub async fn get_tickers(&self, quote_currency: &str) -> Result<Vec<String>, FetchError> {
        let body = self
            .get_text("/v1/market/all", &[("isDetails", "false".to_string())])
            .await?;
        let tickers = parse_markets(&body, quote_currency)?;
        debug!(quote_currency, count = tickers.len(), "tickers fetched");
        Ok(tickers)
    }

    /// GET /v1/candles/{unit} — the latest `count` candles, oldest first.
    #[instrument(skip(self), name = "upbit::get_candles")]
    pub async fn get_candles(
        &self,
        ticker: &str,
        interval: CandleInterval,
        count: u32,
    ) -> Result<Vec<Candle>, FetchError> {
        let path = format!("/v1/candles/{}", interval.endpoint_path());
        let path = path.as_str();

        let candles = collect_pages(count, |want, to| async move {
            let mut query = vec![("market", ticker.to_string()), ("count", want.to_string())];
            if let Some(t) = to {
                query.push(("to", t.format(TO_FORMAT).to_string()));
            }
            let body = self.get_text(path, &query).await?;
            parse_candles(&body)
        })
        .await?;

        debug!(ticker, %interval, count = candles.len(), "candles fetched");
        Ok(candles)
    }
}

/// Page backwards from the newest candle until `count` distinct buckets are
/// held, returning them oldest first.
///
/// `fetch_page(want, to)` must return at most `want` rows strictly older than
/// `to` (all rows when `to` is `None`), newest first.  Paging stops on a
/// short page or a page that adds no new bucket.
async fn collect_pages<F, Fut>(count: u32, mut fetch_page: F) -> Result<Vec<Candle>, FetchError>
where
    F: FnMut(u32, Option<NaiveDateTime>) -> Fut,
    Fut: Future<Output = Result<Vec<Candle>, FetchError>>,
{
    let mut collected: Vec<Candle> = Vec::with_capacity(count as usize);
    let mut to: Option<NaiveDateTime> = None;

    while (collected.len() as u32) < count {
        let want = (count - collected.len() as u32).min(MAX_CANDLES_PER_REQUEST);

        let page = fetch_page(want, to).await?;
        let received = page.len() as u32;
        let before = collected.len();

        collected.extend(page);
        collected = into_ascending(collected, usize::MAX);

        // Ascending, so the first row is the oldest bucket held.
        to = collected.first().map(|c| c.bucket_start);

        if received < want || collected.len() == before {
            break;
        }
    }

    Ok(into_ascending(collected, count as usize))
}

impl MarketDataSource for UpbitClient {
    async fn list_tickers(&self, quote_currency: &str) -> Result<Vec<String>, FetchError> {
        self.get_tickers(quote_currency).await
    }

    async fn fetch_candles(
        &self,
        ticker: &str,
        interval: CandleInterval,
        count: u32,
    ) -> Result<Vec<Candle>, FetchError> {
        self.get_candles(ticker, interval, count).await
    }
}

impl std::fmt::Debug for UpbitClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpbitClient")
            .field("base_url", &self.base_url)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Response decoding
// ---------------------------------------------------------------------------

/// Market codes quoted in `quote_currency`, in response order.
fn parse_markets(body: &str, quote_currency: &str) -> Result<Vec<String>, FetchError> {
    let entries: Vec<MarketEntry> = serde_json::from_str(body)?;
    let prefix = format!("{}-", quote_currency.to_uppercase());
    Ok(entries
        .into_iter()
        .map(|e| e.market)
        .filter(|m| m.starts_with(&prefix))
        .collect())
}

/// Candle rows in response order (newest first).
fn parse_candles(body: &str) -> Result<Vec<Candle>, FetchError> {
    let entries: Vec<CandleEntry> = serde_json::from_str(body)?;
    entries
        .into_iter()
        .map(|e| {
            let bucket_start = NaiveDateTime::parse_from_str(&e.candle_date_time_utc, BUCKET_FORMAT)
                .map_err(|err| {
                    FetchError::Decode(format!(
                        "bad candle_date_time_utc '{}': {err}",
                        e.candle_date_time_utc
                    ))
                })?;
            Ok(Candle {
                bucket_start,
                open: e.opening_price,
                high: e.high_price,
                low: e.low_price,
                close: e.trade_price,
                volume: e.candle_acc_trade_volume,
            })
        })
        .collect()
}

/// Sort oldest first, drop duplicate buckets from page overlap, keep the
/// latest `count`.
fn into_ascending(mut candles: Vec<Candle>, count: usize) -> Vec<Candle> {
    candles.sort_by_key(|c| c.bucket_start);
    candles.dedup_by_key(|c| c.bucket_start);
    let start = candles.len().saturating_sub(count);
    candles.split_off(start)
}
