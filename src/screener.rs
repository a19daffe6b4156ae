// =============================================================================
// Screener — threshold band + RSI joint buy signal
// =============================================================================
//
// For every ticker in the universe, sequentially:
//   1. Fetch `price_count` closes (cached).  A failed fetch skips the ticker.
//   2. current price   = last close
//   3. threshold price = mean - σ * std_dev_multiplier  (whole window, σ with N-1)
//   4. current RSI     = last value of RSI(closes, rsi_window)
//   5. Qualify iff price < threshold AND RSI is defined AND RSI < rsi_threshold
//
// Recommendations keep the order in which tickers were iterated.
// =============================================================================

use std::collections::HashSet;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::indicators::band::ThresholdBand;
use crate::indicators::rsi::current_rsi;
use crate::market_data::{Clock, MarketDataSource, PriceSeries, PriceSeriesFetcher};
use crate::types::{CandleInterval, Recommendation};

// =============================================================================
// Parameters
// =============================================================================

/// Tunables of the screening rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenParams {
    pub interval: CandleInterval,
    pub price_count: u32,
    pub rsi_window: usize,
    pub std_dev_multiplier: f64,
    pub rsi_threshold: f64,
}

impl Default for ScreenParams {
    fn default() -> Self {
        Self {
            interval: CandleInterval::Day,
            price_count: 40,
            rsi_window: 5,
            std_dev_multiplier: 0.4,
            rsi_threshold: 30.0,
        }
    }
}

// =============================================================================
// Per-ticker evaluation record
// =============================================================================

/// Outcome of screening one ticker.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Both conditions held.
    Qualified,
    /// Data was fine but the rule did not fire.
    Rejected(String),
    /// The ticker could not be evaluated.
    Skipped(String),
}

/// Everything the screener knew about a ticker when it decided.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub ticker: String,
    pub current_price: Option<f64>,
    pub band: Option<ThresholdBand>,
    pub rsi: Option<f64>,
    /// OVERSOLD / NEUTRAL / OVERBOUGHT label of `rsi`.
    pub rsi_zone: Option<&'static str>,
    pub verdict: Verdict,
}

impl Evaluation {
    fn skipped(ticker: &str, reason: impl Into<String>) -> Self {
        Self {
            ticker: ticker.to_string(),
            current_price: None,
            band: None,
            rsi: None,
            rsi_zone: None,
            verdict: Verdict::Skipped(reason.into()),
        }
    }

    pub fn is_qualified(&self) -> bool {
        self.verdict == Verdict::Qualified
    }

    /// The recommendation this evaluation yields, if it qualified.
    pub fn recommendation(&self) -> Option<Recommendation> {
        if !self.is_qualified() {
            return None;
        }
        self.current_price.map(|price| Recommendation {
            ticker: self.ticker.clone(),
            current_price: price,
        })
    }
}

/// Apply the buy rule to one already-fetched series.
pub fn evaluate_series(series: &PriceSeries, params: &ScreenParams) -> Evaluation {
    let ticker = series.ticker();

    let Some(current_price) = series.last() else {
        return Evaluation::skipped(ticker, "no closes");
    };

    let Some(band) = ThresholdBand::from_closes(series.closes(), params.std_dev_multiplier) else {
        return Evaluation::skipped(
            ticker,
            format!("insufficient data for band: {} closes", series.len()),
        );
    };

    let (rsi, rsi_zone) = match current_rsi(series.closes(), params.rsi_window) {
        Some((value, zone)) => (Some(value), Some(zone)),
        None => (None, None),
    };

    let below_band = band.is_below(current_price);
    let oversold = rsi.is_some_and(|r| r < params.rsi_threshold);

    let verdict = match (below_band, rsi) {
        (true, Some(_)) if oversold => Verdict::Qualified,
        (false, _) => Verdict::Rejected(format!(
            "price {current_price} not below threshold {:.4}",
            band.threshold_price
        )),
        (true, None) => Verdict::Rejected("RSI undefined (no movement in window)".to_string()),
        (true, Some(r)) => Verdict::Rejected(format!(
            "RSI {r:.2} not below {}",
            params.rsi_threshold
        )),
    };

    Evaluation {
        ticker: ticker.to_string(),
        current_price: Some(current_price),
        band: Some(band),
        rsi,
        rsi_zone,
        verdict,
    }
}

// =============================================================================
// Screening pass
// =============================================================================

/// Result of a full pass over the universe.
#[derive(Debug, Clone, Default)]
pub struct ScreenReport {
    pub recommendations: Vec<Recommendation>,
    pub evaluations: Vec<Evaluation>,
}

impl ScreenReport {
    pub fn skipped(&self) -> usize {
        self.evaluations
            .iter()
            .filter(|e| matches!(e.verdict, Verdict::Skipped(_)))
            .count()
    }
}

pub struct Screener<S, C: Clock> {
    fetcher: PriceSeriesFetcher<S, C>,
    params: ScreenParams,
}

impl<S: MarketDataSource, C: Clock> Screener<S, C> {
    pub fn new(fetcher: PriceSeriesFetcher<S, C>, params: ScreenParams) -> Self {
        Self { fetcher, params }
    }

    /// Tickers to scan: `explicit` when given, otherwise the venue's markets
    /// quoted in `quote_currency`.  Duplicates are dropped, order is kept.
    pub async fn resolve_universe(
        &self,
        quote_currency: &str,
        explicit: &[String],
    ) -> Result<Vec<String>> {
        let raw = if explicit.is_empty() {
            self.fetcher
                .source()
                .list_tickers(quote_currency)
                .await
                .with_context(|| format!("failed to list {quote_currency} tickers"))?
        } else {
            explicit.to_vec()
        };

        let mut seen = HashSet::new();
        let tickers: Vec<String> = raw.into_iter().filter(|t| seen.insert(t.clone())).collect();

        info!(quote_currency, count = tickers.len(), "ticker universe resolved");
        Ok(tickers)
    }

    /// Screen every ticker in order.  Fetch failures are logged and the
    /// ticker is skipped; the pass always runs to the end.
    pub async fn run(&self, tickers: &[String]) -> ScreenReport {
        let mut report = ScreenReport::default();

        for ticker in tickers {
            let evaluation = match self
                .fetcher
                .get_price(ticker, self.params.interval, self.params.price_count)
                .await
            {
                Ok(series) => evaluate_series(&series, &self.params),
                Err(e) => {
                    warn!(ticker = %ticker, error = %e, "error fetching price, skipping");
                    Evaluation::skipped(ticker, e.to_string())
                }
            };

            debug!(
                ticker = %evaluation.ticker,
                price = ?evaluation.current_price,
                threshold = ?evaluation.band.map(|b| b.threshold_price),
                rsi = ?evaluation.rsi,
                zone = evaluation.rsi_zone.unwrap_or("-"),
                verdict = ?evaluation.verdict,
                "ticker evaluated"
            );

            if let Some(rec) = evaluation.recommendation() {
                info!(ticker = %rec.ticker, price = rec.current_price, "buy signal");
                report.recommendations.push(rec);
            }
            report.evaluations.push(evaluation);
        }

        info!(
            scanned = report.evaluations.len(),
            qualified = report.recommendations.len(),
            skipped = report.skipped(),
            "screening pass complete"
        );

        report
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::market_data::price_cache::{ManualClock, PriceCache};
    use crate::market_data::testing::ScriptedSource;
    use std::time::Duration;

    /// 35 closes alternating 101 / 99, ending on 101.
    fn calm_base() -> Vec<f64> {
        (0..35)
            .map(|i| if i % 2 == 0 { 101.0 } else { 99.0 })
            .collect()
    }

    /// Calm base followed by a five-day slide to 75.
    fn sharp_drop() -> Vec<f64> {
        let mut closes = calm_base();
        closes.extend([95.0, 90.0, 85.0, 80.0, 75.0]);
        closes
    }

    /// Wide 110 / 90 swings, then a gentle five-day slide to 99, only about
    /// 0.13σ under the mean.
    fn shallow_drop() -> Vec<f64> {
        let mut closes: Vec<f64> = (0..35)
            .map(|i| if i % 2 == 0 { 110.0 } else { 90.0 })
            .collect();
        closes.extend([100.8, 100.6, 100.4, 100.2, 99.0]);
        closes
    }

    /// Slide far below the band, then a strong final bounce lifting RSI.
    fn drop_then_bounce() -> Vec<f64> {
        let mut closes = calm_base();
        closes.extend([80.0, 70.0, 60.0, 50.0, 90.0]);
        closes
    }

    fn screener(source: ScriptedSource) -> Screener<ScriptedSource, ManualClock> {
        let cache = PriceCache::with_clock(Duration::from_secs(300), 100, ManualClock::new());
        Screener::new(PriceSeriesFetcher::new(source, cache), ScreenParams::default())
    }

    // ---- evaluate_series --------------------------------------------------

    #[test]
    fn sharp_drop_qualifies_at_last_price() {
        let series = PriceSeries::new("KRW-AAA", sharp_drop());
        let eval = evaluate_series(&series, &ScreenParams::default());

        assert_eq!(eval.verdict, Verdict::Qualified);
        let band = eval.band.unwrap();
        assert!(75.0 < band.threshold_price);
        assert!(eval.rsi.unwrap() < 30.0);
        assert_eq!(
            eval.recommendation(),
            Some(Recommendation {
                ticker: "KRW-AAA".into(),
                current_price: 75.0
            })
        );
    }

    #[test]
    fn shallow_drop_excluded_despite_low_rsi() {
        let series = PriceSeries::new("KRW-BBB", shallow_drop());
        let eval = evaluate_series(&series, &ScreenParams::default());

        let band = eval.band.unwrap();
        let rsi = eval.rsi.unwrap();
        assert!(rsi < 30.0, "RSI should be oversold, got {rsi}");
        assert!(99.0 < band.moving_average);
        assert!(99.0 > band.threshold_price);
        assert!(matches!(eval.verdict, Verdict::Rejected(_)));
        assert!(eval.recommendation().is_none());
    }

    #[test]
    fn below_band_but_rsi_recovered_is_excluded() {
        let series = PriceSeries::new("KRW-CCC", drop_then_bounce());
        let eval = evaluate_series(&series, &ScreenParams::default());

        assert!(eval.band.unwrap().is_below(90.0));
        assert!(eval.rsi.unwrap() >= 30.0);
        assert!(matches!(eval.verdict, Verdict::Rejected(_)));
    }

    #[test]
    fn constant_series_never_qualifies() {
        let series = PriceSeries::new("KRW-FLAT", vec![500.0; 40]);
        let eval = evaluate_series(&series, &ScreenParams::default());

        let band = eval.band.unwrap();
        assert_eq!(band.standard_deviation, 0.0);
        assert_eq!(band.threshold_price, band.moving_average);
        assert!(eval.rsi.is_none());
        assert!(!eval.is_qualified());
    }

    #[test]
    fn undefined_rsi_blocks_even_when_deeply_below_band() {
        // A crash followed by a flat stretch longer than the RSI window.
        let mut closes = vec![100.0; 30];
        closes.extend([50.0; 10]);
        let series = PriceSeries::new("KRW-DEAD", closes);
        let eval = evaluate_series(&series, &ScreenParams::default());

        assert!(eval.band.unwrap().is_below(50.0));
        assert!(eval.rsi.is_none());
        assert_eq!(
            eval.verdict,
            Verdict::Rejected("RSI undefined (no movement in window)".into())
        );
    }

    #[test]
    fn single_close_is_skipped() {
        let series = PriceSeries::new("KRW-ONE", vec![10.0]);
        let eval = evaluate_series(&series, &ScreenParams::default());
        assert!(matches!(eval.verdict, Verdict::Skipped(_)));
        assert!(eval.recommendation().is_none());
    }

    // ---- Screener::run ----------------------------------------------------

    #[tokio::test]
    async fn run_recommends_in_iteration_order() {
        let source = ScriptedSource::new()
            .with_closes("KRW-ZZZ", &sharp_drop())
            .with_closes("KRW-BBB", &shallow_drop())
            .with_closes("KRW-AAA", &sharp_drop());
        let s = screener(source);

        let tickers = s.resolve_universe("KRW", &[]).await.unwrap();
        let report = s.run(&tickers).await;

        let names: Vec<&str> = report
            .recommendations
            .iter()
            .map(|r| r.ticker.as_str())
            .collect();
        assert_eq!(names, vec!["KRW-ZZZ", "KRW-AAA"]);
        assert!(report.recommendations.iter().all(|r| r.current_price == 75.0));
        assert_eq!(report.evaluations.len(), 3);
    }

    #[tokio::test]
    async fn failed_fetch_is_skipped_and_scan_continues() {
        let source = ScriptedSource::new()
            .with_failure("KRW-ERR", FetchError::Transport("connection reset".into()))
            .with_closes("KRW-AAA", &sharp_drop());
        let s = screener(source);

        let tickers = s.resolve_universe("KRW", &[]).await.unwrap();
        let report = s.run(&tickers).await;

        assert_eq!(report.recommendations.len(), 1);
        assert_eq!(report.recommendations[0].ticker, "KRW-AAA");
        assert_eq!(report.skipped(), 1);
        assert!(matches!(
            report.evaluations[0].verdict,
            Verdict::Skipped(ref reason) if reason.contains("connection reset")
        ));
    }

    #[tokio::test]
    async fn empty_history_is_skipped() {
        let source = ScriptedSource::new()
            .with_closes("KRW-NEW", &[])
            .with_closes("KRW-AAA", &sharp_drop());
        let s = screener(source);

        let report = s.run(&["KRW-NEW".to_string(), "KRW-AAA".to_string()]).await;
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.recommendations.len(), 1);
    }

    #[tokio::test]
    async fn fetch_uses_configured_count() {
        // 60 closes available, only the latest 40 are screened.
        let mut closes = vec![1000.0; 20];
        closes.extend(sharp_drop());
        let source = ScriptedSource::new().with_closes("KRW-AAA", &closes);
        let s = screener(source);

        let report = s.run(&["KRW-AAA".to_string()]).await;
        assert_eq!(report.recommendations.len(), 1);
        let band = report.evaluations[0].band.unwrap();
        assert!(band.moving_average < 100.0);
    }

    #[tokio::test]
    async fn universe_is_filtered_and_deduplicated() {
        let source = ScriptedSource::new()
            .with_closes("KRW-AAA", &sharp_drop())
            .with_closes("BTC-AAA", &sharp_drop())
            .with_closes("KRW-AAA", &sharp_drop());
        let s = screener(source);

        let tickers = s.resolve_universe("KRW", &[]).await.unwrap();
        assert_eq!(tickers, vec!["KRW-AAA"]);
    }

    #[tokio::test]
    async fn explicit_tickers_bypass_venue_listing() {
        let source = ScriptedSource::new()
            .with_universe_error(FetchError::RateLimited)
            .with_closes("KRW-AAA", &sharp_drop());
        let s = screener(source);

        let explicit = vec!["KRW-AAA".to_string(), "KRW-AAA".to_string()];
        let tickers = s.resolve_universe("KRW", &explicit).await.unwrap();
        assert_eq!(tickers, vec!["KRW-AAA"]);
    }

    #[tokio::test]
    async fn universe_failure_is_fatal() {
        let source = ScriptedSource::new().with_universe_error(FetchError::Status {
            status: 503,
            body: "maintenance".into(),
        });
        let s = screener(source);
        assert!(s.resolve_universe("KRW", &[]).await.is_err());
    }
}
