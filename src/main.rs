// =============================================================================
// KRW Dip Screener — Main Entry Point
// =============================================================================
//
// One pass over the Upbit ticker universe: fetch recent closes, apply the
// threshold-band + RSI rule, print `Buy <ticker> at <price>` for every hit.
// Logs go to stderr so stdout carries only the report.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod error;
mod indicators;
mod market_data;
mod reporter;
mod runtime_config;
mod screener;
mod types;
mod upbit;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::market_data::{PriceCache, PriceSeriesFetcher};
use crate::runtime_config::ScreenerConfig;
use crate::screener::Screener;
use crate::upbit::UpbitClient;

/// Config file read when `SCREENER_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "screener_config.json";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path =
        std::env::var("SCREENER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());

    let mut config = ScreenerConfig::load_or_default(&config_path)?;
    config.apply_env(|k| std::env::var(k).ok())?;
    config.validate()?;

    info!(
        quote_currency = %config.quote_currency,
        interval = %config.interval,
        price_count = config.price_count,
        rsi_window = config.rsi_window,
        std_dev_multiplier = config.std_dev_multiplier,
        rsi_threshold = config.rsi_threshold,
        "Screener starting"
    );

    // ── 2. Venue client + cached fetcher ─────────────────────────────────
    let client = UpbitClient::new(config.api_base_url.clone())?;
    let cache = PriceCache::new(config.cache_ttl(), config.cache_max_entries);
    let fetcher = PriceSeriesFetcher::new(client, cache);
    let screener = Screener::new(fetcher, config.screen_params());

    // ── 3. Scan ──────────────────────────────────────────────────────────
    let tickers = screener
        .resolve_universe(&config.quote_currency, &config.tickers)
        .await?;
    let report = screener.run(&tickers).await;

    // ── 4. Report ────────────────────────────────────────────────────────
    reporter::print_report(&report.recommendations)?;

    Ok(())
}
