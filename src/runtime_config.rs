// =============================================================================
// Screener Configuration — JSON file + environment overrides
// =============================================================================
//
// Every tunable of a screening pass lives here.  All fields carry
// `#[serde(default)]` so a partial (or empty) config file is valid, and a
// missing file simply means "run with the defaults".
//
// =============================================================================

use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::screener::ScreenParams;
use crate::types::CandleInterval;
use crate::upbit::DEFAULT_BASE_URL;

/// Upper bound on `price_count` (five pages of venue candles).
const MAX_PRICE_COUNT: u32 = 1000;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_quote_currency() -> String {
    "KRW".to_string()
}

fn default_price_count() -> u32 {
    40
}

fn default_rsi_window() -> usize {
    5
}

fn default_std_dev_multiplier() -> f64 {
    0.4
}

fn default_rsi_threshold() -> f64 {
    30.0
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_cache_max_entries() -> usize {
    100
}

fn default_api_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

// =============================================================================
// ScreenerConfig
// =============================================================================

/// Top-level configuration for one screening run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerConfig {
    // --- Universe -----------------------------------------------------------

    /// Quote currency whose markets form the ticker universe.
    #[serde(default = "default_quote_currency")]
    pub quote_currency: String,

    /// Explicit tickers to screen instead of the venue's full universe.
    /// Empty means "every market quoted in `quote_currency`".
    #[serde(default)]
    pub tickers: Vec<String>,

    // --- Price history ------------------------------------------------------

    /// Candle size of the fetched history.
    #[serde(default)]
    pub interval: CandleInterval,

    /// Number of closes fetched per ticker.
    #[serde(default = "default_price_count")]
    pub price_count: u32,

    // --- Screening rule -----------------------------------------------------

    /// RSI smoothing period.
    #[serde(default = "default_rsi_window")]
    pub rsi_window: usize,

    /// Fraction of σ subtracted from the mean to form the threshold price.
    #[serde(default = "default_std_dev_multiplier")]
    pub std_dev_multiplier: f64,

    /// RSI must be strictly below this to qualify.
    #[serde(default = "default_rsi_threshold")]
    pub rsi_threshold: f64,

    // --- Fetch cache --------------------------------------------------------

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,

    // --- Venue --------------------------------------------------------------

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            quote_currency: default_quote_currency(),
            tickers: Vec::new(),
            interval: CandleInterval::default(),
            price_count: default_price_count(),
            rsi_window: default_rsi_window(),
            std_dev_multiplier: default_std_dev_multiplier(),
            rsi_threshold: default_rsi_threshold(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_max_entries: default_cache_max_entries(),
            api_base_url: default_api_base_url(),
        }
    }
}

impl ScreenerConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// A missing file yields the defaults with a warning. Any other read
    /// failure, and any malformed or mistyped content, is an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "screener config not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to read screener config from {}", path.display())
                })
            }
        };

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse screener config from {}", path.display()))?;

        info!(
            path = %path.display(),
            quote_currency = %config.quote_currency,
            interval = %config.interval,
            price_count = config.price_count,
            "screener config loaded"
        );

        Ok(config)
    }

    /// Apply `SCREENER_*` / `UPBIT_API_URL` overrides from a variable lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(quote) = lookup("SCREENER_QUOTE_CURRENCY") {
            let quote = quote.trim().to_uppercase();
            if !quote.is_empty() {
                self.quote_currency = quote;
            }
        }
        if let Some(list) = lookup("SCREENER_TICKERS") {
            self.tickers = list
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(iv) = lookup("SCREENER_INTERVAL") {
            self.interval = iv
                .parse()
                .context("invalid SCREENER_INTERVAL")?;
        }
        if let Some(url) = lookup("UPBIT_API_URL") {
            if !url.trim().is_empty() {
                self.api_base_url = url.trim().to_string();
            }
        }
        Ok(())
    }

    /// Reject settings that would make the screen meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.quote_currency.trim().is_empty() {
            anyhow::bail!("quote_currency must not be empty");
        }
        if self.price_count < 2 {
            anyhow::bail!("price_count must be at least 2, got {}", self.price_count);
        }
        if self.price_count > MAX_PRICE_COUNT {
            anyhow::bail!(
                "price_count must be at most {MAX_PRICE_COUNT}, got {}",
                self.price_count
            );
        }
        if self.rsi_window == 0 {
            anyhow::bail!("rsi_window must be positive");
        }
        if !self.std_dev_multiplier.is_finite() || self.std_dev_multiplier < 0.0 {
            anyhow::bail!(
                "std_dev_multiplier must be a non-negative number, got {}",
                self.std_dev_multiplier
            );
        }
        if !self.rsi_threshold.is_finite() {
            anyhow::bail!("rsi_threshold must be finite");
        }
        if self.cache_max_entries == 0 {
            anyhow::bail!("cache_max_entries must be positive");
        }
        Ok(())
    }

    /// Parameters of the screening rule.
    pub fn screen_params(&self) -> ScreenParams {
        ScreenParams {
            interval: self.interval,
            price_count: self.price_count,
            rsi_window: self.rsi_window,
            std_dev_multiplier: self.std_dev_multiplier,
            rsi_threshold: self.rsi_threshold,
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
