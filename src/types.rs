// =============================================================================
// Shared types used across the screener
// =============================================================================

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Candle bucket size understood by the Upbit quotation API.
///
/// Serialised with the same lowercase names the config file and the
/// `SCREENER_INTERVAL` environment variable accept (`day`, `minute60`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandleInterval {
    Minute1,
    Minute3,
    Minute5,
    Minute10,
    Minute15,
    Minute30,
    Minute60,
    Minute240,
    Day,
    Week,
    Month,
}

impl Default for CandleInterval {
    fn default() -> Self {
        Self::Day
    }
}

impl CandleInterval {
    /// Path segment under `/v1/candles/` for this interval.
    pub fn endpoint_path(&self) -> &'static str {
        match self {
            Self::Minute1 => "minutes/1",
            Self::Minute3 => "minutes/3",
            Self::Minute5 => "minutes/5",
            Self::Minute10 => "minutes/10",
            Self::Minute15 => "minutes/15",
            Self::Minute30 => "minutes/30",
            Self::Minute60 => "minutes/60",
            Self::Minute240 => "minutes/240",
            Self::Day => "days",
            Self::Week => "weeks",
            Self::Month => "months",
        }
    }
}

impl std::fmt::Display for CandleInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Minute1 => "minute1",
            Self::Minute3 => "minute3",
            Self::Minute5 => "minute5",
            Self::Minute10 => "minute10",
            Self::Minute15 => "minute15",
            Self::Minute30 => "minute30",
            Self::Minute60 => "minute60",
            Self::Minute240 => "minute240",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        };
        write!(f, "{name}")
    }
}

impl FromStr for CandleInterval {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "minute1" => Ok(Self::Minute1),
            "minute3" => Ok(Self::Minute3),
            "minute5" => Ok(Self::Minute5),
            "minute10" => Ok(Self::Minute10),
            "minute15" => Ok(Self::Minute15),
            "minute30" => Ok(Self::Minute30),
            "minute60" => Ok(Self::Minute60),
            "minute240" => Ok(Self::Minute240),
            "day" | "days" => Ok(Self::Day),
            "week" | "weeks" => Ok(Self::Week),
            "month" | "months" => Ok(Self::Month),
            other => anyhow::bail!("unknown candle interval '{other}'"),
        }
    }
}

/// A ticker that passed the screen, with the last close it was judged on.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub ticker: String,
    pub current_price: f64,
}
