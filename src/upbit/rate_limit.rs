// =============================================================================
// Rate-Limit Tracker — follows Upbit's Remaining-Req header to avoid 429s
// =============================================================================
//
// Every quotation response carries a header such as
//
//     Remaining-Req: group=candles; min=1800; sec=29
//
// `sec` is the number of requests left in the current one-second window for
// that group.  The tracker keeps the last reported value in an atomic and the
// client pauses until the next second once it reaches zero.
// =============================================================================

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tracing::{debug, warn};

/// Header name Upbit uses to report the remaining request budget.
pub const REMAINING_REQ_HEADER: &str = "Remaining-Req";

/// How long to pause once the per-second budget is spent.
const EXHAUSTED_BACKOFF: Duration = Duration::from_millis(1000);

/// Sentinel meaning "no header seen yet".
const UNKNOWN: u32 = u32::MAX;

/// Parsed contents of a `Remaining-Req` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemainingReq {
    pub group: String,
    pub per_minute: Option<u32>,
    pub per_second: u32,
}

impl RemainingReq {
    /// Parse `group=candles; min=1800; sec=29`. `min` is optional.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut group = None;
        let mut per_minute = None;
        let mut per_second = None;

        for part in raw.split(';') {
            let Some((k, v)) = part.trim().split_once('=') else {
                continue;
            };
            match k.trim() {
                "group" => group = Some(v.trim().to_string()),
                "min" => per_minute = v.trim().parse().ok(),
                "sec" => per_second = v.trim().parse().ok(),
                _ => {}
            }
        }

        Some(Self {
            group: group?,
            per_minute,
            per_second: per_second?,
        })
    }
}

/// Thread-safe tracker of the per-second request budget.
pub struct RateLimitTracker {
    remaining_sec: AtomicU32,
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self {
            remaining_sec: AtomicU32::new(UNKNOWN),
        }
    }

    /// Update the budget from a response's headers.
    pub fn update_from_headers(&self, headers: &reqwest::header::HeaderMap) {
        let Some(val) = headers.get(REMAINING_REQ_HEADER) else {
            return;
        };
        let Ok(s) = val.to_str() else {
            return;
        };
        match RemainingReq::parse(s) {
            Some(req) => self.record(&req),
            None => warn!(header = s, "unparseable Remaining-Req header"),
        }
    }

    fn record(&self, req: &RemainingReq) {
        self.remaining_sec.store(req.per_second, Ordering::Relaxed);
        debug!(
            group = %req.group,
            sec = req.per_second,
            min = ?req.per_minute,
            "rate-limit budget updated"
        );
    }

    /// Requests left in the current second, if the venue has told us.
    pub fn remaining(&self) -> Option<u32> {
        match self.remaining_sec.load(Ordering::Relaxed) {
            UNKNOWN => None,
            n => Some(n),
        }
    }

    /// How long the caller must wait before the next request.
    pub fn required_backoff(&self) -> Option<Duration> {
        match self.remaining() {
            Some(0) => Some(EXHAUSTED_BACKOFF),
            _ => None,
        }
    }

    /// Sleep out the current window if the budget is spent.
    pub async fn wait_if_exhausted(&self) {
        if let Some(delay) = self.required_backoff() {
            debug!(delay_ms = delay.as_millis() as u64, "per-second budget spent, pausing");
            tokio::time::sleep(delay).await;
            self.remaining_sec.store(UNKNOWN, Ordering::Relaxed);
        }
    }
}

impl Default for RateLimitTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RateLimitTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitTracker")
            .field("remaining_sec", &self.remaining())
            .finish()
    }
}
