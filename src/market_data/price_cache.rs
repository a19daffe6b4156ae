use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use super::PriceSeries;
use crate::types::CandleInterval;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of "now" for TTL bookkeeping.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

// ---------------------------------------------------------------------------
// Cache key
// ---------------------------------------------------------------------------

/// Exact argument tuple a price history was requested with.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct PriceKey {
    pub ticker: String,
    pub interval: CandleInterval,
    pub count: u32,
}

impl PriceKey {
    pub fn new(ticker: impl Into<String>, interval: CandleInterval, count: u32) -> Self {
        Self {
            ticker: ticker.into(),
            interval,
            count,
        }
    }
}

impl std::fmt::Display for PriceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}x{}", self.ticker, self.interval, self.count)
    }
}

// ---------------------------------------------------------------------------
// PriceCache -- bounded TTL + LRU memo of fetched series
// ---------------------------------------------------------------------------

struct Entry {
    inserted_at: Instant,
    series: PriceSeries,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<PriceKey, Entry>,
    /// Keys from least to most recently used.
    recency: VecDeque<PriceKey>,
}

impl Inner {
    fn touch(&mut self, key: &PriceKey) {
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            if let Some(k) = self.recency.remove(pos) {
                self.recency.push_back(k);
            }
        }
    }

    fn remove(&mut self, key: &PriceKey) {
        self.entries.remove(key);
        self.recency.retain(|k| k != key);
    }
}

/// Memo of price series keyed by [`PriceKey`].
///
/// * Entries older than `ttl` are never returned and are purged on insert.
/// * When full, the least-recently-used entry is evicted.
/// * Interior mutability behind a `parking_lot::Mutex`; one entry per key and
///   the last writer wins.
pub struct PriceCache<C: Clock = SystemClock> {
    inner: Mutex<Inner>,
    ttl: Duration,
    max_entries: usize,
    clock: C,
}

impl PriceCache<SystemClock> {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self::with_clock(ttl, max_entries, SystemClock)
    }
}

impl<C: Clock> PriceCache<C> {
    pub fn with_clock(ttl: Duration, max_entries: usize, clock: C) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            ttl,
            max_entries: max_entries.max(1),
            clock,
        }
    }

    /// Return a fresh entry for `key`, marking it most recently used.
    pub fn get(&self, key: &PriceKey) -> Option<PriceSeries> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        let expired = match inner.entries.get(key) {
            None => return None,
            Some(e) => now.saturating_duration_since(e.inserted_at) >= self.ttl,
        };

        if expired {
            debug!(key = %key, "cache entry expired");
            inner.remove(key);
            return None;
        }

        inner.touch(key);
        inner.entries.get(key).map(|e| e.series.clone())
    }

    /// Store `series` under `key`, replacing any previous entry.
    pub fn insert(&self, key: PriceKey, series: PriceSeries) {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        // Expired entries go first.
        let ttl = self.ttl;
        let stale: Vec<PriceKey> = inner
            .entries
            .iter()
            .filter(|(_, e)| now.saturating_duration_since(e.inserted_at) >= ttl)
            .map(|(k, _)| k.clone())
            .collect();
        for k in &stale {
            inner.remove(k);
        }

        if inner.entries.contains_key(&key) {
            inner.remove(&key);
        }

        while inner.entries.len() >= self.max_entries {
            match inner.recency.pop_front() {
                Some(oldest) => {
                    debug!(key = %oldest, "evicting least-recently-used cache entry");
                    inner.entries.remove(&oldest);
                }
                None => break,
            }
        }

        inner.recency.push_back(key.clone());
        inner.entries.insert(
            key,
            Entry {
                inserted_at: now,
                series,
            },
        );
    }

    /// Number of entries currently held (fresh or not yet purged).
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------

/// Hand-advanced clock for deterministic TTL tests.
#[cfg(test)]
#[derive(Clone)]
pub struct ManualClock {
    now: std::sync::Arc<Mutex<Instant>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: std::sync::Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}
