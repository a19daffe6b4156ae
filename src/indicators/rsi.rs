// =============================================================================
// Relative Strength Index (RSI) — Simple rolling averages, min_periods = 1
// =============================================================================
//
// Step 1 — Price changes from consecutive closes. The first position has no
//          prior close, its delta counts as 0.
// Step 2 — gain = max(delta, 0), loss = max(-delta, 0).
// Step 3 — Trailing simple mean of gains / losses over `window` samples. The
//          leading positions average whatever samples exist so far instead of
//          being left empty.
// Step 4 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// The output is aligned index-for-index with the input closes. A position
// where both averages are zero has no RSI (`None`).
//
// Thresholds:  RSI >= 70 => OVERBOUGHT,  RSI <= 30 => OVERSOLD.
// =============================================================================

/// Trailing simple mean of `values` over `window` samples.
///
/// Positions with fewer than `window` preceding samples (the first
/// `window - 1`) are averaged over the samples available up to and including
/// that position. The result has the same length as `values`.
///
/// `window == 0` => empty vec.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 {
        return Vec::new();
    }

    // Each window is summed afresh: a running add/subtract sum can drift
    // below zero on an all-zero stretch and push RSI outside [0, 100].
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let slice = &values[start..=i];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

/// Compute the full RSI series for `closes` with the given smoothing `window`.
///
/// # Edge cases
/// - `window == 0` => empty vec
/// - empty `closes` => empty vec
/// - Index 0 is always `None` (no movement observed yet).
/// - Average loss zero with a positive average gain saturates at 100.0.
/// - Both averages zero (flat stretch) => `None`.
pub fn calculate_rsi(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 || closes.is_empty() {
        return Vec::new();
    }

    // --- Split deltas into gains and losses ----------------------------------
    let mut gains = Vec::with_capacity(closes.len());
    let mut losses = Vec::with_capacity(closes.len());
    gains.push(0.0);
    losses.push(0.0);
    for w in closes.windows(2) {
        let delta = w[1] - w[0];
        gains.push(delta.max(0.0));
        losses.push((-delta).max(0.0));
    }

    let avg_gains = rolling_mean(&gains, window);
    let avg_losses = rolling_mean(&losses, window);

    avg_gains
        .iter()
        .zip(&avg_losses)
        .map(|(&g, &l)| rsi_from_averages(g, l))
        .collect()
}

/// Return the RSI at the most recent close together with a human-readable
/// zone label.
///
/// Returns `None` when there is no data or the last position is undefined.
pub fn current_rsi(closes: &[f64], window: usize) -> Option<(f64, &'static str)> {
    let value = calculate_rsi(closes, window).last().copied().flatten()?;

    let label = if value >= 70.0 {
        "OVERBOUGHT"
    } else if value <= 30.0 {
        "OVERSOLD"
    } else {
        "NEUTRAL"
    };

    Some((value, label))
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Convert average gain / average loss into an RSI value in [0, 100].
///
/// - Both averages zero => `None` (0/0).
/// - Average loss zero => 100.0.
/// - Non-finite inputs => `None`.
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        return None;
    }

    let rsi = if avg_loss == 0.0 {
        100.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    };

    if rsi.is_finite() {
        Some(rsi)
    } else {
        None
    }
}
