// =============================================================================
// Threshold Band — lower cut-off derived from mean and standard deviation
// =============================================================================
//
// A one-sided Bollinger-style band over the whole fetched window:
//   threshold = mean - multiplier * σ      (σ = sample standard deviation)
//
// A close below the threshold counts as statistically depressed.

use super::stats::{mean, sample_std_dev};

/// Result of a threshold band calculation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdBand {
    pub moving_average: f64,
    pub standard_deviation: f64,
    pub threshold_price: f64,
}

impl ThresholdBand {
    /// Compute the band over every value in `closes`.
    ///
    /// Returns `None` when:
    /// - Fewer than two closes (σ undefined).
    /// - Any resulting figure is non-finite.
    pub fn from_closes(closes: &[f64], multiplier: f64) -> Option<Self> {
        let moving_average = mean(closes)?;
        let standard_deviation = sample_std_dev(closes)?;
        let threshold_price = moving_average - standard_deviation * multiplier;

        if moving_average.is_finite() && standard_deviation.is_finite() && threshold_price.is_finite() {
            Some(Self {
                moving_average,
                standard_deviation,
                threshold_price,
            })
        } else {
            None
        }
    }

    /// Whether `price` lies strictly below the threshold.
    pub fn is_below(&self, price: f64) -> bool {
        price < self.threshold_price
    }
}
