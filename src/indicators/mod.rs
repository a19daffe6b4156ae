// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators used by the
// screener.  Functions return `Option` (or a series of `Option`s) so callers
// are forced to handle insufficient-data and numerical-edge-case scenarios.

pub mod band;
pub mod rsi;
pub mod stats;
