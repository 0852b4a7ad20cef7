//! Causal indicator transforms.
//!
//! Every indicator maps a bar series to a series of the same length. Values
//! before warm-up are `None`; nothing is fabricated to fill the gap.
//!
//! Multi-series indicators (Supertrend, ADX, the trailing stop) expose a
//! `series()` method returning all their outputs, while `compute()` returns
//! the single line a caller usually plots or gates on.

pub mod adx;
pub mod atr;
pub mod ema;
pub mod supertrend;
pub mod trailing_stop;

pub use adx::{compute_adx, Adx, AdxSeries};
pub use atr::{true_range, wilder_smooth, Atr, AtrSmoothing};
pub use ema::{ema_of_series, Ema};
pub use supertrend::{Supertrend, SupertrendSeries, SupertrendState, Trend};
pub use trailing_stop::{
    compute_trailing_stop, AtrTrailingStop, TrailingStopSeries, TrailingStopState,
};

use crate::domain::Bar;

/// Trait for indicators.
///
/// # Look-ahead contamination guard
/// No value at bar t may depend on bar t+1 or later. Every indicator must
/// pass the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "ema_20", "atr_14").
    fn name(&self) -> &str;

    /// Index of the first bar at which the output is meaningful.
    fn lookback(&self) -> usize;

    /// Compute over the entire bar series. Output length equals `bars.len()`.
    fn compute(&self, bars: &[Bar]) -> Vec<Option<f64>>;
}

/// Create synthetic bars from close prices for testing.
///
/// open = prev_close (or close for the first bar), high = max(open,close) + 1,
/// low = min(open,close) - 1, volume = 1000, one bar every 2 hours.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar::new(
                test_timestamp(i),
                open,
                open.max(close) + 1.0,
                open.min(close) - 1.0,
                close,
                1000.0,
            )
        })
        .collect()
}

/// Create bars from explicit (open, high, low, close) tuples.
#[cfg(test)]
pub fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| {
            Bar::new(test_timestamp(i), open, high, low, close, 1000.0)
        })
        .collect()
}

#[cfg(test)]
fn test_timestamp(i: usize) -> chrono::DateTime<chrono::Utc> {
    use chrono::TimeZone;
    chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap() + chrono::Duration::hours(2 * i as i64)
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
