//! Average True Range (ATR).
//!
//! True Range: TR[0] = high[0] - low[0];
//! TR[t] = max(high[t]-low[t], |high[t]-close[t-1]|, |low[t]-close[t-1]|).
//!
//! Wilder ATR: seed ATR[period-1] = mean(TR[0..period]), then
//! ATR[t] = (ATR[t-1] * (period-1) + TR[t]) / period.
//! Simple ATR: rolling mean of the last `period` TR values.
//! Lookback: period - 1 (first available index).

use serde::{Deserialize, Serialize};

use super::Indicator;
use crate::domain::Bar;

/// How the true range is averaged into an ATR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtrSmoothing {
    /// Wilder's recursive smoothing (RMA).
    #[default]
    Wilder,
    /// Rolling arithmetic mean of the last `period` true ranges.
    Simple,
}

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    smoothing: AtrSmoothing,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        Self::with_smoothing(period, AtrSmoothing::Wilder)
    }

    pub fn with_smoothing(period: usize, smoothing: AtrSmoothing) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        let name = match smoothing {
            AtrSmoothing::Wilder => format!("atr_{period}"),
            AtrSmoothing::Simple => format!("atr_sma_{period}"),
        };
        Self {
            period,
            smoothing,
            name,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

/// Compute the True Range series from bars.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let mut tr = Vec::with_capacity(bars.len());
    let mut prev_close: Option<f64> = None;

    for bar in bars {
        let hl = bar.high - bar.low;
        let value = match prev_close {
            Some(pc) => hl.max((bar.high - pc).abs()).max((bar.low - pc).abs()),
            None => hl,
        };
        tr.push(value);
        prev_close = Some(bar.close);
    }

    tr
}

/// One Wilder update: `(prev * (period - 1) + value) / period`.
#[inline]
pub fn wilder_step(prev: f64, value: f64, period: usize) -> f64 {
    let p = period as f64;
    (prev * (p - 1.0) + value) / p
}

/// Wilder smoothing seeded at the first `period` values.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<Option<f64>> {
    wilder_smooth_from(values, 0, period)
}

/// Wilder smoothing that ignores everything before `start`.
///
/// Seed: `out[start + period - 1] = mean(values[start..start + period])`.
/// A NaN inside the seed window leaves the whole output unavailable; a NaN
/// after the seed makes every later value unavailable.
pub fn wilder_smooth_from(values: &[f64], start: usize, period: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let mut result = vec![None; n];

    if period == 0 || start + period > n {
        return result;
    }

    let seed_end = start + period;
    let window = &values[start..seed_end];
    if window.iter().any(|v| v.is_nan()) {
        return result;
    }

    let mut prev = window.iter().sum::<f64>() / period as f64;
    result[seed_end - 1] = Some(prev);

    for i in seed_end..n {
        if values[i].is_nan() {
            return result;
        }
        prev = wilder_step(prev, values[i], period);
        result[i] = Some(prev);
    }

    result
}

/// Rolling mean over a fixed window. Unavailable until the window is full.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let mut result = vec![None; n];

    if period == 0 {
        return result;
    }

    for i in (period - 1)..n {
        let window = &values[i + 1 - period..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        result[i] = Some(window.iter().sum::<f64>() / period as f64);
    }

    result
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<Option<f64>> {
        let tr = true_range(bars);
        match self.smoothing {
            AtrSmoothing::Wilder => wilder_smooth(&tr, self.period),
            AtrSmoothing::Simple => rolling_mean(&tr, self.period),
        }
    }
}
