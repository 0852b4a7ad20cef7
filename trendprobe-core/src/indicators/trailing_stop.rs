//! ATR trailing stop: a band that follows price at `key_value * ATR`.
//!
//! Per bar, given the previous stop S:
//! - close and previous close above S: S' = max(S, close - k*ATR)
//! - close and previous close below S: S' = min(S, close + k*ATR)
//! - close above S only:              S' = close - k*ATR
//! - otherwise:                       S' = close + k*ATR
//!
//! The stop ratchets toward price while price stays on one side and jumps to
//! the other side when price crosses it. The first stop is produced at the
//! first bar with a warmed-up ATR (never bar 0); the stop before it is taken
//! to be the previous close.

use serde::{Deserialize, Serialize};

use super::atr::{true_range, wilder_smooth};
use super::Indicator;
use crate::domain::{Bar, Direction};

/// Recursive state carried bar to bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailingStopState {
    pub stop: f64,
    pub prev_close: f64,
}

impl TrailingStopState {
    /// State before the first computed bar: the stop sits on the last close.
    pub fn seed(close: f64) -> Self {
        Self {
            stop: close,
            prev_close: close,
        }
    }

    /// Advance one bar.
    pub fn step(self, close: f64, atr: f64, key_value: f64) -> Self {
        let s = self.stop;
        let loss = key_value * atr;
        let stop = if close > s && self.prev_close > s {
            s.max(close - loss)
        } else if close < s && self.prev_close < s {
            s.min(close + loss)
        } else if close > s {
            close - loss
        } else {
            close + loss
        };
        Self {
            stop,
            prev_close: close,
        }
    }
}

/// Stop band plus the ATR it was built from.
#[derive(Debug, Clone, Default)]
pub struct TrailingStopSeries {
    pub stop: Vec<Option<f64>>,
    pub atr: Vec<Option<f64>>,
}

impl TrailingStopSeries {
    /// Cross events: LONG when close moves from at/below the stop to above it,
    /// SHORT when it moves from at/above to below.
    pub fn crossings(&self, bars: &[Bar]) -> Vec<Option<Direction>> {
        let mut out = vec![None; bars.len()];
        for i in 1..bars.len() {
            let (Some(prev), Some(cur)) = (self.stop[i - 1], self.stop[i]) else {
                continue;
            };
            let (pc, c) = (bars[i - 1].close, bars[i].close);
            if c > cur && pc <= prev {
                out[i] = Some(Direction::Long);
            } else if c < cur && pc >= prev {
                out[i] = Some(Direction::Short);
            }
        }
        out
    }
}

/// Compute the trailing stop over a bar series.
pub fn compute_trailing_stop(bars: &[Bar], atr_period: usize, key_value: f64) -> TrailingStopSeries {
    let n = bars.len();
    let atr = wilder_smooth(&true_range(bars), atr_period);
    let mut stop = vec![None; n];

    let Some(first_atr) = atr.iter().position(Option::is_some) else {
        return TrailingStopSeries { stop, atr };
    };
    let first = first_atr.max(1);
    if first >= n {
        return TrailingStopSeries { stop, atr };
    }

    let mut state = TrailingStopState::seed(bars[first - 1].close);
    for i in first..n {
        let Some(a) = atr[i] else {
            break;
        };
        state = state.step(bars[i].close, a, key_value);
        stop[i] = Some(state.stop);
    }

    TrailingStopSeries { stop, atr }
}

#[derive(Debug, Clone)]
pub struct AtrTrailingStop {
    atr_period: usize,
    key_value: f64,
    name: String,
}

impl AtrTrailingStop {
    pub fn new(atr_period: usize, key_value: f64) -> Self {
        assert!(atr_period >= 1, "ATR period must be >= 1");
        assert!(key_value > 0.0, "key value must be > 0");
        Self {
            atr_period,
            key_value,
            name: format!("atr_trailing_stop_{atr_period}_{key_value}"),
        }
    }

    pub fn series(&self, bars: &[Bar]) -> TrailingStopSeries {
        compute_trailing_stop(bars, self.atr_period, self.key_value)
    }
}

impl Indicator for AtrTrailingStop {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        (self.atr_period - 1).max(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<Option<f64>> {
        self.series(bars).stop
    }
}
