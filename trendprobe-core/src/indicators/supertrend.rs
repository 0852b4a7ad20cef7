//! Supertrend: ATR band indicator with a discrete trend state.
//!
//! Basic bands around the bar midpoint: up = mid - m*ATR, dn = mid + m*ATR.
//! Bands ratchet: `up` may only rise while the previous close stayed above the
//! previous `up`; `dn` may only fall while the previous close stayed below the
//! previous `dn`.
//!
//! Trend flips DOWN -> UP when close > previous `dn`, UP -> DOWN when
//! close < previous `up`, and holds otherwise. The flip is the tradable event.
//!
//! State starts (trending up) at the first bar with a warmed-up ATR.
//! Lookback: ATR lookback + 1 (first bar where a flip can be observed).

use serde::{Deserialize, Serialize};

use super::atr::{Atr, AtrSmoothing};
use super::Indicator;
use crate::domain::{Bar, Direction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trend {
    Up,
    Down,
}

/// Trend flag plus both bands at one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupertrendState {
    pub trend: Trend,
    pub up: f64,
    pub dn: f64,
}

impl SupertrendState {
    /// Initial state from the first bar with an ATR.
    pub fn seed(bar: &Bar, atr: f64, multiplier: f64) -> Self {
        let mid = bar.mid();
        Self {
            trend: Trend::Up,
            up: mid - multiplier * atr,
            dn: mid + multiplier * atr,
        }
    }

    /// Advance one bar. `prev_close` is the close of the bar this state belongs to.
    pub fn step(&self, prev_close: f64, bar: &Bar, atr: f64, multiplier: f64) -> Self {
        let mid = bar.mid();

        let basic_up = mid - multiplier * atr;
        let up = if prev_close > self.up {
            basic_up.max(self.up)
        } else {
            basic_up
        };

        let basic_dn = mid + multiplier * atr;
        let dn = if prev_close < self.dn {
            basic_dn.min(self.dn)
        } else {
            basic_dn
        };

        let trend = match self.trend {
            Trend::Down if bar.close > self.dn => Trend::Up,
            Trend::Up if bar.close < self.up => Trend::Down,
            held => held,
        };

        Self { trend, up, dn }
    }

    /// The band currently acting as the stop: `up` in an uptrend, `dn` in a downtrend.
    pub fn active_band(&self) -> f64 {
        match self.trend {
            Trend::Up => self.up,
            Trend::Down => self.dn,
        }
    }
}

/// Per-bar Supertrend state plus the ATR used to build it.
#[derive(Debug, Clone, Default)]
pub struct SupertrendSeries {
    pub states: Vec<Option<SupertrendState>>,
    pub atr: Vec<Option<f64>>,
}

impl SupertrendSeries {
    /// Flip events: LONG on DOWN -> UP, SHORT on UP -> DOWN.
    pub fn flips(&self) -> Vec<Option<Direction>> {
        let mut out = vec![None; self.states.len()];
        for i in 1..self.states.len() {
            if let (Some(prev), Some(cur)) = (self.states[i - 1], self.states[i]) {
                out[i] = match (prev.trend, cur.trend) {
                    (Trend::Down, Trend::Up) => Some(Direction::Long),
                    (Trend::Up, Trend::Down) => Some(Direction::Short),
                    _ => None,
                };
            }
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct Supertrend {
    atr: Atr,
    multiplier: f64,
    name: String,
}

impl Supertrend {
    pub fn new(period: usize, multiplier: f64) -> Self {
        Self::with_smoothing(period, multiplier, AtrSmoothing::Wilder)
    }

    pub fn with_smoothing(period: usize, multiplier: f64, smoothing: AtrSmoothing) -> Self {
        assert!(multiplier > 0.0, "Supertrend multiplier must be > 0");
        Self {
            atr: Atr::with_smoothing(period, smoothing),
            multiplier,
            name: format!("supertrend_{period}_{multiplier}"),
        }
    }

    /// Full state series.
    pub fn series(&self, bars: &[Bar]) -> SupertrendSeries {
        let atr = self.atr.compute(bars);
        let mut states = vec![None; bars.len()];
        let mut current: Option<SupertrendState> = None;

        for (i, bar) in bars.iter().enumerate() {
            let Some(a) = atr[i] else {
                if current.is_some() {
                    break;
                }
                continue;
            };
            let next = match current {
                None => SupertrendState::seed(bar, a, self.multiplier),
                Some(prev) => prev.step(bars[i - 1].close, bar, a, self.multiplier),
            };
            states[i] = Some(next);
            current = Some(next);
        }

        SupertrendSeries { states, atr }
    }
}

impl Indicator for Supertrend {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.atr.lookback() + 1
    }

    /// Active band value per bar.
    fn compute(&self, bars: &[Bar]) -> Vec<Option<f64>> {
        self.series(bars)
            .states
            .iter()
            .map(|s| s.map(|s| s.active_band()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_ohlc_bars;

    fn bar(high: f64, low: f64, close: f64) -> Bar {
        make_ohlc_bars(&[(close, high, low, close)]).remove(0)
    }

    #[test]
    fn seed_bands_straddle_mid() {
        let s = SupertrendState::seed(&bar(102.0, 98.0, 101.0), 2.0, 3.0);
        assert_eq!(s.trend, Trend::Up);
        assert_eq!(s.up, 94.0);
        assert_eq!(s.dn, 106.0);
    }

    #[test]
    fn up_band_ratchets_only_while_price_above() {
        let s = SupertrendState {
            trend: Trend::Up,
            up: 95.0,
            dn: 110.0,
        };
        // basic_up = 100 - 3*3 = 91 < 95, prev close above -> keep 95
        let next = s.step(100.0, &bar(101.0, 99.0, 100.0), 3.0, 3.0);
        assert_eq!(next.up, 95.0);
        assert_eq!(next.trend, Trend::Up);
    }

    #[test]
    fn dn_band_ratchets_only_while_price_below() {
        let s = SupertrendState {
            trend: Trend::Down,
            up: 80.0,
            dn: 105.0,
        };
        // basic_dn = 100 + 9 = 109 > 105, prev close below -> keep 105
        let next = s.step(100.0, &bar(101.0, 99.0, 100.0), 3.0, 3.0);
        assert_eq!(next.dn, 105.0);
        assert_eq!(next.trend, Trend::Down);
    }

    #[test]
    fn flips_up_when_close_clears_previous_dn() {
        let s = SupertrendState {
            trend: Trend::Down,
            up: 80.0,
            dn: 105.0,
        };
        let next = s.step(104.0, &bar(108.0, 104.0, 106.0), 1.0, 3.0);
        assert_eq!(next.trend, Trend::Up);
    }

    #[test]
    fn flips_down_when_close_breaks_previous_up() {
        let s = SupertrendState {
            trend: Trend::Up,
            up: 95.0,
            dn: 120.0,
        };
        let next = s.step(96.0, &bar(96.0, 92.0, 94.0), 1.0, 3.0);
        assert_eq!(next.trend, Trend::Down);
    }

    #[test]
    fn series_flips_in_reversal() {
        let mut data = Vec::new();
        for i in 0..15 {
            let base = 100.0 + i as f64 * 2.0;
            data.push((base - 1.0, base + 2.0, base - 2.0, base + 1.0));
        }
        for i in 0..15 {
            let base = 128.0 - i as f64 * 4.0;
            data.push((base + 1.0, base + 2.0, base - 2.0, base - 1.0));
        }
        let bars = make_ohlc_bars(&data);
        let series = Supertrend::new(3, 2.0).series(&bars);
        let flips = series.flips();
        assert!(flips.iter().any(|f| *f == Some(Direction::Short)));
        assert!(series.states[..2].iter().all(|s| s.is_none()));
        assert!(series.states[2].is_some());
    }

    #[test]
    fn active_band_below_close_in_uptrend() {
        let mut data = Vec::new();
        for i in 0..15 {
            let base = 100.0 + i as f64 * 2.0;
            data.push((base - 1.0, base + 3.0, base - 3.0, base + 1.0));
        }
        let bars = make_ohlc_bars(&data);
        let result = Supertrend::new(3, 2.0).compute(&bars);
        for i in 5..15 {
            let band = result[i].unwrap();
            assert!(band < bars[i].close, "band {band} should be below close at {i}");
        }
    }

    #[test]
    fn supertrend_lookback() {
        assert_eq!(Supertrend::new(10, 3.0).lookback(), 10);
    }

    #[test]
    fn too_few_bars() {
        let bars = make_ohlc_bars(&[(100.0, 105.0, 95.0, 102.0)]);
        let result = Supertrend::new(3, 2.0).compute(&bars);
        assert_eq!(result, vec![None]);
    }
}
