//! Per-bar directional gates.
//!
//! Each gate yields a `{long_ok, short_ok}` pair for every signal bar. Gates
//! are ANDed; a missing input closes the gate in both directions.

use crate::align::{coarse_index_map, gather, lag, StampConvention};
use crate::domain::{Bar, Direction};
use crate::error::ConfigError;
use crate::indicators::{compute_adx, ema_of_series};

use super::config::{MomentumGate, MtfMode, TrendGate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionGate {
    pub long_ok: bool,
    pub short_ok: bool,
}

impl DirectionGate {
    pub const OPEN: Self = Self {
        long_ok: true,
        short_ok: true,
    };
    pub const CLOSED: Self = Self {
        long_ok: false,
        short_ok: false,
    };

    /// LONG when `lhs > rhs`, SHORT when `lhs < rhs`; closed if either is missing.
    pub fn compare(lhs: Option<f64>, rhs: Option<f64>) -> Self {
        match (lhs, rhs) {
            (Some(l), Some(r)) => Self {
                long_ok: l > r,
                short_ok: l < r,
            },
            _ => Self::CLOSED,
        }
    }

    pub fn and(self, other: Self) -> Self {
        Self {
            long_ok: self.long_ok && other.long_ok,
            short_ok: self.short_ok && other.short_ok,
        }
    }

    pub fn allows(self, direction: Direction) -> bool {
        match direction {
            Direction::Long => self.long_ok,
            Direction::Short => self.short_ok,
        }
    }
}

/// The coarse series feeding the multi-timeframe gate.
#[derive(Debug, Clone, Copy)]
pub struct HigherTimeframe<'a> {
    pub bars: &'a [Bar],
    pub convention: StampConvention,
}

impl<'a> HigherTimeframe<'a> {
    pub fn new(bars: &'a [Bar], convention: StampConvention) -> Self {
        Self { bars, convention }
    }
}

fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

fn as_available(values: &[f64]) -> Vec<Option<f64>> {
    values
        .iter()
        .map(|v| if v.is_nan() { None } else { Some(*v) })
        .collect()
}

/// Trend gate on the signal timeframe. No gate configured means always open.
pub fn trend_gates(gate: Option<&TrendGate>, bars: &[Bar]) -> Vec<DirectionGate> {
    let Some(gate) = gate else {
        return vec![DirectionGate::OPEN; bars.len()];
    };
    let close = closes(bars);
    match *gate {
        TrendGate::EmaCross { fast, slow } => {
            let f = ema_of_series(&close, fast);
            let s = ema_of_series(&close, slow);
            f.iter()
                .zip(&s)
                .map(|(f, s)| DirectionGate::compare(*f, *s))
                .collect()
        }
        TrendGate::PriceVsEma { period } => {
            let ema = ema_of_series(&close, period);
            as_available(&close)
                .into_iter()
                .zip(ema)
                .map(|(c, e)| DirectionGate::compare(c, e))
                .collect()
        }
    }
}

/// ADX gate plus the ADX series itself (recorded on signals).
pub fn momentum_gates(
    gate: Option<&MomentumGate>,
    bars: &[Bar],
) -> (Vec<DirectionGate>, Option<Vec<Option<f64>>>) {
    let Some(gate) = gate else {
        return (vec![DirectionGate::OPEN; bars.len()], None);
    };
    let adx = compute_adx(bars, gate.period).adx;
    let gates = adx
        .iter()
        .map(|v| match v {
            Some(a) if *a >= gate.threshold => DirectionGate::OPEN,
            _ => DirectionGate::CLOSED,
        })
        .collect();
    (gates, Some(adx))
}

/// Multi-timeframe gate. Every coarse series is computed on the coarse bars
/// and only then aligned onto the signal bars.
pub fn mtf_gates(
    mode: &MtfMode,
    bars: &[Bar],
    htf: Option<&HigherTimeframe<'_>>,
) -> Result<Vec<DirectionGate>, ConfigError> {
    if mode.is_none() {
        return Ok(vec![DirectionGate::OPEN; bars.len()]);
    }
    let htf = htf.ok_or(ConfigError::MissingHigherTimeframe { mode: mode.label() })?;

    let index_map = coarse_index_map(bars, htf.bars, htf.convention);
    let coarse_close = closes(htf.bars);
    let aligned_close = gather(&index_map, &as_available(&coarse_close));
    let aligned_ema = |period: usize| gather(&index_map, &ema_of_series(&coarse_close, period));

    let gates = match *mode {
        MtfMode::None => vec![DirectionGate::OPEN; bars.len()],
        MtfMode::Direction { ema_period } => compare_series(&aligned_close, &aligned_ema(ema_period)),
        MtfMode::TrendAlign {
            ema_period,
            slope_bars,
        } => {
            let ema = ema_of_series(&coarse_close, ema_period);
            let lagged = gather(&index_map, &lag(&ema, slope_bars));
            let ema = gather(&index_map, &ema);
            let price = compare_series(&aligned_close, &ema);
            let slope = compare_series(&ema, &lagged);
            price.into_iter().zip(slope).map(|(p, s)| p.and(s)).collect()
        }
        MtfMode::DualEma { fast, slow } => compare_series(&aligned_ema(fast), &aligned_ema(slow)),
        MtfMode::TripleEma { long_period } => {
            compare_series(&aligned_close, &aligned_ema(long_period))
        }
    };
    Ok(gates)
}

fn compare_series(lhs: &[Option<f64>], rhs: &[Option<f64>]) -> Vec<DirectionGate> {
    lhs.iter()
        .zip(rhs)
        .map(|(l, r)| DirectionGate::compare(*l, *r))
        .collect()
}
