//! ADX: Average Directional Index (Wilder).
//!
//! Steps:
//! 1. +DM / -DM from consecutive high/low deltas (bar 0 has none)
//! 2. Wilder-smooth TR, +DM, -DM over bars 1..=period (first value at `period`)
//! 3. +DI = 100 * smoothed(+DM) / smoothed(TR), -DI likewise (0 when TR is 0)
//! 4. DX = 100 * |+DI - -DI| / (+DI + -DI) (0 when both are 0)
//! 5. ADX seeded at 2*period with mean(DX[period+1..=2*period]), then Wilder
//!
//! Lookback: 2 * period.

use super::atr::{true_range, wilder_smooth_from};
use super::Indicator;
use crate::domain::Bar;

/// ADX with both directional indicators.
#[derive(Debug, Clone, Default)]
pub struct AdxSeries {
    pub adx: Vec<Option<f64>>,
    pub plus_di: Vec<Option<f64>>,
    pub minus_di: Vec<Option<f64>>,
}

/// Compute ADX, +DI and -DI.
pub fn compute_adx(bars: &[Bar], period: usize) -> AdxSeries {
    let n = bars.len();
    let mut out = AdxSeries {
        adx: vec![None; n],
        plus_di: vec![None; n],
        minus_di: vec![None; n],
    };

    if period == 0 || n <= period {
        return out;
    }

    let mut plus_dm = vec![0.0; n];
    let mut minus_dm = vec![0.0; n];
    for i in 1..n {
        let up = bars[i].high - bars[i - 1].high;
        let down = bars[i - 1].low - bars[i].low;
        if up.is_nan() || down.is_nan() {
            plus_dm[i] = f64::NAN;
            minus_dm[i] = f64::NAN;
            continue;
        }
        if up > down && up > 0.0 {
            plus_dm[i] = up;
        }
        if down > up && down > 0.0 {
            minus_dm[i] = down;
        }
    }

    let tr = true_range(bars);
    let smooth_tr = wilder_smooth_from(&tr, 1, period);
    let smooth_plus = wilder_smooth_from(&plus_dm, 1, period);
    let smooth_minus = wilder_smooth_from(&minus_dm, 1, period);

    let mut dx = vec![f64::NAN; n];
    for i in period..n {
        let (Some(str_), Some(sp), Some(sm)) = (smooth_tr[i], smooth_plus[i], smooth_minus[i])
        else {
            break;
        };
        let (pdi, mdi) = if str_ == 0.0 {
            (0.0, 0.0)
        } else {
            (100.0 * sp / str_, 100.0 * sm / str_)
        };
        out.plus_di[i] = Some(pdi);
        out.minus_di[i] = Some(mdi);

        let sum = pdi + mdi;
        dx[i] = if sum == 0.0 {
            0.0
        } else {
            100.0 * (pdi - mdi).abs() / sum
        };
    }

    out.adx = wilder_smooth_from(&dx, period + 1, period);
    out
}

#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
    name: String,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ADX period must be >= 1");
        Self {
            period,
            name: format!("adx_{period}"),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn series(&self, bars: &[Bar]) -> AdxSeries {
        compute_adx(bars, self.period)
    }
}

impl Indicator for Adx {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        2 * self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<Option<f64>> {
        self.series(bars).adx
    }
}
