//! Timeframe alignment: map a coarse-interval series onto a fine bar stream.
//!
//! For each fine bar the output holds the most recent coarse value whose bar
//! had closed at or before the fine bar. The coarse pointer only moves
//! forward and never past the fine bar's own instant, so a coarse value can
//! not be observed before its bar is complete.
//!
//! Before the first coarse bar has closed the output is `None`, which filter
//! gates treat as "deny both directions".

use chrono::{DateTime, Duration, Utc};

use crate::domain::Bar;

/// What a bar's `timestamp` marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StampConvention {
    /// Timestamps are bar close instants; compared as-is.
    #[default]
    CloseTime,
    /// Timestamps are bar open instants. Each side is shifted by its own
    /// interval to its close instant before comparison.
    OpenTime { fine: Duration, coarse: Duration },
}

impl StampConvention {
    fn fine_close(&self, bar: &Bar) -> DateTime<Utc> {
        match self {
            Self::CloseTime => bar.timestamp,
            Self::OpenTime { fine, .. } => bar.timestamp + *fine,
        }
    }

    fn coarse_close(&self, bar: &Bar) -> DateTime<Utc> {
        match self {
            Self::CloseTime => bar.timestamp,
            Self::OpenTime { coarse, .. } => bar.timestamp + *coarse,
        }
    }
}

/// For each fine bar, the index of the latest completed coarse bar.
///
/// Forward-only two-pointer merge: O(fine + coarse).
pub fn coarse_index_map(
    fine: &[Bar],
    coarse: &[Bar],
    convention: StampConvention,
) -> Vec<Option<usize>> {
    let mut out = Vec::with_capacity(fine.len());
    let mut current: Option<usize> = None;

    for bar in fine {
        let now = convention.fine_close(bar);
        loop {
            let next = current.map_or(0, |j| j + 1);
            match coarse.get(next) {
                Some(c) if convention.coarse_close(c) <= now => current = Some(next),
                _ => break,
            }
        }
        out.push(current);
    }

    out
}

/// Pick values through an index map produced by [`coarse_index_map`].
pub fn gather(index_map: &[Option<usize>], coarse_values: &[Option<f64>]) -> Vec<Option<f64>> {
    index_map
        .iter()
        .map(|j| j.and_then(|j| coarse_values.get(j).copied().flatten()))
        .collect()
}

/// Align a coarse indicator series onto the fine bars.
pub fn align_to_fine(
    fine: &[Bar],
    coarse: &[Bar],
    coarse_values: &[Option<f64>],
    convention: StampConvention,
) -> Vec<Option<f64>> {
    gather(&coarse_index_map(fine, coarse, convention), coarse_values)
}

/// Shift a series `n` samples into the past: `out[i] = values[i - n]`.
pub fn lag(values: &[Option<f64>], n: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| if i >= n { values[i - n] } else { None })
        .collect()
}
