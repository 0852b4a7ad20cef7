//! Signal: a directional entry event produced at one bar.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1.0 for long, -1.0 for short.
    pub fn sign(self) -> f64 {
        match self {
            Self::Long => 1.0,
            Self::Short => -1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Long => "LONG",
            Self::Short => "SHORT",
        }
    }
}

/// An immutable entry event.
///
/// Signals in a list are ordered by `bar_index` with strictly increasing
/// indices (at most one per bar).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    /// Close of the signal bar; used as the entry price.
    pub reference_price: f64,
    /// ATR of the triggering indicator at the signal bar, if warmed up.
    pub atr_at_signal: Option<f64>,
    /// Filter/indicator snapshot at the signal bar (e.g. `adx`, `trailing_stop`).
    pub aux: BTreeMap<String, f64>,
}

impl Signal {
    pub fn aux_value(&self, key: &str) -> Option<f64> {
        self.aux.get(key).copied()
    }
}
