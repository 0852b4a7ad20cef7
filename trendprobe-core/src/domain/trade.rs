//! Trade: a completed round trip, and the equity points it produces.

use super::signal::Direction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a trade was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    Stop,
    Target,
    Timeout,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stop => "STOP",
            Self::Target => "TARGET",
            Self::Timeout => "TIMEOUT",
        }
    }
}

/// A closed round-trip trade. Created once by the simulator, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub direction: Direction,

    // ── Entry ──
    pub entry_bar: usize,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_bar: usize,
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,
    pub exit_reason: ExitReason,

    // ── Levels and size ──
    pub stop_price: f64,
    pub target_price: f64,
    pub size: f64,

    // ── PnL ──
    /// Entry fee plus exit fee.
    pub fees: f64,
    /// Net of both fees.
    pub pnl: f64,

    pub hold_bars: usize,
    /// ADX at the signal bar, when the momentum gate computed one.
    pub adx_at_entry: Option<f64>,
}

impl Trade {
    /// Net PnL as a fraction of entry notional.
    pub fn return_pct(&self) -> f64 {
        let notional = self.entry_price * self.size;
        if notional == 0.0 {
            return 0.0;
        }
        self.pnl / notional
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}

/// Equity after a closed trade (or at simulation start).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_trade(pnl: f64) -> Trade {
        Trade {
            direction: Direction::Long,
            entry_bar: 4,
            entry_time: Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap(),
            entry_price: 100.0,
            exit_bar: 8,
            exit_time: Utc.with_ymd_and_hms(2024, 1, 5, 8, 0, 0).unwrap(),
            exit_price: 104.0,
            exit_reason: ExitReason::Target,
            stop_price: 96.0,
            target_price: 104.0,
            size: 10.0,
            fees: 0.0,
            pnl,
            hold_bars: 4,
            adx_at_entry: None,
        }
    }

    #[test]
    fn return_pct_uses_entry_notional() {
        let t = sample_trade(40.0);
        assert!((t.return_pct() - 0.04).abs() < 1e-12);
    }

    #[test]
    fn zero_pnl_is_not_a_winner() {
        assert!(!sample_trade(0.0).is_winner());
        assert!(sample_trade(0.01).is_winner());
    }

    #[test]
    fn exit_reason_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&ExitReason::Timeout).unwrap(),
            "\"TIMEOUT\""
        );
    }
}
