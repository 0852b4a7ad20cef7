//! Performance analysis: pure aggregation over a closed trade list.
//!
//! Nothing here is incremental. Every call recomputes from the trades, and an
//! empty trade list yields `None` rather than a summary full of divisions by
//! zero.

use std::collections::BTreeMap;
use std::fmt;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::domain::{Direction, ExitReason, Trade};

/// Profit factor reported when there is no losing PnL to divide by.
pub const PROFIT_FACTOR_SENTINEL: f64 = 999.0;

/// Calendar bucket size for periodic breakdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Year,
    Month,
}

/// A calendar bucket of entry times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeriodKey {
    pub year: i32,
    pub month: Option<u32>,
}

impl PeriodKey {
    pub fn of(trade: &Trade, granularity: Granularity) -> Self {
        let t = trade.entry_time;
        Self {
            year: t.year(),
            month: match granularity {
                Granularity::Year => None,
                Granularity::Month => Some(t.month()),
            },
        }
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.month {
            Some(m) => write!(f, "{}-{m:02}", self.year),
            None => write!(f, "{}", self.year),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodStats {
    pub period: PeriodKey,
    pub trades: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub pnl: f64,
    pub longs: usize,
    pub shorts: usize,
}

/// Closed trades counted by exit reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitCounts {
    pub stop: usize,
    pub target: usize,
    pub timeout: usize,
}

impl ExitCounts {
    pub fn tally<'a>(trades: impl Iterator<Item = &'a Trade>) -> Self {
        let mut counts = Self::default();
        for t in trades {
            match t.exit_reason {
                ExitReason::Stop => counts.stop += 1,
                ExitReason::Target => counts.target += 1,
                ExitReason::Timeout => counts.timeout += 1,
            }
        }
        counts
    }

    pub fn get(&self, reason: ExitReason) -> usize {
        match reason {
            ExitReason::Stop => self.stop,
            ExitReason::Target => self.target,
            ExitReason::Timeout => self.timeout,
        }
    }
}

/// Aggregate statistics of one trade list. Rates and drawdown are fractions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total_trades: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub total_pnl: f64,
    pub final_equity: f64,
    pub max_drawdown: f64,
    pub max_consecutive_losses: usize,
    pub long_trades: usize,
    pub short_trades: usize,
    pub long_win_rate: f64,
    pub short_win_rate: f64,
    pub avg_win: f64,
    /// Absolute mean of losing PnL.
    pub avg_loss: f64,
    pub avg_hold_bars: f64,
    pub avg_adx_at_entry: Option<f64>,
    #[serde(default)]
    pub exits: ExitCounts,
    pub yearly: Vec<PeriodStats>,
    pub monthly: Vec<PeriodStats>,
}

impl PerformanceSummary {
    fn periods(&self, granularity: Granularity) -> &[PeriodStats] {
        match granularity {
            Granularity::Year => &self.yearly,
            Granularity::Month => &self.monthly,
        }
    }

    /// Number of buckets with positive PnL.
    pub fn profitable_periods(&self, granularity: Granularity) -> usize {
        self.periods(granularity).iter().filter(|p| p.pnl > 0.0).count()
    }

    pub fn all_periods_profitable(&self, granularity: Granularity) -> bool {
        let periods = self.periods(granularity);
        !periods.is_empty() && periods.iter().all(|p| p.pnl > 0.0)
    }
}

/// Summarize a trade list. `None` when there are no trades.
pub fn analyze(trades: &[Trade], initial_equity: f64) -> Option<PerformanceSummary> {
    if trades.is_empty() {
        return None;
    }

    let (longs, shorts): (Vec<&Trade>, Vec<&Trade>) =
        trades.iter().partition(|t| t.direction == Direction::Long);
    let wins: Vec<f64> = trades.iter().filter(|t| t.is_winner()).map(|t| t.pnl).collect();
    let losses: Vec<f64> = trades.iter().filter(|t| !t.is_winner()).map(|t| t.pnl).collect();
    let total_pnl: f64 = trades.iter().map(|t| t.pnl).sum();
    let adx: Vec<f64> = trades.iter().filter_map(|t| t.adx_at_entry).collect();

    Some(PerformanceSummary {
        total_trades: trades.len(),
        win_rate: win_rate(trades.iter()),
        profit_factor: profit_factor(trades.iter()),
        total_pnl,
        final_equity: equity_path(trades, initial_equity)
            .last()
            .copied()
            .unwrap_or(initial_equity),
        max_drawdown: max_drawdown(trades, initial_equity),
        max_consecutive_losses: max_consecutive_losses(trades),
        long_trades: longs.len(),
        short_trades: shorts.len(),
        long_win_rate: win_rate(longs.iter().copied()),
        short_win_rate: win_rate(shorts.iter().copied()),
        avg_win: mean(&wins).unwrap_or(0.0),
        avg_loss: mean(&losses).map_or(0.0, f64::abs),
        avg_hold_bars: trades.iter().map(|t| t.hold_bars as f64).sum::<f64>() / trades.len() as f64,
        avg_adx_at_entry: mean(&adx),
        exits: ExitCounts::tally(trades.iter()),
        yearly: period_breakdown(trades, Granularity::Year),
        monthly: period_breakdown(trades, Granularity::Month),
    })
}

// ─── Individual metric functions ────────────────────────────────────

/// Fraction of trades with pnl > 0. Zero for an empty set.
pub fn win_rate<'a>(trades: impl Iterator<Item = &'a Trade>) -> f64 {
    let (mut total, mut wins) = (0usize, 0usize);
    for t in trades {
        total += 1;
        if t.is_winner() {
            wins += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        wins as f64 / total as f64
    }
}

/// Gross profit / |gross loss|, where losses are trades with pnl <= 0.
///
/// Returns [`PROFIT_FACTOR_SENTINEL`] when there is no losing PnL.
pub fn profit_factor<'a>(trades: impl Iterator<Item = &'a Trade>) -> f64 {
    let (mut gross_profit, mut gross_loss) = (0.0, 0.0);
    for t in trades {
        if t.is_winner() {
            gross_profit += t.pnl;
        } else {
            gross_loss += t.pnl;
        }
    }
    if gross_loss == 0.0 {
        PROFIT_FACTOR_SENTINEL
    } else {
        gross_profit / gross_loss.abs()
    }
}

/// Running equity after each trade, floored at zero.
pub fn equity_path(trades: &[Trade], initial_equity: f64) -> Vec<f64> {
    let mut equity = initial_equity;
    trades
        .iter()
        .map(|t| {
            equity = (equity + t.pnl).max(0.0);
            equity
        })
        .collect()
}

/// Largest `(peak - equity) / peak` over the trade sequence, peak starting at
/// the initial balance.
pub fn max_drawdown(trades: &[Trade], initial_equity: f64) -> f64 {
    let mut peak = initial_equity;
    let mut worst = 0.0_f64;
    for equity in equity_path(trades, initial_equity) {
        peak = peak.max(equity);
        if peak > 0.0 {
            worst = worst.max((peak - equity) / peak);
        }
    }
    worst
}

/// Longest run of consecutive trades with pnl <= 0.
pub fn max_consecutive_losses(trades: &[Trade]) -> usize {
    let mut max_streak = 0;
    let mut streak = 0;
    for t in trades {
        if t.is_winner() {
            streak = 0;
        } else {
            streak += 1;
            max_streak = max_streak.max(streak);
        }
    }
    max_streak
}

/// Per-bucket statistics keyed by entry time, in calendar order.
pub fn period_breakdown(trades: &[Trade], granularity: Granularity) -> Vec<PeriodStats> {
    let mut buckets: BTreeMap<PeriodKey, Vec<&Trade>> = BTreeMap::new();
    for t in trades {
        buckets.entry(PeriodKey::of(t, granularity)).or_default().push(t);
    }
    buckets
        .into_iter()
        .map(|(period, group)| PeriodStats {
            period,
            trades: group.len(),
            win_rate: win_rate(group.iter().copied()),
            profit_factor: profit_factor(group.iter().copied()),
            pnl: group.iter().map(|t| t.pnl).sum(),
            longs: group.iter().filter(|t| t.direction == Direction::Long).count(),
            shorts: group.iter().filter(|t| t.direction == Direction::Short).count(),
        })
        .collect()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
