//! Ranking of sweep results.
//!
//! A result qualifies when it made at least `min_trades` trades with a profit
//! factor above `min_profit_factor`. Qualifying results are ordered by total
//! PnL, ties broken by run id so the ordering never depends on sweep timing.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use trendprobe_core::analysis::Granularity;

use crate::runner::BacktestResult;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingCriteria {
    pub min_trades: usize,
    pub min_profit_factor: f64,
}

impl Default for RankingCriteria {
    fn default() -> Self {
        Self {
            min_trades: 10,
            min_profit_factor: 1.0,
        }
    }
}

impl RankingCriteria {
    pub fn qualifies(&self, result: &BacktestResult) -> bool {
        match &result.summary {
            Some(s) => s.total_trades >= self.min_trades && s.profit_factor > self.min_profit_factor,
            None => false,
        }
    }
}

/// Qualifying results, best total PnL first.
pub fn rank<'a>(results: &'a [BacktestResult], criteria: &RankingCriteria) -> Vec<&'a BacktestResult> {
    let mut ranked: Vec<&BacktestResult> = results.iter().filter(|r| criteria.qualifies(r)).collect();
    ranked.sort_by(|a, b| by_pnl_desc(a, b));
    ranked
}

/// Year-by-year consistency requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consistency {
    /// Every calendar year with trades is profitable.
    AllYears,
    /// At least this many calendar years are profitable.
    AtLeastYears(usize),
}

/// Results meeting a consistency requirement, best total PnL first.
pub fn consistent<'a>(
    results: &'a [BacktestResult],
    requirement: Consistency,
) -> Vec<&'a BacktestResult> {
    let mut picked: Vec<&BacktestResult> = results
        .iter()
        .filter(|r| match (&r.summary, requirement) {
            (Some(s), Consistency::AllYears) => s.all_periods_profitable(Granularity::Year),
            (Some(s), Consistency::AtLeastYears(n)) => {
                s.profitable_periods(Granularity::Year) >= n
            }
            (None, _) => false,
        })
        .collect();
    picked.sort_by(|a, b| by_pnl_desc(a, b));
    picked
}

fn by_pnl_desc(a: &BacktestResult, b: &BacktestResult) -> Ordering {
    b.total_pnl()
        .partial_cmp(&a.total_pnl())
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.run_id.cmp(&b.run_id))
}
