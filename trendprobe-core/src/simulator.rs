//! Single-position trade simulator.
//!
//! Per trade: NONE -> OPEN -> CLOSED, one position at a time. A signal is
//! entered at its reference price; stop and target come from the exit mode;
//! size risks `risk_fraction` of current equity over the stop distance.
//!
//! The forward scan starts on the bar after entry and runs for at most
//! `max_hold_bars` bars. Stop and target fill at their own price level; if
//! neither is touched the trade closes at the last scanned bar's close.
//!
//! Equity is an explicit accumulator: each closed trade adds its net PnL.
//! Equity at or below zero is clamped to zero and ends the run.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::{Bar, Direction, EquityPoint, ExitReason, Signal, Trade};
use crate::error::{require_non_negative, require_open_range, require_period, require_positive, ConfigError};

/// How stop and target prices are derived from the entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExitMode {
    /// Stop/target at a fixed fraction of the entry price.
    FixedPercent { stop_pct: f64, target_pct: f64 },
    /// Stop/target at a multiple of the signal-bar ATR.
    AtrMultiple { stop_mult: f64, target_mult: f64 },
}

impl Default for ExitMode {
    fn default() -> Self {
        Self::AtrMultiple {
            stop_mult: 2.0,
            target_mult: 6.0,
        }
    }
}

impl ExitMode {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::FixedPercent {
                stop_pct,
                target_pct,
            } => {
                require_open_range("exits.stop_pct", stop_pct, 0.0, 1.0)?;
                require_positive("exits.target_pct", target_pct)
            }
            Self::AtrMultiple {
                stop_mult,
                target_mult,
            } => {
                require_positive("exits.stop_mult", stop_mult)?;
                require_positive("exits.target_mult", target_mult)
            }
        }
    }

    /// `(stop, target)` for an entry, or the reason it cannot be priced.
    fn levels(
        &self,
        direction: Direction,
        entry: f64,
        atr: Option<f64>,
    ) -> Result<(f64, f64), RejectReason> {
        let (stop_dist, target_dist) = match *self {
            Self::FixedPercent {
                stop_pct,
                target_pct,
            } => (entry * stop_pct, entry * target_pct),
            Self::AtrMultiple {
                stop_mult,
                target_mult,
            } => match atr {
                Some(a) if a > 0.0 && a.is_finite() => (a * stop_mult, a * target_mult),
                _ => return Err(RejectReason::UnreadyAtr),
            },
        };
        let sign = direction.sign();
        Ok((entry - sign * stop_dist, entry + sign * target_dist))
    }
}

/// Which level wins when one bar touches both stop and target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    #[default]
    StopFirst,
    TargetFirst,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default = "default_initial_equity")]
    pub initial_equity: f64,
    #[serde(default = "default_risk_fraction")]
    pub risk_fraction: f64,
    /// Fee per side as a fraction of notional.
    #[serde(default = "default_fee_rate")]
    pub fee_rate: f64,
    #[serde(default = "default_max_hold_bars")]
    pub max_hold_bars: usize,
    /// Largest accepted stop distance as a fraction of entry price.
    #[serde(default = "default_max_risk_pct")]
    pub max_risk_pct: f64,
    #[serde(default)]
    pub tie_break: TieBreak,
    #[serde(default)]
    pub exits: ExitMode,
}

fn default_initial_equity() -> f64 {
    10_000.0
}
fn default_risk_fraction() -> f64 {
    0.02
}
fn default_fee_rate() -> f64 {
    0.0006
}
fn default_max_hold_bars() -> usize {
    60
}
fn default_max_risk_pct() -> f64 {
    0.10
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            initial_equity: default_initial_equity(),
            risk_fraction: default_risk_fraction(),
            fee_rate: default_fee_rate(),
            max_hold_bars: default_max_hold_bars(),
            max_risk_pct: default_max_risk_pct(),
            tie_break: TieBreak::default(),
            exits: ExitMode::default(),
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("simulation.initial_equity", self.initial_equity)?;
        require_open_range("simulation.risk_fraction", self.risk_fraction, 0.0, 1.0)?;
        require_non_negative("simulation.fee_rate", self.fee_rate)?;
        require_period("simulation.max_hold_bars", self.max_hold_bars)?;
        require_positive("simulation.max_risk_pct", self.max_risk_pct)?;
        self.exits.validate()
    }
}

/// Why a signal did not become a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectReason {
    /// ATR missing or non-positive at the signal bar.
    UnreadyAtr,
    /// Stop distance is zero or negative.
    DegenerateRisk,
    /// Stop distance exceeds `max_risk_pct` of the entry price.
    ExcessiveRisk,
    /// Signal on the last bar: nothing to scan.
    NoForwardBars,
    /// Signal at or before the exit bar of the trade that was open.
    InsideOpenTrade,
    /// Signal left over after equity reached zero.
    AfterBankruptcy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedSignal {
    pub bar_index: usize,
    pub direction: Direction,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    /// Every signal that did not become a trade, so `trades + rejected`
    /// covers the whole input.
    pub rejected: Vec<RejectedSignal>,
    pub final_equity: f64,
    /// Equity reached zero and the run stopped early.
    pub bankrupt: bool,
}

/// Runs signals through the single-position state machine.
#[derive(Debug, Clone)]
pub struct Simulator {
    config: SimConfig,
}

impl Simulator {
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn run(&self, bars: &[Bar], signals: &[Signal]) -> SimulationResult {
        let mut equity = self.config.initial_equity;
        let mut trades = Vec::new();
        let mut rejected = Vec::new();
        let mut equity_curve = Vec::new();
        let mut bankrupt = false;

        if let Some(first) = bars.first() {
            equity_curve.push(EquityPoint {
                bar_index: 0,
                timestamp: first.timestamp,
                equity,
            });
        }

        // Exit bar of the last closed trade; signals at or before it are skipped.
        let mut blocked_until: Option<usize> = None;

        for signal in signals {
            if bankrupt {
                rejected.push(reject(signal, RejectReason::AfterBankruptcy));
                continue;
            }
            if blocked_until.is_some_and(|b| signal.bar_index <= b) {
                debug!(bar = signal.bar_index, "signal inside open trade skipped");
                rejected.push(reject(signal, RejectReason::InsideOpenTrade));
                continue;
            }

            let trade = match self.trade_signal(bars, signal, equity) {
                Ok(trade) => trade,
                Err(reason) => {
                    debug!(bar = signal.bar_index, ?reason, "signal rejected");
                    rejected.push(reject(signal, reason));
                    continue;
                }
            };

            equity += trade.pnl;
            if equity <= 0.0 {
                equity = 0.0;
                bankrupt = true;
            }
            equity_curve.push(EquityPoint {
                bar_index: trade.exit_bar,
                timestamp: trade.exit_time,
                equity,
            });
            blocked_until = Some(trade.exit_bar);
            trades.push(trade);

            if bankrupt {
                info!(trades = trades.len(), bar = ?blocked_until, "equity exhausted, simulation stopped");
            }
        }

        SimulationResult {
            trades,
            equity_curve,
            rejected,
            final_equity: equity,
            bankrupt,
        }
    }

    /// Price, size and resolve one trade given the equity before it.
    fn trade_signal(&self, bars: &[Bar], signal: &Signal, equity: f64) -> Result<Trade, RejectReason> {
        let cfg = &self.config;
        let eb = signal.bar_index;
        let last = bars.len().checked_sub(1).ok_or(RejectReason::NoForwardBars)?;
        if eb >= last {
            return Err(RejectReason::NoForwardBars);
        }

        let direction = signal.direction;
        let entry = signal.reference_price;
        let (stop, target) = cfg.exits.levels(direction, entry, signal.atr_at_signal)?;

        let risk = (entry - stop).abs();
        if !(risk > 0.0) {
            return Err(RejectReason::DegenerateRisk);
        }
        if risk / entry > cfg.max_risk_pct {
            return Err(RejectReason::ExcessiveRisk);
        }

        let size = equity * cfg.risk_fraction / risk;
        let entry_fee = entry * size * cfg.fee_rate;

        let horizon = (eb + cfg.max_hold_bars).min(last);
        let (exit_bar, exit_price, exit_reason) = (eb + 1..=horizon)
            .find_map(|i| {
                self.touched_level(&bars[i], direction, stop, target)
                    .map(|(reason, price)| (i, price, reason))
            })
            .unwrap_or((horizon, bars[horizon].close, ExitReason::Timeout));

        let exit_fee = exit_price * size * cfg.fee_rate;
        let gross = (exit_price - entry) * direction.sign() * size;

        Ok(Trade {
            direction,
            entry_bar: eb,
            entry_time: signal.timestamp,
            entry_price: entry,
            exit_bar,
            exit_time: bars[exit_bar].timestamp,
            exit_price,
            exit_reason,
            stop_price: stop,
            target_price: target,
            size,
            fees: entry_fee + exit_fee,
            pnl: gross - entry_fee - exit_fee,
            hold_bars: exit_bar - eb,
            adx_at_entry: signal.aux_value("adx"),
        })
    }

    fn touched_level(
        &self,
        bar: &Bar,
        direction: Direction,
        stop: f64,
        target: f64,
    ) -> Option<(ExitReason, f64)> {
        let (stop_hit, target_hit) = match direction {
            Direction::Long => (bar.low <= stop, bar.high >= target),
            Direction::Short => (bar.high >= stop, bar.low <= target),
        };
        match (stop_hit, target_hit, self.config.tie_break) {
            (true, true, TieBreak::TargetFirst) => Some((ExitReason::Target, target)),
            (true, _, _) => Some((ExitReason::Stop, stop)),
            (false, true, _) => Some((ExitReason::Target, target)),
            (false, false, _) => None,
        }
    }
}

fn reject(signal: &Signal, reason: RejectReason) -> RejectedSignal {
    RejectedSignal {
        bar_index: signal.bar_index,
        direction: signal.direction,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_ohlc_bars};
    use std::collections::BTreeMap;

    fn signal_at(bars: &[Bar], i: usize, direction: Direction, atr: Option<f64>) -> Signal {
        Signal {
            bar_index: i,
            timestamp: bars[i].timestamp,
            direction,
            reference_price: bars[i].close,
            atr_at_signal: atr,
            aux: BTreeMap::new(),
        }
    }

    fn flat_bars(n: usize) -> Vec<Bar> {
        make_ohlc_bars(&vec![(100.0, 101.0, 99.0, 100.0); n])
    }

    fn no_fee() -> SimConfig {
        SimConfig {
            fee_rate: 0.0,
            ..SimConfig::default()
        }
    }

    #[test]
    fn atr_levels_are_direction_aware() {
        let mode = ExitMode::AtrMultiple {
            stop_mult: 2.0,
            target_mult: 4.0,
        };
        assert_eq!(mode.levels(Direction::Long, 100.0, Some(2.0)), Ok((96.0, 108.0)));
        assert_eq!(mode.levels(Direction::Short, 100.0, Some(2.0)), Ok((104.0, 92.0)));
        assert_eq!(mode.levels(Direction::Long, 100.0, None), Err(RejectReason::UnreadyAtr));
        assert_eq!(mode.levels(Direction::Long, 100.0, Some(0.0)), Err(RejectReason::UnreadyAtr));
    }

    #[test]
    fn fixed_percent_levels_ignore_atr() {
        let mode = ExitMode::FixedPercent {
            stop_pct: 0.02,
            target_pct: 0.05,
        };
        let (stop, target) = mode.levels(Direction::Long, 100.0, None).unwrap();
        assert_approx(stop, 98.0, 1e-9);
        assert_approx(target, 105.0, 1e-9);
    }

    #[test]
    fn target_hit_long() {
        let bars = make_ohlc_bars(&[
            (100.0, 101.0, 99.0, 100.0),
            (100.0, 103.0, 99.0, 102.0),
            (102.0, 109.0, 101.0, 108.5),
        ]);
        let sim = Simulator::new(SimConfig {
            exits: ExitMode::AtrMultiple {
                stop_mult: 2.0,
                target_mult: 4.0,
            },
            ..no_fee()
        })
        .unwrap();
        let result = sim.run(&bars, &[signal_at(&bars, 0, Direction::Long, Some(2.0))]);
        let t = &result.trades[0];
        assert_eq!(t.exit_reason, ExitReason::Target);
        assert_eq!(t.exit_bar, 2);
        assert_eq!(t.exit_price, 108.0);
        // size = 200 / 4 = 50, pnl = 8 * 50
        assert_approx(t.pnl, 400.0, 1e-9);
        assert_approx(result.final_equity, 10_400.0, 1e-9);
    }

    #[test]
    fn short_stop_fills_at_level() {
        let bars = make_ohlc_bars(&[
            (100.0, 101.0, 99.0, 100.0),
            (100.0, 105.0, 99.0, 104.5),
        ]);
        let sim = Simulator::new(no_fee()).unwrap();
        let result = sim.run(&bars, &[signal_at(&bars, 0, Direction::Short, Some(2.0))]);
        let t = &result.trades[0];
        assert_eq!(t.exit_reason, ExitReason::Stop);
        assert_eq!(t.exit_price, 104.0);
        assert_approx(t.pnl, -200.0, 1e-9);
    }

    #[test]
    fn tie_break_is_configurable() {
        // one bar spanning both levels
        let bars = make_ohlc_bars(&[(100.0, 101.0, 99.0, 100.0), (100.0, 120.0, 80.0, 100.0)]);
        let sig = signal_at(&bars, 0, Direction::Long, Some(2.0));

        let stop_first = Simulator::new(no_fee()).unwrap().run(&bars, &[sig.clone()]);
        assert_eq!(stop_first.trades[0].exit_reason, ExitReason::Stop);

        let target_first = Simulator::new(SimConfig {
            tie_break: TieBreak::TargetFirst,
            ..no_fee()
        })
        .unwrap()
        .run(&bars, &[sig]);
        assert_eq!(target_first.trades[0].exit_reason, ExitReason::Target);
    }

    #[test]
    fn timeout_exits_at_close_of_last_scanned_bar() {
        let bars = flat_bars(10);
        let sim = Simulator::new(SimConfig {
            max_hold_bars: 3,
            ..no_fee()
        })
        .unwrap();
        let result = sim.run(&bars, &[signal_at(&bars, 2, Direction::Long, Some(2.0))]);
        let t = &result.trades[0];
        assert_eq!(t.exit_reason, ExitReason::Timeout);
        assert_eq!(t.exit_bar, 5);
        assert_eq!(t.hold_bars, 3);
        assert_eq!(t.exit_price, 100.0);
    }

    #[test]
    fn timeout_truncated_by_series_end() {
        let bars = flat_bars(4);
        let sim = Simulator::new(no_fee()).unwrap();
        let result = sim.run(&bars, &[signal_at(&bars, 1, Direction::Short, Some(2.0))]);
        assert_eq!(result.trades[0].exit_bar, 3);
    }

    #[test]
    fn last_bar_signal_has_no_forward_bars() {
        let bars = flat_bars(3);
        let result = Simulator::new(no_fee())
            .unwrap()
            .run(&bars, &[signal_at(&bars, 2, Direction::Long, Some(2.0))]);
        assert!(result.trades.is_empty());
        assert_eq!(result.rejected[0].reason, RejectReason::NoForwardBars);
        assert_eq!(result.equity_curve.len(), 1);
    }

    #[test]
    fn degenerate_and_excessive_risk_rejected() {
        let bars = flat_bars(5);
        let sim = Simulator::new(no_fee()).unwrap();
        let unready = signal_at(&bars, 0, Direction::Long, None);
        // 2 * 6 = 12 > 10% of 100
        let wide = signal_at(&bars, 1, Direction::Long, Some(6.0));
        let result = sim.run(&bars, &[unready, wide]);
        assert!(result.trades.is_empty());
        let reasons: Vec<_> = result.rejected.iter().map(|r| r.reason).collect();
        assert_eq!(reasons, vec![RejectReason::UnreadyAtr, RejectReason::ExcessiveRisk]);
    }

    #[test]
    fn signals_inside_open_trade_are_skipped() {
        let bars = flat_bars(20);
        let sim = Simulator::new(SimConfig {
            max_hold_bars: 5,
            ..no_fee()
        })
        .unwrap();
        let signals: Vec<Signal> = [1, 3, 6, 7, 12]
            .iter()
            .map(|&i| signal_at(&bars, i, Direction::Long, Some(2.0)))
            .collect();
        let result = sim.run(&bars, &signals);
        let entries: Vec<usize> = result.trades.iter().map(|t| t.entry_bar).collect();
        // 1 -> exit 6; 3 and 6 skipped; 7 -> exit 12; 12 skipped
        assert_eq!(entries, vec![1, 7]);
        let skipped: Vec<usize> = result
            .rejected
            .iter()
            .filter(|r| r.reason == RejectReason::InsideOpenTrade)
            .map(|r| r.bar_index)
            .collect();
        assert_eq!(skipped, vec![3, 6, 12]);
    }

    #[test]
    fn fees_are_charged_on_both_sides() {
        let bars = flat_bars(4);
        let sim = Simulator::new(SimConfig {
            fee_rate: 0.001,
            max_hold_bars: 2,
            ..SimConfig::default()
        })
        .unwrap();
        let result = sim.run(&bars, &[signal_at(&bars, 0, Direction::Long, Some(2.0))]);
        let t = &result.trades[0];
        // size = 200 / 4 = 50, flat exit at 100: fees = 2 * 100 * 50 * 0.001
        assert_approx(t.fees, 10.0, 1e-9);
        assert_approx(t.pnl, -10.0, 1e-9);
    }

    #[test]
    fn bankruptcy_clamps_and_stops() {
        let bars = make_ohlc_bars(&[
            (100.0, 101.0, 99.0, 100.0),
            (100.0, 100.0, 10.0, 20.0),
            (20.0, 21.0, 19.0, 20.0),
            (20.0, 21.0, 19.0, 20.0),
        ]);
        let sim = Simulator::new(SimConfig {
            risk_fraction: 0.9,
            fee_rate: 0.05,
            exits: ExitMode::FixedPercent {
                stop_pct: 0.01,
                target_pct: 0.5,
            },
            ..SimConfig::default()
        })
        .unwrap();
        let signals = vec![
            signal_at(&bars, 0, Direction::Long, None),
            signal_at(&bars, 2, Direction::Long, None),
        ];
        let result = sim.run(&bars, &signals);
        assert!(result.bankrupt);
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.rejected.len(), 1);
        assert_eq!(result.rejected[0].bar_index, 2);
        assert_eq!(result.rejected[0].reason, RejectReason::AfterBankruptcy);
        assert_eq!(result.final_equity, 0.0);
        assert_eq!(result.equity_curve.last().unwrap().equity, 0.0);
    }

    #[test]
    fn rejects_invalid_config() {
        assert!(Simulator::new(SimConfig {
            risk_fraction: 1.5,
            ..SimConfig::default()
        })
        .is_err());
        assert!(Simulator::new(SimConfig {
            max_hold_bars: 0,
            ..SimConfig::default()
        })
        .is_err());
    }
}
