//! Scenario tests for the simulator and analyzer.

use chrono::{Duration, TimeZone, Utc};
use std::collections::BTreeMap;
use trendprobe_core::analysis::{analyze, PROFIT_FACTOR_SENTINEL};
use trendprobe_core::domain::{Bar, Direction, ExitReason, Signal};
use trendprobe_core::simulator::{ExitMode, RejectReason, SimConfig, Simulator};

fn bars(ohlc: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    ohlc.iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| Bar::new(start + Duration::hours(2 * i as i64), o, h, l, c, 10.0))
        .collect()
}

fn long_at(bars: &[Bar], i: usize, atr: f64) -> Signal {
    Signal {
        bar_index: i,
        timestamp: bars[i].timestamp,
        direction: Direction::Long,
        reference_price: bars[i].close,
        atr_at_signal: Some(atr),
        aux: BTreeMap::new(),
    }
}

fn sl2_tp4() -> SimConfig {
    SimConfig {
        exits: ExitMode::AtrMultiple {
            stop_mult: 2.0,
            target_mult: 4.0,
        },
        ..SimConfig::default()
    }
}

#[test]
fn long_stop_scenario() {
    let bars = bars(&[
        (99.0, 101.0, 98.0, 100.0),
        (100.0, 102.0, 97.0, 99.0),
        (99.0, 100.0, 97.0, 98.0),
        (98.0, 99.0, 95.0, 96.5),
    ]);
    let sim = Simulator::new(sl2_tp4()).unwrap();
    let result = sim.run(&bars, &[long_at(&bars, 0, 2.0)]);

    let t = &result.trades[0];
    assert_eq!(t.stop_price, 96.0);
    assert_eq!(t.target_price, 108.0);
    assert_eq!(t.size, 50.0);
    assert_eq!(t.exit_reason, ExitReason::Stop);
    assert_eq!(t.exit_bar, 3);
    assert_eq!(t.exit_price, 96.0);

    let fees = 100.0 * 50.0 * 0.0006 + 96.0 * 50.0 * 0.0006;
    assert!((t.fees - fees).abs() < 1e-9);
    assert!((t.pnl - (-200.0 - fees)).abs() < 1e-9);
    assert!((result.final_equity - (10_000.0 - 200.0 - fees)).abs() < 1e-9);

    assert_eq!(result.equity_curve.len(), 2);
    assert_eq!(result.equity_curve[0].bar_index, 0);
    assert_eq!(result.equity_curve[1].bar_index, 3);
}

#[test]
fn sizing_uses_equity_after_previous_trade() {
    let bars = bars(&[
        (99.0, 101.0, 98.0, 100.0),
        (100.0, 109.0, 99.0, 108.0), // target 108 hit
        (108.0, 109.0, 99.0, 100.0),
        (100.0, 101.0, 99.0, 100.0),
        (100.0, 109.0, 99.0, 108.0),
    ]);
    let sim = Simulator::new(SimConfig {
        fee_rate: 0.0,
        ..sl2_tp4()
    })
    .unwrap();
    let result = sim.run(&bars, &[long_at(&bars, 0, 2.0), long_at(&bars, 3, 2.0)]);
    assert_eq!(result.trades.len(), 2);
    // first trade: +8 * 50 = 400; second sized on 10_400
    assert!((result.trades[0].pnl - 400.0).abs() < 1e-9);
    assert!((result.trades[1].size - 10_400.0 * 0.02 / 4.0).abs() < 1e-9);
}

#[test]
fn fixed_percent_mode_short() {
    let bars = bars(&[
        (100.0, 101.0, 99.0, 100.0),
        (100.0, 100.5, 96.0, 96.5),
    ]);
    let sim = Simulator::new(SimConfig {
        fee_rate: 0.0,
        exits: ExitMode::FixedPercent {
            stop_pct: 0.02,
            target_pct: 0.03,
        },
        ..SimConfig::default()
    })
    .unwrap();
    let mut signal = long_at(&bars, 0, 0.0);
    signal.direction = Direction::Short;
    signal.atr_at_signal = None;
    let result = sim.run(&bars, &[signal]);
    let t = &result.trades[0];
    assert_eq!(t.exit_reason, ExitReason::Target);
    assert!((t.exit_price - 97.0).abs() < 1e-9);
    // size = 200 / 2 = 100; pnl = 3 * 100
    assert!((t.pnl - 300.0).abs() < 1e-9);
}

#[test]
fn zero_atr_is_rejected_not_fatal() {
    let bars = bars(&[(100.0, 101.0, 99.0, 100.0), (100.0, 101.0, 99.0, 100.0)]);
    let sim = Simulator::new(sl2_tp4()).unwrap();
    let result = sim.run(&bars, &[long_at(&bars, 0, 0.0)]);
    assert!(result.trades.is_empty());
    assert_eq!(result.rejected[0].reason, RejectReason::UnreadyAtr);
    assert!(analyze(&result.trades, 10_000.0).is_none());
}

#[test]
fn no_losses_profit_factor_is_sentinel() {
    let bars = bars(&[
        (99.0, 101.0, 98.0, 100.0),
        (100.0, 109.0, 99.0, 108.0),
    ]);
    let sim = Simulator::new(sl2_tp4()).unwrap();
    let result = sim.run(&bars, &[long_at(&bars, 0, 2.0)]);
    let summary = analyze(&result.trades, 10_000.0).unwrap();
    assert_eq!(summary.profit_factor, PROFIT_FACTOR_SENTINEL);
    assert_eq!(summary.max_consecutive_losses, 0);
    assert_eq!(summary.max_drawdown, 0.0);
}
