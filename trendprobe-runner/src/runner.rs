//! Backtest runner: wires a strategy config and market data through the engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use trendprobe_core::analysis::PerformanceSummary;
use trendprobe_core::domain::{EquityPoint, Signal, Trade};
use trendprobe_core::simulator::RejectedSignal;
use trendprobe_core::{ConfigError, Pipeline};

use crate::config::{RunId, StrategyConfig};
use crate::data::{LoadError, MarketData};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub config: StrategyConfig,
    pub dataset_hash: String,
    pub bar_count: usize,
    pub signals: Vec<Signal>,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub rejected: Vec<RejectedSignal>,
    /// `None` when the run produced no trades.
    pub summary: Option<PerformanceSummary>,
    pub final_equity: f64,
    pub bankrupt: bool,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    pub fn total_pnl(&self) -> f64 {
        self.summary.as_ref().map_or(0.0, |s| s.total_pnl)
    }

    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }
}

/// Run one backtest on pre-loaded data. No I/O.
pub fn run_backtest(config: &StrategyConfig, data: &MarketData) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let pipeline = Pipeline::new(config.signal_config(), config.simulation.clone())?;
    let htf = data.higher_timeframe();
    let out = pipeline.run(&data.bars, htf.as_ref())?;

    let result = BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id(),
        config: config.clone(),
        dataset_hash: data.dataset_hash.clone(),
        bar_count: data.bars.len(),
        signals: out.signals,
        trades: out.simulation.trades,
        equity_curve: out.simulation.equity_curve,
        rejected: out.simulation.rejected,
        summary: out.summary,
        final_equity: out.simulation.final_equity,
        bankrupt: out.simulation.bankrupt,
    };

    info!(
        strategy = %config.name,
        run_id = %&result.run_id[..12],
        signals = result.signals.len(),
        trades = result.trades.len(),
        final_equity = result.final_equity,
        bankrupt = result.bankrupt,
        "backtest complete"
    );
    Ok(result)
}
