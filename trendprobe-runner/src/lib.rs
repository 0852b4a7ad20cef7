//! TrendProbe Runner: configuration, data I/O, sweeps, ranking, export.
//!
//! This crate builds on `trendprobe-core` to provide:
//! - TOML strategy and sweep configs with content-addressed run ids
//! - CSV bar loading, resampling, and deterministic synthetic data
//! - Single-backtest runner over pre-loaded market data
//! - Parallel parameter sweeps (rayon) with grid-ordered results
//! - Ranking by profit factor, PnL and year-by-year consistency
//! - JSON / CSV / Markdown artifacts

pub mod config;
pub mod data;
pub mod export;
pub mod ranking;
pub mod runner;
pub mod sweep;

pub use config::{ConfigFileError, RunId, StrategyConfig, SweepAxes, SweepConfig};
pub use data::{load_bars_csv, resample, synthetic_bars, LoadError, MarketData};
pub use export::{load_artifacts, save_artifacts};
pub use ranking::{consistent, rank, Consistency, RankingCriteria};
pub use runner::{run_backtest, BacktestResult, RunError, SCHEMA_VERSION};
pub use sweep::{run_sweep, ParamSweep, SweepResults};
