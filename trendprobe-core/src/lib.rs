//! TrendProbe Core: the signal/backtest engine.
//!
//! - Domain types (bars, signals, trades, equity points)
//! - Causal indicators (ATR, EMA, Supertrend, ADX, ATR trailing stop)
//! - Higher-timeframe alignment onto the signal bars
//! - Signal generation: a trigger ANDed with trend, momentum and MTF gates
//! - Single-position simulator with risk sizing, fees and bankruptcy
//! - Performance analysis over the resulting trade list
//!
//! Everything is synchronous and deterministic: the same bars and config give
//! byte-identical trades and equity points.

pub mod align;
pub mod analysis;
pub mod domain;
pub mod error;
pub mod indicators;
pub mod pipeline;
pub mod signals;
pub mod simulator;

pub use error::ConfigError;
pub use pipeline::{Pipeline, PipelineOutput};
