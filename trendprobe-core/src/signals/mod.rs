//! Signal generation.
//!
//! A trigger (Supertrend flip or trailing-stop cross) proposes a direction at
//! a bar; the trend, momentum and multi-timeframe gates must all allow that
//! direction for a signal to be emitted. Signals never depend on anything
//! after their own bar.

pub mod config;
pub mod gates;
pub mod generator;

pub use config::{MomentumGate, MtfMode, SignalConfig, TrendGate, Trigger};
pub use gates::{DirectionGate, HigherTimeframe};
pub use generator::{SignalGenerator, TriggerSeries};
