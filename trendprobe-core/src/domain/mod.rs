//! Domain types: bars, signals, trades, equity points.

pub mod bar;
pub mod signal;
pub mod trade;

pub use bar::{is_strictly_increasing, Bar};
pub use signal::{Direction, Signal};
pub use trade::{EquityPoint, ExitReason, Trade};
