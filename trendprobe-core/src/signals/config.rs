//! Signal configuration: one trigger plus optional gates.
//!
//! Every variant is a tagged serde enum so a whole strategy reads naturally
//! from TOML (`type = "supertrend"`, `type = "trend_align"`, ...).

use serde::{Deserialize, Serialize};

use crate::error::{require_period, require_positive, ConfigError};
use crate::indicators::AtrSmoothing;

/// The event that proposes a direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Supertrend flip: DOWN -> UP is LONG, UP -> DOWN is SHORT.
    Supertrend {
        atr_period: usize,
        multiplier: f64,
        #[serde(default)]
        smoothing: AtrSmoothing,
    },
    /// Close crossing an ATR trailing stop.
    TrailingStop { atr_period: usize, key_value: f64 },
}

impl Default for Trigger {
    fn default() -> Self {
        Self::Supertrend {
            atr_period: 10,
            multiplier: 3.0,
            smoothing: AtrSmoothing::Wilder,
        }
    }
}

impl Trigger {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Supertrend {
                atr_period,
                multiplier,
                ..
            } => {
                require_period("trigger.atr_period", *atr_period)?;
                require_positive("trigger.multiplier", *multiplier)
            }
            Self::TrailingStop {
                atr_period,
                key_value,
            } => {
                require_period("trigger.atr_period", *atr_period)?;
                require_positive("trigger.key_value", *key_value)
            }
        }
    }

    /// First bar at which a trigger event can be observed: one bar after the
    /// band (Supertrend state or trailing stop) first exists.
    pub fn lookback(&self) -> usize {
        match *self {
            Self::Supertrend { atr_period, .. } => atr_period.saturating_sub(1) + 1,
            Self::TrailingStop { atr_period, .. } => atr_period.saturating_sub(1).max(1) + 1,
        }
    }
}

/// Trend-alignment gate on the signal timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrendGate {
    /// LONG needs EMA(fast) > EMA(slow), SHORT the reverse.
    EmaCross { fast: usize, slow: usize },
    /// LONG needs close > EMA(period), SHORT close < EMA(period).
    PriceVsEma { period: usize },
}

impl TrendGate {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::EmaCross { fast, slow } => {
                require_period("trend.fast", fast)?;
                require_period("trend.slow", slow)?;
                if fast >= slow {
                    return Err(ConfigError::FastNotBelowSlow { fast, slow });
                }
                Ok(())
            }
            Self::PriceVsEma { period } => require_period("trend.period", period),
        }
    }

    pub fn lookback(&self) -> usize {
        match *self {
            Self::EmaCross { slow, .. } => slow,
            Self::PriceVsEma { period } => period,
        }
    }
}

/// ADX trend-strength gate: passes when ADX >= threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentumGate {
    #[serde(default = "default_adx_period")]
    pub period: usize,
    pub threshold: f64,
}

fn default_adx_period() -> usize {
    14
}

impl MomentumGate {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_period("momentum.period", self.period)?;
        if !(self.threshold >= 0.0 && self.threshold <= 100.0) {
            return Err(ConfigError::OutOfRange {
                field: "momentum.threshold",
                value: self.threshold,
                min: 0.0,
                max: 100.0,
            });
        }
        Ok(())
    }

    pub fn lookback(&self) -> usize {
        2 * self.period
    }
}

/// Higher-timeframe filter mode. Values come from the coarse series and are
/// aligned onto the signal bars; a missing aligned value denies both sides.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MtfMode {
    /// Always passes both directions.
    #[default]
    None,
    /// Coarse close above/below coarse EMA.
    Direction { ema_period: usize },
    /// Coarse close above/below coarse EMA, and that EMA rising/falling
    /// against its value `slope_bars` coarse samples earlier.
    TrendAlign {
        ema_period: usize,
        #[serde(default = "default_slope_bars")]
        slope_bars: usize,
    },
    /// Coarse EMA(fast) above/below coarse EMA(slow).
    DualEma { fast: usize, slow: usize },
    /// Coarse close above/below the long-period coarse EMA.
    TripleEma {
        #[serde(default = "default_long_period")]
        long_period: usize,
    },
}

fn default_slope_bars() -> usize {
    5
}

fn default_long_period() -> usize {
    200
}

impl MtfMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Direction { .. } => "direction",
            Self::TrendAlign { .. } => "trend_align",
            Self::DualEma { .. } => "dual_ema",
            Self::TripleEma { .. } => "triple_ema",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::None => Ok(()),
            Self::Direction { ema_period } => require_period("mtf.ema_period", ema_period),
            Self::TrendAlign {
                ema_period,
                slope_bars,
            } => {
                require_period("mtf.ema_period", ema_period)?;
                require_period("mtf.slope_bars", slope_bars)
            }
            Self::DualEma { fast, slow } => {
                require_period("mtf.fast", fast)?;
                require_period("mtf.slow", slow)?;
                if fast >= slow {
                    return Err(ConfigError::FastNotBelowSlow { fast, slow });
                }
                Ok(())
            }
            Self::TripleEma { long_period } => require_period("mtf.long_period", long_period),
        }
    }
}

/// Everything the signal generator needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    pub trigger: Trigger,
    #[serde(default)]
    pub trend: Option<TrendGate>,
    #[serde(default)]
    pub momentum: Option<MomentumGate>,
    #[serde(default)]
    pub mtf: MtfMode,
    /// Extra bars added after the longest indicator warm-up.
    #[serde(default = "default_warmup_margin")]
    pub warmup_margin: usize,
}

fn default_warmup_margin() -> usize {
    1
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            trigger: Trigger::default(),
            trend: Some(TrendGate::EmaCross { fast: 20, slow: 50 }),
            momentum: None,
            mtf: MtfMode::None,
            warmup_margin: default_warmup_margin(),
        }
    }
}

impl SignalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.trigger.validate()?;
        if let Some(trend) = &self.trend {
            trend.validate()?;
        }
        if let Some(momentum) = &self.momentum {
            momentum.validate()?;
        }
        self.mtf.validate()
    }

    /// First bar index eligible for a signal: the longest warm-up plus the margin.
    pub fn min_start_index(&self) -> usize {
        let trend = self.trend.as_ref().map_or(0, TrendGate::lookback);
        let momentum = self.momentum.as_ref().map_or(0, MomentumGate::lookback);
        self.trigger.lookback().max(trend).max(momentum) + self.warmup_margin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_start_index_matches_reference_warmup() {
        // max(ema_slow=50, atr_period=10, 2*adx=28) + 1
        let mut cfg = SignalConfig::default();
        cfg.momentum = Some(MomentumGate {
            period: 14,
            threshold: 20.0,
        });
        assert_eq!(cfg.min_start_index(), 51);
    }

    #[test]
    fn adx_can_dominate_warmup() {
        let cfg = SignalConfig {
            trend: Some(TrendGate::EmaCross { fast: 5, slow: 10 }),
            momentum: Some(MomentumGate {
                period: 14,
                threshold: 25.0,
            }),
            ..SignalConfig::default()
        };
        assert_eq!(cfg.min_start_index(), 29);
    }

    #[test]
    fn trailing_stop_lookback_covers_crossing() {
        let t = Trigger::TrailingStop {
            atr_period: 14,
            key_value: 2.0,
        };
        assert_eq!(t.lookback(), 14);
    }

    #[test]
    fn rejects_inverted_ema_cross() {
        let gate = TrendGate::EmaCross { fast: 50, slow: 20 };
        assert_eq!(
            gate.validate(),
            Err(ConfigError::FastNotBelowSlow { fast: 50, slow: 20 })
        );
    }

    #[test]
    fn rejects_zero_periods_and_bad_threshold() {
        assert!(MtfMode::Direction { ema_period: 0 }.validate().is_err());
        assert!(MomentumGate {
            period: 14,
            threshold: 120.0
        }
        .validate()
        .is_err());
        assert!(Trigger::Supertrend {
            atr_period: 10,
            multiplier: 0.0,
            smoothing: AtrSmoothing::Wilder
        }
        .validate()
        .is_err());
    }

    #[test]
    fn mtf_mode_from_json_tag() {
        let mode: MtfMode =
            serde_json::from_str(r#"{"type":"trend_align","ema_period":200}"#).unwrap();
        assert_eq!(
            mode,
            MtfMode::TrendAlign {
                ema_period: 200,
                slope_bars: 5
            }
        );
        let none: MtfMode = serde_json::from_str(r#"{"type":"none"}"#).unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn trigger_smoothing_defaults_to_wilder() {
        let t: Trigger =
            serde_json::from_str(r#"{"type":"supertrend","atr_period":10,"multiplier":3.0}"#)
                .unwrap();
        assert_eq!(t, Trigger::default());
    }
}
