//! Serializable strategy and sweep configuration.
//!
//! A `StrategyConfig` is everything needed to reproduce one backtest: the
//! signal trigger, its gates, and the simulation policy. A `SweepConfig` is a
//! base strategy plus axis vectors whose cartesian product is the grid.
//!
//! Sections left out of a TOML file are disabled (`trend`, `momentum`) or take
//! their defaults (`trigger`, `mtf`, `simulation`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use trendprobe_core::signals::{MomentumGate, MtfMode, SignalConfig, TrendGate, Trigger};
use trendprobe_core::simulator::{ExitMode, SimConfig};
use trendprobe_core::ConfigError;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

/// Errors from reading a config file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] ConfigError),
}

/// One strategy: trigger, gates, and simulation policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_warmup_margin")]
    pub warmup_margin: usize,
    #[serde(default)]
    pub trigger: Trigger,
    #[serde(default)]
    pub trend: Option<TrendGate>,
    #[serde(default)]
    pub momentum: Option<MomentumGate>,
    #[serde(default)]
    pub mtf: MtfMode,
    #[serde(default)]
    pub simulation: SimConfig,
}

fn default_name() -> String {
    "unnamed".to_string()
}

fn default_warmup_margin() -> usize {
    1
}

impl Default for StrategyConfig {
    /// Supertrend(10, 3) with an EMA 20/50 trend gate and an ADX(14) > 20 gate.
    fn default() -> Self {
        Self {
            name: "reference".to_string(),
            warmup_margin: default_warmup_margin(),
            trigger: Trigger::default(),
            trend: Some(TrendGate::EmaCross { fast: 20, slow: 50 }),
            momentum: Some(MomentumGate {
                period: 14,
                threshold: 20.0,
            }),
            mtf: MtfMode::None,
            simulation: SimConfig::default(),
        }
    }
}

impl StrategyConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigFileError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigFileError> {
        let content = read_config(path)?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// The engine-facing half of the config.
    pub fn signal_config(&self) -> SignalConfig {
        SignalConfig {
            trigger: self.trigger.clone(),
            trend: self.trend.clone(),
            momentum: self.momentum.clone(),
            mtf: self.mtf.clone(),
            warmup_margin: self.warmup_margin,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.signal_config().validate()?;
        self.simulation.validate()
    }

    /// Deterministic hash of the canonical JSON form.
    ///
    /// Two configs with identical parameters share a RunId, whatever their
    /// `name`.
    pub fn run_id(&self) -> RunId {
        let canonical = Self {
            name: String::new(),
            ..self.clone()
        };
        let json = serde_json::to_string(&canonical).unwrap_or_else(|_| format!("{canonical:?}"));
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    /// Compact one-line description used in tables and logs.
    pub fn label(&self) -> String {
        let mut parts = Vec::with_capacity(6);
        parts.push(match &self.trigger {
            Trigger::Supertrend {
                atr_period,
                multiplier,
                ..
            } => format!("st({atr_period},{multiplier})"),
            Trigger::TrailingStop {
                atr_period,
                key_value,
            } => format!("ts({atr_period},{key_value})"),
        });
        match &self.trend {
            Some(TrendGate::EmaCross { fast, slow }) => parts.push(format!("ema{fast}/{slow}")),
            Some(TrendGate::PriceVsEma { period }) => parts.push(format!("px>ema{period}")),
            None => {}
        }
        if let Some(m) = &self.momentum {
            parts.push(format!("adx{}>{}", m.period, m.threshold));
        }
        if !self.mtf.is_none() {
            parts.push(format!("mtf={}", self.mtf.label()));
        }
        parts.push(match self.simulation.exits {
            ExitMode::AtrMultiple {
                stop_mult,
                target_mult,
            } => format!("sl{stop_mult}atr tp{target_mult}atr"),
            ExitMode::FixedPercent {
                stop_pct,
                target_pct,
            } => format!("sl{}% tp{}%", stop_pct * 100.0, target_pct * 100.0),
        });
        parts.push(format!("hold{}", self.simulation.max_hold_bars));
        parts.join(" ")
    }
}

/// Axis vectors of a sweep. An empty axis keeps the base value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepAxes {
    /// ATR stop multipliers; switches exits to `atr_multiple`.
    #[serde(default)]
    pub stop_mults: Vec<f64>,
    /// ATR target multipliers; switches exits to `atr_multiple`.
    #[serde(default)]
    pub target_mults: Vec<f64>,
    /// ADX thresholds; `0` disables the momentum gate.
    #[serde(default)]
    pub adx_thresholds: Vec<f64>,
    #[serde(default)]
    pub mtf_modes: Vec<MtfMode>,
    #[serde(default)]
    pub max_hold_bars: Vec<usize>,
}

/// A base strategy plus the axes to sweep over.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    #[serde(default)]
    pub base: StrategyConfig,
    #[serde(default)]
    pub axes: SweepAxes,
}

impl SweepConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigFileError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigFileError> {
        let content = read_config(path)?;
        Self::from_toml(&content)
    }

    /// Total number of configurations in the grid.
    pub fn size(&self) -> usize {
        let a = &self.axes;
        [
            a.mtf_modes.len(),
            a.adx_thresholds.len(),
            a.stop_mults.len(),
            a.target_mults.len(),
            a.max_hold_bars.len(),
        ]
        .iter()
        .map(|&n| n.max(1))
        .product()
    }

    /// Every grid point in a fixed order: MTF mode outermost, then ADX
    /// threshold, stop, target and max hold.
    pub fn grid(&self) -> Vec<StrategyConfig> {
        let a = &self.axes;
        let base = &self.base;
        // a fixed-percent base swept over ATR multiples starts from 2/6 ATR
        let (stop0, target0) = match base.simulation.exits {
            ExitMode::AtrMultiple {
                stop_mult,
                target_mult,
            } => (stop_mult, target_mult),
            ExitMode::FixedPercent { .. } => (2.0, 6.0),
        };
        let resize_exits = !a.stop_mults.is_empty() || !a.target_mults.is_empty();

        let mtf_modes = axis_or(&a.mtf_modes, base.mtf.clone());
        let thresholds: Vec<Option<f64>> = if a.adx_thresholds.is_empty() {
            vec![base.momentum.as_ref().map(|m| m.threshold)]
        } else {
            a.adx_thresholds
                .iter()
                .map(|&t| (t > 0.0).then_some(t))
                .collect()
        };
        let adx_period = base.momentum.as_ref().map_or(14, |m| m.period);
        let stops = axis_or(&a.stop_mults, stop0);
        let targets = axis_or(&a.target_mults, target0);
        let holds = axis_or(&a.max_hold_bars, base.simulation.max_hold_bars);

        let mut configs = Vec::with_capacity(self.size());
        for mtf in &mtf_modes {
            for threshold in &thresholds {
                for &stop_mult in &stops {
                    for &target_mult in &targets {
                        for &hold in &holds {
                            let mut config = base.clone();
                            config.mtf = mtf.clone();
                            config.momentum = threshold.map(|threshold| MomentumGate {
                                period: adx_period,
                                threshold,
                            });
                            if resize_exits {
                                config.simulation.exits = ExitMode::AtrMultiple {
                                    stop_mult,
                                    target_mult,
                                };
                            }
                            config.simulation.max_hold_bars = hold;
                            configs.push(config);
                        }
                    }
                }
            }
        }
        configs
    }

    /// Validates every grid point, so one bad axis value fails the sweep
    /// before any backtest runs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid().iter().try_for_each(StrategyConfig::validate)
    }
}

fn axis_or<T: Clone>(axis: &[T], base: T) -> Vec<T> {
    if axis.is_empty() {
        vec![base]
    } else {
        axis.to_vec()
    }
}

fn read_config(path: &Path) -> Result<String, ConfigFileError> {
    std::fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
        path: path.to_path_buf(),
        source,
    })
}
