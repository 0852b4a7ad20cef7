//! Signal generation: trigger events filtered through the configured gates.

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::{Bar, Direction, Signal};
use crate::error::ConfigError;
use crate::indicators::{compute_trailing_stop, Supertrend};

use super::config::{SignalConfig, Trigger};
use super::gates::{momentum_gates, mtf_gates, trend_gates, HigherTimeframe};

/// Trigger events plus the series recorded alongside each signal.
#[derive(Debug, Clone)]
pub struct TriggerSeries {
    pub events: Vec<Option<Direction>>,
    pub atr: Vec<Option<f64>>,
    pub aux: Vec<(&'static str, Vec<Option<f64>>)>,
}

impl Trigger {
    pub fn evaluate(&self, bars: &[Bar]) -> TriggerSeries {
        match *self {
            Trigger::Supertrend {
                atr_period,
                multiplier,
                smoothing,
            } => {
                let series = Supertrend::with_smoothing(atr_period, multiplier, smoothing).series(bars);
                let up = series.states.iter().map(|s| s.map(|s| s.up)).collect();
                let dn = series.states.iter().map(|s| s.map(|s| s.dn)).collect();
                TriggerSeries {
                    events: series.flips(),
                    atr: series.atr,
                    aux: vec![("supertrend_up", up), ("supertrend_dn", dn)],
                }
            }
            Trigger::TrailingStop {
                atr_period,
                key_value,
            } => {
                let series = compute_trailing_stop(bars, atr_period, key_value);
                TriggerSeries {
                    events: series.crossings(bars),
                    atr: series.atr,
                    aux: vec![("trailing_stop", series.stop)],
                }
            }
        }
    }
}

/// Turns a bar series into an ordered signal list.
#[derive(Debug, Clone)]
pub struct SignalGenerator {
    config: SignalConfig,
}

impl SignalGenerator {
    pub fn new(config: SignalConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// Scan from the warm-up index and emit at most one signal per bar, in
    /// increasing bar order. `htf` is required unless the MTF mode is `none`.
    pub fn generate(
        &self,
        bars: &[Bar],
        htf: Option<&HigherTimeframe<'_>>,
    ) -> Result<Vec<Signal>, ConfigError> {
        let mtf = mtf_gates(&self.config.mtf, bars, htf)?;
        let trend = trend_gates(self.config.trend.as_ref(), bars);
        let (momentum, adx) = momentum_gates(self.config.momentum.as_ref(), bars);
        let trigger = self.config.trigger.evaluate(bars);

        let start = self.config.min_start_index();
        let mut signals = Vec::new();

        for i in start..bars.len() {
            let Some(direction) = trigger.events[i] else {
                continue;
            };
            let bar = &bars[i];
            if bar.is_void() {
                continue;
            }
            let gate = trend[i].and(momentum[i]).and(mtf[i]);
            if !gate.allows(direction) {
                continue;
            }

            let mut aux = BTreeMap::new();
            if let Some(adx) = adx.as_ref().and_then(|a| a[i]) {
                aux.insert("adx".to_string(), adx);
            }
            for (key, series) in &trigger.aux {
                if let Some(v) = series[i] {
                    aux.insert((*key).to_string(), v);
                }
            }

            signals.push(Signal {
                bar_index: i,
                timestamp: bar.timestamp,
                direction,
                reference_price: bar.close,
                atr_at_signal: trigger.atr[i],
                aux,
            });
        }

        debug!(
            bars = bars.len(),
            start,
            signals = signals.len(),
            mtf = self.config.mtf.label(),
            "signals generated"
        );
        Ok(signals)
    }
}
