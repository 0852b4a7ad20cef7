//! Signals -> simulation -> analysis in one call.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::{analyze, PerformanceSummary};
use crate::domain::{Bar, Signal};
use crate::error::ConfigError;
use crate::signals::{HigherTimeframe, SignalConfig, SignalGenerator};
use crate::simulator::{SimConfig, SimulationResult, Simulator};

/// Output of one full engine pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub signals: Vec<Signal>,
    pub simulation: SimulationResult,
    pub summary: Option<PerformanceSummary>,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    generator: SignalGenerator,
    simulator: Simulator,
}

impl Pipeline {
    pub fn new(signals: SignalConfig, simulation: SimConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            generator: SignalGenerator::new(signals)?,
            simulator: Simulator::new(simulation)?,
        })
    }

    pub fn run(
        &self,
        bars: &[Bar],
        htf: Option<&HigherTimeframe<'_>>,
    ) -> Result<PipelineOutput, ConfigError> {
        let signals = self.generator.generate(bars, htf)?;
        let simulation = self.simulator.run(bars, &signals);
        let summary = analyze(&simulation.trades, self.simulator.config().initial_equity);
        debug!(
            signals = signals.len(),
            trades = simulation.trades.len(),
            rejected = simulation.rejected.len(),
            "pipeline finished"
        );
        Ok(PipelineOutput {
            signals,
            simulation,
            summary,
        })
    }
}
