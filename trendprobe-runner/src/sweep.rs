//! Parameter sweeps over a `SweepConfig` grid.
//!
//! Every grid point is an independent backtest over the same immutable
//! market data, so the grid maps onto rayon's `par_iter` with nothing shared
//! but `&MarketData`. Results come back in grid order either way.

use std::collections::HashMap;

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::info;

use crate::config::{StrategyConfig, SweepConfig};
use crate::data::MarketData;
use crate::runner::{run_backtest, BacktestResult};

/// Parameter sweep executor.
#[derive(Debug, Clone, Copy)]
pub struct ParamSweep {
    parallel: bool,
}

impl Default for ParamSweep {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamSweep {
    pub fn new() -> Self {
        Self { parallel: true }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Executes a sweep over every grid point.
    pub fn sweep(&self, sweep: &SweepConfig, data: &MarketData) -> Result<SweepResults> {
        self.sweep_with_progress(sweep, data, |_, _, _| {})
    }

    /// Executes a sweep, calling `progress(index, total, result)` as each
    /// backtest completes. With parallelism on, calls arrive in completion
    /// order, not grid order.
    pub fn sweep_with_progress<F>(
        &self,
        sweep: &SweepConfig,
        data: &MarketData,
        progress: F,
    ) -> Result<SweepResults>
    where
        F: Fn(usize, usize, &BacktestResult) + Send + Sync,
    {
        let configs = sweep.grid();
        let total = configs.len();
        let run_one = |(idx, config): (usize, &StrategyConfig)| -> Result<BacktestResult> {
            let result = run_backtest(config, data)
                .with_context(|| format!("grid point {idx} ({})", config.label()))?;
            progress(idx, total, &result);
            Ok(result)
        };

        let results: Vec<BacktestResult> = if self.parallel {
            configs
                .par_iter()
                .enumerate()
                .map(run_one)
                .collect::<Result<Vec<_>>>()?
        } else {
            configs
                .iter()
                .enumerate()
                .map(run_one)
                .collect::<Result<Vec<_>>>()?
        };

        let with_trades = results.iter().filter(|r| !r.trades.is_empty()).count();
        info!(
            configs = total,
            with_trades,
            parallel = self.parallel,
            "sweep complete"
        );
        Ok(SweepResults::new(results))
    }
}

/// Run a sweep in parallel with default settings.
pub fn run_sweep(sweep: &SweepConfig, data: &MarketData) -> Result<SweepResults> {
    ParamSweep::new().sweep(sweep, data)
}

/// Results from a parameter sweep, in grid order.
#[derive(Debug, Clone)]
pub struct SweepResults {
    results: Vec<BacktestResult>,
    by_run_id: HashMap<String, usize>,
}

impl SweepResults {
    fn new(results: Vec<BacktestResult>) -> Self {
        let by_run_id = results
            .iter()
            .enumerate()
            .map(|(i, r)| (r.run_id.clone(), i))
            .collect();
        Self { results, by_run_id }
    }

    /// Returns all results as a slice.
    pub fn all(&self) -> &[BacktestResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Gets a result by RunId.
    pub fn get(&self, run_id: &str) -> Option<&BacktestResult> {
        self.by_run_id.get(run_id).map(|&i| &self.results[i])
    }

    pub fn into_vec(self) -> Vec<BacktestResult> {
        self.results
    }
}
