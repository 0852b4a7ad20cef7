//! Reporting and export: JSON, CSV, and Markdown artifact generation.
//!
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: trade tape, equity curve, and one-row-per-config sweep tables
//! - **Markdown**: human-readable single-run report
//!
//! Persisted results carry a `schema_version`; newer versions are rejected on
//! load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use trendprobe_core::analysis::PeriodStats;
use trendprobe_core::domain::{EquityPoint, Trade};

use crate::runner::{BacktestResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export a trade list as CSV.
///
/// Columns: direction, entry_bar, entry_time, entry_price, exit_bar,
/// exit_time, exit_price, exit_reason, stop_price, target_price, size, fees,
/// pnl, return_pct, hold_bars, adx_at_entry
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "direction",
        "entry_bar",
        "entry_time",
        "entry_price",
        "exit_bar",
        "exit_time",
        "exit_price",
        "exit_reason",
        "stop_price",
        "target_price",
        "size",
        "fees",
        "pnl",
        "return_pct",
        "hold_bars",
        "adx_at_entry",
    ])?;

    for t in trades {
        wtr.write_record([
            t.direction.as_str().to_string(),
            t.entry_bar.to_string(),
            t.entry_time.to_rfc3339(),
            format!("{:.6}", t.entry_price),
            t.exit_bar.to_string(),
            t.exit_time.to_rfc3339(),
            format!("{:.6}", t.exit_price),
            t.exit_reason.as_str().to_string(),
            format!("{:.6}", t.stop_price),
            format!("{:.6}", t.target_price),
            format!("{:.6}", t.size),
            format!("{:.2}", t.fees),
            format!("{:.2}", t.pnl),
            format!("{:.4}", t.return_pct()),
            t.hold_bars.to_string(),
            t.adx_at_entry.map(|a| format!("{a:.2}")).unwrap_or_default(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export an equity curve as CSV: bar_index, timestamp, equity.
pub fn export_equity_csv(equity_curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["bar_index", "timestamp", "equity"])?;
    for p in equity_curve {
        wtr.write_record([
            p.bar_index.to_string(),
            p.timestamp.to_rfc3339(),
            format!("{:.2}", p.equity),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// One row per result: the sweep table.
pub fn export_sweep_csv<'a>(results: impl IntoIterator<Item = &'a BacktestResult>) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "run_id",
        "label",
        "trades",
        "win_rate",
        "profit_factor",
        "total_pnl",
        "max_drawdown",
        "max_consecutive_losses",
        "profitable_years",
        "final_equity",
        "bankrupt",
    ])?;
    for r in results {
        let (trades, wr, pf, dd, streak, years) = match &r.summary {
            Some(s) => (
                s.total_trades,
                format!("{:.4}", s.win_rate),
                format!("{:.3}", s.profit_factor),
                format!("{:.4}", s.max_drawdown),
                s.max_consecutive_losses,
                format!(
                    "{}/{}",
                    s.yearly.iter().filter(|p| p.pnl > 0.0).count(),
                    s.yearly.len()
                ),
            ),
            None => (0, String::new(), String::new(), String::new(), 0, String::new()),
        };
        wtr.write_record([
            r.run_id.clone(),
            r.config.label(),
            trades.to_string(),
            wr,
            pf,
            format!("{:.2}", r.total_pnl()),
            dd,
            streak.to_string(),
            years,
            format!("{:.2}", r.final_equity),
            r.bankrupt.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single backtest run.
///
/// Creates `{run_id prefix}/` under `output_dir` containing:
/// - `manifest.json`: the full `BacktestResult`
/// - `trades.csv`: trade tape
/// - `equity.csv`: equity after each trade
/// - `report.md`: Markdown report
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let prefix_len = result.run_id.len().min(12);
    let run_dir = output_dir.join(&result.run_id[..prefix_len]);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    write_file(&run_dir.join("manifest.json"), &export_json(result)?)?;
    write_file(&run_dir.join("trades.csv"), &export_trades_csv(&result.trades)?)?;
    write_file(
        &run_dir.join("equity.csv"),
        &export_equity_csv(&result.equity_curve)?,
    )?;
    write_file(&run_dir.join("report.md"), &generate_report(result))?;

    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's manifest.json.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

// ─── Markdown reports ───────────────────────────────────────────────

/// Generate a Markdown report for a single backtest run.
pub fn generate_report(result: &BacktestResult) -> String {
    let mut md = String::with_capacity(2048);

    md.push_str("# Backtest Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Strategy | {} |\n", result.config.name));
    md.push_str(&format!("| Parameters | `{}` |\n", result.config.label()));
    md.push_str(&format!("| Run ID | {} |\n", result.run_id));
    md.push_str(&format!("| Dataset Hash | {} |\n", result.dataset_hash));
    md.push_str(&format!("| Bars | {} |\n", result.bar_count));
    md.push_str(&format!(
        "| Signals | {} ({} rejected) |\n",
        result.signals.len(),
        result.rejected.len()
    ));
    md.push_str(&format!(
        "| Initial Equity | {:.2} |\n",
        result.config.simulation.initial_equity
    ));
    if result.bankrupt {
        md.push_str("| Outcome | **BANKRUPT** |\n");
    }
    md.push('\n');

    let Some(s) = &result.summary else {
        md.push_str("No trades.\n");
        return md;
    };

    md.push_str("## Performance\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Trades | {} |\n", s.total_trades));
    md.push_str(&format!("| Win Rate | {:.1}% |\n", s.win_rate * 100.0));
    md.push_str(&format!("| Profit Factor | {:.2} |\n", s.profit_factor));
    md.push_str(&format!("| Total PnL | {:.2} |\n", s.total_pnl));
    md.push_str(&format!("| Final Equity | {:.2} |\n", s.final_equity));
    md.push_str(&format!("| Max Drawdown | {:.1}% |\n", s.max_drawdown * 100.0));
    md.push_str(&format!(
        "| Max Consecutive Losses | {} |\n",
        s.max_consecutive_losses
    ));
    md.push_str(&format!(
        "| Long / Short | {} ({:.1}%) / {} ({:.1}%) |\n",
        s.long_trades,
        s.long_win_rate * 100.0,
        s.short_trades,
        s.short_win_rate * 100.0
    ));
    md.push_str(&format!(
        "| Avg Win / Avg Loss | {:.2} / {:.2} |\n",
        s.avg_win, s.avg_loss
    ));
    md.push_str(&format!("| Avg Hold (bars) | {:.1} |\n", s.avg_hold_bars));
    md.push_str(&format!(
        "| Exits (stop / target / timeout) | {} / {} / {} |\n",
        s.exits.stop, s.exits.target, s.exits.timeout
    ));
    if let Some(adx) = s.avg_adx_at_entry {
        md.push_str(&format!("| Avg ADX at Entry | {adx:.1} |\n"));
    }
    md.push('\n');

    md.push_str("## Yearly\n\n");
    md.push_str(&period_table(&s.yearly));

    md
}

fn period_table(periods: &[PeriodStats]) -> String {
    let mut md = String::new();
    md.push_str("| Period | Trades | Win Rate | PF | PnL | Long | Short |\n");
    md.push_str("| --- | --- | --- | --- | --- | --- | --- |\n");
    for p in periods {
        md.push_str(&format!(
            "| {} | {} | {:.1}% | {:.2} | {:.2} | {} | {} |\n",
            p.period,
            p.trades,
            p.win_rate * 100.0,
            p.profit_factor,
            p.pnl,
            p.longs,
            p.shorts
        ));
    }
    md.push('\n');
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrategyConfig;
    use crate::data::{synthetic_bars, MarketData};
    use crate::runner::run_backtest;
    use chrono::{Duration, TimeZone, Utc};

    fn sample_result() -> BacktestResult {
        let start = Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap();
        let data = MarketData::new(synthetic_bars(11, 3_000, start, Duration::hours(2)));
        let config = StrategyConfig {
            trend: None,
            momentum: None,
            ..StrategyConfig::default()
        };
        run_backtest(&config, &data).unwrap()
    }

    #[test]
    fn json_round_trip() {
        let result = sample_result();
        let json = export_json(&result).unwrap();
        let loaded = import_json(&json).unwrap();
        assert_eq!(loaded.run_id, result.run_id);
        assert_eq!(loaded.config, result.config);
        assert_eq!(loaded.trades.len(), result.trades.len());
        assert_eq!(loaded.signals.len(), result.signals.len());
        for (a, b) in loaded.trades.iter().zip(&result.trades) {
            assert_eq!(a.entry_bar, b.entry_bar);
            assert!((a.pnl - b.pnl).abs() < 1e-9);
        }
    }

    #[test]
    fn newer_schema_is_rejected() {
        let mut result = sample_result();
        result.schema_version = SCHEMA_VERSION + 1;
        let json = serde_json::to_string(&result).unwrap();
        let err = import_json(&json).unwrap_err();
        assert!(err.to_string().contains("unsupported schema version"));
    }

    #[test]
    fn missing_schema_version_defaults_to_current() {
        let result = sample_result();
        let mut value = serde_json::to_value(&result).unwrap();
        value.as_object_mut().unwrap().remove("schema_version");
        let loaded = import_json(&value.to_string()).unwrap();
        assert_eq!(loaded.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn trades_csv_has_row_per_trade() {
        let result = sample_result();
        let csv = export_trades_csv(&result.trades).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), result.trades.len() + 1);
        assert!(lines[0].starts_with("direction,entry_bar,entry_time"));
    }

    #[test]
    fn equity_csv_has_row_per_point() {
        let result = sample_result();
        let csv = export_equity_csv(&result.equity_curve).unwrap();
        assert_eq!(csv.lines().count(), result.equity_curve.len() + 1);
        assert!(csv.starts_with("bar_index,timestamp,equity"));
    }

    #[test]
    fn report_mentions_key_sections() {
        let result = sample_result();
        let md = generate_report(&result);
        assert!(md.contains("# Backtest Report"));
        assert!(md.contains(&result.run_id));
        if let Some(s) = &result.summary {
            assert!(md.contains("## Yearly"));
            let exits = format!(
                "| Exits (stop / target / timeout) | {} / {} / {} |",
                s.exits.stop, s.exits.target, s.exits.timeout
            );
            assert!(md.contains(&exits));
            assert_eq!(
                s.exits.stop + s.exits.target + s.exits.timeout,
                result.trades.len()
            );
        } else {
            assert!(md.contains("No trades."));
        }
    }
}
