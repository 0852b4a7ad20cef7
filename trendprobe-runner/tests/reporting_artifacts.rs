//! Artifact bundle tests: write to a temp dir, read back.

use chrono::{Duration, TimeZone, Utc};
use trendprobe_runner::export::{export_sweep_csv, generate_report};
use trendprobe_runner::{
    load_artifacts, run_backtest, run_sweep, save_artifacts, synthetic_bars, MarketData,
    StrategyConfig, SweepAxes, SweepConfig,
};

fn data() -> MarketData {
    let start = Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap();
    MarketData::new(synthetic_bars(77, 4_000, start, Duration::hours(2)))
}

#[test]
fn save_and_load_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_backtest(&StrategyConfig::default(), &data()).unwrap();

    let run_dir = save_artifacts(&result, dir.path()).unwrap();
    for name in ["manifest.json", "trades.csv", "equity.csv", "report.md"] {
        assert!(run_dir.join(name).exists(), "{name} missing");
    }
    assert!(run_dir.ends_with(&result.run_id[..12]));

    let loaded = load_artifacts(&run_dir).unwrap();
    assert_eq!(loaded.run_id, result.run_id);
    assert_eq!(loaded.trades.len(), result.trades.len());
    assert_eq!(loaded.config, result.config);

    let report = std::fs::read_to_string(run_dir.join("report.md")).unwrap();
    assert_eq!(report, generate_report(&result));
}

#[test]
fn load_from_missing_dir_fails() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_artifacts(&dir.path().join("absent")).unwrap_err();
    assert!(err.to_string().contains("manifest.json"));
}

#[test]
fn sweep_table_has_row_per_config() {
    let sweep = SweepConfig {
        base: StrategyConfig::default(),
        axes: SweepAxes {
            max_hold_bars: vec![20, 40, 60],
            ..SweepAxes::default()
        },
    };
    let results = run_sweep(&sweep, &data()).unwrap();
    let csv = export_sweep_csv(results.all()).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("run_id,label,trades"));
    assert!(lines[1].contains("hold20"));
    assert!(lines[3].contains("hold60"));
}
