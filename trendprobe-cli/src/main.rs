//! TrendProbe CLI: run, sweep, and synthetic-data commands.
//!
//! Commands:
//! - `run`: backtest one strategy config on a bar CSV
//! - `sweep`: evaluate a parameter grid in parallel and print the ranking
//! - `synth`: write a deterministic synthetic bar CSV
//!
//! Logging goes to stderr through `tracing`; set `RUST_LOG` to override the
//! default `info` filter.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use trendprobe_runner::data::{parse_interval, write_bars_csv};
use trendprobe_runner::export::export_sweep_csv;
use trendprobe_runner::{
    consistent, load_bars_csv, rank, run_backtest, save_artifacts, synthetic_bars, BacktestResult,
    Consistency, MarketData, ParamSweep, RankingCriteria, StrategyConfig, SweepConfig,
};

#[derive(Parser)]
#[command(
    name = "trendprobe",
    about = "TrendProbe CLI: trend-signal research and backtesting"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where the bars come from.
#[derive(Args)]
struct DataArgs {
    /// Bar CSV (timestamp,open,high,low,close,volume).
    #[arg(long)]
    bars: PathBuf,

    /// Higher-timeframe bar CSV.
    #[arg(long)]
    htf: Option<PathBuf>,

    /// Higher-timeframe interval (e.g. 1d, 8h). Without --htf the bars are
    /// resampled to it; with --htf it is the file's bar length, required when
    /// the file has a single row.
    #[arg(long)]
    htf_interval: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest one strategy.
    Run {
        #[command(flatten)]
        data: DataArgs,

        /// Strategy TOML. Defaults to the reference strategy.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory for artifacts.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Sweep a parameter grid.
    Sweep {
        #[command(flatten)]
        data: DataArgs,

        /// Sweep TOML: a [base] strategy plus [axes].
        #[arg(long)]
        sweep: PathBuf,

        /// Number of ranked configs to print.
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Minimum trades for a config to be ranked.
        #[arg(long, default_value_t = 10)]
        min_trades: usize,

        /// Run grid points one at a time.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Write the full sweep table as CSV.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Write synthetic bars as CSV.
    Synth {
        /// Output CSV path.
        #[arg(long)]
        out: PathBuf,

        /// Number of bars.
        #[arg(long, default_value_t = 5_000)]
        bars: usize,

        /// RNG seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Bar interval (<n>m, <n>h or <n>d).
        #[arg(long, default_value = "2h")]
        interval: String,

        /// First bar timestamp (RFC 3339).
        #[arg(long, default_value = "2020-01-01T00:00:00Z")]
        start: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { data, config, out } => run_cmd(&data, config.as_deref(), out.as_deref()),
        Commands::Sweep {
            data,
            sweep,
            top,
            min_trades,
            sequential,
            out,
        } => sweep_cmd(&data, &sweep, top, min_trades, sequential, out.as_deref()),
        Commands::Synth {
            out,
            bars,
            seed,
            interval,
            start,
        } => synth_cmd(&out, bars, seed, &interval, &start),
    }
}

fn load_market(args: &DataArgs) -> Result<MarketData> {
    let bars = load_bars_csv(&args.bars)?;
    let data = MarketData::new(bars);
    let data = match (&args.htf, &args.htf_interval) {
        (Some(path), Some(interval)) => {
            data.with_htf_interval(load_bars_csv(path)?, parse_interval(interval)?)?
        }
        (Some(path), None) => data.with_htf(load_bars_csv(path)?)?,
        (None, Some(interval)) => data.with_resampled_htf(parse_interval(interval)?)?,
        (None, None) => data,
    };
    Ok(data)
}

fn run_cmd(args: &DataArgs, config: Option<&Path>, out: Option<&Path>) -> Result<()> {
    let config = match config {
        Some(path) => StrategyConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => StrategyConfig::default(),
    };
    let data = load_market(args)?;
    if !config.mtf.is_none() && data.htf.is_none() {
        bail!(
            "mtf mode '{}' needs --htf or --htf-interval",
            config.mtf.label()
        );
    }

    let result = run_backtest(&config, &data)?;
    print_summary(&result);

    if let Some(dir) = out {
        let run_dir = save_artifacts(&result, dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn sweep_cmd(
    args: &DataArgs,
    sweep_path: &Path,
    top: usize,
    min_trades: usize,
    sequential: bool,
    out: Option<&Path>,
) -> Result<()> {
    let sweep = SweepConfig::from_file(sweep_path)
        .with_context(|| format!("loading {}", sweep_path.display()))?;
    let data = load_market(args)?;
    println!("Sweeping {} configurations...", sweep.size());

    let results = ParamSweep::new()
        .with_parallelism(!sequential)
        .sweep(&sweep, &data)?;

    let criteria = RankingCriteria {
        min_trades,
        ..RankingCriteria::default()
    };
    let ranked = rank(results.all(), &criteria);
    println!();
    println!(
        "=== Ranking: PF > {:.1}, trades >= {} ({} of {}) ===",
        criteria.min_profit_factor,
        criteria.min_trades,
        ranked.len(),
        results.len()
    );
    print_table(ranked.iter().take(top).copied());

    let every_year = consistent(results.all(), Consistency::AllYears);
    println!();
    println!("=== Profitable every year ({}) ===", every_year.len());
    print_table(every_year.iter().take(top).copied());

    if let Some(path) = out {
        let csv = export_sweep_csv(results.all())?;
        std::fs::write(path, csv).with_context(|| format!("writing {}", path.display()))?;
        println!();
        println!("Sweep table saved to: {}", path.display());
    }
    Ok(())
}

fn synth_cmd(out: &Path, n: usize, seed: u64, interval: &str, start: &str) -> Result<()> {
    let interval = parse_interval(interval)?;
    let start: DateTime<Utc> = DateTime::parse_from_rfc3339(start)
        .with_context(|| format!("invalid --start '{start}'"))?
        .with_timezone(&Utc);
    let bars = synthetic_bars(seed, n, start, interval);
    let file =
        std::fs::File::create(out).with_context(|| format!("creating {}", out.display()))?;
    write_bars_csv(file, &bars)?;
    println!("Wrote {} bars to {}", bars.len(), out.display());
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    println!();
    println!("=== Backtest Result ===");
    println!("Strategy:       {}", result.config.name);
    println!("Parameters:     {}", result.config.label());
    println!("Run ID:         {}", result.run_id);
    println!("Bars:           {}", result.bar_count);
    println!(
        "Signals:        {} ({} rejected)",
        result.signals.len(),
        result.rejected.len()
    );
    println!("Trades:         {}", result.trades.len());

    let Some(s) = &result.summary else {
        println!();
        println!("No trades.");
        return;
    };
    println!();
    println!("--- Performance ---");
    println!("Total PnL:      {:.2}", s.total_pnl);
    println!("Final Equity:   {:.2}", s.final_equity);
    println!("Win Rate:       {:.1}%", s.win_rate * 100.0);
    println!("Profit Factor:  {:.2}", s.profit_factor);
    println!("Max Drawdown:   {:.2}%", s.max_drawdown * 100.0);
    println!("Max Consec Loss:{}", s.max_consecutive_losses);
    println!(
        "Long / Short:   {} ({:.1}%) / {} ({:.1}%)",
        s.long_trades,
        s.long_win_rate * 100.0,
        s.short_trades,
        s.short_win_rate * 100.0
    );
    println!("Avg Win / Loss: {:.2} / {:.2}", s.avg_win, s.avg_loss);
    println!("Avg Hold:       {:.1} bars", s.avg_hold_bars);
    println!(
        "Exits:          stop {} / target {} / timeout {}",
        s.exits.stop, s.exits.target, s.exits.timeout
    );

    println!();
    println!("--- Yearly ---");
    for y in &s.yearly {
        println!(
            "{}  trades {:>4}  wr {:>5.1}%  pf {:>6.2}  pnl {:>10.2}  L/S {}/{}",
            y.period,
            y.trades,
            y.win_rate * 100.0,
            y.profit_factor,
            y.pnl,
            y.longs,
            y.shorts
        );
    }
    if result.bankrupt {
        println!();
        println!("WARNING: equity reached zero; simulation stopped early");
    }
    println!();
}

fn print_table<'a>(rows: impl Iterator<Item = &'a BacktestResult>) {
    println!(
        "{:<4} {:>6} {:>6} {:>7} {:>10} {:>7} {:>6}  config",
        "#", "trades", "wr%", "pf", "pnl", "mdd%", "years"
    );
    for (i, r) in rows.enumerate() {
        let Some(s) = &r.summary else { continue };
        let years = format!(
            "{}/{}",
            s.yearly.iter().filter(|p| p.pnl > 0.0).count(),
            s.yearly.len()
        );
        println!(
            "{:<4} {:>6} {:>6.1} {:>7.2} {:>10.2} {:>7.1} {:>6}  {}",
            i + 1,
            s.total_trades,
            s.win_rate * 100.0,
            s.profit_factor,
            s.total_pnl,
            s.max_drawdown * 100.0,
            years,
            r.config.label()
        );
    }
}
