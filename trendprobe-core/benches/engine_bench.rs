//! Criterion benchmarks for TrendProbe hot paths.
//!
//! Benchmarks:
//! 1. Indicator precompute (ATR, EMA, Supertrend, ADX, trailing stop)
//! 2. Higher-timeframe alignment
//! 3. Signal generation with every gate enabled
//! 4. Full pipeline (signals, simulation, analysis)

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use trendprobe_core::align::{align_to_fine, StampConvention};
use trendprobe_core::domain::Bar;
use trendprobe_core::indicators::{
    ema_of_series, Adx, Atr, AtrTrailingStop, Ema, Indicator, Supertrend,
};
use trendprobe_core::signals::{
    HigherTimeframe, MomentumGate, MtfMode, SignalConfig, SignalGenerator, TrendGate, Trigger,
};
use trendprobe_core::simulator::SimConfig;
use trendprobe_core::Pipeline;

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.05).sin() * 10.0 + i as f64 * 0.01;
            let open = close - 0.3;
            Bar::new(
                start + Duration::hours(2 * i as i64),
                open,
                close + 1.5,
                close - 1.5,
                close,
                1_000.0,
            )
        })
        .collect()
}

fn make_htf(bars: &[Bar]) -> Vec<Bar> {
    bars.chunks(4)
        .map(|c| {
            Bar::new(
                c[0].timestamp,
                c[0].open,
                c.iter().map(|b| b.high).fold(f64::MIN, f64::max),
                c.iter().map(|b| b.low).fold(f64::MAX, f64::min),
                c[c.len() - 1].close,
                c.iter().map(|b| b.volume).sum(),
            )
        })
        .collect()
}

fn convention() -> StampConvention {
    StampConvention::OpenTime {
        fine: Duration::hours(2),
        coarse: Duration::hours(8),
    }
}

fn full_config() -> SignalConfig {
    SignalConfig {
        trigger: Trigger::default(),
        trend: Some(TrendGate::EmaCross { fast: 20, slow: 50 }),
        momentum: Some(MomentumGate {
            period: 14,
            threshold: 20.0,
        }),
        mtf: MtfMode::TrendAlign {
            ema_period: 50,
            slope_bars: 5,
        },
        warmup_margin: 1,
    }
}

// ── 1. Indicator Precompute ──────────────────────────────────────────

fn bench_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicator_precompute");

    for &bar_count in &[1_000, 10_000, 50_000] {
        let bars = make_bars(bar_count);

        let stack: Vec<Box<dyn Indicator>> = vec![
            Box::new(Atr::new(14)),
            Box::new(Ema::new(20)),
            Box::new(Ema::new(50)),
            Box::new(Supertrend::new(10, 3.0)),
            Box::new(Adx::new(14)),
            Box::new(AtrTrailingStop::new(10, 2.0)),
        ];
        group.bench_with_input(
            BenchmarkId::new("full_stack_6", bar_count),
            &bar_count,
            |b, _| {
                b.iter(|| {
                    for ind in &stack {
                        black_box(ind.compute(black_box(&bars)));
                    }
                });
            },
        );
    }

    group.finish();
}

// ── 2. Alignment ─────────────────────────────────────────────────────

fn bench_alignment(c: &mut Criterion) {
    let mut group = c.benchmark_group("htf_alignment");

    for &bar_count in &[10_000, 50_000] {
        let bars = make_bars(bar_count);
        let htf = make_htf(&bars);
        let closes: Vec<f64> = htf.iter().map(|b| b.close).collect();
        let ema = ema_of_series(&closes, 50);
        group.bench_with_input(BenchmarkId::new("ema_50", bar_count), &bar_count, |b, _| {
            b.iter(|| align_to_fine(black_box(&bars), black_box(&htf), black_box(&ema), convention()));
        });
    }

    group.finish();
}

// ── 3. Signal Generation ─────────────────────────────────────────────

fn bench_signals(c: &mut Criterion) {
    let mut group = c.benchmark_group("signal_generation");
    let bars = make_bars(20_000);
    let htf_bars = make_htf(&bars);
    let htf = HigherTimeframe::new(&htf_bars, convention());
    let generator = SignalGenerator::new(full_config()).unwrap();

    group.bench_function("all_gates_20000_bars", |b| {
        b.iter(|| generator.generate(black_box(&bars), Some(&htf)).unwrap());
    });

    group.finish();
}

// ── 4. Full Pipeline ─────────────────────────────────────────────────

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");

    for &bar_count in &[5_000, 20_000] {
        let bars = make_bars(bar_count);
        let htf_bars = make_htf(&bars);
        let htf = HigherTimeframe::new(&htf_bars, convention());
        let pipeline = Pipeline::new(full_config(), SimConfig::default()).unwrap();
        group.bench_with_input(
            BenchmarkId::new("trend_align", bar_count),
            &bar_count,
            |b, _| {
                b.iter(|| pipeline.run(black_box(&bars), Some(&htf)).unwrap());
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_indicators,
    bench_alignment,
    bench_signals,
    bench_pipeline
);
criterion_main!(benches);
