//! Bar loading, resampling, and synthetic data for the runner.
//!
//! CSV input has a header row `timestamp,open,high,low,close,volume`.
//! Timestamps are RFC 3339, `%Y-%m-%d %H:%M:%S` or `%Y-%m-%d` (all UTC) and
//! mark the bar's open instant. Loaded series must be strictly increasing;
//! bars with inconsistent OHLC values are kept but logged.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use trendprobe_core::align::StampConvention;
use trendprobe_core::domain::Bar;
use trendprobe_core::signals::HigherTimeframe;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: cannot parse timestamp '{value}'")]
    Timestamp { row: usize, value: String },

    #[error("row {row}: timestamp {timestamp} does not follow {previous}")]
    NonIncreasing {
        row: usize,
        timestamp: DateTime<Utc>,
        previous: DateTime<Utc>,
    },

    #[error("no bars in input")]
    Empty,

    #[error("invalid interval '{0}' (expected <n>m, <n>h or <n>d)")]
    Interval(String),

    #[error("cannot infer the {0} bar interval from fewer than two bars")]
    UnknownInterval(&'static str),
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

/// Load a bar series from a CSV file.
pub fn load_bars_csv(path: &Path) -> Result<Vec<Bar>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let bars = read_bars_csv(file)?;
    debug!(path = %path.display(), bars = bars.len(), "loaded bars");
    Ok(bars)
}

/// Parse a bar series from any CSV reader.
pub fn read_bars_csv<R: std::io::Read>(reader: R) -> Result<Vec<Bar>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars: Vec<Bar> = Vec::new();
    let mut insane = 0usize;

    for (i, record) in rdr.deserialize::<CsvRow>().enumerate() {
        let row = record?;
        // 1-based data row, header excluded
        let row_no = i + 1;
        let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| LoadError::Timestamp {
            row: row_no,
            value: row.timestamp.clone(),
        })?;
        if let Some(prev) = bars.last() {
            if timestamp <= prev.timestamp {
                return Err(LoadError::NonIncreasing {
                    row: row_no,
                    timestamp,
                    previous: prev.timestamp,
                });
            }
        }
        let bar = Bar::new(timestamp, row.open, row.high, row.low, row.close, row.volume);
        if !bar.is_sane() {
            insane += 1;
        }
        bars.push(bar);
    }

    if bars.is_empty() {
        return Err(LoadError::Empty);
    }
    if insane > 0 {
        warn!(
            insane,
            total = bars.len(),
            "bars with inconsistent OHLC values (kept as-is)"
        );
    }
    Ok(bars)
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Write a bar series as CSV with RFC 3339 timestamps.
pub fn write_bars_csv<W: std::io::Write>(writer: W, bars: &[Bar]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["timestamp", "open", "high", "low", "close", "volume"])?;
    for b in bars {
        wtr.write_record([
            b.timestamp.to_rfc3339(),
            b.open.to_string(),
            b.high.to_string(),
            b.low.to_string(),
            b.close.to_string(),
            b.volume.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Parse `<n>m`, `<n>h` or `<n>d` into a positive duration.
pub fn parse_interval(s: &str) -> Result<Duration, LoadError> {
    let bad = || LoadError::Interval(s.to_string());
    let s = s.trim();
    let (split, _) = s.char_indices().last().ok_or_else(bad)?;
    let (count, unit) = s.split_at(split);
    let n: i64 = count.parse().map_err(|_| bad())?;
    if n <= 0 {
        return Err(bad());
    }
    match unit {
        "m" => Ok(Duration::minutes(n)),
        "h" => Ok(Duration::hours(n)),
        "d" => Ok(Duration::days(n)),
        _ => Err(bad()),
    }
}

/// Smallest positive spacing between consecutive bars.
pub fn infer_interval(bars: &[Bar]) -> Option<Duration> {
    bars.windows(2)
        .map(|w| w[1].timestamp - w[0].timestamp)
        .filter(|d| *d > Duration::zero())
        .min()
}

/// Bucket a series into fixed intervals aligned to the Unix epoch.
///
/// Each bucket takes the first open, max high, min low, last close and summed
/// volume of its bars, and is stamped with its open instant. Empty buckets are
/// dropped. A non-positive interval returns the input unchanged.
pub fn resample(bars: &[Bar], interval: Duration) -> Vec<Bar> {
    let secs = interval.num_seconds();
    if secs <= 0 {
        return bars.to_vec();
    }

    let mut out: Vec<Bar> = Vec::new();
    for bar in bars {
        let offset = bar.timestamp.timestamp().rem_euclid(secs);
        let bucket = bar.timestamp - Duration::seconds(offset);
        match out.last_mut() {
            Some(cur) if cur.timestamp == bucket => {
                cur.high = cur.high.max(bar.high);
                cur.low = cur.low.min(bar.low);
                cur.close = bar.close;
                cur.volume += bar.volume;
            }
            _ => out.push(Bar::new(
                bucket, bar.open, bar.high, bar.low, bar.close, bar.volume,
            )),
        }
    }
    out
}

/// Deterministic random-walk bars for demos and tests.
///
/// The drift switches regime every few hundred bars so the series contains
/// trends for the signal generator to find. Same seed, same bars.
pub fn synthetic_bars(seed: u64, n: usize, start: DateTime<Utc>, interval: Duration) -> Vec<Bar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed_bytes = blake3::hash(&seed.to_le_bytes());
    let mut rng = StdRng::from_seed(*seed_bytes.as_bytes());

    let mut bars = Vec::with_capacity(n);
    let mut price = 100.0_f64;
    let mut drift = 0.0_f64;
    let mut regime_left = 0usize;

    for i in 0..n {
        if regime_left == 0 {
            drift = rng.gen_range(-0.002..0.002);
            regime_left = rng.gen_range(100..400);
        }
        regime_left -= 1;

        let ret: f64 = drift + rng.gen_range(-0.01..0.01);
        let open = price;
        let close = (price * (1.0 + ret)).max(0.01);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.006));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.006));
        let volume = rng.gen_range(100.0..10_000.0);

        bars.push(Bar::new(
            start + interval * i as i32,
            open,
            high,
            low,
            close,
            volume,
        ));
        price = close;
    }
    bars
}

/// Deterministic BLAKE3 hash over every field of every bar.
pub fn dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(&bar.timestamp.timestamp_millis().to_le_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// The signal series plus an optional higher-timeframe series, both stamped
/// at bar open.
#[derive(Debug, Clone)]
pub struct MarketData {
    pub bars: Vec<Bar>,
    pub htf: Option<Vec<Bar>>,
    pub dataset_hash: String,
    convention: StampConvention,
}

impl MarketData {
    pub fn new(bars: Vec<Bar>) -> Self {
        let dataset_hash = dataset_hash(&bars);
        Self {
            bars,
            htf: None,
            dataset_hash,
            convention: StampConvention::CloseTime,
        }
    }

    /// Attach a coarse series; both intervals are inferred from the data.
    ///
    /// Fails when either series has fewer than two bars, since a bar stamped
    /// at its open cannot be placed at its close without knowing its length.
    pub fn with_htf(self, htf: Vec<Bar>) -> Result<Self, LoadError> {
        let coarse = infer_interval(&htf).ok_or(LoadError::UnknownInterval("higher-timeframe"))?;
        self.with_htf_interval(htf, coarse)
    }

    /// Attach a coarse series whose bars span `coarse`.
    pub fn with_htf_interval(mut self, htf: Vec<Bar>, coarse: Duration) -> Result<Self, LoadError> {
        if coarse <= Duration::zero() {
            return Err(LoadError::Interval(format!("{}s", coarse.num_seconds())));
        }
        let fine = infer_interval(&self.bars).ok_or(LoadError::UnknownInterval("signal"))?;
        self.convention = StampConvention::OpenTime { fine, coarse };
        self.htf = Some(htf);
        Ok(self)
    }

    /// Attach a coarse series built by resampling the signal bars.
    pub fn with_resampled_htf(self, interval: Duration) -> Result<Self, LoadError> {
        let htf = resample(&self.bars, interval);
        self.with_htf_interval(htf, interval)
    }

    pub fn higher_timeframe(&self) -> Option<HigherTimeframe<'_>> {
        self.htf
            .as_deref()
            .map(|bars| HigherTimeframe::new(bars, self.convention))
    }

    pub fn convention(&self) -> StampConvention {
        self.convention
    }
}
