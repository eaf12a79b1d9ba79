//! Candle sources
//!
//! Loads OHLCV data from CSV files, from the CoinDCX public candles endpoint,
//! or from a synthetic random walk for trying the pipeline without a feed.
//! Every source returns candles oldest-first.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;
use tracing::{debug, warn};

use crate::config::{DataConfig, DataSourceKind};
use crate::Candle;

// =============================================================================
// Constants
// =============================================================================

const COINDCX_CANDLES_URL: &str = "https://public.coindcx.com/market_data/candles";

/// Valid intervals for CoinDCX
pub const INTERVALS: &[&str] = &[
    "1m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "8h", "1d", "3d", "1w", "1M",
];

/// Supplies an ordered candle series for a symbol
pub trait CandleSource: Send + Sync {
    /// Up to `limit` most recent candles at `interval`, oldest first
    fn fetch_candles(&self, symbol: &str, interval: &str, limit: usize) -> Result<Vec<Candle>>;
}

/// Length of one bar, e.g. `"5m"` -> 5 minutes. Months are not fixed-length.
pub fn interval_duration(interval: &str) -> Option<Duration> {
    let split = interval.find(|c: char| !c.is_ascii_digit())?;
    let (count, unit) = interval.split_at(split);
    let count: i64 = count.parse().ok()?;

    match unit {
        "m" => Some(Duration::minutes(count)),
        "h" => Some(Duration::hours(count)),
        "d" => Some(Duration::days(count)),
        "w" => Some(Duration::weeks(count)),
        _ => None,
    }
}

fn keep_last(mut candles: Vec<Candle>, limit: usize) -> Vec<Candle> {
    if candles.len() > limit {
        candles.drain(..candles.len() - limit);
    }
    candles
}

/// Build the configured candle source
pub fn create_source(config: &DataConfig) -> Result<Box<dyn CandleSource>> {
    let source: Box<dyn CandleSource> = match config.source {
        DataSourceKind::Coindcx => Box::new(CoinDcxCandleSource::new(StdDuration::from_secs(
            config.timeout_secs,
        ))?),
        DataSourceKind::Csv => Box::new(CsvCandleSource::new(&config.data_dir)),
        DataSourceKind::Demo => Box::new(DemoCandleSource::new()),
    };
    Ok(source)
}

// =============================================================================
// CSV Data Loading
// =============================================================================

/// Load OHLCV data from CSV file
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Candle>> {
    let mut reader = csv::Reader::from_path(path.as_ref())
        .with_context(|| format!("Failed to open CSV file: {}", path.as_ref().display()))?;

    let mut candles = Vec::new();

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;

        let dt_str = record.get(0).context("Missing datetime column")?;
        let datetime = dt_str
            .parse::<DateTime<Utc>>()
            .or_else(|_| {
                // Try parsing without timezone and assume UTC
                chrono::NaiveDateTime::parse_from_str(dt_str, "%Y-%m-%d %H:%M:%S")
                    .map(|ndt| ndt.and_utc())
            })
            .with_context(|| format!("Failed to parse datetime: {}", dt_str))?;

        let field = |idx: usize, name: &str| -> Result<f64> {
            record
                .get(idx)
                .with_context(|| format!("Missing {} column", name))?
                .trim()
                .parse()
                .with_context(|| format!("Failed to parse {} on row {}", name, row_idx + 1))
        };

        candles.push(Candle {
            datetime,
            open: field(1, "open")?,
            high: field(2, "high")?,
            low: field(3, "low")?,
            close: field(4, "close")?,
            volume: field(5, "volume")?,
        });
    }

    Ok(candles)
}

/// Reads `{data_dir}/{symbol}_{interval}.csv`
pub struct CsvCandleSource {
    data_dir: PathBuf,
}

impl CsvCandleSource {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        CsvCandleSource {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, symbol: &str, interval: &str) -> PathBuf {
        self.data_dir.join(format!("{}_{}.csv", symbol, interval))
    }
}

impl CandleSource for CsvCandleSource {
    fn fetch_candles(&self, symbol: &str, interval: &str, limit: usize) -> Result<Vec<Candle>> {
        let path = self.path_for(symbol, interval);
        let candles = load_csv(&path)?;

        let validation = validate_candles(&candles);
        for warning in &validation.warnings {
            warn!("{}: {}", symbol, warning);
        }
        if let Some(first) = validation.errors.first() {
            anyhow::bail!(
                "{} has {} invalid candles ({})",
                path.display(),
                validation.errors.len(),
                first
            );
        }

        Ok(keep_last(candles, limit))
    }
}

// =============================================================================
// CoinDCX
// =============================================================================

/// Fetch recent OHLCV data from the CoinDCX public API
pub struct CoinDcxCandleSource {
    client: reqwest::blocking::Client,
}

#[derive(Debug, serde::Deserialize)]
struct CandleResponse {
    time: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl CoinDcxCandleSource {
    pub fn new(timeout: StdDuration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client })
    }

    /// Convert symbol to CoinDCX pair format: BTCINR -> I-BTC_INR
    pub fn to_pair(symbol: &str) -> String {
        if symbol.contains('-') {
            return symbol.to_string();
        }
        match symbol.strip_suffix("INR") {
            Some(base) => format!("I-{}_INR", base),
            None => format!("I-{}_INR", symbol),
        }
    }
}

impl CandleSource for CoinDcxCandleSource {
    fn fetch_candles(&self, symbol: &str, interval: &str, limit: usize) -> Result<Vec<Candle>> {
        if !INTERVALS.contains(&interval) {
            anyhow::bail!("Unsupported interval for CoinDCX: {}", interval);
        }

        let pair = Self::to_pair(symbol);
        let limit = limit.min(1000);
        let limit_param = limit.to_string();
        debug!("Fetching candles: pair={}, interval={}, limit={}", pair, interval, limit);

        let response = self
            .client
            .get(COINDCX_CANDLES_URL)
            .query(&[
                ("pair", pair.as_str()),
                ("interval", interval),
                ("limit", limit_param.as_str()),
            ])
            .send()
            .with_context(|| format!("Failed to fetch candles for {}", pair))?;

        if !response.status().is_success() {
            anyhow::bail!("CoinDCX API returned status: {}", response.status());
        }

        let raw: Vec<CandleResponse> = response.json().context("Failed to parse candle response")?;
        if raw.is_empty() {
            anyhow::bail!("No candle data returned for {}", pair);
        }

        let mut candles = raw
            .into_iter()
            .map(|c| {
                let datetime = DateTime::from_timestamp_millis(c.time)
                    .with_context(|| format!("Invalid candle time: {}", c.time))?;
                Ok(Candle {
                    datetime,
                    open: c.open,
                    high: c.high,
                    low: c.low,
                    close: c.close,
                    volume: c.volume,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // API returns newest first
        candles.sort_by_key(|c| c.datetime);
        candles.dedup_by_key(|c| c.datetime);

        Ok(keep_last(candles, limit))
    }
}

// =============================================================================
// Demo
// =============================================================================

/// Synthetic candles for exercising the pipeline without a data feed
#[derive(Debug, Clone, Default)]
pub struct DemoCandleSource {
    seed: Option<u64>,
}

impl DemoCandleSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deterministic series per symbol
    pub fn with_seed(seed: u64) -> Self {
        DemoCandleSource { seed: Some(seed) }
    }

    fn rng_for(&self, symbol: &str) -> StdRng {
        match self.seed {
            Some(seed) => {
                let mixed = symbol
                    .bytes()
                    .fold(seed, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
                StdRng::seed_from_u64(mixed)
            }
            None => StdRng::from_entropy(),
        }
    }
}

impl CandleSource for DemoCandleSource {
    fn fetch_candles(&self, symbol: &str, interval: &str, limit: usize) -> Result<Vec<Candle>> {
        let step = interval_duration(interval)
            .with_context(|| format!("Unsupported interval: {}", interval))?;
        let mut rng = self.rng_for(symbol);

        let end = Utc::now();
        let mut price: f64 = 100.0;
        let mut velocity: f64 = 0.0;
        let mut candles = Vec::with_capacity(limit);

        for i in 0..limit {
            velocity = velocity * 0.9 + rng.gen_range(-0.1..0.1);
            let open = price;
            price = (price + velocity).max(1.0);
            let close = (price + rng.gen_range(-0.5..0.5)).max(0.5);
            let high = open.max(close) + rng.gen_range(0.0..1.5);
            let low = (open.min(close) - rng.gen_range(0.0..1.5)).max(0.01);

            candles.push(Candle {
                datetime: end - step * (limit - 1 - i) as i32,
                open,
                high,
                low,
                close,
                volume: rng.gen_range(10..60) as f64,
            });
        }

        Ok(candles)
    }
}

// =============================================================================
// Data Validation
// =============================================================================

/// Validate candle data for consistency
pub fn validate_candles(candles: &[Candle]) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for (i, candle) in candles.iter().enumerate() {
        if let Err(e) = candle.validate() {
            errors.push(format!("Candle {}: {}", i, e));
        }
        if i > 0 && candle.datetime <= candles[i - 1].datetime {
            warnings.push(format!("Candle {}: not chronological", i));
        }
    }

    ValidationResult { errors, warnings }
}

/// Result of data validation
#[derive(Debug)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
