//! Technical indicators
//!
//! Causal indicator math over an oldest-first candle series. Smoothing is
//! delegated to the `ta` crate's exponential moving average; everything that
//! needs a full lookback window reports `None` until the window is filled.

use serde::{Deserialize, Serialize};
use ta::indicators::ExponentialMovingAverage;
use ta::Next;

use crate::Candle;

// =============================================================================
// Parameters
// =============================================================================

/// Lookback lengths and thresholds for the indicator frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorParams {
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub rsi_length: usize,
    pub atr_length: usize,
    pub atr_baseline_window: usize,
    pub atr_spike_multiplier: f64,
    pub volume_lookback: usize,
    pub volume_spike_multiplier: f64,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        IndicatorParams {
            ema_fast: 9,
            ema_slow: 21,
            rsi_length: 5,
            atr_length: 14,
            atr_baseline_window: 14,
            atr_spike_multiplier: 1.2,
            volume_lookback: 10,
            volume_spike_multiplier: 1.5,
        }
    }
}

// =============================================================================
// Smoothing
// =============================================================================

/// Exponential smoothing with factor `alpha`, seeded with the first value.
///
/// `ta`'s EMA uses `k = 2 / (period + 1)`, so a Wilder-style factor `1/n`
/// maps onto an EMA period of `2n - 1`.
fn smooth(values: &[f64], period: usize) -> Vec<f64> {
    let mut indicator = match ExponentialMovingAverage::new(period) {
        Ok(i) => i,
        Err(_) => return values.to_vec(),
    };

    values.iter().map(|&v| indicator.next(v)).collect()
}

fn wilder_period(length: usize) -> usize {
    (2 * length).saturating_sub(1).max(1)
}

/// Calculate Exponential Moving Average
///
/// `alpha = 2 / (span + 1)`, `ema[0] = values[0]`. Defined for every bar.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    if values.is_empty() {
        return vec![];
    }
    smooth(values, span.max(1))
}

/// Trailing arithmetic mean over `i + 1 - window ..= i`.
///
/// `None` until the window fills, or if any value inside it is undefined.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let mut result = Vec::with_capacity(values.len());

    for i in 0..values.len() {
        if window == 0 || i + 1 < window {
            result.push(None);
            continue;
        }

        let slice = &values[i + 1 - window..=i];
        let sum: Option<f64> = slice.iter().copied().sum();
        result.push(sum.map(|s| s / window as f64));
    }

    result
}

// =============================================================================
// Momentum
// =============================================================================

/// Calculate RSI with zero-warm-up Wilder smoothing.
///
/// Up/down moves are smoothed with `alpha = 1/length`, seeded with the first
/// delta rather than a simple average. Bar 0 has no delta and is `None`.
/// A series with gains and no losses reads 100; a series with neither is
/// undefined.
pub fn rsi(values: &[f64], length: usize) -> Vec<Option<f64>> {
    if values.is_empty() {
        return vec![];
    }

    let (ups, downs): (Vec<f64>, Vec<f64>) = values
        .windows(2)
        .map(|w| {
            let delta = w[1] - w[0];
            (delta.max(0.0), (-delta).max(0.0))
        })
        .unzip();

    let period = wilder_period(length);
    let avg_up = smooth(&ups, period);
    let avg_down = smooth(&downs, period);

    let mut result = Vec::with_capacity(values.len());
    result.push(None);

    for (&up, &down) in avg_up.iter().zip(avg_down.iter()) {
        let value = if down == 0.0 {
            if up > 0.0 {
                Some(100.0)
            } else {
                None
            }
        } else {
            let rs = up / down;
            Some(100.0 - 100.0 / (1.0 + rs))
        };
        result.push(value.filter(|v| v.is_finite()));
    }

    result
}

// =============================================================================
// Volatility
// =============================================================================

/// Calculate True Range
pub fn true_range(candles: &[Candle]) -> Vec<f64> {
    let mut tr = Vec::with_capacity(candles.len());

    for (i, c) in candles.iter().enumerate() {
        let tr_value = if i == 0 {
            c.high - c.low
        } else {
            let prev_close = candles[i - 1].close;
            let hl = c.high - c.low;
            let hc = (c.high - prev_close).abs();
            let lc = (c.low - prev_close).abs();
            hl.max(hc).max(lc)
        };
        tr.push(tr_value);
    }

    tr
}

/// Calculate Average True Range (Wilder smoothing, seeded with the first TR)
pub fn atr(candles: &[Candle], length: usize) -> Vec<f64> {
    let tr = true_range(candles);
    if tr.is_empty() {
        return tr;
    }
    smooth(&tr, wilder_period(length))
}

// =============================================================================
// Volume
// =============================================================================

/// Flag bars whose volume exceeds `multiplier` times the trailing mean.
///
/// The mean at bar `i` includes bar `i` itself; bars before the window fills
/// never spike. Returns `(baseline, spike)`.
pub fn volume_spike(volumes: &[f64], lookback: usize, multiplier: f64) -> (Vec<Option<f64>>, Vec<bool>) {
    let as_options: Vec<Option<f64>> = volumes.iter().map(|&v| Some(v)).collect();
    let baseline = rolling_mean(&as_options, lookback);
    let spike = volumes
        .iter()
        .zip(baseline.iter())
        .map(|(&v, mean)| greater(Some(v), mean.map(|m| m * multiplier)))
        .collect();

    (baseline, spike)
}

// =============================================================================
// Undefined-aware comparisons
// =============================================================================

/// `a > b`, false when either side is undefined or NaN
pub fn greater(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a > b)
}

/// `a <= b`, false when either side is undefined or NaN
pub fn less_or_equal(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a <= b)
}

// =============================================================================
// Indicator Frame
// =============================================================================

/// One candle extended with its derived indicator values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorRow {
    pub candle: Candle,
    pub ema_fast: Option<f64>,
    pub ema_slow: Option<f64>,
    pub rsi_fast: Option<f64>,
    pub atr: Option<f64>,
    pub atr_baseline: Option<f64>,
    pub atr_spike: bool,
    pub vol_baseline: Option<f64>,
    pub vol_spike: bool,
}

/// Candle series with one indicator row per input candle, same order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndicatorFrame {
    pub rows: Vec<IndicatorRow>,
}

impl IndicatorFrame {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last(&self) -> Option<&IndicatorRow> {
        self.rows.last()
    }

    /// The last two rows as `(prev, last)`
    pub fn last_pair(&self) -> Option<(&IndicatorRow, &IndicatorRow)> {
        match self.rows.as_slice() {
            [.., prev, last] => Some((prev, last)),
            _ => None,
        }
    }
}

/// Build the indicator frame with the default parameters
pub fn compute_all(candles: &[Candle]) -> IndicatorFrame {
    compute_with(candles, &IndicatorParams::default())
}

/// Build the indicator frame
pub fn compute_with(candles: &[Candle], params: &IndicatorParams) -> IndicatorFrame {
    let close: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let volume: Vec<f64> = candles.iter().map(|c| c.volume).collect();

    let ema_fast = ema(&close, params.ema_fast);
    let ema_slow = ema(&close, params.ema_slow);
    let rsi_fast = rsi(&close, params.rsi_length);

    let atr_values: Vec<Option<f64>> = atr(candles, params.atr_length)
        .into_iter()
        .map(Some)
        .collect();
    let atr_baseline = rolling_mean(&atr_values, params.atr_baseline_window);

    let (vol_baseline, vol_spike) =
        volume_spike(&volume, params.volume_lookback, params.volume_spike_multiplier);

    let rows = candles
        .iter()
        .enumerate()
        .map(|(i, candle)| {
            let atr_spike = greater(
                atr_values[i],
                atr_baseline[i].map(|b| b * params.atr_spike_multiplier),
            );
            IndicatorRow {
                candle: candle.clone(),
                ema_fast: Some(ema_fast[i]).filter(|v| v.is_finite()),
                ema_slow: Some(ema_slow[i]).filter(|v| v.is_finite()),
                rsi_fast: rsi_fast[i],
                atr: atr_values[i],
                atr_baseline: atr_baseline[i],
                atr_spike,
                vol_baseline: vol_baseline[i],
                vol_spike: vol_spike[i],
            }
        })
        .collect();

    IndicatorFrame { rows }
}
