//! Momentum breakout detection
//!
//! Evaluates the composite breakout rule on the most recent bar:
//!
//! ```text
//! signal = (ema_cross || price_above_emas) && rsi_burst && vol_spike && atr_spike
//! ```
//!
//! Any undefined indicator makes the predicates it takes part in false.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::indicators::{self, greater, less_or_equal, IndicatorFrame, IndicatorParams};
use crate::{Candle, SignalReport};

/// Minimum number of bars needed before a signal is evaluated
pub const MIN_BARS: usize = 30;

/// Detector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    pub min_bars: usize,
    pub rsi_threshold: f64,
    #[serde(flatten)]
    pub indicators: IndicatorParams,
}

impl Default for DetectorParams {
    fn default() -> Self {
        DetectorParams {
            min_bars: MIN_BARS,
            rsi_threshold: 55.0,
            indicators: IndicatorParams::default(),
        }
    }
}

/// Run the detector with default parameters.
///
/// Returns `None` when the series is too short to evaluate.
pub fn detect(candles: &[Candle]) -> Option<SignalReport> {
    detect_with(candles, &DetectorParams::default())
}

pub fn detect_with(candles: &[Candle], params: &DetectorParams) -> Option<SignalReport> {
    if candles.len() < params.min_bars.max(2) {
        return None;
    }

    let frame = indicators::compute_with(candles, &params.indicators);
    evaluate(&frame, params.rsi_threshold)
}

/// Evaluate the breakout rule on the last bar of an already computed frame
pub fn evaluate(frame: &IndicatorFrame, rsi_threshold: f64) -> Option<SignalReport> {
    let (prev, last) = frame.last_pair()?;
    let close = Some(last.candle.close);

    let ema_cross = greater(last.ema_fast, last.ema_slow)
        && less_or_equal(prev.ema_fast, prev.ema_slow);
    let price_above_emas = greater(close, last.ema_fast) && greater(close, last.ema_slow);
    let rsi_burst = greater(last.rsi_fast, Some(rsi_threshold));

    let signal = (ema_cross || price_above_emas) && rsi_burst && last.vol_spike && last.atr_spike;

    debug!(
        "bar {} close={:.2} ema_fast={:?} ema_slow={:?} rsi={:?} atr={:?}/{:?} vol={:.0}/{:?}",
        last.candle.datetime,
        last.candle.close,
        last.ema_fast,
        last.ema_slow,
        last.rsi_fast,
        last.atr,
        last.atr_baseline,
        last.candle.volume,
        last.vol_baseline
    );

    Some(SignalReport {
        symbol: String::new(),
        signal,
        ema_cross,
        price_above_emas,
        rsi_burst,
        rsi_fast: last.rsi_fast,
        vol_spike: last.vol_spike,
        atr_spike: last.atr_spike,
        close: last.candle.close,
        timestamp: last.candle.datetime,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::IndicatorRow;
    use chrono::{Duration, Utc};

    fn flat_candles(count: usize) -> Vec<Candle> {
        let start = Utc::now() - Duration::minutes(5 * count as i64);
        (0..count)
            .map(|i| {
                let close = if i % 2 == 0 { 100.2 } else { 99.8 };
                Candle {
                    datetime: start + Duration::minutes(5 * i as i64),
                    open: close,
                    high: close + 0.5,
                    low: close - 0.5,
                    close,
                    volume: 1000.0,
                }
            })
            .collect()
    }

    fn row(ema_fast: Option<f64>, ema_slow: Option<f64>, close: f64) -> IndicatorRow {
        IndicatorRow {
            candle: Candle {
                datetime: Utc::now(),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1.0,
            },
            ema_fast,
            ema_slow,
            rsi_fast: Some(70.0),
            atr: Some(2.0),
            atr_baseline: Some(1.0),
            atr_spike: true,
            vol_baseline: Some(1.0),
            vol_spike: true,
        }
    }

    #[test]
    fn test_insufficient_data_returns_none() {
        for len in [0, 1, 2, 10, 29] {
            assert!(detect(&flat_candles(len)).is_none(), "len={}", len);
        }
        assert!(detect(&flat_candles(30)).is_some());
    }

    #[test]
    fn test_flat_market_has_no_signal() {
        let report = detect(&flat_candles(60)).unwrap();
        assert!(!report.signal);
        assert!(!report.vol_spike);
        assert!(report.symbol.is_empty());
    }

    #[test]
    fn test_report_describes_last_bar() {
        let candles = flat_candles(40);
        let report = detect(&candles).unwrap().with_symbol("BANKNIFTY");
        let last = candles.last().unwrap();

        assert_eq!(report.symbol, "BANKNIFTY");
        assert_eq!(report.close, last.close);
        assert_eq!(report.timestamp, last.datetime);
    }

    #[test]
    fn test_ema_cross_only_on_crossing_bar() {
        let frame = IndicatorFrame {
            rows: vec![row(Some(9.0), Some(10.0), 11.0), row(Some(10.5), Some(10.0), 11.0)],
        };
        let report = evaluate(&frame, 55.0).unwrap();
        assert!(report.ema_cross);
        assert!(report.signal);

        let frame = IndicatorFrame {
            rows: vec![row(Some(10.2), Some(10.0), 11.0), row(Some(10.5), Some(10.0), 11.0)],
        };
        assert!(!evaluate(&frame, 55.0).unwrap().ema_cross);
    }

    #[test]
    fn test_undefined_ema_never_crosses() {
        let frame = IndicatorFrame {
            rows: vec![row(None, None, 11.0), row(Some(10.5), Some(10.0), 9.0)],
        };
        let report = evaluate(&frame, 55.0).unwrap();
        assert!(!report.ema_cross);
        assert!(!report.price_above_emas);
        assert!(!report.signal);
    }

    #[test]
    fn test_undefined_rsi_blocks_signal() {
        let mut last = row(Some(10.5), Some(10.0), 11.0);
        last.rsi_fast = None;
        let frame = IndicatorFrame {
            rows: vec![row(Some(10.5), Some(10.0), 11.0), last],
        };
        let report = evaluate(&frame, 55.0).unwrap();
        assert!(report.price_above_emas);
        assert!(!report.rsi_burst);
        assert!(!report.signal);
    }

    #[test]
    fn test_signal_matches_conjunction() {
        let flags = [false, true];
        for &cross in &flags {
            for &above in &flags {
                for &rsi_hot in &flags {
                    for &vol in &flags {
                        for &atr_hot in &flags {
                            let prev = if cross {
                                row(Some(9.0), Some(10.0), 11.0)
                            } else {
                                row(Some(10.2), Some(10.0), 11.0)
                            };
                            let mut last = row(Some(10.5), Some(10.0), if above { 11.0 } else { 10.1 });
                            last.rsi_fast = Some(if rsi_hot { 60.0 } else { 50.0 });
                            last.vol_spike = vol;
                            last.atr_spike = atr_hot;

                            let report =
                                evaluate(&IndicatorFrame { rows: vec![prev, last] }, 55.0).unwrap();
                            let expected = (report.ema_cross || report.price_above_emas)
                                && report.rsi_burst
                                && report.vol_spike
                                && report.atr_spike;
                            assert_eq!(report.signal, expected);
                            assert_eq!(report.ema_cross, cross);
                            assert_eq!(report.price_above_emas, above);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_rsi_threshold_is_strict() {
        let mut last = row(Some(10.5), Some(10.0), 11.0);
        last.rsi_fast = Some(55.0);
        let frame = IndicatorFrame {
            rows: vec![row(Some(10.5), Some(10.0), 11.0), last],
        };
        assert!(!evaluate(&frame, 55.0).unwrap().rsi_burst);
    }
}
