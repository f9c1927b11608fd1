use serde::{Deserialize, Serialize};

use common::IndicatorSnapshot;

use crate::window::RollingWindow;

/// Indicator periods. Defaults match the usual technical-analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorParams {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub atr_period: usize,
    pub adx_period: usize,
    /// Lookback for rolling support/resistance.
    pub sr_period: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            atr_period: 14,
            adx_period: 14,
            sr_period: 20,
        }
    }
}

/// Computes a full [`IndicatorSnapshot`] from a rolling window of closes.
///
/// Pure function of the window contents: no hidden state, so feeding the same
/// price sequence always yields the same snapshot. Each indicator reads NaN
/// until its period is reached.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    params: IndicatorParams,
}

impl IndicatorEngine {
    pub fn new(params: IndicatorParams) -> Self {
        assert!(
            params.macd_fast < params.macd_slow,
            "MACD fast period must be less than slow period"
        );
        assert!(params.rsi_period >= 2, "RSI period must be >= 2");
        Self { params }
    }

    pub fn params(&self) -> &IndicatorParams {
        &self.params
    }

    pub fn compute(&self, window: &RollingWindow) -> IndicatorSnapshot {
        let closes = window.closes();
        if closes.is_empty() {
            return IndicatorSnapshot::empty();
        }
        let p = &self.params;
        let last = *closes.last().expect("non-empty window");

        let (macd, signal_line) = macd(&closes, p.macd_fast, p.macd_slow, p.macd_signal);

        IndicatorSnapshot {
            rsi: rsi(&closes, p.rsi_period),
            macd,
            signal_line,
            atr: atr(&closes, p.atr_period),
            adx: adx_proxy(&closes, p.atr_period, p.adx_period, last),
            sma_50: sma(&closes, 50),
            sma_200: sma(&closes, 200),
            ema_9: ema(&closes, 9),
            ema_21: ema(&closes, 21),
            support: rolling_min(&closes, p.sr_period),
            resistance: rolling_max(&closes, p.sr_period),
        }
    }
}

// ─── Indicator math ──────────────────────────────────────────────────────────

/// RSI with Wilder's smoothing. NaN below `period + 1` closes.
/// A zero average loss reads 100 (all gains).
fn rsi(closes: &[f64], period: usize) -> f64 {
    if closes.len() < period + 1 {
        return f64::NAN;
    }

    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let initial = &changes[..period];

    let mut avg_gain = initial.iter().filter(|&&c| c > 0.0).sum::<f64>() / period as f64;
    let mut avg_loss =
        initial.iter().filter(|&&c| c < 0.0).map(|c| c.abs()).sum::<f64>() / period as f64;

    for &change in &changes[period..] {
        let gain = if change > 0.0 { change } else { 0.0 };
        let loss = if change < 0.0 { change.abs() } else { 0.0 };
        avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
    }

    if avg_loss < f64::EPSILON {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// MACD line and its signal line. NaN below `slow + signal` closes.
fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> (f64, f64) {
    if closes.len() < slow + signal {
        return (f64::NAN, f64::NAN);
    }

    let fast_series = ema_series(closes, fast);
    let slow_series = ema_series(closes, slow);
    let macd_series: Vec<f64> = fast_series
        .iter()
        .zip(&slow_series)
        .map(|(f, s)| f - s)
        .collect();
    let signal_series = ema_series(&macd_series, signal);

    (
        *macd_series.last().expect("non-empty"),
        *signal_series.last().expect("non-empty"),
    )
}

/// Close-only ATR proxy: rolling mean of absolute first differences.
/// NaN below `period + 1` closes.
fn atr(closes: &[f64], period: usize) -> f64 {
    if closes.len() < period + 1 {
        return f64::NAN;
    }
    let diffs: Vec<f64> = closes.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    diffs[diffs.len() - period..].iter().sum::<f64>() / period as f64
}

/// Trend-strength proxy: rolling mean of the ATR series, as a percentage of
/// the last price. Close-only feeds cannot support the textbook ADX.
fn adx_proxy(closes: &[f64], atr_period: usize, adx_period: usize, last_price: f64) -> f64 {
    if closes.len() < atr_period + adx_period || last_price <= 0.0 {
        return f64::NAN;
    }
    let diffs: Vec<f64> = closes.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    let atr_series: Vec<f64> = diffs
        .windows(atr_period)
        .map(|w| w.iter().sum::<f64>() / atr_period as f64)
        .collect();
    let tail = &atr_series[atr_series.len() - adx_period..];
    let mean_atr = tail.iter().sum::<f64>() / adx_period as f64;
    mean_atr / last_price * 100.0
}

/// Simple moving average of the last `period` closes. NaN below `period`.
fn sma(closes: &[f64], period: usize) -> f64 {
    if closes.len() < period {
        return f64::NAN;
    }
    closes[closes.len() - period..].iter().sum::<f64>() / period as f64
}

/// Exponential moving average over the whole window, seeded with the first
/// value (pandas `ewm(adjust=False)` convention). NaN below `period`.
fn ema(closes: &[f64], period: usize) -> f64 {
    if closes.len() < period {
        return f64::NAN;
    }
    *ema_series(closes, period).last().expect("non-empty")
}

/// Full EMA series over `data`, one value per input.
fn ema_series(data: &[f64], period: usize) -> Vec<f64> {
    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(data.len());
    let mut current = data[0];
    out.push(current);
    for &value in &data[1..] {
        current = value * k + current * (1.0 - k);
        out.push(current);
    }
    out
}

fn rolling_min(closes: &[f64], period: usize) -> f64 {
    if closes.len() < period {
        return f64::NAN;
    }
    closes[closes.len() - period..]
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min)
}

fn rolling_max(closes: &[f64], period: usize) -> f64 {
    if closes.len() < period {
        return f64::NAN;
    }
    closes[closes.len() - period..]
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max)
}
