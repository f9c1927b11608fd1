use serde::{Deserialize, Serialize};
use tracing::info;

use indicators::IndicatorParams;

/// Evaluator thresholds and window sizing, loaded from TOML.
///
/// Example `config/signal.toml`:
/// ```toml
/// window_len = 200
/// rsi_lower = 30.0
/// rsi_upper = 70.0
/// atr_floor = 0.05
/// k_tp = 3.0
/// k_sl = 1.5
/// min_distance_pct = 0.1
/// trailing_stop = false
///
/// [indicators]
/// rsi_period = 14
/// macd_fast = 12
/// macd_slow = 26
/// macd_signal = 9
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Rolling window capacity per symbol.
    pub window_len: usize,
    /// SHORT requires RSI strictly above this bound.
    pub rsi_lower: f64,
    /// LONG requires RSI strictly below this bound.
    pub rsi_upper: f64,
    /// ATR must be strictly above this to signal at all (dead-market filter).
    pub atr_floor: f64,
    /// Take-profit distance in ATR multiples.
    pub k_tp: f64,
    /// Stop-loss distance in ATR multiples.
    pub k_sl: f64,
    /// Minimum TP/SL distance as a percentage of entry price, so a tiny ATR
    /// can never produce a degenerate near-zero target.
    pub min_distance_pct: f64,
    /// Ratchet the stop-loss behind the price while a trade is open.
    pub trailing_stop: bool,
    pub indicators: IndicatorParams,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            window_len: 200,
            rsi_lower: 30.0,
            rsi_upper: 70.0,
            atr_floor: 0.0,
            k_tp: 3.0,
            k_sl: 1.5,
            min_distance_pct: 0.1,
            trailing_stop: false,
            indicators: IndicatorParams::default(),
        }
    }
}

impl EvaluatorConfig {
    /// Load from a TOML file. A missing file falls back to defaults; a file
    /// that exists but fails to parse exits the process (bad config is fatal
    /// at startup).
    pub fn load(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)
                .unwrap_or_else(|e| panic!("Failed to parse signal config at '{path}': {e}")),
            Err(_) => {
                info!(path = %path, "No signal config file found, using defaults");
                Self::default()
            }
        }
    }
}
