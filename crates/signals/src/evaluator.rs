use tracing::debug;

use common::{Direction, IndicatorSnapshot, Signal};

use crate::config::EvaluatorConfig;

/// Applies the threshold rule to an indicator snapshot and derives TP/SL
/// levels from price and ATR. Stateless; the one-trade-per-symbol invariant
/// is enforced via the `has_open_trade` argument supplied by the tracker.
#[derive(Debug, Clone)]
pub struct Evaluator {
    config: EvaluatorConfig,
}

impl Evaluator {
    pub fn new(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Decide LONG/SHORT/none for the latest closed price point.
    ///
    /// Returns `None` while a trade is open, when any required indicator has
    /// no reading yet, or when ATR is at or below the volatility floor.
    pub fn evaluate(
        &self,
        symbol: &str,
        price: f64,
        snapshot: &IndicatorSnapshot,
        has_open_trade: bool,
    ) -> Option<Signal> {
        if has_open_trade {
            return None;
        }

        if snapshot.rsi.is_nan()
            || snapshot.macd.is_nan()
            || snapshot.signal_line.is_nan()
            || snapshot.atr.is_nan()
        {
            return None; // insufficient history, not an error
        }

        // Strictly above the floor: an ATR exactly at the floor does not fire.
        if snapshot.atr <= self.config.atr_floor {
            debug!(symbol, atr = snapshot.atr, floor = self.config.atr_floor, "ATR below volatility floor");
            return None;
        }

        let direction = if snapshot.macd > snapshot.signal_line && snapshot.rsi < self.config.rsi_upper
        {
            Direction::Long
        } else if snapshot.macd < snapshot.signal_line && snapshot.rsi > self.config.rsi_lower {
            Direction::Short
        } else {
            return None;
        };

        let (take_profit, stop_loss) = self.levels(price, snapshot.atr, direction);
        if take_profit <= 0.0 || stop_loss <= 0.0 {
            return None;
        }

        Some(Signal {
            symbol: symbol.to_string(),
            direction,
            entry_price: price,
            take_profit,
            stop_loss,
            snapshot: *snapshot,
        })
    }

    /// TP/SL levels at ATR-multiple distances from entry, floored at a
    /// minimum percentage of price.
    fn levels(&self, entry: f64, atr: f64, direction: Direction) -> (f64, f64) {
        let min_distance = entry * self.config.min_distance_pct / 100.0;
        let tp_distance = (atr * self.config.k_tp).max(min_distance);
        let sl_distance = (atr * self.config.k_sl).max(min_distance);

        match direction {
            Direction::Long => (entry + tp_distance, entry - sl_distance),
            Direction::Short => (entry - tp_distance, entry + sl_distance),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::IndicatorSnapshot;

    fn bullish_snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot {
            rsi: 55.0,
            macd: 1.2,
            signal_line: 0.8,
            atr: 2.0,
            adx: 1.0,
            sma_50: 100.0,
            sma_200: 95.0,
            ema_9: 101.0,
            ema_21: 100.0,
            support: 98.0,
            resistance: 104.0,
        }
    }

    fn evaluator(config: EvaluatorConfig) -> Evaluator {
        Evaluator::new(config)
    }

    #[test]
    fn open_trade_suppresses_evaluation() {
        let eval = evaluator(EvaluatorConfig::default());
        let snap = bullish_snapshot();
        assert!(eval.evaluate("BTCUSDT", 100.0, &snap, true).is_none());
        assert!(eval.evaluate("BTCUSDT", 100.0, &snap, false).is_some());
    }

    #[test]
    fn any_nan_indicator_suppresses_signal() {
        let eval = evaluator(EvaluatorConfig::default());
        for field in 0..4 {
            let mut snap = bullish_snapshot();
            match field {
                0 => snap.rsi = f64::NAN,
                1 => snap.macd = f64::NAN,
                2 => snap.signal_line = f64::NAN,
                _ => snap.atr = f64::NAN,
            }
            assert!(
                eval.evaluate("BTCUSDT", 100.0, &snap, false).is_none(),
                "NaN field {field} should yield no signal"
            );
        }
    }

    #[test]
    fn atr_exactly_at_floor_is_rejected() {
        let config = EvaluatorConfig {
            atr_floor: 2.0,
            ..EvaluatorConfig::default()
        };
        let eval = evaluator(config);
        let mut snap = bullish_snapshot();
        snap.atr = 2.0; // exactly at the floor — strict inequality required
        assert!(eval.evaluate("BTCUSDT", 100.0, &snap, false).is_none());

        snap.atr = 2.0 + 1e-9;
        assert!(eval.evaluate("BTCUSDT", 100.0, &snap, false).is_some());
    }

    #[test]
    fn long_tp_sl_arithmetic() {
        // entry 100, atr 2, k_tp 3, k_sl 1.5 => tp 106, sl 97
        let config = EvaluatorConfig {
            k_tp: 3.0,
            k_sl: 1.5,
            min_distance_pct: 0.1,
            ..EvaluatorConfig::default()
        };
        let eval = evaluator(config);
        let signal = eval
            .evaluate("BTCUSDT", 100.0, &bullish_snapshot(), false)
            .expect("bullish snapshot should fire");
        assert_eq!(signal.direction, Direction::Long);
        assert!((signal.take_profit - 106.0).abs() < 1e-9, "tp {}", signal.take_profit);
        assert!((signal.stop_loss - 97.0).abs() < 1e-9, "sl {}", signal.stop_loss);
    }

    #[test]
    fn short_levels_are_mirrored() {
        let config = EvaluatorConfig {
            k_tp: 3.0,
            k_sl: 1.5,
            ..EvaluatorConfig::default()
        };
        let eval = evaluator(config);
        let mut snap = bullish_snapshot();
        snap.macd = 0.5;
        snap.signal_line = 0.9; // bearish cross
        snap.rsi = 45.0; // above rsi_lower
        let signal = eval
            .evaluate("ETHUSDT", 100.0, &snap, false)
            .expect("bearish snapshot should fire");
        assert_eq!(signal.direction, Direction::Short);
        assert!((signal.take_profit - 94.0).abs() < 1e-9);
        assert!((signal.stop_loss - 103.0).abs() < 1e-9);
    }

    #[test]
    fn min_distance_floor_overrides_tiny_atr() {
        let config = EvaluatorConfig {
            k_tp: 3.0,
            k_sl: 1.5,
            min_distance_pct: 1.0, // 1% of price
            atr_floor: 0.0,
            ..EvaluatorConfig::default()
        };
        let eval = evaluator(config);
        let mut snap = bullish_snapshot();
        snap.atr = 0.001; // atr distances would be 0.003 / 0.0015
        let signal = eval
            .evaluate("BTCUSDT", 100.0, &snap, false)
            .expect("should still fire");
        // Both distances floored at 1% of 100 = 1.0
        assert!((signal.take_profit - 101.0).abs() < 1e-9);
        assert!((signal.stop_loss - 99.0).abs() < 1e-9);
    }

    #[test]
    fn rsi_outside_bounds_blocks_direction() {
        let eval = evaluator(EvaluatorConfig::default());
        let mut snap = bullish_snapshot();
        snap.rsi = 75.0; // above rsi_upper: no LONG even with bullish MACD
        assert!(eval.evaluate("BTCUSDT", 100.0, &snap, false).is_none());

        snap.macd = 0.1;
        snap.signal_line = 0.5;
        snap.rsi = 25.0; // below rsi_lower: no SHORT either
        assert!(eval.evaluate("BTCUSDT", 100.0, &snap, false).is_none());
    }
}
