use tracing::{debug, info, warn};

use common::{Direction, Signal, Trade};

/// Emitted when an open trade's TP or SL level is crossed.
#[derive(Debug, Clone)]
pub enum TradeEvent {
    TakeProfitHit { trade: Trade, price: f64 },
    StopLossHit { trade: Trade, price: f64 },
}

/// Per-symbol paper-trade state machine: Flat → Open → Flat.
///
/// At most one trade is open at any time; `open` while already open is a
/// logic error upstream and is rejected. TP crossing is checked before SL on
/// every tick, and closing a trade emits exactly one event.
#[derive(Debug)]
pub struct PositionTracker {
    symbol: String,
    open: Option<Trade>,
    /// Ratchet the stop behind the price while open.
    trailing_stop: bool,
    /// Entry-time SL distance, reused by the trailing ratchet.
    sl_distance: f64,
}

impl PositionTracker {
    pub fn new(symbol: impl Into<String>, trailing_stop: bool) -> Self {
        Self {
            symbol: symbol.into(),
            open: None,
            trailing_stop,
            sl_distance: 0.0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn open_trade(&self) -> Option<&Trade> {
        self.open.as_ref()
    }

    /// Transition Flat → Open. Returns the created trade, or `None` if a
    /// trade is already open (the evaluator should never let that happen).
    pub fn open(&mut self, signal: &Signal) -> Option<Trade> {
        if let Some(existing) = &self.open {
            warn!(
                symbol = %self.symbol,
                open_id = %existing.id,
                "Rejected signal while a trade is already open"
            );
            return None;
        }

        let trade = Trade::from_signal(signal);
        self.sl_distance = (trade.entry_price - trade.stop_loss).abs();
        info!(
            symbol = %self.symbol,
            direction = %trade.direction,
            entry = trade.entry_price,
            tp = trade.take_profit,
            sl = trade.stop_loss,
            "Trade opened"
        );
        self.open = Some(trade.clone());
        Some(trade)
    }

    /// Check the open trade against a new price. TP is checked first; either
    /// crossing transitions back to Flat. While open and uncrossed, an
    /// enabled trailing stop only ever moves in the trade's favor.
    pub fn on_price(&mut self, price: f64) -> Option<TradeEvent> {
        let trade = self.open.as_mut()?;

        let tp_hit = match trade.direction {
            Direction::Long => price >= trade.take_profit,
            Direction::Short => price <= trade.take_profit,
        };
        if tp_hit {
            let trade = self.open.take().expect("trade is open");
            info!(symbol = %self.symbol, price, tp = trade.take_profit, "Take-profit hit");
            return Some(TradeEvent::TakeProfitHit { trade, price });
        }

        let sl_hit = match trade.direction {
            Direction::Long => price <= trade.stop_loss,
            Direction::Short => price >= trade.stop_loss,
        };
        if sl_hit {
            let trade = self.open.take().expect("trade is open");
            info!(symbol = %self.symbol, price, sl = trade.stop_loss, "Stop-loss hit");
            return Some(TradeEvent::StopLossHit { trade, price });
        }

        if self.trailing_stop {
            let candidate = match trade.direction {
                Direction::Long => price - self.sl_distance,
                Direction::Short => price + self.sl_distance,
            };
            let improves = match trade.direction {
                Direction::Long => candidate > trade.stop_loss,
                Direction::Short => candidate < trade.stop_loss,
            };
            if improves {
                debug!(
                    symbol = %self.symbol,
                    old_sl = trade.stop_loss,
                    new_sl = candidate,
                    "Trailing stop ratcheted"
                );
                trade.stop_loss = candidate;
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::IndicatorSnapshot;

    fn long_signal(entry: f64, tp: f64, sl: f64) -> Signal {
        Signal {
            symbol: "BTCUSDT".into(),
            direction: Direction::Long,
            entry_price: entry,
            take_profit: tp,
            stop_loss: sl,
            snapshot: IndicatorSnapshot::empty(),
        }
    }

    fn short_signal(entry: f64, tp: f64, sl: f64) -> Signal {
        Signal {
            direction: Direction::Short,
            ..long_signal(entry, tp, sl)
        }
    }

    #[test]
    fn tp_first_path_emits_exactly_one_tp_event() {
        let mut tracker = PositionTracker::new("BTCUSDT", false);
        tracker.open(&long_signal(100.0, 106.0, 97.0)).unwrap();

        // Path rises through TP before ever nearing SL.
        let mut events = Vec::new();
        for price in [101.0, 103.0, 106.5, 90.0, 110.0] {
            if let Some(ev) = tracker.on_price(price) {
                events.push(ev);
            }
        }
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], TradeEvent::TakeProfitHit { .. }));
        assert!(!tracker.is_open());
    }

    #[test]
    fn sl_first_path_emits_exactly_one_sl_event() {
        let mut tracker = PositionTracker::new("BTCUSDT", false);
        tracker.open(&long_signal(100.0, 106.0, 97.0)).unwrap();

        let mut events = Vec::new();
        for price in [99.0, 98.0, 96.5, 110.0] {
            if let Some(ev) = tracker.on_price(price) {
                events.push(ev);
            }
        }
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], TradeEvent::StopLossHit { .. }));
        assert!(!tracker.is_open());
    }

    #[test]
    fn short_trade_levels_are_inverted() {
        let mut tracker = PositionTracker::new("ETHUSDT", false);
        tracker.open(&short_signal(100.0, 94.0, 103.0)).unwrap();

        assert!(tracker.on_price(99.0).is_none());
        let ev = tracker.on_price(93.5).expect("TP crossing downward");
        assert!(matches!(ev, TradeEvent::TakeProfitHit { .. }));
    }

    #[test]
    fn short_stop_loss_triggers_on_rise() {
        let mut tracker = PositionTracker::new("ETHUSDT", false);
        tracker.open(&short_signal(100.0, 94.0, 103.0)).unwrap();

        let ev = tracker.on_price(103.5).expect("SL crossing upward");
        assert!(matches!(ev, TradeEvent::StopLossHit { .. }));
    }

    #[test]
    fn second_open_while_open_is_rejected() {
        let mut tracker = PositionTracker::new("BTCUSDT", false);
        assert!(tracker.open(&long_signal(100.0, 106.0, 97.0)).is_some());
        assert!(tracker.open(&long_signal(101.0, 107.0, 98.0)).is_none());
        // First trade remains untouched.
        assert_eq!(tracker.open_trade().unwrap().entry_price, 100.0);
    }

    #[test]
    fn tp_checked_before_sl_on_same_tick() {
        // A price that somehow satisfies both levels resolves as TP.
        let mut tracker = PositionTracker::new("BTCUSDT", false);
        tracker.open(&long_signal(100.0, 100.0, 100.0)).unwrap();
        let ev = tracker.on_price(100.0).unwrap();
        assert!(matches!(ev, TradeEvent::TakeProfitHit { .. }));
    }

    #[test]
    fn trailing_stop_only_moves_in_trades_favor() {
        let mut tracker = PositionTracker::new("BTCUSDT", true);
        tracker.open(&long_signal(100.0, 120.0, 97.0)).unwrap(); // distance 3

        assert!(tracker.on_price(105.0).is_none());
        assert_eq!(tracker.open_trade().unwrap().stop_loss, 102.0);

        // Price falls back: the stop must not loosen.
        assert!(tracker.on_price(103.0).is_none());
        assert_eq!(tracker.open_trade().unwrap().stop_loss, 102.0);

        // Falling through the ratcheted stop closes the trade.
        let ev = tracker.on_price(101.5).unwrap();
        assert!(matches!(ev, TradeEvent::StopLossHit { .. }));
    }

    #[test]
    fn trailing_stop_for_short_ratchets_downward() {
        let mut tracker = PositionTracker::new("BTCUSDT", true);
        tracker.open(&short_signal(100.0, 80.0, 103.0)).unwrap(); // distance 3

        assert!(tracker.on_price(95.0).is_none());
        assert_eq!(tracker.open_trade().unwrap().stop_loss, 98.0);

        assert!(tracker.on_price(96.0).is_none());
        assert_eq!(tracker.open_trade().unwrap().stop_loss, 98.0);
    }

    #[test]
    fn flat_tracker_ignores_prices() {
        let mut tracker = PositionTracker::new("BTCUSDT", false);
        assert!(tracker.on_price(100.0).is_none());
        assert!(!tracker.is_open());
    }
}
