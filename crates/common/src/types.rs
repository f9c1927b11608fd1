use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Normalized market data event from the exchange stream.
/// Emitted once per kline update or trade tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
    pub symbol: String,
    pub price: f64,
    /// True when the underlying candle has closed (finalized). Indicators
    /// only recompute on closed points; trade-stream ticks are always closed.
    pub is_closed: bool,
    pub timestamp: DateTime<Utc>,
}

/// Direction of a signal or trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// One full indicator readout over a symbol's rolling window.
///
/// Every field is `f64::NAN` until enough closed prices have accumulated for
/// its period. Consumers must treat NaN as "no reading", never as zero.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub rsi: f64,
    pub macd: f64,
    pub signal_line: f64,
    pub atr: f64,
    /// Volatility-strength proxy, not the textbook ADX (close-only feed).
    pub adx: f64,
    pub sma_50: f64,
    pub sma_200: f64,
    pub ema_9: f64,
    pub ema_21: f64,
    pub support: f64,
    pub resistance: f64,
}

impl IndicatorSnapshot {
    /// A snapshot with every indicator unset.
    pub fn empty() -> Self {
        Self {
            rsi: f64::NAN,
            macd: f64::NAN,
            signal_line: f64::NAN,
            atr: f64::NAN,
            adx: f64::NAN,
            sma_50: f64::NAN,
            sma_200: f64::NAN,
            ema_9: f64::NAN,
            ema_21: f64::NAN,
            support: f64::NAN,
            resistance: f64::NAN,
        }
    }
}

/// Entry signal emitted by the evaluator. Ephemeral: consumed once by the
/// tracker (which turns it into a [`Trade`]) and by the notifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub take_profit: f64,
    pub stop_loss: f64,
    pub snapshot: IndicatorSnapshot,
}

/// An open virtual (paper) trade. At most one exists per symbol at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub symbol: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub take_profit: f64,
    /// Mutated by the tracker when a trailing stop ratchets.
    pub stop_loss: f64,
    pub opened_at: DateTime<Utc>,
}

impl Trade {
    pub fn from_signal(signal: &Signal) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            symbol: signal.symbol.clone(),
            direction: signal.direction,
            entry_price: signal.entry_price,
            take_profit: signal.take_profit,
            stop_loss: signal.stop_loss,
            opened_at: Utc::now(),
        }
    }
}

/// Events handed to the notifier queue.
#[derive(Debug, Clone)]
pub enum NotifyEvent {
    SignalOpened(Signal),
    TakeProfitHit { trade: Trade, price: f64 },
    StopLossHit { trade: Trade, price: f64 },
}

impl NotifyEvent {
    pub fn symbol(&self) -> &str {
        match self {
            NotifyEvent::SignalOpened(s) => &s.symbol,
            NotifyEvent::TakeProfitHit { trade, .. } | NotifyEvent::StopLossHit { trade, .. } => {
                &trade.symbol
            }
        }
    }
}

/// Which exchange stream a symbol subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Kline,
    Trade,
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamKind::Kline => write!(f, "kline"),
            StreamKind::Trade => write!(f, "trade"),
        }
    }
}
