use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tracing::{info, warn};
use url::Url;

use common::{PricePoint, Result, StreamKind};

/// Market data WebSocket stream for a single symbol.
///
/// Connects to the exchange endpoint, subscribes to the symbol's kline or
/// trade stream, parses frames into `PricePoint`s and forwards them in
/// arrival order on an mpsc channel. Reconnects automatically with
/// exponential backoff; a malformed frame is logged and skipped, never fatal.
pub struct MarketStream {
    endpoint: String,
    symbol: String,
    kind: StreamKind,
    interval: String,
    tx: mpsc::Sender<PricePoint>,
}

impl MarketStream {
    pub fn new(
        endpoint: impl Into<String>,
        symbol: impl Into<String>,
        kind: StreamKind,
        interval: impl Into<String>,
        tx: mpsc::Sender<PricePoint>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            symbol: symbol.into(),
            kind,
            interval: interval.into(),
            tx,
        }
    }

    /// Run the stream loop until the consumer side hangs up.
    /// Call this inside a `tokio::spawn`.
    pub async fn run(self) {
        let mut backoff = Duration::from_secs(1);
        const MAX_BACKOFF: Duration = Duration::from_secs(60);

        loop {
            info!(symbol = %self.symbol, kind = %self.kind, "Connecting to market data stream");
            match self.connect_once().await {
                Ok(ConnectionEnd::ConsumerGone) => {
                    info!(symbol = %self.symbol, "Pipeline closed, stopping stream");
                    return;
                }
                Ok(ConnectionEnd::StreamClosed) => {
                    info!(symbol = %self.symbol, "Stream closed cleanly, reconnecting");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    backoff = Duration::from_secs(1);
                }
                Err(e) => {
                    warn!(symbol = %self.symbol, error = %e, backoff = ?backoff, "Stream error, reconnecting");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }
    }

    async fn connect_once(&self) -> Result<ConnectionEnd> {
        let url = Url::parse(&self.endpoint)
            .map_err(|e| common::Error::WebSocket(e.to_string()))?;

        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| common::Error::WebSocket(e.to_string()))?;

        let (mut write, mut read) = ws_stream.split();

        let subscribe = subscribe_frame(&self.symbol, self.kind, &self.interval, 1);
        write
            .send(tokio_tungstenite::tungstenite::Message::Text(subscribe))
            .await
            .map_err(|e| common::Error::WebSocket(e.to_string()))?;
        info!(symbol = %self.symbol, "Subscribed");

        while let Some(msg) = read.next().await {
            let msg = msg.map_err(|e| common::Error::WebSocket(e.to_string()))?;

            if let tokio_tungstenite::tungstenite::Message::Text(text) = msg {
                match parse_price_event(&text) {
                    Ok(Some(point)) => {
                        if self.tx.send(point).await.is_err() {
                            return Ok(ConnectionEnd::ConsumerGone);
                        }
                    }
                    Ok(None) => {} // subscribe ack or unrelated frame
                    Err(e) => {
                        warn!(symbol = %self.symbol, error = %e, "Failed to parse stream frame");
                    }
                }
            }
        }

        Ok(ConnectionEnd::StreamClosed)
    }
}

enum ConnectionEnd {
    /// The remote closed the socket; reconnect.
    StreamClosed,
    /// The pipeline dropped its receiver; shut down.
    ConsumerGone,
}

/// Build the SUBSCRIBE frame, e.g.
/// `{"method":"SUBSCRIBE","params":["btcusdt@kline_1m"],"id":1}`.
pub fn subscribe_frame(symbol: &str, kind: StreamKind, interval: &str, id: u64) -> String {
    let stream = match kind {
        StreamKind::Kline => format!("{}@kline_{}", symbol.to_lowercase(), interval),
        StreamKind::Trade => format!("{}@trade", symbol.to_lowercase()),
    };
    json!({
        "method": "SUBSCRIBE",
        "params": [stream],
        "id": id,
    })
    .to_string()
}

// ─── Incoming frame parsing ──────────────────────────────────────────────────

#[derive(Deserialize)]
struct KlineFrame {
    s: String,
    k: KlineData,
}

#[derive(Deserialize)]
struct KlineData {
    #[serde(rename = "c")]
    close: String,
    #[serde(rename = "x")]
    is_closed: bool,
    #[serde(rename = "T")]
    close_time_ms: i64,
}

#[derive(Deserialize)]
struct TradeFrame {
    s: String,
    #[serde(rename = "p")]
    price: String,
    #[serde(rename = "T", default)]
    trade_time_ms: i64,
}

/// Parse one incoming text frame into a `PricePoint`.
///
/// Returns `Ok(None)` for frames that are not kline/trade events (subscribe
/// acks have no `"e"` field). Non-positive prices are discarded.
pub fn parse_price_event(text: &str) -> Result<Option<PricePoint>> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let event_type = match value.get("e").and_then(|v| v.as_str()) {
        Some(e) => e,
        None => return Ok(None),
    };

    match event_type {
        "kline" => {
            let frame: KlineFrame = serde_json::from_value(value)?;
            let price: f64 = frame
                .k
                .close
                .parse()
                .map_err(|_| common::Error::Other(format!("bad close price '{}'", frame.k.close)))?;
            if price <= 0.0 {
                return Ok(None);
            }
            Ok(Some(PricePoint {
                symbol: frame.s,
                price,
                is_closed: frame.k.is_closed,
                timestamp: millis_to_utc(frame.k.close_time_ms),
            }))
        }
        "trade" => {
            let frame: TradeFrame = serde_json::from_value(value)?;
            let price: f64 = frame
                .price
                .parse()
                .map_err(|_| common::Error::Other(format!("bad trade price '{}'", frame.price)))?;
            if price <= 0.0 {
                return Ok(None);
            }
            Ok(Some(PricePoint {
                symbol: frame.s,
                price,
                // Trade ticks carry no candle flag; every tick is final.
                is_closed: true,
                timestamp: millis_to_utc(frame.trade_time_ms),
            }))
        }
        _ => Ok(None),
    }
}

fn millis_to_utc(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_else(Utc::now)
}
