use common::NotifyEvent;

/// Human-readable message body for a queue event.
pub fn format_event(event: &NotifyEvent) -> String {
    match event {
        NotifyEvent::SignalOpened(signal) => {
            let entry = signal.entry_price;
            let tp_pct = pct_distance(entry, signal.take_profit);
            let sl_pct = pct_distance(entry, signal.stop_loss);
            format!(
                "📌 {dir} signal on {sym}\n\
                 🔹 Entry: {entry:.6} USDT\n\
                 🎯 TP: {tp:.6} USDT (+{tp_pct:.1}%)\n\
                 ⛔ SL: {sl:.6} USDT (-{sl_pct:.1}%)\n\
                 RSI {rsi:.1} | MACD {macd:.4} | ATR {atr:.4}",
                dir = signal.direction,
                sym = signal.symbol,
                tp = signal.take_profit,
                sl = signal.stop_loss,
                rsi = signal.snapshot.rsi,
                macd = signal.snapshot.macd,
                atr = signal.snapshot.atr,
            )
        }
        NotifyEvent::TakeProfitHit { trade, price } => format!(
            "🎯 {sym} hit take-profit at {price:.6} USDT ({dir} from {entry:.6})",
            sym = trade.symbol,
            dir = trade.direction,
            entry = trade.entry_price,
        ),
        NotifyEvent::StopLossHit { trade, price } => format!(
            "⛔ {sym} hit stop-loss at {price:.6} USDT ({dir} from {entry:.6})",
            sym = trade.symbol,
            dir = trade.direction,
            entry = trade.entry_price,
        ),
    }
}

fn pct_distance(entry: f64, level: f64) -> f64 {
    if entry <= 0.0 {
        return 0.0;
    }
    ((level - entry) / entry * 100.0).abs()
}
