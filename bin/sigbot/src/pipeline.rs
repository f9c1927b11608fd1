use tokio::sync::mpsc;
use tracing::{info, warn};

use common::{NotifyEvent, PricePoint};
use indicators::{IndicatorEngine, RollingWindow};
use signals::{Evaluator, EvaluatorConfig};
use tracker::{PositionTracker, TradeEvent};

/// Everything one symbol needs, owned in one place: rolling window, indicator
/// engine, evaluator, trade tracker and the notify queue handle. One pipeline
/// task per symbol, no state shared across symbols.
pub struct SymbolPipeline {
    symbol: String,
    window: RollingWindow,
    engine: IndicatorEngine,
    evaluator: Evaluator,
    tracker: PositionTracker,
    notify_tx: mpsc::Sender<NotifyEvent>,
}

impl SymbolPipeline {
    pub fn new(
        symbol: impl Into<String>,
        config: &EvaluatorConfig,
        notify_tx: mpsc::Sender<NotifyEvent>,
    ) -> Self {
        let symbol = symbol.into();
        Self {
            window: RollingWindow::new(config.window_len),
            engine: IndicatorEngine::new(config.indicators.clone()),
            evaluator: Evaluator::new(config.clone()),
            tracker: PositionTracker::new(symbol.clone(), config.trailing_stop),
            notify_tx,
            symbol,
        }
    }

    /// Consume price points until the feed side hangs up.
    /// Call this inside a `tokio::spawn`.
    pub async fn run(mut self, mut price_rx: mpsc::Receiver<PricePoint>) {
        info!(symbol = %self.symbol, "Pipeline running");
        while let Some(point) = price_rx.recv().await {
            self.process(&point);
        }
        info!(symbol = %self.symbol, "Price channel closed, pipeline exiting");
    }

    /// Handle one price point, strictly in arrival order.
    ///
    /// The open trade's TP/SL check always runs before any new evaluation,
    /// and the tick that closes a trade never opens a new one.
    pub fn process(&mut self, point: &PricePoint) {
        if let Some(event) = self.tracker.on_price(point.price) {
            self.queue(match event {
                TradeEvent::TakeProfitHit { trade, price } => {
                    NotifyEvent::TakeProfitHit { trade, price }
                }
                TradeEvent::StopLossHit { trade, price } => {
                    NotifyEvent::StopLossHit { trade, price }
                }
            });
            return;
        }

        // The window holds closing prices only; sub-tick updates of an open
        // candle are used for TP/SL checks above but not folded in.
        if !point.is_closed {
            return;
        }
        self.window.push(point.price);

        let snapshot = self.engine.compute(&self.window);
        if let Some(signal) =
            self.evaluator
                .evaluate(&self.symbol, point.price, &snapshot, self.tracker.is_open())
        {
            if self.tracker.open(&signal).is_some() {
                self.queue(NotifyEvent::SignalOpened(signal));
            }
        }
    }

    /// Fire-and-forget handoff to the notifier. A full queue drops the event
    /// rather than stalling market processing.
    fn queue(&self, event: NotifyEvent) {
        if let Err(e) = self.notify_tx.try_send(event) {
            warn!(symbol = %self.symbol, error = %e, "Notification queue full, dropping event");
        }
    }
}
