use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use common::NotifyEvent;

use crate::format::format_event;
use crate::{MessageSink, SinkError};

/// Drains the notification queue and delivers each message through the sink
/// with a bounded retry loop.
///
/// Rate-limit responses wait the provider-specified delay; transient errors
/// wait a short fixed backoff. A message is attempted at most `max_attempts`
/// times and the whole delivery runs under `message_timeout`, so a stalled
/// chat API can never stall market-event processing.
pub struct Notifier {
    sink: Arc<dyn MessageSink>,
    max_attempts: u32,
    transient_backoff: Duration,
    message_timeout: Duration,
}

impl Notifier {
    pub fn new(sink: Arc<dyn MessageSink>) -> Self {
        Self {
            sink,
            max_attempts: 2, // one retry
            transient_backoff: Duration::from_secs(1),
            message_timeout: Duration::from_secs(30),
        }
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        assert!(attempts >= 1, "at least one attempt is required");
        self.max_attempts = attempts;
        self
    }

    pub fn transient_backoff(mut self, backoff: Duration) -> Self {
        self.transient_backoff = backoff;
        self
    }

    pub fn message_timeout(mut self, timeout: Duration) -> Self {
        self.message_timeout = timeout;
        self
    }

    /// Run the delivery loop until the queue's senders are all dropped.
    /// Call this inside a `tokio::spawn`.
    pub async fn run(self, mut rx: mpsc::Receiver<NotifyEvent>) {
        info!("Notifier running");
        while let Some(event) = rx.recv().await {
            let symbol = event.symbol().to_string();
            let text = format_event(&event);

            match tokio::time::timeout(self.message_timeout, self.deliver(&text)).await {
                Ok(true) => debug!(symbol = %symbol, "Notification delivered"),
                Ok(false) => {
                    warn!(symbol = %symbol, attempts = self.max_attempts, "Notification dropped after max attempts");
                }
                Err(_) => {
                    warn!(symbol = %symbol, timeout = ?self.message_timeout, "Notification dropped on delivery timeout");
                }
            }
        }
        info!("Notification queue closed, notifier exiting");
    }

    /// Attempt delivery up to `max_attempts` times. Returns whether the
    /// message went out.
    async fn deliver(&self, text: &str) -> bool {
        for attempt in 1..=self.max_attempts {
            match self.sink.send_text(text).await {
                Ok(()) => return true,
                Err(SinkError::RateLimited { retry_after }) if attempt < self.max_attempts => {
                    warn!(attempt, retry_after = ?retry_after, "Rate limited, backing off");
                    tokio::time::sleep(retry_after).await;
                }
                Err(SinkError::Transient(e)) if attempt < self.max_attempts => {
                    warn!(attempt, error = %e, "Delivery failed, retrying");
                    tokio::time::sleep(self.transient_backoff).await;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Delivery failed on final attempt");
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::{Direction, IndicatorSnapshot, NotifyEvent, Signal};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Sink that replays a script of responses and records call times.
    struct ScriptedSink {
        script: Mutex<VecDeque<Result<(), SinkError>>>,
        calls: Mutex<Vec<Instant>>,
    }

    impl ScriptedSink {
        fn new(script: Vec<Result<(), SinkError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessageSink for ScriptedSink {
        async fn send_text(&self, _text: &str) -> Result<(), SinkError> {
            self.calls.lock().unwrap().push(Instant::now());
            self.script.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }
    }

    fn event() -> NotifyEvent {
        NotifyEvent::SignalOpened(Signal {
            symbol: "BTCUSDT".into(),
            direction: Direction::Long,
            entry_price: 100.0,
            take_profit: 106.0,
            stop_loss: 97.0,
            snapshot: IndicatorSnapshot::empty(),
        })
    }

    async fn run_notifier(notifier: Notifier, events: Vec<NotifyEvent>) {
        let (tx, rx) = mpsc::channel(16);
        let handle = tokio::spawn(notifier.run(rx));
        for ev in events {
            tx.send(ev).await.unwrap();
        }
        drop(tx);
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_retries_once_after_provider_delay() {
        let sink = ScriptedSink::new(vec![
            Err(SinkError::RateLimited {
                retry_after: Duration::from_secs(5),
            }),
            Ok(()),
        ]);
        let notifier = Notifier::new(sink.clone());

        run_notifier(notifier, vec![event()]).await;

        let calls = sink.call_times();
        assert_eq!(calls.len(), 2, "exactly one retry expected");
        assert!(
            calls[1] - calls[0] >= Duration::from_secs(5),
            "retry must wait at least the provider delay"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn sustained_rate_limit_drops_after_max_attempts() {
        let limited = || {
            Err(SinkError::RateLimited {
                retry_after: Duration::from_secs(1),
            })
        };
        let sink = ScriptedSink::new(vec![limited(), limited(), limited(), limited()]);
        let notifier = Notifier::new(sink.clone()).max_attempts(2);

        run_notifier(notifier, vec![event()]).await;

        // Bounded: never the unbounded recursive retry of old.
        assert_eq!(sink.call_times().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_retries_then_delivers() {
        let sink = ScriptedSink::new(vec![
            Err(SinkError::Transient("connection reset".into())),
            Ok(()),
        ]);
        let notifier = Notifier::new(sink.clone()).transient_backoff(Duration::from_millis(100));

        run_notifier(notifier, vec![event()]).await;

        assert_eq!(sink.call_times().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn absurd_retry_after_is_cut_by_message_timeout() {
        let sink = ScriptedSink::new(vec![
            Err(SinkError::RateLimited {
                retry_after: Duration::from_secs(3600),
            }),
            Ok(()),
        ]);
        let notifier = Notifier::new(sink.clone()).message_timeout(Duration::from_secs(30));

        run_notifier(notifier, vec![event()]).await;

        // The hour-long backoff is abandoned at the 30s message timeout.
        assert_eq!(sink.call_times().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn queue_keeps_flowing_after_a_dropped_message() {
        let sink = ScriptedSink::new(vec![
            Err(SinkError::Transient("boom".into())),
            Err(SinkError::Transient("boom".into())),
            Ok(()),
        ]);
        let notifier = Notifier::new(sink.clone()).transient_backoff(Duration::from_millis(10));

        run_notifier(notifier, vec![event(), event()]).await;

        // First message burns two attempts and is dropped; second delivers.
        assert_eq!(sink.call_times().len(), 3);
    }
}
