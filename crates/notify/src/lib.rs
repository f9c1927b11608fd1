pub mod format;
pub mod telegram;
pub mod worker;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use telegram::TelegramSink;
pub use worker::Notifier;

/// Delivery failure reported by a message sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("delivery failed: {0}")]
    Transient(String),
}

/// Outbound message sink.
///
/// `TelegramSink` implements this for production; tests inject a scripted
/// mock. Only the notifier worker holds a sink — the market pipelines enqueue
/// events and never await delivery.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send_text(&self, text: &str) -> Result<(), SinkError>;
}
