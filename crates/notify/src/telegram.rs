use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::RequestError;

use crate::{MessageSink, SinkError};

/// Telegram delivery via the Bot API.
pub struct TelegramSink {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramSink {
    pub fn new(token: impl Into<String>, chat_id: i64) -> Self {
        Self {
            bot: Bot::new(token.into()),
            chat_id: ChatId(chat_id),
        }
    }
}

#[async_trait]
impl MessageSink for TelegramSink {
    async fn send_text(&self, text: &str) -> Result<(), SinkError> {
        match self.bot.send_message(self.chat_id, text).await {
            Ok(_) => Ok(()),
            Err(RequestError::RetryAfter(retry_after)) => {
                Err(SinkError::RateLimited { retry_after })
            }
            Err(e) => Err(SinkError::Transient(e.to_string())),
        }
    }
}
