use crate::StreamKind;

/// All configuration loaded from environment variables at startup.
/// Missing required variables cause an immediate panic with a clear message:
/// there is nothing useful the bot can do without them.
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub telegram_token: String,
    pub telegram_chat_id: i64,

    // Market data feed
    pub feed_endpoint: String,
    pub symbols: Vec<String>,
    pub stream_kind: StreamKind,
    pub kline_interval: String,

    // Evaluator threshold file (TOML)
    pub signal_config_path: String,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present. Panics on any missing required variable.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let telegram_chat_id = required_env("TELEGRAM_CHAT_ID")
            .trim()
            .parse::<i64>()
            .unwrap_or_else(|_| panic!("TELEGRAM_CHAT_ID must be a numeric chat ID"));

        let symbols: Vec<String> = required_env("SYMBOLS")
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        if symbols.is_empty() {
            panic!("SYMBOLS must contain at least one symbol, e.g. 'BTCUSDT,ETHUSDT'");
        }

        let stream_kind = match optional_env("STREAM_KIND")
            .unwrap_or_else(|| "kline".to_string())
            .to_lowercase()
            .as_str()
        {
            "kline" => StreamKind::Kline,
            "trade" => StreamKind::Trade,
            other => panic!("STREAM_KIND must be 'kline' or 'trade', got: '{other}'"),
        };

        Config {
            telegram_token: required_env("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id,
            feed_endpoint: optional_env("FEED_ENDPOINT")
                .unwrap_or_else(|| "wss://fstream.binance.com/ws".to_string()),
            symbols,
            stream_kind,
            kline_interval: optional_env("KLINE_INTERVAL").unwrap_or_else(|| "1m".to_string()),
            signal_config_path: optional_env("SIGNAL_CONFIG_PATH")
                .unwrap_or_else(|| "config/signal.toml".to_string()),
        }
    }
}

fn required_env(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        panic!("Required environment variable '{key}' is not set. Check your .env file.")
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
