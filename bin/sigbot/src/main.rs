mod pipeline;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use common::{Config, NotifyEvent, PricePoint};
use feed::MarketStream;
use notify::{Notifier, TelegramSink};
use signals::EvaluatorConfig;

use pipeline::SymbolPipeline;

#[tokio::main]
async fn main() {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    // ── Config ───────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    info!(symbols = ?cfg.symbols, stream = %cfg.stream_kind, "sigbot starting");
    let eval_cfg = EvaluatorConfig::load(&cfg.signal_config_path);

    // ── Notifier ─────────────────────────────────────────────────────────────
    let (notify_tx, notify_rx) = mpsc::channel::<NotifyEvent>(256);
    let sink = Arc::new(TelegramSink::new(
        cfg.telegram_token.clone(),
        cfg.telegram_chat_id,
    ));
    let notifier_handle = tokio::spawn(Notifier::new(sink).run(notify_rx));

    // ── One feed + one pipeline task per symbol ──────────────────────────────
    let mut feed_handles = Vec::new();
    let mut pipeline_handles = Vec::new();
    for symbol in &cfg.symbols {
        let (price_tx, price_rx) = mpsc::channel::<PricePoint>(1024);

        let stream = MarketStream::new(
            cfg.feed_endpoint.clone(),
            symbol.clone(),
            cfg.stream_kind,
            cfg.kline_interval.clone(),
            price_tx,
        );
        feed_handles.push(tokio::spawn(stream.run()));

        let pipeline = SymbolPipeline::new(symbol.clone(), &eval_cfg, notify_tx.clone());
        pipeline_handles.push(tokio::spawn(pipeline.run(price_rx)));
    }
    // The notifier's queue closes once every pipeline drops its sender.
    drop(notify_tx);

    info!("All subsystems started. Waiting for shutdown signal.");
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install ctrl-c handler");
    info!("Shutdown signal received");

    // Feeds stop first; each pipeline drains its channel and exits.
    for h in feed_handles {
        h.abort();
    }
    for h in pipeline_handles {
        let _ = h.await;
    }

    // Give in-flight notifications a bounded window to complete.
    match tokio::time::timeout(Duration::from_secs(5), notifier_handle).await {
        Ok(_) => info!("Notifier drained. Exiting."),
        Err(_) => warn!("Notifier drain timed out, in-flight notifications dropped"),
    }
}
