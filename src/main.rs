use std::sync::Arc;

use futures::StreamExt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use docferry::channels::{Channel, CliChannel, TelegramChannel, UpdateMode};
use docferry::config::BotConfig;
use docferry::health::health_routes;
use docferry::metrics::BotStats;
use docferry::pipeline::MessageProcessor;
use docferry::resolve::{ReqwestTransport, Resolver};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _log_guard = init_tracing();

    let config = BotConfig::from_env()?;

    eprintln!("docferry v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Port: {}", config.port);
    eprintln!(
        "   Updates: {}",
        if config.webhook_enabled() {
            "webhook"
        } else {
            "long polling"
        }
    );
    eprintln!(
        "   Services: {} configured, {:?} per call\n",
        config.services.len(),
        config.per_call_timeout,
    );

    let resolver = Arc::new(Resolver::new(
        &config.services,
        Arc::new(ReqwestTransport),
        config.per_call_timeout,
    )?);

    // Health routes always serve; the Telegram webhook route joins them
    // when webhook mode is on.
    let mut app = health_routes();

    let channel: Arc<dyn Channel> = match config.bot_token.clone() {
        Some(token) => {
            let mode = match config.webhook_url.clone() {
                Some(public_url) => UpdateMode::Webhook { public_url },
                None => UpdateMode::Polling,
            };
            let telegram = TelegramChannel::new(token, mode);
            if config.webhook_enabled() {
                app = app.merge(telegram.router());
            }
            Arc::new(telegram)
        }
        None => {
            tracing::warn!("BOT_TOKEN not set, serving the CLI channel instead of Telegram");
            Arc::new(CliChannel::new(config.output_dir.clone()))
        }
    };

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("HTTP server failed: {e}");
        }
    });
    tracing::info!(port = config.port, "Liveness endpoint serving");

    if let Err(e) = channel.health_check().await {
        tracing::warn!(channel = channel.name(), error = %e, "Channel health check failed");
    }

    // The server must be accepting before `start` registers a webhook.
    let mut stream = channel.start().await?;

    let stats = Arc::new(BotStats::new());
    let processor = Arc::new(MessageProcessor::new(
        Arc::clone(&channel),
        resolver,
        stats,
    ));

    tracing::info!(channel = channel.name(), "docferry ready");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }
            next = stream.next() => {
                match next {
                    Some(msg) => {
                        let processor = Arc::clone(&processor);
                        tokio::spawn(async move {
                            processor.handle(msg).await;
                        });
                    }
                    None => {
                        tracing::info!("Message stream ended");
                        break;
                    }
                }
            }
        }
    }

    channel.shutdown().await?;
    Ok(())
}

/// Console layer filtered by `RUST_LOG` plus a non-blocking file layer.
/// The returned guard flushes the file writer on drop.
fn init_tracing() -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = tracing_appender::rolling::never(".", "docferry.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .init();

    guard
}
