use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use intake_bot::channels::{Channel, TelegramChannel};
use intake_bot::config::BotConfig;
use intake_bot::dispatcher::Dispatcher;
use intake_bot::intake::IntakeEngine;
use intake_bot::ops;
use intake_bot::sink::CsvSink;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before reading any configuration
    dotenvy::dotenv().ok();

    let cli = ops::Cli::parse();

    // Initialize tracing: console plus bot.log file output
    let file_appender = tracing_appender::rolling::never(".", "bot.log");
    let (file_writer, _log_guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();

    let config = BotConfig::from_env().map_err(|e| {
        eprintln!("  Create a .env file with TELEGRAM_BOT_TOKEN=your_token or set the variable in your environment.");
        intake_bot::error::Error::from(e)
    })?;

    let channel = TelegramChannel::new(config.bot_token.clone());

    // Maintenance flags run their operation and exit
    if cli.wants_webhook_maintenance() {
        ops::run_webhook_maintenance(&cli, &channel).await?;
        return Ok(());
    }

    eprintln!("🤖 intake-bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Questions: {}", config.questions.len());
    eprintln!("   Records: {}", config.csv_path);

    // Polling conflicts with a registered webhook; clear it unless disabled
    if config.auto_clear_webhook {
        if let Err(e) = ops::reconcile_webhook(&channel).await {
            tracing::warn!(error = %e, "Webhook reconciliation failed; continuing anyway");
        }
    } else {
        tracing::info!("AUTO_CLEAR_WEBHOOK is disabled; skipping webhook reconciliation");
    }

    if let Err(e) = channel.health_check().await {
        tracing::warn!(error = %e, "Telegram health check failed");
    }

    eprintln!("Bot polling started...");

    if let Some(ref owner) = config.owner_chat_id {
        match channel.send_to(owner, "✅ Bot has started and is now polling.").await {
            Ok(()) => tracing::info!(owner = %owner, "Startup notification sent"),
            Err(e) => {
                tracing::warn!(owner = %owner, error = %e, "Could not send startup notification")
            }
        }
    }

    let sink = Arc::new(CsvSink::new(&config.csv_path));
    let engine = Arc::new(IntakeEngine::new(config.questions.clone(), sink));
    let dispatcher = Dispatcher::new(Arc::new(channel), engine);

    dispatcher.run().await?;

    Ok(())
}
