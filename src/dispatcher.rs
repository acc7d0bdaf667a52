//! Dispatcher — classifies inbound events and drives the delivery loop.

use std::sync::Arc;

use futures::StreamExt;

use crate::channels::{Channel, IncomingMessage, OutgoingResponse};
use crate::error::Result;
use crate::intake::IntakeEngine;

/// Fixed reply for /status.
pub const STATUS_TEXT: &str = "✅ Bot is running and connected to Telegram.";

/// Recognized bot commands. Anything else is free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Status,
    EchoOn,
    EchoOff,
}

/// Classify a message as a command by its first whitespace-separated token.
/// Matching is exact and case-sensitive; unknown `/foo` is free text.
pub fn classify(text: &str) -> Option<Command> {
    match text.split_whitespace().next()? {
        "/start" => Some(Command::Start),
        "/status" => Some(Command::Status),
        "/echoon" => Some(Command::EchoOn),
        "/echooff" => Some(Command::EchoOff),
        _ => None,
    }
}

/// Route one inbound event to its handler, returning the replies to send.
///
/// Every inbound message is logged (with a placeholder when the platform
/// delivered no representable text) before any processing.
pub async fn handle_event(
    engine: &IntakeEngine,
    msg: &IncomingMessage,
) -> Vec<OutgoingResponse> {
    let logged_text = if msg.is_text_missing() {
        "<non-text>"
    } else {
        msg.content.as_str()
    };
    tracing::info!(user = %msg.user_id, text = %logged_text, "Received message");

    match classify(&msg.content) {
        Some(Command::Start) => engine.start(&msg.user_id).await,
        Some(Command::Status) => vec![OutgoingResponse::text(STATUS_TEXT)],
        Some(Command::EchoOn) => vec![engine.set_echo(&msg.user_id, true).await],
        Some(Command::EchoOff) => vec![engine.set_echo(&msg.user_id, false).await],
        None => engine.answer(&msg.user_id, &msg.content).await,
    }
}

/// Consumes the channel's event stream and fans replies back out.
pub struct Dispatcher {
    channel: Arc<dyn Channel>,
    engine: Arc<IntakeEngine>,
}

impl Dispatcher {
    pub fn new(channel: Arc<dyn Channel>, engine: Arc<IntakeEngine>) -> Self {
        Self { channel, engine }
    }

    /// Run the delivery loop until the stream ends or ctrl-c.
    ///
    /// Each event is handled on its own task, so users proceed in parallel;
    /// same-user ordering is enforced by the engine's store locks. Send
    /// failures are logged and swallowed — one blocked user must not take
    /// down the loop.
    pub async fn run(&self) -> Result<()> {
        let mut stream = self.channel.start().await?;

        tracing::info!(channel = %self.channel.name(), "Dispatcher ready and listening");

        loop {
            let message = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received, shutting down...");
                    break;
                }
                msg = stream.next() => {
                    match msg {
                        Some(m) => m,
                        None => {
                            tracing::info!("Channel stream ended, shutting down...");
                            break;
                        }
                    }
                }
            };

            let channel = Arc::clone(&self.channel);
            let engine = Arc::clone(&self.engine);
            tokio::spawn(async move {
                for reply in handle_event(&engine, &message).await {
                    if let Err(e) = channel.respond(&message, reply).await {
                        tracing::warn!(user = %message.user_id, error = %e, "Failed to send reply");
                    }
                }
            });
        }

        Ok(())
    }
}
