//! Telegram channel — long-polls the Bot API for updates.
//!
//! Also carries the webhook-info and webhook-delete calls used by the
//! bootstrap/ops layer; the conversation core never touches those.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::channels::{Channel, IncomingMessage, MessageStream};
use crate::error::ChannelError;

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Long-poll timeout passed to getUpdates, in seconds.
const POLL_TIMEOUT_SECS: u64 = 30;

/// Telegram channel — connects to the Bot API via long-polling.
pub struct TelegramChannel {
    bot_token: SecretString,
    client: reqwest::Client,
}

// ── Wire types (Bot API subset) ─────────────────────────────────────

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    #[serde(default)]
    result: Vec<Update>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    chat: TgChat,
    text: Option<String>,
    from: Option<TgUser>,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TgUser {
    username: Option<String>,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString) -> Self {
        Self {
            bot_token,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "https://api.telegram.org/bot{}/{method}",
            self.bot_token.expose_secret()
        )
    }

    /// Send a single message chunk (≤4096 chars).
    async fn send_chunk(&self, chat_id: &str, text: &str) -> Result<(), ChannelError> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });

        let resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!("sendMessage returned {status}: {detail}"),
            });
        }

        Ok(())
    }

    // ── Webhook maintenance (bootstrap/ops only) ────────────────────

    /// Fetch the raw getWebhookInfo response body.
    pub async fn webhook_info(&self) -> Result<String, ChannelError> {
        self.webhook_call("getWebhookInfo").await
    }

    /// Delete any registered webhook; returns the raw response body.
    pub async fn delete_webhook(&self) -> Result<String, ChannelError> {
        self.webhook_call("deleteWebhook").await
    }

    async fn webhook_call(&self, method: &str) -> Result<String, ChannelError> {
        let resp = self
            .client
            .get(self.api_url(method))
            .send()
            .await
            .map_err(|e| ChannelError::WebhookFailed {
                op: method.to_string(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ChannelError::WebhookFailed {
                op: method.to_string(),
                reason: format!("{status}: {body}"),
            });
        }
        Ok(body)
    }

    /// Convert one Bot API update into an inbound event, if it carries a
    /// message. Non-text content becomes an empty-content event with a
    /// text_missing marker rather than being dropped.
    fn incoming_from_update(update: &Update) -> Option<IncomingMessage> {
        let message = update.message.as_ref()?;
        let chat_id = message.chat.id.to_string();
        let username = message
            .from
            .as_ref()
            .and_then(|u| u.username.as_deref())
            .unwrap_or("unknown");

        let (content, text_missing) = match message.text.as_deref() {
            Some(text) => (text, false),
            None => ("", true),
        };

        Some(
            IncomingMessage::new("telegram", &chat_id, content).with_metadata(serde_json::json!({
                "username": username,
                "text_missing": text_missing,
            })),
        )
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let client = self.client.clone();
        let url = self.api_url("getUpdates");

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for messages...");

            loop {
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": POLL_TIMEOUT_SECS,
                    "allowed_updates": ["message"],
                });

                let resp = match client.post(&url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let data: UpdatesResponse = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                for update in &data.result {
                    offset = offset.max(update.update_id + 1);

                    let Some(incoming) = Self::incoming_from_update(update) else {
                        continue;
                    };

                    if tx.send(incoming).is_err() {
                        tracing::info!("Telegram listener channel closed");
                        return;
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn send_to(&self, user_id: &str, text: &str) -> Result<(), ChannelError> {
        for chunk in split_message(text, TELEGRAM_MAX_MESSAGE_LENGTH) {
            self.send_chunk(user_id, &chunk).await?;
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: format!("getMe returned {}", resp.status()),
            })
        }
    }
}

/// Split a message into chunks that fit Telegram's character limit.
/// Prefers newline boundaries, falls back to a hard cut at a char boundary.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while remaining.len() > max_len {
        // Largest char-boundary offset that fits.
        let mut cut = max_len;
        while !remaining.is_char_boundary(cut) {
            cut -= 1;
        }
        let cut = match remaining[..cut].rfind('\n') {
            Some(nl) if nl > 0 => nl,
            _ => cut,
        };

        chunks.push(remaining[..cut].to_string());
        remaining = remaining[cut..].trim_start_matches('\n');
    }

    if !remaining.is_empty() {
        chunks.push(remaining.to_string());
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> TelegramChannel {
        TelegramChannel::new(SecretString::from("123:ABC"))
    }

    #[test]
    fn telegram_channel_name() {
        assert_eq!(channel().name(), "telegram");
    }

    #[test]
    fn telegram_api_url() {
        assert_eq!(
            channel().api_url("getMe"),
            "https://api.telegram.org/bot123:ABC/getMe"
        );
    }

    #[test]
    fn telegram_api_url_webhook_methods() {
        let ch = channel();
        assert_eq!(
            ch.api_url("getWebhookInfo"),
            "https://api.telegram.org/bot123:ABC/getWebhookInfo"
        );
        assert_eq!(
            ch.api_url("deleteWebhook"),
            "https://api.telegram.org/bot123:ABC/deleteWebhook"
        );
    }

    #[test]
    fn update_with_text_becomes_incoming() {
        let update: Update = serde_json::from_value(serde_json::json!({
            "update_id": 7,
            "message": {
                "chat": {"id": 99887766},
                "text": "hello",
                "from": {"username": "alice"}
            }
        }))
        .unwrap();

        let msg = TelegramChannel::incoming_from_update(&update).unwrap();
        assert_eq!(msg.user_id, "99887766");
        assert_eq!(msg.content, "hello");
        assert!(!msg.is_text_missing());
        assert_eq!(msg.metadata["username"], "alice");
    }

    #[test]
    fn update_without_text_gets_placeholder() {
        let update: Update = serde_json::from_value(serde_json::json!({
            "update_id": 8,
            "message": {
                "chat": {"id": 5},
                "from": {}
            }
        }))
        .unwrap();

        let msg = TelegramChannel::incoming_from_update(&update).unwrap();
        assert_eq!(msg.content, "");
        assert!(msg.is_text_missing());
        assert_eq!(msg.metadata["username"], "unknown");
    }

    #[test]
    fn update_without_message_is_skipped() {
        let update: Update =
            serde_json::from_value(serde_json::json!({"update_id": 9})).unwrap();
        assert!(TelegramChannel::incoming_from_update(&update).is_none());
    }

    #[test]
    fn split_message_short() {
        assert_eq!(split_message("Hello", 4096), vec!["Hello"]);
    }

    #[test]
    fn split_message_exact_limit() {
        let msg = "a".repeat(4096);
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 4096);
    }

    #[test]
    fn split_message_prefers_newline() {
        let msg = format!("{}\n{}", "a".repeat(2000), "b".repeat(3000));
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "a".repeat(2000));
        assert_eq!(chunks[1], "b".repeat(3000));
    }

    #[test]
    fn split_message_hard_cut() {
        let msg = "a".repeat(5000);
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 4096);
        assert_eq!(chunks[1].len(), 904);
    }

    #[test]
    fn split_message_respects_char_boundaries() {
        let msg = "é".repeat(3000); // 2 bytes per char
        let chunks = split_message(&msg, 4096);
        assert!(chunks.len() >= 2);
        assert_eq!(chunks.concat(), msg);
    }
}
