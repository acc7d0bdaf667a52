//! Channel trait and message types.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::ChannelError;

/// An inbound event from the messaging platform.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Channel the message arrived on.
    pub channel: String,
    /// Platform-assigned user identity (chat id for Telegram).
    pub user_id: String,
    /// Message text. Empty when the platform delivered non-text content.
    pub content: String,
    /// Channel-specific extras (username, text_missing marker).
    pub metadata: serde_json::Value,
}

impl IncomingMessage {
    pub fn new(channel: &str, user_id: &str, content: &str) -> Self {
        Self {
            channel: channel.to_string(),
            user_id: user_id.to_string(),
            content: content.to_string(),
            metadata: serde_json::json!({}),
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Whether the platform delivered this event without representable text.
    pub fn is_text_missing(&self) -> bool {
        self.metadata
            .get("text_missing")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }
}

/// An outbound reply instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingResponse {
    pub content: String,
}

impl OutgoingResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Stream of inbound events produced by a channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// A message transport the dispatcher talks through.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name for logging.
    fn name(&self) -> &str;

    /// Start delivering inbound events.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Send a reply to the user a message came from.
    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        self.send_to(&msg.user_id, &response.content).await
    }

    /// Send a message to an arbitrary user id.
    async fn send_to(&self, user_id: &str, text: &str) -> Result<(), ChannelError>;

    /// Verify the channel can reach the platform.
    async fn health_check(&self) -> Result<(), ChannelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_missing_defaults_to_false() {
        let msg = IncomingMessage::new("telegram", "42", "hello");
        assert!(!msg.is_text_missing());
    }

    #[test]
    fn text_missing_flag_read_from_metadata() {
        let msg = IncomingMessage::new("telegram", "42", "")
            .with_metadata(serde_json::json!({"text_missing": true}));
        assert!(msg.is_text_missing());
    }
}
