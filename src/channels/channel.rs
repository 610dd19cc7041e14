//! Channel trait and message types.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use uuid::Uuid;

use crate::error::ChannelError;

/// Stream of incoming messages produced by a channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// A message received from a chat channel.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Correlation id carried through log fields.
    pub id: Uuid,
    /// Which channel produced this message.
    pub channel: String,
    /// Stable sender identity (numeric user id where the channel has one).
    pub sender: String,
    /// Display name, when the channel knows one.
    pub sender_name: Option<String>,
    /// Raw message text.
    pub text: String,
    /// Channel-specific routing data (e.g. `chat_id` for Telegram).
    pub metadata: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

impl IncomingMessage {
    pub fn new(channel: &str, sender: &str, text: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.to_string(),
            sender: sender.to_string(),
            sender_name: None,
            text: text.to_string(),
            metadata: serde_json::json!({}),
            received_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_sender_name(mut self, name: &str) -> Self {
        self.sender_name = Some(name.to_string());
        self
    }

    /// The chat this message came from, when the channel recorded one.
    pub fn chat_id(&self) -> Option<&str> {
        self.metadata.get("chat_id").and_then(|v| v.as_str())
    }
}

/// A file ready for delivery to the user.
#[derive(Debug, Clone)]
pub struct DocumentPayload {
    pub data: Vec<u8>,
    pub filename: String,
    pub caption: Option<String>,
}

/// Handle to an ephemeral status message, so the channel can edit it to
/// the outcome or remove it once the real answer is on its way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeHandle(pub String);

/// A chat transport.
///
/// `start` may be called once; it yields the channel's message stream.
/// The notice methods have working defaults for channels that cannot
/// edit sent messages: the notice degrades to a plain text message and
/// the handle stays `None`.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Short channel name for logs.
    fn name(&self) -> &str;

    /// Begin receiving and return the stream of incoming messages.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Send plain text back to the chat a message came from.
    async fn send_text(&self, msg: &IncomingMessage, text: &str) -> Result<(), ChannelError>;

    /// Post an ephemeral status message.
    async fn send_notice(
        &self,
        msg: &IncomingMessage,
        text: &str,
    ) -> Result<Option<NoticeHandle>, ChannelError> {
        self.send_text(msg, text).await?;
        Ok(None)
    }

    /// Replace a notice's text in place.
    async fn edit_notice(
        &self,
        msg: &IncomingMessage,
        _notice: &NoticeHandle,
        text: &str,
    ) -> Result<(), ChannelError> {
        self.send_text(msg, text).await
    }

    /// Remove a notice once it has served its purpose.
    async fn clear_notice(
        &self,
        _msg: &IncomingMessage,
        _notice: &NoticeHandle,
    ) -> Result<(), ChannelError> {
        Ok(())
    }

    /// Deliver a document to the chat a message came from.
    async fn send_document(
        &self,
        msg: &IncomingMessage,
        document: DocumentPayload,
    ) -> Result<(), ChannelError>;

    /// Verify the channel can reach its backing service.
    async fn health_check(&self) -> Result<(), ChannelError>;

    async fn shutdown(&self) -> Result<(), ChannelError>;
}
