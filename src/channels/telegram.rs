//! Telegram channel over the raw Bot API.
//!
//! Updates arrive either by long-polling `getUpdates` or by webhook
//! push; both paths parse updates the same way and feed the same
//! message stream. Outbound text is sent Markdown-first with a plain
//! fallback, so a template with stray markup still reaches the user.

use std::time::Duration;

use async_trait::async_trait;
use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use futures::stream;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{Mutex, mpsc};

use crate::channels::channel::{
    Channel, DocumentPayload, IncomingMessage, MessageStream, NoticeHandle,
};
use crate::error::ChannelError;

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Seconds to wait before retrying after a failed poll.
const POLL_RETRY_SECS: u64 = 5;

/// How updates reach the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateMode {
    /// Long-poll `getUpdates` with an advancing offset.
    Polling,
    /// Telegram pushes updates to `{public_url}/{token}`.
    Webhook { public_url: String },
}

/// Telegram channel — connects to the Bot API.
pub struct TelegramChannel {
    bot_token: SecretString,
    mode: UpdateMode,
    client: reqwest::Client,
    // Both receive paths push into this sender; `start` takes the
    // receiver exactly once.
    incoming_tx: mpsc::UnboundedSender<IncomingMessage>,
    incoming_rx: Mutex<Option<mpsc::UnboundedReceiver<IncomingMessage>>>,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString, mode: UpdateMode) -> Self {
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        Self {
            bot_token,
            mode,
            client: reqwest::Client::new(),
            incoming_tx,
            incoming_rx: Mutex::new(Some(incoming_rx)),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "https://api.telegram.org/bot{}/{method}",
            self.bot_token.expose_secret()
        )
    }

    /// Path the webhook route is mounted at. Using the token keeps the
    /// route unguessable, per the Bot API docs.
    fn webhook_path(&self) -> String {
        format!("/{}", self.bot_token.expose_secret())
    }

    /// Router for webhook mode. Merge into the app router and serve it
    /// before calling `start`, which registers the webhook.
    pub fn router(&self) -> Router {
        let state = WebhookState {
            incoming_tx: self.incoming_tx.clone(),
        };
        Router::new()
            .route(&self.webhook_path(), post(receive_update))
            .with_state(state)
    }

    /// Spawn the long-poll loop. Runs until the stream side hangs up.
    fn spawn_poll_loop(&self) {
        let url = self.api_url("getUpdates");
        let client = self.client.clone();
        let tx = self.incoming_tx.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            loop {
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": 30,
                    "allowed_updates": ["message"],
                });

                let resp = match client.post(&url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(Duration::from_secs(POLL_RETRY_SECS)).await;
                        continue;
                    }
                };

                let data: serde_json::Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram response parse error: {e}");
                        tokio::time::sleep(Duration::from_secs(POLL_RETRY_SECS)).await;
                        continue;
                    }
                };

                if !data.get("ok").and_then(|o| o.as_bool()).unwrap_or(false) {
                    tracing::warn!("getUpdates returned an error reply");
                    tokio::time::sleep(Duration::from_secs(POLL_RETRY_SECS)).await;
                    continue;
                }

                let Some(updates) = data.get("result").and_then(|r| r.as_array()) else {
                    continue;
                };

                for update in updates {
                    if let Some(update_id) = update.get("update_id").and_then(|u| u.as_i64()) {
                        offset = update_id + 1;
                    }

                    let Some(incoming) = message_from_update(update) else {
                        continue;
                    };

                    if tx.send(incoming).is_err() {
                        tracing::info!("Telegram message stream dropped, stopping poll loop");
                        return;
                    }
                }
            }
        });
    }

    /// Register this bot's webhook with Telegram.
    async fn register_webhook(&self, public_url: &str) -> Result<(), ChannelError> {
        let body = serde_json::json!({
            "url": format!("{public_url}{}", self.webhook_path()),
            "allowed_updates": ["message"],
        });

        let resp = self
            .client
            .post(self.api_url("setWebhook"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".to_string(),
                reason: format!("setWebhook request failed: {e}"),
            })?;

        if !resp.status().is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(ChannelError::StartupFailed {
                name: "telegram".to_string(),
                reason: format!("setWebhook rejected: {detail}"),
            });
        }

        Ok(())
    }

    /// Send one message, trying Markdown first and falling back to
    /// plain text. Returns the new message's id.
    async fn send_chunk(&self, chat_id: &str, text: &str) -> Result<i64, ChannelError> {
        let url = self.api_url("sendMessage");

        let markdown_body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });

        let resp = self
            .client
            .post(&url)
            .json(&markdown_body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed(format!("Telegram API error: {e}")))?;

        if resp.status().is_success() {
            return message_id_from_reply(resp).await;
        }

        // Markdown parse errors come back as 400; retry without it.
        tracing::warn!(
            status = %resp.status(),
            "Telegram rejected Markdown message, retrying as plain text"
        );

        let plain_body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });

        let resp = self
            .client
            .post(&url)
            .json(&plain_body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed(format!("Telegram API error: {e}")))?;

        if !resp.status().is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed(format!(
                "Telegram rejected message: {detail}"
            )));
        }

        message_id_from_reply(resp).await
    }

    fn chat_id_of<'m>(&self, msg: &'m IncomingMessage) -> Result<&'m str, ChannelError> {
        msg.chat_id()
            .ok_or_else(|| ChannelError::InvalidMessage("message has no chat_id".to_string()))
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let rx = self.incoming_rx.lock().await.take().ok_or_else(|| {
            ChannelError::StartupFailed {
                name: "telegram".to_string(),
                reason: "start() already called".to_string(),
            }
        })?;

        match &self.mode {
            UpdateMode::Polling => {
                self.spawn_poll_loop();
                tracing::info!("Telegram channel long-polling for updates");
            }
            UpdateMode::Webhook { public_url } => {
                self.register_webhook(public_url).await?;
                tracing::info!("Telegram channel receiving updates by webhook");
            }
        }

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn send_text(&self, msg: &IncomingMessage, text: &str) -> Result<(), ChannelError> {
        let chat_id = self.chat_id_of(msg)?;

        for chunk in split_message(text) {
            self.send_chunk(chat_id, &chunk).await?;
        }

        Ok(())
    }

    async fn send_notice(
        &self,
        msg: &IncomingMessage,
        text: &str,
    ) -> Result<Option<NoticeHandle>, ChannelError> {
        let chat_id = self.chat_id_of(msg)?;
        let message_id = self.send_chunk(chat_id, text).await?;
        Ok(Some(NoticeHandle(message_id.to_string())))
    }

    async fn edit_notice(
        &self,
        msg: &IncomingMessage,
        notice: &NoticeHandle,
        text: &str,
    ) -> Result<(), ChannelError> {
        let chat_id = self.chat_id_of(msg)?;
        let message_id = parse_notice_id(notice)?;
        let url = self.api_url("editMessageText");

        let markdown_body = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
            "parse_mode": "Markdown",
        });

        let resp = self
            .client
            .post(&url)
            .json(&markdown_body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed(format!("Telegram API error: {e}")))?;

        if resp.status().is_success() {
            return Ok(());
        }

        let plain_body = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
        });

        let resp = self
            .client
            .post(&url)
            .json(&plain_body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed(format!("Telegram API error: {e}")))?;

        if !resp.status().is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed(format!(
                "Telegram rejected edit: {detail}"
            )));
        }

        Ok(())
    }

    async fn clear_notice(
        &self,
        msg: &IncomingMessage,
        notice: &NoticeHandle,
    ) -> Result<(), ChannelError> {
        let chat_id = self.chat_id_of(msg)?;
        let message_id = parse_notice_id(notice)?;

        let body = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
        });

        let resp = self
            .client
            .post(self.api_url("deleteMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed(format!("Telegram API error: {e}")))?;

        if !resp.status().is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed(format!(
                "Telegram rejected delete: {detail}"
            )));
        }

        Ok(())
    }

    async fn send_document(
        &self,
        msg: &IncomingMessage,
        document: DocumentPayload,
    ) -> Result<(), ChannelError> {
        let chat_id = self.chat_id_of(msg)?;

        let part = Part::bytes(document.data)
            .file_name(document.filename.clone())
            .mime_str("application/pdf")
            .map_err(|e| ChannelError::SendFailed(format!("Invalid MIME type: {e}")))?;

        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", part);

        if let Some(caption) = document.caption {
            form = form.text("caption", caption).text("parse_mode", "Markdown");
        }

        let resp = self
            .client
            .post(self.api_url("sendDocument"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed(format!("Telegram API error: {e}")))?;

        if !resp.status().is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(ChannelError::DeliveryFailed(format!(
                "Telegram rejected document {}: {detail}",
                document.filename
            )));
        }

        tracing::info!(filename = %document.filename, "Document delivered to Telegram");
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|_| ChannelError::HealthCheckFailed {
                name: "telegram".to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::HealthCheckFailed {
                name: "telegram".to_string(),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        if let UpdateMode::Webhook { .. } = self.mode {
            // Best effort; a stale webhook only matters until the next
            // setWebhook call.
            match self.client.post(self.api_url("deleteWebhook")).send().await {
                Ok(resp) if resp.status().is_success() => {
                    tracing::info!("Telegram webhook removed");
                }
                Ok(resp) => {
                    tracing::warn!(status = %resp.status(), "deleteWebhook rejected");
                }
                Err(e) => tracing::warn!("deleteWebhook failed: {e}"),
            }
        }

        tracing::info!("Telegram channel shut down");
        Ok(())
    }
}

// ── Webhook receiver ─────────────────────────────────────────────────

#[derive(Clone)]
struct WebhookState {
    incoming_tx: mpsc::UnboundedSender<IncomingMessage>,
}

async fn receive_update(
    State(state): State<WebhookState>,
    Json(update): Json<serde_json::Value>,
) -> StatusCode {
    match message_from_update(&update) {
        Some(incoming) => {
            if state.incoming_tx.send(incoming).is_err() {
                tracing::warn!("Telegram message stream dropped, ignoring webhook update");
            }
        }
        None => tracing::debug!("Ignoring update without message text"),
    }

    // Always 200, otherwise Telegram redelivers the same update.
    StatusCode::OK
}

// ── Update parsing ───────────────────────────────────────────────────

/// Pull a text message out of a Bot API update. Non-message updates and
/// messages without text yield `None`.
fn message_from_update(update: &serde_json::Value) -> Option<IncomingMessage> {
    let message = update.get("message")?;
    let text = message.get("text").and_then(|t| t.as_str())?;

    let chat_id = message
        .get("chat")
        .and_then(|c| c.get("id"))
        .and_then(|i| i.as_i64())?;

    let from = message.get("from");
    let user_id = from
        .and_then(|f| f.get("id"))
        .and_then(|i| i.as_i64())
        .map(|i| i.to_string());
    let username = from.and_then(|f| f.get("username")).and_then(|u| u.as_str());
    let first_name = from
        .and_then(|f| f.get("first_name"))
        .and_then(|n| n.as_str());

    let sender = user_id
        .or_else(|| username.map(String::from))
        .unwrap_or_else(|| "unknown".to_string());

    let mut incoming = IncomingMessage::new("telegram", &sender, text).with_metadata(
        serde_json::json!({
            "chat_id": chat_id.to_string(),
            "username": username,
        }),
    );

    if let Some(name) = first_name.or(username) {
        incoming = incoming.with_sender_name(name);
    }

    Some(incoming)
}

async fn message_id_from_reply(resp: reqwest::Response) -> Result<i64, ChannelError> {
    let reply: serde_json::Value = resp
        .json()
        .await
        .map_err(|e| ChannelError::SendFailed(format!("Telegram reply parse error: {e}")))?;

    reply
        .get("result")
        .and_then(|r| r.get("message_id"))
        .and_then(|i| i.as_i64())
        .ok_or_else(|| ChannelError::SendFailed("Telegram reply has no message_id".to_string()))
}

fn parse_notice_id(notice: &NoticeHandle) -> Result<i64, ChannelError> {
    notice
        .0
        .parse()
        .map_err(|_| ChannelError::InvalidMessage(format!("bad notice handle: {}", notice.0)))
}

/// Split a message into chunks that fit Telegram's length limit,
/// preferring line boundaries.
fn split_message(text: &str) -> Vec<String> {
    if text.len() <= TELEGRAM_MAX_MESSAGE_LENGTH {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if current.len() + line.len() + 1 > TELEGRAM_MAX_MESSAGE_LENGTH {
            if !current.is_empty() {
                chunks.push(current.clone());
                current.clear();
            }

            // A single line longer than the limit gets hard-split.
            if line.len() > TELEGRAM_MAX_MESSAGE_LENGTH {
                let mut remaining = line;
                while remaining.len() > TELEGRAM_MAX_MESSAGE_LENGTH {
                    let mut split_at = TELEGRAM_MAX_MESSAGE_LENGTH;
                    while !remaining.is_char_boundary(split_at) {
                        split_at -= 1;
                    }
                    let (head, tail) = remaining.split_at(split_at);
                    chunks.push(head.to_string());
                    remaining = tail;
                }
                current = remaining.to_string();
                continue;
            }
        }

        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
