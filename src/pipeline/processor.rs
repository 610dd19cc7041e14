//! Message processor — routes inbound chat to commands or downloads.
//!
//! Flow for a link: post a processing notice, classify, resolve through
//! the fallback services, then either deliver the document (and clear
//! the notice) or edit the notice into a failure message. Every failure
//! kind becomes a user-visible reply; nothing here panics the serving
//! process. Size policy and metrics live at this boundary, never in the
//! resolver.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::channels::{Channel, DocumentPayload, IncomingMessage, NoticeHandle};
use crate::classify::{DocumentReference, UrlClassifier};
use crate::error::{PipelineError, ResolveError};
use crate::metrics::BotStats;
use crate::pipeline::artifact::artifact_name;
use crate::pipeline::templates;
use crate::pipeline::templates::MAX_DELIVERY_BYTES;
use crate::resolve::Resolver;

pub struct MessageProcessor {
    channel: Arc<dyn Channel>,
    classifier: UrlClassifier,
    resolver: Arc<Resolver>,
    stats: Arc<BotStats>,
}

impl MessageProcessor {
    pub fn new(channel: Arc<dyn Channel>, resolver: Arc<Resolver>, stats: Arc<BotStats>) -> Self {
        Self {
            channel,
            classifier: UrlClassifier::new(),
            resolver,
            stats,
        }
    }

    /// Process one message, absorbing every error.
    ///
    /// Called from a spawned task per message; an unexpected failure is
    /// logged and answered with a generic error reply.
    pub async fn handle(&self, msg: IncomingMessage) {
        if let Err(e) = self.process(&msg).await {
            error!(id = %msg.id, error = %e, "Message handling failed");
            if let Err(send_err) = self
                .channel
                .send_text(&msg, templates::unexpected_error())
                .await
            {
                error!(id = %msg.id, error = %send_err, "Could not deliver error reply");
            }
        }
    }

    async fn process(&self, msg: &IncomingMessage) -> Result<(), PipelineError> {
        let text = msg.text.trim();
        self.stats.record_user(&msg.sender);

        info!(
            id = %msg.id,
            channel = %msg.channel,
            sender = %msg.sender,
            "Processing inbound message"
        );

        if let Some(command) = text.strip_prefix('/') {
            return self.handle_command(msg, command).await;
        }

        if let Some(reference) = self.classifier.classify(text) {
            return self.handle_link(msg, reference).await;
        }

        if self.classifier.mentions_source_site(text) {
            // Looks like one of our links but no pattern matched; worth
            // a proper failure reply rather than the generic hint.
            debug!(id = %msg.id, "Source-site link failed classification");
            let notice = self.post_notice(msg).await?;
            let reason = templates::resolve_failure_reason(&ResolveError::InvalidReference);
            return self.finish_failure(msg, notice, &reason).await;
        }

        self.channel
            .send_text(msg, templates::link_hint())
            .await
            .map_err(|e| PipelineError::ChannelSend(e.to_string()))
    }

    /// Slash commands. Unknown ones are dropped silently, matching how
    /// group chats sprinkle commands meant for other bots.
    async fn handle_command(
        &self,
        msg: &IncomingMessage,
        command: &str,
    ) -> Result<(), PipelineError> {
        let name = command
            .split_whitespace()
            .next()
            .unwrap_or("")
            .split('@')
            .next()
            .unwrap_or("");

        let reply = match name {
            "start" => templates::welcome(msg.sender_name.as_deref()),
            "help" => templates::help().to_string(),
            "stats" => templates::stats(&self.stats.snapshot()),
            "support" => templates::support().to_string(),
            other => {
                debug!(id = %msg.id, command = other, "Ignoring unknown command");
                return Ok(());
            }
        };

        self.channel
            .send_text(msg, &reply)
            .await
            .map_err(|e| PipelineError::ChannelSend(e.to_string()))
    }

    async fn handle_link(
        &self,
        msg: &IncomingMessage,
        reference: DocumentReference,
    ) -> Result<(), PipelineError> {
        info!(id = %msg.id, doc = %reference.id, "Handling document link");

        let notice = self.post_notice(msg).await?;

        let document = match self.resolver.resolve(&reference).await {
            Ok(document) => document,
            Err(err) => {
                warn!(id = %msg.id, doc = %reference.id, error = %err, "Resolution failed");
                let reason = templates::resolve_failure_reason(&err);
                return self.finish_failure(msg, notice, &reason).await;
            }
        };

        if document.byte_length() > MAX_DELIVERY_BYTES {
            warn!(
                id = %msg.id,
                doc = %reference.id,
                bytes = document.byte_length(),
                "Resolved document exceeds delivery ceiling"
            );
            let reason = templates::too_large_reason(document.byte_length());
            return self.finish_failure(msg, notice, &reason).await;
        }

        let filename = artifact_name(&reference);
        let caption = templates::success_caption(&filename, document.byte_length());
        let size = document.byte_length();
        let source = document.source.clone();

        self.channel
            .send_document(
                msg,
                DocumentPayload {
                    data: document.data,
                    filename: filename.clone(),
                    caption: Some(caption),
                },
            )
            .await
            .map_err(|e| PipelineError::ChannelSend(e.to_string()))?;

        if let Some(handle) = &notice {
            // The answer is already on its way; a lingering notice is
            // cosmetic, not worth failing the request over.
            if let Err(e) = self.channel.clear_notice(msg, handle).await {
                warn!(id = %msg.id, error = %e, "Could not clear processing notice");
            }
        }

        self.stats.record_success();
        info!(
            id = %msg.id,
            doc = %reference.id,
            filename = %filename,
            bytes = size,
            source = %source,
            "Document delivered"
        );
        Ok(())
    }

    async fn post_notice(
        &self,
        msg: &IncomingMessage,
    ) -> Result<Option<NoticeHandle>, PipelineError> {
        self.channel
            .send_notice(msg, templates::processing())
            .await
            .map_err(|e| PipelineError::Notice(e.to_string()))
    }

    /// Record the failure and turn the notice into the failure message.
    async fn finish_failure(
        &self,
        msg: &IncomingMessage,
        notice: Option<NoticeHandle>,
        reason: &str,
    ) -> Result<(), PipelineError> {
        self.stats.record_failure();
        let text = templates::failure(reason);

        let sent = match &notice {
            Some(handle) => self.channel.edit_notice(msg, handle, &text).await,
            None => self.channel.send_text(msg, &text).await,
        };

        sent.map_err(|e| PipelineError::Notice(e.to_string()))
    }
}
