//! CLI channel — stdin/stdout REPL for running without a bot token.
//!
//! Documents land in the configured output directory instead of being
//! uploaded anywhere.

use std::path::PathBuf;

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::channel::{Channel, DocumentPayload, IncomingMessage, MessageStream};
use crate::error::ChannelError;

/// Reads links from stdin, saves downloads to disk.
pub struct CliChannel {
    output_dir: PathBuf,
}

impl CliChannel {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            eprint!("> ");
                            continue;
                        }
                        let msg = IncomingMessage::new("cli", "local-user", &line);
                        if tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {e}");
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        tracing::info!("CLI channel reading from stdin");
        Ok(Box::pin(stream))
    }

    async fn send_text(&self, _msg: &IncomingMessage, text: &str) -> Result<(), ChannelError> {
        println!("\n{text}\n");
        eprint!("> ");
        Ok(())
    }

    async fn send_document(
        &self,
        _msg: &IncomingMessage,
        document: DocumentPayload,
    ) -> Result<(), ChannelError> {
        let path = self.output_dir.join(&document.filename);
        tokio::fs::write(&path, &document.data).await?;

        println!(
            "\nSaved {} ({} bytes) to {}",
            document.filename,
            document.data.len(),
            path.display()
        );
        if let Some(caption) = &document.caption {
            println!("{caption}");
        }
        println!();
        eprint!("> ");

        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        // Downloads have nowhere to go if the output directory is missing.
        if self.output_dir.is_dir() {
            Ok(())
        } else {
            Err(ChannelError::HealthCheckFailed {
                name: "cli".to_string(),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("CLI channel shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_message() -> IncomingMessage {
        IncomingMessage::new("cli", "local-user", "hello")
    }

    #[tokio::test]
    async fn send_document_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let channel = CliChannel::new(dir.path().to_path_buf());

        let payload = DocumentPayload {
            data: b"%PDF-1.4 content".to_vec(),
            filename: "annual_report.pdf".to_string(),
            caption: None,
        };

        channel.send_document(&make_message(), payload).await.unwrap();

        let written = std::fs::read(dir.path().join("annual_report.pdf")).unwrap();
        assert_eq!(written, b"%PDF-1.4 content");
    }

    #[tokio::test]
    async fn health_check_requires_output_dir() {
        let dir = tempfile::tempdir().unwrap();

        let good = CliChannel::new(dir.path().to_path_buf());
        assert!(good.health_check().await.is_ok());

        let bad = CliChannel::new(dir.path().join("missing"));
        assert!(matches!(
            bad.health_check().await,
            Err(ChannelError::HealthCheckFailed { .. })
        ));
    }

    #[tokio::test]
    async fn send_text_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let channel = CliChannel::new(dir.path().to_path_buf());

        assert!(channel.send_text(&make_message(), "done").await.is_ok());
    }
}
