//! Console adapter for development/testing

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::application::errors::TransportError;
use crate::application::scheduler::EventSink;
use crate::domain::entities::{ActorId, Attachment, ChatId, Event};
use crate::domain::traits::{KeyboardButton, Transport};

/// Console bot adapter for local development.
///
/// Each stdin line is an event from a fixed actor. `@file <path> [caption]`
/// uploads a local file.
pub struct ConsoleAdapter {
    actor_id: ActorId,
    chat_id: ChatId,
}

impl ConsoleAdapter {
    pub fn new(actor_id: ActorId, chat_id: ChatId) -> Self {
        Self {
            actor_id,
            chat_id,
        }
    }

    pub fn parse_line(&self, line: &str) -> Option<Event> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let Some(rest) = line.strip_prefix("@file ") else {
            return Some(Event::real(self.actor_id, self.chat_id, line));
        };

        let (path, caption) = match rest.trim().split_once(char::is_whitespace) {
            Some((path, caption)) => (path, caption.trim()),
            None => (rest.trim(), ""),
        };
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(path)
            .to_string();

        Some(
            Event::real(self.actor_id, self.chat_id, caption).with_attachment(Attachment {
                file_ref: path.to_string(),
                file_name,
            }),
        )
    }

    /// Read stdin until EOF, queueing each line for dispatch
    pub async fn run(&self, sink: EventSink) {
        tracing::info!("Starting console bot (dev mode) as actor {}", self.actor_id);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if let Some(event) = self.parse_line(&line) {
                        if sink.send(event).is_err() {
                            return;
                        }
                    }
                }
                Ok(None) => {
                    tracing::info!("Console input closed");
                    return;
                }
                Err(e) => {
                    tracing::error!("Failed to read console input: {}", e);
                    return;
                }
            }
        }
    }
}

#[async_trait]
impl Transport for ConsoleAdapter {
    async fn send_reply(&self, _chat_id: ChatId, text: &str) -> Result<(), TransportError> {
        println!("[BOT] {}", text);
        Ok(())
    }

    async fn send_with_keyboard(
        &self,
        _chat_id: ChatId,
        text: &str,
        buttons: Vec<Vec<KeyboardButton>>,
    ) -> Result<(), TransportError> {
        println!("[BOT] {}", text);
        for row in buttons {
            let row_text: Vec<String> = row
                .iter()
                .map(|b| match &b.callback_data {
                    Some(data) => format!("{} ({})", b.text, data),
                    None => b.text.clone(),
                })
                .collect();
            println!("  [Buttons] {}", row_text.join(" | "));
        }
        Ok(())
    }

    async fn send_document(
        &self,
        _chat_id: ChatId,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<(), TransportError> {
        println!("[BOT] 📎 {} ({} bytes)", file_name, bytes.len());
        println!("{}", String::from_utf8_lossy(&bytes));
        Ok(())
    }

    async fn fetch_uploaded_file(&self, file_ref: &str) -> Result<Vec<u8>, TransportError> {
        tokio::fs::read(file_ref)
            .await
            .map_err(|e| TransportError::Api(format!("{}: {}", file_ref, e)))
    }
}
