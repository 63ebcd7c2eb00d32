use async_trait::async_trait;

use crate::application::errors::TransportError;
use crate::domain::entities::ChatId;

/// Transport trait - abstraction for the chat platform carrying events and replies
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a text reply to a chat
    async fn send_reply(&self, chat_id: ChatId, text: &str) -> Result<(), TransportError>;

    /// Send a message with an inline keyboard
    async fn send_with_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        buttons: Vec<Vec<KeyboardButton>>,
    ) -> Result<(), TransportError>;

    /// Send a file to a chat
    async fn send_document(
        &self,
        chat_id: ChatId,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<(), TransportError>;

    /// Download a file that was uploaded with an event
    async fn fetch_uploaded_file(&self, file_ref: &str) -> Result<Vec<u8>, TransportError>;
}

/// Keyboard button for inline keyboards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardButton {
    pub text: String,
    pub callback_data: Option<String>,
}

impl KeyboardButton {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: None,
        }
    }

    pub fn with_callback(mut self, data: impl Into<String>) -> Self {
        self.callback_data = Some(data.into());
        self
    }
}
