//! Telegram adapter

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::application::errors::TransportError;
use crate::application::scheduler::EventSink;
use crate::domain::entities::{Attachment, ChatId, Event};
use crate::domain::traits::{KeyboardButton, Transport};

/// Telegram API base URL
const API_BASE: &str = "https://api.telegram.org";

/// Long-poll timeout in seconds
const POLL_TIMEOUT: i64 = 30;

/// Telegram update type
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub document: Option<Document>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Document {
    pub file_id: String,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

/// Envelope every Bot API method answers with
#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl Update {
    /// Convert to a dispatch event. Callback data becomes the event text.
    pub fn into_event(self) -> Option<Event> {
        if let Some(msg) = self.message {
            let actor = msg.from.as_ref()?.id;
            let text = msg.text.or(msg.caption).unwrap_or_default();
            let mut event = Event::real(actor, msg.chat.id, text);

            if let Some(doc) = msg.document {
                event = event.with_attachment(Attachment {
                    file_name: doc.file_name.unwrap_or_else(|| doc.file_id.clone()),
                    file_ref: doc.file_id,
                });
            } else if event.text.is_empty() {
                return None;
            }
            return Some(event);
        }

        let query = self.callback_query?;
        let chat_id = query.message.as_ref().map(|m| m.chat.id).unwrap_or(query.from.id);
        Some(Event::real(query.from.id, chat_id, query.data?))
    }
}

/// Telegram bot adapter
pub struct TelegramAdapter {
    token: String,
    client: Client,
    username: String,
}

impl TelegramAdapter {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            client: Client::new(),
            username: "admin_bot".to_string(),
        }
    }


    /// Get the API URL for a method
    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", API_BASE, self.token, method)
    }

    async fn call<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<T, TransportError> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Self::read_response(method, response).await
    }

    async fn read_response<T: DeserializeOwned>(
        method: &str,
        response: reqwest::Response,
    ) -> Result<T, TransportError> {
        let status = response.status();
        let data: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| TransportError::Parse(e.to_string()))?;

        if !data.ok {
            return Err(TransportError::Api(format!(
                "{} failed ({}): {}",
                method,
                status,
                data.description.unwrap_or_default()
            )));
        }
        data.result
            .ok_or_else(|| TransportError::Parse(format!("{} returned no result", method)))
    }

    /// Fetch bot info from Telegram API
    pub async fn fetch_bot_info(&mut self) -> Result<(), TransportError> {
        #[derive(Deserialize)]
        struct BotInfoResponse {
            id: i64,
            username: String,
        }

        let data: BotInfoResponse = self.call("getMe", &serde_json::json!({})).await?;
        tracing::info!("Authorized as @{} ({})", data.username, data.id);
        self.username = data.username;
        Ok(())
    }

    /// Get updates from Telegram using getUpdates API
    pub async fn get_updates(&self, offset: i64, timeout: i64) -> Result<Vec<Update>, TransportError> {
        #[derive(Serialize)]
        struct GetUpdatesRequest {
            offset: i64,
            timeout: i64,
            allowed_updates: Vec<String>,
        }

        let request = GetUpdatesRequest {
            offset,
            timeout,
            allowed_updates: vec!["message".to_string(), "callback_query".to_string()],
        };
        self.call("getUpdates", &request).await
    }

    /// Get the next update offset
    pub fn get_next_offset(updates: &[Update]) -> i64 {
        updates.iter().map(|u| u.update_id + 1).max().unwrap_or(0)
    }

    /// Send a message with specific parse mode
    async fn send_message_with_format(
        &self,
        chat_id: ChatId,
        text: &str,
        parse_mode: Option<&str>,
    ) -> Result<(), TransportError> {
        #[derive(Serialize)]
        struct SendMessageRequest<'a> {
            chat_id: ChatId,
            text: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            parse_mode: Option<&'a str>,
        }

        let _: serde_json::Value = self
            .call(
                "sendMessage",
                &SendMessageRequest {
                    chat_id,
                    text,
                    parse_mode,
                },
            )
            .await?;
        Ok(())
    }

    pub async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<(), TransportError> {
        #[derive(Serialize)]
        struct AnswerRequest<'a> {
            callback_query_id: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            text: Option<&'a str>,
        }

        let _: bool = self
            .call(
                "answerCallbackQuery",
                &AnswerRequest {
                    callback_query_id: callback_id,
                    text,
                },
            )
            .await?;
        Ok(())
    }

    /// Register bot commands with Telegram
    pub async fn register_commands(&self) -> Result<(), TransportError> {
        #[derive(Serialize)]
        struct Command {
            command: &'static str,
            description: &'static str,
        }

        let commands = [
            Command { command: "start", description: "Start the bot" },
            Command { command: "help", description: "Show available commands" },
            Command { command: "listmodules", description: "List loaded modules" },
            Command { command: "addmodule", description: "Upload a module file" },
            Command { command: "schedule", description: "Schedule a repeating command" },
            Command { command: "unschedule", description: "Cancel a scheduled command" },
            Command { command: "schedulelist", description: "List scheduled commands" },
            Command { command: "admins", description: "List admins" },
            Command { command: "sysinfo", description: "System information" },
            Command { command: "query", description: "Run SQL" },
            Command { command: "queryrun", description: "Run a saved query" },
            Command { command: "getsettings", description: "Download the config file" },
        ];

        let _: bool = self
            .call("setMyCommands", &serde_json::json!({ "commands": commands }))
            .await?;

        tracing::info!("Registered bot commands with Telegram");
        Ok(())
    }

    /// Long-poll for updates and feed them into the dispatch queue until the
    /// queue closes
    pub async fn poll(self: Arc<Self>, sink: EventSink) {
        tracing::info!("Starting Telegram polling as @{}...", self.username);
        let mut offset = 0;

        loop {
            let updates = match self.get_updates(offset, POLL_TIMEOUT).await {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::error!("Error getting updates: {}", e);
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    continue;
                }
            };
            if updates.is_empty() {
                continue;
            }
            offset = Self::get_next_offset(&updates);

            for update in updates {
                if let Some(query) = &update.callback_query {
                    if let Err(e) = self.answer_callback(&query.id, None).await {
                        tracing::warn!("Failed to answer callback: {}", e);
                    }
                }

                let Some(event) = update.into_event() else {
                    continue;
                };
                if sink.send(event).is_err() {
                    tracing::info!("Dispatch queue closed, stopping Telegram polling");
                    return;
                }
            }
        }
    }
}

#[async_trait]
impl Transport for TelegramAdapter {
    /// Try Markdown first, fall back to plain text
    async fn send_reply(&self, chat_id: ChatId, text: &str) -> Result<(), TransportError> {
        tracing::debug!("Sending to {}: {}", chat_id, text);
        match self.send_message_with_format(chat_id, text, Some("Markdown")).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!("Markdown failed, using plain text: {}", e);
                self.send_message_with_format(chat_id, text, None).await
            }
        }
    }

    async fn send_with_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        buttons: Vec<Vec<KeyboardButton>>,
    ) -> Result<(), TransportError> {
        tracing::debug!("Sending with keyboard to {}: {}", chat_id, text);

        #[derive(Serialize)]
        struct InlineKeyboardButton {
            text: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            callback_data: Option<String>,
        }

        let inline_keyboard: Vec<Vec<InlineKeyboardButton>> = buttons
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|btn| InlineKeyboardButton {
                        text: btn.text,
                        callback_data: btn.callback_data,
                    })
                    .collect()
            })
            .collect();

        let request = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "reply_markup": { "inline_keyboard": inline_keyboard },
        });
        let _: serde_json::Value = self.call("sendMessage", &request).await?;
        Ok(())
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<(), TransportError> {
        tracing::debug!("Sending document {} ({} bytes) to {}", file_name, bytes.len(), chat_id);

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("text/plain")
            .map_err(|e| TransportError::Parse(format!("mime error: {}", e)))?;
        let form = reqwest::multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", part);

        let response = self
            .client
            .post(self.api_url("sendDocument"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let _: serde_json::Value = Self::read_response("sendDocument", response).await?;
        Ok(())
    }

    async fn fetch_uploaded_file(&self, file_ref: &str) -> Result<Vec<u8>, TransportError> {
        #[derive(Deserialize)]
        struct File {
            file_path: Option<String>,
        }

        let file: File = self
            .call("getFile", &serde_json::json!({ "file_id": file_ref }))
            .await?;
        let path = file
            .file_path
            .ok_or_else(|| TransportError::Api("file is no longer available".to_string()))?;

        let url = format!("{}/file/bot{}/{}", API_BASE, self.token, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TransportError::Network(format!("File download error: {}", response.status())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
