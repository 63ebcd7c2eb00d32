use chrono::{DateTime, Utc};

/// Opaque identity of the user an event is attributed to
pub type ActorId = i64;

/// Chat an event arrived in and where replies go
pub type ChatId = i64;

/// Where an event came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Delivered by the transport
    Real,
    /// Fabricated by the scheduler
    Synthetic,
}

impl Origin {
    pub fn as_str(&self) -> &str {
        match self {
            Origin::Real => "real",
            Origin::Synthetic => "synthetic",
        }
    }
}

/// A file uploaded alongside an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Transport-specific reference used to fetch the bytes
    pub file_ref: String,
    pub file_name: String,
}

/// A unit of dispatch input
#[derive(Debug, Clone)]
pub struct Event {
    pub id: String,
    pub actor_id: ActorId,
    pub chat_id: ChatId,
    pub text: String,
    pub origin: Origin,
    pub timestamp: DateTime<Utc>,
    pub attachment: Option<Attachment>,
}

impl Event {
    pub fn new(actor_id: ActorId, chat_id: ChatId, text: impl Into<String>, origin: Origin) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            actor_id,
            chat_id,
            text: text.into(),
            origin,
            timestamp: Utc::now(),
            attachment: None,
        }
    }

    pub fn real(actor_id: ActorId, chat_id: ChatId, text: impl Into<String>) -> Self {
        Self::new(actor_id, chat_id, text, Origin::Real)
    }

    pub fn synthetic(actor_id: ActorId, chat_id: ChatId, text: impl Into<String>) -> Self {
        Self::new(actor_id, chat_id, text, Origin::Synthetic)
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    /// Short preview of the text for log lines
    pub fn preview(&self) -> String {
        if self.text.is_empty() {
            return self
                .attachment
                .as_ref()
                .map(|a| format!("[file {}]", a.file_name))
                .unwrap_or_default();
        }
        self.text.chars().take(50).collect()
    }
}
