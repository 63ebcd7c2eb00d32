use chrono::{DateTime, Utc};

use super::event::{ActorId, ChatId};

/// A named periodic command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub name: String,
    pub interval_minutes: u64,
    /// Cron expression the timer runs on
    pub cron: String,
    pub target_chat_id: ChatId,
    pub command_text: String,
    /// Actor the synthetic events are attributed to
    pub actor_id: ActorId,
    pub created_at: DateTime<Utc>,
}

/// Listing view of a scheduled task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSummary {
    pub name: String,
    pub interval_minutes: u64,
    /// Effective firing pattern, e.g. "hourly at :00"
    pub schedule: String,
    pub next_fire_at: Option<DateTime<Utc>>,
    pub target_chat_id: ChatId,
}
