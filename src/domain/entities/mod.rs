//! Domain entities - Core business objects with no external dependencies

pub mod event;
pub mod module;
pub mod task;

pub use event::{ActorId, Attachment, ChatId, Event, Origin};
pub use module::ModuleSummary;
pub use task::{ScheduledTask, TaskSummary};
