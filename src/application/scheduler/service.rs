//! Scheduler service - named periodic tasks that inject synthetic events

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;
use tokio::sync::{mpsc, oneshot};

use super::timing::{cron_expression, describe_interval, minute_schedule, next_fire_after};
use crate::application::errors::ScheduleError;
use crate::application::permissions::PermissionGuard;
use crate::domain::entities::{ActorId, ChatId, Event, ScheduledTask, TaskSummary};

/// Entry point of the dispatch path shared with the transport
pub type EventSink = mpsc::UnboundedSender<Event>;

struct TaskEntry {
    task: ScheduledTask,
    schedule: Schedule,
    cancel: oneshot::Sender<()>,
}

impl TaskEntry {
    fn summary(&self, now: DateTime<Utc>) -> TaskSummary {
        TaskSummary {
            name: self.task.name.clone(),
            interval_minutes: self.task.interval_minutes,
            schedule: describe_interval(self.task.interval_minutes),
            next_fire_at: next_fire_after(&self.schedule, now),
            target_chat_id: self.task.target_chat_id,
        }
    }
}

/// Owns the live task set. Tasks do not survive a restart.
pub struct Scheduler {
    guard: Arc<PermissionGuard>,
    sink: EventSink,
    tasks: Mutex<HashMap<String, TaskEntry>>,
}

impl Scheduler {
    pub fn new(guard: Arc<PermissionGuard>, sink: EventSink) -> Self {
        Self {
            guard,
            sink,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Create a task and start its timer. Must be called inside a tokio runtime.
    pub fn create(
        &self,
        name: &str,
        interval_minutes: i64,
        target_chat_id: ChatId,
        command_text: &str,
        actor_id: ActorId,
    ) -> Result<ScheduledTask, ScheduleError> {
        if !self.guard.is_authorized(actor_id) {
            return Err(ScheduleError::Unauthorized(actor_id));
        }

        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        if tasks.contains_key(name) {
            return Err(ScheduleError::DuplicateTask(name.to_string()));
        }

        let interval = u64::try_from(interval_minutes)
            .ok()
            .filter(|m| *m > 0)
            .ok_or(ScheduleError::InvalidInterval(interval_minutes))?;
        let schedule = minute_schedule(interval)?;

        let task = ScheduledTask {
            name: name.to_string(),
            interval_minutes: interval,
            cron: cron_expression(interval),
            target_chat_id,
            command_text: command_text.to_string(),
            actor_id,
            created_at: Utc::now(),
        };

        let (cancel, cancel_rx) = oneshot::channel();
        tokio::spawn(run_timer(
            task.clone(),
            schedule.clone(),
            self.sink.clone(),
            cancel_rx,
        ));
        tasks.insert(
            name.to_string(),
            TaskEntry {
                task: task.clone(),
                schedule,
                cancel,
            },
        );

        tracing::info!(
            "Scheduled task \"{}\" ({}) in chat {}",
            name,
            task.cron,
            target_chat_id
        );
        Ok(task)
    }

    /// Stop future firings. A dispatch already submitted runs to completion.
    pub fn cancel(&self, name: &str) -> Result<ScheduledTask, ScheduleError> {
        let entry = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .ok_or_else(|| ScheduleError::NotFound(name.to_string()))?;

        let _ = entry.cancel.send(());
        tracing::info!("Cancelled task \"{}\"", name);
        Ok(entry.task)
    }

    /// Live tasks ordered by name
    pub fn list(&self) -> Vec<TaskSummary> {
        let now = Utc::now();
        let tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        let mut summaries: Vec<TaskSummary> = tasks.values().map(|e| e.summary(now)).collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

async fn run_timer(
    task: ScheduledTask,
    schedule: Schedule,
    sink: EventSink,
    mut cancel_rx: oneshot::Receiver<()>,
) {
    let mut last: Option<DateTime<Utc>> = None;

    loop {
        // Never before the previous boundary, even if the clock lags the timer
        let now = Utc::now();
        let after = last.map_or(now, |l| l.max(now));
        let Some(next) = next_fire_after(&schedule, after) else {
            tracing::warn!("Task \"{}\" has no upcoming fire time", task.name);
            return;
        };
        let delay = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        tracing::debug!("Task \"{}\" next fires at {}", task.name, next);

        tokio::select! {
            biased;
            _ = &mut cancel_rx => {
                tracing::debug!("Timer for \"{}\" cancelled", task.name);
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        let event = Event::synthetic(task.actor_id, task.target_chat_id, task.command_text.clone());
        tracing::debug!("Task \"{}\" fired: {}", task.name, event.preview());
        if sink.send(event).is_err() {
            tracing::warn!("Dispatch queue closed, stopping task \"{}\"", task.name);
            return;
        }

        last = Some(next);
    }
}
