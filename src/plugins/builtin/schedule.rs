//! `/schedule`, `/unschedule`, `/schedulelist`

use crate::application::errors::{HandlerError, LoadError};
use crate::application::routing::{HandlerBinding, HandlerContext, HandlerResult, Pattern};
use crate::application::scheduler::describe_interval;
use crate::domain::traits::KeyboardButton;
use crate::plugins::trait_def::{CommandModule, RegistrationContext};

pub const MODULE_ID: &str = "schedule";

/// Callback data prefix of the unschedule keyboard
pub const UNSCHEDULE_CALLBACK: &str = "unschedule:";

const USAGE: &str = "⚠️ Invalid format. Example:\n/schedule mytask 5 -100123456789 /sysinfo";

pub struct ScheduleModule;

impl CommandModule for ScheduleModule {
    fn description(&self) -> &str {
        "Scheduled commands"
    }

    fn register(&self, _ctx: &RegistrationContext) -> Result<Vec<HandlerBinding>, LoadError> {
        Ok(vec![
            HandlerBinding::from_fn(
                Pattern::command("schedule", Some(r"(\w+) (\d+) (-?\d+) ([\s\S]+)"))?,
                create_task,
            )
            .with_description("/schedule <name> <min> <chatId> <cmd> — schedule command"),
            HandlerBinding::from_fn(Pattern::command("schedule", None)?, usage),
            HandlerBinding::from_fn(Pattern::command("unschedule", None)?, choose_task),
            HandlerBinding::from_fn(Pattern::command("unschedule", Some(r"(\w+)"))?, cancel_task)
                .with_description("/unschedule [name] — cancel task"),
            HandlerBinding::from_fn(
                Pattern::regex(&format!(r"^{}(\w+)$", UNSCHEDULE_CALLBACK))?,
                cancel_task,
            ),
            HandlerBinding::from_fn(Pattern::command("schedulelist", None)?, list_tasks)
                .with_description("/schedulelist — list scheduled tasks"),
        ])
    }
}

async fn create_task(ctx: HandlerContext) -> HandlerResult {
    let name = ctx.arg(1)?;
    // Digits only, so the parse can fail only on overflow; such intervals fire hourly
    let minutes: i64 = ctx.arg(2)?.parse().unwrap_or(i64::MAX);
    let target_chat_id: i64 = ctx
        .arg(3)?
        .parse()
        .map_err(|_| HandlerError::InvalidArgs("chat id is out of range".to_string()))?;
    let command = ctx.arg(4)?.trim();

    let result = ctx.caps.scheduler.create(
        name,
        minutes,
        target_chat_id,
        command,
        ctx.event.actor_id,
    );

    Ok(Some(match result {
        Ok(task) => format!(
            "✅ Task \"{}\" is scheduled {} in chat {}",
            task.name,
            describe_interval(task.interval_minutes),
            task.target_chat_id
        ),
        Err(e) => format!("⚠️ {}", e),
    }))
}

async fn usage(_ctx: HandlerContext) -> HandlerResult {
    Ok(Some(USAGE.to_string()))
}

async fn choose_task(ctx: HandlerContext) -> HandlerResult {
    let tasks = ctx.caps.scheduler.list();
    if tasks.is_empty() {
        return Ok(Some("📭 There are no scheduled tasks.".to_string()));
    }

    let buttons = tasks
        .iter()
        .map(|t| {
            vec![KeyboardButton::new(format!("🗑️ {}", t.name))
                .with_callback(format!("{}{}", UNSCHEDULE_CALLBACK, t.name))]
        })
        .collect();

    ctx.caps
        .transport
        .send_with_keyboard(ctx.event.chat_id, "Select a task to delete:", buttons)
        .await?;
    Ok(None)
}

async fn cancel_task(ctx: HandlerContext) -> HandlerResult {
    let name = ctx.arg(1)?;
    Ok(Some(match ctx.caps.scheduler.cancel(name) {
        Ok(task) => format!("🗑️ Task \"{}\" was successfully canceled.", task.name),
        Err(e) => format!("⚠️ {}", e),
    }))
}

async fn list_tasks(ctx: HandlerContext) -> HandlerResult {
    let tasks = ctx.caps.scheduler.list();
    if tasks.is_empty() {
        return Ok(Some("📭 There are no scheduled tasks.".to_string()));
    }

    let list: Vec<String> = tasks
        .iter()
        .map(|t| {
            let next = t
                .next_fire_at
                .map(|at| format!(", next {}", at.format("%H:%M UTC")))
                .unwrap_or_default();
            format!("• {} — {}{} → chat {}", t.name, t.schedule, next, t.target_chat_id)
        })
        .collect();
    Ok(Some(format!("📆 *Scheduled tasks:*\n\n{}", list.join("\n"))))
}
