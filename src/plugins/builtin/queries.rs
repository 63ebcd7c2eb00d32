//! `/query`, `/querysave`, `/querylist`, `/queryrun`, `/querydelete`

use crate::application::errors::LoadError;
use crate::application::routing::{HandlerBinding, HandlerContext, HandlerResult, Pattern};
use crate::domain::traits::{KeyboardButton, Row};
use crate::plugins::trait_def::{CommandModule, RegistrationContext};

pub const MODULE_ID: &str = "queries";

/// Callback data prefix of the saved query keyboard
pub const QUERYRUN_CALLBACK: &str = "queryrun:";

const MAX_ROWS: usize = 20;
const MAX_CHARS: usize = 3500;
const RESULT_FILE: &str = "query_result.txt";

pub struct QueriesModule;

impl CommandModule for QueriesModule {
    fn description(&self) -> &str {
        "SQL queries against the bot database"
    }

    fn register(&self, _ctx: &RegistrationContext) -> Result<Vec<HandlerBinding>, LoadError> {
        Ok(vec![
            HandlerBinding::from_fn(Pattern::command("query", Some(r"([\s\S]+)"))?, run_adhoc)
                .with_description("/query <SQL> — execute SQL"),
            HandlerBinding::from_fn(Pattern::command("querysave", Some(r"(\w+)\s+([\s\S]+)"))?, save)
                .with_description("/querysave <name> <SQL> — save query"),
            HandlerBinding::from_fn(Pattern::command("querylist", None)?, list)
                .with_description("/querylist — list saved queries"),
            HandlerBinding::from_fn(Pattern::command("queryrun", Some(r"(\w+)"))?, run_saved)
                .with_description("/queryrun [name] — run saved query"),
            HandlerBinding::from_fn(Pattern::command("queryrun", None)?, choose_query),
            HandlerBinding::from_fn(
                Pattern::regex(&format!(r"^{}(\w+)$", QUERYRUN_CALLBACK))?,
                run_saved,
            ),
            HandlerBinding::from_fn(Pattern::command("querydelete", Some(r"(\w+)"))?, delete)
                .with_description("/querydelete <name> — delete saved query"),
        ])
    }
}

async fn run_adhoc(ctx: HandlerContext) -> HandlerResult {
    let rows = ctx.relational()?.query(ctx.arg(1)?, &[]).await?;
    reply_rows(&ctx, &rows).await
}

async fn save(ctx: HandlerContext) -> HandlerResult {
    let name = ctx.arg(1)?;
    ctx.saved_queries()?.save_query(name, ctx.arg(2)?.trim()).await?;
    Ok(Some(format!("💾 Query \"{}\" saved.", name)))
}

async fn list(ctx: HandlerContext) -> HandlerResult {
    let queries = ctx.saved_queries()?.list_queries().await?;
    if queries.is_empty() {
        return Ok(Some("📭 No saved queries.".to_string()));
    }

    let list: Vec<String> = queries
        .iter()
        .map(|q| format!("• *{}*\n`{}`", q.name, q.query))
        .collect();
    Ok(Some(format!("📚 *Saved queries:*\n\n{}", list.join("\n"))))
}

async fn run_saved(ctx: HandlerContext) -> HandlerResult {
    let name = ctx.arg(1)?;
    let Some(saved) = ctx.saved_queries()?.get_query(name).await? else {
        return Ok(Some(format!("⚠️ Query \"{}\" not found.", name)));
    };

    let rows = ctx.relational()?.query(&saved.query, &[]).await?;
    reply_rows(&ctx, &rows).await
}

async fn choose_query(ctx: HandlerContext) -> HandlerResult {
    let queries = ctx.saved_queries()?.list_queries().await?;
    if queries.is_empty() {
        return Ok(Some("📭 No saved queries found.".to_string()));
    }

    let buttons = queries
        .iter()
        .map(|q| {
            vec![KeyboardButton::new(q.name.clone())
                .with_callback(format!("{}{}", QUERYRUN_CALLBACK, q.name))]
        })
        .collect();

    ctx.caps
        .transport
        .send_with_keyboard(ctx.event.chat_id, "📌 Choose a saved query to run:", buttons)
        .await?;
    Ok(None)
}

async fn delete(ctx: HandlerContext) -> HandlerResult {
    let name = ctx.arg(1)?;
    Ok(Some(if ctx.saved_queries()?.delete_query(name).await? {
        format!("🗑️ Query \"{}\" deleted.", name)
    } else {
        format!("⚠️ Query \"{}\" not found.", name)
    }))
}

/// How a result set goes back to the chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutput {
    Message(String),
    /// Too long for a message; sent as a text file
    Document(String),
}

/// Numbered JSON lines. More than 20 rows or 3500 characters become a document.
pub fn render_rows(rows: &[Row]) -> QueryOutput {
    if rows.is_empty() {
        return QueryOutput::Message("✅ Query executed. No results.".to_string());
    }

    let body = rows
        .iter()
        .enumerate()
        .map(|(i, row)| format!("{}. {}", i + 1, serde_json::Value::Object(row.clone())))
        .collect::<Vec<_>>()
        .join("\n");

    if rows.len() > MAX_ROWS || body.chars().count() > MAX_CHARS {
        QueryOutput::Document(body)
    } else {
        QueryOutput::Message(format!("📄 *Query result:*\n```\n{}\n```", body))
    }
}

/// Send rows to the event's chat
pub async fn reply_rows(ctx: &HandlerContext, rows: &[Row]) -> HandlerResult {
    match render_rows(rows) {
        QueryOutput::Message(text) => Ok(Some(text)),
        QueryOutput::Document(body) => {
            ctx.caps
                .transport
                .send_document(ctx.event.chat_id, RESULT_FILE, body.into_bytes())
                .await?;
            Ok(None)
        }
    }
}
