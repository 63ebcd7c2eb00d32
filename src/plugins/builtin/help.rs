//! `/start` and `/help`

use crate::application::errors::LoadError;
use crate::application::routing::{HandlerBinding, HandlerContext, HandlerResult, Pattern};
use crate::plugins::trait_def::{CommandModule, RegistrationContext};

pub const MODULE_ID: &str = "help";

pub struct HelpModule;

impl CommandModule for HelpModule {
    fn description(&self) -> &str {
        "Welcome and command help"
    }

    fn register(&self, _ctx: &RegistrationContext) -> Result<Vec<HandlerBinding>, LoadError> {
        Ok(vec![
            HandlerBinding::from_fn(Pattern::command("start", None)?, welcome)
                .with_description("/start — welcome message"),
            HandlerBinding::from_fn(Pattern::command("help", None)?, help)
                .with_description("/help — show this message"),
        ])
    }
}

async fn welcome(ctx: HandlerContext) -> HandlerResult {
    Ok(Some(format!(
        "👋 Welcome to *{}*!\n\nThis bot allows you to manage your project via chat.\nSend /help for the list of commands.",
        ctx.caps.config.bot.name
    )))
}

/// Lists every described binding in the live snapshot, grouped by module
async fn help(ctx: HandlerContext) -> HandlerResult {
    let snapshot = ctx.caps.loader.snapshot();
    let mut text = format!("🛠️ *{} — Command Help:*\n", ctx.caps.config.bot.name);

    for record in snapshot.modules() {
        let lines: Vec<String> = record
            .bindings
            .iter()
            .filter_map(|b| b.description.as_ref())
            .map(|d| format!("• {}", d))
            .collect();

        if lines.is_empty() {
            continue;
        }
        text.push_str(&format!("\n*{}*\n{}\n", record.module_id, lines.join("\n")));
    }

    Ok(Some(text))
}
