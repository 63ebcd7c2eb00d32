//! `/getsettings`, `/newsettings` and config file uploads

use crate::application::errors::{HandlerError, LoadError};
use crate::application::routing::{HandlerBinding, HandlerContext, HandlerResult, Pattern};
use crate::plugins::builtin::modules::MODULE_SUFFIXES;
use crate::plugins::trait_def::{CommandModule, RegistrationContext};

pub const MODULE_ID: &str = "settings";

pub struct SettingsModule;

impl CommandModule for SettingsModule {
    fn description(&self) -> &str {
        "Download and replace the config file"
    }

    fn register(&self, _ctx: &RegistrationContext) -> Result<Vec<HandlerBinding>, LoadError> {
        Ok(vec![
            HandlerBinding::from_fn(Pattern::command("getsettings", None)?, download)
                .with_description("/getsettings — download the config file"),
            HandlerBinding::from_fn(Pattern::command("newsettings", None)?, upload_prompt)
                .with_description("/newsettings — upload a new config file"),
            HandlerBinding::from_fn(Pattern::attachment(&MODULE_SUFFIXES[..]), replace),
        ])
    }
}

/// Whether the event uploads a file named like the config file
pub fn is_settings_upload(ctx: &HandlerContext) -> bool {
    match (&ctx.event.attachment, &ctx.caps.settings) {
        (Some(attachment), Some(settings)) => attachment.file_name == settings.file_name(),
        _ => false,
    }
}

async fn download(ctx: HandlerContext) -> HandlerResult {
    let settings = ctx.settings()?;
    let bytes = settings.read().await?;

    ctx.caps
        .transport
        .send_document(ctx.event.chat_id, &settings.file_name(), bytes)
        .await?;
    Ok(None)
}

async fn upload_prompt(ctx: HandlerContext) -> HandlerResult {
    let name = ctx.settings()?.file_name();
    Ok(Some(format!(
        "📤 Please submit the new `{}` file as a document in response to this message.",
        name
    )))
}

async fn replace(ctx: HandlerContext) -> HandlerResult {
    if !is_settings_upload(&ctx) {
        return Ok(None);
    }
    let attachment = ctx
        .event
        .attachment
        .as_ref()
        .ok_or_else(|| HandlerError::InvalidArgs("no file attached".to_string()))?;

    let bytes = ctx
        .caps
        .transport
        .fetch_uploaded_file(&attachment.file_ref)
        .await?;
    ctx.settings()?.replace(&bytes).await?;

    Ok(Some("✅ Configuration updated. Restart bot to apply.".to_string()))
}
