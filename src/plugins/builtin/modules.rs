//! `/listmodules`, `/addmodule` and module uploads, `/reloadmodule`, `/unloadmodule`

use std::sync::Arc;

use crate::application::errors::{HandlerError, LoadError};
use crate::application::routing::{HandlerBinding, HandlerContext, HandlerResult, Pattern};
use crate::plugins::builtin::settings::is_settings_upload;
use crate::plugins::trait_def::{CommandModule, RegistrationContext};

pub const MODULE_ID: &str = "modules";

/// File suffixes accepted as module uploads
pub const MODULE_SUFFIXES: [&str; 2] = [".yaml", ".yml"];

pub struct ModulesModule;

impl CommandModule for ModulesModule {
    fn description(&self) -> &str {
        "List, install and reload handler modules"
    }

    fn register(&self, _ctx: &RegistrationContext) -> Result<Vec<HandlerBinding>, LoadError> {
        Ok(vec![
            HandlerBinding::from_fn(Pattern::command("listmodules", None)?, list_modules)
                .with_description("/listmodules — show all loaded modules"),
            HandlerBinding::from_fn(Pattern::command("addmodule", None)?, add_module_prompt)
                .with_description("/addmodule — upload new or update existing module"),
            HandlerBinding::from_fn(Pattern::attachment(&MODULE_SUFFIXES[..]), install_upload),
            HandlerBinding::from_fn(Pattern::command("reloadmodule", Some(r"(\S+)"))?, reload_module)
                .with_description("/reloadmodule <id> — reload a module"),
            HandlerBinding::from_fn(Pattern::command("unloadmodule", Some(r"(\S+)"))?, unload_module)
                .with_description("/unloadmodule <id> — unload a module"),
        ])
    }
}

async fn list_modules(ctx: HandlerContext) -> HandlerResult {
    let modules = ctx.caps.loader.loaded();
    if modules.is_empty() {
        return Ok(Some("❌ No modules loaded.".to_string()));
    }

    let list: Vec<String> = modules
        .iter()
        .map(|m| {
            let about = if m.description.is_empty() {
                String::new()
            } else {
                format!(" — {}", m.description)
            };
            format!("• {}{} (v{}, {} commands)", m.module_id, about, m.version, m.bindings)
        })
        .collect();
    Ok(Some(format!("📦 *Active modules:*\n\n{}", list.join("\n"))))
}

async fn add_module_prompt(_ctx: HandlerContext) -> HandlerResult {
    Ok(Some(
        "📤 Please submit the module's `.yaml` file (e.g. `stats.yaml`) as a document.\nIt will be added to the modules directory or replaced if it already exists."
            .to_string(),
    ))
}

async fn install_upload(ctx: HandlerContext) -> HandlerResult {
    let attachment = ctx
        .event
        .attachment
        .clone()
        .ok_or_else(|| HandlerError::InvalidArgs("no file attached".to_string()))?;
    if is_settings_upload(&ctx) {
        return Ok(None);
    }

    let bytes = ctx
        .caps
        .transport
        .fetch_uploaded_file(&attachment.file_ref)
        .await?;

    let loader = Arc::clone(&ctx.caps.loader);
    let file_name = attachment.file_name.clone();
    let record = tokio::task::spawn_blocking(move || loader.install(&file_name, &bytes))
        .await
        .map_err(|e| HandlerError::Failed(e.to_string()))??;

    Ok(Some(format!(
        "✅ Module uploaded/replaced: {} ({} commands)",
        record.module_id,
        record.bindings.len()
    )))
}

async fn reload_module(ctx: HandlerContext) -> HandlerResult {
    let module_id = ctx.arg(1)?.to_string();
    let loader = Arc::clone(&ctx.caps.loader);
    let record = tokio::task::spawn_blocking(move || loader.reload(&module_id))
        .await
        .map_err(|e| HandlerError::Failed(e.to_string()))??;

    Ok(Some(format!("🔁 Reloaded {} (v{})", record.module_id, record.version)))
}

async fn unload_module(ctx: HandlerContext) -> HandlerResult {
    let module_id = ctx.arg(1)?;
    if module_id == MODULE_ID {
        return Ok(Some(format!("⚠️ The {} module cannot unload itself.", MODULE_ID)));
    }

    let record = ctx.caps.loader.unload(module_id)?;
    Ok(Some(format!("🗑️ Unloaded {}", record.module_id)))
}
