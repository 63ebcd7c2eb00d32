//! `/admins`, `/addadmin`, `/removeadmin`

use crate::application::errors::{HandlerError, LoadError};
use crate::application::permissions::{GuardChange, MutationReport};
use crate::application::routing::{HandlerBinding, HandlerContext, HandlerResult, Pattern};
use crate::domain::entities::ActorId;
use crate::plugins::trait_def::{CommandModule, RegistrationContext};

pub const MODULE_ID: &str = "admins";

pub struct AdminsModule;

impl CommandModule for AdminsModule {
    fn description(&self) -> &str {
        "Manage the admin list"
    }

    fn register(&self, _ctx: &RegistrationContext) -> Result<Vec<HandlerBinding>, LoadError> {
        Ok(vec![
            HandlerBinding::from_fn(Pattern::command("admins", None)?, list_admins)
                .with_description("/admins — admin list"),
            HandlerBinding::from_fn(Pattern::command("addadmin", Some(r"(\d+)"))?, add_admin)
                .with_description("/addadmin <userId> — add admin"),
            HandlerBinding::from_fn(Pattern::command("removeadmin", Some(r"(\d+)"))?, remove_admin)
                .with_description("/removeadmin <userId> — remove admin"),
        ])
    }
}

async fn list_admins(ctx: HandlerContext) -> HandlerResult {
    let list: Vec<String> = ctx
        .caps
        .guard
        .actors()
        .iter()
        .map(|id| format!("• {}", id))
        .collect();

    Ok(Some(format!("👮 *Admin Users:*\n\n{}", list.join("\n"))))
}

async fn add_admin(ctx: HandlerContext) -> HandlerResult {
    let id = parse_actor(ctx.arg(1)?)?;
    let report = ctx.caps.guard.grant(id).await;

    let text = match report.change {
        GuardChange::Unchanged => format!("ℹ️ User {} is already admin.", id),
        _ => format!("✅ User {} added to admin list.", id),
    };
    Ok(Some(with_persist_warning(text, &report)))
}

async fn remove_admin(ctx: HandlerContext) -> HandlerResult {
    let id = parse_actor(ctx.arg(1)?)?;
    let report = ctx.caps.guard.revoke(id).await;

    let text = match report.change {
        GuardChange::Unchanged => format!("ℹ️ User {} is not an admin.", id),
        _ => format!("🗑️ User {} removed from admin list.", id),
    };
    Ok(Some(with_persist_warning(text, &report)))
}

fn parse_actor(raw: &str) -> Result<ActorId, HandlerError> {
    raw.parse()
        .map_err(|_| HandlerError::InvalidArgs(format!("'{}' is not a valid user id", raw)))
}

fn with_persist_warning(text: String, report: &MutationReport) -> String {
    match &report.persisted {
        Ok(()) => text,
        Err(e) => format!("{}\n⚠️ Change is active but was not saved: {}", text, e),
    }
}
