//! `/sysinfo`

use chrono::Utc;

use crate::application::errors::LoadError;
use crate::application::routing::{HandlerBinding, HandlerContext, HandlerResult, Pattern};
use crate::plugins::trait_def::{CommandModule, RegistrationContext};

pub const MODULE_ID: &str = "sysinfo";

pub struct SysinfoModule;

impl CommandModule for SysinfoModule {
    fn description(&self) -> &str {
        "Runtime information"
    }

    fn register(&self, _ctx: &RegistrationContext) -> Result<Vec<HandlerBinding>, LoadError> {
        Ok(vec![HandlerBinding::from_fn(Pattern::command("sysinfo", None)?, sysinfo)
            .with_description("/sysinfo — system info")])
    }
}

async fn sysinfo(ctx: HandlerContext) -> HandlerResult {
    let uptime = (Utc::now() - ctx.caps.started_at).num_seconds().max(0);
    let snapshot = ctx.caps.loader.snapshot();
    let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());

    Ok(Some(format!(
        "🖥️ *System Info:*\n\n\
         • Uptime: `{}`\n\
         • Platform: `{} ({})`\n\
         • Hostname: `{}`\n\
         • Modules: `{}` (table v{})\n\
         • Scheduled tasks: `{}`",
        format_uptime(uptime),
        std::env::consts::OS,
        std::env::consts::ARCH,
        hostname,
        snapshot.len(),
        snapshot.version(),
        ctx.caps.scheduler.len()
    )))
}

fn format_uptime(secs: i64) -> String {
    let (days, rem) = (secs / 86_400, secs % 86_400);
    let (hours, rem) = (rem / 3_600, rem % 3_600);
    let (minutes, seconds) = (rem / 60, rem % 60);

    if days > 0 {
        format!("{}d {}h {}m {}s", days, hours, minutes, seconds)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
