//! Declarative handler modules described in YAML

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::application::errors::{HandlerError, LoadError};
use crate::application::routing::{Handler, HandlerBinding, HandlerContext, HandlerResult, Pattern};
use crate::plugins::builtin::queries::reply_rows;
use crate::plugins::trait_def::{CommandModule, RegistrationContext};

/// Module file contents
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModuleManifest {
    pub description: Option<String>,
    #[serde(default)]
    pub commands: Vec<CommandEntry>,
}

/// One binding. Exactly one of `command`/`pattern` and one of `reply`/`query`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CommandEntry {
    /// Slash command name without the slash
    pub command: Option<String>,
    /// Argument regex appended to `command`
    pub args: Option<String>,
    /// Full regex, used instead of `command`
    pub pattern: Option<String>,
    pub description: Option<String>,
    #[serde(default = "default_auth")]
    pub auth: bool,
    /// Reply template; `$1` etc. expand to capture groups
    pub reply: Option<String>,
    /// SQL run against the relational store
    pub query: Option<String>,
    /// Capture groups bound to the query's positional parameters
    #[serde(default)]
    pub params: Vec<usize>,
}

fn default_auth() -> bool {
    true
}

impl ModuleManifest {
    pub fn parse(module_id: &str, content: &str) -> Result<Self, LoadError> {
        serde_yaml::from_str(content).map_err(|e| LoadError::Parse {
            module: module_id.to_string(),
            reason: e.to_string(),
        })
    }
}

/// `CommandModule` built from a manifest
pub struct ManifestModule {
    manifest: ModuleManifest,
}

impl ManifestModule {
    pub fn new(manifest: ModuleManifest) -> Self {
        Self { manifest }
    }

    fn binding(&self, ctx: &RegistrationContext, entry: &CommandEntry) -> Result<HandlerBinding, LoadError> {
        let pattern = match (&entry.command, &entry.pattern) {
            (Some(name), None) => Pattern::command(name, entry.args.as_deref())?,
            (None, Some(source)) => Pattern::regex(source)?,
            _ => return Err(ctx.invalid("each command needs exactly one of `command` or `pattern`")),
        };

        let mut binding = match (&entry.reply, &entry.query) {
            (Some(template), None) => HandlerBinding::new(
                pattern,
                ReplyTemplate {
                    template: template.clone(),
                },
            ),
            (None, Some(sql)) => HandlerBinding::new(
                pattern,
                SqlQuery {
                    sql: sql.clone(),
                    params: entry.params.clone(),
                },
            ),
            _ => return Err(ctx.invalid("each command needs exactly one of `reply` or `query`")),
        };

        if let Some(desc) = &entry.description {
            binding = binding.with_description(desc.clone());
        }
        if !entry.auth {
            binding = binding.public();
        }
        Ok(binding)
    }
}

impl CommandModule for ManifestModule {
    fn description(&self) -> &str {
        self.manifest.description.as_deref().unwrap_or("")
    }

    fn register(&self, ctx: &RegistrationContext) -> Result<Vec<HandlerBinding>, LoadError> {
        self.manifest
            .commands
            .iter()
            .map(|entry| self.binding(ctx, entry))
            .collect()
    }
}

struct ReplyTemplate {
    template: String,
}

#[async_trait]
impl Handler for ReplyTemplate {
    async fn handle(&self, ctx: HandlerContext) -> HandlerResult {
        Ok(Some(ctx.captures.expand(&self.template)))
    }
}

struct SqlQuery {
    sql: String,
    params: Vec<usize>,
}

#[async_trait]
impl Handler for SqlQuery {
    async fn handle(&self, ctx: HandlerContext) -> HandlerResult {
        let params = self
            .params
            .iter()
            .map(|&i| ctx.arg(i).map(str::to_string))
            .collect::<Result<Vec<_>, HandlerError>>()?;

        let rows = ctx.relational()?.query(&self.sql, &params).await?;
        reply_rows(&ctx, &rows).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Event;

    const GREETER: &str = r#"
description: Greetings
commands:
  - command: hello
    args: '(\w+)'
    description: "/hello <name>"
    auth: false
    reply: "Hello, $1!"
  - pattern: '^ping$'
    reply: pong
"#;

    fn register(yaml: &str) -> Result<Vec<HandlerBinding>, LoadError> {
        let manifest = ModuleManifest::parse("greeter", yaml)?;
        ManifestModule::new(manifest).register(&RegistrationContext::new("greeter"))
    }

    #[test]
    fn manifest_commands_become_bindings() {
        let bindings = register(GREETER).unwrap();

        assert_eq!(bindings.len(), 2);
        assert!(!bindings[0].requires_auth);
        assert!(bindings[1].requires_auth);
        assert_eq!(bindings[0].description.as_deref(), Some("/hello <name>"));

        let event = Event::real(1, 1, "/hello world");
        assert_eq!(bindings[0].pattern.matches(&event).unwrap().get(1), Some("world"));
    }

    #[test]
    fn command_and_pattern_together_is_rejected() {
        let yaml = "commands:\n  - command: a\n    pattern: '^a$'\n    reply: x\n";
        assert!(matches!(register(yaml), Err(LoadError::Registration { .. })));
    }

    #[test]
    fn missing_reply_and_query_is_rejected() {
        let yaml = "commands:\n  - command: a\n";
        assert!(matches!(register(yaml), Err(LoadError::Registration { .. })));
    }

    #[test]
    fn bad_regex_is_a_pattern_error() {
        let yaml = "commands:\n  - pattern: '(unclosed'\n    reply: x\n";
        assert!(matches!(register(yaml), Err(LoadError::Pattern { .. })));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = ModuleManifest::parse("broken", "commands: [").unwrap_err();
        assert!(matches!(err, LoadError::Parse { ref module, .. } if module == "broken"));
    }
}
