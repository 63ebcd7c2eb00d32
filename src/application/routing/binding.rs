//! Handler bindings - pattern to handler associations owned by a module

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use super::context::HandlerContext;
use super::pattern::Pattern;
use crate::application::errors::HandlerError;

/// Handler result: optional reply text for the event's chat
pub type HandlerResult = Result<Option<String>, HandlerError>;

/// Command handler invoked for every matching event
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, ctx: HandlerContext) -> HandlerResult;
}

/// Adapts an async function into a handler
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(HandlerContext) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send,
{
    async fn handle(&self, ctx: HandlerContext) -> HandlerResult {
        (self.0)(ctx).await
    }
}

/// Represents a pattern bound to a handler
pub struct HandlerBinding {
    pub module_id: String,
    pub pattern: Pattern,
    pub handler: Arc<dyn Handler>,
    pub requires_auth: bool,
    pub description: Option<String>,
}

impl HandlerBinding {
    pub fn new<H: Handler + 'static>(pattern: Pattern, handler: H) -> Self {
        Self {
            module_id: String::new(),
            pattern,
            handler: Arc::new(handler),
            requires_auth: true,
            description: None,
        }
    }

    pub fn from_fn<F, Fut>(pattern: Pattern, handler: F) -> Self
    where
        F: Fn(HandlerContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self::new(pattern, FnHandler(handler))
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Allow actors outside the authorized set
    pub fn public(mut self) -> Self {
        self.requires_auth = false;
        self
    }

    pub(crate) fn owned_by(mut self, module_id: &str) -> Self {
        self.module_id = module_id.to_string();
        self
    }

    /// Name used in logs and failure replies
    pub fn label(&self) -> String {
        format!("{}:{}", self.module_id, self.pattern.describe())
    }
}

impl std::fmt::Debug for HandlerBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerBinding")
            .field("module_id", &self.module_id)
            .field("pattern", &self.pattern.describe())
            .field("requires_auth", &self.requires_auth)
            .finish()
    }
}
