//! Command router - matches events against the live table and runs handlers

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use super::binding::HandlerBinding;
use super::context::{Capabilities, HandlerContext};
use super::pattern::Captures;
use super::table::{RouterTable, SharedTable};
use crate::application::errors::HandlerError;
use crate::domain::entities::Event;

/// Reply sent once per event when any matched binding was denied
pub const DENIED_REPLY: &str = "⛔ Access denied.";

/// What happened to one matched binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingOutcome {
    /// Handler produced a reply for the chat
    Replied,
    /// Handler finished without a reply
    Silent,
    /// Actor failed authorization, handler not invoked
    Denied,
    /// Handler failed; the failure was reported to the chat
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct BindingReport {
    pub label: String,
    pub outcome: BindingOutcome,
}

/// Result of dispatching one event
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub snapshot_version: u64,
    /// One entry per matched binding, in match order
    pub outcomes: Vec<BindingReport>,
}

impl DispatchReport {
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn count(&self, pred: impl Fn(&BindingOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Routes events to every matching binding
pub struct CommandRouter {
    table: Arc<SharedTable>,
    capabilities: Capabilities,
}

impl CommandRouter {
    pub fn new(table: Arc<SharedTable>, capabilities: Capabilities) -> Self {
        Self { table, capabilities }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Capture the current snapshot
    pub fn snapshot(&self) -> Arc<RouterTable> {
        self.table.load()
    }

    /// Dispatch an event against the snapshot current at call time
    pub async fn dispatch(&self, event: Event) -> DispatchReport {
        let snapshot = self.snapshot();
        self.dispatch_on(snapshot, event).await
    }

    /// Dispatch against an already captured snapshot.
    /// Authorization is still checked per binding at invocation time.
    pub async fn dispatch_on(&self, snapshot: Arc<RouterTable>, event: Event) -> DispatchReport {
        tracing::debug!(
            "[{}] {} from {}: {}",
            event.chat_id,
            event.origin.as_str(),
            event.actor_id,
            event.preview()
        );

        let matches = snapshot.matching(&event);
        let mut report = DispatchReport {
            snapshot_version: snapshot.version(),
            outcomes: Vec::with_capacity(matches.len()),
        };

        if matches.is_empty() {
            tracing::debug!("[{}] No bindings matched", event.chat_id);
            return report;
        }

        let mut tasks = JoinSet::new();
        for (index, m) in matches.into_iter().enumerate() {
            let caps = self.capabilities.clone();
            let event = event.clone();
            tasks.spawn(async move {
                let label = m.binding.label();
                let outcome = run_binding(m.binding, m.captures, event, caps).await;
                (index, BindingReport { label, outcome })
            });
        }

        let mut collected = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(entry) => collected.push(entry),
                Err(e) => tracing::error!("[{}] Dispatch task failed: {}", event.chat_id, e),
            }
        }
        collected.sort_by_key(|(index, _)| *index);
        report.outcomes = collected.into_iter().map(|(_, r)| r).collect();

        if report.count(|o| *o == BindingOutcome::Denied) > 0 {
            if let Err(e) = self
                .capabilities
                .transport
                .send_reply(event.chat_id, DENIED_REPLY)
                .await
            {
                tracing::error!("Failed to send message: {}", e);
            }
        }

        report
    }

    /// Consume inbound events, dispatching each as its own task
    pub async fn serve(self: Arc<Self>, mut inbound: mpsc::UnboundedReceiver<Event>) {
        tracing::info!("Starting dispatch loop...");

        while let Some(event) = inbound.recv().await {
            let router = Arc::clone(&self);
            tokio::spawn(async move {
                router.dispatch(event).await;
            });
        }

        tracing::info!("Inbound queue closed, dispatch loop stopped");
    }
}

async fn run_binding(
    binding: Arc<HandlerBinding>,
    captures: Captures,
    event: Event,
    caps: Capabilities,
) -> BindingOutcome {
    if binding.requires_auth {
        if let Err(e) = caps.guard.check(event.actor_id) {
            tracing::warn!("[{}] {} for {}", event.chat_id, e, binding.label());
            return BindingOutcome::Denied;
        }
    }

    let chat_id = event.chat_id;
    let transport = Arc::clone(&caps.transport);
    let handler = Arc::clone(&binding.handler);
    let ctx = HandlerContext {
        event,
        captures,
        caps,
    };

    // Separate task so a panicking handler is contained like any other failure
    let result = match tokio::spawn(async move { handler.handle(ctx).await }).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(HandlerError::Panicked),
        Err(e) => Err(HandlerError::Failed(e.to_string())),
    };

    match result {
        Ok(Some(text)) => {
            tracing::info!("Sending response to chat_id {}: {}", chat_id, preview(&text));
            if let Err(e) = transport.send_reply(chat_id, &text).await {
                tracing::error!("Failed to send message: {}", e);
            }
            BindingOutcome::Replied
        }
        Ok(None) => BindingOutcome::Silent,
        Err(e) => {
            tracing::warn!("[{}] {} failed: {}", chat_id, binding.label(), e);
            let text = format!("❌ {}: {}", binding.description.as_deref().unwrap_or("command"), e);
            if let Err(e) = transport.send_reply(chat_id, &text).await {
                tracing::error!("Failed to send message: {}", e);
            }
            BindingOutcome::Failed(e.to_string())
        }
    }
}

fn preview(text: &str) -> String {
    text.chars().take(100).collect()
}
