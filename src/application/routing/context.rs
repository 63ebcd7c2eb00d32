//! Handler context - the event plus the fixed capability set

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::pattern::Captures;
use crate::application::errors::HandlerError;
use crate::application::permissions::PermissionGuard;
use crate::application::scheduler::Scheduler;
use crate::domain::entities::Event;
use crate::domain::traits::{RelationalStore, SavedQueryStore, Transport};
use crate::infrastructure::config::{Config, ConfigFile};
use crate::plugins::PluginLoader;

/// References handed to every handler, fixed at startup
#[derive(Clone)]
pub struct Capabilities {
    pub transport: Arc<dyn Transport>,
    pub guard: Arc<PermissionGuard>,
    pub scheduler: Arc<Scheduler>,
    pub loader: Arc<PluginLoader>,
    pub relational: Option<Arc<dyn RelationalStore>>,
    pub queries: Option<Arc<dyn SavedQueryStore>>,
    pub config: Arc<Config>,
    /// Config file on disk, absent when running from the environment only
    pub settings: Option<Arc<ConfigFile>>,
    pub started_at: DateTime<Utc>,
}

impl Capabilities {
    pub fn new(
        transport: Arc<dyn Transport>,
        guard: Arc<PermissionGuard>,
        scheduler: Arc<Scheduler>,
        loader: Arc<PluginLoader>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            transport,
            guard,
            scheduler,
            loader,
            relational: None,
            queries: None,
            config,
            settings: None,
            started_at: Utc::now(),
        }
    }

    pub fn with_relational(mut self, store: Arc<dyn RelationalStore>) -> Self {
        self.relational = Some(store);
        self
    }

    pub fn with_queries(mut self, store: Arc<dyn SavedQueryStore>) -> Self {
        self.queries = Some(store);
        self
    }

    pub fn with_settings(mut self, file: Arc<ConfigFile>) -> Self {
        self.settings = Some(file);
        self
    }
}

/// Context passed to a handler invocation
#[derive(Clone)]
pub struct HandlerContext {
    pub event: Event,
    pub captures: Captures,
    pub caps: Capabilities,
}

impl HandlerContext {
    /// Capture group `index`, or an argument error naming it
    pub fn arg(&self, index: usize) -> Result<&str, HandlerError> {
        self.captures
            .get(index)
            .ok_or_else(|| HandlerError::InvalidArgs(format!("missing argument {}", index)))
    }

    pub fn relational(&self) -> Result<&Arc<dyn RelationalStore>, HandlerError> {
        self.caps
            .relational
            .as_ref()
            .ok_or_else(|| HandlerError::Unavailable("no database configured".to_string()))
    }

    pub fn settings(&self) -> Result<&Arc<ConfigFile>, HandlerError> {
        self.caps
            .settings
            .as_ref()
            .ok_or_else(|| HandlerError::Unavailable("no config file".to_string()))
    }

    pub fn saved_queries(&self) -> Result<&Arc<dyn SavedQueryStore>, HandlerError> {
        self.caps
            .queries
            .as_ref()
            .ok_or_else(|| HandlerError::Unavailable("no database configured".to_string()))
    }
}
