//! Plugin trait definitions

use std::any::Any;
use std::sync::Arc;

use crate::application::errors::LoadError;
use crate::application::routing::HandlerBinding;

/// A handler module: registers the bindings it contributes
pub trait CommandModule: Send + Sync {
    /// Human-readable description
    fn description(&self) -> &str {
        ""
    }

    /// Build this module's bindings. Errors exclude the module from the table.
    fn register(&self, ctx: &RegistrationContext) -> Result<Vec<HandlerBinding>, LoadError>;
}

/// Passed to `CommandModule::register`
#[derive(Debug, Clone)]
pub struct RegistrationContext {
    module_id: String,
}

impl RegistrationContext {
    pub fn new(module_id: impl Into<String>) -> Self {
        Self {
            module_id: module_id.into(),
        }
    }

    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    /// Registration failure attributed to this module
    pub fn invalid(&self, reason: impl Into<String>) -> LoadError {
        LoadError::Registration {
            module: self.module_id.clone(),
            reason: reason.into(),
        }
    }
}

/// Called with a module id whenever the source sees it change
pub type ChangeCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Keeps change watchers alive; dropping it stops them
pub struct WatchHandle {
    _watchers: Vec<Box<dyn Any + Send>>,
}

impl WatchHandle {
    pub fn new<W: Any + Send>(watcher: W) -> Self {
        Self {
            _watchers: vec![Box::new(watcher)],
        }
    }

    pub fn merge(handles: Vec<WatchHandle>) -> Self {
        Self {
            _watchers: handles.into_iter().flat_map(|h| h._watchers).collect(),
        }
    }
}

/// Where handler modules come from
pub trait ModuleSource: Send + Sync {
    /// Ids of every module this source can provide
    fn list_available(&self) -> Result<Vec<String>, LoadError>;

    /// Instantiate a module
    fn read(&self, module_id: &str) -> Result<Arc<dyn CommandModule>, LoadError>;

    /// Store an uploaded module, returning its id
    fn install(&self, _file_name: &str, _bytes: &[u8]) -> Result<String, LoadError> {
        Err(LoadError::Unsupported)
    }

    /// Report module changes to `on_change` until the handle is dropped
    fn watch(&self, _on_change: ChangeCallback) -> Result<Option<WatchHandle>, LoadError> {
        Ok(None)
    }
}
