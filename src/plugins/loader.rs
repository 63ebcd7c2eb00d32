//! Plugin loader - module lifecycle and hot reload

use std::sync::{Arc, Mutex, PoisonError, Weak};

use super::trait_def::{ModuleSource, RegistrationContext, WatchHandle};
use crate::application::errors::LoadError;
use crate::application::routing::{ModuleRecord, RouterTable, SharedTable};
use crate::domain::entities::ModuleSummary;

/// Binds modules from a source into the router table
pub struct PluginLoader {
    source: Arc<dyn ModuleSource>,
    table: Arc<SharedTable>,
    // Held from reading a module through publishing it, so a slower load of
    // older content cannot overwrite a newer one
    publish_lock: Mutex<()>,
    watch: Mutex<Option<WatchHandle>>,
}

impl PluginLoader {
    pub fn new(source: Arc<dyn ModuleSource>, table: Arc<SharedTable>) -> Self {
        Self {
            source,
            table,
            publish_lock: Mutex::new(()),
            watch: Mutex::new(None),
        }
    }

    /// Module ids the source can provide
    pub fn discover(&self) -> Result<Vec<String>, LoadError> {
        self.source.list_available()
    }

    /// Instantiate a module and publish its bindings in one swap
    pub fn load(&self, module_id: &str) -> Result<Arc<ModuleRecord>, LoadError> {
        let _guard = self.publish_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let module = self.source.read(module_id)?;
        let ctx = RegistrationContext::new(module_id);
        let bindings = module.register(&ctx)?;

        if bindings.is_empty() {
            return Err(ctx.invalid("module registers no commands"));
        }

        let bindings = bindings.into_iter().map(|b| b.owned_by(module_id)).collect();
        let record = self.table.publish_module(module_id, module.description(), bindings);

        tracing::info!(
            "Loaded module: {} v{} ({} bindings)",
            module_id,
            record.version,
            record.bindings.len()
        );
        Ok(record)
    }

    /// Load again. On failure the previous bindings stay published.
    pub fn reload(&self, module_id: &str) -> Result<Arc<ModuleRecord>, LoadError> {
        tracing::info!("Reloading {}...", module_id);
        self.load(module_id)
    }

    /// Remove all bindings owned by the module
    pub fn unload(&self, module_id: &str) -> Result<Arc<ModuleRecord>, LoadError> {
        let _guard = self.publish_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let record = self
            .table
            .remove_module(module_id)
            .ok_or_else(|| LoadError::NotLoaded(module_id.to_string()))?;

        tracing::info!("Unloaded module: {}", module_id);
        Ok(record)
    }

    /// Change-notification hook. Never fails: errors are logged.
    pub fn on_change(&self, module_id: &str) {
        let available = match self.source.list_available() {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!("Module source unavailable while handling change to {}: {}", module_id, e);
                return;
            }
        };

        if !available.iter().any(|id| id == module_id) {
            if self.is_loaded(module_id) {
                if let Err(e) = self.unload(module_id) {
                    tracing::warn!("Failed to unload {}: {}", module_id, e);
                }
            }
            return;
        }

        if let Err(e) = self.reload(module_id) {
            tracing::error!("Failed to reload {}: {}", module_id, e);
        }
    }

    /// Load everything the source lists. Only discovery failure is an error.
    pub fn load_all(&self) -> Result<usize, LoadError> {
        let mut loaded = 0;
        for module_id in self.discover()? {
            match self.load(&module_id) {
                Ok(_) => loaded += 1,
                Err(e) => tracing::warn!("Failed to load module {}: {}", module_id, e),
            }
        }
        Ok(loaded)
    }

    /// Store an uploaded module through the source and load it
    pub fn install(&self, file_name: &str, bytes: &[u8]) -> Result<Arc<ModuleRecord>, LoadError> {
        let module_id = self.source.install(file_name, bytes)?;
        tracing::info!("Installed module file {}", module_id);
        self.reload(&module_id)
    }

    /// Start forwarding source change notifications to `on_change`
    pub fn start_watching(self: &Arc<Self>) -> Result<bool, LoadError> {
        let loader: Weak<PluginLoader> = Arc::downgrade(self);
        let handle = self.source.watch(Arc::new(move |module_id: String| {
            if let Some(loader) = loader.upgrade() {
                loader.on_change(&module_id);
            }
        }))?;

        let watching = handle.is_some();
        *self.watch.lock().unwrap_or_else(PoisonError::into_inner) = handle;
        Ok(watching)
    }

    pub fn is_loaded(&self, module_id: &str) -> bool {
        self.table.load().module(module_id).is_some()
    }

    /// Loaded modules ordered by id
    pub fn loaded(&self) -> Vec<ModuleSummary> {
        self.table.load().modules().map(|r| r.summary()).collect()
    }

    pub fn snapshot(&self) -> Arc<RouterTable> {
        self.table.load()
    }
}
